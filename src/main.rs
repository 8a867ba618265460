use axum::http::Method;
use envconfig::Envconfig;
use story_circle::{app, connect_to_db, AppContext};
use tower_http::cors::{Any, CorsLayer};

#[derive(Envconfig)]
struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub db_url: String,
    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,
    #[envconfig(from = "JWT_SECRET")]
    pub jwt_secret: String,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::init_from_env().unwrap();

    let pool = connect_to_db(&config.db_url);
    let ctx = AppContext::new(pool, &config.jwt_secret);

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(Any);
    let app = app(ctx).layer(cors);

    tracing::info!("listening on port {}", config.port);
    axum::Server::bind(&([0, 0, 0, 0], config.port).into())
        .serve(app.into_make_service())
        .await
        .unwrap();
}
