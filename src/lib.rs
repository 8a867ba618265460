use axum::{handler::Handler, http::StatusCode, Extension, Router};
use deadpool::managed::Pool;
use diesel_async::{pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection};
use std::{sync::Arc, time::Duration};

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod schema;

pub type DbPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Everything a handler needs, built once at startup and injected as an
/// `Extension` so tests can construct their own.
#[derive(Clone)]
pub struct AppContext {
    pub pool: DbPool,
    pub keys: Arc<auth::Keys>,
    pub http: reqwest::Client,
}

impl AppContext {
    pub fn new(pool: DbPool, jwt_secret: &str) -> AppContext {
        AppContext {
            pool,
            keys: Arc::new(auth::Keys::from_secret(jwt_secret)),
            // the outbound HEAD check must not hang the handler
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build http client"),
        }
    }
}

pub fn connect_to_db(db_url: &str) -> DbPool {
    let db_config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
    Pool::builder(db_config)
        .build()
        .expect("failed to build database pool")
}

pub fn app(ctx: AppContext) -> Router {
    api::app()
        .fallback(not_found.into_service())
        .layer(Extension(ctx))
}

async fn not_found() -> error::AppError {
    error::AppError::from(
        StatusCode::NOT_FOUND,
        "The requested resource does not exist.",
    )
}
