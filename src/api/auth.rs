use crate::{
    api::{require_json, MessageResponse},
    auth::{self, TOKEN_LIFETIME},
    error::{AppError, AppResult},
    models::User,
    schema::*,
    AppContext,
};
use axum::{
    extract::rejection::JsonRejection, http::StatusCode, routing::post, Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_pic: String,
    pub password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    pub access_token: String,
    pub message: &'static str,
    pub user_id: i32,
}

async fn register(
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    #[derive(Insertable)]
    #[diesel(table_name = users)]
    struct NewUser {
        username: String,
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
        profile_pic: String,
    }

    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    let created = diesel::insert_into(users::table)
        .values(NewUser {
            username: req.username,
            email: req.email,
            password_hash: auth::hash_password(req.password)?,
            first_name: req.first_name,
            last_name: req.last_name,
            profile_pic: req.profile_pic,
        })
        .on_conflict_do_nothing()
        .get_result::<User>(conn)
        .await
        .optional()?;

    if created.is_none() {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "Username or email already exists",
        ));
    }

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("User created successfully"),
    ))
}

// A single 401 body for both unknown users and wrong passwords, so the
// endpoint cannot be used to enumerate accounts.
async fn login(
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    if let Some(user) = users::table
        .filter(users::username.eq(&req.username))
        .first::<User>(conn)
        .await
        .optional()?
    {
        if auth::verify_password(req.password, &user.password_hash)? {
            return Ok(Json(LoginResponse {
                access_token: ctx.keys.generate_jwt(&user.username, TOKEN_LIFETIME)?,
                message: "Login successful",
                user_id: user.id,
            }));
        }
    }
    Err(AppError::from(
        StatusCode::UNAUTHORIZED,
        "Invalid username or password",
    ))
}

pub fn app() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_all_fields() {
        let missing_password = serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "Archer",
            "profile_pic": "https://example.com/alice.png",
        });
        assert!(serde_json::from_value::<RegisterRequest>(missing_password).is_err());
    }

    #[test]
    fn login_response_shape() {
        let body = serde_json::to_value(LoginResponse {
            access_token: "tok".to_string(),
            message: "Login successful",
            user_id: 7,
        })
        .unwrap();
        assert_eq!(body["access_token"], "tok");
        assert_eq!(body["user_id"], 7);
    }
}
