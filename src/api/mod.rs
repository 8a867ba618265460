use crate::error::AppError;
use axum::{extract::rejection::JsonRejection, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

pub mod auth;
pub mod book;
pub mod club;
pub mod message;
pub mod profile;
pub mod shelf;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Json<MessageResponse> {
        Json(MessageResponse { message })
    }
}

/// Malformed or incomplete request bodies all surface as the same 400.
pub(crate) fn require_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match payload {
        Ok(Json(req)) => Ok(req),
        Err(_) => Err(AppError::from(StatusCode::BAD_REQUEST, "validation errors")),
    }
}

#[derive(Serialize)]
struct IndexResponse {
    index: &'static str,
}

async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        index: "Welcome to the Story Circle RESTful API",
    })
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(index))
        .merge(auth::app())
        .merge(profile::app())
        .merge(club::app())
        .merge(book::app())
        .merge(shelf::app())
        .merge(message::app())
}
