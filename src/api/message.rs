use crate::{
    api::{require_json, MessageResponse},
    auth::ExtractAuth,
    error::{AppError, AppResult},
    models::{BookClub, User},
    schema::*,
    AppContext,
};
use axum::{
    extract::rejection::JsonRejection, http::StatusCode, routing::post, Extension, Json, Router,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

#[derive(Deserialize)]
struct MessageCreateRequest {
    pub sender_id: i32,
    pub club_id: i32,
    pub message: String,
}

async fn create_message(
    Extension(ctx): Extension<AppContext>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<MessageCreateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    #[derive(Insertable)]
    #[diesel(table_name = messages)]
    struct NewMessage {
        sender_id: i32,
        club_id: i32,
        message: String,
        created_at: NaiveDateTime,
    }

    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    let sender = users::table
        .find(req.sender_id)
        .first::<User>(conn)
        .await
        .optional()?;
    let club = book_clubs::table
        .find(req.club_id)
        .first::<BookClub>(conn)
        .await
        .optional()?;
    if sender.is_none() || club.is_none() {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "User or club does not exist",
        ));
    }

    diesel::insert_into(messages::table)
        .values(NewMessage {
            sender_id: req.sender_id,
            club_id: req.club_id,
            message: req.message,
            created_at: chrono::Utc::now().naive_utc(),
        })
        .execute(conn)
        .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Message created successfully"),
    ))
}

pub fn app() -> Router {
    Router::new().route("/messages", post(create_message))
}
