use crate::{
    api::{require_json, MessageResponse},
    auth::ExtractAuth,
    error::{AppError, AppResult},
    models::{Book, BookClub, CurrentBook, PreviouslyReadBook},
    schema::*,
    AppContext,
};
use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    routing::{delete, post},
    Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;
use serde::Deserialize;

#[derive(Deserialize)]
struct ShelfRequest {
    pub club_id: i32,
    pub book_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = current_books)]
struct NewCurrentBook {
    club_id: i32,
    book_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = previously_read_books)]
struct NewPreviousBook {
    club_id: i32,
    book_id: i32,
}

async fn ensure_club_and_book(
    conn: &mut AsyncPgConnection,
    club_id: i32,
    book_id: i32,
) -> AppResult<()> {
    let club = book_clubs::table
        .find(club_id)
        .first::<BookClub>(conn)
        .await
        .optional()?;
    let book = books::table
        .find(book_id)
        .first::<Book>(conn)
        .await
        .optional()?;
    if club.is_none() || book.is_none() {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "Club or book does not exist",
        ));
    }
    Ok(())
}

// A club reads one book at a time: setting a new current book replaces
// whatever was there.
async fn set_current_book(
    Extension(ctx): Extension<AppContext>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<ShelfRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    ensure_club_and_book(conn, req.club_id, req.book_id).await?;

    // replace-not-append: the delete and insert must land together
    let ShelfRequest { club_id, book_id } = req;
    conn.transaction::<_, AppError, _>(|conn| {
        async move {
            diesel::delete(current_books::table.filter(current_books::club_id.eq(club_id)))
                .execute(conn)
                .await?;
            diesel::insert_into(current_books::table)
                .values(NewCurrentBook { club_id, book_id })
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Current Book created successfully"),
    ))
}

async fn remove_current_book(
    Extension(ctx): Extension<AppContext>,
    Path(club_id): Path<i32>,
    ExtractAuth(_claims): ExtractAuth,
) -> AppResult<Json<MessageResponse>> {
    let conn = &mut ctx.pool.get().await?;

    let current = current_books::table
        .filter(current_books::club_id.eq(club_id))
        .first::<CurrentBook>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Current Book not found"))?;

    diesel::delete(current_books::table.find(current.id))
        .execute(conn)
        .await?;

    Ok(MessageResponse::new("Current Book successfully deleted"))
}

async fn add_previous_book(
    Extension(ctx): Extension<AppContext>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<ShelfRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    ensure_club_and_book(conn, req.club_id, req.book_id).await?;

    diesel::insert_into(previously_read_books::table)
        .values(NewPreviousBook {
            club_id: req.club_id,
            book_id: req.book_id,
        })
        .execute(conn)
        .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Previously Read Book created successfully"),
    ))
}

// Removes the oldest history entry for the club.
async fn remove_previous_book(
    Extension(ctx): Extension<AppContext>,
    Path(club_id): Path<i32>,
    ExtractAuth(_claims): ExtractAuth,
) -> AppResult<Json<MessageResponse>> {
    let conn = &mut ctx.pool.get().await?;

    let previous = previously_read_books::table
        .filter(previously_read_books::club_id.eq(club_id))
        .order(previously_read_books::id.asc())
        .first::<PreviouslyReadBook>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Previous Book not found"))?;

    diesel::delete(previously_read_books::table.find(previous.id))
        .execute(conn)
        .await?;

    Ok(MessageResponse::new("Previous Book successfully deleted"))
}

pub fn app() -> Router {
    Router::new()
        .route("/currentbook", post(set_current_book))
        .route("/currentbook/:club_id", delete(remove_current_book))
        .route("/previousbooks", post(add_previous_book))
        .route("/previousbooks/:club_id", delete(remove_previous_book))
}
