use crate::{
    api::{require_json, MessageResponse},
    auth::ExtractAuth,
    error::{AppError, AppResult},
    models::{Book, BookComment, User},
    schema::*,
    AppContext,
};
use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct BookCreateRequest {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
}

#[derive(Deserialize, AsChangeset)]
#[diesel(table_name = books)]
#[serde(deny_unknown_fields)]
struct BookEdit {
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
}

impl BookEdit {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.description.is_none()
    }
}

#[derive(Deserialize)]
struct CommentCreateRequest {
    pub user_id: i32,
    pub book_id: i32,
    pub comment: String,
    pub rating: i32,
}

#[derive(Serialize)]
struct BookCommentEntry {
    id: i32,
    comment: String,
    rating: i32,
    username: String,
    user_profile_pic: Option<String>,
}

#[derive(Serialize)]
struct BookDetailResponse {
    id: i32,
    title: String,
    author: String,
    description: Option<String>,
    comments: Vec<BookCommentEntry>,
}

fn assemble_book_detail(book: Book, comments: Vec<(BookComment, User)>) -> BookDetailResponse {
    BookDetailResponse {
        id: book.id,
        title: book.title,
        author: book.author,
        description: book.description,
        comments: comments
            .into_iter()
            .map(|(comment, user)| BookCommentEntry {
                id: comment.id,
                comment: comment.comment,
                rating: comment.rating,
                username: user.username,
                user_profile_pic: user.profile_pic,
            })
            .collect(),
    }
}

fn valid_rating(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

async fn list_books(Extension(ctx): Extension<AppContext>) -> AppResult<Json<Vec<Book>>> {
    let conn = &mut ctx.pool.get().await?;

    let all = books::table.load::<Book>(conn).await?;
    if all.is_empty() {
        return Err(AppError::from(
            StatusCode::NOT_FOUND,
            "Books are not currently in database",
        ));
    }
    Ok(Json(all))
}

async fn create_book(
    Extension(ctx): Extension<AppContext>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<BookCreateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Book>)> {
    #[derive(Insertable)]
    #[diesel(table_name = books)]
    struct NewBook {
        title: String,
        author: String,
        description: Option<String>,
    }

    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    let created = diesel::insert_into(books::table)
        .values(NewBook {
            title: req.title,
            author: req.author,
            description: req.description,
        })
        .on_conflict(books::title)
        .do_nothing()
        .get_result::<Book>(conn)
        .await
        .optional()?;

    let Some(created) = created else {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "Book title already exists",
        ));
    };

    Ok((StatusCode::CREATED, Json(created)))
}

async fn book_detail(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetailResponse>> {
    let conn = &mut ctx.pool.get().await?;

    let book = books::table
        .find(id)
        .first::<Book>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Book not found"))?;

    let comments = book_comments::table
        .inner_join(users::table)
        .filter(book_comments::book_id.eq(id))
        .load::<(BookComment, User)>(conn)
        .await?;

    Ok(Json(assemble_book_detail(book, comments)))
}

async fn edit_book(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<i32>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<BookEdit>, JsonRejection>,
) -> AppResult<Json<Book>> {
    let edit = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    let book = books::table
        .find(id)
        .first::<Book>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Book not found"))?;

    if edit.is_empty() {
        return Ok(Json(book));
    }

    let updated = diesel::update(books::table.find(book.id))
        .set(edit)
        .get_result::<Book>(conn)
        .await?;

    Ok(Json(updated))
}

async fn delete_book(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<i32>,
    ExtractAuth(_claims): ExtractAuth,
) -> AppResult<Json<MessageResponse>> {
    let conn = &mut ctx.pool.get().await?;

    let book = books::table
        .find(id)
        .first::<Book>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Book not found"))?;

    let book_id = book.id;
    conn.transaction::<_, AppError, _>(|conn| {
        async move {
            diesel::delete(book_comments::table.filter(book_comments::book_id.eq(book_id)))
                .execute(conn)
                .await?;
            diesel::delete(current_books::table.filter(current_books::book_id.eq(book_id)))
                .execute(conn)
                .await?;
            diesel::delete(
                previously_read_books::table.filter(previously_read_books::book_id.eq(book_id)),
            )
            .execute(conn)
            .await?;
            diesel::delete(books::table.find(book_id))
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(MessageResponse::new("Book successfully deleted"))
}

async fn create_comment(
    Extension(ctx): Extension<AppContext>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<CommentCreateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    #[derive(Insertable)]
    #[diesel(table_name = book_comments)]
    struct NewComment {
        user_id: i32,
        book_id: i32,
        comment: String,
        rating: i32,
    }

    let req = require_json(payload)?;

    if !valid_rating(req.rating) {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "Rating must be between 1 and 5",
        ));
    }

    let conn = &mut ctx.pool.get().await?;

    let user = users::table
        .find(req.user_id)
        .first::<User>(conn)
        .await
        .optional()?;
    let book = books::table
        .find(req.book_id)
        .first::<Book>(conn)
        .await
        .optional()?;
    if user.is_none() || book.is_none() {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "User or book does not exist",
        ));
    }

    diesel::insert_into(book_comments::table)
        .values(NewComment {
            user_id: req.user_id,
            book_id: req.book_id,
            comment: req.comment,
            rating: req.rating,
        })
        .execute(conn)
        .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Comment created successfully"),
    ))
}

pub fn app() -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(book_detail).patch(edit_book).delete(delete_book),
        )
        .route("/bookcomments", post(create_comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(valid_rating(1));
        assert!(valid_rating(5));
        assert!(!valid_rating(0));
        assert!(!valid_rating(6));
        assert!(!valid_rating(-3));
    }

    #[test]
    fn detail_names_commenters() {
        let book = Book {
            id: 1,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            description: Some("sand".to_string()),
        };
        let comment = BookComment {
            id: 7,
            user_id: 2,
            book_id: 1,
            comment: "loved it".to_string(),
            rating: 5,
        };
        let user = User {
            id: 2,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Archer".to_string(),
            profile_pic: Some("https://example.com/alice.png".to_string()),
        };

        let body = serde_json::to_value(assemble_book_detail(book, vec![(comment, user)])).unwrap();
        assert_eq!(body["title"], "Dune");
        assert_eq!(body["comments"][0]["username"], "alice");
        assert_eq!(
            body["comments"][0]["user_profile_pic"],
            "https://example.com/alice.png"
        );
        assert_eq!(body["comments"][0]["rating"], 5);
    }

    #[test]
    fn edit_rejects_unknown_fields() {
        let body = serde_json::json!({ "id": 3, "title": "Dune" });
        assert!(serde_json::from_value::<BookEdit>(body).is_err());
    }
}
