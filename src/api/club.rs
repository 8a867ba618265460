use crate::{
    api::{require_json, MessageResponse},
    auth::ExtractAuth,
    error::{AppError, AppResult},
    models::{
        Book, BookClub, BookComment, ClubMember, CurrentBook, Message, PreviouslyReadBook, User,
    },
    schema::*,
    AppContext,
};
use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Deserialize)]
struct ClubCreateRequest {
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub creator_id: i32,
}

#[derive(Deserialize, AsChangeset)]
#[diesel(table_name = book_clubs)]
#[serde(deny_unknown_fields)]
struct ClubEdit {
    name: Option<String>,
    location: Option<String>,
    description: Option<String>,
}

impl ClubEdit {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none() && self.description.is_none()
    }
}

#[derive(Deserialize)]
struct JoinClubRequest {
    pub club_id: i32,
    pub user_id: i32,
}

#[derive(Serialize)]
struct CreatorSummary {
    id: i32,
    username: String,
    first_name: String,
    last_name: String,
}

#[derive(Serialize)]
struct MemberSummary {
    id: i32,
    username: String,
}

#[derive(Serialize)]
struct BookSummary {
    id: i32,
    title: String,
    author: String,
    description: Option<String>,
}

impl BookSummary {
    fn from_book(book: Book) -> BookSummary {
        BookSummary {
            id: book.id,
            title: book.title,
            author: book.author,
            description: book.description,
        }
    }
}

#[derive(Serialize)]
struct CommentEntry {
    id: i32,
    comment: String,
    rating: i32,
    username: String,
}

#[derive(Serialize)]
struct PreviousBookEntry {
    book: BookSummary,
    comments: Vec<CommentEntry>,
}

#[derive(Serialize)]
struct MessageEntry {
    id: i32,
    sender: String,
    message: String,
    created_at: NaiveDateTime,
}

#[derive(Serialize)]
struct ClubDetailResponse {
    id: i32,
    name: String,
    location: String,
    description: Option<String>,
    creator: Option<CreatorSummary>,
    members: Vec<MemberSummary>,
    current_book: Option<BookSummary>,
    previous_books: Vec<PreviousBookEntry>,
    messages: Vec<MessageEntry>,
}

// Comments are keyed by book, so a book appearing twice in the history
// carries its comments on every entry.
fn attach_comments(
    books: Vec<Book>,
    comments: Vec<(BookComment, User)>,
) -> Vec<(Book, Vec<(BookComment, User)>)> {
    let mut by_book: HashMap<i32, Vec<(BookComment, User)>> = HashMap::new();
    for (comment, user) in comments {
        by_book.entry(comment.book_id).or_default().push((comment, user));
    }
    books
        .into_iter()
        .map(|book| {
            let comments = by_book.get(&book.id).cloned().unwrap_or_default();
            (book, comments)
        })
        .collect()
}

fn assemble_club_detail(
    club: BookClub,
    creator: Option<User>,
    members: Vec<User>,
    current_book: Option<Book>,
    previous_books: Vec<(Book, Vec<(BookComment, User)>)>,
    messages: Vec<(Message, User)>,
) -> ClubDetailResponse {
    ClubDetailResponse {
        id: club.id,
        name: club.name,
        location: club.location,
        description: club.description,
        creator: creator.map(|user| CreatorSummary {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
        members: members
            .into_iter()
            .map(|user| MemberSummary {
                id: user.id,
                username: user.username,
            })
            .collect(),
        current_book: current_book.map(BookSummary::from_book),
        previous_books: previous_books
            .into_iter()
            .map(|(book, comments)| PreviousBookEntry {
                book: BookSummary::from_book(book),
                comments: comments
                    .into_iter()
                    .map(|(comment, user)| CommentEntry {
                        id: comment.id,
                        comment: comment.comment,
                        rating: comment.rating,
                        username: user.username,
                    })
                    .collect(),
            })
            .collect(),
        messages: messages
            .into_iter()
            .map(|(message, sender)| MessageEntry {
                id: message.id,
                sender: sender.username,
                message: message.message,
                created_at: message.created_at,
            })
            .collect(),
    }
}

async fn create_club(
    Extension(ctx): Extension<AppContext>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<ClubCreateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    #[derive(Insertable)]
    #[diesel(table_name = book_clubs)]
    struct NewClub {
        name: String,
        location: String,
        description: Option<String>,
        creator_id: i32,
    }

    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    let created = diesel::insert_into(book_clubs::table)
        .values(NewClub {
            name: req.name,
            location: req.location,
            description: req.description,
            creator_id: req.creator_id,
        })
        .on_conflict(book_clubs::name)
        .do_nothing()
        .get_result::<BookClub>(conn)
        .await
        .optional()?;

    if created.is_none() {
        return Err(AppError::from(StatusCode::BAD_REQUEST, "Name already exists"));
    }

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Book Club created successfully"),
    ))
}

async fn list_clubs(Extension(ctx): Extension<AppContext>) -> AppResult<Json<Vec<BookClub>>> {
    let conn = &mut ctx.pool.get().await?;

    let clubs = book_clubs::table.load::<BookClub>(conn).await?;
    if clubs.is_empty() {
        return Err(AppError::from(
            StatusCode::NOT_FOUND,
            "Book Clubs are not currently in database",
        ));
    }
    Ok(Json(clubs))
}

// Read-heavy aggregation: everything about the club is fetched with sequential
// per-table lookups and joined here rather than in one query.
async fn club_detail(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<i32>,
) -> AppResult<Json<ClubDetailResponse>> {
    let conn = &mut ctx.pool.get().await?;

    let club = book_clubs::table
        .find(id)
        .first::<BookClub>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Book Club not found"))?;

    let creator = users::table
        .find(club.creator_id)
        .first::<User>(conn)
        .await
        .optional()?;

    let members = club_members::table
        .inner_join(users::table)
        .filter(club_members::club_id.eq(id))
        .load::<(ClubMember, User)>(conn)
        .await?
        .into_iter()
        .map(|(_, user)| user)
        .collect::<Vec<_>>();

    let current_book = current_books::table
        .inner_join(books::table)
        .filter(current_books::club_id.eq(id))
        .first::<(CurrentBook, Book)>(conn)
        .await
        .optional()?
        .map(|(_, book)| book);

    let previous_books = previously_read_books::table
        .inner_join(books::table)
        .filter(previously_read_books::club_id.eq(id))
        .load::<(PreviouslyReadBook, Book)>(conn)
        .await?
        .into_iter()
        .map(|(_, book)| book)
        .collect::<Vec<_>>();

    let comments = book_comments::table
        .inner_join(users::table)
        .filter(book_comments::book_id.eq_any(previous_books.iter().map(|b| b.id)))
        .load::<(BookComment, User)>(conn)
        .await?;

    let messages = messages::table
        .inner_join(users::table)
        .filter(messages::club_id.eq(id))
        .order(messages::created_at.asc())
        .load::<(Message, User)>(conn)
        .await?;

    Ok(Json(assemble_club_detail(
        club,
        creator,
        members,
        current_book,
        attach_comments(previous_books, comments),
        messages,
    )))
}

async fn edit_club(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<i32>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<ClubEdit>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let edit = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    let club = book_clubs::table
        .find(id)
        .first::<BookClub>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Book Club not found"))?;

    if !edit.is_empty() {
        diesel::update(book_clubs::table.find(club.id))
            .set(edit)
            .execute(conn)
            .await?;
    }

    Ok(MessageResponse::new("Book Club updated successfully"))
}

// Only the creator may delete a club; everyone else gets the same 404 as a
// nonexistent club so the endpoint confirms nothing.
async fn delete_club(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<i32>,
    ExtractAuth(claims): ExtractAuth,
) -> AppResult<Json<MessageResponse>> {
    let conn = &mut ctx.pool.get().await?;

    let current_user = users::table
        .filter(users::username.eq(&claims.sub))
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "Current user not found"))?;

    let club = book_clubs::table
        .find(id)
        .filter(book_clubs::creator_id.eq(current_user.id))
        .first::<BookClub>(conn)
        .await
        .optional()?
        .ok_or_else(|| {
            AppError::from(
                StatusCode::NOT_FOUND,
                "Book Club not found or you are not the creator",
            )
        })?;

    let club_id = club.id;
    conn.transaction::<_, AppError, _>(|conn| {
        async move {
            diesel::delete(club_members::table.filter(club_members::club_id.eq(club_id)))
                .execute(conn)
                .await?;
            diesel::delete(current_books::table.filter(current_books::club_id.eq(club_id)))
                .execute(conn)
                .await?;
            diesel::delete(
                previously_read_books::table.filter(previously_read_books::club_id.eq(club_id)),
            )
            .execute(conn)
            .await?;
            diesel::delete(messages::table.filter(messages::club_id.eq(club_id)))
                .execute(conn)
                .await?;
            diesel::delete(book_clubs::table.find(club_id))
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(MessageResponse::new("Book Club successfully deleted"))
}

async fn join_club(
    Extension(ctx): Extension<AppContext>,
    ExtractAuth(_claims): ExtractAuth,
    payload: Result<Json<JoinClubRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    #[derive(Insertable)]
    #[diesel(table_name = club_members)]
    struct NewMember {
        club_id: i32,
        member_id: i32,
    }

    let req = require_json(payload)?;
    let conn = &mut ctx.pool.get().await?;

    let club = book_clubs::table
        .find(req.club_id)
        .first::<BookClub>(conn)
        .await
        .optional()?;
    let user = users::table
        .find(req.user_id)
        .first::<User>(conn)
        .await
        .optional()?;
    if club.is_none() || user.is_none() {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "User or club does not exist",
        ));
    }

    diesel::insert_into(club_members::table)
        .values(NewMember {
            club_id: req.club_id,
            member_id: req.user_id,
        })
        .execute(conn)
        .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Member joined successfully"),
    ))
}

pub fn app() -> Router {
    Router::new()
        .route("/clubs", get(list_clubs).post(create_club))
        .route(
            "/clubs/:id",
            get(club_detail).patch(edit_club).delete(delete_club),
        )
        .route("/joinclub", post(join_club))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user(id: i32, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            first_name: username.to_string(),
            last_name: "Reader".to_string(),
            profile_pic: None,
        }
    }

    fn book(id: i32, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            description: None,
        }
    }

    fn club() -> BookClub {
        BookClub {
            id: 1,
            name: "Readers".to_string(),
            location: "Nairobi".to_string(),
            description: Some("weekly".to_string()),
            creator_id: 10,
        }
    }

    #[test]
    fn detail_of_fresh_club_is_bare() {
        let detail = assemble_club_detail(
            club(),
            Some(user(10, "alice")),
            vec![],
            None,
            vec![],
            vec![],
        );
        let body = serde_json::to_value(&detail).unwrap();
        assert_eq!(body["creator"]["username"], "alice");
        assert_eq!(body["members"].as_array().unwrap().len(), 0);
        assert!(body["current_book"].is_null());
    }

    #[test]
    fn detail_groups_comments_under_their_book() {
        let dune = book(20, "Dune");
        let comment = BookComment {
            id: 1,
            user_id: 11,
            book_id: 20,
            comment: "loved it".to_string(),
            rating: 5,
        };
        let detail = assemble_club_detail(
            club(),
            Some(user(10, "alice")),
            vec![user(11, "bob")],
            Some(book(21, "Hyperion")),
            vec![(dune, vec![(comment, user(11, "bob"))])],
            vec![],
        );
        let body = serde_json::to_value(&detail).unwrap();
        assert_eq!(body["members"][0]["username"], "bob");
        assert_eq!(body["current_book"]["title"], "Hyperion");
        assert_eq!(body["previous_books"][0]["book"]["title"], "Dune");
        assert_eq!(body["previous_books"][0]["comments"][0]["rating"], 5);
        assert_eq!(body["previous_books"][0]["comments"][0]["username"], "bob");
    }

    #[test]
    fn detail_names_message_senders() {
        let sent_at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let message = Message {
            id: 1,
            sender_id: 11,
            club_id: 1,
            message: "meeting friday".to_string(),
            created_at: sent_at,
        };
        let detail = assemble_club_detail(
            club(),
            None,
            vec![],
            None,
            vec![],
            vec![(message, user(11, "bob"))],
        );
        let body = serde_json::to_value(&detail).unwrap();
        assert!(body["creator"].is_null());
        assert_eq!(body["messages"][0]["sender"], "bob");
        assert_eq!(body["messages"][0]["message"], "meeting friday");
    }

    #[test]
    fn repeated_history_entries_each_carry_comments() {
        let comment = BookComment {
            id: 1,
            user_id: 11,
            book_id: 20,
            comment: "loved it".to_string(),
            rating: 4,
        };
        // a club can read the same book twice; both history rows load the same book
        let paired = attach_comments(
            vec![book(20, "Dune"), book(20, "Dune")],
            vec![(comment, user(11, "bob"))],
        );
        assert_eq!(paired.len(), 2);
        assert_eq!(paired[0].1.len(), 1);
        assert_eq!(paired[1].1.len(), 1);
        assert_eq!(paired[1].1[0].0.comment, "loved it");
    }

    #[test]
    fn edit_rejects_unknown_fields() {
        let body = serde_json::json!({ "creator_id": 99 });
        assert!(serde_json::from_value::<ClubEdit>(body).is_err());
    }
}
