use crate::{
    api::{require_json, MessageResponse},
    auth::ExtractAuth,
    error::{AppError, AppResult},
    models::User,
    schema::*,
    AppContext,
};
use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ProfileResponse {
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    profile_pic: Option<String>,
}

// The only fields a user may change about themselves. Anything else in the
// body (username included, since the token is bound to it) is rejected.
#[derive(Deserialize, AsChangeset)]
#[diesel(table_name = users)]
#[serde(deny_unknown_fields)]
struct ProfileEdit {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_pic: Option<String>,
}

impl ProfileEdit {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.profile_pic.is_none()
    }
}

async fn find_user(
    conn: &mut diesel_async::AsyncPgConnection,
    name: &str,
) -> AppResult<User> {
    users::table
        .filter(users::username.eq(name))
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::from(StatusCode::NOT_FOUND, "User not found"))
}

async fn get_profile(
    Extension(ctx): Extension<AppContext>,
    Path(username): Path<String>,
    ExtractAuth(claims): ExtractAuth,
) -> AppResult<Json<ProfileResponse>> {
    claims.authorize(&username)?;

    let conn = &mut ctx.pool.get().await?;
    let user = find_user(conn, &username).await?;

    Ok(Json(ProfileResponse {
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        profile_pic: user.profile_pic,
    }))
}

/// A new profile picture is only accepted if a HEAD request to it answers 200.
async fn ensure_reachable_url(http: &reqwest::Client, url: &str) -> AppResult<()> {
    let reachable = match http.head(url).send().await {
        Ok(resp) => resp.status() == reqwest::StatusCode::OK,
        Err(_) => false,
    };
    if reachable {
        Ok(())
    } else {
        Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "Invalid profile picture URL",
        ))
    }
}

async fn edit_profile(
    Extension(ctx): Extension<AppContext>,
    Path(username): Path<String>,
    ExtractAuth(claims): ExtractAuth,
    payload: Result<Json<ProfileEdit>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    claims.authorize(&username)?;
    let edit = require_json(payload)?;

    let conn = &mut ctx.pool.get().await?;
    let user = find_user(conn, &username).await?;

    if let Some(url) = &edit.profile_pic {
        ensure_reachable_url(&ctx.http, url).await?;
    }

    if !edit.is_empty() {
        diesel::update(users::table.find(user.id))
            .set(edit)
            .execute(conn)
            .await?;
    }

    Ok(MessageResponse::new("Profile updated successfully"))
}

async fn delete_profile(
    Extension(ctx): Extension<AppContext>,
    Path(username): Path<String>,
    ExtractAuth(claims): ExtractAuth,
) -> AppResult<Json<MessageResponse>> {
    claims.authorize(&username)?;

    let conn = &mut ctx.pool.get().await?;
    let user = find_user(conn, &username).await?;

    let owned_clubs: i64 = book_clubs::table
        .filter(book_clubs::creator_id.eq(user.id))
        .count()
        .get_result(conn)
        .await?;
    if owned_clubs > 0 {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            "Profile still owns book clubs; delete them first",
        ));
    }

    let user_id = user.id;
    conn.transaction::<_, AppError, _>(|conn| {
        async move {
            diesel::delete(club_members::table.filter(club_members::member_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(book_comments::table.filter(book_comments::user_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(messages::table.filter(messages::sender_id.eq(user_id)))
                .execute(conn)
                .await?;
            diesel::delete(users::table.find(user_id))
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(MessageResponse::new("Profile deleted successfully"))
}

pub fn app() -> Router {
    Router::new().route(
        "/profile/:username",
        get(get_profile).patch(edit_profile).delete(delete_profile),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_rejects_unknown_fields() {
        let body = serde_json::json!({ "username": "mallory" });
        assert!(serde_json::from_value::<ProfileEdit>(body).is_err());

        let body = serde_json::json!({ "password_hash": "x" });
        assert!(serde_json::from_value::<ProfileEdit>(body).is_err());
    }

    #[test]
    fn edit_accepts_partial_bodies() {
        let body = serde_json::json!({ "first_name": "Alice" });
        let edit: ProfileEdit = serde_json::from_value(body).unwrap();
        assert_eq!(edit.first_name.as_deref(), Some("Alice"));
        assert!(!edit.is_empty());

        let empty: ProfileEdit = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.is_empty());
    }
}
