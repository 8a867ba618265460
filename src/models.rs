use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Queryable, Identifiable)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(belongs_to(User, foreign_key = creator_id))]
#[diesel(table_name = book_clubs)]
pub struct BookClub {
    pub id: i32,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub creator_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(BookClub, foreign_key = club_id))]
#[diesel(belongs_to(User, foreign_key = member_id))]
pub struct ClubMember {
    pub id: i32,
    pub club_id: i32,
    pub member_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(BookClub, foreign_key = club_id))]
#[diesel(belongs_to(Book))]
pub struct CurrentBook {
    pub id: i32,
    pub club_id: i32,
    pub book_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(BookClub, foreign_key = club_id))]
#[diesel(belongs_to(Book))]
pub struct PreviouslyReadBook {
    pub id: i32,
    pub club_id: i32,
    pub book_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Book))]
pub struct BookComment {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub comment: String,
    pub rating: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(User, foreign_key = sender_id))]
#[diesel(belongs_to(BookClub, foreign_key = club_id))]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub club_id: i32,
    pub message: String,
    pub created_at: NaiveDateTime,
}
