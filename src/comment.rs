use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::response::Flash;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::article::back_to_article;
use crate::db::schema::{comments, users};
use crate::db::Pool;
use crate::engagement;
use crate::types::{ApiError, Bounce, Engagement, Validate, ValidationError};
use crate::users::models::{Profile, User};
use crate::utils::serialize_date;

pub const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub article_id: i32,
    pub user_id: i32,
    pub body: String,
    pub is_author: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub article_id: i32,
    pub user_id: i32,
    pub body: String,
    pub is_author: bool,
    pub created_at: NaiveDateTime,
}

impl NewComment {
    pub fn insert(self, connection: &mut SqliteConnection) -> QueryResult<Comment> {
        diesel::insert_into(comments::table)
            .values(&self)
            .returning(Comment::as_returning())
            .get_result(connection)
    }
}

#[derive(Serialize, Debug)]
pub struct CommentView {
    id: i32,
    #[serde(serialize_with = "serialize_date")]
    created_at: NaiveDateTime,
    body: String,
    is_author: bool,
    author: Profile,
}

impl From<(Comment, User)> for CommentView {
    fn from((comment, commenter): (Comment, User)) -> Self {
        CommentView {
            id: comment.id,
            created_at: comment.created_at,
            body: comment.body,
            is_author: comment.is_author,
            author: commenter.profile(),
        }
    }
}

impl Comment {
    /// Comments on an article with their authors, oldest first.
    pub fn load_for_article(
        article_id: i32,
        connection: &mut SqliteConnection,
    ) -> QueryResult<Vec<CommentView>> {
        let rows = comments::table
            .inner_join(users::table)
            .filter(comments::article_id.eq(article_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .select((Comment::as_select(), User::as_select()))
            .load::<(Comment, User)>(connection)?;
        Ok(rows.into_iter().map(CommentView::from).collect())
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    body: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentContainer {
    comment: CommentBody,
}

impl Validate for CommentContainer {
    type Error = ValidationError;
    fn validate(self, _connection: &mut SqliteConnection) -> Result<Self, ValidationError> {
        let body = self.comment.body.trim();
        let mut error = ValidationError::default();
        if body.is_empty() {
            error.add_error("body", "empty comment");
        } else if body.chars().count() > MAX_COMMENT_LEN {
            error.add_error(
                "body",
                format!("comment longer than {} characters", MAX_COMMENT_LEN),
            );
        }
        error.into_result(self)
    }
}

#[post("/articles/<article_id>/comment", format = "json", data = "<details>")]
pub fn add(
    pool: &State<Pool>,
    user: Option<User>,
    article_id: i32,
    details: Json<CommentContainer>,
) -> Bounce {
    let user = match user {
        Some(user) => user,
        None => {
            return Ok(Flash::new(
                back_to_article(article_id),
                "info",
                "To leave a comment, please, become an authenticated user",
            ))
        }
    };
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let not_read = |action: Engagement| Flash::warning(back_to_article(article_id), action.warning());

    // A missing or unread article outranks a bad body.
    match engagement::require_reading(conn, user.id, article_id, Engagement::Comment) {
        Ok(_) => {}
        Err(ApiError::NotRead(action)) => return Ok(not_read(action)),
        Err(e) => return Err(e),
    }
    let body = details.validate(conn)?.into_inner().comment.body;

    match engagement::comment(conn, user.id, article_id, body.trim().to_string()) {
        Ok(_) => Ok(Flash::success(
            back_to_article(article_id),
            "You successfully left a comment on this article",
        )),
        Err(ApiError::NotRead(action)) => Ok(not_read(action)),
        Err(e) => Err(e),
    }
}
