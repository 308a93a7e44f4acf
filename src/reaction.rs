use diesel::prelude::*;
use rocket::response::Flash;
use rocket::State;

use crate::article::{back_to_article, Article, ArticleList};
use crate::db::schema::reactions;
use crate::db::Pool;
use crate::engagement::{self, ReactionKind};
use crate::types::{ApiError, ApiResult, Bounce};
use crate::users::models::User;
use crate::users::CurrentUser;
use crate::utils::count_message;

/// Likes and dislikes an article has collected.
pub fn counts(connection: &mut SqliteConnection, article_id: i32) -> QueryResult<(i64, i64)> {
    let of_value = |value: i32, connection: &mut SqliteConnection| {
        reactions::table
            .filter(reactions::article_id.eq(article_id))
            .filter(reactions::value.eq(value))
            .count()
            .get_result::<i64>(connection)
    };
    Ok((of_value(1, connection)?, of_value(-1, connection)?))
}

fn react(pool: &State<Pool>, user: Option<User>, article_id: i32, kind: ReactionKind) -> Bounce {
    let back = back_to_article(article_id);
    let user = match user {
        Some(user) => user,
        None => {
            return Ok(Flash::new(
                back,
                "info",
                "To leave a reaction, please, become an authenticated user",
            ))
        }
    };
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;

    match engagement::react(conn, user.id, article_id, kind) {
        Ok(state) => Ok(Flash::success(
            back,
            state.message().unwrap_or("You took your reaction back"),
        )),
        Err(ApiError::NotRead(action)) => Ok(Flash::warning(back, action.warning())),
        Err(e) => Err(e),
    }
}

#[post("/articles/<article_id>/like")]
pub fn like(pool: &State<Pool>, user: Option<User>, article_id: i32) -> Bounce {
    react(pool, user, article_id, ReactionKind::Like)
}

#[post("/articles/<article_id>/dislike")]
pub fn dislike(pool: &State<Pool>, user: Option<User>, article_id: i32) -> Bounce {
    react(pool, user, article_id, ReactionKind::Dislike)
}

fn reacted(pool: &State<Pool>, user: CurrentUser, kind: ReactionKind) -> ApiResult<ArticleList> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let ids = reactions::table
        .filter(reactions::user_id.eq(user.id))
        .filter(reactions::value.eq(kind.value()))
        .select(reactions::article_id)
        .load::<i32>(conn)?;

    let message = match kind {
        ReactionKind::Like => count_message(
            ids.len(),
            "You have not liked any articles yet",
            "You totally liked 1 article",
            |n| format!("You totally liked {} articles", n),
        ),
        ReactionKind::Dislike => count_message(
            ids.len(),
            "You have not disliked any articles yet",
            "You totally disliked 1 article",
            |n| format!("You totally disliked {} articles", n),
        ),
    };
    let list = Article::load_many(&ids, conn)?;
    ArticleList::new(message, list, conn)
}

#[get("/articles/liked")]
pub fn liked(pool: &State<Pool>, user: CurrentUser) -> ApiResult<ArticleList> {
    reacted(pool, user, ReactionKind::Like)
}

#[get("/articles/disliked")]
pub fn disliked(pool: &State<Pool>, user: CurrentUser) -> ApiResult<ArticleList> {
    reacted(pool, user, ReactionKind::Dislike)
}
