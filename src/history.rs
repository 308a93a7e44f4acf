use diesel::prelude::*;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use std::collections::HashMap;

use crate::article::{Article, ArticleView};
use crate::db::schema::user_readings;
use crate::db::Pool;
use crate::engagement::{self, UserReading};
use crate::types::{ApiError, ApiResult};
use crate::users::CurrentUser;
use crate::utils::MessageResponse;

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    reading: UserReading,
    article: ArticleView,
}

#[derive(Debug, Serialize)]
pub struct History {
    message: &'static str,
    readings: Vec<HistoryEntry>,
}

/// What the reader has read, most recent first.
#[get("/reading_history")]
pub fn history(pool: &State<Pool>, user: CurrentUser) -> ApiResult<History> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let readings = user_readings::table
        .filter(user_readings::user_id.eq(user.id))
        .order((user_readings::date_read.desc(), user_readings::id.desc()))
        .select(UserReading::as_select())
        .load(conn)?;

    let ids = readings.iter().map(|r| r.article_id).collect::<Vec<_>>();
    let mut views = ArticleView::for_articles(Article::load_many(&ids, conn)?, conn)?
        .into_iter()
        .map(|view| (view.id, view))
        .collect::<HashMap<_, _>>();
    let readings = readings
        .into_iter()
        .filter_map(|reading| {
            let article = views.remove(&reading.article_id)?;
            Some(HistoryEntry { reading, article })
        })
        .collect::<Vec<_>>();

    let message = if readings.is_empty() {
        "Your reading history is empty"
    } else {
        "This is your reading history"
    };
    Ok(Json(History { message, readings }))
}

#[post("/reading_history/clear")]
pub fn clear(pool: &State<Pool>, user: CurrentUser) -> Result<Json<MessageResponse>, ApiError> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    match engagement::clear_history(conn, user.id)? {
        0 => Ok(MessageResponse::new("Your reading history is already empty")),
        _ => Ok(MessageResponse::new(
            "You successfully cleared your reading history",
        )),
    }
}

#[delete("/reading_history/<article_id>")]
pub fn delete(
    pool: &State<Pool>,
    user: CurrentUser,
    article_id: i32,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    engagement::delete_reading(conn, user.id, article_id)?;
    Ok(MessageResponse::new(
        "Article was deleted from your reading history",
    ))
}
