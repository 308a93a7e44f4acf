use diesel::prelude::*;
use rocket::response::Flash;
use rocket::State;

use crate::article::{back_to_article, Article, ArticleList};
use crate::db::schema::favorites;
use crate::db::Pool;
use crate::engagement::{self, Toggle};
use crate::types::{ApiResult, Bounce};
use crate::users::models::User;
use crate::users::CurrentUser;
use crate::utils::count_message;

pub fn is_favorite(connection: &mut SqliteConnection, owner: i32, article_id: i32) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        favorites::table
            .filter(favorites::user_id.eq(owner))
            .filter(favorites::article_id.eq(article_id)),
    ))
    .get_result(connection)
}

#[post("/articles/favorites/<article_id>")]
pub fn toggle(pool: &State<Pool>, user: Option<User>, article_id: i32) -> Bounce {
    let back = back_to_article(article_id);
    let user = match user {
        Some(user) => user,
        None => {
            return Ok(Flash::new(
                back,
                "info",
                "You cannot add an article to \"Favorites\" while you are not authenticated",
            ))
        }
    };
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;

    let message = match engagement::toggle_favorite(conn, user.id, article_id)? {
        Toggle::Added => "You successfully added this article to your \"Favorites\"",
        Toggle::Removed => "You successfully deleted this article from your \"Favorites\"",
    };
    Ok(Flash::success(back, message))
}

#[get("/articles/favorites")]
pub fn list(pool: &State<Pool>, user: CurrentUser) -> ApiResult<ArticleList> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let ids = favorites::table
        .filter(favorites::user_id.eq(user.id))
        .select(favorites::article_id)
        .load::<i32>(conn)?;

    let message = count_message(
        ids.len(),
        "You have no favorite article",
        "You have 1 favorite article",
        |n| format!("You have {} favorite articles", n),
    );
    let list = Article::load_many(&ids, conn)?;
    ArticleList::new(message, list, conn)
}
