use diesel::prelude::*;
use rocket::http::RawStr;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

use crate::article::{Article, ArticleView, Flashed};
use crate::db::schema::{subscriptions, users};
use crate::db::Pool;
use crate::engagement::{self, Toggle};
use crate::social::SocialMedia;
use crate::types::{ApiError, ApiResult, Bounce};
use crate::users::models::{Profile, User};
use crate::users::CurrentUser;

pub fn author_location(username: &str) -> String {
    format!(
        "/api/public/authors/{}",
        RawStr::new(username).percent_encode()
    )
}

fn subscriber_count(connection: &mut SqliteConnection, author_id: i32) -> QueryResult<i64> {
    subscriptions::table
        .filter(subscriptions::author_id.eq(author_id))
        .count()
        .get_result(connection)
}

/// An author's articles, newest first, with what they add up to.
#[derive(Debug, Serialize)]
pub struct Portfolio {
    articles: Vec<ArticleView>,
    number_of_articles: usize,
    /// `None` when the author has published nothing.
    total_readings: Option<i64>,
    subscribers: i64,
    social_media: Vec<SocialMedia>,
}

impl Portfolio {
    fn load(author: &User, connection: &mut SqliteConnection) -> QueryResult<Portfolio> {
        let articles = Article::by_author(author.id, connection)?;
        let total_readings = if articles.is_empty() {
            None
        } else {
            Some(articles.iter().map(|a| a.times_read).sum())
        };
        Ok(Portfolio {
            number_of_articles: articles.len(),
            total_readings,
            subscribers: subscriber_count(connection, author.id)?,
            social_media: SocialMedia::for_user(author.id, connection)?,
            articles: ArticleView::for_articles(articles, connection)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorPage {
    author: Profile,
    #[serde(flatten)]
    portfolio: Portfolio,
    subscribed: bool,
    is_owner: bool,
    flash: Option<Flashed>,
}

#[get("/authors/<author>")]
pub fn author_page(
    pool: &State<Pool>,
    viewer: Option<User>,
    author: &str,
    flash: Option<FlashMessage<'_>>,
) -> ApiResult<AuthorPage> {
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let author = User::load_by_name(author, conn)?;
    let subscribed = match &viewer {
        Some(viewer) => engagement::is_subscribed(conn, viewer.id, author.id)?,
        None => false,
    };

    Ok(Json(AuthorPage {
        portfolio: Portfolio::load(&author, conn)?,
        is_owner: viewer.map_or(false, |v| v.id == author.id),
        author: author.profile(),
        subscribed,
        flash: flash.map(Flashed::from),
    }))
}

#[post("/authors/<author>/subscribe")]
pub fn subscribe(pool: &State<Pool>, user: Option<User>, author: &str) -> Bounce {
    let back = Redirect::to(author_location(author));
    let user = match user {
        Some(user) => user,
        None => {
            return Ok(Flash::new(
                back,
                "info",
                "To subscribe you need to be an authenticated user",
            ))
        }
    };
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let author = User::load_by_name(author, conn)?;

    match engagement::toggle_subscription(conn, user.id, &author) {
        Ok(Toggle::Added) => Ok(Flash::success(
            back,
            "You successfully subscribed to this author",
        )),
        Ok(Toggle::Removed) => Ok(Flash::success(
            back,
            "You successfully unsubscribed from this author",
        )),
        Err(ApiError::SelfSubscription) => Ok(Flash::new(
            back,
            "info",
            ApiError::SelfSubscription.to_string(),
        )),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Serialize)]
pub struct PersonalPage {
    user: Profile,
    #[serde(flatten)]
    portfolio: Portfolio,
    subscriptions: i64,
}

#[get("/")]
pub fn personal_page(pool: &State<Pool>, user: CurrentUser) -> ApiResult<PersonalPage> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let subscriptions = subscriptions::table
        .filter(subscriptions::subscriber_id.eq(user.id))
        .count()
        .get_result(conn)?;

    Ok(Json(PersonalPage {
        portfolio: Portfolio::load(&user, conn)?,
        user: user.profile(),
        subscriptions,
    }))
}

#[derive(Debug, Serialize)]
pub struct Subscriptions {
    authors: Vec<Profile>,
}

/// Authors the caller is subscribed to, by name.
#[get("/subscriptions")]
pub fn subscribed_authors(pool: &State<Pool>, user: CurrentUser) -> ApiResult<Subscriptions> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let authors = subscriptions::table
        .inner_join(users::table.on(users::id.eq(subscriptions::author_id)))
        .filter(subscriptions::subscriber_id.eq(user.id))
        .order(users::username.asc())
        .select(User::as_select())
        .load(conn)?
        .iter()
        .map(User::profile)
        .collect();
    Ok(Json(Subscriptions { authors }))
}
