use chrono::{Duration, NaiveDate, Utc};
use diesel::prelude::*;
use rocket::Either;
use rocket::http::RawStr;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;

use crate::article::{Article, ArticleList};
use crate::config::AppConfig;
use crate::db::schema::{article_tags, articles, subscriptions, users};
use crate::db::Pool;
use crate::tags::Tag;
use crate::types::{ApiError, ApiResult};
use crate::users::CurrentUser;
use crate::utils::count_message;

pub const POPULAR_WINDOW_DAYS: i64 = 7;
pub const POPULAR_LIMIT: i64 = 10;

#[get("/tags/<tag>")]
pub fn by_tag(pool: &State<Pool>, tag: &str) -> ApiResult<ArticleList> {
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let tag = Tag::find_by_name(tag, conn)?.ok_or(ApiError::NotFound("tag"))?;
    let list = articles::table
        .inner_join(article_tags::table)
        .filter(article_tags::tag_id.eq(tag.id))
        .order((articles::times_read.desc(), articles::id.desc()))
        .select(Article::as_select())
        .load(conn)?;

    let message = count_message(
        list.len(),
        &format!("No articles were found with this tag #{}", tag.name),
        &format!("One article was found with this tag #{}", tag.name),
        |n| format!("{} articles were found with this tag #{}", n, tag.name),
    );
    ArticleList::new(message, list, conn)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    search_string: String,
}

/// What a search box entry asks for.
#[derive(Debug, PartialEq)]
enum SearchTerm<'a> {
    Tag(&'a str),
    Text(&'a str),
}

fn parse_search(input: &str) -> Option<SearchTerm<'_>> {
    let input = input.trim();
    match input.strip_prefix('#') {
        Some(tag) if tag.trim().is_empty() => None,
        Some(tag) => Some(SearchTerm::Tag(tag.trim())),
        None if input.is_empty() => None,
        None => Some(SearchTerm::Text(input)),
    }
}

/// Escapes `LIKE` wildcards so user input only ever matches literally.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Title or author name search. `#tag` jumps to the tag listing.
#[post("/search", format = "json", data = "<query>")]
pub fn search(
    pool: &State<Pool>,
    query: Json<SearchQuery>,
) -> Result<Either<Json<ArticleList>, Redirect>, ApiError> {
    let text = match parse_search(&query.search_string) {
        None => return Err(ApiError::NotFound("search term")),
        Some(SearchTerm::Tag(tag)) => {
            let location = format!("/api/public/tags/{}", RawStr::new(tag).percent_encode());
            return Ok(Either::Right(Redirect::to(location)));
        }
        Some(SearchTerm::Text(text)) => text,
    };

    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let pattern = like_pattern(text);
    let list = articles::table
        .inner_join(users::table)
        .filter(
            articles::title
                .like(&pattern)
                .escape('\\')
                .or(users::username.like(&pattern).escape('\\')),
        )
        .order((articles::times_read.desc(), articles::id.desc()))
        .select(Article::as_select())
        .load(conn)?;

    let message = count_message(
        list.len(),
        &format!("No articles were found that contain ---{}--- in author's name or title", text),
        &format!("1 article was found that contains ---{}--- in author's name or title", text),
        |n| format!("{} articles were found that contain ---{}--- in author's name or title", n, text),
    );
    ArticleList::new(message, list, conn).map(Either::Left)
}

fn popular_since(
    today: NaiveDate,
    min_reads: i64,
    connection: &mut SqliteConnection,
) -> QueryResult<Vec<Article>> {
    let window = Duration::days(POPULAR_WINDOW_DAYS);
    articles::table
        .filter(articles::pub_date.gt(today - window))
        .filter(articles::pub_date.lt(today + window))
        .filter(articles::times_read.gt(min_reads))
        .order((articles::times_read.desc(), articles::id.desc()))
        .limit(POPULAR_LIMIT)
        .select(Article::as_select())
        .load(connection)
}

#[get("/articles/popular")]
pub fn popular(pool: &State<Pool>, config: &State<AppConfig>) -> ApiResult<ArticleList> {
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let list = popular_since(Utc::now().date_naive(), config.popular_min_reads, conn)?;
    ArticleList::new(
        "You are seeing the most popular articles in recent time".to_string(),
        list,
        conn,
    )
}

/// Articles sharing a tag with anything written by the authors `reader`
/// subscribes to, newest first.
fn recommended_for(reader: i32, connection: &mut SqliteConnection) -> QueryResult<Vec<Article>> {
    let followed = subscriptions::table
        .filter(subscriptions::subscriber_id.eq(reader))
        .select(subscriptions::author_id)
        .load::<i32>(connection)?;
    let followed_articles = articles::table
        .filter(articles::author_id.eq_any(&followed))
        .select(articles::id)
        .load::<i32>(connection)?;
    let tag_ids = Tag::ids_for_articles(&followed_articles, connection)?;
    let ids = article_tags::table
        .filter(article_tags::tag_id.eq_any(&tag_ids))
        .select(article_tags::article_id)
        .distinct()
        .load::<i32>(connection)?;

    articles::table
        .filter(articles::id.eq_any(&ids))
        .order((articles::pub_date.desc(), articles::id.desc()))
        .select(Article::as_select())
        .load(connection)
}

#[get("/articles/recommended")]
pub fn recommended(pool: &State<Pool>, user: CurrentUser) -> ApiResult<ArticleList> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let list = recommended_for(user.id, conn)?;
    ArticleList::new(
        "Here are the articles recommended for you".to_string(),
        list,
        conn,
    )
}
