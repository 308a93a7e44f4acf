use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use rocket::request::FlashMessage;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::comment::{Comment, CommentView};
use crate::db::schema::{articles, users};
use crate::db::Pool;
use crate::engagement::{self, ReactionState};
use crate::favorite;
use crate::reaction;
use crate::tags::{self, Tag};
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::users::models::{Profile, User};
use crate::users::CurrentUser;
use crate::utils::MessageResponse;

pub const MAX_TITLE_LEN: usize = 255;

/// Where the public page of an article lives. Actions on an article bounce
/// back here.
pub fn article_location(article_id: i32) -> String {
    format!("/api/public/articles/{}", article_id)
}

pub fn back_to_article(article_id: i32) -> Redirect {
    Redirect::to(article_location(article_id))
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = articles)]
pub struct Article {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub image: String,
    pub times_read: i64,
    pub pub_date: NaiveDate,
}

impl Article {
    pub fn load(article_id: i32, connection: &mut SqliteConnection) -> Result<Article, ApiError> {
        articles::table
            .find(article_id)
            .select(Article::as_select())
            .first(connection)
            .optional()?
            .ok_or(ApiError::NotFound("article"))
    }

    /// Loads an article for a change only its author may make.
    pub fn load_owned(
        article_id: i32,
        owner: &User,
        connection: &mut SqliteConnection,
    ) -> Result<Article, ApiError> {
        let article = Article::load(article_id, connection)?;
        if article.author_id != owner.id {
            return Err(ApiError::Forbidden);
        }
        Ok(article)
    }

    pub fn load_many(ids: &[i32], connection: &mut SqliteConnection) -> QueryResult<Vec<Article>> {
        articles::table
            .filter(articles::id.eq_any(ids))
            .order((articles::times_read.desc(), articles::id.desc()))
            .select(Article::as_select())
            .load(connection)
    }

    pub fn by_author(author_id: i32, connection: &mut SqliteConnection) -> QueryResult<Vec<Article>> {
        articles::table
            .filter(articles::author_id.eq(author_id))
            .order((articles::pub_date.desc(), articles::id.desc()))
            .select(Article::as_select())
            .load(connection)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub image: String,
    pub times_read: i64,
    pub pub_date: NaiveDate,
    pub author: Profile,
    pub tags: Vec<String>,
}

impl ArticleView {
    /// Attaches authors and tags to a list of articles, keeping their order.
    pub fn for_articles(
        list: Vec<Article>,
        connection: &mut SqliteConnection,
    ) -> QueryResult<Vec<ArticleView>> {
        let ids = list.iter().map(|a| a.id).collect::<Vec<_>>();
        let author_ids = list.iter().map(|a| a.author_id).collect::<Vec<_>>();
        let mut tag_names = Tag::names_for_articles(&ids, connection)?;
        let authors = users::table
            .filter(users::id.eq_any(&author_ids))
            .select(User::as_select())
            .load(connection)?
            .into_iter()
            .map(|user| (user.id, user.profile()))
            .collect::<HashMap<_, _>>();

        Ok(list
            .into_iter()
            .filter_map(|article| {
                let author = authors.get(&article.author_id)?.clone();
                Some(ArticleView {
                    tags: tag_names.remove(&article.id).unwrap_or_default(),
                    id: article.id,
                    title: article.title,
                    content: article.content,
                    image: article.image,
                    times_read: article.times_read,
                    pub_date: article.pub_date,
                    author,
                })
            })
            .collect())
    }

    pub fn for_article(article: Article, connection: &mut SqliteConnection) -> QueryResult<ArticleView> {
        ArticleView::for_articles(vec![article], connection)?
            .pop()
            .ok_or(diesel::result::Error::NotFound)
    }
}

/// A listing page: a human-readable summary plus the articles themselves.
#[derive(Debug, Serialize)]
pub struct ArticleList {
    pub message: String,
    pub articles: Vec<ArticleView>,
}

impl ArticleList {
    pub fn new(
        message: String,
        list: Vec<Article>,
        connection: &mut SqliteConnection,
    ) -> ApiResult<ArticleList> {
        Ok(Json(ArticleList {
            message,
            articles: ArticleView::for_articles(list, connection)?,
        }))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = articles)]
struct NewArticle {
    author_id: i32,
    title: String,
    content: String,
    image: String,
    times_read: i64,
    pub_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ArticleDetails {
    title: String,
    content: String,
    image: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishArticle {
    article: ArticleDetails,
}

fn check_title(title: &str, errors: &mut ValidationError) {
    if title.trim().is_empty() {
        errors.add_error("title", "empty title");
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.add_error(
            "title",
            format!("title longer than {} characters", MAX_TITLE_LEN),
        );
    }
}

impl Validate for PublishArticle {
    type Error = ValidationError;
    fn validate(self, _connection: &mut SqliteConnection) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();
        check_title(&self.article.title, &mut error);

        if self.article.content.trim().is_empty() {
            error.add_error("content", "empty content");
        }

        if self.article.image.trim().is_empty() {
            error.add_error("image", "empty image");
        }

        error.into_result(self)
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    article: ArticleView,
}

#[post("/articles", format = "json", data = "<publish>")]
pub fn publish(
    pool: &State<Pool>,
    user: CurrentUser,
    publish: Json<PublishArticle>,
) -> ApiResult<ArticleResponse> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let publish = publish.validate(conn)?.into_inner().article;
    let tag_names = tags::normalize(&publish.tags);

    let article = conn.immediate_transaction::<_, ApiError, _>(|conn| {
        let article = diesel::insert_into(articles::table)
            .values(&NewArticle {
                author_id: user.id,
                title: publish.title.trim().to_string(),
                content: publish.content,
                image: publish.image.trim().to_string(),
                times_read: 0,
                pub_date: Utc::now().date_naive(),
            })
            .returning(Article::as_returning())
            .get_result(conn)?;
        Tag::set_for_article(article.id, &tag_names, conn)?;
        Ok(article)
    })?;

    info!(article = article.id, author = %user.username, "published article");
    Ok(Json(ArticleResponse {
        article: ArticleView::for_article(article, conn)?,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDetails {
    title: Option<String>,
    content: Option<String>,
    image: Option<String>,
    tags: Option<Vec<String>>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = articles)]
struct ArticleChanges {
    title: Option<String>,
    content: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticle {
    article: UpdateDetails,
}

impl Validate for UpdateArticle {
    type Error = ValidationError;
    fn validate(self, _connection: &mut SqliteConnection) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();
        if let Some(title) = &self.article.title {
            check_title(title, &mut error);
        }
        if let Some(content) = &self.article.content {
            if content.trim().is_empty() {
                error.add_error("content", "empty content");
            }
        }
        if let Some(image) = &self.article.image {
            if image.trim().is_empty() {
                error.add_error("image", "empty image");
            }
        }
        error.into_result(self)
    }
}

#[put("/articles/<article_id>", format = "json", data = "<update>")]
pub fn update(
    pool: &State<Pool>,
    user: CurrentUser,
    article_id: i32,
    update: Json<UpdateArticle>,
) -> ApiResult<ArticleResponse> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let article = Article::load_owned(article_id, &user, conn)?;
    let details = update.validate(conn)?.into_inner().article;
    let changes = ArticleChanges {
        title: details.title.map(|t| t.trim().to_string()),
        content: details.content,
        image: details.image.map(|i| i.trim().to_string()),
    };

    let article = conn.immediate_transaction::<_, ApiError, _>(|conn| {
        if let Some(names) = &details.tags {
            Tag::set_for_article(article.id, &tags::normalize(names), conn)?;
        }
        if changes.title.is_none() && changes.content.is_none() && changes.image.is_none() {
            return Ok(article);
        }
        Ok(diesel::update(articles::table.find(article.id))
            .set(&changes)
            .returning(Article::as_returning())
            .get_result(conn)?)
    })?;

    Ok(Json(ArticleResponse {
        article: ArticleView::for_article(article, conn)?,
    }))
}

#[delete("/articles/<article_id>")]
pub fn delete(
    pool: &State<Pool>,
    user: CurrentUser,
    article_id: i32,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let article = Article::load_owned(article_id, &user, conn)?;
    diesel::delete(&article).execute(conn)?;
    info!(article = article.id, "deleted article");
    Ok(MessageResponse::new("Your article was successfully deleted"))
}

/// A flash message left by the previous action, surfaced on the next page.
#[derive(Debug, Serialize)]
pub struct Flashed {
    kind: String,
    text: String,
}

impl From<FlashMessage<'_>> for Flashed {
    fn from(flash: FlashMessage<'_>) -> Flashed {
        Flashed {
            kind: flash.kind().to_string(),
            text: flash.message().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicArticle {
    article: ArticleView,
    likes: i64,
    dislikes: i64,
    comments: Vec<CommentView>,
    user_reaction_message: Option<&'static str>,
    in_favorites: bool,
    flash: Option<Flashed>,
}

/// The public page of an article. Every load by a signed-in reader counts
/// as a read.
#[get("/articles/<article_id>")]
pub fn public_article(
    pool: &State<Pool>,
    user: Option<User>,
    article_id: i32,
    flash: Option<FlashMessage<'_>>,
) -> ApiResult<PublicArticle> {
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let article = Article::load(article_id, conn)?;
    engagement::record_view(conn, user.as_ref().map(|u| u.id), article.id)?;
    // reload so the page shows the count including this read
    let article = Article::load(article.id, conn)?;

    let (user_reaction_message, in_favorites) = match &user {
        Some(user) => {
            let state = ReactionState::load(conn, user.id, article.id)?;
            (
                state.message(),
                favorite::is_favorite(conn, user.id, article.id)?,
            )
        }
        None => (None, false),
    };
    let (likes, dislikes) = reaction::counts(conn, article.id)?;
    let comments = Comment::load_for_article(article.id, conn)?;

    Ok(Json(PublicArticle {
        article: ArticleView::for_article(article, conn)?,
        likes,
        dislikes,
        comments,
        user_reaction_message,
        in_favorites,
        flash: flash.map(Flashed::from),
    }))
}
