//! Read counters, reactions, subscriptions and favorites.
//!
//! Every change to a read counter goes through [`adjust_reads`], which moves
//! a reader's own counter and the article's aggregate by the same amount, so
//! `articles.times_read` always equals the sum of `user_readings.times_read`
//! for that article. Each public operation runs in a single transaction,
//! opened with `BEGIN IMMEDIATE` so it holds the write lock from the start.
//!
//! Actions that bounce the reader back to the article page (like, dislike,
//! comment, favorite) suppress one read up front, because following the
//! redirect registers a fresh view.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::article::Article;
use crate::comment::{Comment, NewComment};
use crate::db::schema::{articles, comments, favorites, reactions, subscriptions, user_readings};
use crate::types::{ApiError, Engagement};
use crate::users::models::User;
use crate::utils::serialize_date;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = user_readings)]
pub struct UserReading {
    #[serde(skip_serializing)]
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub article_id: i32,
    pub times_read: i64,
    #[serde(serialize_with = "serialize_date")]
    pub date_read: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn value(self) -> i32 {
        match self {
            ReactionKind::Like => 1,
            ReactionKind::Dislike => -1,
        }
    }

    pub fn engagement(self) -> Engagement {
        match self {
            ReactionKind::Like => Engagement::Like,
            ReactionKind::Dislike => Engagement::Dislike,
        }
    }
}

/// Where a reader stands on an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    None,
    Liked,
    Disliked,
}

impl ReactionState {
    pub fn from_value(value: Option<i32>) -> ReactionState {
        match value {
            Some(v) if v > 0 => ReactionState::Liked,
            Some(v) if v < 0 => ReactionState::Disliked,
            _ => ReactionState::None,
        }
    }

    pub fn value(self) -> Option<i32> {
        match self {
            ReactionState::None => None,
            ReactionState::Liked => Some(1),
            ReactionState::Disliked => Some(-1),
        }
    }

    /// Pressing the button you already pressed takes the reaction back,
    /// pressing the other one switches to it.
    pub fn toggle(self, kind: ReactionKind) -> ReactionState {
        match (self, kind) {
            (ReactionState::Liked, ReactionKind::Like) => ReactionState::None,
            (ReactionState::Disliked, ReactionKind::Dislike) => ReactionState::None,
            (_, ReactionKind::Like) => ReactionState::Liked,
            (_, ReactionKind::Dislike) => ReactionState::Disliked,
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            ReactionState::None => None,
            ReactionState::Liked => Some("You liked this article"),
            ReactionState::Disliked => Some("You disliked this article"),
        }
    }

    pub fn load(
        conn: &mut SqliteConnection,
        reader: i32,
        article_id: i32,
    ) -> QueryResult<ReactionState> {
        let value = reactions::table
            .filter(reactions::user_id.eq(reader))
            .filter(reactions::article_id.eq(article_id))
            .select(reactions::value)
            .first::<i32>(conn)
            .optional()?;
        Ok(ReactionState::from_value(value))
    }

    fn store(self, conn: &mut SqliteConnection, reader: i32, article_id: i32) -> QueryResult<()> {
        let mine = reactions::table
            .filter(reactions::user_id.eq(reader))
            .filter(reactions::article_id.eq(article_id));
        match self.value() {
            None => {
                diesel::delete(mine).execute(conn)?;
            }
            Some(value) => {
                diesel::insert_into(reactions::table)
                    .values((
                        reactions::user_id.eq(reader),
                        reactions::article_id.eq(article_id),
                        reactions::value.eq(value),
                    ))
                    .on_conflict((reactions::user_id, reactions::article_id))
                    .do_update()
                    .set(reactions::value.eq(value))
                    .execute(conn)?;
            }
        }
        Ok(())
    }
}

/// Outcome of flipping a membership edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// Moves a reader's counter and the article's aggregate together.
fn adjust_reads(
    conn: &mut SqliteConnection,
    reader: i32,
    article_id: i32,
    delta: i64,
) -> QueryResult<()> {
    if delta == 0 {
        return Ok(());
    }
    diesel::update(
        user_readings::table
            .filter(user_readings::user_id.eq(reader))
            .filter(user_readings::article_id.eq(article_id)),
    )
    .set(user_readings::times_read.eq(user_readings::times_read + delta))
    .execute(conn)?;
    diesel::update(articles::table.find(article_id))
        .set(articles::times_read.eq(articles::times_read + delta))
        .execute(conn)?;
    Ok(())
}

pub fn reading(
    conn: &mut SqliteConnection,
    reader: i32,
    article_id: i32,
) -> QueryResult<Option<UserReading>> {
    user_readings::table
        .filter(user_readings::user_id.eq(reader))
        .filter(user_readings::article_id.eq(article_id))
        .select(UserReading::as_select())
        .first(conn)
        .optional()
}

/// Counts a page load. Anonymous loads are not counted.
pub fn record_view(
    conn: &mut SqliteConnection,
    reader: Option<i32>,
    article_id: i32,
) -> Result<Option<UserReading>, ApiError> {
    let reader = match reader {
        Some(reader) => reader,
        None => return Ok(None),
    };

    let reading = conn.immediate_transaction::<_, ApiError, _>(|conn| {
        let now = Utc::now().naive_utc();
        diesel::insert_into(user_readings::table)
            .values((
                user_readings::user_id.eq(reader),
                user_readings::article_id.eq(article_id),
                user_readings::times_read.eq(0i64),
                user_readings::date_read.eq(now),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?;
        adjust_reads(conn, reader, article_id, 1)?;
        diesel::update(
            user_readings::table
                .filter(user_readings::user_id.eq(reader))
                .filter(user_readings::article_id.eq(article_id)),
        )
        .set(user_readings::date_read.eq(now))
        .execute(conn)?;
        reading(conn, reader, article_id)?.ok_or(ApiError::Internal)
    })?;

    debug!(reader, article = article_id, times_read = reading.times_read, "recorded view");
    Ok(Some(reading))
}

/// Takes back one read ahead of a redirect to the article page. Returns
/// whether anything was taken back: nothing is when the reader never read
/// the article or their counter is already at zero.
pub fn suppress_view(conn: &mut SqliteConnection, reader: i32, article_id: i32) -> QueryResult<bool> {
    conn.immediate_transaction(|conn| take_back_read(conn, reader, article_id))
}

/// [`suppress_view`] for callers already inside a transaction.
fn take_back_read(conn: &mut SqliteConnection, reader: i32, article_id: i32) -> QueryResult<bool> {
    match reading(conn, reader, article_id)? {
        Some(reading) if reading.times_read > 0 => {
            adjust_reads(conn, reader, article_id, -1)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Loads the article and the reader's reading of it, failing when the
/// reader has not read it yet.
pub fn require_reading(
    conn: &mut SqliteConnection,
    reader: i32,
    article_id: i32,
    action: Engagement,
) -> Result<(Article, UserReading), ApiError> {
    let article = Article::load(article_id, conn)?;
    let reading = reading(conn, reader, article_id)?.ok_or(ApiError::NotRead(action))?;
    Ok((article, reading))
}

/// Likes or dislikes an article, returning where the reader ends up.
pub fn react(
    conn: &mut SqliteConnection,
    reader: i32,
    article_id: i32,
    kind: ReactionKind,
) -> Result<ReactionState, ApiError> {
    conn.immediate_transaction::<_, ApiError, _>(|conn| {
        require_reading(conn, reader, article_id, kind.engagement())?;
        take_back_read(conn, reader, article_id)?;
        let next = ReactionState::load(conn, reader, article_id)?.toggle(kind);
        next.store(conn, reader, article_id)?;
        debug!(reader, article = article_id, state = ?next, "reaction changed");
        Ok(next)
    })
}

/// Leaves a comment. The body must already be validated.
pub fn comment(
    conn: &mut SqliteConnection,
    commenter: i32,
    article_id: i32,
    body: String,
) -> Result<Comment, ApiError> {
    conn.immediate_transaction::<_, ApiError, _>(|conn| {
        let (article, _) = require_reading(conn, commenter, article_id, Engagement::Comment)?;
        take_back_read(conn, commenter, article_id)?;
        let comment = NewComment {
            article_id,
            user_id: commenter,
            body,
            is_author: article.author_id == commenter,
            created_at: Utc::now().naive_utc(),
        }
        .insert(conn)?;
        info!(commenter, article = article_id, "comment left");
        Ok(comment)
    })
}

pub fn is_subscribed(conn: &mut SqliteConnection, subscriber: i32, author: i32) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        subscriptions::table
            .filter(subscriptions::subscriber_id.eq(subscriber))
            .filter(subscriptions::author_id.eq(author)),
    ))
    .get_result(conn)
}

pub fn toggle_subscription(
    conn: &mut SqliteConnection,
    subscriber: i32,
    author: &User,
) -> Result<Toggle, ApiError> {
    if subscriber == author.id {
        return Err(ApiError::SelfSubscription);
    }
    conn.immediate_transaction::<_, ApiError, _>(|conn| {
        let edge = subscriptions::table
            .filter(subscriptions::subscriber_id.eq(subscriber))
            .filter(subscriptions::author_id.eq(author.id));
        let removed = diesel::delete(edge).execute(conn)?;
        if removed > 0 {
            info!(subscriber, author = %author.username, "unsubscribed");
            return Ok(Toggle::Removed);
        }
        diesel::insert_into(subscriptions::table)
            .values((
                subscriptions::subscriber_id.eq(subscriber),
                subscriptions::author_id.eq(author.id),
            ))
            .execute(conn)?;
        info!(subscriber, author = %author.username, "subscribed");
        Ok(Toggle::Added)
    })
}

pub fn toggle_favorite(
    conn: &mut SqliteConnection,
    owner: i32,
    article_id: i32,
) -> Result<Toggle, ApiError> {
    conn.immediate_transaction::<_, ApiError, _>(|conn| {
        Article::load(article_id, conn)?;
        take_back_read(conn, owner, article_id)?;
        let mine = favorites::table
            .filter(favorites::user_id.eq(owner))
            .filter(favorites::article_id.eq(article_id));
        if diesel::delete(mine).execute(conn)? > 0 {
            return Ok(Toggle::Removed);
        }
        diesel::insert_into(favorites::table)
            .values((
                favorites::user_id.eq(owner),
                favorites::article_id.eq(article_id),
            ))
            .execute(conn)?;
        Ok(Toggle::Added)
    })
}

/// Forgets that a reader ever read an article: their reads come off the
/// article's counter and their reaction and comments on it go away.
pub fn delete_reading(
    conn: &mut SqliteConnection,
    reader: i32,
    article_id: i32,
) -> Result<UserReading, ApiError> {
    conn.immediate_transaction::<_, ApiError, _>(|conn| {
        Article::load(article_id, conn)?;
        let reading = reading(conn, reader, article_id)?.ok_or(ApiError::NotFound("reading"))?;
        adjust_reads(conn, reader, article_id, -reading.times_read)?;
        diesel::delete(
            reactions::table
                .filter(reactions::user_id.eq(reader))
                .filter(reactions::article_id.eq(article_id)),
        )
        .execute(conn)?;
        diesel::delete(
            comments::table
                .filter(comments::user_id.eq(reader))
                .filter(comments::article_id.eq(article_id)),
        )
        .execute(conn)?;
        diesel::delete(&reading).execute(conn)?;
        info!(reader, article = article_id, reads = reading.times_read, "reading deleted");
        Ok(reading)
    })
}

/// Wipes a reader's whole history. Returns how many readings went; zero
/// means there was nothing to clear and nothing was touched.
pub fn clear_history(conn: &mut SqliteConnection, reader: i32) -> Result<usize, ApiError> {
    conn.immediate_transaction::<_, ApiError, _>(|conn| {
        let readings = user_readings::table
            .filter(user_readings::user_id.eq(reader))
            .select(UserReading::as_select())
            .load(conn)?;
        if readings.is_empty() {
            return Ok(0);
        }

        diesel::delete(reactions::table.filter(reactions::user_id.eq(reader))).execute(conn)?;
        diesel::delete(comments::table.filter(comments::user_id.eq(reader))).execute(conn)?;
        for reading in &readings {
            adjust_reads(conn, reader, reading.article_id, -reading.times_read)?;
        }
        diesel::delete(user_readings::table.filter(user_readings::user_id.eq(reader)))
            .execute(conn)?;

        info!(reader, readings = readings.len(), "reading history cleared");
        Ok(readings.len())
    })
}
