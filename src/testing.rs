//! Fixtures for unit tests that talk to an in-memory database.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;

use crate::article::Article;
use crate::db::schema::articles;
use crate::tags::{self, Tag};
use crate::users::models::{NewUser, User};

pub fn user(conn: &mut SqliteConnection, name: &str) -> User {
    NewUser {
        username: name.to_string(),
        email: format!("{}@example.org", name),
        password_hash: "not-a-real-hash".to_string(),
        image: None,
    }
    .insert(conn)
    .unwrap()
}

pub fn article(conn: &mut SqliteConnection, author: &User, title: &str, tag_names: &[&str]) -> Article {
    article_on(conn, author, title, tag_names, Utc::now().date_naive())
}

pub fn article_on(
    conn: &mut SqliteConnection,
    author: &User,
    title: &str,
    tag_names: &[&str],
    pub_date: NaiveDate,
) -> Article {
    let article = diesel::insert_into(articles::table)
        .values((
            articles::author_id.eq(author.id),
            articles::title.eq(title),
            articles::content.eq(format!("All about {}", title)),
            articles::image.eq("cover.png"),
            articles::times_read.eq(0i64),
            articles::pub_date.eq(pub_date),
        ))
        .returning(Article::as_returning())
        .get_result(conn)
        .unwrap();
    Tag::set_for_article(article.id, &tags::normalize(tag_names), conn).unwrap();
    article
}

/// Sets an article's aggregate counter directly, bypassing readings.
pub fn set_reads(conn: &mut SqliteConnection, article: &Article, times_read: i64) {
    diesel::update(articles::table.find(article.id))
        .set(articles::times_read.eq(times_read))
        .execute(conn)
        .unwrap();
}
