#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

pub mod article;
pub mod comment;
pub mod config;
pub mod db;
pub mod engagement;
pub mod favorite;
pub mod history;
pub mod profile;
pub mod reaction;
pub mod search;
pub mod social;
pub mod tags;
pub mod types;
pub mod users;
pub mod utils;

#[cfg(test)]
mod testing;

use rocket::serde::json::{json, Value};
use rocket::{Build, Rocket};

use crate::config::AppConfig;

#[catch(401)]
fn unauthorized() -> Value {
    json!({ "errors": { "status": "401 Unauthorized" } })
}

#[catch(404)]
fn not_found() -> Value {
    json!({ "errors": ["entity not found"] })
}

#[catch(422)]
fn unprocessable() -> Value {
    json!({ "errors": ["request body could not be understood"] })
}

#[catch(500)]
fn internal_error() -> Value {
    json!({ "errors": ["internal server error"] })
}

/// Builds the service: pool and configuration in managed state, every route
/// mounted, JSON catchers registered.
pub fn rocket(config: AppConfig) -> db::Result<Rocket<Build>> {
    let pool = db::init_pool(&config)?;
    Ok(rocket::build()
        .manage(pool)
        .manage(config)
        .mount("/api/users", routes![users::register, users::login])
        .mount("/api", routes![users::current, users::update])
        .mount(
            "/api/personal",
            routes![
                profile::personal_page,
                profile::subscribed_authors,
                article::publish,
                article::update,
                article::delete,
                reaction::liked,
                reaction::disliked,
                favorite::list,
                favorite::toggle,
                social::add,
                social::delete,
                history::history,
                history::clear,
                history::delete,
            ],
        )
        .mount(
            "/api/public",
            routes![
                article::public_article,
                reaction::like,
                reaction::dislike,
                comment::add,
                profile::author_page,
                profile::subscribe,
                search::by_tag,
                search::search,
                search::popular,
                search::recommended,
            ],
        )
        .register(
            "/",
            catchers![unauthorized, not_found, unprocessable, internal_error],
        ))
}
