use diesel::result::Error as DieselError;
use diesel::SqliteConnection;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Flash, Redirect, Responder};
use rocket::serde::json::{json, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::error;

use crate::utils::try_respond;

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error>;
}

/// Something a reader has to have read before they may do it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Like,
    Dislike,
    Comment,
}

impl Engagement {
    pub fn warning(self) -> &'static str {
        match self {
            Engagement::Like => "Do not try to leave like without reading an article",
            Engagement::Dislike => "Do not try to leave dislike without reading an article",
            Engagement::Comment => "Do not try to leave comment without reading an article",
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Diesel(DieselError),
    Pool(r2d2::Error),
    Validation(ValidationError),
    NotFound(&'static str),
    Forbidden,
    NotRead(Engagement),
    SelfSubscription,
    Internal,
    Unauthorized,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Diesel(e) => write!(f, "database error: {}", e),
            ApiError::Pool(e) => write!(f, "connection pool error: {}", e),
            ApiError::Validation(e) => write!(f, "validation failed on {} field(s)", e.len()),
            ApiError::NotFound(what) => write!(f, "{} does not exist", what),
            ApiError::Forbidden => write!(f, "this is not yours"),
            ApiError::NotRead(action) => write!(f, "{}", action.warning()),
            ApiError::SelfSubscription => write!(f, "You cannot subscribe to yourself"),
            ApiError::Internal => write!(f, "internal error"),
            ApiError::Unauthorized => write!(f, "401 Unauthorized"),
        }
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        ApiError::Diesel(err)
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> ApiError {
        ApiError::Pool(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::Validation(err)
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> ApiError {
        error!("password hashing failed: {}", err);
        ApiError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(_: jsonwebtoken::errors::Error) -> ApiError {
        ApiError::Unauthorized
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Result of an action that sends the browser back to a page with a message.
pub type Bounce = Result<Flash<Redirect>, ApiError>;

#[derive(Debug, Serialize, Default)]
pub struct ValidationError(BTreeMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_default();
        entry.push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            let entry = self.0.entry(key).or_default();
            entry.extend(errors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Ok(value)` when nothing was recorded, the collected errors otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self {
            ApiError::Diesel(DieselError::NotFound) => {
                let body = json!({ "errors": ["entity does not exist"] });
                try_respond(req, &body, Status::NotFound)
            }
            ApiError::Diesel(e) => {
                error!("database error: {}", e);
                Err(Status::InternalServerError)
            }
            ApiError::Pool(e) => {
                error!("could not get a database connection: {}", e);
                Err(Status::ServiceUnavailable)
            }
            ApiError::Validation(error) => {
                let body = json!({ "errors": error });
                try_respond(req, &body, Status::UnprocessableEntity)
            }
            ApiError::Unauthorized => {
                let body = json!({ "errors": {
                    "status": "401 Unauthorized"
                }});
                try_respond(req, &body, Status::Unauthorized)
            }
            ApiError::NotFound(_) => {
                let body = json!({ "errors": [self.to_string()] });
                try_respond(req, &body, Status::NotFound)
            }
            ApiError::Forbidden => {
                let body = json!({ "errors": [self.to_string()] });
                try_respond(req, &body, Status::Forbidden)
            }
            ApiError::NotRead(_) | ApiError::SelfSubscription => {
                let body = json!({ "errors": [self.to_string()] });
                try_respond(req, &body, Status::UnprocessableEntity)
            }
            ApiError::Internal => Err(Status::InternalServerError),
        }
    }
}

impl<T> Validate for Json<T>
where
    T: Validate,
{
    type Error = <T as Validate>::Error;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let inner = self.into_inner();
        let validated = inner.validate(connection)?;
        Ok(Json(validated))
    }
}
