use diesel::prelude::*;
use regex::Regex;

use crate::db::schema::users;
use crate::types::{ApiError, ValidationError};

lazy_static! {
    static ref EMAIL_RE: Regex = {
        let pattern = r"\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z";
        Regex::new(pattern).expect("email pattern")
    };
    static ref USERNAME_RE: Regex = Regex::new(r"\A[\w.@+-]{3,150}\z").expect("username pattern");
}

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_email_re(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(&email.to_lowercase()) {
        Err(ValidationError::from(
            "email",
            format!("Invalid email: {}", email),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_username_re(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_RE.is_match(username) {
        Err(ValidationError::from(
            "username",
            format!(
                "Invalid username: {} (3 to 150 letters, digits and @/./+/-/_ only)",
                username
            ),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Err(ValidationError::from("password", "Password too short"))
    } else {
        Ok(())
    }
}

/// Is `email` taken by anybody other than `except`?
pub fn email_taken(
    email: &str,
    except: Option<i32>,
    connection: &mut SqliteConnection,
) -> Result<bool, ApiError> {
    let holders = users::table
        .filter(users::email.eq(email))
        .select(users::id)
        .load::<i32>(connection)?;
    Ok(holders.into_iter().any(|id| Some(id) != except))
}

/// Is `username` taken by anybody other than `except`?
pub fn username_taken(
    username: &str,
    except: Option<i32>,
    connection: &mut SqliteConnection,
) -> Result<bool, ApiError> {
    let holders = users::table
        .filter(users::username.eq(username))
        .select(users::id)
        .load::<i32>(connection)?;
    Ok(holders.into_iter().any(|id| Some(id) != except))
}
