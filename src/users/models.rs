use chrono::{Duration, Utc};
use diesel::prelude::*;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::db::schema::users;
use crate::types::ApiError;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, AsChangeset, Serialize)]
#[diesel(table_name = users, treat_none_as_null = true)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    exp: i64,
}

impl User {
    pub fn make_password(password: &str, config: &AppConfig) -> Result<String, ApiError> {
        Ok(bcrypt::hash(password, config.bcrypt_cost)?)
    }

    pub fn new_password(&mut self, password: &str, config: &AppConfig) -> Result<(), ApiError> {
        self.password_hash = User::make_password(password, config)?;
        Ok(())
    }

    pub fn verify_password(&self, password_to_verify: &str) -> Result<bool, ApiError> {
        Ok(bcrypt::verify(password_to_verify, &self.password_hash)?)
    }

    pub fn token(&self, config: &AppConfig) -> Result<String, ApiError> {
        let claims = Claims {
            sub: self.id.to_string(),
            iss: self.email.clone(),
            exp: (Utc::now() + Duration::hours(config.token_ttl_hours)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .map_err(|_| ApiError::Internal)
    }

    /// Resolves a token back to its user. A token stops working once the
    /// user changes the e-mail it was issued for.
    pub fn load_from_token(
        token: &str,
        config: &AppConfig,
        connection: &mut SqliteConnection,
    ) -> Result<User, ApiError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;
        let user_id = data
            .claims
            .sub
            .parse::<i32>()
            .map_err(|_| ApiError::Unauthorized)?;

        users::table
            .filter(users::id.eq(user_id))
            .filter(users::email.eq(&data.claims.iss))
            .select(User::as_select())
            .first(connection)
            .optional()?
            .ok_or(ApiError::Unauthorized)
    }

    pub fn load_by_name(name: &str, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        users::table
            .filter(users::username.eq(name))
            .select(User::as_select())
            .first(connection)
            .optional()?
            .ok_or(ApiError::NotFound("author"))
    }

    pub fn profile(&self) -> Profile {
        Profile {
            username: self.username.clone(),
            image: self.image.clone(),
        }
    }
}

/// The public face of a user, as shown next to articles and comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub username: String,
    pub image: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub image: Option<String>,
}

impl NewUser {
    pub fn insert(self, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        Ok(diesel::insert_into(users::table)
            .values(&self)
            .returning(User::as_returning())
            .get_result(connection)?)
    }
}

/// What a client gets back after registering, logging in or updating.
#[derive(Debug, Serialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub email: String,
    pub image: Option<String>,
    pub token: String,
}

impl AuthenticatedUser {
    pub fn new(user: User, config: &AppConfig) -> Result<AuthenticatedUser, ApiError> {
        let token = user.token(config)?;
        Ok(AuthenticatedUser {
            username: user.username,
            email: user.email,
            image: user.image,
            token,
        })
    }
}
