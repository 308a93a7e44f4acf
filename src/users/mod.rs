use diesel::prelude::*;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::db::schema::users;
use crate::db::Pool;
use crate::types::{ApiError, ApiResult, Validate, ValidationError};

pub mod models;
mod utils;

use self::models::{AuthenticatedUser, NewUser, User};
use self::utils::*;

pub type CurrentUser = Result<User, ApiError>;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    user: AuthenticatedUser,
}

#[derive(Debug, Deserialize)]
struct RegistrationDetails {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    user: RegistrationDetails,
}

impl Validate for Registration {
    type Error = ApiError;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();
        let details = &self.user;

        match validate_username_re(&details.username) {
            Err(e) => errors.merge(e),
            Ok(_) => {
                if username_taken(&details.username, None, connection)? {
                    errors.add_error("username", "username already exists");
                }
            }
        }

        match validate_email_re(&details.email) {
            Err(e) => errors.merge(e),
            Ok(_) => {
                if email_taken(&details.email, None, connection)? {
                    errors.add_error("email", "Email already exists");
                }
            }
        }

        if let Err(e) = validate_password(&details.password) {
            errors.merge(e);
        }

        Ok(errors.into_result(self)?)
    }
}

#[post("/", format = "json", data = "<registration>")]
pub fn register(
    pool: &State<Pool>,
    config: &State<AppConfig>,
    registration: Json<Registration>,
) -> ApiResult<UserResponse> {
    let mut connection = pool.get()?;
    let registration = registration.validate(&mut connection)?.into_inner();
    let details = registration.user;
    let user = NewUser {
        username: details.username,
        email: details.email,
        password_hash: User::make_password(&details.password, config)?,
        image: details.image.filter(|image| !image.trim().is_empty()),
    }
    .insert(&mut connection)?;

    info!(user = %user.username, "registered new user");
    Ok(Json(UserResponse {
        user: AuthenticatedUser::new(user, config)?,
    }))
}

#[derive(Debug, Deserialize)]
struct LoginDetails {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Login {
    user: LoginDetails,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = request
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Token "))
            .map(str::trim);
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Outcome::Error((Status::Unauthorized, ApiError::Unauthorized)),
        };

        let rocket = request.rocket();
        let (pool, config) = match (rocket.state::<Pool>(), rocket.state::<AppConfig>()) {
            (Some(pool), Some(config)) => (pool, config),
            _ => return Outcome::Error((Status::InternalServerError, ApiError::Internal)),
        };
        let mut connection = match pool.get() {
            Ok(connection) => connection,
            Err(e) => return Outcome::Error((Status::ServiceUnavailable, ApiError::Pool(e))),
        };

        match User::load_from_token(token, config, &mut connection) {
            Ok(user) => Outcome::Success(user),
            Err(ApiError::Unauthorized) => {
                Outcome::Error((Status::Unauthorized, ApiError::Unauthorized))
            }
            Err(e) => Outcome::Error((Status::InternalServerError, e)),
        }
    }
}

#[post("/login", format = "json", data = "<login>")]
pub fn login(
    pool: &State<Pool>,
    config: &State<AppConfig>,
    login: Json<Login>,
) -> ApiResult<UserResponse> {
    let mut connection = pool.get()?;
    let user = match User::load_by_name(&login.user.username, &mut connection) {
        Ok(user) => Some(user),
        Err(ApiError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    match user {
        Some(user) if user.verify_password(&login.user.password)? => Ok(Json(UserResponse {
            user: AuthenticatedUser::new(user, config)?,
        })),
        _ => Err(ValidationError::from("password", "Invalid username or password").into()),
    }
}

#[get("/user")]
pub fn current(user: CurrentUser, config: &State<AppConfig>) -> ApiResult<UserResponse> {
    Ok(Json(UserResponse {
        user: AuthenticatedUser::new(user?, config)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub user: UpdateUser,
}

#[put("/user", format = "json", data = "<update>")]
pub fn update(
    current_user: CurrentUser,
    pool: &State<Pool>,
    config: &State<AppConfig>,
    update: Json<Update>,
) -> ApiResult<UserResponse> {
    let mut user = current_user?;
    let mut connection = pool.get()?;
    let mut error = ValidationError::default();
    let update = update.into_inner().user;

    if let Some(new_image) = update.image {
        user.image = Some(new_image).filter(|i| !i.trim().is_empty());
    }

    if let Some(new_email) = update.email {
        match validate_email_re(&new_email) {
            Err(e) => error.merge(e),
            Ok(_) => {
                if email_taken(&new_email, Some(user.id), &mut connection)? {
                    error.add_error("email", format!("Email already chosen: {}", new_email));
                } else {
                    user.email = new_email;
                }
            }
        }
    }

    if let Some(new_username) = update.username {
        match validate_username_re(&new_username) {
            Err(e) => error.merge(e),
            Ok(_) => {
                if username_taken(&new_username, Some(user.id), &mut connection)? {
                    error.add_error(
                        "username",
                        format!("Username already chosen: {}", new_username),
                    );
                } else {
                    user.username = new_username;
                }
            }
        }
    }

    if let Some(new_password) = update.password {
        match validate_password(&new_password) {
            Err(e) => error.merge(e),
            Ok(_) => user.new_password(&new_password, config)?,
        }
    }

    if !error.is_empty() {
        return Err(error.into());
    }

    diesel::update(users::table.find(user.id))
        .set(&user)
        .execute(&mut *connection)?;
    Ok(Json(UserResponse {
        user: AuthenticatedUser::new(user, config)?,
    }))
}
