use diesel::prelude::*;
use regex::Regex;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::schema::social_media;
use crate::db::Pool;
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::users::CurrentUser;
use crate::utils::MessageResponse;

pub const MAX_PLATFORM_LEN: usize = 64;

lazy_static! {
    static ref LINK_RE: Regex = Regex::new(r"\A(?i:https?)://[^\s/$.?#][^\s]*\z").expect("link pattern");
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = social_media)]
pub struct SocialMedia {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub platform: String,
    pub link: String,
}

impl SocialMedia {
    pub fn for_user(user_id: i32, connection: &mut SqliteConnection) -> QueryResult<Vec<SocialMedia>> {
        social_media::table
            .filter(social_media::user_id.eq(user_id))
            .order(social_media::id.asc())
            .select(SocialMedia::as_select())
            .load(connection)
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkDetails {
    platform: String,
    link: String,
}

#[derive(Debug, Deserialize)]
pub struct NewLink {
    social_media: LinkDetails,
}

impl Validate for NewLink {
    type Error = ValidationError;
    fn validate(self, _connection: &mut SqliteConnection) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();
        let platform = self.social_media.platform.trim();
        if platform.is_empty() {
            error.add_error("platform", "empty platform");
        } else if platform.chars().count() > MAX_PLATFORM_LEN {
            error.add_error(
                "platform",
                format!("platform longer than {} characters", MAX_PLATFORM_LEN),
            );
        }
        if !LINK_RE.is_match(self.social_media.link.trim()) {
            error.add_error(
                "link",
                format!("Invalid link: {}", self.social_media.link),
            );
        }
        error.into_result(self)
    }
}

#[derive(Debug, Serialize)]
pub struct SocialMediaResponse {
    social_media: SocialMedia,
}

#[post("/social_media", format = "json", data = "<link>")]
pub fn add(pool: &State<Pool>, user: CurrentUser, link: Json<NewLink>) -> ApiResult<SocialMediaResponse> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let details = link.validate(conn)?.into_inner().social_media;

    let social_media = diesel::insert_into(social_media::table)
        .values((
            social_media::user_id.eq(user.id),
            social_media::platform.eq(details.platform.trim()),
            social_media::link.eq(details.link.trim()),
        ))
        .returning(SocialMedia::as_returning())
        .get_result(conn)?;
    info!(user = %user.username, platform = %social_media.platform, "added social media link");
    Ok(Json(SocialMediaResponse { social_media }))
}

#[delete("/social_media/<link_id>")]
pub fn delete(
    pool: &State<Pool>,
    user: CurrentUser,
    link_id: i32,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = user?;
    let mut pooled = pool.get()?;
    let conn: &mut SqliteConnection = &mut pooled;
    let link = social_media::table
        .find(link_id)
        .select(SocialMedia::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound("social media link"))?;
    if link.user_id != user.id {
        return Err(ApiError::Forbidden);
    }
    diesel::delete(&link).execute(conn)?;
    Ok(MessageResponse::new("Social media link was deleted"))
}
