use std::env;
use std::str::FromStr;

error_chain! {
    foreign_links {
        Var(env::VarError);
    }

    errors {
        InvalidSetting(name: &'static str, value: String) {
            description("invalid setting")
            display("invalid value for {}: {:?}", name, value)
        }
    }
}

pub const DEFAULT_POPULAR_MIN_READS: i64 = 50;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub pool_size: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    /// Articles need strictly more reads than this to show up as popular.
    pub popular_min_reads: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig> {
        dotenv::dotenv().ok();
        Ok(AppConfig {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "articlee.db".to_string()),
            pool_size: setting("DATABASE_POOL_SIZE", 8)?,
            jwt_secret: env::var("JWT_SECRET")?,
            token_ttl_hours: setting("TOKEN_TTL_HOURS", 24 * 30)?,
            bcrypt_cost: setting("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            popular_min_reads: setting("POPULAR_MIN_READS", DEFAULT_POPULAR_MIN_READS)?,
        })
    }
}

fn setting<T: FromStr>(name: &'static str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ErrorKind::InvalidSetting(name, value).into()),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e.into()),
    }
}
