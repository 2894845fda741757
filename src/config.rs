use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set in environment variables")]
    Missing(&'static str),
    #[error("PSYCHOLOGIST_ID must be a numeric Telegram chat id")]
    BadPsychologistId,
}

/// Startup configuration. A missing or malformed value aborts the process
/// before any update is served.
#[derive(Debug, Clone)]
pub struct Config {
    pub psychologist_id: i64,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Bot::from_env reads the token itself; we only check it is present
        // so the failure happens here instead of inside teloxide.
        env::var("TELOXIDE_TOKEN").map_err(|_| ConfigError::Missing("TELOXIDE_TOKEN"))?;

        let psychologist_id = env::var("PSYCHOLOGIST_ID")
            .map_err(|_| ConfigError::Missing("PSYCHOLOGIST_ID"))?
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::BadPsychologistId)?;

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Config {
            psychologist_id,
            database_url,
        })
    }
}
