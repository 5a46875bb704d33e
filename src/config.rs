use std::env;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite:nouncil.db";
const DEFAULT_NOUNS_API_URL: &str = "https://nouns-indexer-live-9834f536b6ce.herokuapp.com/";
const DEFAULT_NOUNS_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NOUNS_API_RETRIES: u32 = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub guild_id: String,
    /// Discord channel whose polls are the Nouncil governance votes.
    pub channel_id: String,
    pub nouns_api_url: String,
    pub nouns_api_timeout: Duration,
    pub nouns_api_retries: u32,
}

impl Config {
    /// Reads the configuration from the process environment, loading `.env`
    /// first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let nouns_api_timeout = match lookup("NOUNS_API_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_number("NOUNS_API_TIMEOUT_SECS", value)?),
            None => Duration::from_secs(DEFAULT_NOUNS_API_TIMEOUT_SECS),
        };
        let nouns_api_retries = match lookup("NOUNS_API_RETRIES") {
            Some(value) => parse_number("NOUNS_API_RETRIES", value)?,
            None => DEFAULT_NOUNS_API_RETRIES,
        };

        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            guild_id: required("NOUNCIL_GUILD_ID")?,
            channel_id: required("NOUNCIL_CHANNEL_ID")?,
            nouns_api_url: lookup("NOUNS_API_URL")
                .unwrap_or_else(|| DEFAULT_NOUNS_API_URL.to_string()),
            nouns_api_timeout,
            nouns_api_retries,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
