use std::{
    env,
    fmt::{self, Display},
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
};

use chrono::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub secret_key: String,
    pub bind_address: SocketAddr,
    pub media_root: PathBuf,
    pub media_url: String,
    pub token_lifetime_hours: i64,
}

impl Config {
    /// Reads the configuration from the environment (after `.env`, if present).
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379/")?,
            secret_key: required("SECRET_KEY")?,
            bind_address: try_load("BIND_ADDRESS", "0.0.0.0:8000")?,
            media_root: try_load("MEDIA_ROOT", "media")?,
            media_url: with_trailing_slash(try_load("MEDIA_URL", "/media/")?),
            token_lifetime_hours: try_load("TOKEN_LIFETIME_HOURS", "24")?,
        })
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::hours(self.token_lifetime_hours)
    }

    /// Public URL of a stored media file.
    pub fn media_link(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path)
    }
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment misconfigured: {}", self.info)
    }
}

impl std::error::Error for ConfigError {}

fn required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError {
        info: format!("{key} is not set"),
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| ConfigError {
            info: format!("invalid {key} value: {e}"),
        })
}

fn with_trailing_slash(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_gets_trailing_slash() {
        assert_eq!(with_trailing_slash("/media".to_string()), "/media/");
        assert_eq!(with_trailing_slash("/media/".to_string()), "/media/");
    }

    #[test]
    fn defaults_parse() {
        let port: SocketAddr = try_load("FOODGRAM_TEST_UNSET_ADDRESS", "127.0.0.1:9000").unwrap();
        assert_eq!(port.port(), 9000);

        let error = try_load::<u32>("FOODGRAM_TEST_UNSET_NUMBER", "many").unwrap_err();
        assert!(error.to_string().contains("FOODGRAM_TEST_UNSET_NUMBER"));
    }
}
