use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use crate::error::FoodgramError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub media_root: PathBuf,
    pub session_secret: String,
    pub data_dir: PathBuf,
}

impl Config {
    /// Reads the environment, loading a `.env` file first when one exists.
    pub fn load() -> Result<Self, FoodgramError> {
        if dotenv::dotenv().is_err() {
            log::trace!("No .env file found");
        }

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| FoodgramError::Config(String::from("DATABASE_URL must be set")))?;

        Ok(Self {
            database_url,
            redis_url: var("REDIS_URL"),
            port: try_load("PORT", 8000),
            media_root: PathBuf::from(var("MEDIA_ROOT").unwrap_or_else(|| String::from("media"))),
            session_secret: var("SESSION_SECRET").unwrap_or_else(|| {
                log::warn!("SESSION_SECRET not set, using the development secret");
                String::from("secret")
            }),
            data_dir: PathBuf::from(var("DATA_DIR").unwrap_or_else(|| String::from("data"))),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value.parse().unwrap_or_else(|e| {
            log::warn!("Invalid {key} value '{value}': {e}, using default: {default}");
            default
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_fall_back_to_default() {
        env::set_var("FOODGRAM_TEST_PORT_INVALID", "not-a-port");
        assert_eq!(try_load::<u16>("FOODGRAM_TEST_PORT_INVALID", 8000), 8000);

        env::set_var("FOODGRAM_TEST_PORT_VALID", "9100");
        assert_eq!(try_load::<u16>("FOODGRAM_TEST_PORT_VALID", 8000), 9100);
    }

    #[test]
    fn blank_values_count_as_unset() {
        env::set_var("FOODGRAM_TEST_BLANK", "   ");
        assert_eq!(var("FOODGRAM_TEST_BLANK"), None);
    }
}
