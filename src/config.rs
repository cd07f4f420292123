use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use crate::{constants::DEFAULT_FONT_SIZE, error::CoreError};

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub shopping_list_font: Option<PathBuf>,
    pub shopping_list_font_size: f32,
    pub database_max_connections: u32,
}

impl Config {
    /// Reads the process environment, after loading `.env` when present.
    pub fn load() -> Result<Self, CoreError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_owned()),
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            shopping_list_font: lookup("SHOPPING_LIST_FONT")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            shopping_list_font_size: try_load(&lookup, "SHOPPING_LIST_FONT_SIZE", DEFAULT_FONT_SIZE)?,
            database_max_connections: try_load(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CoreError::Fatal(format!("Environment variable {key} is not set")))
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e| {
            log::warn!("Invalid {key} value: {e}");
            CoreError::Fatal(format!("Invalid value for {key}"))
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, CoreError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn fills_in_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("JWT_SECRET", "s3cret"),
        ])
        .unwrap();

        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.shopping_list_font, None);
        assert_eq!(config.shopping_list_font_size, DEFAULT_FONT_SIZE);
        assert_eq!(config.database_max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("JWT_SECRET", "s3cret"),
            ("SHOPPING_LIST_FONT", "/usr/share/fonts/Verdana.ttf"),
            ("SHOPPING_LIST_FONT_SIZE", "11.5"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
        ])
        .unwrap();

        assert_eq!(
            config.shopping_list_font,
            Some(PathBuf::from("/usr/share/fonts/Verdana.ttf"))
        );
        assert_eq!(config.shopping_list_font_size, 11.5);
        assert_eq!(config.database_max_connections, 20);
    }

    #[test]
    fn missing_secret_is_fatal() {
        let result = load(&[("DATABASE_URL", "postgres://localhost/foodgram")]);

        assert!(matches!(result, Err(CoreError::Fatal(_))));
    }

    #[test]
    fn unparsable_number_is_fatal() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
        ]);

        assert!(matches!(result, Err(CoreError::Fatal(_))));
    }
}
