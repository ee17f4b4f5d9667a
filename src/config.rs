use log::{info, warn};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    /// `None` opens a temporary database.
    pub db_path: Option<PathBuf>,
    pub templates: String,
    pub cookie_key: Vec<u8>,
    pub secure_cookies: bool,
    pub session_ttl: i64,
    pub events_cache_ttl: u64,
    pub bcrypt_cost: u32,
    pub seed: bool,
}

pub const DEFAULT_TEMPLATES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*");

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1:8080".to_owned(),
            db_path: None,
            templates: DEFAULT_TEMPLATES.to_owned(),
            cookie_key: vec![0u8; 32],
            secure_cookies: false,
            session_ttl: 3600,
            events_cache_ttl: 300,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            seed: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let cookie_key = match var("CALENDAR_COOKIE_KEY") {
            Some(key) if key.len() >= 32 => key.into_bytes(),
            Some(_) => {
                return Err(ConfigError::Invalid {
                    key: "CALENDAR_COOKIE_KEY",
                    message: "must be at least 32 bytes".to_owned(),
                })
            }
            None => {
                warn!("CALENDAR_COOKIE_KEY not set, using an insecure development key");
                defaults.cookie_key
            }
        };
        let bcrypt_cost = try_load("CALENDAR_BCRYPT_COST", defaults.bcrypt_cost)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "CALENDAR_BCRYPT_COST",
                message: format!("{} is outside 4..=31", bcrypt_cost),
            });
        }
        Ok(Config {
            bind: try_load("CALENDAR_BIND", defaults.bind)?,
            db_path: var("CALENDAR_DB_PATH").map(PathBuf::from),
            templates: try_load("CALENDAR_TEMPLATES", defaults.templates)?,
            cookie_key,
            secure_cookies: try_load("CALENDAR_SECURE_COOKIES", defaults.secure_cookies)?,
            session_ttl: try_load("CALENDAR_SESSION_TTL", defaults.session_ttl)?,
            events_cache_ttl: try_load("CALENDAR_EVENTS_CACHE_TTL", defaults.events_cache_ttl)?,
            bcrypt_cost,
            seed: try_load("CALENDAR_SEED", defaults.seed)?,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value.parse().map_err(|e: T::Err| {
            warn!("Invalid {} value: {}", key, e);
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        }),
        None => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
