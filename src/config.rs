use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_PAGE_SIZE: usize = 7;

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub database_url: String,
    pub auth_token: Option<String>,
    pub poll_interval: Duration,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns the raw value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("FIREBASE_DATABASE_URL")
            .ok_or_else(|| AppError::Config("FIREBASE_DATABASE_URL is not set".to_string()))?;
        if database_url.trim().is_empty() {
            return Err(AppError::Config("FIREBASE_DATABASE_URL is empty".to_string()));
        }

        let auth_token = lookup("FIREBASE_AUTH").filter(|t| !t.trim().is_empty());
        let poll_secs = parse_positive(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS as usize)?;

        Ok(Self {
            auth_token,
            poll_interval: Duration::from_secs(poll_secs as u64),
            ..Self::new(database_url.trim())
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub page_size: usize,
    pub export_dir: PathBuf,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let store = StoreConfig::from_lookup(&lookup)?;
        let page_size = parse_positive(&lookup, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let export_dir = lookup("EXPORT_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            store,
            page_size,
            export_dir,
        })
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize, AppError> {
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(AppError::Config(format!("{} must be a positive integer, got {:?}", key, raw))),
        },
        None => Ok(default),
    }
}
