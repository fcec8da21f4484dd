mod file_config;

pub use file_config::FileConfig;

use crate::lastfm::{DEFAULT_PAGE_SIZE, LASTFM_API_BASE};
use crate::sync::{RefreshOptions, SyncOptions};
use crate::timestamp::{convert_to_timestamp, DateZone, TimestampError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 250;
const API_KEY_LEN: usize = 32;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be specified on the command line or in the config file")]
    Missing(&'static str),

    #[error("api_key must be 32 alphanumeric characters")]
    InvalidApiKey,

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error(transparent)]
    InvalidDate(#[from] TimestampError),

    #[error("Database directory does not exist: {0:?}")]
    MissingDirectory(PathBuf),
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub db_path: Option<PathBuf>,
    pub base_url: String,
    pub request_timeout_sec: u64,
    pub page_size: u32,
    pub first_page: u32,
    pub request_delay_ms: u64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub date_zone: DateZone,
    pub refresh_limit: Option<usize>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            username: None,
            db_path: None,
            base_url: LASTFM_API_BASE.to_string(),
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
            page_size: DEFAULT_PAGE_SIZE,
            first_page: 1,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            start_date: None,
            end_date: None,
            date_zone: DateZone::Utc,
            refresh_limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub username: String,
    pub db_path: PathBuf,
    pub base_url: String,
    pub request_timeout_sec: u64,
    pub page_size: u32,
    pub first_page: u32,
    pub request_delay_ms: u64,

    /// Start of the scrobble window, epoch seconds.
    pub from: Option<i64>,
    /// End of the scrobble window, epoch seconds.
    pub to: Option<i64>,

    pub refresh_limit: Option<usize>,
}

pub fn is_valid_api_key(api_key: &str) -> bool {
    api_key.len() == API_KEY_LEN && api_key.chars().all(|c| c.is_ascii_alphanumeric())
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self, ConfigError> {
        let file = file_config.unwrap_or_default();

        let api_key = file
            .api_key
            .clone()
            .or_else(|| cli.api_key.clone())
            .ok_or(ConfigError::Missing("api_key"))?;
        if !is_valid_api_key(&api_key) {
            return Err(ConfigError::InvalidApiKey);
        }

        let username = file
            .username
            .clone()
            .or_else(|| cli.username.clone())
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("username"))?;

        let db_path = Self::resolve_db_path(cli, Some(&file))?;

        let base_url = file.base_url.unwrap_or_else(|| cli.base_url.clone());
        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        let request_delay_ms = file.request_delay_ms.unwrap_or(cli.request_delay_ms);

        let page_size = file.page_size.unwrap_or(cli.page_size);
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        let first_page = file.first_page.unwrap_or(cli.first_page);
        if first_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "first_page",
                reason: "pages are numbered from 1".to_string(),
            });
        }

        let date_zone = file.date_zone.unwrap_or(cli.date_zone);
        let start_date = file.start_date.or_else(|| cli.start_date.clone());
        let end_date = file.end_date.or_else(|| cli.end_date.clone());
        let from = convert_to_timestamp(start_date.as_deref().map(Into::into), date_zone)?;
        let to = convert_to_timestamp(end_date.as_deref().map(Into::into), date_zone)?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ConfigError::InvalidValue {
                    field: "end_date",
                    reason: "must not be before start_date".to_string(),
                });
            }
        }

        let refresh_limit = file.refresh_limit.or(cli.refresh_limit);

        Ok(AppConfig {
            api_key,
            username,
            db_path,
            base_url,
            request_timeout_sec,
            page_size,
            first_page,
            request_delay_ms,
            from,
            to,
            refresh_limit,
        })
    }

    /// Resolves only the database location, for commands that never reach
    /// the API.
    pub fn resolve_db_path(
        cli: &CliConfig,
        file_config: Option<&FileConfig>,
    ) -> Result<PathBuf, ConfigError> {
        let db_path = file_config
            .and_then(|file| file.db_path.clone())
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or(ConfigError::Missing("db_path"))?;
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(ConfigError::MissingDirectory(parent.to_path_buf()));
            }
        }
        Ok(db_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    pub fn request_delay(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.request_delay_ms)).filter(|d| !d.is_zero())
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            page_size: self.page_size,
            first_page: self.first_page,
            delay: self.request_delay(),
            from: self.from,
            to: self.to,
        }
    }

    /// Refresh settings for a run at `now`, considering entities not
    /// refreshed within the last `max_age_days`.
    pub fn refresh_options(&self, now: i64, max_age_days: Option<u64>) -> RefreshOptions {
        RefreshOptions {
            cutoff: max_age_days.map(|days| {
                let age = i64::try_from(days)
                    .unwrap_or(i64::MAX)
                    .saturating_mul(SECONDS_PER_DAY);
                now.saturating_sub(age)
            }),
            limit: self.refresh_limit,
            delay: self.request_delay(),
            now,
        }
    }
}
