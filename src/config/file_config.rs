use crate::timestamp::DateZone;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Settings read from the optional TOML file. Every field overrides the
/// command line value when present.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Account
    pub api_key: Option<String>,
    pub username: Option<String>,

    // Storage
    pub db_path: Option<String>,

    // Last.fm access
    pub base_url: Option<String>,
    pub request_timeout_sec: Option<u64>,
    pub page_size: Option<u32>,
    pub first_page: Option<u32>,
    pub request_delay_ms: Option<u64>,

    // Sync window, as YYYY-MM-DD
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub date_zone: Option<DateZone>,

    pub refresh_limit: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
