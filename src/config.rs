//! Environment-driven settings.
//!
//! Variables are read after `.env` has been loaded:
//!
//! | Variable             | Default                                              |
//! |----------------------|------------------------------------------------------|
//! | `POSTGRES_DB_STRING` | required for database access                         |
//! | `CATALOG_DB_NAME`    | `streamlit_tracks`                                   |
//! | `GPS_DB_NAME`        | `gps_data`                                           |
//! | `SSL_ROOT_CERT`      | unset (no certificate verification)                  |
//! | `IMAGE_BASE_URL`     | `https://cattracker2.blob.core.windows.net/tracks/cats` |
//! | `LOG_FILE_PATH`      | `logs/cattracks.log`                                 |

use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_CATALOG_DB: &str = "streamlit_tracks";
pub const DEFAULT_GPS_DB: &str = "gps_data";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://cattracker2.blob.core.windows.net/tracks/cats";
pub const DEFAULT_LOG_FILE: &str = "logs/cattracks.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub catalog_db: String,
    pub gps_db: String,
    pub ssl_root_cert: Option<PathBuf>,
    pub image_base_url: String,
    pub log_file_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            database_url: get("POSTGRES_DB_STRING"),
            catalog_db: get("CATALOG_DB_NAME").unwrap_or_else(|| DEFAULT_CATALOG_DB.to_string()),
            gps_db: get("GPS_DB_NAME").unwrap_or_else(|| DEFAULT_GPS_DB.to_string()),
            ssl_root_cert: get("SSL_ROOT_CERT").map(PathBuf::from),
            image_base_url: get("IMAGE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE_URL.to_string()),
            log_file_path: get("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("POSTGRES_DB_STRING must be set")
    }
}
