//! Writes the identifiers the reverse proxy reads.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::dto::Pk;
use crate::config::AUTH_CONFIG_FILE;
use crate::error::BootstrapResult;

/// Timestamp format of `created_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Contents of `auth_config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfigRecord {
    /// Proxy provider primary key.
    pub provider_id: Pk,
    /// Application primary key.
    pub application_id: Pk,
    /// Time of the run, `YYYY-MM-DD HH:MM:SS` local time.
    pub created_at: String,
}

impl AuthConfigRecord {
    /// Creates a record stamped with `at`.
    pub fn new(provider_id: Pk, application_id: Pk, at: DateTime<Local>) -> Self {
        Self {
            provider_id,
            application_id,
            created_at: at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Writes `record` to `<dir>/auth_config.json`, replacing any previous file.
///
/// The directory is created if it does not exist.
pub fn write_auth_config(dir: &Path, record: &AuthConfigRecord) -> BootstrapResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(AUTH_CONFIG_FILE);
    let content = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, content)?;

    info!(path = %path.display(), "saved auth configuration");
    Ok(path)
}
