//! CLI configuration: data directory resolution and sync profile.
//!
//! Precedence for every value: command-line flag, then environment
//! variable, then the profile file, then the built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CliError;

pub const DATA_DIR_ENV: &str = "TOUCHLINE_DATA_DIR";
pub const SYNC_URL_ENV: &str = "TOUCHLINE_SYNC_URL";
pub const SYNC_TOKEN_ENV: &str = "TOUCHLINE_SYNC_TOKEN";

const PROFILE_FILE: &str = "profile.json";

/// Persisted profile values (safe-to-ship endpoint config, never queue
/// state)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Profile {
    #[serde(default)]
    pub sync_url: Option<String>,
    #[serde(default)]
    pub sync_token: Option<String>,
}

/// Fully resolved CLI configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub sync_url: Option<String>,
    pub sync_token: Option<String>,
}

impl CliConfig {
    /// State-store directory (separate from the profile file so storage
    /// keys never collide with configuration)
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }
}

/// Resolve configuration for this invocation
pub fn resolve(data_dir_flag: Option<PathBuf>) -> Result<CliConfig, CliError> {
    let data_dir = resolve_data_dir(data_dir_flag)?;
    let profile = load_profile(&data_dir)?;

    Ok(CliConfig {
        sync_url: env_or(SYNC_URL_ENV, profile.sync_url),
        sync_token: env_or(SYNC_TOKEN_ENV, profile.sync_token),
        data_dir,
    })
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|base| base.join("touchline"))
        .ok_or_else(|| CliError::Config("could not determine a data directory".to_string()))
}

fn load_profile(data_dir: &Path) -> Result<Profile, CliError> {
    let path = data_dir.join(PROFILE_FILE);
    match fs::read_to_string(&path) {
        Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
            CliError::Config(format!("invalid profile file {}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Profile::default()),
        Err(e) => Err(CliError::Config(format!(
            "reading profile file {}: {e}",
            path.display()
        ))),
    }
}

fn env_or(key: &str, fallback: Option<String>) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| fallback.and_then(normalize))
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_profile_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let profile = load_profile(dir.path()).unwrap();
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn profile_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let written = Profile {
            sync_url: Some("https://api.example.com/sync".to_string()),
            sync_token: Some("tok".to_string()),
        };
        fs::write(
            dir.path().join(PROFILE_FILE),
            serde_json::to_string(&written).unwrap(),
        )
        .unwrap();

        assert_eq!(load_profile(dir.path()).unwrap(), written);
    }

    #[test]
    fn invalid_profile_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROFILE_FILE), "{nope").unwrap();
        assert!(load_profile(dir.path()).is_err());
    }

    #[test]
    fn blank_profile_values_normalize_to_none() {
        assert_eq!(env_or("TOUCHLINE_TEST_UNSET", Some("  ".to_string())), None);
        assert_eq!(
            env_or("TOUCHLINE_TEST_UNSET", Some(" url ".to_string())),
            Some("url".to_string())
        );
    }
}
