//! Configuration loading for the CRM sync service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `ZENITH_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `ZENITH_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Directory holding the persisted JSON state file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Override for the Airtable API base URL (tests point this at a mock).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airtable_api_base: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            data_dir: default_data_dir(),
            airtable_api_base: None,
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Path of the persisted key-value state file.
    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("crm_sync_state.json")
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid airtable api base '{value}': {source}")]
    InvalidAirtableApiBase {
        value: String,
        source: url::ParseError,
    },
}

/// Loads configuration using layered `.env` files and `ZENITH_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration.
    ///
    /// Precedence, lowest to highest: `.env`, `.env.local`,
    /// `.env.<profile>`, `.env.<profile>.local`, process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("ZENITH_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let data_dir = layered
            .remove("DATA_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let airtable_api_base = layered
            .remove("AIRTABLE_API_BASE")
            .filter(|v| !v.is_empty());

        if let Some(ref base) = airtable_api_base {
            url::Url::parse(base).map_err(|source| ConfigError::InvalidAirtableApiBase {
                value: base.clone(),
                source,
            })?;
        }

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            data_dir,
            airtable_api_base,
        };

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("ZENITH_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("ZENITH_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_apply_without_env_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
            .load()
            .unwrap();

        assert_eq!(config.api_bind_addr, "0.0.0.0:8080");
        assert_eq!(config.log_format, "json");
        assert!(config.airtable_api_base.is_none());
        assert!(config.state_file().ends_with("crm_sync_state.json"));
    }

    #[test]
    fn profile_env_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "ZENITH_LOG_LEVEL=warn\nZENITH_PROFILE=test\n",
        )
        .unwrap();
        fs::write(dir.path().join(".env.test"), "ZENITH_LOG_LEVEL=debug\n").unwrap();

        let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
            .load()
            .unwrap();
        assert_eq!(config.profile, "test");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "ZENITH_API_BIND_ADDR=not-an-addr\n").unwrap();

        let err = ConfigLoader::with_base_dir(dir.path().to_path_buf())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }

    #[test]
    fn invalid_airtable_base_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "ZENITH_AIRTABLE_API_BASE=::nope::\n",
        )
        .unwrap();

        let err = ConfigLoader::with_base_dir(dir.path().to_path_buf())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAirtableApiBase { .. }));
    }
}
