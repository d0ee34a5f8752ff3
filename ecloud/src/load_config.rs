//! Loads the JSON configuration files of both tools.
//!
//! This is the only place where configuration files are read from disk. Parsing
//! and validation live in [`ecloud_core::config`]; this module adds the file
//! handling, diagnostics and environment overrides.
//!
//! # Environment
//! - `ECLOUD_LOGIN` and `ECLOUD_PASSWORD`, when set and non-empty, replace the
//!   repository credentials of an import config. A `.env` file is honoured
//!   by the binaries through `dotenvy`.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ecloud_core::config::{DeployConfig, ImportConfig};
use tracing::{error, info};

pub const LOGIN_ENV: &str = "ECLOUD_LOGIN";
pub const PASSWORD_ENV: &str = "ECLOUD_PASSWORD";

fn read_config(path: &Path) -> Result<String> {
    info!(config_path = ?path, "Loading configuration from file");
    match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            Ok(content)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        }
    }
}

/// Load an `import-data` configuration and apply the credential overrides.
pub fn load_import_config<P: AsRef<Path>>(path: P) -> Result<ImportConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    let mut config = ImportConfig::from_json(&content)
        .map_err(|e| {
            error!(error = %e, config_path = ?path, "Invalid import configuration");
            e
        })
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    if let Some(login) = non_empty_env(LOGIN_ENV) {
        info!(var = LOGIN_ENV, "Repository login taken from environment");
        config.login = login;
    }
    if let Some(password) = non_empty_env(PASSWORD_ENV) {
        info!(var = PASSWORD_ENV, "Repository password taken from environment");
        config.password = password;
    }
    Ok(config)
}

/// Load a `prepare-all` configuration.
pub fn load_deploy_config<P: AsRef<Path>>(path: P) -> Result<DeployConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    DeployConfig::from_json(&content)
        .map_err(|e| {
            error!(error = %e, config_path = ?path, "Invalid deployment configuration");
            e
        })
        .with_context(|| format!("Invalid config file {}", path.display()))
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
