//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the identity service URL, the origin session storage is scoped to, the
//! storage backend, and the last email used to log in.
//!
//! Configuration is stored at `~/.config/gatehouse/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::{FileStore, KeyringStore, SessionStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "gatehouse";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Identity service used when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:9080";

/// Origin session storage is scoped to when nothing is configured
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "GATEHOUSE_API_URL";

/// Environment variable overriding `origin`
pub const ORIGIN_ENV: &str = "GATEHOUSE_ORIGIN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub origin: Option<String>,
    #[serde(default)]
    pub store_backend: StoreBackend,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Identity service base URL: environment, then config, then default.
    pub fn api_base_url(&self) -> String {
        Self::resolve(API_URL_ENV, self.api_base_url.as_deref(), DEFAULT_API_BASE_URL)
    }

    /// Storage origin: environment, then config, then default.
    pub fn origin(&self) -> String {
        Self::resolve(ORIGIN_ENV, self.origin.as_deref(), DEFAULT_ORIGIN)
    }

    fn resolve(env_var: &str, configured: Option<&str>, default: &str) -> String {
        std::env::var(env_var)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| configured.map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Session store for the configured backend and origin.
    pub fn open_store(&self) -> Result<Box<dyn SessionStore>> {
        let origin = self.origin();
        let store: Box<dyn SessionStore> = match self.store_backend {
            StoreBackend::File => Box::new(FileStore::for_origin(&self.data_dir()?, &origin)),
            StoreBackend::Keyring => Box::new(KeyringStore::for_origin(&origin)),
        };
        Ok(store)
    }
}
