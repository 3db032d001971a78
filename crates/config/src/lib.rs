//! Shelfcast Configuration System
//!
//! One TOML file holds every user-facing setting. Each section implements
//! [`ConfigSection`] and maps onto the settings object of the crate that
//! consumes it: [`LibraryConfig`] becomes the store's `CacheContext`,
//! [`SyncConfig`] becomes the synchronizers' `SyncSettings`.
//!
//! - Invalid files fall back to defaults with a warning through `load_or_default`
//! - Writes are atomic and keep a backup of the previous file
//! - `SHELFCAST_*` environment variables override file values
//!
//! # Example
//!
//! ```rust,no_run
//! use shelfcast_config::{Config, ConfigManager};
//!
//! # fn main() -> Result<(), shelfcast_config::ConfigError> {
//! let manager = ConfigManager::new()?;
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! let context = config.cache_context();
//! println!("Hide finished books: {}", context.hide_finished);
//! # Ok(())
//! # }
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
pub mod app_config;
mod library_config;
mod server_config;
mod sync_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{apply_env_overrides, ConfigManager, ENV_PREFIX};
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use library_config::LibraryConfig;
pub use server_config::ServerConfig;
pub use sync_config::SyncConfig;

use serde::{Deserialize, Serialize};
use shelfcast_database::CacheContext;
use shelfcast_sync_engine::SyncSettings;

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Media server connection
    pub server: ServerConfig,

    /// Library listing preferences
    pub library: LibraryConfig,

    /// Synchronization timing
    pub sync: SyncConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.server.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.library.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.sync.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    ///
    /// Override chain: defaults < file < env vars
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.server.merge(other.server);
        self.library.merge(other.library);
        self.sync.merge(other.sync);
    }

    /// Listing preferences for the cached-book store
    pub fn cache_context(&self) -> CacheContext {
        self.library.cache_context()
    }

    /// Timing for the bookmark and progress synchronizers
    pub fn sync_settings(&self) -> SyncSettings {
        self.sync.settings()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            server: ServerConfig::default(),
            library: LibraryConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}
