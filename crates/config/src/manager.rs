//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use shelfcast_sync_engine::DeviceId;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of the environment variables that override file values
pub const ENV_PREFIX: &str = "SHELFCAST_";

/// Main configuration manager
///
/// This is the primary interface for loading, saving, and managing configuration.
/// It handles file paths, defaults, and validation.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the default config directory
    ///
    /// - Linux: `~/.config/shelfcast/`
    /// - macOS: `~/Library/Application Support/shelfcast/`
    /// - Windows: `%APPDATA%\shelfcast\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let config_path = config_dir.join("config.toml");
        let persistence = ConfigPersistence::new(config_path);

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "shelfcast")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Cache database location; relative paths resolve against the config directory
    pub fn database_path(&self, config: &Config) -> PathBuf {
        if config.app.database_path.is_absolute() {
            config.app.database_path.clone()
        } else {
            self.config_dir.join(&config.app.database_path)
        }
    }

    /// Loads the configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file is corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Saves the configuration to file
    ///
    /// Invalid configurations are rejected before anything is written.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads, changes and saves the configuration in one step
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use shelfcast_config::ConfigManager;
    /// # fn main() -> Result<(), shelfcast_config::ConfigError> {
    /// let manager = ConfigManager::new()?;
    /// manager.update(|config| {
    ///     config.library.hide_finished = true;
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Generates a default config file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.persistence.generate_default()?;
        Ok(true)
    }

    /// Overwrites the config file with default values
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    ///
    /// Returns all validation errors found, or Ok if valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// The device id used for playback sessions
    ///
    /// Generated and saved the first time it is asked for, so the server sees
    /// the same device across restarts.
    pub fn device_id(&self) -> ConfigResult<DeviceId> {
        let mut config = self.load()?;
        if let Some(id) = config.app.device_id() {
            return Ok(id);
        }

        let id = DeviceId::new();
        log::info!("Registered new device id {}", id);
        config.app.device_id = Some(id.to_string());
        self.save(&config)?;
        Ok(id)
    }

    /// Loads the file and applies `SHELFCAST_*` environment variables on top
    ///
    /// Example: `SHELFCAST_SERVER_HOST=https://abs.example.org`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

fn parse_override<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}{}: cannot parse '{}'", ENV_PREFIX, name, raw);
            None
        }
    }
}

/// Applies overrides looked up by variable name; unparsable values are ignored
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    if let Some(path) = var("APP_DATABASE_PATH") {
        config.app.database_path = PathBuf::from(path);
    }
    if let Some(level) = var("APP_LOG_LEVEL").and_then(|raw| parse_override("APP_LOG_LEVEL", &raw)) {
        config.app.log_level = level;
    }
    if let Some(device) = var("APP_DEVICE_ID") {
        config.app.device_id = Some(device);
    }

    if let Some(host) = var("SERVER_HOST") {
        config.server.host = Some(host);
    }
    if let Some(username) = var("SERVER_USERNAME") {
        config.server.username = Some(username);
    }
    if let Some(token) = var("SERVER_TOKEN") {
        config.server.token = Some(token);
    }

    if let Some(library) = var("LIBRARY_PREFERRED_LIBRARY_ID") {
        config.library.preferred_library_id = Some(library);
    }
    if let Some(hide) = var("LIBRARY_HIDE_FINISHED").and_then(|raw| parse_override("LIBRARY_HIDE_FINISHED", &raw)) {
        config.library.hide_finished = hide;
    }
    if let Some(downloaded) =
        var("LIBRARY_DOWNLOADED_ONLY").and_then(|raw| parse_override("LIBRARY_DOWNLOADED_ONLY", &raw))
    {
        config.library.downloaded_only = downloaded;
    }

    if let Some(ms) = var("SYNC_LONG_INTERVAL_MS").and_then(|raw| parse_override("SYNC_LONG_INTERVAL_MS", &raw)) {
        config.sync.long_interval_ms = ms;
    }
    if let Some(ms) = var("SYNC_SHORT_INTERVAL_MS").and_then(|raw| parse_override("SYNC_SHORT_INTERVAL_MS", &raw)) {
        config.sync.short_interval_ms = ms;
    }
    if let Some(ms) =
        var("SYNC_REQUEST_TIMEOUT_MS").and_then(|raw| parse_override("SYNC_REQUEST_TIMEOUT_MS", &raw))
    {
        config.sync.request_timeout_ms = ms;
    }
    if let Some(attempts) =
        var("SYNC_RETRY_ATTEMPTS").and_then(|raw| parse_override("SYNC_RETRY_ATTEMPTS", &raw))
    {
        config.sync.retry_attempts = attempts;
    }
}
