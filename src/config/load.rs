use std::{env, path::PathBuf};

use tracing::debug;

use super::schema::Settings;
use super::store::ConfigStore;
use crate::error::{ConfigStoreError, SettingsError};

const APP_DIR: &str = "reshelf";
const CONFIG_FILE: &str = "config.toml";
const STORE_FILE: &str = "strategies.toml";

/// Loading, validation and store resolution.
///
/// `Settings::load` layers environment variables (prefix `RESHELF__`) over an
/// optional config file over struct defaults. The strategy store lives in
/// its own file; `[strategies]` entries in the config file or environment
/// are merged over it.
impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();
        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("RESHELF")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.origin = config_path.filter(|p| p.is_file());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.pipeline.default_threads == 0 {
            return Err(SettingsError::ZeroThreads);
        }
        if self.pipeline.stages.is_empty() {
            return Err(SettingsError::NoStages);
        }
        if self.scan.max_depth == Some(0) {
            return Err(SettingsError::ZeroDepth);
        }
        if let Some(path) = self.store_path().filter(|p| p.is_dir()) {
            return Err(SettingsError::StoreIsDirectory(path));
        }
        Ok(())
    }

    /// Where strategy parameters are persisted. A relative
    /// `pipeline.store_path` is taken from the config file's directory.
    pub fn store_path(&self) -> Option<PathBuf> {
        match &self.pipeline.store_path {
            Some(path) if path.is_relative() => Some(
                self.origin
                    .as_deref()
                    .and_then(|file| file.parent())
                    .map(|dir| dir.join(path))
                    .unwrap_or_else(|| path.clone()),
            ),
            Some(path) => Some(path.clone()),
            None => app_dir().map(|d| d.join(STORE_FILE)),
        }
    }

    /// The strategy store file with `[strategies]` entries merged on top.
    pub fn strategy_store(&self) -> Result<ConfigStore, ConfigStoreError> {
        let mut store = match self.store_path() {
            Some(path) => ConfigStore::load(&path)?,
            None => ConfigStore::new(),
        };
        for (key, value) in &self.strategies {
            debug!(key = %key, "strategy parameter overridden by settings");
            store.set(key.as_str(), value);
        }
        Ok(store)
    }
}

/// `RESHELF_CONFIG_PATH` when set, else the default location.
pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os("RESHELF_CONFIG_PATH")
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/reshelf/config.toml`, or `~/.config/reshelf/config.toml`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    app_dir().map(|d| d.join(CONFIG_FILE))
}

fn app_dir() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .map(|home| home.join(APP_DIR))
}
