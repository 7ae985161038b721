//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::PcloudConfig;

/// Load configuration.
pub fn load_config(store: &impl ConfigStore) -> Result<PcloudConfig> {
    store.load()
}

/// Save configuration.
pub fn save_config(store: &impl ConfigStore, config: &PcloudConfig) -> Result<()> {
    store.save(config)
}

/// Validate and persist a single `key = value` assignment.
///
/// # Errors
///
/// Returns an error if the key or value is invalid, or the file cannot be
/// read or written. Nothing is saved on a validation failure.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<PcloudConfig> {
    let mut config = load_config(store)?;
    config.set(key, value)?;
    save_config(store, &config)?;
    Ok(config)
}
