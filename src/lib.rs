use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub mod config;
pub mod datasets;
pub mod error;
pub mod normalize;
pub mod wrapper;

pub use error::DataError;

/// Parameter structs that round-trip through RON, so that a run can be
/// described by a config file on disk
pub trait Config: Send + Sync {
    fn config(&self) -> Result<String>;
    fn load_config(&mut self, config: &str) -> Result<()>;
}

impl<T: Serialize + DeserializeOwned + Send + Sync> Config for T {
    fn config(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize config")
    }
    fn load_config(&mut self, config: &str) -> Result<()> {
        *self = ron::from_str(config).with_context(|| format!("Failed to load config {}", config))?;
        Ok(())
    }
}

/// Reads a RON config file into a fresh value
pub fn read_config<T: Config + Default>(path: impl AsRef<std::path::Path>) -> Result<T> {
    let path = path.as_ref();
    let serialized = std::fs::read_to_string(path)
        .with_context(|| format!("No config file at {}", path.display()))?;
    let mut value = T::default();
    value.load_config(&serialized)?;
    Ok(value)
}
