//! Asset manager - Load and save reflected values as JSON files

use crate::config::AssetConfig;
use crate::error::Result;
use reflecta_core::{Marshal, Serializer, TypeRegistry};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads and saves assets through the registry serializer
///
/// Asset urls are paths relative to the configured root folder.
/// [`load_asset`](Self::load_asset) and [`save_asset`](Self::save_asset)
/// report failure as `false` plus a logged error; the `try_` variants return
/// the cause instead.
#[derive(Debug, Clone)]
pub struct AssetManager {
    config: AssetConfig,
    registry: TypeRegistry,
}

impl AssetManager {
    /// Create a manager over a built registry
    pub fn new(config: AssetConfig, registry: TypeRegistry) -> Self {
        Self { config, registry }
    }

    /// Active configuration
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Registry assets are read and written through
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Resolve an asset url against the root folder
    pub fn full_path(&self, url: impl AsRef<Path>) -> PathBuf {
        self.config.root_folder().join(url)
    }

    /// Read an asset into `out`
    ///
    /// Pointer slots in `out` must be empty.
    pub fn try_load_asset<T: Marshal + ?Sized>(&self, url: impl AsRef<Path>, out: &mut T) -> Result<()> {
        let path = self.full_path(url);
        let text = fs::read_to_string(&path)?;
        let json = serde_json::from_str(&text)?;
        Serializer::new(&self.registry).read(&json, out)?;
        log::debug!("loaded asset {}", path.display());
        Ok(())
    }

    /// Read an asset into a fresh default value
    pub fn try_load_new<T: Marshal + Default>(&self, url: impl AsRef<Path>) -> Result<T> {
        let mut value = T::default();
        self.try_load_asset(url, &mut value)?;
        Ok(value)
    }

    /// Write `value` to an asset file, creating missing parent folders
    pub fn try_save_asset<T: Marshal + ?Sized>(&self, value: &T, url: impl AsRef<Path>) -> Result<()> {
        let path = self.full_path(url);
        let json = Serializer::new(&self.registry).write(value)?;
        let text = if self.config.pretty() {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        log::debug!("saved asset {}", path.display());
        Ok(())
    }

    /// Read an asset into `out`, logging the failure
    pub fn load_asset<T: Marshal + ?Sized>(&self, url: impl AsRef<Path>, out: &mut T) -> bool {
        let url = url.as_ref();
        match self.try_load_asset(url, out) {
            Ok(()) => true,
            Err(e) => {
                log::error!("load asset {} failed: {}", self.full_path(url).display(), e);
                false
            }
        }
    }

    /// Write `value` to an asset file, logging the failure
    pub fn save_asset<T: Marshal + ?Sized>(&self, value: &T, url: impl AsRef<Path>) -> bool {
        let url = url.as_ref();
        match self.try_save_asset(value, url) {
            Ok(()) => true,
            Err(e) => {
                log::error!("save asset {} failed: {}", self.full_path(url).display(), e);
                false
            }
        }
    }
}
