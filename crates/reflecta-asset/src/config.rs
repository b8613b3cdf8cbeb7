//! Asset configuration - Root folder and output settings
//!
//! Configuration is plain serde data, normally kept in a RON file next to the
//! application:
//!
//! ```ron
//! (
//!     root_folder: "assets",
//!     pretty: true,
//! )
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the asset manager
///
/// # Example
///
/// ```
/// use reflecta_asset::AssetConfig;
///
/// let config = AssetConfig::default().with_root_folder("assets").with_pretty(true);
/// assert_eq!(config.root_folder(), std::path::Path::new("assets"));
/// assert!(config.pretty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Folder asset urls are resolved against
    root_folder: PathBuf,
    /// Pretty-print saved JSON
    pretty: bool,
}

impl AssetConfig {
    /// Create a configuration rooted at `root_folder`
    pub fn new(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from RON text
    ///
    /// Missing keys take their default values.
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a configuration from a RON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Set the root folder
    pub fn with_root_folder(mut self, root_folder: impl Into<PathBuf>) -> Self {
        self.root_folder = root_folder.into();
        self
    }

    /// Set pretty-printing of saved assets
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Folder asset urls are resolved against
    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Whether saved assets are pretty-printed
    pub fn pretty(&self) -> bool {
        self.pretty
    }
}

impl Default for AssetConfig {
    /// Current directory, compact output
    fn default() -> Self {
        Self {
            root_folder: PathBuf::from("."),
            pretty: false,
        }
    }
}
