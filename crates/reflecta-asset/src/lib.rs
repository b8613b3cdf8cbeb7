//! Reflecta Asset - JSON asset files on top of the reflecta registry
//!
//! This crate loads and saves any [`Marshal`](reflecta_core::Marshal) value as
//! a JSON file resolved against a configured root folder. Polymorphic slots
//! keep their `$typeName`/`$context` wrapper on disk, so assets come back as
//! their most-derived registered type.
//!
//! ```no_run
//! use reflecta_asset::{AssetConfig, AssetManager};
//! use reflecta_core::RegistryBuilder;
//!
//! let registry = RegistryBuilder::new().build();
//! let manager = AssetManager::new(AssetConfig::new("assets"), registry);
//!
//! let mut frames: Vec<f32> = Vec::new();
//! if manager.load_asset("anim/frames.json", &mut frames) {
//!     manager.save_asset(&frames, "anim/frames_copy.json");
//! }
//! ```

mod config;
mod error;
mod manager;

pub use config::AssetConfig;
pub use error::{Error, Result};
pub use manager::AssetManager;
