//! Reflecta Core - Runtime type registry and generic JSON serializer
//!
//! This crate maps type names to type-erased operation bundles and drives a
//! JSON serializer purely from those bundles:
//! - Annotation parsing into field tags (`PropertyMap`, `PropertySet`)
//! - Field, array and class bundles (`FieldOps`, `ArrayOps`, `ClassOps`)
//! - A build-then-freeze registry (`RegistryBuilder`, `TypeRegistry`)
//! - Type metas and accessors (`TypeMeta`, `FieldAccessor`, `ArrayAccessor`)
//! - Polymorphic pointer slots (`ReflectionPtr`) and instance views
//!
//! ## Architecture
//!
//! ```text
//! registration code
//!  │  register_field / register_array / register_class
//!  ▼
//! RegistryBuilder ──build()──▶ TypeRegistry (shared, read-only)
//!                               │
//!                               ├── TypeMeta ── FieldAccessor[]
//!                               ├── ArrayAccessor
//!                               └── Serializer ── Marshal impls
//! ```
//!
//! ## Wire Format
//!
//! Pointer slots are written as `{"$typeName": name, "$context": value}`.
//! `"*"` names a statically typed pointee; any other name is dispatched
//! through the registry.

mod accessor;
pub mod annotation;
pub mod bundle;
mod error;
mod instance;
mod meta;
mod registry;
pub mod serializer;

pub use accessor::{ArrayAccessor, FieldAccessor, UNKNOWN, UNKNOWN_TYPE};
pub use annotation::{extract_properties, Property, PropertyMap, PropertySet};
pub use bundle::{
    ArrayOps, AsAny, ClassBundle, ClassOps, FieldOps, Reflect, TypedField, Upcast, VecArray,
};
pub use error::{Error, Result};
pub use instance::{OwnedInstance, ReflectionInstance, ReflectionInstanceMut, ReflectionPtr};
pub use meta::TypeMeta;
pub use registry::{RegistryBuilder, TypeRegistry};
pub use serializer::{Marshal, Serializer};

/// JSON value type used throughout the crate
pub use serde_json::Value as Json;
