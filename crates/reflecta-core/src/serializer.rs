//! Registry-driven JSON serializer
//!
//! Every serializable value implements [`Marshal`]. Primitives map to JSON
//! scalars, sequences to arrays and reflectable structs to objects of their
//! registered fields. Pointer slots use the wrapper format:
//!
//! ```text
//! { "$typeName": "<'*' | registered type name>", "$context": <value> }
//! ```
//!
//! `"*"` marks a pointee rebuilt through the static type: `Option<Box<T>>`
//! default-constructs `T`, a `ReflectionPtr<T>` uses the class registered for
//! `T`. Any other name is looked up in the registry and constructed
//! through its class bundle, which is how [`ReflectionPtr`] slots come back as
//! their most-derived type.

use crate::bundle::AsAny;
use crate::instance::{ReflectionInstance, ReflectionPtr};
use crate::{Error, Json, Result, TypeRegistry};
use serde_json::Map;
use std::any::TypeId;

/// Key carrying the runtime type name of a pointer slot
pub const TYPE_NAME_KEY: &str = "$typeName";

/// Key carrying the pointee of a pointer slot
pub const CONTEXT_KEY: &str = "$context";

/// Type name marking a statically typed pointee
pub const STATIC_TYPE_MARKER: &str = "*";

static NULL: Json = Json::Null;

/// A value the serializer can encode and decode
pub trait Marshal {
    /// Encode as JSON
    fn write_json(&self, registry: &TypeRegistry) -> Result<Json>;

    /// Decode from JSON into `self`
    fn read_json(&mut self, registry: &TypeRegistry, json: &Json) -> Result<()>;
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn unexpected(expected: &str, json: &Json) -> Error {
    Error::MalformedJson(format!("expected {}, found {}", expected, json_kind(json)))
}

/// A whole number carried as a float, such as `3.0`
fn integral(json: &Json) -> Option<i128> {
    json.as_f64()
        .filter(|value| value.fract() == 0.0 && value.abs() < 1e20)
        .map(|value| value as i128)
}

fn pointer_json(type_name: &str, context: Json) -> Json {
    let mut object = Map::new();
    object.insert(TYPE_NAME_KEY.to_string(), Json::String(type_name.to_string()));
    object.insert(CONTEXT_KEY.to_string(), context);
    Json::Object(object)
}

/// Split a pointer wrapper into its type name and context
fn pointer_parts(json: &Json) -> Result<(&str, &Json)> {
    let object = json
        .as_object()
        .ok_or_else(|| unexpected("pointer object", json))?;
    let type_name = object
        .get(TYPE_NAME_KEY)
        .and_then(Json::as_str)
        .ok_or_else(|| Error::MalformedJson(format!("pointer object without {}", TYPE_NAME_KEY)))?;
    Ok((type_name, object.get(CONTEXT_KEY).unwrap_or(&NULL)))
}

// ============================================================================
// Primitives
// ============================================================================

macro_rules! marshal_integer {
    ($($ty:ty => $as:ident),+ $(,)?) => {
        $(
            impl Marshal for $ty {
                fn write_json(&self, _registry: &TypeRegistry) -> Result<Json> {
                    Ok(Json::from(*self))
                }

                fn read_json(&mut self, _registry: &TypeRegistry, json: &Json) -> Result<()> {
                    *self = json
                        .$as()
                        .and_then(|value| <$ty>::try_from(value).ok())
                        .or_else(|| integral(json).and_then(|value| <$ty>::try_from(value).ok()))
                        .ok_or_else(|| unexpected(stringify!($ty), json))?;
                    Ok(())
                }
            }
        )+
    };
}

marshal_integer!(i32 => as_i64, u32 => as_u64, i64 => as_i64, u64 => as_u64);

impl Marshal for f32 {
    fn write_json(&self, _registry: &TypeRegistry) -> Result<Json> {
        Ok(Json::from(*self))
    }

    fn read_json(&mut self, _registry: &TypeRegistry, json: &Json) -> Result<()> {
        let value = json.as_f64().ok_or_else(|| unexpected("f32", json))?;
        if value.is_finite() && !(value as f32).is_finite() {
            return Err(Error::MalformedJson(format!("{} out of range for f32", value)));
        }
        *self = value as f32;
        Ok(())
    }
}

impl Marshal for f64 {
    fn write_json(&self, _registry: &TypeRegistry) -> Result<Json> {
        Ok(Json::from(*self))
    }

    fn read_json(&mut self, _registry: &TypeRegistry, json: &Json) -> Result<()> {
        *self = json.as_f64().ok_or_else(|| unexpected("f64", json))?;
        Ok(())
    }
}

impl Marshal for bool {
    fn write_json(&self, _registry: &TypeRegistry) -> Result<Json> {
        Ok(Json::Bool(*self))
    }

    fn read_json(&mut self, _registry: &TypeRegistry, json: &Json) -> Result<()> {
        *self = json.as_bool().ok_or_else(|| unexpected("bool", json))?;
        Ok(())
    }
}

// Written as the numeric code point.
impl Marshal for char {
    fn write_json(&self, _registry: &TypeRegistry) -> Result<Json> {
        Ok(Json::from(u32::from(*self)))
    }

    fn read_json(&mut self, _registry: &TypeRegistry, json: &Json) -> Result<()> {
        *self = json
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .and_then(char::from_u32)
            .ok_or_else(|| unexpected("char code point", json))?;
        Ok(())
    }
}

impl Marshal for String {
    fn write_json(&self, _registry: &TypeRegistry) -> Result<Json> {
        Ok(Json::String(self.clone()))
    }

    fn read_json(&mut self, _registry: &TypeRegistry, json: &Json) -> Result<()> {
        let value = json.as_str().ok_or_else(|| unexpected("string", json))?;
        self.clear();
        self.push_str(value);
        Ok(())
    }
}

// ============================================================================
// Sequences and pointers
// ============================================================================

impl<T: Marshal + Default> Marshal for Vec<T> {
    fn write_json(&self, registry: &TypeRegistry) -> Result<Json> {
        self.iter()
            .map(|item| item.write_json(registry))
            .collect::<Result<Vec<_>>>()
            .map(Json::Array)
    }

    fn read_json(&mut self, registry: &TypeRegistry, json: &Json) -> Result<()> {
        let items = json.as_array().ok_or_else(|| unexpected("array", json))?;
        self.resize_with(items.len(), T::default);
        for (slot, item) in self.iter_mut().zip(items) {
            slot.read_json(registry, item)?;
        }
        Ok(())
    }
}

/// Plain owning pointer to a statically known type
impl<T: Marshal + Default + 'static> Marshal for Option<Box<T>> {
    fn write_json(&self, registry: &TypeRegistry) -> Result<Json> {
        match self {
            Some(pointee) => Ok(pointer_json(STATIC_TYPE_MARKER, pointee.write_json(registry)?)),
            None => Ok(Json::Null),
        }
    }

    fn read_json(&mut self, registry: &TypeRegistry, json: &Json) -> Result<()> {
        if self.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        if json.is_null() {
            return Ok(());
        }

        let (type_name, context) = pointer_parts(json)?;
        let pointee = if type_name == STATIC_TYPE_MARKER {
            let mut pointee = Box::<T>::default();
            pointee.read_json(registry, context)?;
            pointee
        } else {
            registry.construct(type_name, context)?.into_boxed::<T>()?
        };
        *self = Some(pointee);
        Ok(())
    }
}

/// Polymorphic slot, dispatched by the runtime type name it carries
impl<T: ?Sized + AsAny> Marshal for ReflectionPtr<T> {
    fn write_json(&self, registry: &TypeRegistry) -> Result<Json> {
        let Some(pointee) = self.get_any() else {
            return Ok(Json::Null);
        };
        let context = registry.write_by_name(self.type_name(), pointee)?;
        Ok(pointer_json(self.type_name(), context))
    }

    fn read_json(&mut self, registry: &TypeRegistry, json: &Json) -> Result<()> {
        if !self.is_null() {
            return Err(Error::AlreadyInitialized);
        }
        if json.is_null() {
            return Ok(());
        }

        let (type_name, context) = pointer_parts(json)?;
        // "*" resolves through the class backing the static type; trait objects have none.
        let type_name = if type_name == STATIC_TYPE_MARKER {
            registry
                .class_name_of(TypeId::of::<T>())
                .ok_or_else(|| Error::UnknownType(STATIC_TYPE_MARKER.to_string()))?
        } else {
            type_name
        };
        let pointee = registry.construct(type_name, context)?.into_boxed::<T>()?;
        self.fill(type_name, pointee);
        Ok(())
    }
}

/// Implement [`Marshal`] for [`Reflect`](crate::Reflect) types through their
/// registered class bundle
///
/// ```ignore
/// impl_marshal!(Transform, RigidBody);
/// ```
#[macro_export]
macro_rules! impl_marshal {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Marshal for $ty {
                fn write_json(&self, registry: &$crate::TypeRegistry) -> $crate::Result<$crate::Json> {
                    registry.write_by_name(<$ty as $crate::Reflect>::TYPE_NAME, self)
                }

                fn read_json(
                    &mut self,
                    registry: &$crate::TypeRegistry,
                    json: &$crate::Json,
                ) -> $crate::Result<()> {
                    registry.read_into_by_name(<$ty as $crate::Reflect>::TYPE_NAME, self, json)
                }
            }
        )+
    };
}

// ============================================================================
// Serializer
// ============================================================================

/// Entry point for reading and writing values against one registry
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> Serializer<'r> {
    /// Create a serializer over `registry`
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Registry this serializer reads from
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Encode a value
    pub fn write<T: Marshal + ?Sized>(&self, value: &T) -> Result<Json> {
        value.write_json(self.registry)
    }

    /// Decode into an existing value
    ///
    /// Pointer slots must be empty on entry.
    pub fn read<T: Marshal + ?Sized>(&self, json: &Json, value: &mut T) -> Result<()> {
        value.read_json(self.registry, json)
    }

    /// Decode into a fresh default value
    pub fn read_new<T: Marshal + Default>(&self, json: &Json) -> Result<T> {
        let mut value = T::default();
        value.read_json(self.registry, json)?;
        Ok(value)
    }

    /// Encode a reflected instance through its class bundle
    pub fn write_instance(&self, instance: &ReflectionInstance<'_>) -> Result<Json> {
        self.registry
            .write_by_name(instance.type_name(), instance.instance())
    }
}
