//! Field and array accessors
//!
//! Accessors are cheap value objects bound to one registered bundle. They are
//! obtained from a [`TypeMeta`] or from [`TypeRegistry::array_accessor`]. A
//! default-constructed accessor is unbound: it reports placeholder names and
//! every operation on it fails with [`Error::InvalidField`].

use crate::annotation::PropertyMap;
use crate::bundle::ArrayOps;
use crate::registry::FieldRecord;
use crate::{Error, Json, Result, TypeMeta, TypeRegistry};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Placeholder type name for unbound accessors and unknown metas
pub const UNKNOWN_TYPE: &str = "UnknownType";

/// Placeholder field name for unbound accessors
pub const UNKNOWN: &str = "Unknown";

/// Accessor for one field of one registered type
#[derive(Clone, Default)]
pub struct FieldAccessor {
    binding: Option<(TypeRegistry, Arc<FieldRecord>)>,
}

impl FieldAccessor {
    pub(crate) fn new(registry: TypeRegistry, record: Arc<FieldRecord>) -> Self {
        Self {
            binding: Some((registry, record)),
        }
    }

    /// Check if the accessor is bound to a field bundle
    pub fn is_valid(&self) -> bool {
        self.binding.is_some()
    }

    fn bound(&self) -> Result<(&TypeRegistry, &FieldRecord)> {
        self.binding
            .as_ref()
            .map(|(registry, record)| (registry, record.as_ref()))
            .ok_or(Error::InvalidField)
    }

    /// Field name, `"Unknown"` when unbound
    pub fn field_name(&self) -> &str {
        match &self.binding {
            Some((_, record)) => record.ops.field_name(),
            None => UNKNOWN,
        }
    }

    /// Declared type name, `"UnknownType"` when unbound
    pub fn field_type_name(&self) -> &str {
        match &self.binding {
            Some((_, record)) => record.ops.field_type_name(),
            None => UNKNOWN_TYPE,
        }
    }

    /// Meta of the type owning this field
    pub fn owner_type_meta(&self) -> TypeMeta {
        match &self.binding {
            Some((registry, record)) => registry.type_meta(record.ops.owner_type_name()),
            None => TypeMeta::unknown(),
        }
    }

    /// Meta of the declared field type; check [`TypeMeta::is_valid`] before use
    pub fn type_meta(&self) -> TypeMeta {
        match &self.binding {
            Some((registry, record)) => registry.type_meta(record.ops.field_type_name()),
            None => TypeMeta::unknown(),
        }
    }

    /// Whether the declared type is a registered array type
    pub fn is_array_type(&self) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|(_, record)| record.ops.is_array())
    }

    /// Check if the field annotation carries `name`
    pub fn has_meta_tag(&self, name: &str) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|(_, record)| record.tags.get_flag(name))
    }

    /// Value of an annotation tag, empty when absent
    pub fn get_meta_tag_value(&self, name: &str) -> &str {
        match &self.binding {
            Some((_, record)) => record.tags.get_property(name),
            None => "",
        }
    }

    /// All annotation tags
    pub fn meta_tags(&self) -> Option<&PropertyMap> {
        self.binding.as_ref().map(|(_, record)| &record.tags)
    }

    /// Borrow the field out of an owner instance
    pub fn get<'a>(&self, instance: &'a dyn Any) -> Result<&'a dyn Any> {
        let (_, record) = self.bound()?;
        record.ops.get(instance)
    }

    /// Borrow the field as a concrete type
    pub fn get_as<'a, T: Any>(&self, instance: &'a dyn Any) -> Result<&'a T> {
        self.get(instance)?
            .downcast_ref::<T>()
            .ok_or_else(|| Error::mismatch(std::any::type_name::<T>(), self.field_type_name()))
    }

    /// Mutably borrow the field out of an owner instance
    pub fn get_mut<'a>(&self, instance: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        let (_, record) = self.bound()?;
        record.ops.get_mut(instance)
    }

    /// Replace the field value
    pub fn set(&self, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
        let (_, record) = self.bound()?;
        record.ops.set(instance, value)
    }

    /// Encode the field value
    pub fn to_json(&self, instance: &dyn Any) -> Result<Json> {
        let (registry, record) = self.bound()?;
        record.ops.to_json(registry, instance)
    }

    /// Decode into the field value
    pub fn read_json(&self, instance: &mut dyn Any, json: &Json) -> Result<()> {
        let (registry, record) = self.bound()?;
        record.ops.read_json(registry, instance, json)
    }
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.field_name())
            .field("type_name", &self.field_type_name())
            .field("is_array", &self.is_array_type())
            .finish()
    }
}

/// Accessor for the elements of one registered array type
#[derive(Clone, Default)]
pub struct ArrayAccessor {
    binding: Option<(TypeRegistry, Arc<dyn ArrayOps>)>,
}

impl ArrayAccessor {
    pub(crate) fn new(registry: TypeRegistry, ops: Arc<dyn ArrayOps>) -> Self {
        Self {
            binding: Some((registry, ops)),
        }
    }

    /// Check if the accessor is bound to an array bundle
    pub fn is_valid(&self) -> bool {
        self.binding.is_some()
    }

    fn bound(&self) -> Result<(&TypeRegistry, &dyn ArrayOps)> {
        self.binding
            .as_ref()
            .map(|(registry, ops)| (registry, ops.as_ref()))
            .ok_or(Error::InvalidField)
    }

    /// Array type name, `"UnknownType"` when unbound
    pub fn array_type_name(&self) -> &str {
        match &self.binding {
            Some((_, ops)) => ops.array_type_name(),
            None => UNKNOWN_TYPE,
        }
    }

    /// Element type name, `"UnknownType"` when unbound
    pub fn element_type_name(&self) -> &str {
        match &self.binding {
            Some((_, ops)) => ops.element_type_name(),
            None => UNKNOWN_TYPE,
        }
    }

    /// Number of elements in `instance`
    pub fn size(&self, instance: &dyn Any) -> Result<usize> {
        let (_, ops) = self.bound()?;
        ops.size(instance)
    }

    /// Borrow one element
    pub fn get<'a>(&self, index: usize, instance: &'a dyn Any) -> Result<&'a dyn Any> {
        let (_, ops) = self.bound()?;
        ops.get(index, instance)
    }

    /// Mutably borrow one element
    pub fn get_mut<'a>(&self, index: usize, instance: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        let (_, ops) = self.bound()?;
        ops.get_mut(index, instance)
    }

    /// Replace one element
    pub fn set(&self, index: usize, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
        let (_, ops) = self.bound()?;
        ops.set(index, instance, value)
    }

    /// Grow or shrink to `len` elements
    pub fn resize(&self, instance: &mut dyn Any, len: usize) -> Result<()> {
        let (_, ops) = self.bound()?;
        ops.resize(instance, len)
    }

    /// Encode one element
    pub fn element_to_json(&self, index: usize, instance: &dyn Any) -> Result<Json> {
        let (registry, ops) = self.bound()?;
        ops.element_to_json(registry, index, instance)
    }

    /// Decode into one element
    pub fn element_from_json(&self, index: usize, instance: &mut dyn Any, json: &Json) -> Result<()> {
        let (registry, ops) = self.bound()?;
        ops.element_from_json(registry, index, instance, json)
    }
}

impl fmt::Debug for ArrayAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayAccessor")
            .field("array_type_name", &self.array_type_name())
            .field("element_type_name", &self.element_type_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_field_accessor() {
        let field = FieldAccessor::default();
        let mut value = 5i32;

        assert!(!field.is_valid());
        assert_eq!(field.field_name(), UNKNOWN);
        assert_eq!(field.field_type_name(), UNKNOWN_TYPE);
        assert!(!field.is_array_type());
        assert!(!field.has_meta_tag("anything"));
        assert_eq!(field.get_meta_tag_value("anything"), "");
        assert!(!field.owner_type_meta().is_valid());
        assert_eq!(field.get(&value).err(), Some(Error::InvalidField));
        assert_eq!(
            field.set(&mut value, Box::new(1i32)).err(),
            Some(Error::InvalidField)
        );
    }

    #[test]
    fn test_unbound_array_accessor() {
        let array = ArrayAccessor::default();
        let values = vec![1i32, 2];

        assert!(!array.is_valid());
        assert_eq!(array.array_type_name(), UNKNOWN_TYPE);
        assert_eq!(array.element_type_name(), UNKNOWN_TYPE);
        assert_eq!(array.size(&values).err(), Some(Error::InvalidField));
    }
}
