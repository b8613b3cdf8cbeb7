//! Type meta: a lightweight view over one registered type name

use crate::accessor::UNKNOWN_TYPE;
use crate::instance::{ReflectionInstance, ReflectionInstanceMut};
use crate::{FieldAccessor, Result, TypeRegistry};
use std::any::Any;
use std::fmt;

/// View over a type name and its registered fields
///
/// The field list is a snapshot taken at construction; later registrations
/// are not reflected. A meta built for a name without fields is invalid and
/// stays invalid.
#[derive(Clone)]
pub struct TypeMeta {
    registry: TypeRegistry,
    type_name: String,
    fields: Vec<FieldAccessor>,
    is_valid: bool,
}

impl TypeMeta {
    /// Build the meta for `type_name` from the registry's field map
    pub fn new(registry: &TypeRegistry, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let fields: Vec<FieldAccessor> = registry
            .field_records(&type_name)
            .iter()
            .map(|record| FieldAccessor::new(registry.clone(), record.clone()))
            .collect();

        Self {
            registry: registry.clone(),
            is_valid: !fields.is_empty(),
            type_name,
            fields,
        }
    }

    /// The invalid `"UnknownType"` meta
    pub fn unknown() -> Self {
        Self {
            registry: TypeRegistry::empty(),
            type_name: UNKNOWN_TYPE.to_string(),
            fields: Vec::new(),
            is_valid: false,
        }
    }

    /// Whether the type had registered fields at construction
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Registered type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field accessors in declaration order
    pub fn fields(&self) -> &[FieldAccessor] {
        &self.fields
    }

    /// Field by name; an unbound accessor when absent
    pub fn field_by_name(&self, name: &str) -> FieldAccessor {
        self.find_field(name).cloned().unwrap_or_default()
    }

    /// Field by name
    pub fn find_field(&self, name: &str) -> Option<&FieldAccessor> {
        self.fields.iter().find(|f| f.field_name() == name)
    }

    /// Views of the base-class sub-objects of `instance`
    pub fn base_instances<'a>(&self, instance: &'a dyn Any) -> Result<Vec<ReflectionInstance<'a>>> {
        self.registry.base_instances(&self.type_name, instance)
    }

    /// Mutable views of the base-class sub-objects of `instance`
    pub fn base_instances_mut<'a>(
        &self,
        instance: &'a mut dyn Any,
    ) -> Result<Vec<ReflectionInstanceMut<'a>>> {
        self.registry.base_instances_mut(&self.type_name, instance)
    }

    /// Registry this meta was built from
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}

impl Default for TypeMeta {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMeta")
            .field("type_name", &self.type_name)
            .field("is_valid", &self.is_valid)
            .field("fields", &self.fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::TypedField;
    use crate::RegistryBuilder;

    #[derive(Default)]
    struct Stats {
        a: i32,
        b: f32,
        c: bool,
    }

    fn registry() -> TypeRegistry {
        let mut builder = RegistryBuilder::new();
        builder.register_field(
            "Stats",
            TypedField::new("Stats", "a", "i32", |s: &Stats| &s.a, |s: &mut Stats| &mut s.a),
        );
        builder.register_field(
            "Stats",
            TypedField::new("Stats", "b", "f32", |s: &Stats| &s.b, |s: &mut Stats| &mut s.b),
        );
        builder.register_field(
            "Stats",
            TypedField::new("Stats", "c", "bool", |s: &Stats| &s.c, |s: &mut Stats| &mut s.c),
        );
        builder.build()
    }

    #[test]
    fn test_unknown_meta() {
        let registry = registry();
        let meta = registry.type_meta("DoesNotExist");
        assert!(!meta.is_valid());
        assert!(meta.fields().is_empty());
        assert_eq!(meta.type_name(), "DoesNotExist");

        let meta = TypeMeta::default();
        assert!(!meta.is_valid());
        assert_eq!(meta.type_name(), UNKNOWN_TYPE);
    }

    #[test]
    fn test_fields_in_order() {
        let registry = registry();
        let meta = registry.type_meta("Stats");
        assert!(meta.is_valid());
        let names: Vec<_> = meta.fields().iter().map(|f| f.field_name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_field_get_set() {
        let registry = registry();
        let meta = registry.type_meta("Stats");
        let mut stats = Stats::default();

        let b = meta.field_by_name("b");
        b.set(&mut stats, Box::new(2.5f32)).unwrap();
        assert_eq!(stats.b, 2.5);
        assert_eq!(b.get_as::<f32>(&stats).unwrap(), &2.5);
        assert_eq!(b.owner_type_meta().type_name(), "Stats");

        assert!(b.set(&mut stats, Box::new(1i32)).is_err());
        assert!(b.get(&5u8).is_err());
        assert!(!meta.field_by_name("zzz").is_valid());
    }

    #[test]
    fn test_meta_is_snapshot() {
        let registry = registry();
        let meta = registry.type_meta("Stats");
        let copy = meta.clone();
        assert_eq!(copy.fields().len(), meta.fields().len());
        assert_eq!(copy.fields()[2].field_type_name(), "bool");
    }
}
