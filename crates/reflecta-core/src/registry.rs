//! Type registry
//!
//! Registration happens on a [`RegistryBuilder`] during a single-threaded
//! start-up phase. [`RegistryBuilder::build`] freezes the maps into a
//! [`TypeRegistry`], an immutable handle that is cheap to clone and safe to
//! share between threads for lookups and serialization.
//!
//! ```text
//! RegistryBuilder (mutable)  --build()-->  TypeRegistry (Arc, read-only)
//!   register_field / register_array / register_class
//!                                            type_meta / array_accessor
//!                                            construct / write_by_name
//! ```
//!
//! Teardown ([`TypeRegistry::unregister_all`]) only succeeds once every other
//! handle (metas, accessors, clones) has been dropped.

use crate::annotation::PropertyMap;
use crate::bundle::{ArrayOps, ClassOps, FieldOps};
use crate::instance::{OwnedInstance, ReflectionInstance, ReflectionInstanceMut};
use crate::{ArrayAccessor, Error, Json, Result, TypeMeta};
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A registered field bundle with its parsed annotation
pub(crate) struct FieldRecord {
    pub(crate) ops: Box<dyn FieldOps>,
    pub(crate) tags: PropertyMap,
}

/// The three registration maps
#[derive(Default)]
struct RegistryMaps {
    /// Owner type name -> fields in declaration order
    fields: IndexMap<String, Vec<Arc<FieldRecord>>>,
    /// Array type name -> bundle (first registration wins)
    arrays: IndexMap<String, Arc<dyn ArrayOps>>,
    /// Type name -> bundle (first registration wins)
    classes: IndexMap<String, Arc<dyn ClassOps>>,
}

impl RegistryMaps {
    fn record_count(&self) -> usize {
        self.fields.values().map(Vec::len).sum::<usize>() + self.arrays.len() + self.classes.len()
    }

    /// Release every bundle, returning how many were dropped
    fn clear(&mut self) -> usize {
        let released = self.record_count();
        self.fields.clear();
        self.arrays.clear();
        self.classes.clear();
        released
    }
}

/// Mutable registry used while registration code runs
#[derive(Default)]
pub struct RegistryBuilder {
    maps: RegistryMaps,
}

impl RegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one field of `owner`
    ///
    /// Always inserts; fields of the same owner keep registration order.
    pub fn register_field(&mut self, owner: impl Into<String>, bundle: impl FieldOps + 'static) {
        let tags = PropertyMap::parse(bundle.annotation());
        let record = FieldRecord {
            ops: Box::new(bundle),
            tags,
        };
        self.maps
            .fields
            .entry(owner.into())
            .or_default()
            .push(Arc::new(record));
    }

    /// Register an array bundle
    ///
    /// Returns `false` and discards the bundle if the name is already taken.
    pub fn register_array(&mut self, name: impl Into<String>, bundle: impl ArrayOps + 'static) -> bool {
        let name = name.into();
        if self.maps.arrays.contains_key(&name) {
            log::debug!("array type {} already registered, discarding bundle", name);
            return false;
        }
        self.maps.arrays.insert(name, Arc::new(bundle));
        true
    }

    /// Register a class bundle
    ///
    /// Returns `false` and discards the bundle if the name is already taken.
    pub fn register_class(&mut self, name: impl Into<String>, bundle: impl ClassOps + 'static) -> bool {
        let name = name.into();
        if self.maps.classes.contains_key(&name) {
            log::debug!("class {} already registered, discarding bundle", name);
            return false;
        }
        self.maps.classes.insert(name, Arc::new(bundle));
        true
    }

    /// Drop every registered bundle
    pub fn unregister_all(&mut self) -> usize {
        self.maps.clear()
    }

    /// Freeze into a shareable read-only registry
    pub fn build(self) -> TypeRegistry {
        log::debug!(
            "registry built: {} field owners, {} arrays, {} classes",
            self.maps.fields.len(),
            self.maps.arrays.len(),
            self.maps.classes.len()
        );
        TypeRegistry {
            maps: Arc::new(self.maps),
        }
    }
}

/// Read-only registry shared by metas, accessors and serializers
///
/// Cloning is O(1). All lookups are by registered type name.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    maps: Arc<RegistryMaps>,
}

impl TypeRegistry {
    /// An empty registry; every lookup fails
    pub fn empty() -> Self {
        Self::default()
    }

    /// Meta for a type name; invalid when the name has no fields
    pub fn type_meta(&self, type_name: &str) -> TypeMeta {
        TypeMeta::new(self, type_name)
    }

    pub(crate) fn field_records(&self, type_name: &str) -> &[Arc<FieldRecord>] {
        self.maps
            .fields
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn class_ops(&self, type_name: &str) -> Result<&Arc<dyn ClassOps>> {
        self.maps
            .classes
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Look up a class bundle and check that `instance` is of its type
    fn checked_class(&self, type_name: &str, instance: &dyn Any) -> Result<&Arc<dyn ClassOps>> {
        let class = self.class_ops(type_name)?;
        if instance.type_id() != class.instance_type_id() {
            return Err(Error::mismatch(type_name, "instance of another type"));
        }
        Ok(class)
    }

    /// Accessor for a registered array type
    pub fn array_accessor(&self, array_type_name: &str) -> Result<ArrayAccessor> {
        self.maps
            .arrays
            .get(array_type_name)
            .map(|ops| ArrayAccessor::new(self.clone(), Arc::clone(ops)))
            .ok_or_else(|| Error::UnknownType(array_type_name.to_string()))
    }

    /// Construct a new instance of the named type from its JSON object
    ///
    /// Ownership of the instance passes to the caller.
    pub fn construct(&self, type_name: &str, json: &Json) -> Result<OwnedInstance> {
        let class = self.class_ops(type_name)?;
        let instance = class.construct(self, json)?;
        Ok(OwnedInstance::new(self.type_meta(type_name), instance))
    }

    /// Encode an instance of the named type as a JSON object
    pub fn write_by_name(&self, type_name: &str, instance: &dyn Any) -> Result<Json> {
        self.checked_class(type_name, instance)?
            .to_json(self, instance)
    }

    /// Fill an existing instance of the named type from its JSON object
    pub fn read_into_by_name(&self, type_name: &str, instance: &mut dyn Any, json: &Json) -> Result<()> {
        self.checked_class(type_name, instance)?
            .read_into(self, instance, json)
    }

    /// Base-class views of an instance; empty when the type has no class bundle
    pub fn base_instances<'a>(
        &self,
        type_name: &str,
        instance: &'a dyn Any,
    ) -> Result<Vec<ReflectionInstance<'a>>> {
        match self.maps.classes.get(type_name) {
            Some(class) => class.base_instances(self, instance),
            None => Ok(Vec::new()),
        }
    }

    /// Mutable base-class views of an instance
    pub fn base_instances_mut<'a>(
        &self,
        type_name: &str,
        instance: &'a mut dyn Any,
    ) -> Result<Vec<ReflectionInstanceMut<'a>>> {
        match self.maps.classes.get(type_name) {
            Some(class) => class.base_instances_mut(self, instance),
            None => Ok(Vec::new()),
        }
    }

    /// Check if a class bundle is registered under `type_name`
    pub fn contains_class(&self, type_name: &str) -> bool {
        self.maps.classes.contains_key(type_name)
    }

    /// Registered name of the class backed by the Rust type `type_id`
    pub fn class_name_of(&self, type_id: TypeId) -> Option<&str> {
        self.maps
            .classes
            .iter()
            .find(|(_, class)| class.instance_type_id() == type_id)
            .map(|(name, _)| name.as_str())
    }

    /// Check if an array bundle is registered under `array_type_name`
    pub fn contains_array(&self, array_type_name: &str) -> bool {
        self.maps.arrays.contains_key(array_type_name)
    }

    /// Number of fields registered under `type_name`
    pub fn field_count(&self, type_name: &str) -> usize {
        self.field_records(type_name).len()
    }

    /// Names of all registered classes, in registration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.maps.classes.keys().map(String::as_str)
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.maps.record_count() == 0
    }

    /// Release every bundle
    ///
    /// Fails with [`Error::RegistryInUse`] while any other handle to this
    /// registry is alive. On success the registry behaves as if it had never
    /// been populated and the number of released bundles is returned.
    pub fn unregister_all(&mut self) -> Result<usize> {
        let handles = Arc::strong_count(&self.maps) - 1;
        match Arc::get_mut(&mut self.maps) {
            Some(maps) => {
                let released = maps.clear();
                log::info!("registry torn down, released {} bundles", released);
                Ok(released)
            }
            None => Err(Error::RegistryInUse(handles)),
        }
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("field_owners", &self.maps.fields.len())
            .field("arrays", &self.maps.arrays.len())
            .field("classes", &self.maps.classes.len())
            .finish()
    }
}

// Fails to compile if the registry stops being shareable across threads.
fn _assert_send_sync<T: Send + Sync>() {}
fn _registry_is_send_sync() {
    _assert_send_sync::<TypeRegistry>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{TypedField, VecArray};

    #[derive(Default)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl crate::Reflect for Point {
        const TYPE_NAME: &'static str = "Point";
    }

    fn point_fields(builder: &mut RegistryBuilder) {
        builder.register_field(
            "Point",
            TypedField::new("Point", "x", "i32", |p: &Point| &p.x, |p: &mut Point| &mut p.x),
        );
        builder.register_field(
            "Point",
            TypedField::new("Point", "y", "i32", |p: &Point| &p.y, |p: &mut Point| &mut p.y)
                .with_annotation("min:0, readonly"),
        );
    }

    #[test]
    fn test_field_registration_order() {
        let mut builder = RegistryBuilder::new();
        point_fields(&mut builder);
        let registry = builder.build();

        let meta = registry.type_meta("Point");
        let names: Vec<_> = meta.fields().iter().map(|f| f.field_name()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(registry.field_count("Point"), 2);
        assert!(meta.fields()[1].has_meta_tag("readonly"));
        assert_eq!(meta.fields()[1].get_meta_tag_value("min"), "0");
    }

    #[test]
    fn test_first_array_registration_wins() {
        let mut builder = RegistryBuilder::new();
        assert!(builder.register_array("Vec<i32>", VecArray::<i32>::new("Vec<i32>", "i32")));
        assert!(!builder.register_array("Vec<i32>", VecArray::<i32>::new("Vec<i32>", "int")));
        let registry = builder.build();

        let accessor = registry.array_accessor("Vec<i32>").unwrap();
        assert_eq!(accessor.element_type_name(), "i32");
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(!registry.type_meta("DoesNotExist").is_valid());
        assert_eq!(
            registry.array_accessor("Vec<f32>").err(),
            Some(Error::UnknownType("Vec<f32>".into()))
        );
        assert_eq!(
            registry.construct("DoesNotExist", &Json::Null).err(),
            Some(Error::UnknownType("DoesNotExist".into()))
        );
        assert_eq!(
            registry.write_by_name("DoesNotExist", &5i32).err(),
            Some(Error::UnknownType("DoesNotExist".into()))
        );
    }

    #[test]
    fn test_class_name_of() {
        let mut builder = RegistryBuilder::new();
        builder.register_class("Point", crate::bundle::ClassBundle::<Point>::new());
        let registry = builder.build();

        assert_eq!(registry.class_name_of(TypeId::of::<Point>()), Some("Point"));
        assert_eq!(registry.class_name_of(TypeId::of::<i32>()), None);
    }

    #[test]
    fn test_unregister_waits_for_handles() {
        let mut builder = RegistryBuilder::new();
        point_fields(&mut builder);
        let mut registry = builder.build();

        let meta = registry.type_meta("Point");
        assert_eq!(registry.unregister_all(), Err(Error::RegistryInUse(3)));

        drop(meta);
        assert_eq!(registry.unregister_all(), Ok(2));
        assert!(registry.is_empty());
        assert!(!registry.type_meta("Point").is_valid());
    }

    #[test]
    fn test_builder_unregister_all() {
        let mut builder = RegistryBuilder::new();
        point_fields(&mut builder);
        builder.register_array("Vec<i32>", VecArray::<i32>::new("Vec<i32>", "i32"));
        assert_eq!(builder.unregister_all(), 3);
        assert!(builder.build().is_empty());
    }
}
