//! Operation bundles registered per type
//!
//! A bundle is the set of type-erased operations the registry stores under a
//! type name. There is one trait per bundle kind:
//!
//! - [`FieldOps`]: get/set and JSON codec for one field of one owner type
//! - [`ArrayOps`]: element access for one sequence type
//! - [`ClassOps`]: construction, base-class views and JSON for a whole type
//!
//! Instances cross the boundary as `&dyn Any`; every implementation here
//! downcasts and reports [`Error::TypeMismatch`] instead of trusting the caller.
//! [`TypedField`], [`VecArray`] and [`ClassBundle`] are the implementations
//! registration code normally uses.

use crate::instance::{ReflectionInstance, ReflectionInstanceMut};
use crate::serializer::Marshal;
use crate::{Error, Json, Result, TypeRegistry};
use serde_json::Map;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Access to `dyn Any` through other trait objects
///
/// Make a polymorphic base trait a subtrait of `AsAny` so its instances can be
/// handed to the registry: `trait Component: AsAny { .. }`.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Convert into `Box<dyn Any>`
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A reflectable struct
///
/// Base classes are modelled as embedded structs; `bases` and `bases_mut`
/// return views into those sub-objects (the same memory, never copies),
/// paired with the registered name of each base type.
pub trait Reflect: Any + Default {
    /// Registered name of this type
    const TYPE_NAME: &'static str;

    /// Views of the embedded base-class sub-objects, base-first
    fn bases(&self) -> Vec<(&'static str, &dyn Any)> {
        Vec::new()
    }

    /// Mutable views of the embedded base-class sub-objects
    fn bases_mut(&mut self) -> Vec<(&'static str, &mut dyn Any)> {
        Vec::new()
    }
}

/// Operations for one field of one owner type
pub trait FieldOps: Send + Sync {
    /// Field name
    fn field_name(&self) -> &str;

    /// Declared type name of the field
    fn field_type_name(&self) -> &str;

    /// Name of the type that owns the field
    fn owner_type_name(&self) -> &str;

    /// Whether the declared field type is itself a registered array type
    fn is_array(&self) -> bool;

    /// Raw annotation string for the field
    fn annotation(&self) -> &str {
        ""
    }

    /// Borrow the field out of an owner instance
    fn get<'a>(&self, instance: &'a dyn Any) -> Result<&'a dyn Any>;

    /// Mutably borrow the field out of an owner instance
    fn get_mut<'a>(&self, instance: &'a mut dyn Any) -> Result<&'a mut dyn Any>;

    /// Replace the field value
    fn set(&self, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<()>;

    /// Encode the field value
    fn to_json(&self, registry: &TypeRegistry, instance: &dyn Any) -> Result<Json>;

    /// Decode into the field value
    fn read_json(&self, registry: &TypeRegistry, instance: &mut dyn Any, json: &Json)
        -> Result<()>;
}

/// Operations for one sequence type
pub trait ArrayOps: Send + Sync {
    /// Registered name of the array type
    fn array_type_name(&self) -> &str;

    /// Registered name of the element type
    fn element_type_name(&self) -> &str;

    /// Number of elements
    fn size(&self, instance: &dyn Any) -> Result<usize>;

    /// Borrow one element
    fn get<'a>(&self, index: usize, instance: &'a dyn Any) -> Result<&'a dyn Any>;

    /// Mutably borrow one element
    fn get_mut<'a>(&self, index: usize, instance: &'a mut dyn Any) -> Result<&'a mut dyn Any>;

    /// Replace one element
    fn set(&self, index: usize, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<()>;

    /// Grow or shrink to `len` elements, filling with defaults
    fn resize(&self, instance: &mut dyn Any, len: usize) -> Result<()>;

    /// Encode one element
    fn element_to_json(&self, registry: &TypeRegistry, index: usize, instance: &dyn Any)
        -> Result<Json>;

    /// Decode into one element
    fn element_from_json(
        &self,
        registry: &TypeRegistry,
        index: usize,
        instance: &mut dyn Any,
        json: &Json,
    ) -> Result<()>;
}

/// Operations for a whole reflectable type
pub trait ClassOps: Send + Sync {
    /// Rust type backing the registered name
    fn instance_type_id(&self) -> TypeId;

    /// Views of the base-class sub-objects of `instance`
    fn base_instances<'a>(
        &self,
        registry: &TypeRegistry,
        instance: &'a dyn Any,
    ) -> Result<Vec<ReflectionInstance<'a>>>;

    /// Mutable views of the base-class sub-objects of `instance`
    fn base_instances_mut<'a>(
        &self,
        registry: &TypeRegistry,
        instance: &'a mut dyn Any,
    ) -> Result<Vec<ReflectionInstanceMut<'a>>>;

    /// Allocate a new instance from its JSON object
    fn construct(&self, registry: &TypeRegistry, json: &Json) -> Result<Box<dyn Any>>;

    /// Fill an existing instance from its JSON object
    fn read_into(&self, registry: &TypeRegistry, instance: &mut dyn Any, json: &Json)
        -> Result<()>;

    /// Encode an instance as a JSON object
    fn to_json(&self, registry: &TypeRegistry, instance: &dyn Any) -> Result<Json>;

    /// Up-cast function into `Box<U>` for the `TypeId` of `U`, stored as [`Upcast<U>`]
    fn upcast(&self, _target: TypeId) -> Option<&(dyn Any + Send + Sync)> {
        None
    }
}

/// Checked conversion from a constructed instance into `Box<U>`
pub type Upcast<U> = Box<dyn Fn(Box<dyn Any>) -> Option<Box<U>> + Send + Sync>;

fn instance_mismatch<T: ?Sized>() -> Error {
    Error::mismatch(type_name::<T>(), "instance of another type")
}

// ============================================================================
// Fields
// ============================================================================

/// Field bundle over a getter pair of an owner struct `O`
pub struct TypedField<O, F> {
    owner: String,
    name: String,
    type_name: String,
    is_array: bool,
    annotation: String,
    getter: fn(&O) -> &F,
    getter_mut: fn(&mut O) -> &mut F,
}

impl<O: Any, F: Any + Marshal> TypedField<O, F> {
    /// Create a field bundle
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
        getter: fn(&O) -> &F,
        getter_mut: fn(&mut O) -> &mut F,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            type_name: type_name.into(),
            is_array: false,
            annotation: String::new(),
            getter,
            getter_mut,
        }
    }

    /// Attach a raw annotation string
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    /// Mark the declared type as a registered array type
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    fn owner<'a>(&self, instance: &'a dyn Any) -> Result<&'a O> {
        instance
            .downcast_ref::<O>()
            .ok_or_else(|| Error::mismatch(self.owner.as_str(), "instance of another type"))
    }

    fn owner_mut<'a>(&self, instance: &'a mut dyn Any) -> Result<&'a mut O> {
        instance
            .downcast_mut::<O>()
            .ok_or_else(|| Error::mismatch(self.owner.as_str(), "instance of another type"))
    }
}

impl<O: Any, F: Any + Marshal> FieldOps for TypedField<O, F> {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn field_type_name(&self) -> &str {
        &self.type_name
    }

    fn owner_type_name(&self) -> &str {
        &self.owner
    }

    fn is_array(&self) -> bool {
        self.is_array
    }

    fn annotation(&self) -> &str {
        &self.annotation
    }

    fn get<'a>(&self, instance: &'a dyn Any) -> Result<&'a dyn Any> {
        let owner = self.owner(instance)?;
        Ok((self.getter)(owner))
    }

    fn get_mut<'a>(&self, instance: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        let owner = self.owner_mut(instance)?;
        Ok((self.getter_mut)(owner))
    }

    fn set(&self, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
        let value = value
            .downcast::<F>()
            .map_err(|_| Error::mismatch(self.type_name.as_str(), "value of another type"))?;
        let owner = self.owner_mut(instance)?;
        *(self.getter_mut)(owner) = *value;
        Ok(())
    }

    fn to_json(&self, registry: &TypeRegistry, instance: &dyn Any) -> Result<Json> {
        let owner = self.owner(instance)?;
        (self.getter)(owner).write_json(registry)
    }

    fn read_json(
        &self,
        registry: &TypeRegistry,
        instance: &mut dyn Any,
        json: &Json,
    ) -> Result<()> {
        let owner = self.owner_mut(instance)?;
        (self.getter_mut)(owner).read_json(registry, json)
    }
}

// ============================================================================
// Arrays
// ============================================================================

/// Array bundle for `Vec<E>`
pub struct VecArray<E> {
    array_type_name: String,
    element_type_name: String,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Any + Default + Marshal> VecArray<E> {
    /// Create an array bundle
    pub fn new(array_type_name: impl Into<String>, element_type_name: impl Into<String>) -> Self {
        Self {
            array_type_name: array_type_name.into(),
            element_type_name: element_type_name.into(),
            _marker: PhantomData,
        }
    }

    fn vec<'a>(&self, instance: &'a dyn Any) -> Result<&'a Vec<E>> {
        instance
            .downcast_ref::<Vec<E>>()
            .ok_or_else(instance_mismatch::<Vec<E>>)
    }

    fn vec_mut<'a>(&self, instance: &'a mut dyn Any) -> Result<&'a mut Vec<E>> {
        instance
            .downcast_mut::<Vec<E>>()
            .ok_or_else(instance_mismatch::<Vec<E>>)
    }
}

impl<E: Any + Default + Marshal> ArrayOps for VecArray<E> {
    fn array_type_name(&self) -> &str {
        &self.array_type_name
    }

    fn element_type_name(&self) -> &str {
        &self.element_type_name
    }

    fn size(&self, instance: &dyn Any) -> Result<usize> {
        Ok(self.vec(instance)?.len())
    }

    fn get<'a>(&self, index: usize, instance: &'a dyn Any) -> Result<&'a dyn Any> {
        let vec = self.vec(instance)?;
        let len = vec.len();
        vec.get(index)
            .map(|e| e as &dyn Any)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    fn get_mut<'a>(&self, index: usize, instance: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        let vec = self.vec_mut(instance)?;
        let len = vec.len();
        vec.get_mut(index)
            .map(|e| e as &mut dyn Any)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    fn set(&self, index: usize, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
        let value = value.downcast::<E>().map_err(|_| {
            Error::mismatch(self.element_type_name.as_str(), "value of another type")
        })?;
        let vec = self.vec_mut(instance)?;
        let len = vec.len();
        let slot = vec
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        *slot = *value;
        Ok(())
    }

    fn resize(&self, instance: &mut dyn Any, len: usize) -> Result<()> {
        self.vec_mut(instance)?.resize_with(len, E::default);
        Ok(())
    }

    fn element_to_json(
        &self,
        registry: &TypeRegistry,
        index: usize,
        instance: &dyn Any,
    ) -> Result<Json> {
        let vec = self.vec(instance)?;
        let element = vec.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: vec.len(),
        })?;
        element.write_json(registry)
    }

    fn element_from_json(
        &self,
        registry: &TypeRegistry,
        index: usize,
        instance: &mut dyn Any,
        json: &Json,
    ) -> Result<()> {
        let vec = self.vec_mut(instance)?;
        let len = vec.len();
        let element = vec
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        element.read_json(registry, json)
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Class bundle for a [`Reflect`] type, driven entirely by the registry
///
/// Encoding walks the base-class views first, then the fields registered
/// under `T::TYPE_NAME`. Array fields go through the registered
/// [`ArrayOps`] of their declared type.
pub struct ClassBundle<T> {
    upcasts: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect> ClassBundle<T> {
    /// Create a class bundle that can be placed into `Box<T>`
    pub fn new() -> Self {
        let identity: Upcast<T> = Box::new(|any: Box<dyn Any>| any.downcast::<T>().ok());
        let mut upcasts: HashMap<TypeId, Box<dyn Any + Send + Sync>> = HashMap::new();
        upcasts.insert(TypeId::of::<T>(), Box::new(identity));
        Self {
            upcasts,
            _marker: PhantomData,
        }
    }

    /// Allow constructed instances to be placed into `Box<U>`
    ///
    /// `U` is typically a trait object: `.with_upcast::<dyn Component>(|d| d)`.
    pub fn with_upcast<U: ?Sized + 'static>(mut self, cast: fn(Box<T>) -> Box<U>) -> Self {
        let erased: Upcast<U> =
            Box::new(move |any: Box<dyn Any>| any.downcast::<T>().ok().map(cast));
        self.upcasts.insert(TypeId::of::<U>(), Box::new(erased));
        self
    }

    fn this<'a>(&self, instance: &'a dyn Any) -> Result<&'a T> {
        instance
            .downcast_ref::<T>()
            .ok_or_else(|| Error::mismatch(T::TYPE_NAME, "instance of another type"))
    }

    fn this_mut<'a>(&self, instance: &'a mut dyn Any) -> Result<&'a mut T> {
        instance
            .downcast_mut::<T>()
            .ok_or_else(|| Error::mismatch(T::TYPE_NAME, "instance of another type"))
    }
}

impl<T: Reflect> Default for ClassBundle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reflect> ClassOps for ClassBundle<T> {
    fn instance_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn base_instances<'a>(
        &self,
        registry: &TypeRegistry,
        instance: &'a dyn Any,
    ) -> Result<Vec<ReflectionInstance<'a>>> {
        Ok(self
            .this(instance)?
            .bases()
            .into_iter()
            .map(|(name, base)| ReflectionInstance::new(registry.type_meta(name), base))
            .collect())
    }

    fn base_instances_mut<'a>(
        &self,
        registry: &TypeRegistry,
        instance: &'a mut dyn Any,
    ) -> Result<Vec<ReflectionInstanceMut<'a>>> {
        Ok(self
            .this_mut(instance)?
            .bases_mut()
            .into_iter()
            .map(|(name, base)| ReflectionInstanceMut::new(registry.type_meta(name), base))
            .collect())
    }

    fn construct(&self, registry: &TypeRegistry, json: &Json) -> Result<Box<dyn Any>> {
        let mut instance = T::default();
        self.read_into(registry, &mut instance, json)?;
        Ok(Box::new(instance))
    }

    fn read_into(
        &self,
        registry: &TypeRegistry,
        instance: &mut dyn Any,
        json: &Json,
    ) -> Result<()> {
        let object = json.as_object().ok_or_else(|| {
            Error::MalformedJson(format!("expected object for {}", T::TYPE_NAME))
        })?;

        for (base_name, base) in self.this_mut(instance)?.bases_mut() {
            registry.read_into_by_name(base_name, base, json)?;
        }

        read_fields(registry, T::TYPE_NAME, instance, object)
    }

    fn to_json(&self, registry: &TypeRegistry, instance: &dyn Any) -> Result<Json> {
        let mut object = Map::new();

        // Base fields first so the derived type's own fields win on collision.
        for (base_name, base) in self.this(instance)?.bases() {
            if let Json::Object(base_object) = registry.write_by_name(base_name, base)? {
                object.extend(base_object);
            }
        }

        write_fields(registry, T::TYPE_NAME, instance, &mut object)?;
        Ok(Json::Object(object))
    }

    fn upcast(&self, target: TypeId) -> Option<&(dyn Any + Send + Sync)> {
        self.upcasts.get(&target).map(|cast| cast.as_ref())
    }
}

/// Encode the fields registered under `type_name` into `object`
fn write_fields(
    registry: &TypeRegistry,
    type_name: &str,
    instance: &dyn Any,
    object: &mut Map<String, Json>,
) -> Result<()> {
    for field in registry.type_meta(type_name).fields() {
        let value = if field.is_array_type() {
            let array = registry.array_accessor(field.field_type_name())?;
            let sequence = field.get(instance)?;
            let len = array.size(sequence)?;
            let mut items = Vec::with_capacity(len);
            for index in 0..len {
                items.push(array.element_to_json(index, sequence)?);
            }
            Json::Array(items)
        } else {
            field.to_json(instance)?
        };
        object.insert(field.field_name().to_string(), value);
    }
    Ok(())
}

/// Decode the fields registered under `type_name` from `object`
///
/// Keys that are missing or `null` leave the field untouched.
fn read_fields(
    registry: &TypeRegistry,
    type_name: &str,
    instance: &mut dyn Any,
    object: &Map<String, Json>,
) -> Result<()> {
    for field in registry.type_meta(type_name).fields() {
        let value = match object.get(field.field_name()) {
            None | Some(Json::Null) => continue,
            Some(value) => value,
        };

        if field.is_array_type() {
            let array = registry.array_accessor(field.field_type_name())?;
            let items = value.as_array().ok_or_else(|| {
                Error::MalformedJson(format!("expected array for field {}", field.field_name()))
            })?;
            let sequence = field.get_mut(instance)?;
            array.resize(sequence, items.len())?;
            for (index, item) in items.iter().enumerate() {
                array.element_from_json(index, sequence, item)?;
            }
        } else {
            field.read_json(instance, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryBuilder;
    use serde_json::json;

    #[derive(Default)]
    struct Named {
        label: String,
    }

    impl Reflect for Named {
        const TYPE_NAME: &'static str = "Named";
    }

    #[derive(Default)]
    struct Renamed {
        base: Named,
        label: String,
    }

    impl Reflect for Renamed {
        const TYPE_NAME: &'static str = "Renamed";

        fn bases(&self) -> Vec<(&'static str, &dyn Any)> {
            vec![(Named::TYPE_NAME, &self.base as &dyn Any)]
        }

        fn bases_mut(&mut self) -> Vec<(&'static str, &mut dyn Any)> {
            vec![(Named::TYPE_NAME, &mut self.base as &mut dyn Any)]
        }
    }

    fn registry() -> TypeRegistry {
        let mut builder = RegistryBuilder::new();
        builder.register_field(
            "Named",
            TypedField::new(
                "Named",
                "label",
                "String",
                |n: &Named| &n.label,
                |n: &mut Named| &mut n.label,
            ),
        );
        builder.register_class("Named", ClassBundle::<Named>::new());
        builder.register_field(
            "Renamed",
            TypedField::new(
                "Renamed",
                "label",
                "String",
                |r: &Renamed| &r.label,
                |r: &mut Renamed| &mut r.label,
            ),
        );
        builder.register_class("Renamed", ClassBundle::<Renamed>::new());
        builder.build()
    }

    #[test]
    fn test_derived_field_shadows_base() {
        let registry = registry();
        let value = Renamed {
            base: Named {
                label: "base".to_string(),
            },
            label: "derived".to_string(),
        };
        let json = registry.write_by_name("Renamed", &value).unwrap();
        assert_eq!(json, json!({"label": "derived"}));

        // Reading fills both the base and the derived field from the same key.
        let mut back = Renamed::default();
        registry
            .read_into_by_name("Renamed", &mut back, &json!({"label": "x"}))
            .unwrap();
        assert_eq!(back.base.label, "x");
        assert_eq!(back.label, "x");
    }

    #[test]
    fn test_typed_field_checks_owner() {
        let field = TypedField::new(
            "Named",
            "label",
            "String",
            |n: &Named| &n.label,
            |n: &mut Named| &mut n.label,
        );
        let mut wrong = 5i32;
        assert!(matches!(field.get(&wrong), Err(Error::TypeMismatch { .. })));
        assert!(matches!(
            field.set(&mut wrong, Box::new(String::new())),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_upcast_lookup() {
        let bundle = ClassBundle::<Named>::new();
        assert!(bundle.upcast(TypeId::of::<Named>()).is_some());
        assert!(bundle.upcast(TypeId::of::<dyn AsAny>()).is_none());

        let bundle = bundle.with_upcast::<dyn AsAny>(|n| n);
        assert!(bundle.upcast(TypeId::of::<dyn AsAny>()).is_some());
    }
}
