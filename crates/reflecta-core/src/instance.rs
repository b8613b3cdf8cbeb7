//! Instances paired with their type meta, and polymorphic pointer slots

use crate::bundle::{AsAny, Upcast};
use crate::{Error, FieldAccessor, Result, TypeMeta};
use std::any::{type_name, Any, TypeId};
use std::fmt;

/// Shared view of an instance together with its type meta
///
/// Never owns the instance; base-class views alias the derived object's memory.
#[derive(Clone)]
pub struct ReflectionInstance<'a> {
    meta: TypeMeta,
    instance: &'a dyn Any,
}

impl<'a> ReflectionInstance<'a> {
    /// Pair an instance with its meta
    pub fn new(meta: TypeMeta, instance: &'a dyn Any) -> Self {
        Self { meta, instance }
    }

    /// Type meta of the instance
    pub fn meta(&self) -> &TypeMeta {
        &self.meta
    }

    /// Registered type name
    pub fn type_name(&self) -> &str {
        self.meta.type_name()
    }

    /// The instance itself
    pub fn instance(&self) -> &'a dyn Any {
        self.instance
    }

    /// Downcast to a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.instance.downcast_ref::<T>()
    }

    /// Accessor for a field of this instance's type
    pub fn field(&self, name: &str) -> FieldAccessor {
        self.meta.field_by_name(name)
    }

    /// Borrow a field by name
    pub fn get_field(&self, name: &str) -> Result<&'a dyn Any> {
        self.field(name).get(self.instance)
    }
}

impl fmt::Debug for ReflectionInstance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionInstance")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

/// Mutable view of an instance together with its type meta
pub struct ReflectionInstanceMut<'a> {
    meta: TypeMeta,
    instance: &'a mut dyn Any,
}

impl<'a> ReflectionInstanceMut<'a> {
    /// Pair an instance with its meta
    pub fn new(meta: TypeMeta, instance: &'a mut dyn Any) -> Self {
        Self { meta, instance }
    }

    /// Type meta of the instance
    pub fn meta(&self) -> &TypeMeta {
        &self.meta
    }

    /// Registered type name
    pub fn type_name(&self) -> &str {
        self.meta.type_name()
    }

    /// Borrow the instance
    pub fn instance(&self) -> &dyn Any {
        &*self.instance
    }

    /// Mutably borrow the instance
    pub fn instance_mut(&mut self) -> &mut dyn Any {
        &mut *self.instance
    }

    /// Downcast to a concrete type
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.instance.downcast_mut::<T>()
    }

    /// Replace a field value by name
    pub fn set_field(&mut self, name: &str, value: Box<dyn Any>) -> Result<()> {
        self.meta.field_by_name(name).set(&mut *self.instance, value)
    }

    /// Shared view of the same instance
    pub fn as_shared(&self) -> ReflectionInstance<'_> {
        ReflectionInstance::new(self.meta.clone(), &*self.instance)
    }
}

impl fmt::Debug for ReflectionInstanceMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionInstanceMut")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

/// A freshly constructed instance owned by the caller
pub struct OwnedInstance {
    meta: TypeMeta,
    instance: Box<dyn Any>,
}

impl OwnedInstance {
    pub(crate) fn new(meta: TypeMeta, instance: Box<dyn Any>) -> Self {
        Self { meta, instance }
    }

    /// Type meta of the instance
    pub fn meta(&self) -> &TypeMeta {
        &self.meta
    }

    /// Registered type name
    pub fn type_name(&self) -> &str {
        self.meta.type_name()
    }

    /// Shared view of the instance
    pub fn as_instance(&self) -> ReflectionInstance<'_> {
        ReflectionInstance::new(self.meta.clone(), self.instance.as_ref())
    }

    /// Take the instance as its concrete type
    pub fn downcast<T: Any>(self) -> Result<Box<T>> {
        let got = self.meta.type_name().to_string();
        self.instance
            .downcast::<T>()
            .map_err(|_| Error::mismatch(type_name::<T>(), got))
    }

    /// Take the instance as `Box<U>` through an up-cast registered on its class
    ///
    /// `U` is usually a trait object the concrete type implements.
    pub fn into_boxed<U: ?Sized + 'static>(self) -> Result<Box<U>> {
        let registry = self.meta.registry();
        let class = registry.class_ops(self.meta.type_name())?;
        let cast = class
            .upcast(TypeId::of::<U>())
            .and_then(|cast| cast.downcast_ref::<Upcast<U>>())
            .ok_or_else(|| Error::mismatch(type_name::<U>(), self.meta.type_name()))?;
        cast(self.instance).ok_or_else(|| Error::mismatch(type_name::<U>(), self.meta.type_name()))
    }
}

impl fmt::Debug for OwnedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedInstance")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

/// A polymorphic, owning pointer slot
///
/// Carries the registered name of the most-derived type next to the pointer,
/// so `ReflectionPtr<dyn Component>` can hold any registered component and be
/// serialized by that runtime name.
pub struct ReflectionPtr<T: ?Sized> {
    type_name: String,
    instance: Option<Box<T>>,
}

impl<T: ?Sized> ReflectionPtr<T> {
    /// Create a pointer holding `instance` of the registered type `type_name`
    pub fn new(type_name: impl Into<String>, instance: Box<T>) -> Self {
        Self {
            type_name: type_name.into(),
            instance: Some(instance),
        }
    }

    /// An empty slot
    pub fn null() -> Self {
        Self {
            type_name: String::new(),
            instance: None,
        }
    }

    /// Registered name of the held type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Record the registered name of the held type
    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = type_name.into();
    }

    /// Check if the slot is empty
    pub fn is_null(&self) -> bool {
        self.instance.is_none()
    }

    /// Borrow the held instance
    pub fn get(&self) -> Option<&T> {
        self.instance.as_deref()
    }

    /// Mutably borrow the held instance
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.instance.as_deref_mut()
    }

    /// Take the instance out, leaving the slot empty
    pub fn take(&mut self) -> Option<Box<T>> {
        self.type_name.clear();
        self.instance.take()
    }

    pub(crate) fn fill(&mut self, type_name: impl Into<String>, instance: Box<T>) {
        self.type_name = type_name.into();
        self.instance = Some(instance);
    }
}

impl<T: ?Sized + AsAny> ReflectionPtr<T> {
    /// Borrow the held instance as `dyn Any`
    pub fn get_any(&self) -> Option<&dyn Any> {
        self.instance.as_deref().map(|instance| instance.as_any())
    }

    /// Downcast the held instance to a concrete type
    pub fn downcast_ref<U: Any>(&self) -> Option<&U> {
        self.get_any()?.downcast_ref::<U>()
    }
}

impl<T: ?Sized> Default for ReflectionPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> fmt::Debug for ReflectionPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionPtr")
            .field("type_name", &self.type_name)
            .field("is_null", &self.is_null())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: AsAny {
        fn area(&self) -> f32;
    }

    struct Square(f32);

    impl Shape for Square {
        fn area(&self) -> f32 {
            self.0 * self.0
        }
    }

    #[test]
    fn test_reflection_ptr() {
        let mut ptr: ReflectionPtr<dyn Shape> = ReflectionPtr::new("Square", Box::new(Square(2.0)));
        assert_eq!(ptr.type_name(), "Square");
        assert!(!ptr.is_null());
        assert_eq!(ptr.get().map(|s| s.area()), Some(4.0));
        assert_eq!(ptr.downcast_ref::<Square>().map(|s| s.0), Some(2.0));

        ptr.set_type_name("Renamed");
        assert_eq!(ptr.type_name(), "Renamed");

        assert!(ptr.take().is_some());
        assert!(ptr.is_null());
        assert_eq!(ptr.type_name(), "");
    }

    #[test]
    fn test_mutable_view() {
        let mut value = 3i32;
        let mut view = ReflectionInstanceMut::new(TypeMeta::unknown(), &mut value);
        *view.downcast_mut::<i32>().unwrap() += 1;
        assert!(view.instance_mut().downcast_mut::<f32>().is_none());

        let shared = view.as_shared();
        assert_eq!(shared.downcast_ref::<i32>(), Some(&4));
        assert_eq!(shared.type_name(), crate::UNKNOWN_TYPE);
        assert_eq!(value, 4);
    }

    #[test]
    fn test_default_is_null() {
        let ptr: ReflectionPtr<dyn Shape> = ReflectionPtr::default();
        assert!(ptr.is_null());
        assert!(ptr.get_any().is_none());
    }
}
