use std::any::{self, Any, TypeId};

/// An owned, type-erased heap object
///
/// `AnyValue` is the opaque storage every descriptor operates on. It remembers the
/// concrete type it was created from so descriptors can tell their own values apart
/// from foreign ones without downcasting.
#[derive(Debug)]
pub struct AnyValue {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl AnyValue {
    /// Create a new AnyValue from a value of any type that implements Any, Send, and Sync
    pub fn new<T: 'static + Any + Send + Sync>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// The `TypeId` of the contained value
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type name of the contained value, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check if the contained value is of type T
    pub fn is_type<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Get a reference to the contained value if it is of type T
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Get a mutable reference to the contained value if it is of type T
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Unwrap the contained value, handing `self` back if it is not a T
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        if !self.is_type::<T>() {
            return Err(self);
        }
        let Self {
            type_id,
            type_name,
            value,
        } = self;
        match value.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(value) => Err(Self {
                type_id,
                type_name,
                value,
            }),
        }
    }

    /// Replace the contents with a new value, possibly of a different type
    pub fn set<T: 'static + Any + Send + Sync>(&mut self, value: T) {
        *self = Self::new(value);
    }
}
