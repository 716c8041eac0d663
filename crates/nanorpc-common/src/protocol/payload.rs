//! Type-erased request and response values
//!
//! Services accept and return any message type, so the runtime moves values
//! around as a [`Payload`]: a boxed value that remembers its concrete type.
//! Handlers turn it back into a concrete type with [`Payload::downcast`].

use std::any::{type_name, Any, TypeId};
use std::fmt;

/// A boxed request or response value.
///
/// # Example
///
/// ```
/// use nanorpc_common::Payload;
///
/// let payload = Payload::new(String::from("hello"));
/// assert!(payload.is::<String>());
/// assert_eq!(payload.downcast::<String>().unwrap(), "hello");
/// ```
pub struct Payload {
    value: Box<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Payload {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// `TypeId` of the boxed value (not of the box).
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Unboxes the value, giving the payload back untouched on a type mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Payload> {
        let Payload {
            value,
            type_id,
            type_name,
        } = self;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Payload {
                value,
                type_id,
                type_name,
            }),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
