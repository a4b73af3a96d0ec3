//! Runtime type identity.
//!
//! A [`Shape`] names the concrete Rust type behind an erased [`Value`](crate::Value).
//! Shapes are the unit every compatibility check in the engine is made of:
//! parameter lists, conversion edge endpoints and calling conventions are all
//! compared shape by shape.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The runtime identity of a concrete type.
///
/// Two shapes are equal iff they describe the same type. The type name is
/// carried for diagnostics only.
///
/// # Example
///
/// ```
/// use meridian_core::Shape;
///
/// assert_eq!(Shape::of::<String>(), Shape::of::<String>());
/// assert_ne!(Shape::of::<String>(), Shape::of::<u32>());
/// assert!(Shape::of::<String>().name().ends_with("String"));
/// ```
#[derive(Clone, Copy)]
pub struct Shape {
    id: TypeId,
    name: &'static str,
}

impl Shape {
    /// Returns the shape of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the underlying type id.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the full type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this shape describes `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Shape {}

impl Hash for Shape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shape").field(&self.name).finish()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
