//! The shared property bag.
//!
//! A [`Properties`] handle is cheap to clone and every clone refers to the
//! same store. A builder and all of its branches hold clones of one bag, so a
//! key written through any of them is visible to all of them.

use indexmap::IndexMap;
use meridian_core::Value;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Well-known property keys.
pub mod keys {
    /// Terminal app used when no stage claims a unit of work.
    ///
    /// Any value convertible to the build target is accepted.
    pub const DEFAULT_APP: &str = "builder.DefaultApp";

    /// A `SharedFn<Value, BuildResult<()>>` that registers a conversion into
    /// the builder's shared registry.
    pub const ADD_SIGNATURE_CONVERSION: &str = "builder.AddSignatureConversion";

    /// Application name supplied by the host.
    pub const APP_NAME: &str = "host.AppName";

    /// Deployment environment supplied by the host.
    pub const ENVIRONMENT: &str = "host.Environment";

    /// Prefix of free-form host properties.
    pub const HOST_PROPERTIES_PREFIX: &str = "host.Properties.";
}

/// Shared, mutable, string-keyed store of opaque values.
///
/// Keys iterate in insertion order.
///
/// # Example
///
/// ```
/// use meridian_middleware::Properties;
///
/// let props = Properties::new();
/// let shared = props.clone();
///
/// props.insert("host.AppName", String::from("orders"));
/// assert_eq!(shared.get_as::<String>("host.AppName").as_deref(), Some("orders"));
/// ```
#[derive(Clone, Default)]
pub struct Properties {
    inner: Arc<RwLock<IndexMap<String, Value>>>,
}

impl Properties {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Returns the value stored under `key` if it is a `T`.
    #[must_use]
    pub fn get_as<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.inner.read().get(key).and_then(Value::get::<T>)
    }

    /// Stores an erased value, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().insert(key.into(), value)
    }

    /// Stores plain data, returning the previous value.
    pub fn insert<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Option<Value> {
        self.set(key, Value::new(value))
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().shift_remove(key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Returns a snapshot of the keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns `true` if both handles refer to the same bag.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.read().iter()).finish()
    }
}
