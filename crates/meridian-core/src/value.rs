//! Erased values and argument lists.
//!
//! [`Value`] is what flows between the builder, the resolver and the
//! signature converter: middleware descriptors, intermediate apps, conversion
//! inputs and outputs, extra stage arguments and property bag entries. It is a
//! closed set of representations rather than an open reflection surface:
//!
//! - plain data of any `Send + Sync` type,
//! - a callable handle together with its [`Convention`] and, when the handle
//!   is [`Invocable`], a dynamic invoker,
//! - a component instance exposing named operations,
//! - a component type that can be constructed from an argument list.

use crate::component::{Component, ComponentType};
use crate::convention::{Convention, Invocable, Signature};
use crate::error::{BuildError, BuildResult};
use crate::shape::Shape;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Invoker = Arc<dyn Fn(&Args) -> BuildResult<Value> + Send + Sync>;

#[derive(Clone)]
enum Repr {
    Data(Arc<dyn Any + Send + Sync>),
    Callable {
        convention: Convention,
        handle: Arc<dyn Any + Send + Sync>,
        invoker: Option<Invoker>,
    },
    Component {
        instance: Arc<dyn Component>,
        any: Arc<dyn Any + Send + Sync>,
    },
    ComponentType(Arc<ComponentType>),
}

/// A type-erased, cheaply cloneable value.
///
/// # Example
///
/// ```
/// use meridian_core::{Args, SharedFn, Value};
/// use std::sync::Arc;
///
/// let data = Value::new(String::from("hello"));
/// assert!(data.is::<String>());
/// assert_eq!(data.get::<String>().as_deref(), Some("hello"));
///
/// let double: SharedFn<u32, u32> = Arc::new(|n| n * 2);
/// let callable = Value::callable(double);
/// let out = callable.invoke(&Args::new().with(21u32)).unwrap();
/// assert_eq!(out.get::<u32>(), Some(42));
/// ```
#[derive(Clone)]
pub struct Value {
    shape: Shape,
    repr: Repr,
}

impl Value {
    /// Wraps plain data.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            shape: Shape::of::<T>(),
            repr: Repr::Data(Arc::new(value)),
        }
    }

    /// Wraps a callable handle whose convention is known but which cannot be
    /// invoked with an erased argument list.
    #[must_use]
    pub fn function<F: Signature>(handle: F) -> Self {
        Self {
            shape: Shape::of::<F>(),
            repr: Repr::Callable {
                convention: F::convention(),
                handle: Arc::new(handle),
                invoker: None,
            },
        }
    }

    /// Wraps a callable handle that can be invoked dynamically.
    #[must_use]
    pub fn callable<F: Invocable>(handle: F) -> Self {
        let target = handle.clone();
        let invoker: Invoker = Arc::new(move |args: &Args| target.invoke(args));
        Self {
            shape: Shape::of::<F>(),
            repr: Repr::Callable {
                convention: F::convention(),
                handle: Arc::new(handle),
                invoker: Some(invoker),
            },
        }
    }

    /// Wraps a constructed component instance.
    #[must_use]
    pub fn component<C: Component>(instance: Arc<C>) -> Self {
        let any: Arc<dyn Any + Send + Sync> = instance.clone();
        Self {
            shape: Shape::of::<C>(),
            repr: Repr::Component { instance, any },
        }
    }

    /// Wraps a component type descriptor.
    #[must_use]
    pub fn component_type(component_type: ComponentType) -> Self {
        Self {
            shape: Shape::of::<ComponentType>(),
            repr: Repr::ComponentType(Arc::new(component_type)),
        }
    }

    /// Wraps a typed absent value, which only fits `Option<T>` parameters.
    #[must_use]
    pub fn none<T: Send + Sync + 'static>() -> Self {
        Self::new(None::<T>)
    }

    /// Returns the shape of the wrapped value.
    #[must_use]
    pub const fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns `true` if the wrapped value is a `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.shape.is::<T>()
    }

    /// Returns a clone of the wrapped value if it is a `T`.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.as_any().and_then(|any| any.downcast_ref::<T>()).cloned()
    }

    /// Returns the wrapped value as a shared `T`.
    #[must_use]
    pub fn downcast_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let any = match &self.repr {
            Repr::Data(any) | Repr::Callable { handle: any, .. } | Repr::Component { any, .. } => {
                Arc::clone(any)
            }
            Repr::ComponentType(_) => return None,
        };
        any.downcast::<T>().ok()
    }

    /// Returns the callable convention, if this value is a callable handle.
    #[must_use]
    pub fn convention(&self) -> Option<&Convention> {
        match &self.repr {
            Repr::Callable { convention, .. } => Some(convention),
            _ => None,
        }
    }

    /// Returns `true` if this value can be invoked with [`Value::invoke`].
    #[must_use]
    pub fn is_invocable(&self) -> bool {
        matches!(
            self.repr,
            Repr::Callable {
                invoker: Some(_),
                ..
            }
        )
    }

    /// Invokes a dynamically invocable callable.
    pub fn invoke(&self, args: &Args) -> BuildResult<Value> {
        match &self.repr {
            Repr::Callable {
                invoker: Some(invoker),
                ..
            } => invoker(args),
            _ => Err(BuildError::invalid_argument(
                "callable",
                format!("{} cannot be invoked dynamically", self.describe()),
            )),
        }
    }

    /// Returns the component instance, if this value is one.
    #[must_use]
    pub fn as_component(&self) -> Option<&Arc<dyn Component>> {
        match &self.repr {
            Repr::Component { instance, .. } => Some(instance),
            _ => None,
        }
    }

    /// Returns the component type, if this value is one.
    #[must_use]
    pub fn as_component_type(&self) -> Option<&Arc<ComponentType>> {
        match &self.repr {
            Repr::ComponentType(component_type) => Some(component_type),
            _ => None,
        }
    }

    /// Returns `true` if this value already satisfies `convention`.
    #[must_use]
    pub fn satisfies(&self, convention: &Convention) -> bool {
        convention.is_satisfied_by(self.shape)
    }

    /// Returns `true` if this value may be bound to a parameter of `param`.
    ///
    /// A value fits when its shape is the parameter shape, or when the
    /// parameter is itself an erased [`Value`].
    #[must_use]
    pub fn fits(&self, param: Shape) -> bool {
        self.shape == param || param.is::<Value>()
    }

    /// Returns a short human-readable description for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.repr {
            Repr::Data(_) => format!("value {}", self.shape),
            Repr::Callable { convention, .. } => format!("callable {convention}"),
            Repr::Component { .. } => format!("component {}", self.shape),
            Repr::ComponentType(component_type) => {
                format!("component type {}", component_type.name())
            }
        }
    }

    fn as_any(&self) -> Option<&(dyn Any + Send + Sync)> {
        match &self.repr {
            Repr::Data(any) | Repr::Callable { handle: any, .. } | Repr::Component { any, .. } => {
                Some(any.as_ref())
            }
            Repr::ComponentType(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.describe()).finish()
    }
}

/// An ordered list of erased arguments.
///
/// # Example
///
/// ```
/// use meridian_core::{Args, Shape};
///
/// let args = Args::new().with(1u8).with("two");
/// assert_eq!(args.len(), 2);
/// assert!(args.fits(&[Shape::of::<u8>(), Shape::of::<&'static str>()]));
/// ```
#[derive(Clone, Default, Debug)]
pub struct Args(Vec<Value>);

impl Args {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends plain data.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.0.push(Value::new(value));
        self
    }

    /// Appends an already erased value.
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.0.push(value);
        self
    }

    /// Returns a new list with `first` prepended.
    #[must_use]
    pub fn prepend(&self, first: Value) -> Self {
        let mut values = Vec::with_capacity(self.0.len() + 1);
        values.push(first);
        values.extend(self.0.iter().cloned());
        Self(values)
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the argument at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Iterates over the arguments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Returns the shapes of the arguments in order.
    #[must_use]
    pub fn shapes(&self) -> Vec<Shape> {
        self.0.iter().map(Value::shape).collect()
    }

    /// Returns `true` if the arguments match `params` by count and shape.
    #[must_use]
    pub fn fits(&self, params: &[Shape]) -> bool {
        params.len() == self.0.len()
            && self
                .0
                .iter()
                .zip(params)
                .all(|(arg, param)| arg.fits(*param))
    }

    /// Extracts the argument at `index` as a `T`.
    pub fn extract<T: Clone + Send + Sync + 'static>(&self, index: usize) -> BuildResult<T> {
        let value = self.0.get(index).ok_or(BuildError::ArgumentCount {
            expected: index + 1,
            actual: self.0.len(),
        })?;

        // A `Value` parameter receives the erased argument itself.
        if let Some(erased) = (value as &dyn Any).downcast_ref::<T>() {
            return Ok(erased.clone());
        }

        value.get::<T>().ok_or(BuildError::ArgumentMismatch {
            index,
            expected: Shape::of::<T>(),
            actual: value.shape(),
        })
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Args {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
