//! Components and their operations.
//!
//! A [`Component`] is a constructed object that exposes named operations
//! instead of being a closure itself. Two operation names carry meaning for
//! pipeline assembly:
//!
//! - [`INITIALIZE`]: wires an instance to the next stage. The instance itself
//!   then becomes the stage output.
//! - [`INVOKE`]: either a generator `(next, ...) -> app`, or the per-request
//!   entry point the signature converter binds when a callable convention is
//!   requested from an instance.
//!
//! A [`ComponentType`] describes a component that has not been built yet,
//! together with the constructor forms it can be built from.

use crate::convention::{Convention, Invocable, Signature};
use crate::error::{BuildError, BuildResult};
use crate::shape::Shape;
use crate::value::{Args, Value};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Operation name used to wire an instance to its next stage.
pub const INITIALIZE: &str = "Initialize";

/// Operation name used for generators and per-request entry points.
pub const INVOKE: &str = "Invoke";

/// A constructed object exposing named operations.
///
/// # Example
///
/// ```
/// use meridian_core::{Component, Operation, Operations, SharedFn, Value};
/// use std::sync::Arc;
///
/// struct Doubler;
///
/// impl Component for Doubler {
///     fn operations(self: Arc<Self>) -> Operations {
///         let double: SharedFn<u32, u32> = Arc::new(|n| n * 2);
///         Operations::new().with(Operation::new("Invoke", double))
///     }
/// }
///
/// let value = Value::component(Arc::new(Doubler));
/// let ops = value.as_component().unwrap().clone().operations();
/// assert_eq!(ops.named("Invoke").count(), 1);
/// ```
pub trait Component: Send + Sync + 'static {
    /// Returns the operations this instance exposes.
    fn operations(self: Arc<Self>) -> Operations;

    /// Returns the instance as a directly invocable callable, if it is one.
    fn as_callable(self: Arc<Self>) -> Option<Value> {
        None
    }
}

/// A named operation bound to a component instance.
#[derive(Clone)]
pub struct Operation {
    name: Cow<'static, str>,
    convention: Convention,
    value: Value,
}

impl Operation {
    /// Creates an operation that can be bound and invoked dynamically.
    #[must_use]
    pub fn new<F: Invocable>(name: impl Into<Cow<'static, str>>, handle: F) -> Self {
        Self {
            name: name.into(),
            convention: F::convention(),
            value: Value::callable(handle),
        }
    }

    /// Creates an operation that can only be bound to its convention.
    ///
    /// Use this for per-request entry points whose return type is not a
    /// plain value, such as an [`AppFunc`](crate::AppFunc).
    #[must_use]
    pub fn bind<F: Signature>(name: impl Into<Cow<'static, str>>, handle: F) -> Self {
        Self {
            name: name.into(),
            convention: F::convention(),
            value: Value::function(handle),
        }
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the operation's calling convention.
    #[must_use]
    pub const fn convention(&self) -> &Convention {
        &self.convention
    }

    /// Returns the bound handle.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Returns `true` if the operation can be invoked with `args`.
    #[must_use]
    pub fn accepts(&self, args: &Args) -> bool {
        self.value.is_invocable() && args.fits(self.convention.params())
    }

    /// Invokes the operation.
    pub fn invoke(&self, args: &Args) -> BuildResult<Value> {
        self.value.invoke(args)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("convention", &self.convention)
            .finish()
    }
}

/// The ordered set of operations a component exposes.
#[derive(Clone, Default, Debug)]
pub struct Operations(Vec<Operation>);

impl Operations {
    /// Creates an empty operation set.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds an operation.
    #[must_use]
    pub fn with(mut self, operation: Operation) -> Self {
        self.0.push(operation);
        self
    }

    /// Iterates over operations named `name`, in declaration order.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Operation> + 'a {
        self.0.iter().filter(move |op| op.name() == name)
    }

    /// Iterates over all operations.
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no operations are exposed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

type Build = Arc<dyn Fn(&Args) -> BuildResult<Value> + Send + Sync>;

/// One way of constructing a component.
#[derive(Clone)]
pub struct Constructor {
    params: Arc<[Shape]>,
    build: Build,
}

impl Constructor {
    /// Returns the constructor's parameter shapes.
    #[must_use]
    pub fn params(&self) -> &[Shape] {
        &self.params
    }

    /// Returns `true` if `args` fit this constructor.
    #[must_use]
    pub fn accepts(&self, args: &Args) -> bool {
        args.fits(&self.params)
    }

    /// Builds a fresh instance.
    pub fn construct(&self, args: &Args) -> BuildResult<Value> {
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}

/// A component that has not been constructed yet.
///
/// # Example
///
/// ```
/// use meridian_core::{Args, Component, ComponentType, Operations, SharedFn};
/// use std::sync::Arc;
///
/// struct Counter {
///     start: u32,
/// }
///
/// impl Component for Counter {
///     fn operations(self: Arc<Self>) -> Operations {
///         Operations::new()
///     }
/// }
///
/// let ctor: SharedFn<u32, Arc<Counter>> = Arc::new(|start| Arc::new(Counter { start }));
/// let counter = ComponentType::of::<Counter>().constructor(ctor);
///
/// let built = counter.find_constructor(&Args::new().with(7u32)).unwrap();
/// let instance = built.construct(&Args::new().with(7u32)).unwrap();
/// assert!(instance.as_component().is_some());
/// ```
#[derive(Clone)]
pub struct ComponentType {
    name: &'static str,
    constructors: Vec<Constructor>,
}

impl ComponentType {
    /// Describes component `C` with no constructors yet.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            name: std::any::type_name::<C>(),
            constructors: Vec::new(),
        }
    }

    /// Adds a constructor form.
    ///
    /// Constructors are tried in the order they were added.
    #[must_use]
    pub fn constructor<F, C>(mut self, handle: F) -> Self
    where
        F: Invocable<Output = Arc<C>>,
        C: Component,
    {
        let params: Arc<[Shape]> = F::convention().params().into();
        let build: Build =
            Arc::new(move |args: &Args| handle.call_with(args).map(Value::component));
        self.constructors.push(Constructor { params, build });
        self
    }

    /// Returns the component type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the constructor forms.
    #[must_use]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Returns the first constructor that accepts `args`.
    #[must_use]
    pub fn find_constructor(&self, args: &Args) -> Option<&Constructor> {
        self.constructors.iter().find(|ctor| ctor.accepts(args))
    }

    /// Constructs an instance with the first matching constructor.
    pub fn construct(&self, args: &Args) -> BuildResult<Value> {
        self.find_constructor(args)
            .ok_or_else(|| BuildError::constructor_arity(self.name, args.len()))?
            .construct(args)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
