//! Middleware shape resolution.
//!
//! A [`MiddlewareDescriptor`] is classified into a [`Stage`] exactly once,
//! when it is added to a builder. The four authoring shapes are tried in a
//! fixed priority order and the first one whose parameters fit
//! `(next, ...args)` wins:
//!
//! 1. [`AuthoringShape::CallableFactory`]
//! 2. [`AuthoringShape::InstanceWithInitializer`]
//! 3. [`AuthoringShape::InstanceWithInvoke`]
//! 4. [`AuthoringShape::ConstructibleComponent`]
//!
//! In every shape the first parameter receives the next app, and its shape
//! becomes the stage's declared convention.

use crate::stage::{AuthoringShape, Factory, Stage};
use meridian_core::{
    Args, BuildError, BuildResult, Component, ComponentType, Constructor, Convention, Invocable,
    Operation, Operations, Shape, Value, INITIALIZE, INVOKE,
};
use std::sync::Arc;

/// The value supplied when adding a stage.
///
/// # Example
///
/// ```
/// use meridian_core::{AppFunc, SharedFn};
/// use meridian_middleware::{resolve, Args, AuthoringShape, MiddlewareDescriptor};
/// use std::sync::Arc;
///
/// let identity: SharedFn<AppFunc, AppFunc> = Arc::new(|next| next);
/// let stage = resolve(&MiddlewareDescriptor::factory(identity), Args::new()).unwrap();
/// assert_eq!(stage.shape(), AuthoringShape::CallableFactory);
/// ```
#[derive(Clone, Debug)]
pub struct MiddlewareDescriptor(Value);

impl MiddlewareDescriptor {
    /// Wraps an arbitrary erased value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// A callable factory `(next, ...args) -> app`.
    #[must_use]
    pub fn factory<F: Invocable>(factory: F) -> Self {
        Self(Value::callable(factory))
    }

    /// A component instance exposing `Initialize` or `Invoke`.
    #[must_use]
    pub fn component<C: Component>(instance: Arc<C>) -> Self {
        Self(Value::component(instance))
    }

    /// A component type built fresh on every build.
    #[must_use]
    pub fn component_type(component_type: ComponentType) -> Self {
        Self(Value::component_type(component_type))
    }

    /// Returns the wrapped value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for MiddlewareDescriptor {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<ComponentType> for MiddlewareDescriptor {
    fn from(component_type: ComponentType) -> Self {
        Self::component_type(component_type)
    }
}

/// Classifies `descriptor` into a stage.
///
/// # Errors
///
/// - `ConstructorArityMismatch` if the descriptor is a component type with no
///   constructor of the form `(next, ...args)`.
/// - `MiddlewareShapeNotSupported` if no authoring shape matches.
pub fn resolve(descriptor: &MiddlewareDescriptor, args: Args) -> BuildResult<Stage> {
    let value = descriptor.value();
    let description = value.describe();

    if let Some(callable) = callable_of(value) {
        let params = callable
            .convention()
            .map(|convention| convention.params().to_vec())
            .unwrap_or_default();
        if fits_next_and(&params, &args) {
            let convention = Convention::from_shape(params[0]);
            let factory: Factory = Arc::new(move |next: Value, args: &Args| {
                callable.invoke(&args.prepend(next))
            });
            return Ok(Stage::new(
                convention,
                factory,
                args,
                AuthoringShape::CallableFactory,
                description,
            ));
        }
    }

    if let Some(component) = value.as_component() {
        let operations = Arc::clone(component).operations();

        if let Some(initialize) = find_operation(&operations, INITIALIZE, &args) {
            let convention = Convention::from_shape(initialize.convention().params()[0]);
            let instance = value.clone();
            let factory: Factory =
                Arc::new(move |next: Value, args: &Args| -> BuildResult<Value> {
                    initialize.invoke(&args.prepend(next))?;
                    Ok(instance.clone())
                });
            return Ok(Stage::new(
                convention,
                factory,
                args,
                AuthoringShape::InstanceWithInitializer,
                description,
            ));
        }

        if let Some(invoke) = find_operation(&operations, INVOKE, &args) {
            let convention = Convention::from_shape(invoke.convention().params()[0]);
            let factory: Factory = Arc::new(move |next: Value, args: &Args| {
                invoke.invoke(&args.prepend(next))
            });
            return Ok(Stage::new(
                convention,
                factory,
                args,
                AuthoringShape::InstanceWithInvoke,
                description,
            ));
        }
    }

    if let Some(component_type) = value.as_component_type() {
        let constructor = find_constructor(component_type, &args).ok_or_else(|| {
            BuildError::constructor_arity(component_type.name(), args.len() + 1)
        })?;
        let convention = Convention::from_shape(constructor.params()[0]);
        let factory: Factory = Arc::new(move |next: Value, args: &Args| {
            constructor.construct(&args.prepend(next))
        });
        return Ok(Stage::new(
            convention,
            factory,
            args,
            AuthoringShape::ConstructibleComponent,
            description,
        ));
    }

    Err(BuildError::shape_not_supported(description))
}

/// Returns the descriptor as a dynamically invocable callable, if it is one.
fn callable_of(value: &Value) -> Option<Value> {
    if value.is_invocable() {
        return Some(value.clone());
    }
    let component = Arc::clone(value.as_component()?);
    component.as_callable().filter(Value::is_invocable)
}

/// `params` is `(next, ...)` and the remaining parameters accept `args`.
fn fits_next_and(params: &[Shape], args: &Args) -> bool {
    params.split_first().is_some_and(|(_, rest)| args.fits(rest))
}

fn find_operation(operations: &Operations, name: &str, args: &Args) -> Option<Operation> {
    operations
        .named(name)
        .find(|op| op.value().is_invocable() && fits_next_and(op.convention().params(), args))
        .cloned()
}

fn find_constructor(component_type: &ComponentType, args: &Args) -> Option<Constructor> {
    component_type
        .constructors()
        .iter()
        .find(|ctor| fits_next_and(ctor.params(), args))
        .cloned()
}
