//! The conversion registry and signature converter.
//!
//! A [`Conversion`] adapts a value of one convention into another. The
//! [`ConversionRegistry`] keeps conversions keyed by `(source, target)` in
//! registration order and answers one question: given a value and a target
//! convention, what conforming value can be produced?
//!
//! The search is deliberately shallow:
//!
//! 1. the value already satisfies the target;
//! 2. the value is a component with a callable `Invoke` operation whose
//!    handle type is the target's, which is bound directly;
//! 3. the first registered conversion from the value's shape to the target;
//! 4. for each registered conversion in order, reach its source with steps
//!    1-3, apply it, then reach the target with steps 1-3.
//!
//! Nothing deeper is attempted. The first path that succeeds wins.

use indexmap::IndexMap;
use meridian_core::{
    app_func_to_dyn, dyn_to_app_func, AppFunc, Args, BuildError, BuildResult, Convention, DynApp,
    Invocable, SharedFn, Value, INVOKE,
};
use meridian_telemetry::metrics::{record_conversion, record_conversion_failure};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// An adapter from one convention to another.
#[derive(Clone)]
pub struct Conversion {
    source: Convention,
    target: Convention,
    converter: Value,
}

impl Conversion {
    /// Creates a conversion from a typed single-parameter handle.
    ///
    /// # Example
    ///
    /// ```
    /// use meridian_core::{Convention, SharedFn};
    /// use meridian_middleware::Conversion;
    /// use std::sync::Arc;
    ///
    /// let to_len: SharedFn<String, usize> = Arc::new(|s| s.len());
    /// let conversion = Conversion::new(to_len).unwrap();
    /// assert_eq!(conversion.source(), &Convention::of_type::<String>());
    /// assert_eq!(conversion.target(), &Convention::of_type::<usize>());
    /// ```
    pub fn new<F: Invocable>(converter: F) -> BuildResult<Self> {
        Self::from_value(Value::callable(converter))
    }

    /// Creates a conversion from an erased callable.
    ///
    /// The source and target conventions are inferred from the callable's own
    /// parameter and return shapes.
    ///
    /// # Errors
    ///
    /// Returns an argument error if `converter` is not a dynamically
    /// invocable callable of exactly one parameter.
    pub fn from_value(converter: Value) -> BuildResult<Self> {
        if !converter.is_invocable() {
            return Err(BuildError::invalid_argument(
                "conversion",
                format!("{} is not an invocable callable", converter.describe()),
            ));
        }

        let (source, target) = match converter.convention() {
            Some(convention) => match (convention.params(), convention.output()) {
                ([param], Some(output)) => (
                    Convention::from_shape(*param),
                    Convention::from_shape(output),
                ),
                (params, _) => {
                    return Err(BuildError::invalid_argument(
                        "conversion",
                        format!("expected exactly one parameter, found {}", params.len()),
                    ))
                }
            },
            None => {
                return Err(BuildError::invalid_argument(
                    "conversion",
                    "converter has no calling convention",
                ))
            }
        };

        Ok(Self {
            source,
            target,
            converter,
        })
    }

    /// Returns the source convention.
    #[must_use]
    pub const fn source(&self) -> &Convention {
        &self.source
    }

    /// Returns the target convention.
    #[must_use]
    pub const fn target(&self) -> &Convention {
        &self.target
    }

    /// Returns `true` if `value` can be passed to this conversion as-is.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        value.fits(self.source.handle())
    }

    /// Applies the conversion.
    pub fn apply(&self, value: Value) -> BuildResult<Value> {
        self.converter.invoke(&Args::new().with_value(value))
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conversion({} => {})", self.source, self.target)
    }
}

type Edges = IndexMap<(Convention, Convention), Conversion>;

/// Shared, ordered set of conversions.
///
/// Clones share storage, so a registration made through a branch builder is
/// visible to its parent.
///
/// # Example
///
/// ```
/// use meridian_core::{Convention, Value};
/// use meridian_middleware::ConversionRegistry;
///
/// let registry = ConversionRegistry::new();
/// registry.add(|n: u32| u64::from(n) * 2);
///
/// let out = registry
///     .convert(Value::new(21u32), &Convention::of_type::<u64>())
///     .unwrap();
/// assert_eq!(out.get::<u64>(), Some(42));
/// ```
#[derive(Clone, Default)]
pub struct ConversionRegistry {
    edges: Arc<RwLock<Edges>>,
}

impl ConversionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `AppFunc <-> DynApp`
    /// conversions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        let to_dyn: SharedFn<AppFunc, DynApp> = Arc::new(app_func_to_dyn);
        let to_func: SharedFn<DynApp, AppFunc> = Arc::new(dyn_to_app_func);
        registry.add_handle(to_dyn);
        registry.add_handle(to_func);
        registry
    }

    /// Registers a typed conversion from `A` to `B`.
    pub fn add<A, B, F>(&self, converter: F)
    where
        A: Clone + Send + Sync + 'static,
        B: Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let handle: SharedFn<A, B> = Arc::new(converter);
        self.add_handle(handle);
    }

    /// Registers an erased converter.
    ///
    /// # Errors
    ///
    /// Returns an argument error if `converter` is not an invocable callable
    /// of exactly one parameter.
    pub fn add_value(&self, converter: Value) -> BuildResult<()> {
        let conversion = Conversion::from_value(converter)?;
        self.insert(conversion);
        Ok(())
    }

    /// Registers a conversion.
    ///
    /// A conversion with the same `(source, target)` pair replaces the
    /// previous one without changing its position.
    pub fn insert(&self, conversion: Conversion) {
        tracing::debug!(
            source = %conversion.source,
            target = %conversion.target,
            "conversion registered"
        );
        let key = (conversion.source.clone(), conversion.target.clone());
        self.edges.write().insert(key, conversion);
    }

    fn add_handle<A, B>(&self, handle: SharedFn<A, B>)
    where
        A: Clone + Send + Sync + 'static,
        B: Send + Sync + 'static,
    {
        self.insert(Conversion {
            source: Convention::of_type::<A>(),
            target: Convention::of_type::<B>(),
            converter: Value::callable(handle),
        });
    }

    /// Returns the number of registered conversions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.read().is_empty()
    }

    /// Returns a snapshot of the conversions in registration order.
    #[must_use]
    pub fn edges(&self) -> Vec<Conversion> {
        self.edges.read().values().cloned().collect()
    }

    /// Returns `true` if both handles refer to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.edges, &other.edges)
    }

    /// Converts `value` into a value satisfying `target`.
    ///
    /// # Errors
    ///
    /// Returns `NoConversionAvailable` if no path of at most two registry
    /// lookups exists, or any error raised by a conversion it applies.
    pub fn convert(&self, value: Value, target: &Convention) -> BuildResult<Value> {
        // Converters run without the lock held so they may register more.
        let edges = self.edges();
        let source = value.shape();

        if let Some((out, hops)) = one_hop(&edges, &value, target)? {
            trace_conversion(&value, target, hops);
            return Ok(out);
        }

        for edge in &edges {
            let staged = if edge.accepts(&value) {
                Some((value.clone(), 0))
            } else {
                one_hop(&edges, &value, edge.source())?
            };
            let Some((staged, pre)) = staged else {
                continue;
            };

            let middle = edge.apply(staged)?;
            if let Some((out, post)) = one_hop(&edges, &middle, target)? {
                trace_conversion(&value, target, pre + 1 + post);
                return Ok(out);
            }
        }

        tracing::debug!(source = %source, target = %target, "no conversion available");
        record_conversion_failure();
        Err(BuildError::no_conversion(source, target))
    }
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.edges.read().values()).finish()
    }
}

/// Steps 1-3 of the search: identity, structural binding, direct edge.
fn one_hop(
    edges: &[Conversion],
    value: &Value,
    target: &Convention,
) -> BuildResult<Option<(Value, u8)>> {
    if value.satisfies(target) {
        return Ok(Some((value.clone(), 0)));
    }

    if let Some(bound) = bind_invoke(value, target) {
        return Ok(Some((bound, 0)));
    }

    match edges
        .iter()
        .find(|edge| edge.target() == target && edge.accepts(value))
    {
        Some(edge) => Ok(Some((edge.apply(value.clone())?, 1))),
        None => Ok(None),
    }
}

/// Binds a component's `Invoke` operation when its handle type is the target.
///
/// Declared stage conventions are recovered from parameter shapes, so the
/// target may carry no call signature of its own; the operation's does.
fn bind_invoke(value: &Value, target: &Convention) -> Option<Value> {
    let component = Arc::clone(value.as_component()?);
    let operations = component.operations();
    let operation = operations
        .named(INVOKE)
        .find(|op| op.convention().is_callable() && op.convention() == target)?;
    Some(operation.value().clone())
}

fn trace_conversion(value: &Value, target: &Convention, hops: u8) {
    tracing::trace!(source = %value.shape(), target = %target, hops, "conversion applied");
    record_conversion(hops);
}
