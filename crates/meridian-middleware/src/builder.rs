//! The pipeline assembler.
//!
//! An [`AppBuilder`] owns an ordered stage list and shares a conversion
//! registry and a property bag with every builder branched from it. Building
//! folds the stage list innermost-first:
//!
//! ```text
//! app = terminal
//! for stage in stages.rev():
//!     app = convert(stage.convention, app)
//!     app = stage.factory(app, stage.args...)
//!     app = convert(stage.convention, app)
//! return convert(target, app)
//! ```
//!
//! so the first stage added is the outermost wrapper.

use crate::branching::{map_when_factory, MapMiddleware, MapOptions, Predicate};
use crate::conversion::ConversionRegistry;
use crate::middleware::{into_factory, Middleware};
use crate::properties::{keys, Properties};
use crate::resolver::{resolve, MiddlewareDescriptor};
use crate::stage::StageList;
use crate::terminal;
use meridian_core::{
    AppFunc, Args, BuildError, BuildResult, Convention, Environment, SharedFn, Signature, Value,
};
use meridian_telemetry::metrics::{record_build, record_stage};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Assembles stages into a single entry point.
///
/// # Example
///
/// ```
/// use meridian_middleware::{AppBuilder, AppFunc, Environment};
/// use http::StatusCode;
/// use std::sync::Arc;
///
/// let mut builder = AppBuilder::new();
/// builder
///     .use_fn(|next: AppFunc| -> AppFunc {
///         Arc::new(move |mut env: Environment| {
///             env.response_headers_mut().insert("x-stage", "outer".parse().unwrap());
///             next(env)
///         })
///     })
///     .unwrap();
///
/// let app = builder.build_app().unwrap();
/// # tokio_test::block_on(async {
/// let env = app(Environment::new()).await;
/// assert_eq!(env.status(), StatusCode::NOT_FOUND);
/// assert_eq!(env.response_headers()["x-stage"], "outer");
/// # });
/// ```
#[derive(Clone)]
pub struct AppBuilder {
    stages: StageList,
    conversions: ConversionRegistry,
    properties: Properties,
}

impl AppBuilder {
    /// Creates a builder with the built-in conversions and a fresh bag.
    ///
    /// The bag is seeded with [`keys::DEFAULT_APP`] (the not-found app) and
    /// [`keys::ADD_SIGNATURE_CONVERSION`].
    #[must_use]
    pub fn new() -> Self {
        let builder = Self {
            stages: StageList::new(),
            conversions: ConversionRegistry::with_builtins(),
            properties: Properties::new(),
        };

        let registry = builder.conversions.clone();
        let add_conversion: SharedFn<Value, BuildResult<()>> =
            Arc::new(move |converter: Value| registry.add_value(converter));
        builder
            .properties
            .set(keys::ADD_SIGNATURE_CONVERSION, Value::callable(add_conversion));
        builder
            .properties
            .set(keys::DEFAULT_APP, Value::function(terminal::not_found()));

        builder
    }

    /// Returns a builder sharing this builder's bag and registry, with an
    /// empty stage list.
    #[must_use]
    pub fn branch(&self) -> Self {
        Self {
            stages: StageList::new(),
            conversions: self.conversions.clone(),
            properties: self.properties.clone(),
        }
    }

    /// Returns the shared property bag.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns the shared conversion registry.
    #[must_use]
    pub const fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    /// Returns the stages added so far, outermost first.
    #[must_use]
    pub const fn stages(&self) -> &StageList {
        &self.stages
    }

    /// Resolves `descriptor` with `args` and appends the resulting stage.
    ///
    /// # Errors
    ///
    /// Returns `MiddlewareShapeNotSupported` or `ConstructorArityMismatch`
    /// if the descriptor cannot be classified. Nothing is appended then.
    pub fn use_stage(
        &mut self,
        descriptor: impl Into<MiddlewareDescriptor>,
        args: Args,
    ) -> BuildResult<&mut Self> {
        let stage = resolve(&descriptor.into(), args)?;
        tracing::debug!(
            index = self.stages.len(),
            shape = %stage.shape(),
            convention = %stage.convention(),
            descriptor = stage.description(),
            "stage added"
        );
        record_stage(stage.shape().as_str());
        self.stages.push(stage);
        Ok(self)
    }

    /// Appends a callable factory `next -> app`.
    pub fn use_fn<N, R, F>(&mut self, factory: F) -> BuildResult<&mut Self>
    where
        N: Clone + Send + Sync + 'static,
        R: Send + Sync + 'static,
        F: Fn(N) -> R + Send + Sync + 'static,
    {
        let handle: SharedFn<N, R> = Arc::new(factory);
        self.use_stage(MiddlewareDescriptor::factory(handle), Args::new())
    }

    /// Appends an object-style middleware over [`AppFunc`].
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> BuildResult<&mut Self> {
        tracing::debug!(middleware = middleware.name(), "adding middleware");
        self.use_stage(MiddlewareDescriptor::factory(into_factory(middleware)), Args::new())
    }

    /// Appends a handler that ends the pipeline; later stages never run.
    pub fn run(&mut self, handler: AppFunc) -> BuildResult<&mut Self> {
        let terminal: SharedFn<AppFunc, AppFunc> = Arc::new(move |_next: AppFunc| handler.clone());
        self.use_stage(MiddlewareDescriptor::factory(terminal), Args::new())
    }

    /// Routes requests under `path` into a branch configured by `configure`.
    ///
    /// # Errors
    ///
    /// Returns an argument error if `path` is not empty and does not start
    /// with `/`, or ends with `/`. Errors from `configure` or from building
    /// the branch are returned unchanged.
    pub fn map<F>(&mut self, path: &str, configure: F) -> BuildResult<&mut Self>
    where
        F: FnOnce(&mut AppBuilder) -> BuildResult<()>,
    {
        if path.ends_with('/') {
            return Err(BuildError::invalid_argument("path", "must not end with '/'"));
        }
        if !path.is_empty() && !path.starts_with('/') {
            return Err(BuildError::invalid_argument("path", "must start with '/'"));
        }

        let mut branch = self.branch();
        configure(&mut branch)?;
        let options = MapOptions {
            path_match: path.to_string(),
            branch: branch.build_app()?,
        };
        self.use_stage(MapMiddleware::component_type(), Args::new().with(options))
    }

    /// Routes requests matching `predicate` into a branch configured by
    /// `configure`.
    pub fn map_when<P, F>(&mut self, predicate: P, configure: F) -> BuildResult<&mut Self>
    where
        P: Fn(&Environment) -> bool + Send + Sync + 'static,
        F: FnOnce(&mut AppBuilder) -> BuildResult<()>,
    {
        let mut branch = self.branch();
        configure(&mut branch)?;
        let predicate: Predicate = Arc::new(predicate);
        let args = Args::new().with(predicate).with(branch.build_app()?);
        self.use_stage(MiddlewareDescriptor::factory(map_when_factory()), args)
    }

    /// Registers a typed conversion in the shared registry.
    pub fn add_conversion<A, B, F>(&mut self, converter: F) -> &mut Self
    where
        A: Clone + Send + Sync + 'static,
        B: Send + Sync + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.conversions.add(converter);
        self
    }

    /// Registers an erased converter in the shared registry.
    ///
    /// # Errors
    ///
    /// Returns an argument error if `converter` is not an invocable callable
    /// of exactly one parameter.
    pub fn add_conversion_value(&mut self, converter: Value) -> BuildResult<&mut Self> {
        self.conversions.add_value(converter)?;
        Ok(self)
    }

    /// Folds the stage list into a value satisfying `target`.
    ///
    /// The terminal app is read from the bag once per call; later bag
    /// changes do not affect the returned value.
    pub fn build_value(&self, target: &Convention) -> BuildResult<Value> {
        let started = Instant::now();
        let mut app = terminal::resolve(&self.properties);

        for stage in self.stages.iter().rev() {
            let declared = stage.convention();
            app = self.conversions.convert(app, declared)?;
            app = stage.apply(app)?;
            app = self.conversions.convert(app, declared)?;
        }

        let app = self.conversions.convert(app, target)?;
        let elapsed = started.elapsed();

        tracing::debug!(
            stages = self.stages.len(),
            target = %target,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            "pipeline built"
        );
        record_build(target.kind(), self.stages.len(), elapsed);

        Ok(app)
    }

    /// Builds the pipeline as a `T`.
    pub fn build<T: Signature>(&self) -> BuildResult<T> {
        let target = T::convention();
        let app = self.build_value(&target)?;
        app.get::<T>()
            .ok_or_else(|| BuildError::no_conversion(app.shape(), &target))
    }

    /// Builds the pipeline as an [`AppFunc`].
    pub fn build_app(&self) -> BuildResult<AppFunc> {
        self.build::<AppFunc>()
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("stages", &self.stages.len())
            .field("conversions", &self.conversions.len())
            .field("properties", &self.properties.keys())
            .finish()
    }
}
