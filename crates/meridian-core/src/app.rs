//! The built-in application conventions.
//!
//! Two conventions describe "something that processes an [`Environment`]":
//!
//! - [`AppFunc`]: a shared closure `Environment -> Future<Environment>`. This
//!   is the default build target and the convention most middleware declares.
//! - [`DynApp`]: an object implementing the [`App`] trait.
//!
//! The functions [`app_func_to_dyn`] and [`dyn_to_app_func`] convert between
//! them and are registered as built-in conversions by every new builder.

use crate::convention::{SharedFn, Signature};
use crate::environment::Environment;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The default application convention.
pub type AppFunc = SharedFn<Environment, BoxFuture<'static, Environment>>;

/// An object that processes a unit of work.
///
/// # Example
///
/// ```
/// use meridian_core::{App, BoxFuture, DynApp, Environment};
/// use http::StatusCode;
///
/// struct Teapot;
///
/// impl App for Teapot {
///     fn call<'a>(&'a self, mut env: Environment) -> BoxFuture<'a, Environment> {
///         Box::pin(async move {
///             env.set_status(StatusCode::IM_A_TEAPOT);
///             env
///         })
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let app = DynApp::new(Teapot);
/// let env = app.call(Environment::new()).await;
/// assert_eq!(env.status(), StatusCode::IM_A_TEAPOT);
/// # });
/// ```
pub trait App: Send + Sync + 'static {
    /// Processes `env` and returns it once done.
    fn call<'a>(&'a self, env: Environment) -> BoxFuture<'a, Environment>;
}

/// A shared [`App`] object.
#[derive(Clone)]
pub struct DynApp(Arc<dyn App>);

impl DynApp {
    /// Wraps an [`App`] implementation.
    pub fn new(app: impl App) -> Self {
        Self(Arc::new(app))
    }

    /// Wraps an already shared [`App`].
    pub fn from_arc(app: Arc<dyn App>) -> Self {
        Self(app)
    }

    /// Processes `env`.
    pub fn call(&self, env: Environment) -> BoxFuture<'_, Environment> {
        self.0.call(env)
    }
}

impl Signature for DynApp {}

impl fmt::Debug for DynApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DynApp").finish_non_exhaustive()
    }
}

/// Adapts an [`AppFunc`] to the [`App`] trait.
#[derive(Clone)]
pub struct FuncApp(AppFunc);

impl FuncApp {
    /// Wraps `func`.
    pub fn new(func: AppFunc) -> Self {
        Self(func)
    }
}

impl App for FuncApp {
    fn call<'a>(&'a self, env: Environment) -> BoxFuture<'a, Environment> {
        (self.0)(env)
    }
}

/// Builds an [`AppFunc`] from an async function.
///
/// # Example
///
/// ```
/// use meridian_core::{app_fn, Environment};
///
/// let app = app_fn(|mut env: Environment| async move {
///     env.set_response_body("hello");
///     env
/// });
///
/// # tokio_test::block_on(async {
/// let env = app(Environment::new()).await;
/// assert_eq!(env.response_body().as_ref(), b"hello");
/// # });
/// ```
pub fn app_fn<F, Fut>(func: F) -> AppFunc
where
    F: Fn(Environment) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Environment> + Send + 'static,
{
    Arc::new(move |env| -> BoxFuture<'static, Environment> { Box::pin(func(env)) })
}

/// Converts an [`AppFunc`] into a [`DynApp`].
pub fn app_func_to_dyn(func: AppFunc) -> DynApp {
    DynApp::new(FuncApp(func))
}

/// Converts a [`DynApp`] into an [`AppFunc`].
pub fn dyn_to_app_func(app: DynApp) -> AppFunc {
    Arc::new(move |env| -> BoxFuture<'static, Environment> {
        let app = app.clone();
        Box::pin(async move { app.call(env).await })
    })
}
