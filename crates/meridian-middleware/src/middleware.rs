//! Object-style middleware.
//!
//! The [`Middleware`] trait is the ergonomic way to write a stage over the
//! default [`AppFunc`] convention: implement `process`, call
//! [`Next::run`] to continue down the pipeline, and register the value with
//! `AppBuilder::use_middleware`. Internally it is adapted into a callable
//! factory `AppFunc -> AppFunc`, so it composes with every other authoring
//! shape.
//!
//! # Example
//!
//! ```
//! use meridian_middleware::{BoxFuture, Environment, Middleware, Next};
//! use http::HeaderValue;
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered-by"
//!     }
//!
//!     fn process<'a>(&'a self, env: Environment, next: Next) -> BoxFuture<'a, Environment> {
//!         Box::pin(async move {
//!             let mut env = next.run(env).await;
//!             env.response_headers_mut()
//!                 .insert("x-powered-by", HeaderValue::from_static("meridian"));
//!             env
//!         })
//!     }
//! }
//! ```

use meridian_core::{AppFunc, BoxFuture, Environment, SharedFn};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A stage written as an object.
///
/// # Invariants
///
/// - `process` calls `next.run()` at most once; not calling it short-circuits
///   the rest of the pipeline
/// - `process` returns the environment it was given or the one `next`
///   returned
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Processes `env`, optionally delegating to `next`.
    fn process<'a>(&'a self, env: Environment, next: Next) -> BoxFuture<'a, Environment>;
}

/// Continuation to the rest of the pipeline.
///
/// Consumed by [`Next::run`], so it can only be called once.
pub struct Next {
    app: AppFunc,
}

impl Next {
    /// Wraps the next app.
    #[must_use]
    pub fn new(app: AppFunc) -> Self {
        Self { app }
    }

    /// Runs the rest of the pipeline.
    pub async fn run(self, env: Environment) -> Environment {
        (self.app)(env).await
    }

    /// Returns the wrapped app.
    #[must_use]
    pub fn into_app(self) -> AppFunc {
        self.app
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// A middleware created from an async function.
///
/// # Example
///
/// ```
/// use meridian_middleware::{Environment, FnMiddleware, Next};
///
/// let timing = FnMiddleware::new("timing", |env: Environment, next: Next| async move {
///     let env = next.run(env).await;
///     tracing::debug!(elapsed_us = env.elapsed().as_micros() as u64, "request done");
///     env
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Environment, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Environment> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, env: Environment, next: Next) -> BoxFuture<'a, Environment> {
        Box::pin((self.func)(env, next))
    }
}

/// Adapts a middleware into a callable factory over [`AppFunc`].
pub(crate) fn into_factory<M: Middleware>(middleware: M) -> SharedFn<AppFunc, AppFunc> {
    let middleware = Arc::new(middleware);
    Arc::new(move |next: AppFunc| -> AppFunc {
        let middleware = Arc::clone(&middleware);
        Arc::new(move |env| -> BoxFuture<'static, Environment> {
            let middleware = Arc::clone(&middleware);
            let next = Next::new(next.clone());
            Box::pin(async move { middleware.process(env, next).await })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use meridian_core::app_fn;
    use parking_lot::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(&'a self, env: Environment, next: Next) -> BoxFuture<'a, Environment> {
            Box::pin(async move {
                self.log.lock().push(format!("enter {}", self.name));
                let env = next.run(env).await;
                self.log.lock().push(format!("leave {}", self.name));
                env
            })
        }
    }

    fn ok_app() -> AppFunc {
        app_fn(|mut env: Environment| async move {
            env.set_status(StatusCode::OK);
            env.set_response_body("OK");
            env
        })
    }

    #[tokio::test]
    async fn test_middleware_name() {
        let mw = Recording {
            name: "test",
            log: Arc::default(),
        };
        assert_eq!(mw.name(), "test");
    }

    #[tokio::test]
    async fn test_next_runs_app() {
        let env = Next::new(ok_app()).run(Environment::new()).await;
        assert_eq!(env.response_body().as_ref(), b"OK");
    }

    #[tokio::test]
    async fn test_factory_chain_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = into_factory(Recording {
            name: "first",
            log: Arc::clone(&log),
        });
        let second = into_factory(Recording {
            name: "second",
            log: Arc::clone(&log),
        });

        let app = first(second(ok_app()));
        let env = app(Environment::new()).await;

        assert_eq!(env.status(), StatusCode::OK);
        assert_eq!(
            *log.lock(),
            vec!["enter first", "enter second", "leave second", "leave first"]
        );
    }

    #[tokio::test]
    async fn test_fn_middleware_short_circuit() {
        let deny = into_factory(FnMiddleware::new(
            "deny",
            |mut env: Environment, _next: Next| async move {
                env.set_status(StatusCode::FORBIDDEN);
                env
            },
        ));

        let env = deny(ok_app())(Environment::new()).await;
        assert_eq!(env.status(), StatusCode::FORBIDDEN);
        assert!(env.response_body().is_empty());
    }
}
