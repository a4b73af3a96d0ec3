//! # Meridian Middleware
//!
//! The pipeline composition engine.
//!
//! An [`AppBuilder`] collects stages in order and folds them into a single
//! entry point. Each stage may be authored in one of four shapes, and each
//! may speak its own calling convention; the builder adapts between stages
//! through a shared [`ConversionRegistry`].
//!
//! ## Assembly
//!
//! ```text
//! use(A) ─ use(B) ─ use(C) ─ [terminal]
//!
//! build:   app = terminal
//!          app = C(convert(app))      innermost
//!          app = B(convert(app))
//!          app = A(convert(app))      outermost
//!          convert(app) → target
//! ```
//!
//! The terminal app is taken from the property bag under
//! [`keys::DEFAULT_APP`] and defaults to [`not_found`].
//!
//! ## Authoring Shapes
//!
//! | Priority | Shape                     | Called as                     |
//! |----------|---------------------------|-------------------------------|
//! | 1        | Callable factory          | `factory(next, ...args)`      |
//! | 2        | Instance with initializer | `instance.Initialize(next, ...)` |
//! | 3        | Instance with invoke      | `instance.Invoke(next, ...)`  |
//! | 4        | Constructible component   | `Type::new(next, ...args)`    |
//!
//! ## Example
//!
//! ```
//! use meridian_middleware::{AppBuilder, Environment, FnMiddleware, Next};
//! use http::StatusCode;
//!
//! let mut builder = AppBuilder::new();
//! builder
//!     .use_middleware(FnMiddleware::new("teapot", |mut env: Environment, _next: Next| async move {
//!         env.set_status(StatusCode::IM_A_TEAPOT);
//!         env
//!     }))
//!     .unwrap();
//!
//! let app = builder.build_app().unwrap();
//! # tokio_test::block_on(async {
//! let env = app(Environment::new()).await;
//! assert_eq!(env.status(), StatusCode::IM_A_TEAPOT);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod branching;
pub mod builder;
pub mod conversion;
pub mod middleware;
pub mod properties;
pub mod resolver;
pub mod stage;
pub mod terminal;

// Re-export main types at crate root
pub use branching::{MapMiddleware, MapOptions, Predicate};
pub use builder::AppBuilder;
pub use conversion::{Conversion, ConversionRegistry};
pub use middleware::{FnMiddleware, Middleware, Next};
pub use properties::{keys, Properties};
pub use resolver::{resolve, MiddlewareDescriptor};
pub use stage::{AuthoringShape, Stage, StageList};
pub use terminal::not_found;

pub use meridian_core::{
    app_fn, AppFunc, Args, BoxFuture, BuildError, BuildResult, DynApp, Environment, ErrorKind,
    Value,
};
