//! # Meridian
//!
//! **Middleware pipeline composition engine**
//!
//! Meridian assembles an ordered list of middleware stages into a single
//! entry point:
//!
//! - **Four authoring shapes**: callable factories, initialized instances,
//!   instances with an `Invoke` operation, and constructible components
//! - **Mixed calling conventions**: stages written against different app
//!   signatures are adapted through a shared conversion registry
//! - **Branching**: `map` by path prefix and `map_when` by predicate
//! - **Property bag**: shared configuration, including the terminal app
//!
//! ## Quick Start
//!
//! ```
//! use meridian::prelude::*;
//! use http::StatusCode;
//!
//! let config = MeridianConfig::default();
//! let mut builder = meridian::bootstrap(&config);
//!
//! builder
//!     .map("/health", |health| {
//!         health.run(app_fn(|mut env: Environment| async move {
//!             env.set_status(StatusCode::OK);
//!             env.set_response_body("ok");
//!             env
//!         }))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let app = builder.build_app().unwrap();
//! # tokio_test::block_on(async {
//! let mut env = Environment::new();
//! env.set_path("/health");
//! assert_eq!(app(env).await.status(), StatusCode::OK);
//! # });
//! ```
//!
//! ## Assembly
//!
//! ```text
//! use(A) → use(B) → use(C) → [terminal]
//!
//! request  → A → B → C → terminal
//! response ← A ← B ← C ←────┘
//! ```

#![doc(html_root_url = "https://docs.rs/meridian/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod host;

// Re-export crates
pub use meridian_config as config;
pub use meridian_core as core;
pub use meridian_middleware as middleware;
pub use meridian_telemetry as telemetry;

pub use host::{bootstrap, init_telemetry, telemetry_config};
pub use meridian_middleware::keys;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use meridian::prelude::*;
/// ```
pub mod prelude {
    pub use meridian_core::{
        app_fn, App, AppFunc, Args, BoxFuture, BuildError, BuildResult, Component,
        ComponentType, Convention, DynApp, Environment, ErrorKind, Operation, Operations,
        SharedFn, SharedFn2, SharedFn3, SharedFn4, Signature, Value, INITIALIZE, INVOKE,
    };

    pub use meridian_middleware::{
        keys, not_found, AppBuilder, FnMiddleware, Middleware, MiddlewareDescriptor, Next,
        Properties,
    };

    pub use meridian_config::{ConfigLoader, MeridianConfig};
}
