//! The innermost app of every pipeline.

use crate::properties::{keys, Properties};
use http::StatusCode;
use meridian_core::{app_fn, AppFunc, Environment, Value};

/// Returns an app that marks the unit of work as not handled.
///
/// The response status is set to `404 Not Found` and the environment is
/// returned immediately with nothing else touched.
///
/// # Example
///
/// ```
/// use meridian_core::Environment;
/// use meridian_middleware::not_found;
/// use http::StatusCode;
///
/// # tokio_test::block_on(async {
/// let env = not_found()(Environment::new()).await;
/// assert_eq!(env.status(), StatusCode::NOT_FOUND);
/// # });
/// ```
pub fn not_found() -> AppFunc {
    app_fn(|mut env: Environment| async move {
        env.set_status(StatusCode::NOT_FOUND);
        env
    })
}

/// Reads the terminal app from the bag, falling back to [`not_found`].
pub(crate) fn resolve(properties: &Properties) -> Value {
    properties
        .get(keys::DEFAULT_APP)
        .unwrap_or_else(|| Value::function(not_found()))
}
