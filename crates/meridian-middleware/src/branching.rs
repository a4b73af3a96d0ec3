//! Path and predicate branching.
//!
//! Both helpers build a branch pipeline on a child builder and mount it in
//! front of the rest of the main pipeline:
//!
//! - [`MapMiddleware`] routes by path prefix. It is mounted as a constructible
//!   component, so a fresh instance wraps `next` on every build.
//! - `map_when` routes by an arbitrary predicate and is mounted as a callable
//!   factory taking the predicate and the branch as extra arguments.

use meridian_core::{
    AppFunc, BoxFuture, Component, ComponentType, Environment, Operation, Operations, SharedFn2,
    SharedFn3, INVOKE,
};
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a unit of work enters a `map_when` branch.
pub type Predicate = Arc<dyn Fn(&Environment) -> bool + Send + Sync>;

/// Options for [`MapMiddleware`].
#[derive(Clone)]
pub struct MapOptions {
    /// Path prefix that selects the branch, starting with `/`.
    pub path_match: String,
    /// The branch pipeline.
    pub branch: AppFunc,
}

impl fmt::Debug for MapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("path_match", &self.path_match)
            .finish_non_exhaustive()
    }
}

/// Routes requests under a path prefix into a branch pipeline.
///
/// A request whose path equals the prefix, or continues it with `/`, enters
/// the branch with the configured prefix appended to `path_base` and removed
/// from `path`. Both are
/// restored once the branch returns. Matching ignores ASCII case.
pub struct MapMiddleware {
    next: AppFunc,
    options: MapOptions,
}

impl MapMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new(next: AppFunc, options: MapOptions) -> Self {
        Self { next, options }
    }

    /// Describes the component and its `(next, options)` constructor.
    #[must_use]
    pub fn component_type() -> ComponentType {
        let ctor: SharedFn2<AppFunc, MapOptions, Arc<Self>> =
            Arc::new(|next, options| Arc::new(Self::new(next, options)));
        ComponentType::of::<Self>().constructor(ctor)
    }

    /// Processes one unit of work.
    pub async fn invoke(&self, mut env: Environment) -> Environment {
        let path = env.path().to_string();
        let Some(remaining) = match_prefix(&path, &self.options.path_match) else {
            return (self.next)(env).await;
        };

        let path_base = env.path_base().to_string();
        env.set_path_base(format!("{path_base}{}", self.options.path_match));
        env.set_path(remaining);

        let mut env = (self.options.branch)(env).await;
        env.set_path_base(path_base);
        env.set_path(path);
        env
    }
}

impl Component for MapMiddleware {
    fn operations(self: Arc<Self>) -> Operations {
        let invoke: AppFunc = Arc::new(move |env| -> BoxFuture<'static, Environment> {
            let this = Arc::clone(&self);
            Box::pin(async move { this.invoke(env).await })
        });
        Operations::new().with(Operation::bind(INVOKE, invoke))
    }
}

/// Returns the part of `path` after `prefix` if `path` starts with the
/// `prefix` segments.
fn match_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let head = path.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &path[prefix.len()..];
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

/// Returns the callable factory that mounts a predicate branch.
///
/// The factory has the form `(next, predicate, branch) -> app`.
pub(crate) fn map_when_factory() -> SharedFn3<AppFunc, Predicate, AppFunc, AppFunc> {
    Arc::new(
        |next: AppFunc, predicate: Predicate, branch: AppFunc| -> AppFunc {
            Arc::new(move |env| {
                if predicate(&env) {
                    branch(env)
                } else {
                    next(env)
                }
            })
        },
    )
}
