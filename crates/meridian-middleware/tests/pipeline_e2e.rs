//! End-to-end pipeline integration tests.
//!
//! These tests build complete pipelines through [`AppBuilder`] and run units
//! of work through them, covering:
//!
//! 1. Stage ordering at build time and at run time
//! 2. Terminal selection from the property bag
//! 3. Branching with `map` and `map_when`
//! 4. Mixed calling conventions and multi-hop conversion
//! 5. Every authoring shape, including structural binding

use http::{HeaderValue, StatusCode};
use meridian_core::{
    dyn_to_app_func, App, Component, ComponentType, DynApp, Operation, Operations, SharedFn,
    SharedFn2, Signature, INITIALIZE, INVOKE,
};
use meridian_middleware::{
    app_fn, keys, AppBuilder, AppFunc, Args, BoxFuture, BuildResult, Environment, ErrorKind,
    Middleware, MiddlewareDescriptor, Next, Value,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

type Log = Arc<Mutex<Vec<String>>>;

/// Creates a factory that records build, entry and exit under `label`.
fn recording(
    label: impl Into<String>,
    log: Log,
) -> impl Fn(AppFunc) -> AppFunc + Send + Sync + 'static {
    let label = label.into();
    move |next: AppFunc| -> AppFunc {
        log.lock().push(format!("build {label}"));
        let log = Arc::clone(&log);
        let label = label.clone();
        Arc::new(move |env| -> BoxFuture<'static, Environment> {
            let log = Arc::clone(&log);
            let label = label.clone();
            let next = next.clone();
            Box::pin(async move {
                log.lock().push(format!("enter {label}"));
                let env = next(env).await;
                log.lock().push(format!("leave {label}"));
                env
            })
        })
    }
}

/// Creates a factory that appends `value` to the `x-trace` header on entry.
fn add_header(value: &'static str) -> impl Fn(AppFunc) -> AppFunc + Send + Sync {
    move |next: AppFunc| -> AppFunc {
        Arc::new(move |mut env: Environment| {
            env.response_headers_mut()
                .append("x-trace", HeaderValue::from_static(value));
            next(env)
        })
    }
}

/// Creates a handler that answers `200 OK` with `body`.
fn respond(body: &'static str) -> AppFunc {
    app_fn(move |mut env: Environment| async move {
        env.set_status(StatusCode::OK);
        env.set_response_body(body);
        env
    })
}

fn trace(env: &Environment) -> Vec<&str> {
    env.response_headers()
        .get_all("x-trace")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect()
}

fn request(path: &str) -> Environment {
    let mut env = Environment::new();
    env.set_path(path);
    env
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_empty_builder_returns_not_found() {
    let app = AppBuilder::new().build_app().unwrap();
    let env = app(request("/")).await;
    assert_eq!(env.status(), StatusCode::NOT_FOUND);
    assert!(env.response_body().is_empty());
}

#[tokio::test]
async fn test_first_added_stage_is_outermost() {
    let mut builder = AppBuilder::new();
    builder.use_fn(add_header("X")).unwrap();
    builder.use_fn(add_header("Y")).unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(trace(&env), vec!["X", "Y"]);
    assert_eq!(env.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_factories_run_innermost_first() {
    let log: Log = Arc::default();
    let mut builder = AppBuilder::new();
    builder.use_fn(recording("a", Arc::clone(&log))).unwrap();
    builder.use_fn(recording("b", Arc::clone(&log))).unwrap();

    let app = builder.build_app().unwrap();
    assert_eq!(*log.lock(), vec!["build b", "build a"]);

    log.lock().clear();
    app(request("/")).await;
    assert_eq!(
        *log.lock(),
        vec!["enter a", "enter b", "leave b", "leave a"]
    );
}

#[tokio::test]
async fn test_each_build_reruns_factories() {
    let log: Log = Arc::default();
    let mut builder = AppBuilder::new();
    builder.use_fn(recording("a", Arc::clone(&log))).unwrap();

    builder.build_app().unwrap();
    builder.build_app().unwrap();
    assert_eq!(*log.lock(), vec!["build a", "build a"]);
}

#[tokio::test]
async fn test_run_short_circuits_later_stages() {
    let mut builder = AppBuilder::new();
    builder.use_fn(add_header("before")).unwrap();
    builder.run(respond("handled")).unwrap();
    builder.use_fn(add_header("after")).unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(env.status(), StatusCode::OK);
    assert_eq!(env.response_body().as_ref(), b"handled");
    assert_eq!(trace(&env), vec!["before"]);
}

// ============================================================================
// Terminal and property bag
// ============================================================================

#[tokio::test]
async fn test_bag_terminal_replaces_not_found() {
    let builder = AppBuilder::new();
    builder
        .properties()
        .set(keys::DEFAULT_APP, Value::function(respond("fallback")));

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(env.status(), StatusCode::OK);
    assert_eq!(env.response_body().as_ref(), b"fallback");
}

#[tokio::test]
async fn test_removed_terminal_falls_back_to_not_found() {
    let builder = AppBuilder::new();
    builder.properties().remove(keys::DEFAULT_APP);

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(env.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bag_changes_after_build_do_not_affect_built_app() {
    let builder = AppBuilder::new();
    let app = builder.build_app().unwrap();

    builder
        .properties()
        .set(keys::DEFAULT_APP, Value::function(respond("late")));

    let env = app(request("/")).await;
    assert_eq!(env.status(), StatusCode::NOT_FOUND);

    let rebuilt = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(rebuilt.response_body().as_ref(), b"late");
}

#[test]
fn test_branch_isolates_stages_and_shares_bag() {
    let mut parent = AppBuilder::new();
    parent.use_fn(add_header("parent")).unwrap();

    let mut child = parent.branch();
    child.use_fn(add_header("child")).unwrap();
    child.use_fn(add_header("child")).unwrap();
    child.properties().insert("branch.Marker", 7u32);

    assert_eq!(parent.stages().len(), 1);
    assert_eq!(child.stages().len(), 2);
    assert_eq!(parent.properties().get_as::<u32>("branch.Marker"), Some(7));
}

// ============================================================================
// Branching
// ============================================================================

#[tokio::test]
async fn test_map_routes_by_path_prefix() {
    let mut builder = AppBuilder::new();
    builder.use_fn(add_header("outer")).unwrap();
    builder
        .map("/api", |api| {
            api.use_fn(add_header("api"))?;
            api.run(app_fn(|mut env: Environment| async move {
                let seen = format!("{}|{}", env.path_base(), env.path());
                env.set_status(StatusCode::OK);
                env.set_response_body(seen);
                env
            }))?;
            Ok(())
        })
        .unwrap();
    builder.run(respond("main")).unwrap();

    let app = builder.build_app().unwrap();

    let env = app(request("/api/users")).await;
    assert_eq!(env.response_body().as_ref(), b"/api|/users");
    assert_eq!(env.path(), "/api/users");
    assert_eq!(trace(&env), vec!["outer", "api"]);

    let env = app(request("/apiary")).await;
    assert_eq!(env.response_body().as_ref(), b"main");
    assert_eq!(trace(&env), vec!["outer"]);
}

#[tokio::test]
async fn test_map_branch_without_stages_returns_not_found() {
    let mut builder = AppBuilder::new();
    builder.map("/empty", |_| Ok(())).unwrap();
    builder.run(respond("main")).unwrap();

    let env = builder.build_app().unwrap()(request("/empty/x")).await;
    assert_eq!(env.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_map_configure_error_propagates() {
    let mut builder = AppBuilder::new();
    let err = builder
        .map("/bad", |branch| {
            branch.use_stage(Value::new(1u8), Args::new())?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeNotSupported);
    assert!(builder.stages().is_empty());
}

#[tokio::test]
async fn test_map_when_routes_by_predicate() {
    let mut builder = AppBuilder::new();
    builder
        .map_when(
            |env: &Environment| env.request_headers().contains_key("x-beta"),
            |beta| {
                beta.run(respond("beta"))?;
                Ok(())
            },
        )
        .unwrap();
    builder.run(respond("stable")).unwrap();
    let app = builder.build_app().unwrap();

    let mut env = request("/");
    env.request_headers_mut()
        .insert("x-beta", HeaderValue::from_static("1"));
    assert_eq!(app(env).await.response_body().as_ref(), b"beta");
    assert_eq!(app(request("/")).await.response_body().as_ref(), b"stable");
}

// ============================================================================
// Conventions and conversion
// ============================================================================

struct Shout {
    next: DynApp,
}

impl App for Shout {
    fn call<'a>(&'a self, env: Environment) -> BoxFuture<'a, Environment> {
        Box::pin(async move {
            let mut env = self.next.call(env).await;
            let loud = String::from_utf8_lossy(env.response_body()).to_uppercase();
            env.set_response_body(loud);
            env
        })
    }
}

#[tokio::test]
async fn test_object_convention_stage_between_function_stages() {
    let mut builder = AppBuilder::new();
    builder.use_fn(add_header("outer")).unwrap();
    builder
        .use_fn(|next: DynApp| DynApp::new(Shout { next }))
        .unwrap();
    builder.use_fn(add_header("inner")).unwrap();
    builder.run(respond("quiet")).unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(env.response_body().as_ref(), b"QUIET");
    assert_eq!(trace(&env), vec!["outer", "inner"]);
}

#[tokio::test]
async fn test_build_as_object_convention() {
    let mut builder = AppBuilder::new();
    builder.run(respond("object")).unwrap();

    let app = builder.build::<DynApp>().unwrap();
    let env = app.call(request("/")).await;
    assert_eq!(env.response_body().as_ref(), b"object");
}

/// A convention reachable from [`AppFunc`] only through [`DynApp`].
#[derive(Clone)]
struct Legacy(AppFunc);

impl Signature for Legacy {}

#[tokio::test]
async fn test_two_hop_conversion_at_stage_boundary() {
    let mut builder = AppBuilder::new();
    builder.add_conversion(|app: DynApp| Legacy(dyn_to_app_func(app)));
    builder.add_conversion(|legacy: Legacy| legacy.0);
    builder
        .use_fn(|next: Legacy| -> Legacy {
            Legacy(Arc::new(move |mut env: Environment| {
                env.response_headers_mut()
                    .append("x-trace", HeaderValue::from_static("legacy"));
                (next.0)(env)
            }))
        })
        .unwrap();
    builder.run(respond("done")).unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(trace(&env), vec!["legacy"]);
    assert_eq!(env.response_body().as_ref(), b"done");
}

#[test]
fn test_unreachable_convention_fails_at_build() {
    let mut builder = AppBuilder::new();
    builder.use_fn(|next: Legacy| next).unwrap();

    let Err(err) = builder.build_app() else {
        panic!("a stage declaring Legacy must not build without a conversion");
    };
    assert_eq!(err.kind(), ErrorKind::NoConversion);
    assert!(err.to_string().contains("Legacy"));
}

#[tokio::test]
async fn test_conversion_registered_through_bag_key() {
    let builder = AppBuilder::new();
    let add = builder
        .properties()
        .get_as::<SharedFn<Value, BuildResult<()>>>(keys::ADD_SIGNATURE_CONVERSION)
        .unwrap();

    let to_legacy: SharedFn<AppFunc, Legacy> = Arc::new(Legacy);
    add(Value::callable(to_legacy)).unwrap();

    let err = add(Value::new("not a converter")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);

    let app = builder.build::<Legacy>().unwrap();
    let env = (app.0)(request("/")).await;
    assert_eq!(env.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_conversion_added_on_branch_is_visible_to_parent() {
    let parent = AppBuilder::new();
    let mut child = parent.branch();
    child.add_conversion(Legacy);

    assert!(parent.build::<Legacy>().is_ok());
}

// ============================================================================
// Authoring shapes
// ============================================================================

struct PoweredBy;

impl Middleware for PoweredBy {
    fn name(&self) -> &'static str {
        "powered-by"
    }

    fn process<'a>(&'a self, env: Environment, next: Next) -> BoxFuture<'a, Environment> {
        Box::pin(async move {
            let mut env = next.run(env).await;
            env.response_headers_mut()
                .insert("x-powered-by", HeaderValue::from_static("meridian"));
            env
        })
    }
}

#[tokio::test]
async fn test_object_middleware() {
    let mut builder = AppBuilder::new();
    builder.use_middleware(PoweredBy).unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(env.response_headers()["x-powered-by"], "meridian");
}

/// Wired through `Initialize`, then bound to [`AppFunc`] by its `Invoke`.
struct Stamp {
    label: &'static str,
    next: Mutex<Option<AppFunc>>,
}

impl Component for Stamp {
    fn operations(self: Arc<Self>) -> Operations {
        let this = Arc::clone(&self);
        let initialize: SharedFn<AppFunc, ()> = Arc::new(move |next: AppFunc| {
            *this.next.lock() = Some(next);
        });

        let this = Arc::clone(&self);
        let invoke: AppFunc = Arc::new(move |mut env: Environment| -> BoxFuture<'static, Environment> {
            let this = Arc::clone(&this);
            Box::pin(async move {
                env.response_headers_mut()
                    .append("x-trace", HeaderValue::from_static(this.label));
                let next = this.next.lock().clone();
                match next {
                    Some(next) => next(env).await,
                    None => env,
                }
            })
        });

        Operations::new()
            .with(Operation::new(INITIALIZE, initialize))
            .with(Operation::bind(INVOKE, invoke))
    }
}

#[tokio::test]
async fn test_initialized_instance_bound_by_invoke() {
    let stamp = Arc::new(Stamp {
        label: "stamp",
        next: Mutex::new(None),
    });

    let mut builder = AppBuilder::new();
    builder
        .use_stage(MiddlewareDescriptor::component(Arc::clone(&stamp)), Args::new())
        .unwrap();
    builder.run(respond("wired")).unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert!(stamp.next.lock().is_some());
    assert_eq!(trace(&env), vec!["stamp"]);
    assert_eq!(env.response_body().as_ref(), b"wired");
}

/// A component whose `Invoke(next, suffix)` returns the wrapped app.
struct Suffixer;

impl Component for Suffixer {
    fn operations(self: Arc<Self>) -> Operations {
        let invoke: SharedFn2<AppFunc, String, AppFunc> =
            Arc::new(|next: AppFunc, suffix: String| -> AppFunc {
                Arc::new(move |env| -> BoxFuture<'static, Environment> {
                    let next = next.clone();
                    let suffix = suffix.clone();
                    Box::pin(async move {
                        let mut env = next(env).await;
                        let body = format!(
                            "{}{suffix}",
                            String::from_utf8_lossy(env.response_body())
                        );
                        env.set_response_body(body);
                        env
                    })
                })
            });
        Operations::new().with(Operation::new(INVOKE, invoke))
    }
}

#[tokio::test]
async fn test_instance_with_invoke_and_extra_args() {
    let mut builder = AppBuilder::new();
    builder
        .use_stage(
            MiddlewareDescriptor::component(Arc::new(Suffixer)),
            Args::new().with("!".to_string()),
        )
        .unwrap();
    builder.run(respond("hello")).unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(env.response_body().as_ref(), b"hello!");
}

/// A component constructed as `new(next, greeting)` on every build.
struct Greeter {
    next: DynApp,
    greeting: String,
}

impl Component for Greeter {
    fn operations(self: Arc<Self>) -> Operations {
        let this = Arc::clone(&self);
        let invoke: AppFunc = Arc::new(move |env| -> BoxFuture<'static, Environment> {
            let this = Arc::clone(&this);
            Box::pin(async move {
                let mut env = this.next.call(env).await;
                env.response_headers_mut()
                    .insert("x-greeting", this.greeting.parse().unwrap());
                env
            })
        });
        Operations::new().with(Operation::bind(INVOKE, invoke))
    }
}

fn greeter_type() -> ComponentType {
    let ctor: SharedFn2<DynApp, String, Arc<Greeter>> =
        Arc::new(|next: DynApp, greeting: String| Arc::new(Greeter { next, greeting }));
    ComponentType::of::<Greeter>().constructor(ctor)
}

#[tokio::test]
async fn test_constructible_component_over_object_convention() {
    let mut builder = AppBuilder::new();
    builder
        .use_stage(greeter_type(), Args::new().with("hello".to_string()))
        .unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(env.response_headers()["x-greeting"], "hello");
    assert_eq!(env.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_constructible_component_wrong_arity() {
    let mut builder = AppBuilder::new();
    let err = builder.use_stage(greeter_type(), Args::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstructorArity);
    assert!(builder.stages().is_empty());
}

/// Exposes both a callable form and an `Invoke` operation.
struct Dual;

impl Component for Dual {
    fn operations(self: Arc<Self>) -> Operations {
        let invoke: SharedFn<AppFunc, AppFunc> = Arc::new(|next: AppFunc| -> AppFunc {
            Arc::new(move |mut env: Environment| {
                env.response_headers_mut()
                    .append("x-trace", HeaderValue::from_static("invoke"));
                next(env)
            })
        });
        Operations::new().with(Operation::new(INVOKE, invoke))
    }

    fn as_callable(self: Arc<Self>) -> Option<Value> {
        let callable: SharedFn<AppFunc, AppFunc> = Arc::new(|next: AppFunc| -> AppFunc {
            Arc::new(move |mut env: Environment| {
                env.response_headers_mut()
                    .append("x-trace", HeaderValue::from_static("callable"));
                next(env)
            })
        });
        Some(Value::callable(callable))
    }
}

#[tokio::test]
async fn test_callable_form_takes_priority() {
    let mut builder = AppBuilder::new();
    builder
        .use_stage(MiddlewareDescriptor::component(Arc::new(Dual)), Args::new())
        .unwrap();

    let env = builder.build_app().unwrap()(request("/")).await;
    assert_eq!(trace(&env), vec!["callable"]);
}

#[test]
fn test_plain_app_is_not_middleware() {
    let mut builder = AppBuilder::new();
    let err = builder
        .use_stage(Value::function(respond("x")), Args::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeNotSupported);
    assert!(builder.stages().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_stages_wrap_in_insertion_order(labels in prop::collection::vec("[a-z]{1,8}", 0..8)) {
        let log: Log = Arc::default();
        let mut builder = AppBuilder::new();
        for label in &labels {
            builder.use_fn(recording(label.clone(), Arc::clone(&log))).unwrap();
        }

        let app = builder.build_app().unwrap();
        let built: Vec<String> = labels.iter().rev().map(|l| format!("build {l}")).collect();
        prop_assert_eq!(log.lock().clone(), built);

        log.lock().clear();
        let env = tokio_test::block_on(app(Environment::new()));
        prop_assert_eq!(env.status(), StatusCode::NOT_FOUND);

        let expected: Vec<String> = labels
            .iter()
            .map(|l| format!("enter {l}"))
            .chain(labels.iter().rev().map(|l| format!("leave {l}")))
            .collect();
        prop_assert_eq!(log.lock().clone(), expected);
    }
}
