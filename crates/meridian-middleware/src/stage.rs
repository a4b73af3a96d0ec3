//! Normalized pipeline stages.

use meridian_core::{Args, BuildResult, Convention, Value};
use std::fmt;
use std::sync::Arc;

/// The authoring shape a middleware descriptor was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthoringShape {
    /// A callable invoked as `factory(next, ...args)`.
    CallableFactory,
    /// A component wired by `Initialize(next, ...args)`; the component is the
    /// stage output.
    InstanceWithInitializer,
    /// A component whose `Invoke(next, ...args)` returns the stage output.
    InstanceWithInvoke,
    /// A component type constructed as `new(next, ...args)` on every build.
    ConstructibleComponent,
}

impl AuthoringShape {
    /// Returns a stable snake_case name for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CallableFactory => "callable_factory",
            Self::InstanceWithInitializer => "instance_with_initializer",
            Self::InstanceWithInvoke => "instance_with_invoke",
            Self::ConstructibleComponent => "constructible_component",
        }
    }
}

impl fmt::Display for AuthoringShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) type Factory = Arc<dyn Fn(Value, &Args) -> BuildResult<Value> + Send + Sync>;

/// One normalized middleware entry.
///
/// A stage is immutable once created. At build time it receives the already
/// converted next app and produces its own output.
#[derive(Clone)]
pub struct Stage {
    convention: Convention,
    factory: Factory,
    args: Args,
    shape: AuthoringShape,
    description: String,
}

impl Stage {
    pub(crate) fn new(
        convention: Convention,
        factory: Factory,
        args: Args,
        shape: AuthoringShape,
        description: String,
    ) -> Self {
        Self {
            convention,
            factory,
            args,
            shape,
            description,
        }
    }

    /// Returns the convention the stage expects `next` to satisfy.
    #[must_use]
    pub const fn convention(&self) -> &Convention {
        &self.convention
    }

    /// Returns the extra arguments captured when the stage was added.
    #[must_use]
    pub const fn args(&self) -> &Args {
        &self.args
    }

    /// Returns the authoring shape the stage was resolved from.
    #[must_use]
    pub const fn shape(&self) -> AuthoringShape {
        self.shape
    }

    /// Returns a description of the original descriptor.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Runs the stage factory with `next` and the captured arguments.
    pub fn apply(&self, next: Value) -> BuildResult<Value> {
        (self.factory)(next, &self.args)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("convention", &self.convention)
            .field("shape", &self.shape)
            .field("args", &self.args.len())
            .field("description", &self.description)
            .finish()
    }
}

/// Ordered, append-only list of stages.
#[derive(Clone, Default, Debug)]
pub struct StageList(Vec<Stage>);

impl StageList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, stage: Stage) {
        self.0.push(stage);
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no stage has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the stage at `index`, counting from the outermost.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.0.get(index)
    }

    /// Iterates from the outermost stage inwards.
    pub fn iter(&self) -> std::slice::Iter<'_, Stage> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a StageList {
    type Item = &'a Stage;
    type IntoIter = std::slice::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
