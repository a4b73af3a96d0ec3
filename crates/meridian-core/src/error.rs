//! Error types for pipeline assembly.
//!
//! Every failure the engine can produce happens while a pipeline is being
//! configured or built. None of them are retried and none of them leave a
//! partially assembled pipeline behind: the caller of `use_stage`,
//! `add_conversion` or `build` receives the error directly.
//!
//! | [`ErrorKind`] | Variants | Raised when |
//! |---|---|---|
//! | `Argument` | `InvalidArgument`, `ArgumentCount`, `ArgumentMismatch` | an input is unusable |
//! | `NoConversion` | `NoConversionAvailable` | the signature converter exhausts its search |
//! | `ShapeNotSupported` | `MiddlewareShapeNotSupported` | a descriptor matches no authoring shape |
//! | `ConstructorArity` | `ConstructorArityMismatch` | no constructor accepts the argument list |

use crate::convention::Convention;
use crate::shape::Shape;
use thiserror::Error;

/// Result type alias using [`BuildError`].
pub type BuildResult<T> = Result<T, BuildError>;

/// Coarse classification of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required input was absent or unusable.
    Argument,
    /// No conversion path exists between two conventions.
    NoConversion,
    /// A middleware descriptor matched none of the supported authoring shapes.
    ShapeNotSupported,
    /// A constructible component has no constructor for the argument list.
    ConstructorArity,
}

/// Errors raised while assembling a pipeline.
///
/// # Example
///
/// ```
/// use meridian_core::{BuildError, ErrorKind};
///
/// let err = BuildError::invalid_argument("conversion", "expected exactly one parameter");
/// assert_eq!(err.kind(), ErrorKind::Argument);
/// assert!(err.to_string().contains("conversion"));
/// ```
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// An input could not be used.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A callable was invoked with the wrong number of arguments.
    #[error("expected {expected} argument(s) but received {actual}")]
    ArgumentCount {
        /// Number of parameters the callable declares.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// An argument's shape does not satisfy the parameter it was bound to.
    #[error("argument {index} expected {expected} but received {actual}")]
    ArgumentMismatch {
        /// Zero-based parameter position.
        index: usize,
        /// Declared parameter shape.
        expected: Shape,
        /// Shape of the supplied argument.
        actual: Shape,
    },

    /// The signature converter found no zero, one or two hop path.
    #[error("no conversion available from {from} to {to}")]
    NoConversionAvailable {
        /// Shape of the value being converted.
        from: Shape,
        /// The requested convention.
        to: Convention,
    },

    /// The descriptor matched none of the four authoring shapes.
    #[error("middleware shape not supported: {descriptor}")]
    MiddlewareShapeNotSupported {
        /// Description of the rejected descriptor.
        descriptor: String,
    },

    /// A constructible component has no constructor matching the arguments.
    #[error("no constructor of {component} accepts {arity} argument(s)")]
    ConstructorArityMismatch {
        /// Component type name.
        component: String,
        /// Number of arguments offered, including `next`.
        arity: usize,
    },
}

impl BuildError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Creates a no-conversion error.
    #[must_use]
    pub fn no_conversion(from: Shape, to: &Convention) -> Self {
        Self::NoConversionAvailable {
            from,
            to: to.clone(),
        }
    }

    /// Creates an unsupported-shape error.
    #[must_use]
    pub fn shape_not_supported(descriptor: impl Into<String>) -> Self {
        Self::MiddlewareShapeNotSupported {
            descriptor: descriptor.into(),
        }
    }

    /// Creates a constructor arity error.
    #[must_use]
    pub fn constructor_arity(component: impl Into<String>, arity: usize) -> Self {
        Self::ConstructorArityMismatch {
            component: component.into(),
            arity,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. }
            | Self::ArgumentCount { .. }
            | Self::ArgumentMismatch { .. } => ErrorKind::Argument,
            Self::NoConversionAvailable { .. } => ErrorKind::NoConversion,
            Self::MiddlewareShapeNotSupported { .. } => ErrorKind::ShapeNotSupported,
            Self::ConstructorArityMismatch { .. } => ErrorKind::ConstructorArity,
        }
    }
}
