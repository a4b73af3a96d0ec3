//! Calling conventions.
//!
//! A [`Convention`] describes the shape a stage boundary must satisfy: the
//! ordered parameter shapes and return shape of a callable, or the identity of
//! an object type. Callables travel through the engine as shared closure
//! handles ([`SharedFn`] and its higher-arity siblings). Because each callable
//! signature has exactly one canonical handle type, two conventions are
//! structurally identical exactly when their handle types are identical, which
//! is what equality and hashing compare.
//!
//! Types that can be named as a build target implement [`Signature`]. Handles
//! that can also be called with an erased [`Args`] list implement
//! [`Invocable`]; that is what lets factories, conversions, and component
//! operations be driven by the assembler without knowing their types.

use crate::error::{BuildError, BuildResult};
use crate::shape::Shape;
use crate::value::{Args, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A shared single-parameter closure handle.
pub type SharedFn<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// A shared two-parameter closure handle.
pub type SharedFn2<A, B, R> = Arc<dyn Fn(A, B) -> R + Send + Sync>;

/// A shared three-parameter closure handle.
pub type SharedFn3<A, B, C, R> = Arc<dyn Fn(A, B, C) -> R + Send + Sync>;

/// A shared four-parameter closure handle.
pub type SharedFn4<A, B, C, D, R> = Arc<dyn Fn(A, B, C, D) -> R + Send + Sync>;

/// Parameter and return shapes of a callable convention.
#[derive(Clone, Debug)]
struct CallShape {
    params: Arc<[Shape]>,
    output: Shape,
}

/// Descriptor of an invocable or object shape.
///
/// # Example
///
/// ```
/// use meridian_core::{AppFunc, Convention, DynApp, Environment, Shape};
///
/// let app = Convention::of::<AppFunc>();
/// assert!(app.is_callable());
/// assert_eq!(app.params(), &[Shape::of::<Environment>()]);
///
/// let object = Convention::of::<DynApp>();
/// assert!(!object.is_callable());
/// assert_ne!(app, object);
/// ```
#[derive(Clone)]
pub struct Convention {
    handle: Shape,
    call: Option<CallShape>,
}

impl Convention {
    /// Returns the convention of a [`Signature`] type.
    #[must_use]
    pub fn of<T: Signature>() -> Self {
        T::convention()
    }

    /// Returns an object convention for any type.
    #[must_use]
    pub fn of_type<T: ?Sized + 'static>() -> Self {
        Self::from_shape(Shape::of::<T>())
    }

    /// Returns an object convention identified by `shape`.
    #[must_use]
    pub const fn from_shape(shape: Shape) -> Self {
        Self {
            handle: shape,
            call: None,
        }
    }

    /// Returns a callable convention carried by the `handle` type.
    #[must_use]
    pub fn callable(handle: Shape, params: Vec<Shape>, output: Shape) -> Self {
        Self {
            handle,
            call: Some(CallShape {
                params: params.into(),
                output,
            }),
        }
    }

    /// Returns the shape of the type that carries this convention.
    #[must_use]
    pub const fn handle(&self) -> Shape {
        self.handle
    }

    /// Returns `true` for callable conventions.
    #[must_use]
    pub const fn is_callable(&self) -> bool {
        self.call.is_some()
    }

    /// Returns `"callable"` or `"object"`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        if self.call.is_some() {
            "callable"
        } else {
            "object"
        }
    }

    /// Returns the ordered parameter shapes; empty for object conventions.
    #[must_use]
    pub fn params(&self) -> &[Shape] {
        self.call.as_ref().map_or(&[], |call| &call.params)
    }

    /// Returns the return shape of a callable convention.
    #[must_use]
    pub fn output(&self) -> Option<Shape> {
        self.call.as_ref().map(|call| call.output)
    }

    /// Returns `true` if a value of `shape` already satisfies this convention.
    #[must_use]
    pub fn is_satisfied_by(&self, shape: Shape) -> bool {
        self.handle == shape
    }
}

impl PartialEq for Convention {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Convention {}

impl Hash for Convention {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl From<Shape> for Convention {
    fn from(shape: Shape) -> Self {
        Self::from_shape(shape)
    }
}

impl fmt::Debug for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Convention({self})")
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.call {
            Some(call) => {
                f.write_str("fn(")?;
                for (i, param) in call.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {}", call.output)
            }
            None => write!(f, "{}", self.handle),
        }
    }
}

/// A type that can be named as a conversion endpoint or build target.
///
/// Object types get an object convention from the default method:
///
/// ```
/// use meridian_core::{Convention, Signature};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// #[derive(Clone)]
/// struct DynGreeter(Arc<dyn Greeter>);
///
/// impl Signature for DynGreeter {}
///
/// assert!(!Convention::of::<DynGreeter>().is_callable());
/// ```
pub trait Signature: Clone + Send + Sync + 'static {
    /// Returns the calling convention this type carries.
    fn convention() -> Convention {
        Convention::of_type::<Self>()
    }
}

/// A callable handle that can be invoked with an erased argument list.
pub trait Invocable: Signature {
    /// The value returned by the callable.
    type Output: Send + Sync + 'static;

    /// Calls the handle, extracting each parameter from `args`.
    fn call_with(&self, args: &Args) -> BuildResult<Self::Output>;

    /// Calls the handle and wraps the result as a [`Value`].
    fn invoke(&self, args: &Args) -> BuildResult<Value> {
        self.call_with(args).map(Value::new)
    }
}

macro_rules! impl_shared_fn {
    ($count:expr; $($param:ident $arg:ident $idx:tt),+) => {
        impl<$($param,)+ R> Signature for Arc<dyn Fn($($param),+) -> R + Send + Sync>
        where
            $($param: 'static,)+
            R: 'static,
        {
            fn convention() -> Convention {
                Convention::callable(
                    Shape::of::<Self>(),
                    vec![$(Shape::of::<$param>()),+],
                    Shape::of::<R>(),
                )
            }
        }

        impl<$($param,)+ R> Invocable for Arc<dyn Fn($($param),+) -> R + Send + Sync>
        where
            $($param: Clone + Send + Sync + 'static,)+
            R: Send + Sync + 'static,
        {
            type Output = R;

            fn call_with(&self, args: &Args) -> BuildResult<R> {
                if args.len() != $count {
                    return Err(BuildError::ArgumentCount {
                        expected: $count,
                        actual: args.len(),
                    });
                }
                $(let $arg = args.extract::<$param>($idx)?;)+
                Ok((**self)($($arg),+))
            }
        }
    };
}

impl_shared_fn!(1; A a 0);
impl_shared_fn!(2; A a 0, B b 1);
impl_shared_fn!(3; A a 0, B b 1, C c 2);
impl_shared_fn!(4; A a 0, B b 1, C c 2, D d 3);
