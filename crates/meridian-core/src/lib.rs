//! # Meridian Core
//!
//! Core types shared by the Meridian pipeline composition engine.
//!
//! This crate provides the vocabulary the engine is written in:
//!
//! - [`Shape`] - Runtime identity of a Rust type
//! - [`Convention`] - Calling convention of a stage boundary, plus the
//!   [`Signature`] and [`Invocable`] traits that produce one
//! - [`Value`] / [`Args`] - Type-erased values and argument lists
//! - [`Component`] / [`ComponentType`] - Objects exposing named operations
//! - [`Environment`] - The unit of work carried through a built pipeline
//! - [`AppFunc`] / [`DynApp`] - The built-in application conventions
//! - [`BuildError`] - Errors raised while assembling a pipeline

#![doc(html_root_url = "https://docs.rs/meridian-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod component;
mod convention;
mod environment;
mod error;
mod shape;
mod value;

pub use app::{
    app_fn, app_func_to_dyn, dyn_to_app_func, App, AppFunc, BoxFuture, DynApp, FuncApp,
};
pub use component::{
    Component, ComponentType, Constructor, Operation, Operations, INITIALIZE, INVOKE,
};
pub use convention::{Convention, Invocable, SharedFn, SharedFn2, SharedFn3, SharedFn4, Signature};
pub use environment::{Environment, RequestId};
pub use error::{BuildError, BuildResult, ErrorKind};
pub use shape::Shape;
pub use value::{Args, Value};
