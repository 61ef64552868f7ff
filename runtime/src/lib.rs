//! Host object model for runmock.
//!
//! A small class-based runtime: classes with single inheritance, constants,
//! static and instance properties, visibility, declared signatures, and
//! method bodies written as Rust closures. Calls are resolved through a
//! dispatch table keyed by declaring class and method, which is the seam
//! `runmock-core` patches to install overrides.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod binding;
pub mod class;
pub mod context;
pub mod error;
pub mod runtime;
pub mod types;
pub mod value;

pub use class::{ClassDef, MethodBody, MethodDecl, PropertyDecl, body};
pub use context::CallContext;
pub use error::{Result, RuntimeError};
pub use runtime::{
    BindingMode, CallTarget, MethodInfo, MethodKey, PrivilegedAccess, Runtime,
};
pub use types::{ParamSpec, Signature, TypeDecl, TypeSpec, Visibility};
pub use value::{ObjectRef, Value, render_list};
