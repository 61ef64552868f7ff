//! Override & verification engine for runmock.
//!
//! Temporarily replaces or observes class methods, static properties and
//! constants on a [`runmock_runtime::Runtime`], verifies how overridden
//! methods were called, and restores the originals:
//! - `MethodMocker` registers method overrides and tears them down LIFO
//! - `MockHandle` configures expectations and actions for one override
//! - `MethodOverride` installs a single substitute without bookkeeping
//! - `PropertyAccess` stacks static property overrides
//! - `ConstantMocker` overrides constants once each
//! - `MockSuite` bundles the three with one teardown

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod action;
pub mod config;
pub mod constant;
pub mod error;
pub mod expectation;
pub mod inspector;
pub mod interception;
pub mod method_mocker;
pub mod property;
pub mod registration;
pub mod suite;

pub use action::{ActionFn, ActionSpec, ObserveFn};
pub use config::{DefaultCallCount, LeakPolicy, MockerConfig};
pub use constant::ConstantMocker;
pub use error::{ErrorCategory, MockError, Result};
pub use expectation::{ArgsRule, CallCountRule, ExpectedArgs, Expectation};
pub use inspector::{MemberIdentity, MemberKind, MethodShape, SignatureInspector};
pub use interception::{
    ClosureBody, Interception, MethodOverride, OverrideMode, Replacement, SniffGuard, SniffHook,
    intercepts,
};
pub use method_mocker::MethodMocker;
pub use property::PropertyAccess;
pub use registration::{MockHandle, RegistrationState};
pub use suite::MockSuite;

/// runmock version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
