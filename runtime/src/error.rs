//! Runtime error types

use thiserror::Error;

use crate::runtime::MethodKey;

/// Runtime result type alias
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Everything a call into the runtime can fail with.
///
/// Contract violations (`ArgumentCount`, `ArgumentType`, `ReturnType`) are what
/// the host would raise as type errors; `Thrown` is an exception raised by a
/// method body; `Intercepted` carries an error produced by an interception
/// layer so it can travel back through the call stack unchanged.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("class \"{0}\" does not exist!")]
    UnknownClass(String),

    #[error("class \"{0}\" is already declared")]
    ClassRedeclared(String),

    #[error("method \"{method}\" in class \"{class}\" does not exist!")]
    UnknownMethod { class: String, method: String },

    #[error("property \"{property}\" in class \"{class}\" does not exist!")]
    UnknownProperty { class: String, property: String },

    #[error("Constant {0} is not defined!")]
    UnknownConstant(String),

    #[error(
        "Too few arguments to function {function}(), {passed} passed and {qualifier} {expected} expected"
    )]
    ArgumentCount {
        function: String,
        passed: usize,
        expected: usize,
        qualifier: &'static str,
    },

    #[error("{function}(): Argument #{position} (${name}) must be of type {expected}, {given} given")]
    ArgumentType {
        function: String,
        position: usize,
        name: String,
        expected: String,
        given: String,
    },

    #[error("{function}(): Return value must be of type {expected}, {given} returned")]
    ReturnType {
        function: String,
        expected: String,
        given: String,
    },

    #[error("Call to {visibility} method {function}() from {scope}")]
    Visibility {
        function: String,
        visibility: String,
        scope: String,
    },

    #[error("Cannot access {visibility} property {class}::${property}")]
    PropertyVisibility {
        class: String,
        property: String,
        visibility: String,
    },

    #[error("Non-static method {0}() cannot be called statically")]
    NonStaticCall(String),

    #[error("Using $this when not in object context in {0}()")]
    NoObjectContext(String),

    #[error("Cannot use \"parent\" when current class scope has no parent ({0})")]
    NoParent(String),

    #[error("{0} is already patched")]
    AlreadyPatched(MethodKey),

    #[error("{message}")]
    Thrown { kind: String, message: String },

    #[error("{0}")]
    Intercepted(Box<dyn std::error::Error>),
}

impl RuntimeError {
    /// An exception raised from inside a method body.
    pub fn thrown(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Thrown {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Wrap an error from an interception layer.
    pub fn intercept<E: std::error::Error + 'static>(err: E) -> Self {
        Self::Intercepted(Box::new(err))
    }

    /// Borrow the intercepted error as `E`, if that is what this carries.
    pub fn intercepted<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Intercepted(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Whether the host would report this as a signature/type violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::ArgumentCount { .. } | Self::ArgumentType { .. } | Self::ReturnType { .. }
        )
    }

    /// Exception kind for `Thrown`, if any.
    pub fn thrown_kind(&self) -> Option<&str> {
        match self {
            Self::Thrown { kind, .. } => Some(kind),
            _ => None,
        }
    }
}
