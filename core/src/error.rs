//! Override engine error types
//!
//! Every failure is a hard, test-failing condition. `ErrorCategory` gives the
//! taxonomy a machine-readable code for logging and assertions.

use runmock_runtime::RuntimeError;
use thiserror::Error;

/// Override engine result type alias
pub type Result<T> = std::result::Result<T, MockError>;

/// Error category for structured logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Class, member or constant absent
    NotFound,
    /// Second override on the same identity
    AlreadyRegistered,
    /// Conflicting mode and action, empty or malformed expectation lists
    InvalidConfiguration,
    /// Recorded call does not match the argument rule
    ArgumentMismatch,
    /// Too few calls at restore, or too many at call time
    CallCountViolation,
    /// Arity, argument type or return type mismatch against the declared signature
    ContractViolation,
    /// Operation on a restored registration
    RestoredStateViolation,
    /// Restoring a property with no pending override
    StackUnderflow,
    /// Sequential action ran out of entries
    ActionExhausted,
    /// `runmock.toml` or env misconfigured
    ConfigError,
    /// Aggregate of several failures collected at teardown
    VerificationFailure,
    /// Error raised by host code, e.g. a thrown exception
    HostError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::InvalidConfiguration => "INVALID_CONFIGURATION",
            Self::ArgumentMismatch => "ARGUMENT_MISMATCH",
            Self::CallCountViolation => "CALL_COUNT_VIOLATION",
            Self::ContractViolation => "CONTRACT_VIOLATION",
            Self::RestoredStateViolation => "RESTORED_STATE_VIOLATION",
            Self::StackUnderflow => "STACK_UNDERFLOW",
            Self::ActionExhausted => "ACTION_EXHAUSTED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::VerificationFailure => "VERIFICATION_FAILURE",
            Self::HostError => "HOST_ERROR",
        }
    }

    /// Category of an error coming out of the runtime.
    pub fn of_runtime(err: &RuntimeError) -> Self {
        if let Some(inner) = err.intercepted::<MockError>() {
            return inner.category();
        }
        match err {
            RuntimeError::UnknownClass(_)
            | RuntimeError::UnknownMethod { .. }
            | RuntimeError::UnknownProperty { .. }
            | RuntimeError::UnknownConstant(_) => Self::NotFound,
            RuntimeError::ArgumentCount { .. }
            | RuntimeError::ArgumentType { .. }
            | RuntimeError::ReturnType { .. } => Self::ContractViolation,
            RuntimeError::AlreadyPatched(_) => Self::AlreadyRegistered,
            _ => Self::HostError,
        }
    }
}

/// Override engine error
#[derive(Debug, Error)]
pub enum MockError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0} is already mocked!")]
    AlreadyRegistered(String),

    #[error("{target} - {detail}")]
    InvalidConfiguration { target: String, detail: String },

    #[error("{target} - {detail}")]
    ArgumentMismatch { target: String, detail: String },

    #[error("{target} - {detail}")]
    CallCount { target: String, detail: String },

    #[error("{target} - {detail}")]
    ActionExhausted { target: String, detail: String },

    #[error("{0} - mock entity is restored!")]
    RestoredState(String),

    #[error("{0} was not modified")]
    StackUnderflow(String),

    #[error("method {method} is declared in parent class {declaring_class}")]
    DeclaredInParent {
        method: String,
        declaring_class: String,
    },

    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{}", render_all(.0))]
    Verification(Vec<MockError>),

    #[error(transparent)]
    Runtime(RuntimeError),
}

fn render_all(errors: &[MockError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl MockError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) | Self::DeclaredInParent { .. } => ErrorCategory::NotFound,
            Self::AlreadyRegistered(_) => ErrorCategory::AlreadyRegistered,
            Self::InvalidConfiguration { .. } => ErrorCategory::InvalidConfiguration,
            Self::ArgumentMismatch { .. } => ErrorCategory::ArgumentMismatch,
            Self::CallCount { .. } => ErrorCategory::CallCountViolation,
            Self::ActionExhausted { .. } => ErrorCategory::ActionExhausted,
            Self::RestoredState(_) => ErrorCategory::RestoredStateViolation,
            Self::StackUnderflow(_) => ErrorCategory::StackUnderflow,
            Self::Config { .. } => ErrorCategory::ConfigError,
            Self::Verification(_) => ErrorCategory::VerificationFailure,
            Self::Runtime(err) => ErrorCategory::of_runtime(err),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Create an argument mismatch error
    pub fn argument_mismatch(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ArgumentMismatch {
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Create a call count error
    pub fn call_count(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CallCount {
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Create an action exhaustion error
    pub fn action_exhausted(target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ActionExhausted {
            target: target.into(),
            detail: detail.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The single failures behind this error; an aggregate yields its members.
    pub fn failures(&self) -> Vec<&MockError> {
        match self {
            Self::Verification(errors) => errors.iter().flat_map(MockError::failures).collect(),
            other => vec![other],
        }
    }

    /// Host exception kind when this wraps a thrown error.
    pub fn thrown_kind(&self) -> Option<&str> {
        match self {
            Self::Runtime(err) => err.thrown_kind(),
            _ => None,
        }
    }
}

impl From<RuntimeError> for MockError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Intercepted(inner) => match inner.downcast::<MockError>() {
                Ok(mock) => *mock,
                Err(other) => Self::Runtime(RuntimeError::Intercepted(other)),
            },
            other => Self::Runtime(other),
        }
    }
}

impl From<MockError> for RuntimeError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::Runtime(inner) => inner,
            other => RuntimeError::Intercepted(Box::new(other)),
        }
    }
}
