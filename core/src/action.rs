//! What an override does when called.

use std::fmt;
use std::rc::Rc;

use runmock_runtime::Value;

use crate::error::MockError;
use crate::error::Result;
use crate::interception::OverrideMode;

/// Callback action: `(args, additional_var) -> result`.
pub type ActionFn = Rc<dyn Fn(&[Value], Option<&Value>) -> runmock_runtime::Result<Value>>;

/// Observer action: `(args, original_result, additional_var)`.
pub type ObserveFn = Rc<dyn Fn(&[Value], &Value, Option<&Value>) -> runmock_runtime::Result<()>>;

/// Exception kind used when none is given.
pub const DEFAULT_EXCEPTION_KIND: &str = "Exception";

#[derive(Clone)]
pub enum ActionSpec {
    FixedValue(Value),
    /// One value consumed per call.
    ValueSequence(Vec<Value>),
    Callback(ActionFn),
    /// One callback consumed per call.
    CallbackSequence(Vec<ActionFn>),
    ThrowError { message: String, kind: String },
    Void,
    /// Sniff only: sees the original result without changing it.
    PassthroughObserve(ObserveFn),
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedValue(value) => f.debug_tuple("FixedValue").field(value).finish(),
            Self::ValueSequence(values) => f.debug_tuple("ValueSequence").field(values).finish(),
            Self::Callback(_) => f.write_str("Callback"),
            Self::CallbackSequence(actions) => write!(f, "CallbackSequence({})", actions.len()),
            Self::ThrowError { message, kind } => f
                .debug_struct("ThrowError")
                .field("message", message)
                .field("kind", kind)
                .finish(),
            Self::Void => f.write_str("Void"),
            Self::PassthroughObserve(_) => f.write_str("PassthroughObserve"),
        }
    }
}

impl ActionSpec {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&[Value], Option<&Value>) -> runmock_runtime::Result<Value> + 'static,
    {
        Self::Callback(Rc::new(f))
    }

    pub fn observe<F>(f: F) -> Self
    where
        F: Fn(&[Value], &Value, Option<&Value>) -> runmock_runtime::Result<()> + 'static,
    {
        Self::PassthroughObserve(Rc::new(f))
    }

    pub fn throw(message: impl Into<String>, kind: Option<&str>) -> Self {
        Self::ThrowError {
            message: message.into(),
            kind: kind.unwrap_or(DEFAULT_EXCEPTION_KIND).to_string(),
        }
    }

    /// Whether this action answers in place of the original.
    pub fn substitutes_value(&self) -> bool {
        !matches!(self, Self::PassthroughObserve(_))
    }

    /// Reject actions that cannot work in `mode` or can never succeed.
    pub fn validate(&self, target: &str, mode: OverrideMode) -> Result<()> {
        match (mode, self) {
            (OverrideMode::Sniff, action) if action.substitutes_value() => Err(MockError::invalid(
                target,
                "Sniff mode does not support full mock",
            )),
            (OverrideMode::Replace, Self::PassthroughObserve(_)) => Err(MockError::invalid(
                target,
                "observer actions require sniff mode",
            )),
            (_, Self::ValueSequence(values)) if values.is_empty() => {
                Err(MockError::invalid(target, "empty return value list"))
            }
            (_, Self::CallbackSequence(actions)) if actions.is_empty() => {
                Err(MockError::invalid(target, "empty return action list"))
            }
            _ => Ok(()),
        }
    }
}

/// The resolved action for a single call.
pub(crate) enum Step {
    Return(Value),
    Invoke(ActionFn),
    Throw { kind: String, message: String },
    Observe(ObserveFn),
    /// No action configured.
    Nothing,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ActionQueue {
    spec: Option<ActionSpec>,
    cursor: usize,
}

impl ActionQueue {
    pub(crate) fn new(spec: Option<ActionSpec>) -> Self {
        Self { spec, cursor: 0 }
    }

    /// Swap the action; sequences start over.
    pub(crate) fn replace(&mut self, spec: ActionSpec) {
        self.spec = Some(spec);
        self.cursor = 0;
    }

    pub(crate) fn next(&mut self, target: &str) -> Result<Step> {
        let Some(spec) = &self.spec else {
            return Ok(Step::Nothing);
        };
        let step = match spec {
            ActionSpec::FixedValue(value) => Step::Return(value.clone()),
            ActionSpec::Void => Step::Return(Value::Null),
            ActionSpec::Callback(action) => Step::Invoke(Rc::clone(action)),
            ActionSpec::ThrowError { message, kind } => Step::Throw {
                kind: kind.clone(),
                message: message.clone(),
            },
            ActionSpec::PassthroughObserve(observer) => Step::Observe(Rc::clone(observer)),
            ActionSpec::ValueSequence(values) => {
                let value = values.get(self.cursor).cloned().ok_or_else(|| {
                    MockError::action_exhausted(target, "return value list ended")
                })?;
                self.cursor += 1;
                Step::Return(value)
            }
            ActionSpec::CallbackSequence(actions) => {
                let action = actions.get(self.cursor).cloned().ok_or_else(|| {
                    MockError::action_exhausted(target, "return action list ended")
                })?;
                self.cursor += 1;
                Step::Invoke(action)
            }
        };
        Ok(step)
    }
}
