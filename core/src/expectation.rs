//! Call-count and argument rules checked against recorded calls.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use runmock_runtime::Value;
use runmock_runtime::render_list;

use crate::config::DefaultCallCount;
use crate::error::MockError;
use crate::error::Result;

/// One entry of a per-call argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedArgs {
    /// The call must pass no arguments.
    None,
    /// The call must pass exactly these arguments.
    Exact(Vec<Value>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ArgsRule {
    #[default]
    Unconstrained,
    /// Order-sensitive and length-exact; an empty list means "no arguments".
    Exact(Vec<Value>),
    /// Only the listed positions are compared.
    Subset(BTreeMap<usize, Value>),
    /// One entry consumed per call.
    PerCall(VecDeque<ExpectedArgs>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallCountRule {
    /// Must be called at least once before restore.
    #[default]
    AtLeastOnce,
    Exactly(usize),
    Unconstrained,
}

impl From<DefaultCallCount> for CallCountRule {
    fn from(value: DefaultCallCount) -> Self {
        match value {
            DefaultCallCount::AtLeastOnce => Self::AtLeastOnce,
            DefaultCallCount::Any => Self::Unconstrained,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expectation {
    pub args: ArgsRule,
    pub calls: CallCountRule,
}

impl Expectation {
    pub fn new(calls: CallCountRule) -> Self {
        Self {
            args: ArgsRule::Unconstrained,
            calls,
        }
    }

    /// Eager check made on every call; `count` includes the current call.
    pub fn check_call_count(&self, target: &str, count: usize) -> Result<()> {
        match self.calls {
            CallCountRule::Exactly(expected) if count > expected => Err(MockError::call_count(
                target,
                format!("expected {expected} calls, but more appeared"),
            )),
            _ => Ok(()),
        }
    }

    /// Compare the newest call against the argument rule, consuming a
    /// per-call entry when one is configured.
    pub fn check_args(&mut self, target: &str, args: &[Value]) -> Result<()> {
        match &mut self.args {
            ArgsRule::Unconstrained => Ok(()),
            ArgsRule::Exact(expected) => match_exact(target, expected, args),
            ArgsRule::Subset(expected) => {
                let mismatch = expected
                    .iter()
                    .any(|(idx, value)| args.get(*idx) != Some(value));
                if mismatch {
                    return Err(MockError::argument_mismatch(
                        target,
                        format!(
                            "unexpected args subset: expected {}, got {}",
                            render_subset(expected),
                            render_list(args)
                        ),
                    ));
                }
                Ok(())
            }
            ArgsRule::PerCall(queue) => match queue.pop_front() {
                None => Err(MockError::argument_mismatch(target, "expect args list ended")),
                Some(ExpectedArgs::None) => match_exact(target, &[], args),
                Some(ExpectedArgs::Exact(expected)) => match_exact(target, &expected, args),
            },
        }
    }

    /// Final check made at restore.
    pub fn verify(&self, target: &str, count: usize) -> Result<()> {
        match self.calls {
            CallCountRule::AtLeastOnce if count == 0 => {
                Err(MockError::call_count(target, "is not called!"))
            }
            CallCountRule::Exactly(expected) if count != expected => Err(MockError::call_count(
                target,
                format!("unexpected call count: expected {expected}, got {count}"),
            )),
            _ => Ok(()),
        }
    }
}

fn match_exact(target: &str, expected: &[Value], args: &[Value]) -> Result<()> {
    if expected.is_empty() {
        if args.is_empty() {
            return Ok(());
        }
        return Err(MockError::argument_mismatch(
            target,
            "expected no args, but they appeared",
        ));
    }
    if expected != args {
        return Err(MockError::argument_mismatch(
            target,
            format!(
                "unexpected args: expected {}, got {}",
                render_list(expected),
                render_list(args)
            ),
        ));
    }
    Ok(())
}

fn render_subset(expected: &BTreeMap<usize, Value>) -> String {
    let parts: Vec<String> = expected
        .iter()
        .map(|(idx, value)| format!("{idx}: {}", value.render()))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
