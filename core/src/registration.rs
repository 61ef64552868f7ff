//! A live method override and its expectation/action state.
//!
//! The substitute installed in the dispatch table holds only a weak reference
//! back to the registration, so dropping the last [`MockHandle`] drops the
//! installed override and with it the patch.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::rc::Weak;

use runmock_runtime::Runtime;
use runmock_runtime::RuntimeError;
use runmock_runtime::Value;
use tracing::debug;
use tracing::trace;

use crate::action::ActionFn;
use crate::action::ActionQueue;
use crate::action::ActionSpec;
use crate::action::Step;
use crate::error::MockError;
use crate::error::Result;
use crate::expectation::ArgsRule;
use crate::expectation::CallCountRule;
use crate::expectation::ExpectedArgs;
use crate::expectation::Expectation;
use crate::interception::Interception;
use crate::interception::MethodOverride;
use crate::interception::OverrideMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Active,
    Restored,
}

struct MockRegistration {
    id: String,
    mode: OverrideMode,
    expectation: Expectation,
    action: ActionQueue,
    call_log: Vec<Vec<Value>>,
    additional_var: Option<Value>,
    state: RegistrationState,
    installed: Option<MethodOverride>,
}

impl MockRegistration {
    fn ensure_active(&self) -> Result<()> {
        match self.state {
            RegistrationState::Active => Ok(()),
            RegistrationState::Restored => Err(MockError::RestoredState(self.id.clone())),
        }
    }

    /// Record the call and check it against the expectation.
    fn record_call(&mut self, args: &[Value]) -> Result<()> {
        self.ensure_active()?;
        self.call_log.push(args.to_vec());
        let count = self.call_log.len();
        trace!(mock = %self.id, call = count, "intercepted call");
        self.expectation.check_call_count(&self.id, count)?;
        self.expectation.check_args(&self.id, args)
    }

    /// Record the call, check it, and pick the action to run.
    fn begin_call(&mut self, args: &[Value]) -> Result<(Step, Option<Value>)> {
        self.record_call(args)?;
        let step = self.action.next(&self.id)?;
        Ok((step, self.additional_var.clone()))
    }
}

/// Shared handle to one registration; the fluent configuration surface.
#[derive(Clone)]
pub struct MockHandle {
    inner: Rc<RefCell<MockRegistration>>,
}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.inner.borrow();
        f.debug_struct("MockHandle")
            .field("id", &reg.id)
            .field("mode", &reg.mode)
            .field("state", &reg.state)
            .field("calls", &reg.call_log.len())
            .finish()
    }
}

impl MockHandle {
    pub(crate) fn install(
        runtime: &Runtime,
        class: &str,
        method: &str,
        mode: OverrideMode,
        action: Option<ActionSpec>,
        calls: CallCountRule,
    ) -> Result<Self> {
        let id = format!("{class}::{method}");
        if let Some(action) = &action {
            action.validate(&id, mode)?;
        }

        let inner = Rc::new(RefCell::new(MockRegistration {
            id: id.clone(),
            mode,
            expectation: Expectation::new(calls),
            action: ActionQueue::new(action),
            call_log: Vec::new(),
            additional_var: None,
            state: RegistrationState::Active,
            installed: None,
        }));

        let registration = Rc::downgrade(&inner);
        let interception = match mode {
            OverrideMode::Replace => Interception::body(move |ctx| {
                Ok(upgrade(&registration, &id)?.call(ctx.passed_args())?)
            }),
            OverrideMode::Sniff => {
                let observed = Weak::clone(&registration);
                let observed_id = id.clone();
                Interception::guarded_sniff(
                    move |args| {
                        let handle = upgrade(&registration, &id)?;
                        let recorded = handle.inner.borrow_mut().record_call(args);
                        Ok(recorded?)
                    },
                    move |args, result| {
                        Ok(upgrade(&observed, &observed_id)?.observe(args, result)?)
                    },
                )
            }
        };
        let installed = MethodOverride::install(runtime, class, method, interception)?;
        inner.borrow_mut().installed = Some(installed);

        Ok(Self { inner })
    }

    pub fn id(&self) -> String {
        self.inner.borrow().id.clone()
    }

    pub fn mode(&self) -> OverrideMode {
        self.inner.borrow().mode
    }

    pub fn call_count(&self) -> usize {
        self.inner.borrow().call_log.len()
    }

    /// Argument tuples of every recorded call, oldest first.
    pub fn call_log(&self) -> Vec<Vec<Value>> {
        self.inner.borrow().call_log.clone()
    }

    pub fn is_restored(&self) -> bool {
        self.inner.borrow().state == RegistrationState::Restored
    }

    /// Expect exactly `times` calls.
    pub fn expect_call(&self, times: usize) -> Result<&Self> {
        self.configure(|reg| {
            reg.expectation.calls = CallCountRule::Exactly(times);
            Ok(())
        })
    }

    pub fn single_call(&self) -> Result<&Self> {
        self.expect_call(1)
    }

    /// Drop the call-count check entirely.
    pub fn any_call(&self) -> Result<&Self> {
        self.configure(|reg| {
            reg.expectation.calls = CallCountRule::Unconstrained;
            Ok(())
        })
    }

    pub fn expect_args(&self, args: Vec<Value>) -> Result<&Self> {
        self.configure(|reg| {
            if args.is_empty() {
                return Err(MockError::invalid(
                    &reg.id,
                    "method expectArgs() requires at least one arg!",
                ));
            }
            reg.expectation.args = ArgsRule::Exact(args);
            Ok(())
        })
    }

    pub fn expect_no_args(&self) -> Result<&Self> {
        self.configure(|reg| {
            reg.expectation.args = ArgsRule::Exact(Vec::new());
            Ok(())
        })
    }

    /// Only the given positions must match.
    pub fn expect_some_args(&self, args: BTreeMap<usize, Value>) -> Result<&Self> {
        self.configure(|reg| {
            if args.is_empty() {
                return Err(MockError::invalid(
                    &reg.id,
                    "empty arguments list for expectSomeArgs()",
                ));
            }
            reg.expectation.args = ArgsRule::Subset(args);
            Ok(())
        })
    }

    /// One argument rule per call, in order.
    pub fn expect_args_list(&self, list: Vec<ExpectedArgs>) -> Result<&Self> {
        self.configure(|reg| {
            if list.is_empty() {
                return Err(MockError::invalid(&reg.id, "empty args list in expectArgsList()"));
            }
            if let Some(idx) = list
                .iter()
                .position(|entry| matches!(entry, ExpectedArgs::Exact(values) if values.is_empty()))
            {
                return Err(MockError::invalid(
                    &reg.id,
                    format!("args list item {idx}: expected not empty array or false"),
                ));
            }
            reg.expectation.args = ArgsRule::PerCall(VecDeque::from(list));
            Ok(())
        })
    }

    pub fn will_return_value(&self, value: impl Into<Value>) -> Result<&Self> {
        self.set_action(ActionSpec::FixedValue(value.into()))
    }

    pub fn will_return_value_list(&self, values: Vec<Value>) -> Result<&Self> {
        self.set_action(ActionSpec::ValueSequence(values))
    }

    pub fn will_return_action<F>(&self, action: F) -> Result<&Self>
    where
        F: Fn(&[Value], Option<&Value>) -> runmock_runtime::Result<Value> + 'static,
    {
        self.set_action(ActionSpec::callback(action))
    }

    pub fn will_return_action_list(&self, actions: Vec<ActionFn>) -> Result<&Self> {
        self.set_action(ActionSpec::CallbackSequence(actions))
    }

    pub fn will_return_void(&self) -> Result<&Self> {
        self.set_action(ActionSpec::Void)
    }

    /// Throw `message`; `kind` defaults to `Exception`.
    pub fn will_throw_exception(&self, message: impl Into<String>, kind: Option<&str>) -> Result<&Self> {
        self.set_action(ActionSpec::throw(message, kind))
    }

    /// Observe calls and their original result (sniff handles only).
    pub fn will_observe<F>(&self, observer: F) -> Result<&Self>
    where
        F: Fn(&[Value], &Value, Option<&Value>) -> runmock_runtime::Result<()> + 'static,
    {
        self.set_action(ActionSpec::observe(observer))
    }

    /// Swap the action; applies to subsequent calls only.
    pub fn set_action(&self, action: ActionSpec) -> Result<&Self> {
        self.configure(|reg| {
            action.validate(&reg.id, reg.mode)?;
            reg.action.replace(action);
            Ok(())
        })
    }

    /// Free-form value handed to every action invocation.
    pub fn set_additional_var(&self, value: impl Into<Value>) -> Result<&Self> {
        let value = value.into();
        self.configure(|reg| {
            reg.additional_var = Some(value);
            Ok(())
        })
    }

    /// Run the configured action directly, as a call with `args` would.
    ///
    /// Observers see a null original result.
    pub fn do_action(&self, args: &[Value]) -> Result<Value> {
        self.call(args)
    }

    /// Verify expectations and reinstate the original.
    ///
    /// Restoration happens even when verification fails.
    pub fn restore(&self) -> Result<()> {
        let (verdict, installed, id) = {
            let mut reg = self.inner.borrow_mut();
            reg.ensure_active()?;
            let verdict = reg.expectation.verify(&reg.id, reg.call_log.len());
            reg.state = RegistrationState::Restored;
            (verdict, reg.installed.take(), reg.id.clone())
        };
        if let Some(installed) = installed {
            installed.restore();
        }
        debug!(mock = %id, verified = verdict.is_ok(), "restored mock");
        verdict
    }

    fn configure(&self, apply: impl FnOnce(&mut MockRegistration) -> Result<()>) -> Result<&Self> {
        let mut reg = self.inner.borrow_mut();
        reg.ensure_active()?;
        apply(&mut reg)?;
        Ok(self)
    }

    fn call(&self, args: &[Value]) -> Result<Value> {
        let (step, additional) = self.inner.borrow_mut().begin_call(args)?;
        match step {
            Step::Return(value) => Ok(value),
            Step::Invoke(action) => Ok(action(args, additional.as_ref())?),
            Step::Throw { kind, message } => Err(MockError::Runtime(RuntimeError::thrown(kind, message))),
            Step::Observe(observer) => {
                observer(args, &Value::Null, additional.as_ref())?;
                Ok(Value::Null)
            }
            Step::Nothing => Ok(Value::Null),
        }
    }

    /// Hand a sniffed call's original result to the observer, if any. The
    /// call was already recorded before the original ran.
    fn observe(&self, args: &[Value], result: &Value) -> Result<()> {
        let (step, additional) = {
            let reg = &mut *self.inner.borrow_mut();
            (reg.action.next(&reg.id)?, reg.additional_var.clone())
        };
        if let Step::Observe(observer) = step {
            observer(args, result, additional.as_ref())?;
        }
        Ok(())
    }
}

fn upgrade(registration: &Weak<RefCell<MockRegistration>>, id: &str) -> Result<MockHandle> {
    let inner = registration
        .upgrade()
        .ok_or_else(|| MockError::RestoredState(id.to_string()))?;
    Ok(MockHandle { inner })
}
