//! The override registry.
//!
//! Owns every active method registration on one runtime, enforces one active
//! override per declaring class and method, and tears them down in reverse
//! installation order.

use std::cell::RefCell;

use runmock_runtime::CallTarget;
use runmock_runtime::Runtime;
use runmock_runtime::Value;
use runmock_runtime::Visibility;
use tracing::debug;
use tracing::warn;

use crate::action::ActionSpec;
use crate::config::LeakPolicy;
use crate::config::MockerConfig;
use crate::error::MockError;
use crate::error::Result;
use crate::inspector::SignatureInspector;
use crate::interception::OverrideMode;
use crate::registration::MockHandle;

#[derive(Debug)]
pub struct MethodMocker {
    runtime: Runtime,
    config: MockerConfig,
    registrations: RefCell<Vec<MockHandle>>,
}

impl MethodMocker {
    pub fn new(runtime: &Runtime) -> Self {
        Self::with_config(runtime, MockerConfig::default())
    }

    pub fn with_config(runtime: &Runtime, config: MockerConfig) -> Self {
        Self {
            runtime: runtime.clone(),
            config,
            registrations: RefCell::new(Vec::new()),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn config(&self) -> &MockerConfig {
        &self.config
    }

    /// Replace `class::method`; returns null until an action is configured.
    pub fn mock(&self, class: &str, method: &str) -> Result<MockHandle> {
        self.install(class, method, OverrideMode::Replace, None)
    }

    pub fn mock_with(&self, class: &str, method: &str, action: ActionSpec) -> Result<MockHandle> {
        self.install(class, method, OverrideMode::Replace, Some(action))
    }

    /// Observe `class::method` without changing what it returns.
    pub fn sniff(&self, class: &str, method: &str) -> Result<MockHandle> {
        self.install(class, method, OverrideMode::Sniff, None)
    }

    pub fn sniff_with(&self, class: &str, method: &str, action: ActionSpec) -> Result<MockHandle> {
        self.install(class, method, OverrideMode::Sniff, Some(action))
    }

    pub fn install(
        &self,
        class: &str,
        method: &str,
        mode: OverrideMode,
        action: Option<ActionSpec>,
    ) -> Result<MockHandle> {
        let id = format!("{class}::{method}");
        if self.find(&id).is_some() {
            return Err(MockError::AlreadyRegistered(id));
        }

        let handle = MockHandle::install(
            &self.runtime,
            class,
            method,
            mode,
            action,
            self.config.default_call_count.into(),
        )?;

        let mut registrations = self.registrations.borrow_mut();
        registrations.retain(|registered| !registered.is_restored());
        registrations.push(handle.clone());
        debug!(mock = %id, %mode, active = registrations.len(), "registered mock");
        Ok(handle)
    }

    /// Active registration with this id (`Class::method`).
    pub fn find(&self, id: &str) -> Option<MockHandle> {
        self.registrations
            .borrow()
            .iter()
            .find(|handle| !handle.is_restored() && handle.id() == id)
            .cloned()
    }

    pub fn active_count(&self) -> usize {
        self.registrations
            .borrow()
            .iter()
            .filter(|handle| !handle.is_restored())
            .count()
    }

    /// Run a registration's action directly.
    pub fn do_action(&self, id: &str, args: &[Value]) -> Result<Value> {
        let handle = self
            .find(id)
            .ok_or_else(|| MockError::NotFound(format!("{id} mock object doesn't exist!")))?;
        handle.do_action(args)
    }

    /// Restore every active registration, newest first.
    ///
    /// Every registration is restored even when some fail verification.
    /// With `strict`, the collected failures are returned together;
    /// otherwise they are logged.
    pub fn restore_all(&self, strict: bool) -> Result<()> {
        let handles = std::mem::take(&mut *self.registrations.borrow_mut());
        let failures = restore_handles(handles);
        if failures.is_empty() {
            return Ok(());
        }
        if strict {
            return Err(MockError::Verification(failures));
        }
        for failure in &failures {
            warn!(
                error = %failure,
                category = failure.category().as_str(),
                "mock verification failed during non-strict restore"
            );
        }
        Ok(())
    }

    /// Call a private or protected method, bypassing visibility.
    pub fn call_private(&self, target: &CallTarget, method: &str, args: Vec<Value>) -> Result<Value> {
        let class = target.class_name();
        let shape = SignatureInspector::new(&self.runtime).method(class, method)?;
        if shape.visibility == Visibility::Public {
            return Err(MockError::invalid(
                format!("{class}::{method}"),
                "is not private and is not protected!",
            ));
        }
        Ok(self.runtime.privileged().invoke(target, method, args)?)
    }
}

fn restore_handles(handles: Vec<MockHandle>) -> Vec<MockError> {
    handles
        .into_iter()
        .rev()
        .filter(|handle| !handle.is_restored())
        .filter_map(|handle| handle.restore().err())
        .collect()
}

impl Drop for MethodMocker {
    fn drop(&mut self) {
        let handles = std::mem::take(self.registrations.get_mut());
        let leaked = handles.iter().filter(|handle| !handle.is_restored()).count();
        if leaked == 0 {
            return;
        }
        warn!(leaked, "mock registry dropped with active registrations");

        let failures = restore_handles(handles);
        if failures.is_empty() {
            return;
        }
        let err = MockError::Verification(failures);
        match self.config.leak_policy {
            LeakPolicy::Panic if !std::thread::panicking() => {
                panic!("leaked mock registrations failed verification:\n{err}")
            }
            _ => warn!(error = %err, "leaked mock registrations failed verification"),
        }
    }
}
