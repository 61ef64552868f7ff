//! Property overrides.
//!
//! Static property overrides made with [`PropertyAccess::set_static_and_restore`]
//! are stacked per declaring class and property, so nested changes unwind in
//! order. Plain `set`/`set_static` write through without recording anything.

use std::cell::RefCell;
use std::collections::BTreeMap;

use runmock_runtime::ObjectRef;
use runmock_runtime::PrivilegedAccess;
use runmock_runtime::Runtime;
use runmock_runtime::Value;
use tracing::debug;

use crate::error::MockError;
use crate::error::Result;
use crate::inspector::MemberIdentity;

#[derive(Debug)]
pub struct PropertyAccess {
    access: PrivilegedAccess,
    /// Previous values, oldest first, keyed by declaring class and property.
    stacks: RefCell<BTreeMap<MemberIdentity, Vec<Value>>>,
}

impl PropertyAccess {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            access: runtime.privileged(),
            stacks: RefCell::new(BTreeMap::new()),
        }
    }

    /// Read an instance property regardless of visibility.
    pub fn get(&self, object: &ObjectRef, name: &str) -> Result<Value> {
        Ok(self.access.read_property(object, name)?)
    }

    pub fn set(&self, object: &ObjectRef, name: &str, value: impl Into<Value>) -> Result<()> {
        self.access.write_property(object, name, value.into())?;
        Ok(())
    }

    /// Read a static property regardless of visibility.
    pub fn get_static(&self, class: &str, name: &str) -> Result<Value> {
        Ok(self.access.read_static(class, name)?)
    }

    pub fn set_static(&self, class: &str, name: &str, value: impl Into<Value>) -> Result<()> {
        self.access.write_static(class, name, value.into())?;
        Ok(())
    }

    /// Write a static property and remember the value it replaced.
    pub fn set_static_and_restore(
        &self,
        class: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let identity = self.identity(class, name)?;
        let owner = identity.class.as_deref().unwrap_or(class);
        let previous = self.access.write_static(owner, name, value.into())?;
        let mut stacks = self.stacks.borrow_mut();
        let stack = stacks.entry(identity.clone()).or_default();
        stack.push(previous);
        debug!(property = %identity, depth = stack.len(), "overrode static property");
        Ok(())
    }

    /// Undo the newest pending override of a static property.
    pub fn restore_static(&self, class: &str, name: &str) -> Result<()> {
        let identity = self.identity(class, name)?;
        let previous = {
            let mut stacks = self.stacks.borrow_mut();
            let previous = stacks.get_mut(&identity).and_then(Vec::pop);
            if stacks.get(&identity).is_some_and(Vec::is_empty) {
                stacks.remove(&identity);
            }
            previous
        };
        let Some(previous) = previous else {
            return Err(MockError::StackUnderflow(format!("{class}::{name}")));
        };
        let owner = identity.class.as_deref().unwrap_or(class);
        self.access.write_static(owner, name, previous)?;
        debug!(property = %identity, "restored static property");
        Ok(())
    }

    /// Put every overridden static property back to its original value.
    ///
    /// Safe to call with nothing pending. Stacks are cleared even if a write fails.
    pub fn restore_static_all(&self) -> Result<()> {
        let stacks = std::mem::take(&mut *self.stacks.borrow_mut());
        let mut first_error = None;
        for (identity, frames) in stacks {
            let (Some(owner), Some(original)) = (identity.class.as_deref(), frames.into_iter().next())
            else {
                continue;
            };
            if let Err(err) = self.access.write_static(owner, &identity.name, original)
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Number of pending overrides for one static property.
    pub fn pending(&self, class: &str, name: &str) -> usize {
        let Ok(identity) = self.identity(class, name) else {
            return 0;
        };
        self.stacks.borrow().get(&identity).map_or(0, Vec::len)
    }

    pub fn has_pending(&self) -> bool {
        !self.stacks.borrow().is_empty()
    }

    fn identity(&self, class: &str, name: &str) -> Result<MemberIdentity> {
        let owner = self.access.static_owner(class, name)?;
        Ok(MemberIdentity::property(owner, name))
    }
}
