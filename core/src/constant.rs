//! Constant overrides.
//!
//! Constants are not stacked: each constant can be overridden once until
//! [`ConstantMocker::restore`] puts every original back. A class constant is
//! tracked under the class that declares it, so naming it through a subclass
//! is the same override.

use std::cell::RefCell;
use std::collections::BTreeMap;

use runmock_runtime::Runtime;
use runmock_runtime::RuntimeError;
use runmock_runtime::Value;
use tracing::debug;

use crate::error::MockError;
use crate::error::Result;
use crate::inspector::MemberIdentity;

#[derive(Debug, Clone)]
struct ConstantOverrideEntry {
    identity: MemberIdentity,
    original: Value,
}

#[derive(Debug)]
pub struct ConstantMocker {
    runtime: Runtime,
    entries: RefCell<BTreeMap<String, ConstantOverrideEntry>>,
}

impl ConstantMocker {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            runtime: runtime.clone(),
            entries: RefCell::new(BTreeMap::new()),
        }
    }

    /// Override a global (`class == None`) or class constant.
    pub fn mock(&self, class: Option<&str>, name: &str, value: impl Into<Value>) -> Result<()> {
        let requested = MemberIdentity::constant(class, name).qualified_name();
        let identity = self.identity(class, name).map_err(|err| match err {
            RuntimeError::UnknownConstant(_) | RuntimeError::UnknownClass(_) => {
                MockError::NotFound(format!("Constant {requested} is not defined!"))
            }
            err => err.into(),
        })?;
        let key = identity.qualified_name();
        if self.entries.borrow().contains_key(&key) {
            return Err(MockError::AlreadyRegistered(format!("Constant {requested}")));
        }

        let original = self.runtime.redefine_constant(
            identity.class.as_deref(),
            &identity.name,
            value.into(),
        )?;
        debug!(constant = %requested, owner = %key, "overrode constant");

        self.entries
            .borrow_mut()
            .insert(key, ConstantOverrideEntry { identity, original });
        Ok(())
    }

    pub fn is_mocked(&self, class: Option<&str>, name: &str) -> bool {
        match self.identity(class, name) {
            Ok(identity) => self.entries.borrow().contains_key(&identity.qualified_name()),
            Err(_) => false,
        }
    }

    /// The constant as stored: class constants resolve to their declaring class.
    fn identity(&self, class: Option<&str>, name: &str) -> runmock_runtime::Result<MemberIdentity> {
        match class {
            None => {
                self.runtime.constant(None, name)?;
                Ok(MemberIdentity::constant(None, name))
            }
            Some(class) => {
                let owner = self.runtime.constant_owner(class, name)?;
                Ok(MemberIdentity::constant(Some(&owner), name))
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Rewrite every overridden constant to its original value and forget them.
    pub fn restore(&self) -> Result<()> {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        let mut first_error = None;
        for (full_name, entry) in entries {
            let ConstantOverrideEntry { identity, original } = entry;
            match self
                .runtime
                .redefine_constant(identity.class.as_deref(), &identity.name, original)
            {
                Ok(_) => debug!(constant = %full_name, "restored constant"),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
