//! Reads a member's declared shape without running it.

use std::fmt;
use std::rc::Rc;

use runmock_runtime::MethodInfo;
use runmock_runtime::Runtime;
use runmock_runtime::RuntimeError;
use runmock_runtime::Signature;
use runmock_runtime::Visibility;

use crate::error::MockError;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberKind {
    Method,
    Property,
    Constant,
}

/// Names one overridable member. Constants may have no class (global).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberIdentity {
    pub class: Option<String>,
    pub name: String,
    pub kind: MemberKind,
}

impl MemberIdentity {
    pub fn method(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            name: name.into(),
            kind: MemberKind::Method,
        }
    }

    pub fn property(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            name: name.into(),
            kind: MemberKind::Property,
        }
    }

    pub fn constant(class: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            class: class.map(str::to_string),
            name: name.into(),
            kind: MemberKind::Constant,
        }
    }

    /// `Class::name`, or just `name` for globals.
    pub fn qualified_name(&self) -> String {
        match &self.class {
            Some(class) => format!("{class}::{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for MemberIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Declared shape of a method as seen from the class it was named on.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodShape {
    pub identity: MemberIdentity,
    /// Class owning the implementation, possibly an ancestor of the named class.
    pub declaring_class: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub signature: Rc<Signature>,
    /// Ancestor whose declaration the implementation redeclares.
    pub prototype_class: Option<String>,
}

impl MethodShape {
    fn from_info(identity: MemberIdentity, info: MethodInfo) -> Self {
        Self {
            identity,
            declaring_class: info.declaring_class,
            visibility: info.visibility,
            is_static: info.is_static,
            signature: info.signature,
            prototype_class: info.overridden_from,
        }
    }

    pub fn is_inherited(&self) -> bool {
        self.identity.class.as_deref() != Some(self.declaring_class.as_str())
    }
}

pub struct SignatureInspector<'a> {
    runtime: &'a Runtime,
}

impl<'a> SignatureInspector<'a> {
    pub fn new(runtime: &'a Runtime) -> Self {
        Self { runtime }
    }

    pub fn method(&self, class: &str, method: &str) -> Result<MethodShape> {
        self.inspect(&MemberIdentity::method(class, method))
    }

    /// Shape of a method member; fails with NotFound if the class or method is absent.
    pub fn inspect(&self, identity: &MemberIdentity) -> Result<MethodShape> {
        let Some(class) = identity.class.as_deref() else {
            return Err(MockError::NotFound(format!(
                "method \"{}\" has no owning class",
                identity.name
            )));
        };
        if identity.kind != MemberKind::Method {
            return Err(MockError::NotFound(format!("{identity} is not a method")));
        }
        match self.runtime.find_method(class, &identity.name) {
            Ok(info) => Ok(MethodShape::from_info(identity.clone(), info)),
            Err(
                err @ (RuntimeError::UnknownClass(_) | RuntimeError::UnknownMethod { .. }),
            ) => Err(MockError::NotFound(err.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}
