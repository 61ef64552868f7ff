//! Class declarations.
//!
//! A [`ClassDef`] is built once and handed to [`crate::Runtime::declare_class`].
//! Method bodies are plain closures over a [`CallContext`].

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::context::CallContext;
use crate::error::Result;
use crate::types::ParamSpec;
use crate::types::Signature;
use crate::types::TypeSpec;
use crate::types::Visibility;
use crate::value::Value;

/// Executable method body.
pub type MethodBody = Rc<dyn Fn(&mut CallContext) -> Result<Value>>;

/// Wrap a closure as a [`MethodBody`].
pub fn body<F>(f: F) -> MethodBody
where
    F: Fn(&mut CallContext) -> Result<Value> + 'static,
{
    Rc::new(f)
}

/// A method declaration.
#[derive(Clone)]
pub struct MethodDecl {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub signature: Signature,
    pub body: MethodBody,
}

impl MethodDecl {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut CallContext) -> Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: false,
            signature: Signature::default(),
            body: body(f),
        }
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn protected(mut self) -> Self {
        self.visibility = Visibility::Protected;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.signature.params.push(param);
        self
    }

    pub fn returns(mut self, ty: TypeSpec) -> Self {
        self.signature.return_type = Some(ty);
        self
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// A property declaration, instance or static.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub visibility: Visibility,
    pub default: Value,
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>, visibility: Visibility, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            visibility,
            default: default.into(),
        }
    }
}

/// A class declaration.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub constants: BTreeMap<String, Value>,
    pub properties: Vec<PropertyDecl>,
    pub static_properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            constants: BTreeMap::new(),
            properties: Vec::new(),
            static_properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        default: impl Into<Value>,
    ) -> Self {
        self.properties
            .push(PropertyDecl::new(name, visibility, default));
        self
    }

    pub fn static_property(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        default: impl Into<Value>,
    ) -> Self {
        self.static_properties
            .push(PropertyDecl::new(name, visibility, default));
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}
