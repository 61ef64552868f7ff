//! Declared shapes: visibility, parameter and return types, signatures.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;

use crate::value::Value;

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type part of a declaration, without nullability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDecl {
    Mixed,
    Bool,
    Int,
    Float,
    String,
    Array,
    Void,
    Class(String),
}

/// A declared parameter or return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub decl: TypeDecl,
    pub nullable: bool,
}

impl TypeSpec {
    pub fn new(decl: TypeDecl) -> Self {
        Self {
            decl,
            nullable: false,
        }
    }

    pub fn nullable(decl: TypeDecl) -> Self {
        Self {
            decl,
            nullable: true,
        }
    }

    pub fn int() -> Self {
        Self::new(TypeDecl::Int)
    }

    pub fn float() -> Self {
        Self::new(TypeDecl::Float)
    }

    pub fn string() -> Self {
        Self::new(TypeDecl::String)
    }

    pub fn bool() -> Self {
        Self::new(TypeDecl::Bool)
    }

    pub fn array() -> Self {
        Self::new(TypeDecl::Array)
    }

    pub fn mixed() -> Self {
        Self::new(TypeDecl::Mixed)
    }

    pub fn void() -> Self {
        Self::new(TypeDecl::Void)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(TypeDecl::Class(name.into()))
    }

    /// Whether `value` satisfies this declaration.
    ///
    /// `is_a(class, ancestor)` answers instance-of questions for object values.
    pub fn accepts(&self, value: &Value, is_a: &dyn Fn(&str, &str) -> bool) -> bool {
        if value.is_null() {
            return self.nullable || matches!(self.decl, TypeDecl::Mixed | TypeDecl::Void);
        }
        match (&self.decl, value) {
            (TypeDecl::Mixed, _) => true,
            (TypeDecl::Bool, Value::Bool(_)) => true,
            (TypeDecl::Int, Value::Int(_)) => true,
            (TypeDecl::Float, Value::Float(_) | Value::Int(_)) => true,
            (TypeDecl::String, Value::Str(_)) => true,
            (TypeDecl::Array, Value::List(_) | Value::Map(_)) => true,
            (TypeDecl::Class(class), Value::Object(object)) => is_a(object.class_name(), class),
            _ => false,
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.decl {
            TypeDecl::Mixed => return f.write_str("mixed"),
            TypeDecl::Void => return f.write_str("void"),
            TypeDecl::Bool => "bool",
            TypeDecl::Int => "int",
            TypeDecl::Float => "float",
            TypeDecl::String => "string",
            TypeDecl::Array => "array",
            TypeDecl::Class(class) => class.as_str(),
        };
        if self.nullable {
            write!(f, "?{name}")
        } else {
            f.write_str(name)
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: Option<TypeSpec>,
    pub by_ref: bool,
    pub default: Option<Value>,
    pub variadic: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            by_ref: false,
            default: None,
            variadic: false,
        }
    }

    pub fn typed(mut self, ty: TypeSpec) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Ordered parameter list plus return type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub params: Vec<ParamSpec>,
    pub return_type: Option<TypeSpec>,
}

impl Signature {
    /// Number of leading arguments a caller must pass.
    ///
    /// An optional parameter followed by a required one is itself required.
    pub fn required_count(&self) -> usize {
        self.params
            .iter()
            .rposition(|p| !p.variadic && !p.has_default())
            .map_or(0, |idx| idx + 1)
    }

    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    /// Upper bound on meaningful arguments; `None` when variadic.
    pub fn max_count(&self) -> Option<usize> {
        if self.is_variadic() {
            None
        } else {
            Some(self.params.len())
        }
    }
}
