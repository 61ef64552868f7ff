//! Runtime values.
//!
//! Values are what flows through method calls, constants and properties.
//! Objects are shared handles: cloning an [`ObjectRef`] yields the same
//! instance, and equality between objects is identity.

use serde::Serialize;
use serde::Serializer;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::types::Visibility;

/// A runtime value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(ObjectRef),
}

impl Value {
    /// Type name as reported in contract violations (`int`, `?string`, class name...).
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::List(_) | Value::Map(_) => "array".to_string(),
            Value::Object(object) => object.class_name().to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Compact JSON rendering used in diagnostics.
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| format!("<unrenderable: {err}>"))
    }
}

/// Render a list of values as a JSON array, for failure messages.
pub fn render_list(values: &[Value]) -> String {
    serde_json::to_string(values).unwrap_or_else(|err| format!("<unrenderable: {err}>"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.render()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A property slot on an instance.
#[derive(Debug, Clone)]
pub(crate) struct PropertySlot {
    pub(crate) visibility: Visibility,
    pub(crate) owner: String,
    pub(crate) value: Value,
}

#[derive(Debug)]
struct Instance {
    id: u64,
    class: String,
    properties: RefCell<BTreeMap<String, PropertySlot>>,
}

/// Shared handle to an object instance.
#[derive(Clone)]
pub struct ObjectRef(Rc<Instance>);

impl ObjectRef {
    pub(crate) fn new(id: u64, class: String, properties: BTreeMap<String, PropertySlot>) -> Self {
        Self(Rc::new(Instance {
            id,
            class,
            properties: RefCell::new(properties),
        }))
    }

    /// Runtime class of the instance.
    pub fn class_name(&self) -> &str {
        &self.0.class
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub(crate) fn slot(&self, name: &str) -> Option<PropertySlot> {
        self.0.properties.borrow().get(name).cloned()
    }

    /// Overwrite an existing property, returning the previous value.
    pub(crate) fn write(&self, name: &str, value: Value) -> Option<Value> {
        let mut properties = self.0.properties.borrow_mut();
        let slot = properties.get_mut(name)?;
        Some(std::mem::replace(&mut slot.value, value))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}#{})", self.0.class, self.0.id)
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}#{}", self.0.class, self.0.id))
    }
}
