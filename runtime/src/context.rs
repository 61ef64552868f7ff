//! The environment a method body runs in.

use std::collections::BTreeMap;

use crate::binding::BoundArgs;
use crate::error::Result;
use crate::error::RuntimeError;
use crate::runtime::BindingMode;
use crate::runtime::MethodKey;
use crate::runtime::Runtime;
use crate::value::ObjectRef;
use crate::value::Value;

/// One executing call.
///
/// `lexical_class` is the class whose declaration is running, which is what
/// `self::` and `parent::` resolve against; `static_class` is the class the
/// call chain was invoked on, which is what `static::` resolves against.
pub struct CallContext {
    runtime: Runtime,
    function: MethodKey,
    lexical_class: String,
    static_class: String,
    this: Option<ObjectRef>,
    args: BoundArgs,
}

impl CallContext {
    pub(crate) fn new(
        runtime: Runtime,
        function: MethodKey,
        lexical_class: String,
        static_class: String,
        this: Option<ObjectRef>,
        args: BoundArgs,
    ) -> Self {
        Self {
            runtime,
            function,
            lexical_class,
            static_class,
            this,
            args,
        }
    }

    pub(crate) fn into_args(self) -> Vec<Value> {
        self.args.passed
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn function(&self) -> &MethodKey {
        &self.function
    }

    pub fn lexical_class(&self) -> &str {
        &self.lexical_class
    }

    pub fn static_class(&self) -> &str {
        &self.static_class
    }

    pub fn this(&self) -> Result<&ObjectRef> {
        self.this
            .as_ref()
            .ok_or_else(|| RuntimeError::NoObjectContext(self.function.to_string()))
    }

    /// Arguments exactly as the caller passed them.
    pub fn passed_args(&self) -> &[Value] {
        &self.args.passed
    }

    /// Positional argument, falling back to the parameter default.
    pub fn arg(&self, idx: usize) -> Value {
        self.args
            .passed
            .get(idx)
            .or_else(|| self.args.params.get(idx).map(|(_, value)| value))
            .cloned()
            .unwrap_or_default()
    }

    /// Bound parameter by name; variadic parameters are a list.
    pub fn named(&self, name: &str) -> Value {
        self.args
            .params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    /// Assign to a parameter slot; by-reference parameters carry this back to the caller.
    pub fn set_arg(&mut self, idx: usize, value: Value) {
        if let Some(slot) = self.args.params.get_mut(idx) {
            slot.1 = value.clone();
        }
        if let Some(slot) = self.args.passed.get_mut(idx) {
            *slot = value;
        }
    }

    /// Every bound parameter by name.
    pub fn defined_vars(&self) -> Value {
        let vars: BTreeMap<String, Value> = self.args.params.iter().cloned().collect();
        Value::Map(vars)
    }

    /// `$this->method(...)`
    pub fn call_this(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let this = self.this()?.clone();
        let receiver_class = this.class_name().to_string();
        self.runtime.forward(
            BindingMode::Instance {
                receiver_class: receiver_class.clone(),
            },
            method,
            &self.lexical_class,
            Some(this),
            receiver_class,
            args,
        )
    }

    /// `self::method(...)`
    pub fn call_self(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        self.forward(
            BindingMode::Lexical {
                class: self.lexical_class.clone(),
            },
            method,
            args,
        )
    }

    /// `static::method(...)`
    pub fn call_static(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        self.forward(
            BindingMode::LateStatic {
                called_class: self.static_class.clone(),
            },
            method,
            args,
        )
    }

    /// `parent::method(...)`
    pub fn call_parent(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        self.forward(
            BindingMode::Parent {
                lexical_class: self.lexical_class.clone(),
            },
            method,
            args,
        )
    }

    fn forward(&self, binding: BindingMode, method: &str, args: Vec<Value>) -> Result<Value> {
        self.runtime.forward(
            binding,
            method,
            &self.lexical_class,
            self.this.clone(),
            self.static_class.clone(),
            args,
        )
    }

    /// `self::NAME`
    pub fn class_constant(&self, name: &str) -> Result<Value> {
        self.runtime.constant(Some(&self.lexical_class), name)
    }

    /// `self::$name`, any visibility.
    pub fn static_property(&self, name: &str) -> Result<Value> {
        self.runtime.read_static_raw(&self.lexical_class, name)
    }

    pub fn set_static_property(&self, name: &str, value: Value) -> Result<()> {
        self.runtime
            .write_static_raw(&self.lexical_class, name, value)
            .map(|_| ())
    }

    /// `$this->name`, any visibility.
    pub fn property(&self, name: &str) -> Result<Value> {
        self.runtime.privileged().read_property(self.this()?, name)
    }

    pub fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.runtime
            .privileged()
            .write_property(self.this()?, name, value)
            .map(|_| ())
    }
}
