//! Class table and method dispatch.
//!
//! Every call goes through [`Runtime::dispatch`], which resolves the
//! implementing class for the call's [`BindingMode`], then looks the
//! `(declaring class, method)` pair up in the patch table before falling back
//! to the declared body. Patching swaps table entries; class declarations are
//! never mutated.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;
use tracing::trace;

use crate::binding;
use crate::class::ClassDef;
use crate::class::MethodBody;
use crate::class::PropertyDecl;
use crate::context::CallContext;
use crate::error::Result;
use crate::error::RuntimeError;
use crate::types::Signature;
use crate::types::Visibility;
use crate::value::ObjectRef;
use crate::value::PropertySlot;
use crate::value::Value;

/// `(declaring class, method)`; the key of the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub class: String,
    pub method: String,
}

impl MethodKey {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.method)
    }
}

/// How a call names its target, which decides where method lookup starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingMode {
    /// `$obj->m()`: start at the receiver's runtime class.
    Instance { receiver_class: String },
    /// `self::m()`: start at the class the calling code is written in.
    Lexical { class: String },
    /// `static::m()`: start at the class the call chain was invoked on.
    LateStatic { called_class: String },
    /// `parent::m()`: start at the parent of the calling code's class.
    Parent { lexical_class: String },
}

/// Resolved shape of a method, without its body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub declaring_class: String,
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub signature: Rc<Signature>,
    /// Nearest ancestor whose non-private declaration this one redeclares.
    pub overridden_from: Option<String>,
}

impl MethodInfo {
    pub fn key(&self) -> MethodKey {
        MethodKey::new(&self.declaring_class, &self.name)
    }
}

/// Target of an out-of-class call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Class(String),
    Object(ObjectRef),
}

impl CallTarget {
    pub fn class_name(&self) -> &str {
        match self {
            Self::Class(class) => class,
            Self::Object(object) => object.class_name(),
        }
    }
}

impl From<ObjectRef> for CallTarget {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

impl From<&str> for CallTarget {
    fn from(class: &str) -> Self {
        Self::Class(class.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Caller {
    Global,
    Class(String),
    Privileged,
}

impl Caller {
    fn scope(&self) -> String {
        match self {
            Self::Global => "global scope".to_string(),
            Self::Class(class) => format!("scope {class}"),
            Self::Privileged => "privileged scope".to_string(),
        }
    }
}

pub(crate) struct Invocation {
    pub(crate) binding: BindingMode,
    pub(crate) method: String,
    pub(crate) caller: Caller,
    pub(crate) this: Option<ObjectRef>,
    pub(crate) static_class: String,
    pub(crate) args: Vec<Value>,
}

struct Completed {
    value: Value,
    args: Vec<Value>,
    signature: Rc<Signature>,
}

impl Completed {
    fn write_back(self, caller_args: &mut [Value]) -> Value {
        for (idx, (param, value)) in self.signature.params.iter().zip(self.args).enumerate() {
            if param.by_ref
                && !param.variadic
                && let Some(slot) = caller_args.get_mut(idx)
            {
                *slot = value;
            }
        }
        self.value
    }
}

struct MethodEntry {
    visibility: Visibility,
    is_static: bool,
    signature: Rc<Signature>,
    body: MethodBody,
}

struct StaticSlot {
    visibility: Visibility,
    value: Value,
}

struct ClassEntry {
    name: String,
    parent: Option<String>,
    constants: BTreeMap<String, Value>,
    statics: BTreeMap<String, StaticSlot>,
    properties: Vec<PropertyDecl>,
    methods: BTreeMap<String, MethodEntry>,
}

#[derive(Default)]
struct RuntimeState {
    classes: BTreeMap<String, ClassEntry>,
    globals: BTreeMap<String, Value>,
    patches: HashMap<MethodKey, MethodBody>,
    next_object_id: u64,
}

/// Walks a class and its ancestors, nearest first.
struct Ancestry<'a> {
    state: &'a RuntimeState,
    next: Option<&'a str>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a ClassEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.state.classes.get(self.next?)?;
        self.next = entry.parent.as_deref();
        Some(entry)
    }
}

impl RuntimeState {
    fn class(&self, name: &str) -> Result<&ClassEntry> {
        self.classes
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownClass(name.to_string()))
    }

    fn ancestry<'a>(&'a self, start: &'a str) -> Ancestry<'a> {
        Ancestry {
            state: self,
            next: Some(start),
        }
    }

    fn is_a(&self, class: &str, ancestor: &str) -> bool {
        self.ancestry(class).any(|entry| entry.name == ancestor)
    }

    fn method_info(&self, entry: &ClassEntry, name: &str, method: &MethodEntry) -> MethodInfo {
        let overridden_from = entry.parent.as_deref().and_then(|parent| {
            self.ancestry(parent)
                .find(|ancestor| {
                    ancestor
                        .methods
                        .get(name)
                        .is_some_and(|m| m.visibility != Visibility::Private)
                })
                .map(|ancestor| ancestor.name.clone())
        });
        MethodInfo {
            declaring_class: entry.name.clone(),
            name: name.to_string(),
            visibility: method.visibility,
            is_static: method.is_static,
            signature: Rc::clone(&method.signature),
            overridden_from,
        }
    }

    fn find_method(&self, start: &str, method: &str) -> Result<MethodInfo> {
        self.class(start)?;
        self.ancestry(start)
            .find_map(|entry| {
                entry
                    .methods
                    .get(method)
                    .map(|m| self.method_info(entry, method, m))
            })
            .ok_or_else(|| RuntimeError::UnknownMethod {
                class: start.to_string(),
                method: method.to_string(),
            })
    }

    fn binding_start(&self, binding: &BindingMode) -> Result<String> {
        match binding {
            BindingMode::Instance { receiver_class } => Ok(receiver_class.clone()),
            BindingMode::Lexical { class } => Ok(class.clone()),
            BindingMode::LateStatic { called_class } => Ok(called_class.clone()),
            BindingMode::Parent { lexical_class } => self
                .class(lexical_class)?
                .parent
                .clone()
                .ok_or_else(|| RuntimeError::NoParent(lexical_class.clone())),
        }
    }

    fn resolve(&self, binding: &BindingMode, method: &str, caller: &Caller) -> Result<MethodInfo> {
        let start = self.binding_start(binding)?;
        // A private method wins when called from its own class.
        if let Caller::Class(scope) = caller
            && let Some(entry) = self.classes.get(scope)
            && let Some(m) = entry.methods.get(method)
            && m.visibility == Visibility::Private
            && self.is_a(&start, scope)
        {
            return Ok(self.method_info(entry, method, m));
        }
        self.find_method(&start, method)
    }

    fn check_visibility(&self, info: &MethodInfo, caller: &Caller) -> Result<()> {
        let allowed = match (info.visibility, caller) {
            (Visibility::Public, _) | (_, Caller::Privileged) => true,
            (Visibility::Protected, Caller::Class(scope)) => {
                self.is_a(scope, &info.declaring_class) || self.is_a(&info.declaring_class, scope)
            }
            (Visibility::Private, Caller::Class(scope)) => *scope == info.declaring_class,
            (_, Caller::Global) => false,
        };
        if allowed {
            return Ok(());
        }
        Err(RuntimeError::Visibility {
            function: info.key().to_string(),
            visibility: info.visibility.to_string(),
            scope: caller.scope(),
        })
    }

    fn static_owner(&self, class: &str, name: &str) -> Result<String> {
        self.class(class)?;
        self.ancestry(class)
            .find(|entry| entry.statics.contains_key(name))
            .map(|entry| entry.name.clone())
            .ok_or_else(|| RuntimeError::UnknownProperty {
                class: class.to_string(),
                property: name.to_string(),
            })
    }

    fn static_slot(&self, class: &str, name: &str) -> Result<&StaticSlot> {
        let owner = self.static_owner(class, name)?;
        self.class(&owner)?
            .statics
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownProperty {
                class: class.to_string(),
                property: name.to_string(),
            })
    }

    fn static_slot_mut(&mut self, class: &str, name: &str) -> Result<&mut StaticSlot> {
        let owner = self.static_owner(class, name)?;
        self.classes
            .get_mut(&owner)
            .and_then(|entry| entry.statics.get_mut(name))
            .ok_or_else(|| RuntimeError::UnknownProperty {
                class: class.to_string(),
                property: name.to_string(),
            })
    }

    fn constant_slot_mut(&mut self, class: Option<&str>, name: &str) -> Result<&mut Value> {
        let Some(class) = class else {
            return self
                .globals
                .get_mut(name)
                .ok_or_else(|| RuntimeError::UnknownConstant(name.to_string()));
        };
        let owner = self.constant_owner(class, name)?;
        self.classes
            .get_mut(&owner)
            .and_then(|entry| entry.constants.get_mut(name))
            .ok_or_else(|| RuntimeError::UnknownConstant(format!("{class}::{name}")))
    }

    fn constant_owner(&self, class: &str, name: &str) -> Result<String> {
        self.class(class)?;
        self.ancestry(class)
            .find(|entry| entry.constants.contains_key(name))
            .map(|entry| entry.name.clone())
            .ok_or_else(|| RuntimeError::UnknownConstant(format!("{class}::{name}")))
    }
}

/// The host object model: classes, constants, static state and the patchable
/// dispatch table.
///
/// Cloning yields another handle to the same runtime.
#[derive(Clone, Default)]
pub struct Runtime {
    state: Rc<RefCell<RuntimeState>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Runtime")
            .field("classes", &state.classes.len())
            .field("patches", &state.patches.len())
            .finish()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_class(&self, def: ClassDef) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.classes.contains_key(&def.name) {
            return Err(RuntimeError::ClassRedeclared(def.name));
        }
        if let Some(parent) = &def.parent {
            state.class(parent)?;
        }

        let methods = def
            .methods
            .into_iter()
            .map(|decl| {
                let entry = MethodEntry {
                    visibility: decl.visibility,
                    is_static: decl.is_static,
                    signature: Rc::new(decl.signature),
                    body: decl.body,
                };
                (decl.name, entry)
            })
            .collect();
        let statics = def
            .static_properties
            .into_iter()
            .map(|decl| {
                let slot = StaticSlot {
                    visibility: decl.visibility,
                    value: decl.default,
                };
                (decl.name, slot)
            })
            .collect();

        debug!(class = %def.name, parent = ?def.parent, "declared class");
        state.classes.insert(
            def.name.clone(),
            ClassEntry {
                name: def.name,
                parent: def.parent,
                constants: def.constants,
                statics,
                properties: def.properties,
                methods,
            },
        );
        Ok(())
    }

    /// Define a global constant.
    pub fn define_constant(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.state
            .borrow_mut()
            .globals
            .insert(name.into(), value.into());
    }

    pub fn class_exists(&self, class: &str) -> bool {
        self.state.borrow().classes.contains_key(class)
    }

    pub fn parent_class(&self, class: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().class(class)?.parent.clone())
    }

    /// Whether `class` is `ancestor` or inherits from it.
    pub fn is_a(&self, class: &str, ancestor: &str) -> bool {
        self.state.borrow().is_a(class, ancestor)
    }

    /// Look `method` up starting at `class`, the way `Class::method` names it.
    pub fn find_method(&self, class: &str, method: &str) -> Result<MethodInfo> {
        self.state.borrow().find_method(class, method)
    }

    /// Which declaration a call with this binding would execute.
    pub fn resolve_implementation(&self, binding: &BindingMode, method: &str) -> Result<MethodInfo> {
        self.state.borrow().resolve(binding, method, &Caller::Global)
    }

    pub fn is_patched(&self, key: &MethodKey) -> bool {
        self.state.borrow().patches.contains_key(key)
    }

    /// Route calls that resolve to `key` through `body` instead of the declared body.
    pub fn patch_method(&self, key: &MethodKey, body: MethodBody) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.class(&key.class)?.methods.contains_key(&key.method) {
            return Err(RuntimeError::UnknownMethod {
                class: key.class.clone(),
                method: key.method.clone(),
            });
        }
        if state.patches.contains_key(key) {
            return Err(RuntimeError::AlreadyPatched(key.clone()));
        }
        state.patches.insert(key.clone(), body);
        debug!(method = %key, "patched method");
        Ok(())
    }

    /// Drop the patch for `key`. Returns whether one was installed.
    pub fn unpatch_method(&self, key: &MethodKey) -> bool {
        let removed = self.state.borrow_mut().patches.remove(key).is_some();
        if removed {
            debug!(method = %key, "unpatched method");
        }
        removed
    }

    /// The declared body for `key`, ignoring any patch.
    pub fn original_body(&self, key: &MethodKey) -> Result<MethodBody> {
        let state = self.state.borrow();
        state
            .class(&key.class)?
            .methods
            .get(&key.method)
            .map(|m| Rc::clone(&m.body))
            .ok_or_else(|| RuntimeError::UnknownMethod {
                class: key.class.clone(),
                method: key.method.clone(),
            })
    }

    pub fn instantiate(&self, class: &str) -> Result<ObjectRef> {
        let properties = {
            let state = self.state.borrow();
            state.class(class)?;
            let chain: Vec<&ClassEntry> = state.ancestry(class).collect();
            let mut properties = BTreeMap::new();
            for entry in chain.iter().rev() {
                for decl in &entry.properties {
                    let slot = PropertySlot {
                        visibility: decl.visibility,
                        owner: entry.name.clone(),
                        value: decl.default.clone(),
                    };
                    properties.insert(decl.name.clone(), slot);
                }
            }
            properties
        };
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_object_id += 1;
            state.next_object_id
        };
        Ok(ObjectRef::new(id, class.to_string(), properties))
    }

    /// `Class::method(...)` from outside any class.
    pub fn call_static(&self, class: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        self.dispatch(Self::static_invocation(class, method, Caller::Global, args))
            .map(|done| done.value)
    }

    /// Like [`Runtime::call_static`], writing by-reference parameters back into `args`.
    pub fn call_static_with_refs(&self, class: &str, method: &str, args: &mut [Value]) -> Result<Value> {
        let done = self.dispatch(Self::static_invocation(class, method, Caller::Global, args.to_vec()))?;
        Ok(done.write_back(args))
    }

    /// `$object->method(...)` from outside any class.
    pub fn call_method(&self, object: &ObjectRef, method: &str, args: Vec<Value>) -> Result<Value> {
        self.dispatch(Self::instance_invocation(object, method, Caller::Global, args))
            .map(|done| done.value)
    }

    pub fn call_method_with_refs(
        &self,
        object: &ObjectRef,
        method: &str,
        args: &mut [Value],
    ) -> Result<Value> {
        let done = self.dispatch(Self::instance_invocation(object, method, Caller::Global, args.to_vec()))?;
        Ok(done.write_back(args))
    }

    /// Global constant when `class` is `None`, otherwise an (inherited) class constant.
    pub fn constant(&self, class: Option<&str>, name: &str) -> Result<Value> {
        let state = self.state.borrow();
        match class {
            None => state
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UnknownConstant(name.to_string())),
            Some(class) => {
                state.class(class)?;
                state
                    .ancestry(class)
                    .find_map(|entry| entry.constants.get(name))
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnknownConstant(format!("{class}::{name}")))
            }
        }
    }

    /// Class that declares constant `name` as seen from `class`.
    pub fn constant_owner(&self, class: &str, name: &str) -> Result<String> {
        self.state.borrow().constant_owner(class, name)
    }

    /// Replace a constant's value in place, returning the previous value.
    pub fn redefine_constant(&self, class: Option<&str>, name: &str, value: Value) -> Result<Value> {
        let mut state = self.state.borrow_mut();
        if let Some(class) = class {
            state.class(class)?;
        }
        let slot = state.constant_slot_mut(class, name)?;
        let previous = std::mem::replace(slot, value);
        debug!(class = ?class, constant = name, "redefined constant");
        Ok(previous)
    }

    pub fn static_property(&self, class: &str, name: &str) -> Result<Value> {
        let state = self.state.borrow();
        let slot = state.static_slot(class, name)?;
        if slot.visibility != Visibility::Public {
            return Err(property_visibility(class, name, slot.visibility));
        }
        Ok(slot.value.clone())
    }

    pub fn set_static_property(&self, class: &str, name: &str, value: Value) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let slot = state.static_slot_mut(class, name)?;
        if slot.visibility != Visibility::Public {
            return Err(property_visibility(class, name, slot.visibility));
        }
        slot.value = value;
        Ok(())
    }

    pub fn property(&self, object: &ObjectRef, name: &str) -> Result<Value> {
        let slot = object_slot(object, name)?;
        if slot.visibility != Visibility::Public {
            return Err(property_visibility(&slot.owner, name, slot.visibility));
        }
        Ok(slot.value)
    }

    pub fn set_property(&self, object: &ObjectRef, name: &str, value: Value) -> Result<()> {
        let slot = object_slot(object, name)?;
        if slot.visibility != Visibility::Public {
            return Err(property_visibility(&slot.owner, name, slot.visibility));
        }
        object.write(name, value);
        Ok(())
    }

    /// Access that ignores visibility.
    pub fn privileged(&self) -> PrivilegedAccess {
        PrivilegedAccess {
            runtime: self.clone(),
        }
    }

    pub(crate) fn read_static_raw(&self, class: &str, name: &str) -> Result<Value> {
        Ok(self.state.borrow().static_slot(class, name)?.value.clone())
    }

    pub(crate) fn write_static_raw(&self, class: &str, name: &str, value: Value) -> Result<Value> {
        let mut state = self.state.borrow_mut();
        let slot = state.static_slot_mut(class, name)?;
        Ok(std::mem::replace(&mut slot.value, value))
    }

    /// A call made from inside a method body of `caller_class`.
    pub(crate) fn forward(
        &self,
        binding: BindingMode,
        method: &str,
        caller_class: &str,
        this: Option<ObjectRef>,
        static_class: String,
        args: Vec<Value>,
    ) -> Result<Value> {
        self.dispatch(Invocation {
            binding,
            method: method.to_string(),
            caller: Caller::Class(caller_class.to_string()),
            this,
            static_class,
            args,
        })
        .map(|done| done.value)
    }

    fn static_invocation(class: &str, method: &str, caller: Caller, args: Vec<Value>) -> Invocation {
        Invocation {
            binding: BindingMode::LateStatic {
                called_class: class.to_string(),
            },
            method: method.to_string(),
            caller,
            this: None,
            static_class: class.to_string(),
            args,
        }
    }

    fn instance_invocation(object: &ObjectRef, method: &str, caller: Caller, args: Vec<Value>) -> Invocation {
        Invocation {
            binding: BindingMode::Instance {
                receiver_class: object.class_name().to_string(),
            },
            method: method.to_string(),
            caller,
            this: Some(object.clone()),
            static_class: object.class_name().to_string(),
            args,
        }
    }

    fn dispatch(&self, invocation: Invocation) -> Result<Completed> {
        let Invocation {
            binding,
            method,
            caller,
            this,
            static_class,
            args,
        } = invocation;

        let (info, body, patched) = {
            let state = self.state.borrow();
            let info = state.resolve(&binding, &method, &caller)?;
            state.check_visibility(&info, &caller)?;
            let key = info.key();
            match state.patches.get(&key) {
                Some(body) => {
                    let body = Rc::clone(body);
                    (info, body, true)
                }
                None => {
                    let body = state
                        .class(&key.class)?
                        .methods
                        .get(&key.method)
                        .map(|m| Rc::clone(&m.body))
                        .ok_or_else(|| RuntimeError::UnknownMethod {
                            class: key.class.clone(),
                            method: key.method.clone(),
                        })?;
                    (info, body, false)
                }
            }
        };

        let function = info.key();
        let function_name = function.to_string();
        let this = if info.is_static {
            None
        } else if this.is_some() {
            this
        } else {
            return Err(RuntimeError::NonStaticCall(function_name));
        };

        let is_a = |class: &str, ancestor: &str| self.is_a(class, ancestor);
        let bound = binding::bind(&function_name, &info.signature, args, &is_a)?;
        trace!(function = %function, binding = ?binding, patched, "dispatch");

        let mut ctx = CallContext::new(
            self.clone(),
            function,
            info.declaring_class.clone(),
            static_class,
            this,
            bound,
        );
        let value = body(&mut ctx)?;
        binding::check_return(&function_name, &info.signature, &value, &is_a)?;
        Ok(Completed {
            value,
            args: ctx.into_args(),
            signature: info.signature,
        })
    }
}

fn object_slot(object: &ObjectRef, name: &str) -> Result<PropertySlot> {
    object
        .slot(name)
        .ok_or_else(|| RuntimeError::UnknownProperty {
            class: object.class_name().to_string(),
            property: name.to_string(),
        })
}

fn property_visibility(class: &str, name: &str, visibility: Visibility) -> RuntimeError {
    RuntimeError::PropertyVisibility {
        class: class.to_string(),
        property: name.to_string(),
        visibility: visibility.to_string(),
    }
}

/// Visibility-bypassing accessor for properties and non-public methods.
#[derive(Debug, Clone)]
pub struct PrivilegedAccess {
    runtime: Runtime,
}

impl PrivilegedAccess {
    /// Class that actually holds static property `name` as seen from `class`.
    pub fn static_owner(&self, class: &str, name: &str) -> Result<String> {
        self.runtime.state.borrow().static_owner(class, name)
    }

    pub fn read_static(&self, class: &str, name: &str) -> Result<Value> {
        self.runtime.read_static_raw(class, name)
    }

    /// Returns the previous value.
    pub fn write_static(&self, class: &str, name: &str, value: Value) -> Result<Value> {
        self.runtime.write_static_raw(class, name, value)
    }

    pub fn read_property(&self, object: &ObjectRef, name: &str) -> Result<Value> {
        Ok(object_slot(object, name)?.value)
    }

    /// Returns the previous value.
    pub fn write_property(&self, object: &ObjectRef, name: &str, value: Value) -> Result<Value> {
        object
            .write(name, value)
            .ok_or_else(|| RuntimeError::UnknownProperty {
                class: object.class_name().to_string(),
                property: name.to_string(),
            })
    }

    /// Call a method regardless of its visibility.
    pub fn invoke(&self, target: &CallTarget, method: &str, args: Vec<Value>) -> Result<Value> {
        let invocation = match target {
            CallTarget::Class(class) => Runtime::static_invocation(class, method, Caller::Privileged, args),
            CallTarget::Object(object) => {
                Runtime::instance_invocation(object, method, Caller::Privileged, args)
            }
        };
        self.runtime.dispatch(invocation).map(|done| done.value)
    }
}
