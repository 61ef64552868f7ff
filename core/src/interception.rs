//! Installing substitutes into the dispatch table.
//!
//! A substitute is always installed on the member's declaring class. Whether a
//! given call reaches it is decided purely by dispatch: the call is
//! intercepted iff the body its binding mode resolves to belongs to the class
//! the override sits on. [`intercepts`] answers that question without running
//! anything.

use std::fmt;
use std::rc::Rc;

use runmock_runtime::BindingMode;
use runmock_runtime::MethodBody;
use runmock_runtime::MethodKey;
use runmock_runtime::Runtime;
use runmock_runtime::Value;
use runmock_runtime::body;
use tracing::debug;
use tracing::trace;

use crate::error::MockError;
use crate::error::Result;
use crate::inspector::MethodShape;
use crate::inspector::SignatureInspector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// The substitute answers instead of the original.
    Replace,
    /// The original runs; the substitute only observes.
    Sniff,
}

impl fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("replace"),
            Self::Sniff => f.write_str("sniff"),
        }
    }
}

/// Anonymous replacement receiving only the passed arguments.
pub type ClosureBody = Rc<dyn Fn(&[Value]) -> runmock_runtime::Result<Value>>;

/// Observer called with the passed arguments and the original's result.
pub type SniffHook = Rc<dyn Fn(&[Value], &Value) -> runmock_runtime::Result<()>>;

/// Runs before the original; an error stops the call before it has any effect.
pub type SniffGuard = Rc<dyn Fn(&[Value]) -> runmock_runtime::Result<()>>;

#[derive(Clone)]
pub enum Replacement {
    /// A re-declared body running in the declaring class's context.
    Body(MethodBody),
    Closure(ClosureBody),
}

#[derive(Clone)]
pub enum Interception {
    Replace(Replacement),
    Sniff {
        guard: Option<SniffGuard>,
        hook: SniffHook,
    },
}

impl Interception {
    /// Replace with a re-declared body.
    pub fn body<F>(f: F) -> Self
    where
        F: Fn(&mut runmock_runtime::CallContext) -> runmock_runtime::Result<Value> + 'static,
    {
        Self::Replace(Replacement::Body(body(f)))
    }

    /// Replace with an anonymous closure over the passed arguments.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> runmock_runtime::Result<Value> + 'static,
    {
        Self::Replace(Replacement::Closure(Rc::new(f)))
    }

    pub fn sniff<F>(f: F) -> Self
    where
        F: Fn(&[Value], &Value) -> runmock_runtime::Result<()> + 'static,
    {
        Self::Sniff {
            guard: None,
            hook: Rc::new(f),
        }
    }

    /// Sniff with a check that sees the arguments before the original runs.
    pub fn guarded_sniff<G, F>(guard: G, f: F) -> Self
    where
        G: Fn(&[Value]) -> runmock_runtime::Result<()> + 'static,
        F: Fn(&[Value], &Value) -> runmock_runtime::Result<()> + 'static,
    {
        Self::Sniff {
            guard: Some(Rc::new(guard)),
            hook: Rc::new(f),
        }
    }

    pub fn mode(&self) -> OverrideMode {
        match self {
            Self::Replace(_) => OverrideMode::Replace,
            Self::Sniff { .. } => OverrideMode::Sniff,
        }
    }
}

/// One installed substitute. Dropping it reinstates the original.
pub struct MethodOverride {
    runtime: Runtime,
    key: MethodKey,
    shape: MethodShape,
    mode: OverrideMode,
    active: bool,
}

impl fmt::Debug for MethodOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodOverride")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("active", &self.active)
            .finish()
    }
}

impl MethodOverride {
    pub fn install(
        runtime: &Runtime,
        class: &str,
        method: &str,
        interception: Interception,
    ) -> Result<Self> {
        let shape = SignatureInspector::new(runtime).method(class, method)?;
        if shape.declaring_class != class {
            return Err(MockError::DeclaredInParent {
                method: method.to_string(),
                declaring_class: shape.declaring_class,
            });
        }

        let key = MethodKey::new(class, method);
        if matches!(interception, Interception::Replace(Replacement::Closure(_)))
            && shape.prototype_class.is_some()
        {
            return Err(MockError::invalid(
                key.to_string(),
                format!("can't mock inherited method {method} as Closure"),
            ));
        }
        if runtime.is_patched(&key) {
            return Err(MockError::AlreadyRegistered(key.to_string()));
        }

        let mode = interception.mode();
        let substitute = build_substitute(runtime, &key, interception)?;
        runtime.patch_method(&key, substitute)?;
        debug!(method = %key, %mode, "installed override");

        Ok(Self {
            runtime: runtime.clone(),
            key,
            shape,
            mode,
            active: true,
        })
    }

    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    pub fn shape(&self) -> &MethodShape {
        &self.shape
    }

    pub fn mode(&self) -> OverrideMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Reinstate the original. Returns whether a patch was removed.
    pub fn restore(mut self) -> bool {
        self.uninstall()
    }

    fn uninstall(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        let removed = self.runtime.unpatch_method(&self.key);
        debug!(method = %self.key, removed, "restored override");
        removed
    }
}

impl Drop for MethodOverride {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn build_substitute(
    runtime: &Runtime,
    key: &MethodKey,
    interception: Interception,
) -> Result<MethodBody> {
    match interception {
        Interception::Replace(Replacement::Body(replacement)) => Ok(replacement),
        Interception::Replace(Replacement::Closure(closure)) => {
            Ok(body(move |ctx| closure(ctx.passed_args())))
        }
        Interception::Sniff { guard, hook } => {
            let original = runtime.original_body(key)?;
            Ok(body(move |ctx| {
                let args = ctx.passed_args().to_vec();
                if let Some(guard) = &guard {
                    guard(&args)?;
                }
                let result = original(ctx)?;
                trace!(method = %ctx.function(), "sniffed call");
                hook(&args, &result)?;
                Ok(result)
            }))
        }
    }
}

/// Whether a call made with `binding` would run an override installed on `override_class`.
pub fn intercepts(
    runtime: &Runtime,
    binding: &BindingMode,
    method: &str,
    override_class: &str,
) -> Result<bool> {
    let info = runtime.resolve_implementation(binding, method)?;
    Ok(info.declaring_class == override_class)
}
