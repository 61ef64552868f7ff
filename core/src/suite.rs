//! One registry, one property stack and one constant map over a shared runtime.

use runmock_runtime::Runtime;
use tracing::debug;

use crate::config::MockerConfig;
use crate::constant::ConstantMocker;
use crate::error::Result;
use crate::method_mocker::MethodMocker;
use crate::property::PropertyAccess;

#[derive(Debug)]
pub struct MockSuite {
    runtime: Runtime,
    methods: MethodMocker,
    properties: PropertyAccess,
    constants: ConstantMocker,
}

impl MockSuite {
    pub fn new(runtime: &Runtime) -> Self {
        Self::with_config(runtime, MockerConfig::default())
    }

    pub fn with_config(runtime: &Runtime, config: MockerConfig) -> Self {
        Self {
            runtime: runtime.clone(),
            methods: MethodMocker::with_config(runtime, config),
            properties: PropertyAccess::new(runtime),
            constants: ConstantMocker::new(runtime),
        }
    }

    /// Build a suite with configuration resolved from the environment.
    pub fn from_env(runtime: &Runtime) -> Result<Self> {
        Ok(Self::with_config(runtime, MockerConfig::load()?))
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn config(&self) -> &MockerConfig {
        self.methods.config()
    }

    pub fn methods(&self) -> &MethodMocker {
        &self.methods
    }

    pub fn properties(&self) -> &PropertyAccess {
        &self.properties
    }

    pub fn constants(&self) -> &ConstantMocker {
        &self.constants
    }

    /// Restore everything using the configured strictness.
    pub fn teardown(&self) -> Result<()> {
        self.teardown_with(self.config().strict_teardown)
    }

    /// Restore methods, then properties, then constants.
    ///
    /// All three always run; the first failure is returned.
    pub fn teardown_with(&self, strict: bool) -> Result<()> {
        let methods = self.methods.restore_all(strict);
        let properties = self.properties.restore_static_all();
        let constants = self.constants.restore();
        debug!(
            strict,
            methods_ok = methods.is_ok(),
            properties_ok = properties.is_ok(),
            constants_ok = constants.is_ok(),
            "suite teardown"
        );
        methods?;
        properties?;
        constants
    }
}
