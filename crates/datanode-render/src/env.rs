//! The render environment threaded through every render call.

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::extra::{ExtraContextProvider, ProviderRegistry, Trigger};
use crate::sandbox::{Capabilities, Evaluator};
use crate::template::Template;

/// Environment variable holding the process-wide debug toggle.
pub const DEBUG_ENV_VAR: &str = "DATANODE_RENDER_DEBUG";

/// Render settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Attach a debug report to every rendered result.
    pub render_debug: bool,
    /// Referencing an undefined variable fails the template.
    pub strict_undefined: bool,
    /// Names starting with this prefix are hidden from templates.
    pub reserved_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            render_debug: false,
            strict_undefined: true,
            reserved_prefix: "_".to_string(),
        }
    }
}

impl RenderConfig {
    /// Default settings with the environment toggle applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Turns debug on when [`DEBUG_ENV_VAR`] holds a truthy value.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(DEBUG_ENV_VAR) {
            if is_truthy(&value) {
                self.render_debug = true;
            }
        }
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Everything a render needs besides the placeholder itself: settings, the
/// sandboxed evaluator, and the extra-context providers.
///
/// Built once per host run.
#[derive(Debug)]
pub struct RenderEnv {
    config: RenderConfig,
    evaluator: Evaluator,
    providers: ProviderRegistry,
}

impl RenderEnv {
    /// An environment with the standard capabilities and built-in providers.
    pub fn new(config: RenderConfig) -> Result<Self, CapabilityError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> RenderEnvBuilder {
        RenderEnvBuilder::new()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.render_debug = debug;
    }

    /// Whether a render of `template` attaches a debug report.
    pub fn debug_for(&self, template: &Template) -> bool {
        template.debug || self.config.render_debug
    }
}

type EnvSetup = Box<dyn FnOnce(&mut minijinja::Environment<'static>)>;

/// Builder for [`RenderEnv`].
pub struct RenderEnvBuilder {
    config: RenderConfig,
    capabilities: Capabilities,
    providers: ProviderRegistry,
    setup: Vec<EnvSetup>,
}

impl Default for RenderEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEnvBuilder {
    pub fn new() -> Self {
        Self {
            config: RenderConfig::default(),
            capabilities: Capabilities::standard(),
            providers: ProviderRegistry::with_builtins(),
            setup: Vec::new(),
        }
    }

    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replaces the provider registry (dropping the built-ins).
    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    /// Registers an extra-context provider.
    pub fn provider<P>(mut self, trigger: Trigger, name: impl Into<String>, provider: P) -> Self
    where
        P: ExtraContextProvider + 'static,
    {
        self.providers.register(trigger, name, provider);
        self
    }

    /// Customizes the template environment (filters, functions, globals).
    pub fn environment<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut minijinja::Environment<'static>) + 'static,
    {
        self.setup.push(Box::new(f));
        self
    }

    pub fn build(self) -> Result<RenderEnv, CapabilityError> {
        let mut evaluator = Evaluator::new(&self.config, self.capabilities)?;
        for setup in self.setup {
            setup(evaluator.environment_mut());
        }
        Ok(RenderEnv {
            config: self.config,
            evaluator,
            providers: self.providers,
        })
    }
}
