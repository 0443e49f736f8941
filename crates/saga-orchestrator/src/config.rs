use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Orchestrator settings loaded from TOML.
///
/// ```toml
/// name = "provision-tenant"
///
/// [retry]
/// max-attempts = 3
/// delay-ms = 250
///
/// [steps.charge-card.retry]
/// max-attempts = 5
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SagaConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    retry: Option<RetryPolicy>,
    #[serde(default)]
    steps: HashMap<String, StepConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct StepConfig {
    #[serde(default)]
    retry: Option<RetryPolicy>,
}

impl SagaConfig {
    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML, contains unknown keys,
    /// or declares a retry policy with zero attempts.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Policy applied to steps that declare none and have no override.
    #[must_use]
    pub fn default_retry(&self) -> Option<RetryPolicy> {
        self.retry
    }

    #[must_use]
    pub fn with_default_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    #[must_use]
    pub fn with_step_retry(mut self, step: impl Into<String>, policy: RetryPolicy) -> Self {
        self.steps.entry(step.into()).or_default().retry = Some(policy);
        self
    }

    /// Resolve the configured policy for a step: its override, else the default.
    #[must_use]
    pub fn retry_for(&self, step: &str) -> Option<RetryPolicy> {
        self.steps
            .get(step)
            .and_then(|cfg| cfg.retry)
            .or(self.retry)
    }
}
