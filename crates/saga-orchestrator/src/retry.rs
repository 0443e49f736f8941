use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Bound on re-attempts of a failing step action.
///
/// `max_attempts` counts the first call, so a policy of 3 invokes the action at
/// most three times. The delay is only a wait between attempts; a policy
/// without a delay still retries, immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RetryPolicyValue")]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Option<Duration>,
}

impl RetryPolicy {
    /// A policy allowing `max_attempts` calls with no wait in between.
    ///
    /// Zero is treated as one: every step runs at least once.
    #[must_use]
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: None,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::attempts(1)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RetryPolicyValue {
    max_attempts: u32,
    #[serde(default)]
    delay_ms: Option<u64>,
}

impl TryFrom<RetryPolicyValue> for RetryPolicy {
    type Error = ConfigError;

    fn try_from(value: RetryPolicyValue) -> Result<Self, Self::Error> {
        if value.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry {
                reason: "max-attempts must be at least 1",
            });
        }
        let policy = Self::attempts(value.max_attempts);
        Ok(match value.delay_ms {
            Some(ms) => policy.with_delay(Duration::from_millis(ms)),
            None => policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::attempts(0).max_attempts(), 1);
    }

    #[test]
    fn default_policy_runs_once_without_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay(), None);
    }

    #[test]
    fn with_delay_keeps_attempts() {
        let policy = RetryPolicy::attempts(3).with_delay(Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn deserializes_kebab_case_table() -> anyhow::Result<()> {
        let policy: RetryPolicy = toml::from_str("max-attempts = 4\ndelay-ms = 250\n")?;
        assert_eq!(policy, RetryPolicy::attempts(4).with_delay(Duration::from_millis(250)));
        Ok(())
    }

    #[test]
    fn rejects_zero_attempts_in_config() {
        let result: Result<RetryPolicy, _> = toml::from_str("max-attempts = 0\n");
        let err = result.expect_err("zero attempts should be rejected");
        assert!(err.to_string().contains("max-attempts must be at least 1"));
    }
}
