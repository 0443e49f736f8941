use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Lifecycle hook that can abort a saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    OnStart,
    OnSuccess,
    OnError,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OnStart => "on_start",
            Self::OnSuccess => "on_success",
            Self::OnError => "on_error",
        };
        f.write_str(name)
    }
}

/// Error returned by a failed saga run.
///
/// Always carries exactly the error that triggered rollback. Compensation
/// failures are logged during the unwind and never surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E> {
    /// A step exhausted its retry budget.
    #[error("step '{step}' failed after {attempts} attempt(s)")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// Number of times the action was invoked.
        attempts: u32,
        /// The error returned by the last attempt.
        #[source]
        source: E,
    },

    /// A lifecycle observer returned an error.
    #[error("{hook} observer failed for step '{step}'")]
    ObserverFailed {
        /// Name of the step being observed.
        step: String,
        /// The hook that failed.
        hook: Hook,
        /// The error returned by the observer.
        #[source]
        source: E,
    },
}

impl<E> SagaError<E> {
    /// Name of the step during which the run failed.
    #[must_use]
    pub fn step(&self) -> &str {
        match self {
            Self::StepFailed { step, .. } | Self::ObserverFailed { step, .. } => step,
        }
    }

    /// The triggering error.
    #[must_use]
    pub fn inner(&self) -> &E {
        match self {
            Self::StepFailed { source, .. } | Self::ObserverFailed { source, .. } => source,
        }
    }

    /// Consume the saga error, returning the triggering error.
    #[must_use]
    pub fn into_inner(self) -> E {
        match self {
            Self::StepFailed { source, .. } | Self::ObserverFailed { source, .. } => source,
        }
    }
}

/// Error loading a [`SagaConfig`](crate::SagaConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read saga config at '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid retry policy: {reason}")]
    InvalidRetry { reason: &'static str },
}
