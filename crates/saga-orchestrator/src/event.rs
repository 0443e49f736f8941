use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Which compensation a rollback event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationScope {
    /// The step's own compensation.
    Step,
    /// The orchestrator-wide compensation run for every recorded step.
    Global,
}

impl fmt::Display for CompensationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => f.write_str("step"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Lifecycle state of a saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaState {
    Pending,
    Running,
    Completed,
    RollingBack,
    Failed,
}

/// Advisory lifecycle event passed to the logging sink.
///
/// Serializes to a flat map tagged by `event`, so a sink can forward the
/// details as structured data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SagaEvent {
    DuplicateStepName {
        step: String,
    },
    StepStarted {
        step: String,
        index: usize,
    },
    StepSucceeded {
        step: String,
        attempt: u32,
    },
    StepRetrying {
        step: String,
        attempt: u32,
        remaining: u32,
        delay_ms: Option<u64>,
        error: String,
    },
    StepFailed {
        step: String,
        attempts: u32,
        error: String,
    },
    RollbackStarted {
        failed_step: String,
        completed_steps: usize,
        error: String,
    },
    CompensationSucceeded {
        step: String,
        scope: CompensationScope,
    },
    CompensationFailed {
        step: String,
        scope: CompensationScope,
        error: String,
    },
    RollbackFinished {
        failed_step: String,
        error: String,
    },
    Completed {
        steps: usize,
    },
}

impl SagaEvent {
    /// Short human-readable message for the event.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::DuplicateStepName { .. } => "duplicate step name; rollback resolves to the first",
            Self::StepStarted { .. } => "step started",
            Self::StepSucceeded { .. } => "step succeeded",
            Self::StepRetrying { .. } => "step failed, retrying",
            Self::StepFailed { .. } => "step failed, retries exhausted",
            Self::RollbackStarted { .. } => "rolling back completed steps",
            Self::CompensationSucceeded { .. } => "compensation succeeded",
            Self::CompensationFailed { .. } => "compensation failed",
            Self::RollbackFinished { .. } => "rollback finished, returning original error",
            Self::Completed { .. } => "saga completed",
        }
    }

    /// State the run is in once this event has been emitted.
    #[must_use]
    pub fn state(&self) -> SagaState {
        match self {
            Self::DuplicateStepName { .. } => SagaState::Pending,
            Self::StepStarted { .. }
            | Self::StepSucceeded { .. }
            | Self::StepRetrying { .. }
            | Self::StepFailed { .. } => SagaState::Running,
            Self::RollbackStarted { .. }
            | Self::CompensationSucceeded { .. }
            | Self::CompensationFailed { .. } => SagaState::RollingBack,
            Self::RollbackFinished { .. } => SagaState::Failed,
            Self::Completed { .. } => SagaState::Completed,
        }
    }
}

/// Logging sink receiving `(message, details)` for every lifecycle event.
pub type LogSink = Arc<dyn Fn(&str, &SagaEvent) + Send + Sync>;

pub(crate) fn delay_millis(delay: Option<Duration>) -> Option<u64> {
    delay.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Emit an event through tracing and, when configured, the sink.
pub(crate) fn emit(sink: Option<&LogSink>, event: SagaEvent) {
    trace_event(&event);
    if let Some(sink) = sink {
        sink(event.message(), &event);
    }
}

fn trace_event(event: &SagaEvent) {
    let message = event.message();
    match event {
        SagaEvent::DuplicateStepName { step } => warn!(step = %step, "{message}"),
        SagaEvent::StepStarted { step, index } => debug!(step = %step, index, "{message}"),
        SagaEvent::StepSucceeded { step, attempt } => debug!(step = %step, attempt, "{message}"),
        SagaEvent::StepRetrying {
            step,
            attempt,
            remaining,
            delay_ms,
            error,
        } => warn!(
            step = %step,
            attempt,
            remaining,
            delay_ms = ?delay_ms,
            error = %error,
            "{message}"
        ),
        SagaEvent::StepFailed {
            step,
            attempts,
            error,
        } => error!(step = %step, attempts, error = %error, "{message}"),
        SagaEvent::RollbackStarted {
            failed_step,
            completed_steps,
            error,
        } => info!(
            failed_step = %failed_step,
            completed_steps,
            error = %error,
            "{message}"
        ),
        SagaEvent::CompensationSucceeded { step, scope } => {
            debug!(step = %step, scope = %scope, "{message}");
        }
        SagaEvent::CompensationFailed { step, scope, error } => {
            warn!(step = %step, scope = %scope, error = %error, "{message}");
        }
        SagaEvent::RollbackFinished { failed_step, error } => {
            info!(failed_step = %failed_step, error = %error, "{message}");
        }
        SagaEvent::Completed { steps } => info!(steps, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn events_serialize_with_event_tag() -> anyhow::Result<()> {
        let event = SagaEvent::CompensationFailed {
            step: "charge".to_string(),
            scope: CompensationScope::Global,
            error: "refund rejected".to_string(),
        };

        let value = serde_json::to_value(&event)?;

        assert_eq!(value["event"], "compensation_failed");
        assert_eq!(value["step"], "charge");
        assert_eq!(value["scope"], "global");
        assert_eq!(value["error"], "refund rejected");
        Ok(())
    }

    #[test]
    fn emit_forwards_message_and_event_to_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink: LogSink = Arc::new(move |message, event| {
            captured
                .lock()
                .expect("sink lock")
                .push((message.to_string(), event.clone()));
        });

        emit(Some(&sink), SagaEvent::Completed { steps: 2 });

        let seen = seen.lock().expect("sink lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "saga completed");
        assert_eq!(seen[0].1, SagaEvent::Completed { steps: 2 });
    }

    #[test]
    fn emit_without_sink_is_a_no_op() {
        emit(None, SagaEvent::Completed { steps: 0 });
    }

    #[test]
    fn event_states_follow_run_lifecycle() {
        let started = SagaEvent::StepStarted {
            step: "a".to_string(),
            index: 0,
        };
        let rollback = SagaEvent::RollbackStarted {
            failed_step: "b".to_string(),
            completed_steps: 1,
            error: "boom".to_string(),
        };
        let finished = SagaEvent::RollbackFinished {
            failed_step: "b".to_string(),
            error: "boom".to_string(),
        };

        assert_eq!(started.state(), SagaState::Running);
        assert_eq!(rollback.state(), SagaState::RollingBack);
        assert_eq!(finished.state(), SagaState::Failed);
        assert_eq!(SagaEvent::Completed { steps: 1 }.state(), SagaState::Completed);
    }

    #[test]
    fn delay_millis_converts_durations() {
        assert_eq!(delay_millis(Some(Duration::from_millis(10))), Some(10));
        assert_eq!(delay_millis(None), None);
    }
}
