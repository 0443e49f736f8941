//! Sequential saga orchestration with retries and compensation.
//!
//! An [`Orchestrator`] runs named steps in order. Each step's output becomes
//! the next step's input, and the input each completed step received is kept
//! so that, if a later step fails after exhausting its retries, completed
//! steps are compensated in reverse order before the original error is
//! returned.

mod audit;
mod config;
mod definition;
mod erased;
mod error;
mod event;
mod history;
mod observer;
mod retry;
mod saga;
mod step;

pub use audit::{CompensationOutcome, SagaAuditLog, StepRecord, StepStatus};
pub use config::SagaConfig;
pub use definition::StepDefinition;
pub use error::{ConfigError, Hook, SagaError};
pub use event::{CompensationScope, LogSink, SagaEvent, SagaState};
pub use history::ExecutionRecord;
pub use observer::Observers;
pub use retry::RetryPolicy;
pub use saga::Orchestrator;
pub use step::SagaStep;

/// Re-exported so [`SagaStep`] implementations can use the same macro.
pub use async_trait::async_trait;
