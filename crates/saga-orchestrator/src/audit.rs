use std::time::Instant;

use crate::event::CompensationScope;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step is running or executed successfully.
    Executed,
    /// Step exhausted its retries, or an observer failed for it.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
}

/// Outcome of a compensation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationOutcome {
    Succeeded,
    Failed,
}

/// Record of a step's execution in the saga.
#[derive(Debug)]
pub struct StepRecord {
    /// Name of the step.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// How many times the action was invoked.
    pub attempts: u32,
    /// When the step started executing.
    pub started_at: Instant,
    /// When the step completed (execution or compensation).
    pub completed_at: Option<Instant>,
    /// Description of compensation (if applicable).
    pub compensation_description: Option<String>,
    /// Outcome of the global compensation for this step, if it ran.
    pub global_compensation: Option<CompensationOutcome>,
}

/// Audit log tracking all step executions in a saga run.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step execution starting, returning its record index.
    pub(crate) fn record_start(&mut self, name: &str) -> usize {
        self.records.push(StepRecord {
            name: name.to_string(),
            status: StepStatus::Executed,
            attempts: 0,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
            global_compensation: None,
        });
        self.records.len() - 1
    }

    /// Count one more invocation of the last step's action.
    pub(crate) fn record_attempt(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.attempts += 1;
        }
    }

    /// Mark the last step as failed.
    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Mark the last step as completed successfully.
    pub(crate) fn record_success(&mut self, compensation_description: Option<String>) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
            record.compensation_description = compensation_description;
        }
    }

    /// Record the outcome of a compensation for the record at `index`.
    pub(crate) fn record_compensation(
        &mut self,
        index: usize,
        scope: CompensationScope,
        outcome: CompensationOutcome,
    ) {
        let Some(record) = self.records.get_mut(index) else {
            return;
        };
        match scope {
            CompensationScope::Step => {
                record.status = match outcome {
                    CompensationOutcome::Succeeded => StepStatus::Compensated,
                    CompensationOutcome::Failed => StepStatus::CompensationFailed,
                };
            }
            CompensationScope::Global => record.global_compensation = Some(outcome),
        }
        record.completed_at = Some(Instant::now());
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Get a summary of the saga execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
            };
            let mut line = format!("{status} {}", record.name);
            if record.attempts > 1 {
                line.push_str(&format!(" ({} attempts)", record.attempts));
            }
            match record.global_compensation {
                Some(CompensationOutcome::Succeeded) => line.push_str(" [global ↩]"),
                Some(CompensationOutcome::Failed) => line.push_str(" [global ⚠]"),
                None => {}
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}
