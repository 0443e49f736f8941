use async_trait::async_trait;

use crate::retry::RetryPolicy;

/// A step in a saga that can be executed and compensated.
///
/// Each step transforms the saga context into the next context, with the
/// ability to undo its effects if a later step fails. The orchestrator keeps
/// the context a step received and hands it back to `compensate()`.
///
/// # Type Parameters
///
/// - `C`: Context threaded from step to step
/// - `E`: Error type shared by actions, compensations and observers
#[async_trait]
pub trait SagaStep<C, E>: Send + Sync
where
    C: Send + 'static,
    E: Send + Sync + 'static,
{
    /// Human-readable name for logging, error messages and rollback lookup.
    fn name(&self) -> &str;

    /// Execute the step, producing the context for the next step.
    ///
    /// May be called more than once with the same input when the step has a
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails to complete.
    async fn execute(&self, ctx: C) -> Result<C, E>;

    /// Whether this step declares a compensation.
    ///
    /// Read-only steps return `false` and are skipped during rollback.
    fn has_compensation(&self) -> bool {
        true
    }

    /// Compensate (undo) the step's effects.
    ///
    /// Called during rollback when a later step fails. Receives the context
    /// that was passed to `execute()` and the error that triggered rollback.
    ///
    /// The default implementation is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails. Such errors are logged and
    /// never stop the rollback.
    async fn compensate(&self, ctx: C, error: &E) -> Result<(), E> {
        let _ = (ctx, error);
        Ok(())
    }

    /// Retry policy for `execute()`. `None` defers to the orchestrator config.
    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}
