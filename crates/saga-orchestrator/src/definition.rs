use std::fmt;
use std::future::Future;

use crate::erased::{FnStep, erase_action, erase_compensation};
use crate::retry::RetryPolicy;
use crate::step::SagaStep;

enum StepBody<C, E> {
    Closure(FnStep<C, E>),
    Custom(Box<dyn SagaStep<C, E>>),
}

/// One named unit of work registered with an [`Orchestrator`](crate::Orchestrator).
///
/// Built either from closures:
///
/// ```
/// use std::time::Duration;
/// use saga_orchestrator::{RetryPolicy, StepDefinition};
///
/// let step: StepDefinition<u32, std::io::Error> =
///     StepDefinition::new("reserve", |count: u32| async move { Ok(count + 1) })
///         .with_compensation(|count: u32, _err: &std::io::Error| async move {
///             let _ = count;
///             Ok(())
///         })
///         .with_retry(RetryPolicy::attempts(3).with_delay(Duration::from_millis(50)));
/// assert_eq!(step.name(), "reserve");
/// ```
///
/// or from any [`SagaStep`] implementation via [`StepDefinition::from_step`].
pub struct StepDefinition<C, E> {
    body: StepBody<C, E>,
    retry: Option<RetryPolicy>,
}

impl<C, E> StepDefinition<C, E>
where
    C: Send + 'static,
    E: Send + Sync + 'static,
{
    /// Create a step from an async action closure.
    #[must_use]
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C, E>> + Send + 'static,
    {
        Self {
            body: StepBody::Closure(FnStep::new(name.into(), erase_action(action))),
            retry: None,
        }
    }

    /// Wrap a [`SagaStep`] implementation, taking its retry policy as the default.
    #[must_use]
    pub fn from_step<S>(step: S) -> Self
    where
        S: SagaStep<C, E> + 'static,
    {
        let retry = step.retry_policy();
        Self {
            body: StepBody::Custom(Box::new(step)),
            retry,
        }
    }

    /// Attach a compensation closure, invoked during rollback with the context
    /// this step received and the error that triggered rollback.
    ///
    /// Only closure-built steps accept this; a [`SagaStep`] implementation
    /// provides its own `compensate()` and the closure is ignored.
    #[must_use]
    pub fn with_compensation<F, Fut>(mut self, compensation: F) -> Self
    where
        F: Fn(C, &E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        match &mut self.body {
            StepBody::Closure(step) => step.set_compensation(erase_compensation(compensation)),
            StepBody::Custom(step) => {
                tracing::warn!(
                    step = %step.name(),
                    "ignoring closure compensation on a custom saga step"
                );
            }
        }
        self
    }

    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.step().name()
    }

    /// The retry policy declared on this step, if any.
    #[must_use]
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry
    }

    #[must_use]
    pub fn has_compensation(&self) -> bool {
        self.step().has_compensation()
    }

    pub(crate) fn step(&self) -> &dyn SagaStep<C, E> {
        match &self.body {
            StepBody::Closure(step) => step,
            StepBody::Custom(step) => &**step,
        }
    }
}

impl<C, E> fmt::Debug for StepDefinition<C, E>
where
    C: Send + 'static,
    E: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name())
            .field("has_compensation", &self.has_compensation())
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    struct ReadOnlyStep;

    #[async_trait]
    impl SagaStep<i32, TestError> for ReadOnlyStep {
        fn name(&self) -> &str {
            "read_only"
        }

        async fn execute(&self, ctx: i32) -> Result<i32, TestError> {
            Ok(ctx)
        }

        fn has_compensation(&self) -> bool {
            false
        }

        fn retry_policy(&self) -> Option<RetryPolicy> {
            Some(RetryPolicy::attempts(2))
        }
    }

    #[test]
    fn closure_step_has_no_compensation_until_attached() {
        let step: StepDefinition<i32, TestError> =
            StepDefinition::new("inc", |ctx: i32| async move { Ok(ctx + 1) });
        assert!(!step.has_compensation());

        let step = step.with_compensation(|_ctx: i32, _err: &TestError| async move { Ok(()) });
        assert!(step.has_compensation());
    }

    #[test]
    fn from_step_takes_trait_retry_policy() {
        let step = StepDefinition::from_step(ReadOnlyStep);

        assert_eq!(step.name(), "read_only");
        assert_eq!(step.retry_policy(), Some(RetryPolicy::attempts(2)));
        assert!(!step.has_compensation());
    }

    #[test]
    fn with_retry_overrides_trait_policy() {
        let step = StepDefinition::from_step(ReadOnlyStep).with_retry(RetryPolicy::attempts(5));
        assert_eq!(step.retry_policy(), Some(RetryPolicy::attempts(5)));
    }

    #[test]
    fn debug_output_names_the_step() {
        let step: StepDefinition<i32, TestError> =
            StepDefinition::new("inc", |ctx: i32| async move { Ok(ctx + 1) });
        let debug = format!("{step:?}");
        assert!(debug.contains("inc"));
    }
}
