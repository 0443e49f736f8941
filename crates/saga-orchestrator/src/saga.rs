use std::collections::HashSet;
use std::fmt::{self, Display};
use std::sync::Arc;

use tracing::Instrument;

use crate::audit::{CompensationOutcome, SagaAuditLog};
use crate::config::SagaConfig;
use crate::definition::StepDefinition;
use crate::error::{Hook, SagaError};
use crate::event::{CompensationScope, LogSink, SagaEvent, delay_millis, emit};
use crate::history::ExecutionRecord;
use crate::observer::Observers;
use crate::retry::RetryPolicy;

/// Runs a list of steps in order, threading each step's output into the next.
///
/// If a step fails after exhausting its retries (or an observer fails), the
/// steps that already completed are compensated in reverse order (LIFO) and
/// the error that triggered the rollback is returned. Compensation failures
/// are logged and never stop the unwind.
///
/// Every call to [`run`](Self::run) starts from a clean history. Running the
/// same orchestrator concurrently is a misuse: the steps and observers are
/// shared, so their side effects interleave.
pub struct Orchestrator<C, E> {
    steps: Vec<StepDefinition<C, E>>,
    observers: Observers<C, E>,
    logger: Option<LogSink>,
    config: SagaConfig,
}

impl<C, E> Default for Orchestrator<C, E> {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            observers: Observers::default(),
            logger: None,
            config: SagaConfig::default(),
        }
    }
}

impl<C, E> Orchestrator<C, E>
where
    C: Clone + Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a logging sink receiving every lifecycle event.
    #[must_use]
    pub fn with_logger<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str, &SagaEvent) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(sink));
        self
    }

    /// Apply a config: saga name for tracing spans and fallback retry policies.
    #[must_use]
    pub fn with_config(mut self, config: SagaConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a step.
    ///
    /// Names are not required to be unique, but rollback resolves a name to
    /// the first step registered under it. Duplicates are reported when the
    /// run starts.
    #[must_use]
    pub fn add_step(mut self, step: StepDefinition<C, E>) -> Self {
        self.steps.push(step);
        self
    }

    /// Append steps in the given order.
    #[must_use]
    pub fn add_steps<I>(self, steps: I) -> Self
    where
        I: IntoIterator<Item = StepDefinition<C, E>>,
    {
        steps.into_iter().fold(self, Self::add_step)
    }

    /// Replace all observers and the global compensation.
    #[must_use]
    pub fn set_observers(mut self, observers: Observers<C, E>) -> Self {
        self.observers = observers;
        self
    }

    #[must_use]
    pub fn steps(&self) -> &[StepDefinition<C, E>] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the saga from the empty (default) context.
    ///
    /// # Errors
    ///
    /// Returns the error that triggered rollback, after every completed step
    /// has been compensated.
    pub async fn run(&self) -> Result<C, SagaError<E>>
    where
        C: Default,
    {
        self.run_from(C::default()).await
    }

    /// Run the saga from an explicit initial context.
    ///
    /// # Errors
    ///
    /// Returns the error that triggered rollback, after every completed step
    /// has been compensated.
    pub async fn run_from(&self, initial: C) -> Result<C, SagaError<E>> {
        let (result, _audit_log) = self.run_with_audit(initial).await;
        result
    }

    /// Run the saga and return both the result and an audit log.
    ///
    /// The audit log tracks attempts, failures and compensations per step.
    pub async fn run_with_audit(&self, initial: C) -> (Result<C, SagaError<E>>, SagaAuditLog) {
        let span = tracing::info_span!(
            "saga",
            name = self.config.name().unwrap_or("saga"),
            steps = self.steps.len()
        );
        self.execute_internal(initial).instrument(span).await
    }

    async fn execute_internal(&self, initial: C) -> (Result<C, SagaError<E>>, SagaAuditLog) {
        let mut audit_log = SagaAuditLog::new();
        let mut history: Vec<(usize, ExecutionRecord<C>)> = Vec::new();
        let mut context = initial;

        self.report_duplicate_names();

        for (index, definition) in self.steps.iter().enumerate() {
            let name = definition.name();
            let audit_index = audit_log.record_start(name);

            match self.execute_step(index, definition, &context, &mut audit_log).await {
                Ok(output) => {
                    let description = definition
                        .has_compensation()
                        .then(|| definition.step().compensation_description());
                    audit_log.record_success(description);
                    let input_context = std::mem::replace(&mut context, output);
                    history.push((audit_index, ExecutionRecord::new(name, input_context)));
                }
                Err(error) => {
                    audit_log.record_failure();
                    let error = self.rollback(&mut audit_log, history, error).await;
                    return (Err(error), audit_log);
                }
            }
        }

        self.emit(SagaEvent::Completed {
            steps: self.steps.len(),
        });
        (Ok(context), audit_log)
    }

    async fn execute_step(
        &self,
        index: usize,
        definition: &StepDefinition<C, E>,
        context: &C,
        audit_log: &mut SagaAuditLog,
    ) -> Result<C, SagaError<E>> {
        let step = definition.step();
        let name = step.name();

        self.emit(SagaEvent::StepStarted {
            step: name.to_string(),
            index,
        });
        if let Some(on_start) = &self.observers.on_start {
            on_start(name, context).map_err(|source| observer_failed(name, Hook::OnStart, source))?;
        }

        let policy = self.retry_policy_for(definition);
        let mut attempt = 0;
        loop {
            attempt += 1;
            audit_log.record_attempt();

            match step.execute(context.clone()).await {
                Ok(output) => {
                    self.emit(SagaEvent::StepSucceeded {
                        step: name.to_string(),
                        attempt,
                    });
                    if let Some(on_success) = &self.observers.on_success {
                        on_success(name, context, &output)
                            .map_err(|source| observer_failed(name, Hook::OnSuccess, source))?;
                    }
                    return Ok(output);
                }
                Err(error) if attempt < policy.max_attempts() => {
                    self.emit(SagaEvent::StepRetrying {
                        step: name.to_string(),
                        attempt,
                        remaining: policy.max_attempts() - attempt,
                        delay_ms: delay_millis(policy.delay()),
                        error: error.to_string(),
                    });
                    if let Some(delay) = policy.delay() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error) => {
                    self.emit(SagaEvent::StepFailed {
                        step: name.to_string(),
                        attempts: attempt,
                        error: error.to_string(),
                    });
                    if let Some(on_error) = &self.observers.on_error {
                        on_error(name, context, &error)
                            .map_err(|source| observer_failed(name, Hook::OnError, source))?;
                    }
                    return Err(SagaError::StepFailed {
                        step: name.to_string(),
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }

    async fn rollback(
        &self,
        audit_log: &mut SagaAuditLog,
        history: Vec<(usize, ExecutionRecord<C>)>,
        error: SagaError<E>,
    ) -> SagaError<E> {
        let trigger = error.inner();
        self.emit(SagaEvent::RollbackStarted {
            failed_step: error.step().to_string(),
            completed_steps: history.len(),
            error: trigger.to_string(),
        });

        for (audit_index, record) in history.into_iter().rev() {
            let step_name = record.step_name().to_string();

            let definition = self
                .find_step(&step_name)
                .filter(|definition| definition.has_compensation());
            if let Some(definition) = definition {
                let result = definition
                    .step()
                    .compensate(record.input_context().clone(), trigger)
                    .await;
                self.record_compensation(
                    audit_log,
                    audit_index,
                    &step_name,
                    CompensationScope::Step,
                    result,
                );
            }

            if let Some(global) = &self.observers.global_compensation {
                let result = global(record.into_input_context(), trigger).await;
                self.record_compensation(
                    audit_log,
                    audit_index,
                    &step_name,
                    CompensationScope::Global,
                    result,
                );
            }
        }

        self.emit(SagaEvent::RollbackFinished {
            failed_step: error.step().to_string(),
            error: trigger.to_string(),
        });
        error
    }

    fn record_compensation(
        &self,
        audit_log: &mut SagaAuditLog,
        audit_index: usize,
        step_name: &str,
        scope: CompensationScope,
        result: Result<(), E>,
    ) {
        match result {
            Ok(()) => {
                audit_log.record_compensation(audit_index, scope, CompensationOutcome::Succeeded);
                self.emit(SagaEvent::CompensationSucceeded {
                    step: step_name.to_string(),
                    scope,
                });
            }
            Err(error) => {
                audit_log.record_compensation(audit_index, scope, CompensationOutcome::Failed);
                self.emit(SagaEvent::CompensationFailed {
                    step: step_name.to_string(),
                    scope,
                    error: error.to_string(),
                });
            }
        }
    }

    /// First step registered under `name`.
    fn find_step(&self, name: &str) -> Option<&StepDefinition<C, E>> {
        self.steps.iter().find(|definition| definition.name() == name)
    }

    fn retry_policy_for(&self, definition: &StepDefinition<C, E>) -> RetryPolicy {
        definition
            .retry_policy()
            .or_else(|| self.config.retry_for(definition.name()))
            .unwrap_or_default()
    }

    fn report_duplicate_names(&self) {
        let mut seen = HashSet::new();
        for definition in &self.steps {
            if !seen.insert(definition.name()) {
                self.emit(SagaEvent::DuplicateStepName {
                    step: definition.name().to_string(),
                });
            }
        }
    }

    fn emit(&self, event: SagaEvent) {
        emit(self.logger.as_ref(), event);
    }
}

fn observer_failed<E>(step: &str, hook: Hook, source: E) -> SagaError<E> {
    SagaError::ObserverFailed {
        step: step.to_string(),
        hook,
        source,
    }
}

impl<C, E> fmt::Debug for Orchestrator<C, E>
where
    C: Clone + Send + Sync + 'static,
    E: Display + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("steps", &self.steps)
            .field("observers", &self.observers)
            .field("logger", &self.logger.is_some())
            .field("config", &self.config)
            .finish()
    }
}
