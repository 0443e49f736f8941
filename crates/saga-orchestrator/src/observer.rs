use std::fmt;
use std::future::Future;

use crate::erased::{CompensationFn, erase_compensation};

type StartHook<C, E> = Box<dyn Fn(&str, &C) -> Result<(), E> + Send + Sync>;
type SuccessHook<C, E> = Box<dyn Fn(&str, &C, &C) -> Result<(), E> + Send + Sync>;
type ErrorHook<C, E> = Box<dyn Fn(&str, &C, &E) -> Result<(), E> + Send + Sync>;

/// Lifecycle observers and the global compensation of an orchestrator.
///
/// Every hook is optional. An observer returning an error aborts the run and
/// triggers rollback with that error.
pub struct Observers<C, E> {
    pub(crate) on_start: Option<StartHook<C, E>>,
    pub(crate) on_success: Option<SuccessHook<C, E>>,
    pub(crate) on_error: Option<ErrorHook<C, E>>,
    pub(crate) global_compensation: Option<CompensationFn<C, E>>,
}

impl<C, E> Default for Observers<C, E> {
    fn default() -> Self {
        Self {
            on_start: None,
            on_success: None,
            on_error: None,
            global_compensation: None,
        }
    }
}

impl<C, E> Observers<C, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the step name and its input before every step.
    #[must_use]
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &C) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Called with the step name, its input and its output after a step succeeds.
    #[must_use]
    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &C, &C) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Called with the step name, its input and the last error once a step
    /// has exhausted its retries.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &C, &E) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Compensation run for every completed step during rollback, after the
    /// step's own compensation.
    #[must_use]
    pub fn global_compensation<F, Fut>(mut self, compensation: F) -> Self
    where
        C: 'static,
        E: 'static,
        F: Fn(C, &E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.global_compensation = Some(erase_compensation(compensation));
        self
    }
}

impl<C, E> fmt::Debug for Observers<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("on_start", &self.on_start.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("global_compensation", &self.global_compensation.is_some())
            .finish()
    }
}
