/// A successfully completed step and the context it received.
///
/// Recorded only after the step succeeds; consumed in reverse order during
/// rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord<C> {
    step_name: String,
    input_context: C,
}

impl<C> ExecutionRecord<C> {
    pub(crate) fn new(step_name: impl Into<String>, input_context: C) -> Self {
        Self {
            step_name: step_name.into(),
            input_context,
        }
    }

    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// The context as it was before the step ran.
    #[must_use]
    pub fn input_context(&self) -> &C {
        &self.input_context
    }

    pub(crate) fn into_input_context(self) -> C {
        self.input_context
    }
}
