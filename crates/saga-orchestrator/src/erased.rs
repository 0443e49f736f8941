use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::step::SagaStep;

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub(crate) type ActionFn<C, E> = Box<dyn Fn(C) -> BoxFuture<Result<C, E>> + Send + Sync>;

pub(crate) type CompensationFn<C, E> =
    Box<dyn Fn(C, &E) -> BoxFuture<Result<(), E>> + Send + Sync>;

pub(crate) fn erase_action<C, E, F, Fut>(action: F) -> ActionFn<C, E>
where
    C: 'static,
    E: 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send + 'static,
{
    Box::new(move |ctx: C| -> BoxFuture<Result<C, E>> { Box::pin(action(ctx)) })
}

pub(crate) fn erase_compensation<C, E, F, Fut>(compensation: F) -> CompensationFn<C, E>
where
    C: 'static,
    E: 'static,
    F: Fn(C, &E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    Box::new(move |ctx: C, error: &E| -> BoxFuture<Result<(), E>> {
        Box::pin(compensation(ctx, error))
    })
}

/// A step assembled from closures.
pub(crate) struct FnStep<C, E> {
    name: String,
    action: ActionFn<C, E>,
    compensation: Option<CompensationFn<C, E>>,
}

impl<C, E> FnStep<C, E> {
    pub(crate) fn new(name: String, action: ActionFn<C, E>) -> Self {
        Self {
            name,
            action,
            compensation: None,
        }
    }

    pub(crate) fn set_compensation(&mut self, compensation: CompensationFn<C, E>) {
        self.compensation = Some(compensation);
    }
}

#[async_trait]
impl<C, E> SagaStep<C, E> for FnStep<C, E>
where
    C: Send + 'static,
    E: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: C) -> Result<C, E> {
        (self.action)(ctx).await
    }

    fn has_compensation(&self) -> bool {
        self.compensation.is_some()
    }

    async fn compensate(&self, ctx: C, error: &E) -> Result<(), E> {
        match &self.compensation {
            Some(compensation) => compensation(ctx, error).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestError(String);

    fn doubling_step() -> FnStep<i32, TestError> {
        FnStep::new(
            "double".to_string(),
            erase_action(|input: i32| async move { Ok(input * 2) }),
        )
    }

    #[test]
    fn fn_step_reports_name() {
        assert_eq!(doubling_step().name(), "double");
    }

    #[tokio::test]
    async fn fn_step_executes_action() {
        let result = doubling_step().execute(21).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn fn_step_propagates_action_errors() {
        let step: FnStep<i32, TestError> = FnStep::new(
            "failing".to_string(),
            erase_action(|input: i32| async move { Err(TestError(format!("bad {input}"))) }),
        );

        let result = step.execute(7).await;

        assert_eq!(result, Err(TestError("bad 7".to_string())));
    }

    #[tokio::test]
    async fn fn_step_without_compensation_is_a_no_op() {
        let step = doubling_step();

        assert!(!step.has_compensation());
        let result = step.compensate(1, &TestError("trigger".to_string())).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn fn_step_compensation_receives_context_and_error() {
        let mut step = doubling_step();
        step.set_compensation(erase_compensation(|ctx: i32, error: &TestError| {
            let message = format!("{ctx}:{}", error.0);
            async move { Err(TestError(message)) }
        }));

        assert!(step.has_compensation());
        let result = step.compensate(5, &TestError("trigger".to_string())).await;
        assert_eq!(result, Err(TestError("5:trigger".to_string())));
    }
}
