//! Bounded retry with fixed delay for features whose transport can hiccup.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::OrchestrationContext;
use crate::feature::{Feature, FeatureResult};

/// Retry policy: bounded attempts with a fixed inter-attempt delay.
///
/// `max_retries` excludes the first attempt, so a policy of 3 permits four
/// invocations in total. Both fields are non-negative by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// No retries: the first failure is final.
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    /// 3 retries, 100 ms apart.
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// A unit of work whose unexpected errors are worth retrying.
///
/// `execute_core` separates the two failure channels: a logical
/// [`FeatureResult::Failure`] is a terminal business outcome and is returned
/// unchanged, while an `Err` models an unexpected fault (connection reset,
/// broker hiccup) and is retried under the policy. Transient-looking logical
/// reasons such as `Busy` are deliberately not retried.
#[async_trait]
pub trait RetriableFeature: Send + Sync {
    type Input: Clone + Send + Sync + 'static;
    type Output: Send + 'static;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    async fn execute_core(
        &self,
        input: Self::Input,
        ctx: &OrchestrationContext,
    ) -> Result<FeatureResult<Self::Output>, String>;
}

/// Decorator turning a [`RetriableFeature`] into a [`Feature`] by driving
/// the retry loop around `execute_core`.
///
/// Attempts are numbered from 1 and announced through the tracer. An `Err`
/// from the wrapped work is retried while `attempt <= max_retries`, after
/// the fixed delay; the delay races the run's cancellation token and a
/// cancel wins, surfacing as `FeatureResult::cancelled()`. Once the retries
/// are used up the last error is recorded and the feature reports
/// `unhandled_exception`, failing the run the same way an uncaught fault
/// would.
pub struct Retriable<R> {
    inner: R,
}

impl<R: RetriableFeature> Retriable<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RetriableFeature> Feature for Retriable<R> {
    type Input = R::Input;
    type Output = R::Output;

    async fn execute(
        &self,
        input: Self::Input,
        ctx: &OrchestrationContext,
    ) -> FeatureResult<Self::Output> {
        let policy = self.inner.retry_policy();
        let name = std::any::type_name::<R>();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            ctx.trace_info(name, &format!("attempt {attempt}"));

            let err = match self.inner.execute_core(input.clone(), ctx).await {
                Ok(result) => return result,
                Err(err) => err,
            };

            if attempt > policy.max_retries() {
                if let Some(tracer) = ctx.tracer() {
                    tracer.record_error(name, &err);
                }
                return FeatureResult::unhandled_exception();
            }

            if let Some(tracer) = ctx.tracer() {
                tracer.record_retry(name, attempt, &err);
            }

            tokio::select! {
                _ = tokio::time::sleep(policy.delay()) => {}
                _ = ctx.cancellation().cancelled() => return FeatureResult::cancelled(),
            }
        }
    }
}
