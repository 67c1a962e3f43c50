//! Feature contract: the unit of injected business logic the engine drives.

use async_trait::async_trait;
use std::fmt;

use crate::context::OrchestrationContext;

/// Closed failure taxonomy shared by every layer of the engine.
///
/// Features map their domain errors onto this enum at the boundary; steps and
/// the orchestrator pass reasons through unchanged. The orchestrator itself
/// only ever produces `Cancelled`, `UnhandledException`, and
/// `InvalidConfiguration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    Busy,
    Timeout,
    Unknown,
    Rejected,
    Cancelled,
    InvalidState,
    TransportError,
    UnhandledException,
    InvalidConfiguration,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Busy => "busy",
            FailureReason::Timeout => "timeout",
            FailureReason::Unknown => "unknown",
            FailureReason::Rejected => "rejected",
            FailureReason::Cancelled => "cancelled",
            FailureReason::InvalidState => "invalid_state",
            FailureReason::TransportError => "transport_error",
            FailureReason::UnhandledException => "unhandled_exception",
            FailureReason::InvalidConfiguration => "invalid_configuration",
        };
        f.write_str(s)
    }
}

/// Outcome of one feature invocation: a success value or a tagged failure.
///
/// This is the contract every unit of injected business logic returns. The
/// semantic constructors (`busy()`, `timeout()`, ...) cover the full
/// [`FailureReason`] taxonomy so features never have to spell out the enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureResult<T> {
    Success(T),
    Failure(FailureReason),
}

impl<T> FeatureResult<T> {
    pub fn success(value: T) -> Self {
        FeatureResult::Success(value)
    }

    pub fn failure(reason: FailureReason) -> Self {
        FeatureResult::Failure(reason)
    }

    pub fn busy() -> Self {
        Self::failure(FailureReason::Busy)
    }

    pub fn timeout() -> Self {
        Self::failure(FailureReason::Timeout)
    }

    pub fn unknown() -> Self {
        Self::failure(FailureReason::Unknown)
    }

    pub fn rejected() -> Self {
        Self::failure(FailureReason::Rejected)
    }

    pub fn cancelled() -> Self {
        Self::failure(FailureReason::Cancelled)
    }

    pub fn invalid_state() -> Self {
        Self::failure(FailureReason::InvalidState)
    }

    pub fn transport_error() -> Self {
        Self::failure(FailureReason::TransportError)
    }

    pub fn unhandled_exception() -> Self {
        Self::failure(FailureReason::UnhandledException)
    }

    pub fn invalid_configuration() -> Self {
        Self::failure(FailureReason::InvalidConfiguration)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FeatureResult::Success(_))
    }

    /// Failure reason, or `None` on success.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            FeatureResult::Success(_) => None,
            FeatureResult::Failure(reason) => Some(*reason),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            FeatureResult::Success(value) => Some(value),
            FeatureResult::Failure(_) => None,
        }
    }
}

/// An asynchronous business operation invoked by a feature step.
///
/// Features never raise domain errors through panics or `Err` channels; they
/// report them as a [`FeatureResult::Failure`] with a reason from the closed
/// taxonomy. Features that need no input use `Input = ()`.
#[async_trait]
pub trait Feature: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    async fn execute(
        &self,
        input: Self::Input,
        ctx: &OrchestrationContext,
    ) -> FeatureResult<Self::Output>;
}

/// Function wrapper that implements [`Feature`].
pub struct FnFeature<F, I, O> {
    f: F,
    _types: std::marker::PhantomData<fn(I) -> O>,
}

impl<F, I, O> FnFeature<F, I, O> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _types: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, I, O> Feature for FnFeature<F, I, O>
where
    F: Fn(OrchestrationContext, I) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = FeatureResult<O>> + Send,
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    async fn execute(&self, input: I, ctx: &OrchestrationContext) -> FeatureResult<O> {
        (self.f)(ctx.clone(), input).await
    }
}
