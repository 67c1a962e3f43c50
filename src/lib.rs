//! Lightweight in-process orchestration engine.
//!
//! `baton` executes a named sequence of asynchronous steps against a shared
//! state bag, short-circuits on the first failure, and supports one level of
//! parallel fan-out. It provides:
//!
//! - An [`Orchestrator`] driving boxed [`OrchestrationStep`]s over a
//!   per-run [`StateBag`], finished by a finalizer that projects final
//!   state into the run's result type
//! - A [`Feature`] contract for injected business logic returning
//!   [`FeatureResult`] over the closed [`FailureReason`] taxonomy
//! - A [`RetriableFeature`] wrapper with bounded retries and fixed delay
//! - A [`ResponseRegistry`] matching out-of-band responses to suspended
//!   waiters by correlation id, with timeout and cancellation
//! - An [`ExecutionTracer`] seam for step timing, retry, and error events,
//!   with a `tracing`-backed implementation
//!
//! Cancellation flows from the [`OrchestrationContext`]'s
//! `CancellationToken` through every step, feature call, retry delay, and
//! response wait.

pub mod context;
pub mod correlation;
pub mod feature;
pub mod orchestrator;
pub mod parallel;
pub mod retry;
pub mod state;
pub mod step;
pub mod tracer;

pub use context::OrchestrationContext;
pub use correlation::{
    CorrelatedResponse, ResponseAwaiter, ResponseCompleter, ResponseHandler, ResponseRegistry,
    WaitError,
};
pub use feature::{FailureReason, Feature, FeatureResult, FnFeature};
pub use orchestrator::{OrchestrationResult, Orchestrator};
pub use parallel::{ParallelStep, ParallelStepBuilder};
pub use retry::{Retriable, RetriableFeature, RetryPolicy};
pub use state::{StateBag, StateError};
pub use step::{steps, FeatureStep, OrchestrationStep, StepResult};
pub use tracer::{ExecutionTracer, StepGuard, TracingExecutionTracer};

pub use tokio_util::sync::CancellationToken;
