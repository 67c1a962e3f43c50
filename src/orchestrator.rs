//! The execution engine: drives an ordered step list over a fresh state bag.

use std::panic::{catch_unwind, AssertUnwindSafe};

use futures::FutureExt;

use crate::context::OrchestrationContext;
use crate::feature::FailureReason;
use crate::parallel::{ParallelStep, ParallelStepBuilder};
use crate::state::{StateBag, StateError};
use crate::step::{OrchestrationStep, StepResult};
use crate::tracer::StepGuard;

/// Final outcome of one orchestration run.
///
/// Failures carry only a reason tag; no business value survives a failed
/// run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationResult<T> {
    Success(T),
    Failure(FailureReason),
}

impl<T> OrchestrationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, OrchestrationResult::Success(_))
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            OrchestrationResult::Success(value) => Some(value),
            OrchestrationResult::Failure(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            OrchestrationResult::Success(_) => None,
            OrchestrationResult::Failure(reason) => Some(*reason),
        }
    }
}

type Finalizer<T> = Box<dyn Fn(&StateBag) -> Result<T, StateError> + Send + Sync>;

/// Ordered step list plus the finalizer that projects final state into the
/// run's result type.
///
/// Steps execute strictly in registration order over a state bag created
/// fresh for each run. The first `Fail` short-circuits the run; remaining
/// steps and the finalizer never execute. A run without a finalizer fails
/// with `InvalidConfiguration`.
pub struct Orchestrator<T> {
    steps: Vec<Box<dyn OrchestrationStep>>,
    finalizer: Option<Finalizer<T>>,
}

impl<T> Orchestrator<T> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            finalizer: None,
        }
    }

    pub fn add_step(mut self, step: impl OrchestrationStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a parallel group assembled through a [`ParallelStepBuilder`].
    pub fn add_parallel(self, build: impl FnOnce(ParallelStepBuilder) -> ParallelStepBuilder) -> Self {
        let group: ParallelStep = build(ParallelStepBuilder::new()).build();
        self.add_step(group)
    }

    /// Set the finalizer projecting final state into the result value.
    pub fn ends_with(
        mut self,
        finalizer: impl Fn(&StateBag) -> Result<T, StateError> + Send + Sync + 'static,
    ) -> Self {
        self.finalizer = Some(Box::new(finalizer));
        self
    }

    /// Run every step in order over a fresh state bag.
    ///
    /// Outcome per step: an observed cancellation fails the run with
    /// `Cancelled`; a panic is contained and fails the run with
    /// `UnhandledException`; a `Fail(reason)` fails the run with that
    /// reason. When all steps continue, the finalizer produces the success
    /// value; a panicking or erroring finalizer fails the run with
    /// `UnhandledException`. The state bag is discarded either way.
    pub async fn execute(&self, ctx: &OrchestrationContext) -> OrchestrationResult<T> {
        let state = StateBag::new();

        for step in &self.steps {
            if ctx.is_cancelled() {
                return OrchestrationResult::Failure(FailureReason::Cancelled);
            }

            let _guard = self.start_step(ctx, step.name());
            let outcome = AssertUnwindSafe(step.execute(ctx, &state))
                .catch_unwind()
                .await;

            match outcome {
                Ok(StepResult::Continue) => {}
                Ok(StepResult::Fail(reason)) => return OrchestrationResult::Failure(reason),
                Err(_) => {
                    ctx.trace_error(step.name(), "step panicked");
                    return OrchestrationResult::Failure(FailureReason::UnhandledException);
                }
            }
        }

        let Some(finalizer) = &self.finalizer else {
            return OrchestrationResult::Failure(FailureReason::InvalidConfiguration);
        };

        match catch_unwind(AssertUnwindSafe(|| finalizer(&state))) {
            Ok(Ok(value)) => OrchestrationResult::Success(value),
            Ok(Err(err)) => {
                ctx.trace_error("finalizer", &err.to_string());
                OrchestrationResult::Failure(FailureReason::UnhandledException)
            }
            Err(_) => {
                ctx.trace_error("finalizer", "finalizer panicked");
                OrchestrationResult::Failure(FailureReason::UnhandledException)
            }
        }
    }

    fn start_step(&self, ctx: &OrchestrationContext, step_name: &str) -> StepGuard {
        match ctx.tracer() {
            Some(tracer) => tracer.start_step(step_name, ctx.orchestration_id()),
            None => StepGuard::noop(),
        }
    }
}

impl<T> Default for Orchestrator<T> {
    fn default() -> Self {
        Self::new()
    }
}
