//! Parallel step composition: fan out a fixed set of sub-steps, join, and
//! report the first failure in registration order.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;

use crate::context::OrchestrationContext;
use crate::feature::{FailureReason, Feature};
use crate::state::{StateBag, StateError};
use crate::step::{FeatureStep, OrchestrationStep, StepResult};

/// Accumulates a fixed, ordered set of steps to run concurrently.
#[derive(Default)]
pub struct ParallelStepBuilder {
    steps: Vec<Box<dyn OrchestrationStep>>,
}

impl ParallelStepBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(mut self, step: impl OrchestrationStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Shorthand for a feature sub-step with a state-derived input and a
    /// success handler.
    pub fn add_feature<F: Feature + 'static>(
        self,
        feature: F,
        input: impl Fn(&StateBag) -> Result<F::Input, StateError> + Send + Sync + 'static,
        on_success: impl Fn(&StateBag, F::Output) -> Result<(), StateError> + Send + Sync + 'static,
    ) -> Self {
        self.add_step(FeatureStep::new(feature, input).with_output(on_success))
    }

    pub fn build(self) -> ParallelStep {
        ParallelStep { steps: self.steps }
    }
}

/// Runs its sub-steps concurrently against the same state bag and context.
///
/// All sub-steps run to completion; a failing sibling does not cancel the
/// others. The result scan walks registration order, so when several
/// sub-steps fail the first-registered failure is the one reported. Sibling
/// sub-steps share one state bag with no cross-operation exclusion: branches
/// must write to disjoint keys.
pub struct ParallelStep {
    steps: Vec<Box<dyn OrchestrationStep>>,
}

impl ParallelStep {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl OrchestrationStep for ParallelStep {
    fn name(&self) -> &'static str {
        "parallel"
    }

    async fn execute(&self, ctx: &OrchestrationContext, state: &StateBag) -> StepResult {
        let outcomes = join_all(self.steps.iter().map(|step| {
            let name = step.name();
            async move {
                let outcome = AssertUnwindSafe(step.execute(ctx, state))
                    .catch_unwind()
                    .await;
                (name, outcome)
            }
        }))
        .await;

        for (name, outcome) in outcomes {
            match outcome {
                Ok(StepResult::Continue) => {}
                Ok(fail @ StepResult::Fail(_)) => return fail,
                Err(_) => {
                    ctx.trace_error(name, "sub-step panicked");
                    return StepResult::Fail(FailureReason::UnhandledException);
                }
            }
        }
        StepResult::Continue
    }
}
