//! Step abstraction: the unit the orchestrator sequences.

use async_trait::async_trait;

use crate::context::OrchestrationContext;
use crate::feature::{FailureReason, Feature, FeatureResult};
use crate::state::{StateBag, StateError};

/// Outcome of one step: proceed, or stop the run with a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Fail(FailureReason),
}

impl StepResult {
    pub fn is_continue(&self) -> bool {
        matches!(self, StepResult::Continue)
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            StepResult::Continue => None,
            StepResult::Fail(reason) => Some(*reason),
        }
    }
}

/// A unit of work executed by the orchestrator. May wrap a single feature or
/// a parallel group; parallel groups are themselves steps, so nesting needs
/// no special handling in the execution loop.
#[async_trait]
pub trait OrchestrationStep: Send + Sync {
    /// Label used for tracing; defaults to the implementing type's name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn execute(&self, ctx: &OrchestrationContext, state: &StateBag) -> StepResult;
}

type InputFactory<I> = Box<dyn Fn(&StateBag) -> Result<I, StateError> + Send + Sync>;
type OutputHandler<O> = Box<dyn Fn(&StateBag, O) -> Result<(), StateError> + Send + Sync>;

/// Step that derives its input from state, invokes one feature, and stores
/// the output back through an optional handler.
///
/// A feature failure maps straight into [`StepResult::Fail`] with the
/// feature's reason. A [`StateError`] raised by the input factory or output
/// handler is a wiring bug, not a business outcome: it is traced and
/// surfaces as `Fail(UnhandledException)`.
pub struct FeatureStep<F: Feature> {
    feature: F,
    input: InputFactory<F::Input>,
    output: Option<OutputHandler<F::Output>>,
}

impl<F: Feature> FeatureStep<F> {
    pub fn new(
        feature: F,
        input: impl Fn(&StateBag) -> Result<F::Input, StateError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            feature,
            input: Box::new(input),
            output: None,
        }
    }

    /// Store the feature's output into state after a successful invocation.
    pub fn with_output(
        mut self,
        handler: impl Fn(&StateBag, F::Output) -> Result<(), StateError> + Send + Sync + 'static,
    ) -> Self {
        self.output = Some(Box::new(handler));
        self
    }
}

#[async_trait]
impl<F: Feature> OrchestrationStep for FeatureStep<F> {
    fn name(&self) -> &'static str {
        std::any::type_name::<F>()
    }

    async fn execute(&self, ctx: &OrchestrationContext, state: &StateBag) -> StepResult {
        let input = match (self.input)(state) {
            Ok(input) => input,
            Err(err) => {
                ctx.trace_error(self.name(), &err.to_string());
                return StepResult::Fail(FailureReason::UnhandledException);
            }
        };

        let result = self.feature.execute(input, ctx).await;

        let value = match result {
            FeatureResult::Success(value) => value,
            FeatureResult::Failure(reason) => return StepResult::Fail(reason),
        };

        if let Some(output) = &self.output {
            if let Err(err) = output(state, value) {
                ctx.trace_error(self.name(), &err.to_string());
                return StepResult::Fail(FailureReason::UnhandledException);
            }
        }

        StepResult::Continue
    }
}

/// Factory functions for the common feature-step shapes.
pub mod steps {
    use super::*;

    /// Step whose input is computed from the current state.
    pub fn from_state<F: Feature>(
        feature: F,
        input: impl Fn(&StateBag) -> Result<F::Input, StateError> + Send + Sync + 'static,
    ) -> FeatureStep<F> {
        FeatureStep::new(feature, input)
    }

    /// Step with a fixed input supplied at build time.
    pub fn with_input<F>(feature: F, input: F::Input) -> FeatureStep<F>
    where
        F: Feature,
        F::Input: Clone + Sync,
    {
        FeatureStep::new(feature, move |_| Ok(input.clone()))
    }

    /// Step for a feature that takes no input.
    pub fn no_input<F>(feature: F) -> FeatureStep<F>
    where
        F: Feature<Input = ()>,
    {
        FeatureStep::new(feature, |_| Ok(()))
    }
}
