use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use baton::{
    FailureReason, FeatureResult, FnFeature, OrchestrationContext, OrchestrationResult,
    OrchestrationStep, Orchestrator, ParallelStepBuilder, StateBag, StepResult,
};

/// Sub-step that sleeps, bumps a completion counter, and reports a fixed
/// outcome. The sleep lets tests invert completion order relative to
/// registration order.
struct SlowStep {
    delay: Duration,
    result: StepResult,
    completed: Arc<AtomicU32>,
}

#[async_trait]
impl OrchestrationStep for SlowStep {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn execute(&self, _ctx: &OrchestrationContext, _state: &StateBag) -> StepResult {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

struct PanickingStep;

#[async_trait]
impl OrchestrationStep for PanickingStep {
    async fn execute(&self, _ctx: &OrchestrationContext, _state: &StateBag) -> StepResult {
        panic!("parallel boom");
    }
}

fn slow(delay_ms: u64, result: StepResult, completed: &Arc<AtomicU32>) -> SlowStep {
    SlowStep {
        delay: Duration::from_millis(delay_ms),
        result,
        completed: completed.clone(),
    }
}

#[tokio::test]
async fn all_sub_steps_continue_yields_continue() {
    let completed = Arc::new(AtomicU32::new(0));
    let group = ParallelStepBuilder::new()
        .add_step(slow(5, StepResult::Continue, &completed))
        .add_step(slow(1, StepResult::Continue, &completed))
        .add_step(slow(3, StepResult::Continue, &completed))
        .build();

    let ctx = OrchestrationContext::new();
    let state = StateBag::new();
    assert_eq!(group.execute(&ctx, &state).await, StepResult::Continue);
    assert_eq!(completed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn single_failure_wins_regardless_of_completion_order() {
    // The failing sub-step finishes last; its reason must still be reported.
    let completed = Arc::new(AtomicU32::new(0));
    let group = ParallelStepBuilder::new()
        .add_step(slow(1, StepResult::Continue, &completed))
        .add_step(slow(30, StepResult::Fail(FailureReason::Rejected), &completed))
        .add_step(slow(1, StepResult::Continue, &completed))
        .build();

    let ctx = OrchestrationContext::new();
    let state = StateBag::new();
    assert_eq!(
        group.execute(&ctx, &state).await,
        StepResult::Fail(FailureReason::Rejected)
    );
}

#[tokio::test]
async fn first_registered_failure_wins_when_several_fail() {
    // Registration order decides, not completion order: the Busy step is
    // registered first but completes last.
    let completed = Arc::new(AtomicU32::new(0));
    let group = ParallelStepBuilder::new()
        .add_step(slow(30, StepResult::Fail(FailureReason::Busy), &completed))
        .add_step(slow(1, StepResult::Fail(FailureReason::Timeout), &completed))
        .build();

    let ctx = OrchestrationContext::new();
    let state = StateBag::new();
    assert_eq!(
        group.execute(&ctx, &state).await,
        StepResult::Fail(FailureReason::Busy)
    );
}

#[tokio::test]
async fn failing_sibling_does_not_cancel_the_others() {
    let completed = Arc::new(AtomicU32::new(0));
    let group = ParallelStepBuilder::new()
        .add_step(slow(1, StepResult::Fail(FailureReason::Busy), &completed))
        .add_step(slow(20, StepResult::Continue, &completed))
        .add_step(slow(40, StepResult::Continue, &completed))
        .build();

    let ctx = OrchestrationContext::new();
    let state = StateBag::new();
    assert_eq!(
        group.execute(&ctx, &state).await,
        StepResult::Fail(FailureReason::Busy)
    );
    // All sub-steps ran to completion despite the early failure.
    assert_eq!(completed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn panicking_sub_step_reports_unhandled_exception() {
    let completed = Arc::new(AtomicU32::new(0));
    let group = ParallelStepBuilder::new()
        .add_step(PanickingStep)
        .add_step(slow(5, StepResult::Continue, &completed))
        .build();

    let ctx = OrchestrationContext::new();
    let state = StateBag::new();
    assert_eq!(
        group.execute(&ctx, &state).await,
        StepResult::Fail(FailureReason::UnhandledException)
    );
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn branches_write_disjoint_keys_into_the_shared_bag() {
    let fetch_left = FnFeature::new(|_ctx: OrchestrationContext, _: ()| async {
        FeatureResult::success(2i64)
    });
    let fetch_right = FnFeature::new(|_ctx: OrchestrationContext, _: ()| async {
        FeatureResult::success(40i64)
    });

    let orchestrator = Orchestrator::new()
        .add_parallel(|builder| {
            builder
                .add_feature(fetch_left, |_| Ok(()), |state, n| state.set("left", n))
                .add_feature(fetch_right, |_| Ok(()), |state, n| state.set("right", n))
        })
        .ends_with(|state| Ok(state.get::<i64>("left")? + state.get::<i64>("right")?));

    let ctx = OrchestrationContext::new();
    assert_eq!(
        orchestrator.execute(&ctx).await,
        OrchestrationResult::Success(42)
    );
}

#[tokio::test]
async fn parallel_groups_nest() {
    let completed = Arc::new(AtomicU32::new(0));
    let inner = ParallelStepBuilder::new()
        .add_step(slow(1, StepResult::Continue, &completed))
        .add_step(slow(2, StepResult::Continue, &completed))
        .build();
    let outer = ParallelStepBuilder::new()
        .add_step(inner)
        .add_step(slow(1, StepResult::Continue, &completed))
        .build();

    let ctx = OrchestrationContext::new();
    let state = StateBag::new();
    assert_eq!(outer.execute(&ctx, &state).await, StepResult::Continue);
    assert_eq!(completed.load(Ordering::SeqCst), 3);
}
