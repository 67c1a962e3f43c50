//! Execution tracing: the engine's only logging surface.
//!
//! The engine never logs directly; it reports step timing, retries, and
//! errors through [`ExecutionTracer`]. [`TracingExecutionTracer`] is the
//! stock implementation backed by the `tracing` crate.

use std::time::Instant;

use tracing::{error, info, warn};

/// Scoped handle returned by [`ExecutionTracer::start_step`]; runs its
/// closure when dropped, marking the end of the step.
pub struct StepGuard {
    on_end: Option<Box<dyn FnOnce() + Send>>,
}

impl StepGuard {
    pub fn new(on_end: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_end: Some(Box::new(on_end)),
        }
    }

    /// Guard that does nothing on drop.
    pub fn noop() -> Self {
        Self { on_end: None }
    }
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        if let Some(on_end) = self.on_end.take() {
            on_end();
        }
    }
}

/// Collaborator interface for step timing, retry, and error events.
///
/// `start_step` brackets a step: the returned guard fires the matching end
/// event when dropped. The three `trace_*` calls are leveled breadcrumbs
/// carrying the orchestration id and step name.
pub trait ExecutionTracer: Send + Sync {
    fn start_step(&self, step_name: &str, correlation_id: &str) -> StepGuard;

    fn record_retry(&self, step_name: &str, attempt: u32, reason: &str);

    fn record_error(&self, step_name: &str, error: &str);

    fn trace_info(&self, correlation_id: &str, step_name: &str, message: &str);

    fn trace_warning(&self, correlation_id: &str, step_name: &str, message: &str);

    fn trace_error(&self, correlation_id: &str, step_name: &str, error: &str);
}

/// [`ExecutionTracer`] that emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExecutionTracer;

impl ExecutionTracer for TracingExecutionTracer {
    fn start_step(&self, step_name: &str, correlation_id: &str) -> StepGuard {
        let started = Instant::now();
        let step = step_name.to_string();
        let correlation = correlation_id.to_string();
        info!(step = %step, correlation_id = %correlation, "step start");
        StepGuard::new(move || {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            info!(step = %step, correlation_id = %correlation, elapsed_ms, "step end");
        })
    }

    fn record_retry(&self, step_name: &str, attempt: u32, reason: &str) {
        warn!(step = %step_name, attempt, reason = %reason, "step retry");
    }

    fn record_error(&self, step_name: &str, error: &str) {
        error!(step = %step_name, error = %error, "step error");
    }

    fn trace_info(&self, correlation_id: &str, step_name: &str, message: &str) {
        info!(correlation_id = %correlation_id, step = %step_name, "{message}");
    }

    fn trace_warning(&self, correlation_id: &str, step_name: &str, message: &str) {
        warn!(correlation_id = %correlation_id, step = %step_name, "{message}");
    }

    fn trace_error(&self, correlation_id: &str, step_name: &str, error: &str) {
        error!(correlation_id = %correlation_id, step = %step_name, error = %error, "trace error");
    }
}
