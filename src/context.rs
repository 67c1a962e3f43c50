//! Per-run execution context shared by every step of an orchestration.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::tracer::ExecutionTracer;

/// Immutable bundle handed to every step, feature, and wait of one run.
///
/// Holds the run's cancellation token, an optional tracer, the orchestration
/// id (generated when the caller supplies none), and the start instant. The
/// context is shared across all steps of a run and never mutated after
/// construction; clones are handles onto the same run (the cancellation
/// token stays linked).
#[derive(Clone)]
pub struct OrchestrationContext {
    cancellation: CancellationToken,
    tracer: Option<Arc<dyn ExecutionTracer>>,
    orchestration_id: String,
    started_at: Instant,
}

impl OrchestrationContext {
    /// Fresh context: new cancellation token, no tracer, generated id.
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            tracer: None,
            orchestration_id: Uuid::new_v4().to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn ExecutionTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn with_orchestration_id(mut self, id: impl Into<String>) -> Self {
        self.orchestration_id = id.into();
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn tracer(&self) -> Option<&Arc<dyn ExecutionTracer>> {
        self.tracer.as_ref()
    }

    pub fn orchestration_id(&self) -> &str {
        &self.orchestration_id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Forward an info trace to the tracer, if one is attached.
    pub fn trace_info(&self, step_name: &str, message: &str) {
        if let Some(tracer) = &self.tracer {
            tracer.trace_info(&self.orchestration_id, step_name, message);
        }
    }

    pub fn trace_warning(&self, step_name: &str, message: &str) {
        if let Some(tracer) = &self.tracer {
            tracer.trace_warning(&self.orchestration_id, step_name, message);
        }
    }

    pub fn trace_error(&self, step_name: &str, error: &str) {
        if let Some(tracer) = &self.tracer {
            tracer.trace_error(&self.orchestration_id, step_name, error);
        }
    }
}

impl Default for OrchestrationContext {
    fn default() -> Self {
        Self::new()
    }
}
