#![allow(dead_code)]

pub mod tracing_capture;

use std::sync::{Arc, Mutex};

use baton::{ExecutionTracer, StepGuard};

/// Tracer events recorded by [`RecordingTracer`] for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    StepStart { step: String, correlation_id: String },
    StepEnd { step: String },
    Retry { step: String, attempt: u32, reason: String },
    Error { step: String, error: String },
    Info { step: String, message: String },
    Warning { step: String, message: String },
    TraceError { step: String, error: String },
}

/// In-memory [`ExecutionTracer`] for asserting on engine trace calls.
#[derive(Default)]
pub struct RecordingTracer {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn retries(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TraceEvent::Retry { attempt, .. } => Some(attempt),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TraceEvent::Info { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: TraceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ExecutionTracer for RecordingTracer {
    fn start_step(&self, step_name: &str, correlation_id: &str) -> StepGuard {
        self.push(TraceEvent::StepStart {
            step: step_name.to_string(),
            correlation_id: correlation_id.to_string(),
        });
        let events = self.events.clone();
        let step = step_name.to_string();
        StepGuard::new(move || {
            events.lock().unwrap().push(TraceEvent::StepEnd { step });
        })
    }

    fn record_retry(&self, step_name: &str, attempt: u32, reason: &str) {
        self.push(TraceEvent::Retry {
            step: step_name.to_string(),
            attempt,
            reason: reason.to_string(),
        });
    }

    fn record_error(&self, step_name: &str, error: &str) {
        self.push(TraceEvent::Error {
            step: step_name.to_string(),
            error: error.to_string(),
        });
    }

    fn trace_info(&self, _correlation_id: &str, step_name: &str, message: &str) {
        self.push(TraceEvent::Info {
            step: step_name.to_string(),
            message: message.to_string(),
        });
    }

    fn trace_warning(&self, _correlation_id: &str, step_name: &str, message: &str) {
        self.push(TraceEvent::Warning {
            step: step_name.to_string(),
            message: message.to_string(),
        });
    }

    fn trace_error(&self, _correlation_id: &str, step_name: &str, error: &str) {
        self.push(TraceEvent::TraceError {
            step: step_name.to_string(),
            error: error.to_string(),
        });
    }
}
