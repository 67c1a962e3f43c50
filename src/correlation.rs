//! Correlation-based async response matching.
//!
//! A step sends an outbound request carrying a correlation id, then suspends
//! on [`ResponseAwaiter::wait_for_response`] until the matching response is
//! fed back in through [`ResponseCompleter::complete`], typically from a
//! message-bus callback on a different logical thread of control. Each
//! pending wait resolves exactly once: response, timeout, cancellation, or
//! registry shutdown, whichever takes the slot first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::feature::FailureReason;

/// A response that knows which outbound request it answers.
pub trait CorrelatedResponse {
    fn correlation_id(&self) -> &str;
}

/// Failure modes of a response wait.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("correlation id '{0}' is already awaiting a response")]
    DuplicateCorrelationId(String),
    #[error("timed out after {timeout:?} waiting for response '{correlation_id}'")]
    Timeout {
        correlation_id: String,
        timeout: Duration,
    },
    #[error("wait for response '{0}' was cancelled")]
    Cancelled(String),
    #[error("registry shut down while waiting for response '{0}'")]
    Shutdown(String),
}

impl WaitError {
    /// Project the error into the engine's failure taxonomy.
    pub fn reason(&self) -> FailureReason {
        match self {
            WaitError::DuplicateCorrelationId(_) => FailureReason::InvalidState,
            WaitError::Timeout { .. } => FailureReason::Timeout,
            WaitError::Cancelled(_) => FailureReason::Cancelled,
            WaitError::Shutdown(_) => FailureReason::TransportError,
        }
    }
}

/// Waiting side of the registry.
#[async_trait]
pub trait ResponseAwaiter<R>: Send + Sync {
    /// Suspend until the response for `correlation_id` arrives, the timeout
    /// elapses, or `cancellation` fires, whichever happens first.
    async fn wait_for_response(
        &self,
        correlation_id: &str,
        timeout: Duration,
        cancellation: &CancellationToken,
    ) -> Result<R, WaitError>;
}

/// Completing side of the registry, driven by the inbound transport.
pub trait ResponseCompleter<R>: Send + Sync {
    /// Resolve the pending wait for `correlation_id`, if any. Responses for
    /// unknown or already-resolved ids are dropped; late and duplicate
    /// deliveries never error.
    fn complete(&self, correlation_id: &str, response: R);
}

struct Registry<R> {
    pending: HashMap<String, oneshot::Sender<R>>,
    closed: bool,
}

/// Registry of pending waiters keyed by correlation id.
///
/// The mutex-guarded map is the single synchronization point: removing an
/// id from it is the atomic take-ownership step, so of the racing triggers
/// (response, timeout, cancellation, shutdown) only the first to observe
/// the id present resolves the waiter. Waits on unrelated ids proceed in
/// parallel; the lock is held only for map access, never across a suspension
/// point.
///
/// Construct one registry per transport connection and call
/// [`ResponseRegistry::shutdown`] when the connection goes away.
pub struct ResponseRegistry<R> {
    inner: Mutex<Registry<R>>,
}

impl<R: Send + 'static> ResponseRegistry<R> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Registry {
                pending: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Number of outstanding waiters.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Fail every pending waiter with [`WaitError::Shutdown`] and reject
    /// registrations from now on.
    pub fn shutdown(&self) {
        let drained = {
            let mut inner = self.inner.lock().unwrap();
            inner.closed = true;
            inner.pending.drain().count()
        };
        if drained > 0 {
            debug!(drained, "response registry shut down with pending waiters");
        }
    }

    fn register(&self, correlation_id: &str) -> Result<oneshot::Receiver<R>, WaitError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(WaitError::Shutdown(correlation_id.to_string()));
        }
        if inner.pending.contains_key(correlation_id) {
            return Err(WaitError::DuplicateCorrelationId(correlation_id.to_string()));
        }
        let (tx, rx) = oneshot::channel();
        inner.pending.insert(correlation_id.to_string(), tx);
        Ok(rx)
    }

    fn take(&self, correlation_id: &str) -> Option<oneshot::Sender<R>> {
        self.inner.lock().unwrap().pending.remove(correlation_id)
    }
}

impl<R: Send + 'static> Default for ResponseRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Send + 'static> ResponseAwaiter<R> for ResponseRegistry<R> {
    async fn wait_for_response(
        &self,
        correlation_id: &str,
        timeout: Duration,
        cancellation: &CancellationToken,
    ) -> Result<R, WaitError> {
        let mut rx = self.register(correlation_id)?;

        // Biased: a response that is already delivered beats a timeout or
        // cancel that becomes ready in the same poll.
        tokio::select! {
            biased;
            delivered = &mut rx => match delivered {
                Ok(response) => Ok(response),
                Err(_) => Err(WaitError::Shutdown(correlation_id.to_string())),
            },
            _ = cancellation.cancelled() => {
                let _ = self.take(correlation_id);
                Err(WaitError::Cancelled(correlation_id.to_string()))
            }
            _ = tokio::time::sleep(timeout) => {
                let _ = self.take(correlation_id);
                Err(WaitError::Timeout {
                    correlation_id: correlation_id.to_string(),
                    timeout,
                })
            }
        }
    }
}

impl<R: Send + 'static> ResponseCompleter<R> for ResponseRegistry<R> {
    fn complete(&self, correlation_id: &str, response: R) {
        match self.take(correlation_id) {
            Some(tx) => {
                // Send only fails if the waiter already resolved and dropped
                // its receiver; that late delivery is dropped like any other.
                let _ = tx.send(response);
            }
            None => {
                debug!(correlation_id = %correlation_id, "dropping response with no pending waiter");
            }
        }
    }
}

type Mapper<R> = Box<dyn Fn(&str) -> Result<R, String> + Send + Sync>;

/// Glue between a raw inbound transport and the completer: maps each raw
/// message to a typed response and completes under the response's own
/// correlation id. Messages that fail to map are logged and dropped.
pub struct ResponseHandler<R> {
    completer: Arc<dyn ResponseCompleter<R>>,
    mapper: Mapper<R>,
}

impl<R: CorrelatedResponse + Send + 'static> ResponseHandler<R> {
    pub fn new(
        completer: Arc<dyn ResponseCompleter<R>>,
        mapper: impl Fn(&str) -> Result<R, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            completer,
            mapper: Box::new(mapper),
        }
    }

    /// Handler whose mapper decodes JSON payloads.
    pub fn json(completer: Arc<dyn ResponseCompleter<R>>) -> Self
    where
        R: DeserializeOwned,
    {
        Self::new(completer, |raw| {
            serde_json::from_str(raw).map_err(|e| e.to_string())
        })
    }

    pub fn on_message(&self, raw: &str) {
        match (self.mapper)(raw) {
            Ok(response) => {
                let correlation_id = response.correlation_id().to_string();
                self.completer.complete(&correlation_id, response);
            }
            Err(err) => {
                warn!(error = %err, "dropping inbound message that failed to map");
            }
        }
    }
}
