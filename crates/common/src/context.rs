//! Per-request context
//!
//! Ephemeral state owned by the dataplane call that created it: arrival
//! time, deadline, and a cooperative cancellation flag. Never shared across
//! requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-request ephemeral state
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Arrival timestamp
    received_at: Instant,

    /// Absolute deadline derived from the request timeout
    deadline: Option<Instant>,

    /// Cooperative cancellation flag; set when the deadline expires
    cancelled: Arc<AtomicBool>,

    /// Request id propagated from the wire, if any
    request_id: Option<String>,
}

impl RequestContext {
    /// Creates a new context with an optional timeout
    pub fn new(timeout: Option<Duration>) -> Self {
        let received_at = Instant::now();
        Self {
            received_at,
            deadline: timeout.map(|t| received_at + t),
            cancelled: Arc::new(AtomicBool::new(false)),
            request_id: None,
        }
    }

    /// Attaches a request id
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request id, if one was supplied
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Time elapsed since the request arrived
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    /// Time remaining until the deadline; `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed
    pub fn expired(&self) -> bool {
        matches!(self.remaining(), Some(remaining) if remaining.is_zero())
    }

    /// Signals cooperative cancellation. The in-flight model call is not
    /// forcibly killed; its result is discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been signalled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_deadline() {
        let ctx = RequestContext::new(None);
        assert!(ctx.remaining().is_none());
        assert!(!ctx.expired());
    }

    #[test]
    fn test_deadline_expiry() {
        let ctx = RequestContext::new(Some(Duration::from_millis(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.expired());
    }

    #[test]
    fn test_cancellation_shared_across_clones() {
        let ctx = RequestContext::new(Some(Duration::from_secs(1)));
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());
        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_request_id() {
        let ctx = RequestContext::new(None).with_request_id(Some("abc".to_string()));
        assert_eq!(ctx.request_id(), Some("abc"));
    }
}
