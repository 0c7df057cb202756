//! Diagnostics hook for store round-trips.
//!
//! An attached [`TraceObserver`] receives one [`TraceEvent`] per Elasticsearch
//! call with the outbound request and the raw response body. The hook is
//! purely observational: it cannot alter results, and when no observer is
//! attached no event (and no request-body string) is ever built.

use std::sync::Arc;

use parking_lot::RwLock;

/// A single traced store round-trip.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// The store operation that issued the request (e.g., `"find_by_name"`).
    pub operation: &'static str,
    /// The request URL, including query parameters.
    pub url: String,
    /// The serialized request body, when the request had one.
    pub request: Option<String>,
    /// The raw response body.
    pub response: String,
}

/// Observer invoked with every store round-trip.
///
/// Implementations must not panic; the store calls observers on its own
/// request path and does not guard against unwinding.
pub trait TraceObserver: Send + Sync {
    /// Called after each Elasticsearch response has been received.
    fn trace(&self, event: &TraceEvent);
}

/// Every `Fn(&TraceEvent)` closure is a valid observer.
impl<F> TraceObserver for F
where
    F: Fn(&TraceEvent) + Send + Sync,
{
    fn trace(&self, event: &TraceEvent) {
        self(event);
    }
}

/// The attach/detach slot the store keeps its current observer in.
#[derive(Default)]
pub(crate) struct TraceSlot {
    observer: RwLock<Option<Arc<dyn TraceObserver>>>,
}

impl TraceSlot {
    pub(crate) fn attach(&self, observer: Arc<dyn TraceObserver>) {
        *self.observer.write() = Some(observer);
    }

    pub(crate) fn detach(&self) {
        *self.observer.write() = None;
    }

    /// Whether an observer is currently attached. Checked before any trace
    /// payload is allocated.
    pub(crate) fn is_active(&self) -> bool {
        self.observer.read().is_some()
    }

    pub(crate) fn emit(
        &self,
        operation: &'static str,
        url: String,
        request: Option<String>,
        response: &str,
    ) {
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer.trace(&TraceEvent {
                operation,
                url,
                request,
                response: response.to_string(),
            });
        }
    }
}
