//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being handled
//! - Tag each request with a unique ID for tracing
//! - Let shutdown report how much work is still draining

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use tower::{service_fn, ServiceExt};

use crate::http::{boxed, HttpHandler};

/// Global atomic counter for request IDs.
/// Relaxed ordering is enough since only uniqueness matters.
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Generate a new unique request ID.
    pub fn new() -> Self {
        Self(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Tracks in-flight requests for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    in_flight: Arc<AtomicU64>,
}

impl RequestTracker {
    /// Create a new request tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new in-flight request. Returns a guard that decrements on drop.
    pub fn track(&self) -> RequestGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            in_flight: Arc::clone(&self.in_flight),
            id: RequestId::new(),
        }
    }

    /// Get current in-flight request count.
    pub fn count(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wrap `inner` so every request it handles is counted while in flight.
    pub fn track_handler(&self, inner: HttpHandler) -> HttpHandler {
        let tracker = self.clone();
        boxed(service_fn(move |req: Request| {
            let guard = tracker.track();
            let inner = inner.clone();
            async move {
                tracing::trace!(request_id = %guard.id(), uri = %req.uri(), "Request started");
                let response = inner.oneshot(req).await;
                drop(guard);
                response
            }
        }))
    }
}

/// Guard that tracks a request's lifetime.
/// Decrements the in-flight count when dropped.
#[derive(Debug)]
pub struct RequestGuard {
    in_flight: Arc<AtomicU64>,
    id: RequestId,
}

impl RequestGuard {
    /// Get this request's ID.
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(request_id = %self.id, "Request finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use std::convert::Infallible;
    use tokio::sync::oneshot;

    #[test]
    fn request_id_unique() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn request_tracker_counts() {
        let tracker = RequestTracker::new();
        assert_eq!(tracker.count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.count(), 2);

        drop(guard1);
        assert_eq!(tracker.count(), 1);

        drop(guard2);
        assert_eq!(tracker.count(), 0);
    }

    #[tokio::test]
    async fn tracked_handler_counts_while_running() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));

        let inner = boxed(service_fn(move |_req: Request| {
            let release_rx = Arc::clone(&release_rx);
            async move {
                if let Some(rx) = release_rx.lock().await.take() {
                    let _ = rx.await;
                }
                Ok::<_, Infallible>(StatusCode::OK.into_response())
            }
        }));

        let tracker = RequestTracker::new();
        let handler = tracker.track_handler(inner);
        let pending = tokio::spawn(
            handler.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()),
        );

        while tracker.count() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(tracker.count(), 1);

        release_tx.send(()).unwrap();
        let response = pending.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(tracker.count(), 0);
    }
}
