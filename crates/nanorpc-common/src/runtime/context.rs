//! Request contexts and cancellation
//!
//! Every call gets its own [`Ctx`]. The caller's context is never shared
//! with the callee: the client clones it and replaces its cancellation with
//! a child derived through [`Cancellation::derive`], so a cancelled caller
//! cancels the callee but a callee cancelling its own context leaves the
//! caller untouched.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use super::service::Service;

/// Cancellation signal with an optional deadline.
///
/// Clones share the same token, so cancelling one cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes when the token is cancelled or the deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Creates the cancellation of a new call.
    ///
    /// The child is a fresh token that copies the parent's deadline. A
    /// watcher task cancels the child once the parent is done or the
    /// returned guard is released, whichever comes first. Cancelling the
    /// child never touches the parent.
    ///
    /// Must be called from within a tokio runtime when `parent` is set.
    pub fn derive(parent: Option<&Cancellation>) -> (Cancellation, CancelGuard) {
        let child = Cancellation {
            token: CancellationToken::new(),
            deadline: parent.and_then(|p| p.deadline),
        };
        let release = CancellationToken::new();

        if let Some(parent) = parent {
            let parent = parent.clone();
            let watched = child.token.clone();
            let released = release.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = parent.done() => {}
                    _ = released.cancelled() => {}
                }
                watched.cancel();
            });
        }

        let guard = CancelGuard {
            release,
            child: child.token.clone(),
        };
        (child, guard)
    }
}

/// Ends a derived cancellation and stops its watcher.
#[must_use = "dropping the guard cancels the derived context immediately"]
#[derive(Debug)]
pub struct CancelGuard {
    release: CancellationToken,
    child: CancellationToken,
}

impl CancelGuard {
    pub fn release(self) {}
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.release.cancel();
        self.child.cancel();
    }
}

/// Per-call request context.
///
/// `svc` and `client_name` are filled in by the client that delivers the
/// call; a caller only sets `req_id` and `cancellation`.
#[derive(Clone, Default)]
pub struct Ctx {
    /// Correlation id shared by every call of one logical request.
    pub req_id: String,
    pub cancellation: Option<Cancellation>,
    /// The service handling the call.
    pub svc: Option<Arc<dyn Service>>,
    /// Owner name of the client that sent the call.
    pub client_name: String,
}

impl Ctx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_req_id(mut self, req_id: impl Into<String>) -> Self {
        self.req_id = req_id.into();
        self
    }

    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn with_service(mut self, svc: Arc<dyn Service>) -> Self {
        self.svc = Some(svc);
        self
    }

    /// Name of the handling service, or `""` outside of a call.
    pub fn service_name(&self) -> &str {
        self.svc.as_ref().map(|svc| svc.name()).unwrap_or("")
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(Cancellation::is_cancelled)
    }

    /// Completes when the call is cancelled. Never completes for a context
    /// without cancellation.
    pub async fn cancelled(&self) {
        match &self.cancellation {
            Some(cancellation) => cancellation.done().await,
            None => std::future::pending().await,
        }
    }

    /// The span every call runs in.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "call",
            req_id = %self.req_id,
            client = %self.client_name,
            service = %self.service_name(),
        )
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("req_id", &self.req_id)
            .field("cancellation", &self.cancellation)
            .field("svc", &self.service_name())
            .field("client_name", &self.client_name)
            .finish()
    }
}
