//! Listeners and the server runner
//!
//! A listener exposes some services of a [`ServiceRegistry`] to the outside
//! world. It is initialised against the registry once, then listens until it
//! fails or the process exits.

use async_trait::async_trait;
use futures_util::future::try_join_all;
use nanorpc_common::{NanoError, ServiceRegistry};

#[async_trait]
pub trait Listener: Send + Sync {
    /// Resolves services and builds routing state. Called exactly once,
    /// before [`Listener::listen`].
    fn init(&mut self, registry: &ServiceRegistry) -> Result<(), NanoError>;

    /// Serves requests. Only returns on failure.
    async fn listen(&self) -> Result<(), NanoError>;
}

/// Initialises every listener, then runs them all concurrently.
///
/// Returns the first initialisation error before any listener starts, or
/// the first error of a running listener.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use nanorpc_common::{Ctx, FnService, Payload, ServiceRegistry};
/// use nanorpc_server::{run_server, HttpListener, ListenerOptions, Listener};
///
/// # async fn example() -> Result<(), nanorpc_common::NanoError> {
/// let svc = FnService::new("svc1", |_ctx: Ctx, req: Payload| async move { Ok(Some(req)) });
/// let registry = ServiceRegistry::build(vec![Arc::new(svc)]).await;
///
/// let listener = HttpListener::new(ListenerOptions::default(), vec![]);
/// run_server(&registry, vec![Box::new(listener) as Box<dyn Listener>]).await
/// # }
/// ```
pub async fn run_server(
    registry: &ServiceRegistry,
    mut listeners: Vec<Box<dyn Listener>>,
) -> Result<(), NanoError> {
    for listener in listeners.iter_mut() {
        listener.init(registry)?;
    }

    try_join_all(listeners.iter().map(|listener| listener.listen())).await?;
    Ok(())
}
