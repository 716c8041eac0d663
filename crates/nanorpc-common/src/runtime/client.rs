//! Clients
//!
//! A [`Client`] delivers requests to one service on behalf of one owner.
//! The owner name shows up as [`Ctx::client_name`] on the callee side.
//! Clients are produced by a [`ClientFactory`]; the registry uses
//! [`LocalClientFactory`] unless told otherwise.

use std::any::{type_name, Any};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use super::context::{Cancellation, Ctx};
use super::request_id::{IdGenerator, RandomIdGenerator};
use super::service::{HandlerResult, Service};
use crate::protocol::error::ERROR_CODE_SERVER_ERROR;
use crate::protocol::{BoxError, Payload, RpcError};

#[async_trait]
pub trait Client: Send + Sync {
    /// Sends `req` to the bound service.
    ///
    /// `ctx` is the caller's own context, or `None` when the caller isn't a
    /// service. It is never modified.
    async fn request(&self, ctx: Option<&Ctx>, req: Payload) -> HandlerResult;
}

/// Typed requests on top of [`Client::request`].
#[async_trait]
pub trait ClientExt: Client {
    /// Sends `req` and downcasts the response to `Resp`.
    ///
    /// A missing response or one of another type fails with `S-ERROR`.
    async fn call<Resp, Req>(&self, ctx: Option<&Ctx>, req: Req) -> Result<Resp, BoxError>
    where
        Resp: Any + Send,
        Req: Any + Send + Sync;
}

#[async_trait]
impl<C: Client + ?Sized> ClientExt for C {
    async fn call<Resp, Req>(&self, ctx: Option<&Ctx>, req: Req) -> Result<Resp, BoxError>
    where
        Resp: Any + Send,
        Req: Any + Send + Sync,
    {
        let resp = self.request(ctx, Payload::new(req)).await?;
        let actual = resp.as_ref().map(Payload::type_name).unwrap_or("none");
        resp.and_then(|resp| resp.downcast::<Resp>().ok())
            .ok_or_else(|| {
                RpcError::new(
                    ERROR_CODE_SERVER_ERROR,
                    format!(
                        "expected response of type {}, got {}",
                        type_name::<Resp>(),
                        actual
                    ),
                )
                .into()
            })
    }
}

/// Delivers requests by calling the target service's handler in process.
pub struct LocalClient {
    svc: Arc<dyn Service>,
    owner: String,
    ids: Arc<dyn IdGenerator>,
}

impl LocalClient {
    pub fn new(svc: Arc<dyn Service>, owner: impl Into<String>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            svc,
            owner: owner.into(),
            ids,
        }
    }
}

#[async_trait]
impl Client for LocalClient {
    async fn request(&self, ctx: Option<&Ctx>, req: Payload) -> HandlerResult {
        let mut ctx = ctx.cloned().unwrap_or_default();

        if ctx.req_id.is_empty() {
            ctx.req_id = self.ids.generate()?;
        }

        let (cancellation, _guard) = Cancellation::derive(ctx.cancellation.as_ref());
        ctx.cancellation = Some(cancellation);
        ctx.svc = Some(self.svc.clone());
        ctx.client_name = self.owner.clone();

        let span = ctx.span();
        self.svc.handle(&ctx, req).instrument(span).await
    }
}

/// Creates the clients handed out by client sets and used by listeners.
pub trait ClientFactory: Send + Sync {
    fn new_client(&self, svc: Arc<dyn Service>, owner: &str) -> Arc<dyn Client>;
}

/// Produces [`LocalClient`]s.
#[derive(Clone)]
pub struct LocalClientFactory {
    ids: Arc<dyn IdGenerator>,
}

impl LocalClientFactory {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }
}

impl Default for LocalClientFactory {
    fn default() -> Self {
        Self::new(Arc::new(RandomIdGenerator::default()))
    }
}

impl ClientFactory for LocalClientFactory {
    fn new_client(&self, svc: Arc<dyn Service>, owner: &str) -> Arc<dyn Client> {
        Arc::new(LocalClient::new(svc, owner, self.ids.clone()))
    }
}

/// Wraps another factory and reduces every error to the `(code, message)`
/// pair a transport would preserve.
///
/// In-process calls otherwise hand the callee's error value to the caller
/// untouched, which lets tests pass that would fail once a transport sits
/// between the services.
#[derive(Clone)]
pub struct NarrowingClientFactory {
    inner: Arc<dyn ClientFactory>,
}

impl NarrowingClientFactory {
    pub fn new(inner: Arc<dyn ClientFactory>) -> Self {
        Self { inner }
    }
}

impl Default for NarrowingClientFactory {
    fn default() -> Self {
        Self::new(Arc::new(LocalClientFactory::default()))
    }
}

impl ClientFactory for NarrowingClientFactory {
    fn new_client(&self, svc: Arc<dyn Service>, owner: &str) -> Arc<dyn Client> {
        Arc::new(NarrowingClient {
            inner: self.inner.new_client(svc, owner),
        })
    }
}

struct NarrowingClient {
    inner: Arc<dyn Client>,
}

#[async_trait]
impl Client for NarrowingClient {
    async fn request(&self, ctx: Option<&Ctx>, req: Payload) -> HandlerResult {
        self.inner
            .request(ctx, req)
            .await
            .map_err(|err| Box::new(RpcError::narrow(&*err)) as BoxError)
    }
}
