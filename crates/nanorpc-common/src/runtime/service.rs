//! The service contract
//!
//! A service is a named request handler. Besides [`Service::handle`] it may
//! take part in the two initialisation phases of a
//! [`ServiceRegistry`](super::ServiceRegistry):
//!
//! 1. [`Service::init`]: obtain clients of other services. Clients must not
//!    be used yet since their targets may not be initialised.
//! 2. [`Service::init_finished`]: every service is initialised, requests are
//!    allowed.
//!
//! The registry only calls the hooks a service declares in
//! [`Service::capabilities`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::context::Ctx;
use super::registry::ClientSet;
use crate::protocol::{BoxError, Payload};

/// What a handler returns: an optional response value or any error.
pub type HandlerResult = Result<Option<Payload>, BoxError>;

/// The optional hooks a service implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub init: bool,
    pub init_finished: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        init: false,
        init_finished: false,
    };
    pub const INIT: Self = Self {
        init: true,
        init_finished: false,
    };
    pub const INIT_FINISHED: Self = Self {
        init: false,
        init_finished: true,
    };
    pub const ALL: Self = Self {
        init: true,
        init_finished: true,
    };
}

#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// The hooks the registry calls. Overriding [`Service::init`] or
    /// [`Service::init_finished`] has no effect unless the matching flag is
    /// set here.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Phase 1. `clients` is owned by this service's name.
    ///
    /// Only called when [`Service::capabilities`] has `init` set.
    fn init(&self, _clients: &ClientSet) -> Result<(), BoxError> {
        Ok(())
    }

    /// Phase 2. Only called when [`Service::capabilities`] has
    /// `init_finished` set.
    async fn init_finished(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Handles one request. A payload of a type the service doesn't handle
    /// should be answered with [`RpcError::unrecognized_request`](crate::RpcError::unrecognized_request).
    async fn handle(&self, ctx: &Ctx, req: Payload) -> HandlerResult;
}

type HandlerFn = Arc<dyn Fn(Ctx, Payload) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
pub type InitFn = Arc<dyn Fn(&ClientSet) -> Result<(), BoxError> + Send + Sync>;
pub type InitFinishedFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// A service built from closures. Handy for mocks in tests.
///
/// # Example
///
/// ```
/// use nanorpc_common::{Ctx, FnService, Payload, Service};
///
/// let svc = FnService::new("echo", |_ctx: Ctx, req: Payload| async move { Ok(Some(req)) })
///     .on_init(|_clients| Ok(()));
/// assert!(svc.capabilities().init);
/// assert!(!svc.capabilities().init_finished);
/// ```
#[derive(Clone)]
pub struct FnService {
    name: String,
    handler: HandlerFn,
    init: Option<InitFn>,
    init_finished: Option<InitFinishedFn>,
}

impl FnService {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Ctx, Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |ctx, req| handler(ctx, req).boxed()),
            init: None,
            init_finished: None,
        }
    }

    pub fn on_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&ClientSet) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    pub fn on_init_finished<F, Fut>(mut self, init_finished: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.init_finished = Some(Arc::new(move || init_finished().boxed()));
        self
    }
}

#[async_trait]
impl Service for FnService {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            init: self.init.is_some(),
            init_finished: self.init_finished.is_some(),
        }
    }

    fn init(&self, clients: &ClientSet) -> Result<(), BoxError> {
        match &self.init {
            Some(init) => init(clients),
            None => Ok(()),
        }
    }

    async fn init_finished(&self) -> Result<(), BoxError> {
        match &self.init_finished {
            Some(init_finished) => init_finished().await,
            None => Ok(()),
        }
    }

    async fn handle(&self, ctx: &Ctx, req: Payload) -> HandlerResult {
        (self.handler)(ctx.clone(), req).await
    }
}
