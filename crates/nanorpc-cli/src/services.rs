//! Demo service implementations
//!
//! ```text
//! svc2 ──► svc1
//!   └────► svc3 ──► svc4
//! ```
//!
//! `svc1` and `svc4` answer on their own, `svc2` and `svc3` call their
//! dependencies through clients obtained during [`Service::init`]. Every
//! service prefixes the value it returns with its own name, so the response
//! of a call shows the path it took, e.g. `svc2_svc3_svc4_getparam`.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use nanorpc_common::protocol::error::ERROR_CODE_SERVER_ERROR;
use nanorpc_common::{
    BoxError, Capabilities, Client, ClientExt, ClientSet, Ctx, HandlerResult, Payload, RpcError,
    Service,
};

use crate::api::{svc1, svc2, svc3, svc4};

/// Creates the demo service called `name`.
pub fn by_name(name: &str) -> Option<Arc<dyn Service>> {
    match name {
        svc1::NAME => Some(Arc::new(Svc1)),
        svc2::NAME => Some(Arc::new(Svc2::default())),
        svc3::NAME => Some(Arc::new(Svc3::default())),
        svc4::NAME => Some(Arc::new(Svc4)),
        _ => None,
    }
}

/// All four demo services.
pub fn all() -> Vec<Arc<dyn Service>> {
    vec![
        Arc::new(Svc1),
        Arc::new(Svc2::default()),
        Arc::new(Svc3::default()),
        Arc::new(Svc4),
    ]
}

/// Unwraps a service's only request type.
fn expect_request<T: Send + Sync + 'static>(req: Payload) -> Result<T, RpcError> {
    req.downcast::<T>()
        .map_err(|req| RpcError::unrecognized_request(req.type_name()))
}

fn initialised(client: &OnceLock<Arc<dyn Client>>) -> Result<&Arc<dyn Client>, RpcError> {
    client
        .get()
        .ok_or_else(|| RpcError::new(ERROR_CODE_SERVER_ERROR, "service not initialised"))
}

fn store(cell: &OnceLock<Arc<dyn Client>>, client: Arc<dyn Client>) -> Result<(), BoxError> {
    cell.set(client)
        .map_err(|_| "service initialised twice".into())
}

pub struct Svc1;

#[async_trait]
impl Service for Svc1 {
    fn name(&self) -> &str {
        svc1::NAME
    }

    async fn handle(&self, _ctx: &Ctx, req: Payload) -> HandlerResult {
        let req: svc1::Req = expect_request(req)?;
        Ok(Some(Payload::new(svc1::Resp {
            value: format!("svc1_{}", req.param),
        })))
    }
}

/// The requests `svc2` serves.
enum Svc2Request {
    Req(svc2::Req),
    GetReq(svc2::GetReq),
}

impl TryFrom<Payload> for Svc2Request {
    type Error = RpcError;

    fn try_from(req: Payload) -> Result<Self, Self::Error> {
        let req = match req.downcast::<svc2::Req>() {
            Ok(req) => return Ok(Svc2Request::Req(req)),
            Err(req) => req,
        };
        req.downcast::<svc2::GetReq>()
            .map(Svc2Request::GetReq)
            .map_err(|req| RpcError::unrecognized_request(req.type_name()))
    }
}

#[derive(Default)]
pub struct Svc2 {
    svc1: OnceLock<Arc<dyn Client>>,
    svc3: OnceLock<Arc<dyn Client>>,
}

impl Svc2 {
    async fn handle_req(&self, ctx: &Ctx, req: svc2::Req) -> HandlerResult {
        let resp: svc1::Resp = initialised(&self.svc1)?
            .call(Some(ctx), svc1::Req { param: req.param })
            .await
            .map_err(|e| RpcError::unclassified("svc1 failure").with_cause(e))?;
        Ok(Some(Payload::new(svc2::Resp {
            value: format!("svc2_{}", resp.value),
        })))
    }

    async fn handle_get_req(&self, ctx: &Ctx) -> HandlerResult {
        let resp: svc3::Resp = initialised(&self.svc3)?
            .call(
                Some(ctx),
                svc3::Req {
                    param: "getparam".into(),
                },
            )
            .await
            .map_err(|e| RpcError::unclassified("svc3 failure").with_cause(e))?;
        Ok(Some(Payload::new(svc2::GetResp {
            value: format!("svc2_{}", resp.value),
        })))
    }
}

#[async_trait]
impl Service for Svc2 {
    fn name(&self) -> &str {
        svc2::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INIT
    }

    fn init(&self, clients: &ClientSet) -> Result<(), BoxError> {
        store(&self.svc1, clients.lookup_client(svc1::NAME)?)?;
        store(&self.svc3, clients.lookup_client(svc3::NAME)?)
    }

    async fn handle(&self, ctx: &Ctx, req: Payload) -> HandlerResult {
        match Svc2Request::try_from(req)? {
            Svc2Request::Req(req) => self.handle_req(ctx, req).await,
            Svc2Request::GetReq(_) => self.handle_get_req(ctx).await,
        }
    }
}

#[derive(Default)]
pub struct Svc3 {
    svc4: OnceLock<Arc<dyn Client>>,
}

#[async_trait]
impl Service for Svc3 {
    fn name(&self) -> &str {
        svc3::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::INIT
    }

    fn init(&self, clients: &ClientSet) -> Result<(), BoxError> {
        store(&self.svc4, clients.lookup_client(svc4::NAME)?)
    }

    async fn handle(&self, ctx: &Ctx, req: Payload) -> HandlerResult {
        let req: svc3::Req = expect_request(req)?;
        let resp: svc4::Resp = initialised(&self.svc4)?
            .call(Some(ctx), svc4::Req { param: req.param })
            .await
            .map_err(|e| RpcError::unclassified("svc4 failure").with_cause(e))?;
        Ok(Some(Payload::new(svc3::Resp {
            value: format!("svc3_{}", resp.value),
        })))
    }
}

pub struct Svc4;

#[async_trait]
impl Service for Svc4 {
    fn name(&self) -> &str {
        svc4::NAME
    }

    async fn handle(&self, _ctx: &Ctx, req: Payload) -> HandlerResult {
        let req: svc4::Req = expect_request(req)?;
        Ok(Some(Payload::new(svc4::Resp {
            value: format!("svc4_{}", req.param),
        })))
    }
}
