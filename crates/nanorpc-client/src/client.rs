//! Remote services over HTTP
//!
//! [`HttpServiceClient`] is a [`Service`] whose handler forwards every
//! request to a listener in another process. Registered in a local
//! [`ServiceRegistry`](nanorpc_common::ServiceRegistry) under the remote
//! service's name, it lets local services call the remote one through an
//! ordinary client. Request ids and the caller's name cross the wire, and
//! remote errors come back with their code and message.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nanorpc_client::{ClientOptions, HttpServiceClient};
//! use nanorpc_common::discovery::StaticDiscoverer;
//! use nanorpc_common::{ServiceDescriptor, ServiceRegistry};
//!
//! # async fn example() -> Result<(), nanorpc_common::NanoError> {
//! let discoverer = StaticDiscoverer::new().with("svc1", "127.0.0.1:8000");
//! let opts = ClientOptions::new(Arc::new(discoverer));
//! let svc1 = HttpServiceClient::new(opts, ServiceDescriptor::new("svc1"))?;
//!
//! let registry = ServiceRegistry::build(vec![Arc::new(svc1)]).await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use nanorpc_common::discovery::Discoverer;
use nanorpc_common::transport::{ClientSideSerializer, Protocol, WireResponse};
use nanorpc_common::{
    BoxError, Ctx, EndpointDescriptor, HandlerResult, NanoError, Payload, RpcError, Service,
    ServiceDescriptor,
};

/// Default limit for a whole request/response exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration of an [`HttpServiceClient`].
#[derive(Clone)]
pub struct ClientOptions {
    pub discoverer: Arc<dyn Discoverer>,
    pub serializer: ClientSideSerializer,
    /// Must match the listener's setting.
    pub prefix_url_path: bool,
    /// `None` waits as long as the caller's context allows.
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    /// JSON protocol, no path prefix, [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(discoverer: Arc<dyn Discoverer>) -> Self {
        Self {
            discoverer,
            serializer: Protocol::Json.client_side(),
            prefix_url_path: false,
            timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// A remote service reached over HTTP.
pub struct HttpServiceClient {
    descriptor: ServiceDescriptor,
    opts: ClientOptions,
    http: HyperClient<HttpConnector, Full<Bytes>>,
}

impl HttpServiceClient {
    /// Creates a client for the service described by `descriptor`.
    ///
    /// # Errors
    ///
    /// [`NanoError::DuplicateRequestType`] if two endpoints share a request
    /// type, since outgoing requests are routed by type.
    pub fn new(opts: ClientOptions, descriptor: ServiceDescriptor) -> Result<Self, NanoError> {
        let mut seen = HashSet::new();
        for ep in &descriptor.endpoints {
            if !seen.insert(ep.request_type.id()) {
                return Err(NanoError::DuplicateRequestType {
                    service: descriptor.service_name.clone(),
                    type_name: ep.request_type.name(),
                });
            }
        }

        Ok(Self {
            descriptor,
            opts,
            http: HyperClient::builder(TokioExecutor::new()).build_http(),
        })
    }

    fn url(&self, addr: &str, ep: &EndpointDescriptor) -> String {
        if self.opts.prefix_url_path {
            format!("http://{}/{}{}", addr, self.descriptor.service_name, ep.path)
        } else {
            format!("http://{}{}", addr, ep.path)
        }
    }

    fn err(&self, msg: impl std::fmt::Display) -> RpcError {
        RpcError::unclassified(format!("service {}: {}", self.descriptor.service_name, msg))
    }

    /// Sends the encoded request and collects the whole response.
    async fn send(&self, req: Request<Full<Bytes>>) -> Result<WireResponse, RpcError> {
        let resp = self
            .http
            .request(req)
            .await
            .map_err(|e| self.err("http request failure").with_cause(e))?;

        let (parts, body) = resp.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| self.err("error reading response body").with_cause(e))?
            .to_bytes();

        Ok(WireResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

#[async_trait]
impl Service for HttpServiceClient {
    fn name(&self) -> &str {
        &self.descriptor.service_name
    }

    async fn handle(&self, ctx: &Ctx, req: Payload) -> HandlerResult {
        let Some(ep) = self.descriptor.endpoint_for(&req) else {
            return Err(RpcError::unrecognized_request(req.type_name()).into());
        };

        let addr = self.opts.discoverer.discover(&self.descriptor.service_name)?;
        let url = self.url(&addr, ep);

        let wire = self
            .opts
            .serializer
            .encode_request(ep, ctx, &req)
            .map_err(|e| self.err("error serializing request").with_cause(e))?;

        let mut http_req = Request::builder()
            .method(wire.method)
            .uri(&url)
            .body(Full::new(wire.body))
            .map_err(|e| self.err("error creating request").with_cause(e))?;
        *http_req.headers_mut() = wire.headers;

        tracing::debug!(req_id = %ctx.req_id, url = %url, "sending request");

        let exchange = async {
            match self.opts.timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.send(http_req))
                    .await
                    .map_err(|_| self.err(format!("request timed out after {:?}", timeout)))?,
                None => self.send(http_req).await,
            }
        };

        let resp = tokio::select! {
            resp = exchange => resp?,
            _ = ctx.cancelled() => return Err(self.err("request cancelled").into()),
        };

        match self.opts.serializer.decode_response(ep, &resp) {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(remote)) => Err(Box::new(remote) as BoxError),
            Err(e) => Err(self.err("error deserializing response").with_cause(e).into()),
        }
    }
}
