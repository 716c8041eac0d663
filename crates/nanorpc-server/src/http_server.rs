//! HTTP Listener for nanorpc Services
//!
//! This module provides the [`Listener`] implementation that exposes
//! services over HTTP/1.1 using hyper.
//!
//! # Architecture
//!
//! The listener:
//! - Builds an [`HttpRouter`] from the registry during [`Listener::init`]
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task for each connection
//! - Collects each request body and hands the request to the router
//!
//! # Example
//!
//! ```no_run
//! use nanorpc_common::transport::Protocol;
//! use nanorpc_common::ServiceRegistry;
//! use nanorpc_server::{HttpListener, Listener, ListenerOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ServiceRegistry::build(vec![]).await;
//!     let opts = ListenerOptions {
//!         bind_addr: "127.0.0.1:8000".into(),
//!         serializer: Protocol::Json.server_side(),
//!         prefix_url_path: true,
//!     };
//!     let mut listener = HttpListener::new(opts, vec![]);
//!     listener.init(&registry).unwrap();
//!     listener.listen().await.unwrap();
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use nanorpc_common::protocol::error::ERROR_CODE_BAD_REQUEST;
use nanorpc_common::transport::{Protocol, ServerSideSerializer, WireRequest, WireResponse};
use nanorpc_common::{NanoError, RpcError, ServiceDescriptor, ServiceRegistry};
use tokio::net::TcpListener;

use crate::http_router::HttpRouter;
use crate::listener::Listener;

/// Configuration of an [`HttpListener`].
#[derive(Clone)]
pub struct ListenerOptions {
    /// `host:port` to listen on.
    pub bind_addr: String,
    pub serializer: ServerSideSerializer,
    /// Serve every endpoint under `/<service name>`.
    pub prefix_url_path: bool,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            serializer: Protocol::Json.server_side(),
            prefix_url_path: false,
        }
    }
}

/// Exposes the endpoints of the configured services over HTTP.
pub struct HttpListener {
    opts: ListenerOptions,
    descriptors: Vec<ServiceDescriptor>,
    router: Option<Arc<HttpRouter>>,
}

impl HttpListener {
    /// Creates an uninitialised listener.
    ///
    /// # Arguments
    ///
    /// * `opts` - Bind address, wire protocol and path prefixing
    /// * `descriptors` - The services to expose and their endpoints
    pub fn new(opts: ListenerOptions, descriptors: Vec<ServiceDescriptor>) -> Self {
        Self {
            opts,
            descriptors,
            router: None,
        }
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, NanoError> {
        TcpListener::bind(&self.opts.bind_addr).await.map_err(|e| {
            NanoError::Transport(format!("Failed to bind to {}: {}", self.opts.bind_addr, e))
        })
    }

    /// Serves connections accepted by an already bound socket.
    ///
    /// Tests bind `127.0.0.1:0` themselves and pass the socket here to learn
    /// the port.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), NanoError> {
        let router = self
            .router
            .clone()
            .ok_or_else(|| NanoError::Config("listener is not initialised".into()))?;

        tracing::info!(
            "HTTP listener listening on {}",
            listener
                .local_addr()
                .map_err(|e| NanoError::Transport(format!("Failed to get local address: {}", e)))?
        );

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| NanoError::Transport(format!("Failed to accept connection: {}", e)))?;

            let io = TokioIo::new(stream);
            let router = router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move { Ok::<_, Infallible>(handle_request(&router, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection: {}", err);
                }
            });
        }
    }
}

#[async_trait]
impl Listener for HttpListener {
    fn init(&mut self, registry: &ServiceRegistry) -> Result<(), NanoError> {
        let router = HttpRouter::build(
            registry,
            &self.descriptors,
            self.opts.serializer.clone(),
            self.opts.prefix_url_path,
        )?;
        self.router = Some(Arc::new(router));
        Ok(())
    }

    async fn listen(&self) -> Result<(), NanoError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }
}

/// Reads the whole request and lets the router answer it.
async fn handle_request(router: &HttpRouter, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();

    let wire = match body.collect().await {
        Ok(body) => WireRequest {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers: parts.headers,
            body: body.to_bytes(),
        },
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            let err = RpcError::new(ERROR_CODE_BAD_REQUEST, "error reading request body");
            return into_response(router.encode_error(&err));
        }
    };

    into_response(router.dispatch(wire).await)
}

fn into_response(wire: WireResponse) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(wire.body));
    *resp.status_mut() = wire.status;
    *resp.headers_mut() = wire.headers;
    resp
}
