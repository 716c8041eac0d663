//! Wiring a demo node
//!
//! A node runs some demo services in process, reaches others over HTTP and
//! exposes a subset of its local services through an [`HttpListener`]. The
//! same services can be spread over processes in any combination:
//!
//! ```text
//! # everything in one process
//! nanorpc serve -l svc1 -l svc2 -l svc3 -l svc4 -e svc2
//!
//! # svc1 in its own process, the rest elsewhere
//! nanorpc serve -b 127.0.0.1:8001 -l svc1
//! nanorpc serve -b 127.0.0.1:8000 -l svc2 -l svc3 -l svc4 -r svc1=127.0.0.1:8001 -e svc2
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use nanorpc_client::{ClientOptions, HttpServiceClient};
use nanorpc_common::discovery::StaticDiscoverer;
use nanorpc_common::transport::Protocol;
use nanorpc_common::{ClientExt, NanoError, Service, ServiceRegistry};
use nanorpc_server::{HttpListener, ListenerOptions};

use crate::api::{self, svc2};
use crate::services;

/// Default port of every demo node.
pub const DEFAULT_PORT: u16 = 8000;

/// Which services a node runs and how it talks to the rest.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: String,
    pub protocol: Protocol,
    /// Serve and call endpoints under `/<service name>`.
    pub prefix_url_path: bool,
    /// Services handled in this process.
    pub local: Vec<String>,
    /// `(service, host:port)` of services handled elsewhere.
    pub remote: Vec<(String, String)>,
    /// Local services reachable through the listener. Empty exposes every
    /// local service.
    pub expose: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            protocol: Protocol::Json,
            prefix_url_path: true,
            local: Vec::new(),
            remote: Vec::new(),
            expose: Vec::new(),
        }
    }
}

/// Parses a `name=host:port` remote service argument.
pub fn parse_remote(arg: &str) -> Result<(String, String), NanoError> {
    match arg.split_once('=') {
        Some((name, addr)) if !name.is_empty() && !addr.is_empty() => {
            Ok((name.to_owned(), addr.to_owned()))
        }
        _ => Err(NanoError::Config(format!(
            "invalid remote service {:?}, expected name=host:port",
            arg
        ))),
    }
}

fn check_known(name: &str) -> Result<(), NanoError> {
    if api::descriptor(name).is_some() {
        Ok(())
    } else {
        Err(NanoError::Config(format!(
            "unknown service {:?}, expected one of {}",
            name,
            api::SERVICE_NAMES.join(", ")
        )))
    }
}

impl NodeConfig {
    /// Checks service names before anything is constructed.
    pub fn validate(&self) -> Result<(), NanoError> {
        let mut seen = HashSet::new();
        let names = self
            .local
            .iter()
            .chain(self.remote.iter().map(|(name, _)| name));
        for name in names {
            check_known(name)?;
            if !seen.insert(name.as_str()) {
                return Err(NanoError::Config(format!(
                    "service {:?} is configured more than once",
                    name
                )));
            }
        }

        for name in &self.expose {
            if !self.local.contains(name) {
                return Err(NanoError::Config(format!(
                    "cannot expose {:?}: not a local service",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Local services followed by HTTP clients of the remote ones.
    pub fn services(&self) -> Result<Vec<Arc<dyn Service>>, NanoError> {
        self.validate()?;

        let mut list = Vec::with_capacity(self.local.len() + self.remote.len());
        for name in &self.local {
            if let Some(svc) = services::by_name(name) {
                list.push(svc);
            }
        }

        let discoverer: StaticDiscoverer = self.remote.iter().cloned().collect();
        let mut opts = ClientOptions::new(Arc::new(discoverer));
        opts.serializer = self.protocol.client_side();
        opts.prefix_url_path = self.prefix_url_path;

        for (name, _) in &self.remote {
            if let Some(descriptor) = api::descriptor(name) {
                list.push(Arc::new(HttpServiceClient::new(opts.clone(), descriptor)?));
            }
        }
        Ok(list)
    }

    /// Builds the registry of this node.
    pub async fn registry(&self) -> Result<ServiceRegistry, NanoError> {
        ServiceRegistry::try_build(self.services()?).await
    }

    /// Creates the (uninitialised) listener of this node.
    pub fn listener(&self) -> HttpListener {
        let exposed = if self.expose.is_empty() {
            &self.local
        } else {
            &self.expose
        };
        let descriptors = exposed.iter().filter_map(|name| api::descriptor(name)).collect();

        HttpListener::new(
            ListenerOptions {
                bind_addr: self.bind_addr.clone(),
                serializer: self.protocol.server_side(),
                prefix_url_path: self.prefix_url_path,
            },
            descriptors,
        )
    }
}

/// The two requests `svc2` serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoRequest {
    Req,
    GetReq,
}

impl std::str::FromStr for DemoRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "req" => Ok(DemoRequest::Req),
            "getreq" => Ok(DemoRequest::GetReq),
            _ => Err(format!("Invalid request type: {:?}", s)),
        }
    }
}

/// Calls `svc2` at `addr` and returns the value it answered with.
pub async fn call_svc2(
    addr: &str,
    protocol: Protocol,
    prefix_url_path: bool,
    req: DemoRequest,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let mut opts = ClientOptions::new(Arc::new(
        StaticDiscoverer::new().with(svc2::NAME, addr),
    ));
    opts.serializer = protocol.client_side();
    opts.prefix_url_path = prefix_url_path;

    let clients = ServiceRegistry::test_client_set(vec![Arc::new(HttpServiceClient::new(
        opts,
        svc2::descriptor(),
    )?)])
    .await;
    let client = clients.lookup_client(svc2::NAME)?;

    match req {
        DemoRequest::Req => {
            let resp: svc2::Resp = client
                .call(
                    None,
                    svc2::Req {
                        param: "param".into(),
                    },
                )
                .await?;
            Ok(resp.value)
        }
        DemoRequest::GetReq => {
            let resp: svc2::GetResp = client.call(None, svc2::GetReq {}).await?;
            Ok(resp.value)
        }
    }
}
