//! nanorpc Common Types, Runtime and Wire Protocols
//!
//! This crate provides the service runtime and the protocol layer shared by
//! every nanorpc component: servers, remote clients and tests.
//!
//! # Overview
//!
//! nanorpc lets a set of named services call each other through a uniform
//! request/response contract. A call looks the same whether the target lives
//! in the same process or behind an HTTP listener in another one:
//!
//! - **Protocol Layer**: payloads, endpoint descriptors, classified errors and
//!   the error code to HTTP status mapping
//! - **Runtime Layer**: the [`Service`] trait, the two-phase initialised
//!   [`ServiceRegistry`], clients and per-call request contexts
//! - **Transport Layer**: pluggable serializers (JSON with metadata headers,
//!   postcard envelope with metadata in the body)
//! - **Discovery**: resolving service names into `host:port` addresses
//!
//! # Components
//!
//! - [`protocol`] - Payloads, descriptors, errors and status codes
//! - [`runtime`] - Services, registry, clients and request contexts
//! - [`transport`] - Wire serializers and HTTP helpers
//! - [`discovery`] - The [`Discoverer`](discovery::Discoverer) collaborator
//!
//! # Example
//!
//! ```no_run
//! use nanorpc_common::{Ctx, FnService, Payload, ServiceRegistry};
//!
//! # async fn example() {
//! let echo = FnService::new("echo", |_ctx: Ctx, req: Payload| async move { Ok(Some(req)) });
//! let clients = ServiceRegistry::test_client_set(vec![std::sync::Arc::new(echo)]).await;
//! let client = clients.lookup_client("echo").unwrap();
//! let resp = client.request(None, Payload::new(42u32)).await.unwrap();
//! # }
//! ```

pub mod discovery;
pub mod protocol;
pub mod runtime;
pub mod transport;

pub use protocol::*;
pub use runtime::*;
