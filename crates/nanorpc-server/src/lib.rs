//! nanorpc Server
//!
//! This crate exposes services of a
//! [`ServiceRegistry`](nanorpc_common::ServiceRegistry) over HTTP and runs
//! listeners side by side with [`run_server`].

pub mod http_router;
pub mod http_server;
pub mod listener;

pub use http_router::{HttpRouter, HEALTH_CHECK_PATH};
pub use http_server::{HttpListener, ListenerOptions};
pub use listener::{run_server, Listener};
