//! nanorpc Service Runtime
//!
//! # Components
//!
//! - **[`Service`]**: a named handler with optional init hooks
//! - **[`ServiceRegistry`]**: owns the services and runs their two-phase init
//! - **[`ClientSet`]** / **[`Client`]**: owner-scoped access to other services
//! - **[`Ctx`]**: per-call request id, cancellation, callee and caller name
//!
//! A call made through a [`Client`] always:
//!
//! 1. clones the caller's [`Ctx`] (or starts from an empty one),
//! 2. generates a request id if the context has none,
//! 3. derives a child cancellation from the caller's,
//! 4. records the callee and the client's owner name,
//! 5. runs the handler inside a `call` tracing span.

pub mod client;
pub mod context;
pub mod registry;
pub mod request_id;
pub mod service;

pub use client::{
    Client, ClientExt, ClientFactory, LocalClient, LocalClientFactory, NarrowingClientFactory,
};
pub use context::{CancelGuard, Cancellation, Ctx};
pub use registry::{ClientSet, RegistryBuilder, ServiceRegistry, TEST_CLIENT_NAME};
pub use request_id::{IdGenerator, RandomIdGenerator, DEFAULT_REQ_ID_BYTES_LEN};
pub use service::{Capabilities, FnService, HandlerResult, InitFinishedFn, InitFn, Service};
