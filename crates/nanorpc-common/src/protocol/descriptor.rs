//! Endpoint and service descriptors
//!
//! Descriptors are static configuration shared by both sides of a transport:
//! the listener uses them to route and decode inbound requests, the remote
//! client uses them to pick the HTTP method and path for an outgoing request.
//! Both sides must be built from the same descriptors, since message types
//! are matched by [`TypeId`].
//!
//! # Example
//!
//! ```
//! use nanorpc_common::protocol::{EndpointDescriptor, ServiceDescriptor};
//! use hyper::Method;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Req { param: String }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Resp { value: String }
//!
//! let descriptor = ServiceDescriptor::new("svc1").endpoint(
//!     EndpointDescriptor::new::<Req>(Method::POST, "/")
//!         .with_request_body()
//!         .with_response::<Resp>(),
//! );
//! assert_eq!(descriptor.endpoints.len(), 1);
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;

use hyper::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{NanoError, Result};
use super::payload::Payload;
use crate::transport::codec::Codec;

/// Message types that can travel through a transport.
///
/// `Default` provides the value of requests that carry no body.
pub trait WireMessage: Serialize + DeserializeOwned + Default + Any + Send + Sync {}

impl<T> WireMessage for T where T: Serialize + DeserializeOwned + Default + Any + Send + Sync {}

/// Identity of a message type plus the functions that (de)serialize it.
#[derive(Clone, Copy)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
    encode: fn(Codec, &Payload) -> Result<Vec<u8>>,
    decode: fn(Codec, &[u8]) -> Result<Payload>,
    default: fn() -> Payload,
}

impl PayloadType {
    pub fn of<T: WireMessage>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            encode: encode_payload::<T>,
            decode: decode_payload::<T>,
            default: default_payload::<T>,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the payload holds a value of this type.
    pub fn matches(&self, payload: &Payload) -> bool {
        payload.value_type_id() == self.id
    }

    pub fn encode(&self, codec: Codec, payload: &Payload) -> Result<Vec<u8>> {
        (self.encode)(codec, payload)
    }

    pub fn decode(&self, codec: Codec, data: &[u8]) -> Result<Payload> {
        (self.decode)(codec, data)
    }

    pub fn default_payload(&self) -> Payload {
        (self.default)()
    }
}

impl PartialEq for PayloadType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PayloadType {}

impl fmt::Debug for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn encode_payload<T: WireMessage>(codec: Codec, payload: &Payload) -> Result<Vec<u8>> {
    let value = payload
        .downcast_ref::<T>()
        .ok_or_else(|| NanoError::PayloadMismatch {
            expected: type_name::<T>(),
            actual: payload.type_name(),
        })?;
    codec.encode(value)
}

fn decode_payload<T: WireMessage>(codec: Codec, data: &[u8]) -> Result<Payload> {
    Ok(Payload::new(codec.decode::<T>(data)?))
}

fn default_payload<T: WireMessage>() -> Payload {
    Payload::new(T::default())
}

/// Maps one request type of a service to an HTTP method and path.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub method: Method,
    /// Path relative to the service, e.g. `/`.
    pub path: String,
    /// Whether the request value travels in the body. Without a body the
    /// server hands the handler `Default::default()` of the request type.
    pub has_request_body: bool,
    pub request_type: PayloadType,
    /// `None` means the handler answers with no response value.
    pub response_type: Option<PayloadType>,
}

impl EndpointDescriptor {
    /// Creates an endpoint without request body and without response value.
    pub fn new<Req: WireMessage>(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            has_request_body: false,
            request_type: PayloadType::of::<Req>(),
            response_type: None,
        }
    }

    pub fn with_request_body(mut self) -> Self {
        self.has_request_body = true;
        self
    }

    pub fn with_response<Resp: WireMessage>(mut self) -> Self {
        self.response_type = Some(PayloadType::of::<Resp>());
        self
    }

    /// Checks a handler result against the declared response type.
    pub fn accepts_response(&self, resp: Option<&Payload>) -> bool {
        match (&self.response_type, resp) {
            (None, None) => true,
            (Some(expected), Some(resp)) => expected.matches(resp),
            _ => false,
        }
    }

    /// Declared response type name for log messages.
    pub fn response_type_name(&self) -> &'static str {
        self.response_type.map(|t| t.name()).unwrap_or("none")
    }
}

/// The endpoints of one service.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub service_name: String,
    pub endpoints: Vec<EndpointDescriptor>,
}

impl ServiceDescriptor {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            endpoints: Vec::new(),
        }
    }

    pub fn endpoint(mut self, endpoint: EndpointDescriptor) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Finds the endpoint that accepts the given request payload.
    pub fn endpoint_for(&self, req: &Payload) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|ep| ep.request_type.matches(req))
    }
}
