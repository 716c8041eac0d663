//! Pluggable wire serializers
//!
//! A protocol variant supplies four independent operations:
//!
//! | Operation                  | Side   | Trait               |
//! |----------------------------|--------|---------------------|
//! | encode request             | client | [`RequestEncoder`]  |
//! | decode request             | server | [`RequestDecoder`]  |
//! | encode response or error   | server | [`ResponseEncoder`] |
//! | decode response or error   | client | [`ResponseDecoder`] |
//!
//! Each side only needs its half, hence [`ClientSideSerializer`] and
//! [`ServerSideSerializer`]. Where the request metadata travels and how the
//! Content-Type is negotiated is up to the concrete protocol.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::protocol::{EndpointDescriptor, Payload, RpcError};
use crate::runtime::Ctx;
use crate::transport::envelope::EnvelopeSerializer;
use crate::transport::http::{WireRequest, WireResponse};
use crate::transport::json::JsonSerializer;

/// Request metadata decoded from the wire before a [`Ctx`] exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub req_id: String,
    pub client_name: String,
}

/// The outcome of a remote call as decoded by the client.
pub type DecodedResponse = std::result::Result<Option<Payload>, RpcError>;

pub trait RequestEncoder: Send + Sync {
    /// Encodes `req` together with the request id and client name of `ctx`.
    fn encode_request(
        &self,
        ep: &EndpointDescriptor,
        ctx: &Ctx,
        req: &Payload,
    ) -> Result<WireRequest, RpcError>;
}

pub trait RequestDecoder: Send + Sync {
    /// Decodes an inbound request. Errors are always classified so they can
    /// be sent back as they are.
    fn decode_request(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireRequest,
    ) -> Result<(Payload, RequestMeta), RpcError>;
}

pub trait ResponseEncoder: Send + Sync {
    /// Encodes a successful handler result. `resp` has already been checked
    /// against the endpoint's declared response type.
    fn encode_response(
        &self,
        ep: &EndpointDescriptor,
        resp: Option<&Payload>,
    ) -> Result<WireResponse, RpcError>;

    /// Encodes a classified error with the status derived from its code.
    fn encode_error(&self, err: &RpcError) -> WireResponse;
}

pub trait ResponseDecoder: Send + Sync {
    /// The outer error means the response couldn't be decoded at all; the
    /// inner one is the error the remote handler returned.
    fn decode_response(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireResponse,
    ) -> Result<DecodedResponse, RpcError>;
}

/// The serializer half used by remote clients.
#[derive(Clone)]
pub struct ClientSideSerializer {
    pub encoder: Arc<dyn RequestEncoder>,
    pub decoder: Arc<dyn ResponseDecoder>,
}

impl ClientSideSerializer {
    pub fn encode_request(
        &self,
        ep: &EndpointDescriptor,
        ctx: &Ctx,
        req: &Payload,
    ) -> Result<WireRequest, RpcError> {
        self.encoder.encode_request(ep, ctx, req)
    }

    pub fn decode_response(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireResponse,
    ) -> Result<DecodedResponse, RpcError> {
        self.decoder.decode_response(ep, wire)
    }
}

/// The serializer half used by listeners.
#[derive(Clone)]
pub struct ServerSideSerializer {
    pub decoder: Arc<dyn RequestDecoder>,
    pub encoder: Arc<dyn ResponseEncoder>,
}

impl ServerSideSerializer {
    pub fn decode_request(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireRequest,
    ) -> Result<(Payload, RequestMeta), RpcError> {
        self.decoder.decode_request(ep, wire)
    }

    pub fn encode_response(
        &self,
        ep: &EndpointDescriptor,
        resp: Option<&Payload>,
    ) -> Result<WireResponse, RpcError> {
        self.encoder.encode_response(ep, resp)
    }

    pub fn encode_error(&self, err: &RpcError) -> WireResponse {
        self.encoder.encode_error(err)
    }
}

/// The built-in protocol variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// JSON body, metadata in `X-Nano-*` headers
    #[default]
    Json,
    /// postcard envelope carrying metadata and payload in the body
    Envelope,
}

impl Protocol {
    pub fn client_side(self) -> ClientSideSerializer {
        match self {
            Protocol::Json => ClientSideSerializer {
                encoder: Arc::new(JsonSerializer),
                decoder: Arc::new(JsonSerializer),
            },
            Protocol::Envelope => ClientSideSerializer {
                encoder: Arc::new(EnvelopeSerializer),
                decoder: Arc::new(EnvelopeSerializer),
            },
        }
    }

    pub fn server_side(self) -> ServerSideSerializer {
        match self {
            Protocol::Json => ServerSideSerializer {
                decoder: Arc::new(JsonSerializer),
                encoder: Arc::new(JsonSerializer),
            },
            Protocol::Envelope => ServerSideSerializer {
                decoder: Arc::new(EnvelopeSerializer),
                encoder: Arc::new(EnvelopeSerializer),
            },
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Json => f.write_str("json"),
            Protocol::Envelope => f.write_str("postcard"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Protocol::Json),
            "postcard" | "envelope" => Ok(Protocol::Envelope),
            other => Err(format!("unknown protocol {:?}, expected json or postcard", other)),
        }
    }
}
