//! nanorpc Transport Layer
//!
//! This module turns typed request and response values into HTTP messages
//! and back.
//!
//! # Architecture
//!
//! - **Codec**: serde_json or postcard encoding of single values
//! - **Wire messages**: [`WireRequest`] / [`WireResponse`] with fully read bodies
//! - **Serializers**: protocol variants split into a client-side half
//!   (encode request, decode response) and a server-side half (decode
//!   request, encode response or error)
//!
//! # Components
//!
//! - **[`Codec`]**: Encode/decode values with serde
//! - **[`JsonSerializer`]**: JSON bodies, metadata in `X-Nano-*` headers
//! - **[`EnvelopeSerializer`]**: postcard envelope carrying metadata and payload
//! - **[`Protocol`]**: selects a serializer by name
//!
//! # Example
//!
//! ```
//! use nanorpc_common::protocol::{EndpointDescriptor, Payload};
//! use nanorpc_common::runtime::Ctx;
//! use nanorpc_common::transport::Protocol;
//! use hyper::Method;
//!
//! let ep = EndpointDescriptor::new::<String>(Method::POST, "/")
//!     .with_request_body()
//!     .with_response::<String>();
//! let ctx = Ctx::new().with_req_id("abc");
//!
//! let client = Protocol::Json.client_side();
//! let server = Protocol::Json.server_side();
//!
//! let wire = client.encode_request(&ep, &ctx, &Payload::new(String::from("hi"))).unwrap();
//! let (req, meta) = server.decode_request(&ep, &wire).unwrap();
//! assert_eq!(req.downcast::<String>().unwrap(), "hi");
//! assert_eq!(meta.req_id, "abc");
//! ```

pub mod codec;
pub mod envelope;
pub mod http;
pub mod json;
pub mod serializer;

pub use codec::Codec;
pub use envelope::{EnvelopeSerializer, ENVELOPE_CONTENT_TYPE};
pub use http::{WireRequest, WireResponse};
pub use json::{JsonSerializer, HEADER_CLIENT_NAME, HEADER_REQ_ID, JSON_CONTENT_TYPE};
pub use serializer::{
    ClientSideSerializer, DecodedResponse, Protocol, RequestDecoder, RequestEncoder,
    RequestMeta, ResponseDecoder, ResponseEncoder, ServerSideSerializer,
};
