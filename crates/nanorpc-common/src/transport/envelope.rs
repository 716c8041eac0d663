//! Binary envelope serializer
//!
//! Every request body is a postcard-encoded [`RequestEnvelope`] that carries
//! the request metadata next to the postcard-encoded request value. The
//! envelope is used whether or not the endpoint declares a request body, so
//! the server always decodes a payload. Responses are the bare encoded value
//! (empty when the endpoint has no response type) and errors are an encoded
//! [`ErrorEnvelope`].
//!
//! Content-Type is strict on both sides: only [`ENVELOPE_CONTENT_TYPE`] is
//! accepted, parameters are ignored.

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::protocol::error::{ERROR_CODE_BAD_CONTENT_TYPE, ERROR_CODE_BAD_REQUEST};
use crate::protocol::{status_for, EndpointDescriptor, Payload, RpcError};
use crate::runtime::Ctx;
use crate::transport::codec::Codec;
use crate::transport::http::{check_content_type, ContentTypeError, WireRequest, WireResponse};
use crate::transport::serializer::{
    DecodedResponse, RequestDecoder, RequestEncoder, RequestMeta, ResponseDecoder,
    ResponseEncoder,
};

pub const ENVELOPE_CONTENT_TYPE: &str = "application/x-postcard";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub req_id: String,
    pub client_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub meta: EnvelopeMeta,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub msg: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeSerializer;

impl RequestEncoder for EnvelopeSerializer {
    fn encode_request(
        &self,
        ep: &EndpointDescriptor,
        ctx: &Ctx,
        req: &Payload,
    ) -> Result<WireRequest, RpcError> {
        let payload = ep
            .request_type
            .encode(Codec::Postcard, req)
            .map_err(|e| RpcError::unclassified("error marshaling request").with_cause(e))?;
        let envelope = RequestEnvelope {
            meta: EnvelopeMeta {
                req_id: ctx.req_id.clone(),
                client_name: ctx.client_name.clone(),
            },
            payload,
        };
        let body = Codec::Postcard
            .encode(&envelope)
            .map_err(|e| RpcError::unclassified("error marshaling request").with_cause(e))?;

        let mut wire = WireRequest {
            method: ep.method.clone(),
            path: ep.path.clone(),
            body: body.into(),
            ..Default::default()
        };
        wire.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(ENVELOPE_CONTENT_TYPE));
        Ok(wire)
    }
}

impl RequestDecoder for EnvelopeSerializer {
    fn decode_request(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireRequest,
    ) -> Result<(Payload, RequestMeta), RpcError> {
        check_content_type(&wire.headers, ENVELOPE_CONTENT_TYPE, false).map_err(|e| {
            let msg = match e {
                ContentTypeError::Missing => "missing request Content-Type header".to_owned(),
                ContentTypeError::Malformed(ct) => {
                    format!("error parsing request Content-Type: {:?}", ct)
                }
                ContentTypeError::Unsupported(ct) | ContentTypeError::Charset(ct) => {
                    format!("unsupported request Content-Type: {:?}", ct)
                }
            };
            RpcError::new(ERROR_CODE_BAD_CONTENT_TYPE, msg)
        })?;

        let envelope: RequestEnvelope = Codec::Postcard.decode(&wire.body).map_err(|e| {
            RpcError::new(ERROR_CODE_BAD_REQUEST, "error unmarshaling request envelope")
                .with_cause(e)
        })?;
        let req = ep
            .request_type
            .decode(Codec::Postcard, &envelope.payload)
            .map_err(|e| {
                RpcError::new(
                    ERROR_CODE_BAD_REQUEST,
                    format!("error unmarshaling request of type {}", ep.request_type.name()),
                )
                .with_cause(e)
            })?;

        let meta = RequestMeta {
            req_id: envelope.meta.req_id,
            client_name: envelope.meta.client_name,
        };
        Ok((req, meta))
    }
}

impl ResponseEncoder for EnvelopeSerializer {
    fn encode_response(
        &self,
        ep: &EndpointDescriptor,
        resp: Option<&Payload>,
    ) -> Result<WireResponse, RpcError> {
        let body = match (ep.response_type, resp) {
            (Some(resp_type), Some(resp)) => resp_type
                .encode(Codec::Postcard, resp)
                .map_err(|e| RpcError::unclassified("error marshaling response").with_cause(e))?,
            _ => Vec::new(),
        };
        Ok(WireResponse::new(StatusCode::OK)
            .with_content_type(ENVELOPE_CONTENT_TYPE)
            .with_body(body))
    }

    fn encode_error(&self, err: &RpcError) -> WireResponse {
        let envelope = ErrorEnvelope {
            code: err.code().to_owned(),
            msg: err.to_string(),
        };
        let body = Codec::Postcard.encode(&envelope).unwrap_or_default();
        WireResponse::new(status_for(err.code()))
            .with_content_type(ENVELOPE_CONTENT_TYPE)
            .with_body(body)
    }
}

impl ResponseDecoder for EnvelopeSerializer {
    fn decode_response(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireResponse,
    ) -> Result<DecodedResponse, RpcError> {
        check_content_type(&wire.headers, ENVELOPE_CONTENT_TYPE, false).map_err(|e| match e {
            ContentTypeError::Missing => {
                RpcError::unclassified("missing response Content-Type header")
            }
            ContentTypeError::Malformed(ct) => {
                RpcError::unclassified(format!("error parsing response Content-Type: {:?}", ct))
            }
            ContentTypeError::Unsupported(ct) | ContentTypeError::Charset(ct) => {
                RpcError::unclassified(format!("unsupported response Content-Type: {:?}", ct))
            }
        })?;

        if !wire.status.is_success() {
            let err: ErrorEnvelope = Codec::Postcard.decode(&wire.body).map_err(|e| {
                RpcError::unclassified("error unmarshaling error response").with_cause(e)
            })?;
            return Ok(Err(RpcError::new(err.code, err.msg)));
        }

        match ep.response_type {
            None if wire.body.is_empty() => Ok(Ok(None)),
            None => Err(RpcError::unclassified("unexpected response body")),
            Some(resp_type) => {
                let resp = resp_type.decode(Codec::Postcard, &wire.body).map_err(|e| {
                    RpcError::unclassified("error unmarshaling response").with_cause(e)
                })?;
                Ok(Ok(Some(resp)))
            }
        }
    }
}
