//! JSON serializer
//!
//! Request and response values travel as JSON bodies with the
//! `application/json; charset=utf-8` Content-Type. The request id and the
//! client name travel in the [`HEADER_REQ_ID`] and [`HEADER_CLIENT_NAME`]
//! headers. Errors are sent as an [`ErrorResponse`] body with the status
//! derived from the error code.

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::protocol::{status_for, EndpointDescriptor, Payload, RpcError};
use crate::protocol::error::{ERROR_CODE_BAD_CONTENT_TYPE, ERROR_CODE_BAD_REQUEST};
use crate::runtime::Ctx;
use crate::transport::codec::Codec;
use crate::transport::http::{check_content_type, header_str, ContentTypeError, WireRequest, WireResponse};
use crate::transport::serializer::{
    DecodedResponse, RequestDecoder, RequestEncoder, RequestMeta, ResponseDecoder,
    ResponseEncoder,
};

pub const HEADER_REQ_ID: &str = "X-Nano-Req-Id";
pub const HEADER_CLIENT_NAME: &str = "X-Nano-Client-Name";

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const JSON_ESSENCE: &str = "application/json";

/// Body of a JSON error response. Empty fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl RequestEncoder for JsonSerializer {
    fn encode_request(
        &self,
        ep: &EndpointDescriptor,
        ctx: &Ctx,
        req: &Payload,
    ) -> Result<WireRequest, RpcError> {
        let mut wire = WireRequest {
            method: ep.method.clone(),
            path: ep.path.clone(),
            ..Default::default()
        };

        if ep.has_request_body {
            let body = ep.request_type.encode(Codec::Json, req).map_err(|e| {
                RpcError::unclassified("error marshaling request").with_cause(e)
            })?;
            wire.body = body.into();
            wire.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        insert_meta_header(&mut wire, HEADER_REQ_ID, &ctx.req_id)?;
        insert_meta_header(&mut wire, HEADER_CLIENT_NAME, &ctx.client_name)?;
        Ok(wire)
    }
}

fn insert_meta_header(wire: &mut WireRequest, name: &'static str, value: &str) -> Result<(), RpcError> {
    if value.is_empty() {
        return Ok(());
    }
    let value = HeaderValue::from_str(value).map_err(|e| {
        RpcError::unclassified(format!("invalid {} header value", name)).with_cause(e)
    })?;
    wire.headers.insert(name, value);
    Ok(())
}

impl RequestDecoder for JsonSerializer {
    fn decode_request(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireRequest,
    ) -> Result<(Payload, RequestMeta), RpcError> {
        let req = if ep.has_request_body {
            check_content_type(&wire.headers, JSON_ESSENCE, true).map_err(|e| {
                let msg = match e {
                    ContentTypeError::Missing => "missing request Content-Type header".to_owned(),
                    ContentTypeError::Malformed(ct) => {
                        format!("error parsing request Content-Type: {:?}", ct)
                    }
                    ContentTypeError::Unsupported(ct) => {
                        format!("unsupported request Content-Type: {:?}", ct)
                    }
                    ContentTypeError::Charset(cs) => {
                        format!("unsupported request json charset: {}", cs)
                    }
                };
                RpcError::new(ERROR_CODE_BAD_CONTENT_TYPE, msg)
            })?;
            ep.request_type
                .decode(Codec::Json, &wire.body)
                .map_err(|e| {
                    RpcError::new(
                        ERROR_CODE_BAD_REQUEST,
                        format!("error unmarshaling request of type {}", ep.request_type.name()),
                    )
                    .with_cause(e)
                })?
        } else if !wire.body.is_empty() {
            return Err(RpcError::new(ERROR_CODE_BAD_REQUEST, "unexpected request content"));
        } else {
            ep.request_type.default_payload()
        };

        let meta = RequestMeta {
            req_id: header_str(&wire.headers, HEADER_REQ_ID)
                .unwrap_or_default()
                .to_owned(),
            client_name: header_str(&wire.headers, HEADER_CLIENT_NAME)
                .unwrap_or_default()
                .to_owned(),
        };
        Ok((req, meta))
    }
}

impl ResponseEncoder for JsonSerializer {
    fn encode_response(
        &self,
        ep: &EndpointDescriptor,
        resp: Option<&Payload>,
    ) -> Result<WireResponse, RpcError> {
        let (Some(resp_type), Some(resp)) = (ep.response_type, resp) else {
            return Ok(WireResponse::new(StatusCode::OK));
        };
        let body = resp_type
            .encode(Codec::Json, resp)
            .map_err(|e| RpcError::unclassified("error marshaling response").with_cause(e))?;
        Ok(WireResponse::new(StatusCode::OK)
            .with_content_type(JSON_CONTENT_TYPE)
            .with_body(body))
    }

    fn encode_error(&self, err: &RpcError) -> WireResponse {
        let body = ErrorResponse {
            code: err.code().to_owned(),
            msg: err.to_string(),
        };
        // Two plain strings always serialize.
        let body = serde_json::to_vec(&body).unwrap_or_default();
        WireResponse::new(status_for(err.code()))
            .with_content_type(JSON_CONTENT_TYPE)
            .with_body(body)
    }
}

impl ResponseDecoder for JsonSerializer {
    fn decode_response(
        &self,
        ep: &EndpointDescriptor,
        wire: &WireResponse,
    ) -> Result<DecodedResponse, RpcError> {
        let success = wire.status.is_success();

        if ep.response_type.is_some() {
            check_content_type(&wire.headers, JSON_ESSENCE, true).map_err(|e| match e {
                ContentTypeError::Missing | ContentTypeError::Unsupported(_) if !success => {
                    RpcError::unclassified(format!("HTTP status: {}", wire.status))
                }
                ContentTypeError::Missing => {
                    RpcError::unclassified("missing response Content-Type header")
                }
                ContentTypeError::Malformed(ct) => {
                    RpcError::unclassified(format!("error parsing response Content-Type: {:?}", ct))
                }
                ContentTypeError::Unsupported(ct) => {
                    RpcError::unclassified(format!("unsupported response Content-Type: {:?}", ct))
                }
                ContentTypeError::Charset(cs) => {
                    RpcError::unclassified(format!("unsupported response json charset: {}", cs))
                }
            })?;
        }

        if !success {
            let err: ErrorResponse = serde_json::from_slice(&wire.body).map_err(|e| {
                RpcError::unclassified("error unmarshaling error response").with_cause(e)
            })?;
            return Ok(Err(RpcError::new(err.code, err.msg)));
        }

        match ep.response_type {
            Some(resp_type) => {
                let resp = resp_type.decode(Codec::Json, &wire.body).map_err(|e| {
                    RpcError::unclassified("error unmarshaling response").with_cause(e)
                })?;
                Ok(Ok(Some(resp)))
            }
            None if !wire.body.is_empty() => {
                Err(RpcError::unclassified("unexpected response content"))
            }
            None => Ok(Ok(None)),
        }
    }
}
