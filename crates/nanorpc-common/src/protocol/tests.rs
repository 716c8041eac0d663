//! Tests for the protocol module
//!
//! These tests cover status mapping, payload type identity and descriptor
//! response checks.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::protocol::error::{
        ERROR_CODE_BAD_CONTENT_TYPE, ERROR_CODE_BAD_REQUEST, ERROR_CODE_NOT_FOUND,
        ERROR_CODE_SERVER_ERROR,
    };
    use crate::transport::codec::Codec;
    use hyper::{Method, StatusCode};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Req {
        param: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Resp {
        value: String,
    }

    #[test]
    fn test_status_for_well_known_codes() {
        assert_eq!(status_for(ERROR_CODE_BAD_REQUEST), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ERROR_CODE_NOT_FOUND), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ERROR_CODE_BAD_CONTENT_TYPE),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_status_for_prefixes() {
        assert_eq!(status_for("C-MYERROR"), StatusCode::BAD_REQUEST);
        assert_eq!(status_for("S-MYERROR"), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ERROR_CODE_SERVER_ERROR), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(""), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for("MYERROR"), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_payload_downcast_mismatch_returns_payload() {
        let payload = Payload::new(Req { param: "x".into() });
        let payload = payload.downcast::<Resp>().unwrap_err();
        assert!(payload.is::<Req>());
        assert_eq!(payload.downcast_ref::<Req>().unwrap().param, "x");
    }

    #[test]
    fn test_payload_type_identity() {
        let req_type = PayloadType::of::<Req>();
        assert_eq!(req_type, PayloadType::of::<Req>());
        assert_ne!(req_type, PayloadType::of::<Resp>());
        assert!(req_type.matches(&Payload::new(Req::default())));
        assert!(!req_type.matches(&Payload::new(Resp::default())));
    }

    #[test]
    fn test_payload_type_encode_rejects_foreign_payload() {
        let req_type = PayloadType::of::<Req>();
        let result = req_type.encode(Codec::Json, &Payload::new(Resp::default()));
        assert!(matches!(result, Err(NanoError::PayloadMismatch { .. })));
    }

    #[test]
    fn test_payload_type_default() {
        let payload = PayloadType::of::<Req>().default_payload();
        assert_eq!(payload.downcast::<Req>().unwrap(), Req::default());
    }

    #[test]
    fn test_accepts_response() {
        let with_resp = EndpointDescriptor::new::<Req>(Method::POST, "/").with_response::<Resp>();
        assert!(with_resp.accepts_response(Some(&Payload::new(Resp::default()))));
        assert!(!with_resp.accepts_response(Some(&Payload::new(Req::default()))));
        assert!(!with_resp.accepts_response(None));

        let without_resp = EndpointDescriptor::new::<Req>(Method::GET, "/");
        assert!(without_resp.accepts_response(None));
        assert!(!without_resp.accepts_response(Some(&Payload::new(Resp::default()))));
    }

    #[test]
    fn test_endpoint_for_request() {
        let descriptor = ServiceDescriptor::new("svc")
            .endpoint(EndpointDescriptor::new::<Req>(Method::POST, "/req").with_request_body())
            .endpoint(EndpointDescriptor::new::<Resp>(Method::GET, "/resp"));

        let ep = descriptor.endpoint_for(&Payload::new(Resp::default())).unwrap();
        assert_eq!(ep.path, "/resp");
        assert!(descriptor.endpoint_for(&Payload::new(42u8)).is_none());
    }
}
