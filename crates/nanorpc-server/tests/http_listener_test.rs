//! HTTP Listener Integration Tests
//!
//! These tests run an [`HttpListener`] on `127.0.0.1:0` and talk to it with
//! reqwest. Tests cover:
//! - Request and response bodies, metadata headers
//! - Endpoints without request body or response type
//! - Error responses and their status codes
//! - Routing failures (404, 405) and the health check
//! - Listener initialisation errors

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use hyper::Method;
use nanorpc_common::protocol::error::{
    ERROR_CODE_BAD_CONTENT_TYPE, ERROR_CODE_NOT_FOUND, ERROR_CODE_SERVER_ERROR,
};
use nanorpc_common::transport::{Protocol, HEADER_CLIENT_NAME, HEADER_REQ_ID, JSON_CONTENT_TYPE};
use nanorpc_common::{
    Ctx, EndpointDescriptor, FnService, NanoError, Payload, RpcError, ServiceDescriptor,
    ServiceRegistry,
};
use nanorpc_server::{HttpListener, Listener, ListenerOptions, HEALTH_CHECK_PATH};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

const SVC_NAME: &str = "test_svc";
const REQ_ID: &str = "TestReqID";
const CLIENT_NAME: &str = "test_client";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ListenReq {
    s: String,
    i: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ListenResp {
    b0: bool,
    b1: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ListenGetReq {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ListenGetResp {
    s: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ListenGetDirReq {}

fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(SVC_NAME)
        .endpoint(
            EndpointDescriptor::new::<ListenReq>(Method::POST, "/")
                .with_request_body()
                .with_response::<ListenResp>(),
        )
        .endpoint(
            EndpointDescriptor::new::<ListenGetReq>(Method::GET, "/").with_response::<ListenGetResp>(),
        )
        .endpoint(EndpointDescriptor::new::<ListenGetDirReq>(Method::GET, "/dir"))
}

/// What the handler saw.
type Seen = Arc<Mutex<Option<(Ctx, Payload)>>>;

/// Starts a listener in the background and returns its base URL.
async fn start(prefix_url_path: bool, svc: FnService) -> String {
    let registry = ServiceRegistry::build(vec![Arc::new(svc)]).await;
    let mut listener = HttpListener::new(
        ListenerOptions {
            prefix_url_path,
            ..Default::default()
        },
        vec![descriptor()],
    );
    listener.init(&registry).unwrap();

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = tcp.local_addr().unwrap();
    tokio::spawn(async move { listener.serve(tcp).await });
    format!("http://{}", addr)
}

/// A service that records its input and answers with `resp`.
fn recording_service(seen: &Seen, resp: fn() -> Option<Payload>) -> FnService {
    let seen = seen.clone();
    FnService::new(SVC_NAME, move |ctx: Ctx, req: Payload| {
        *seen.lock().unwrap() = Some((ctx, req));
        async move { Ok(resp()) }
    })
}

#[tokio::test]
async fn test_listen_req() {
    let seen = Seen::default();
    let base = start(
        true,
        recording_service(&seen, || Some(Payload::new(ListenResp { b0: false, b1: true }))),
    )
    .await;

    let resp = Client::new()
        .post(format!("{}/{}/", base, SVC_NAME))
        .header("Content-Type", JSON_CONTENT_TYPE)
        .header(HEADER_REQ_ID, REQ_ID)
        .header(HEADER_CLIENT_NAME, CLIENT_NAME)
        .body(r#"{"s":"str","i":42}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], JSON_CONTENT_TYPE);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"b0": false, "b1": true}));

    let (ctx, req) = seen.lock().unwrap().take().unwrap();
    assert_eq!(ctx.req_id, REQ_ID);
    assert_eq!(ctx.client_name, CLIENT_NAME);
    assert_eq!(
        req.downcast::<ListenReq>().unwrap(),
        ListenReq {
            s: "str".into(),
            i: 42
        }
    );
}

#[tokio::test]
async fn test_listen_get_req() {
    let seen = Seen::default();
    let base = start(
        true,
        recording_service(&seen, || {
            Some(Payload::new(ListenGetResp {
                s: "get".into(),
            }))
        }),
    )
    .await;

    let resp = Client::new()
        .get(format!("{}/{}/", base, SVC_NAME))
        .header(HEADER_REQ_ID, REQ_ID)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"s": "get"}));

    let (_, req) = seen.lock().unwrap().take().unwrap();
    assert!(req.is::<ListenGetReq>());
}

#[tokio::test]
async fn test_listen_get_dir_req_without_response_type() {
    let seen = Seen::default();
    let base = start(true, recording_service(&seen, || None)).await;

    let resp = Client::new()
        .get(format!("{}/{}/dir", base, SVC_NAME))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.bytes().await.unwrap().is_empty());

    let (ctx, req) = seen.lock().unwrap().take().unwrap();
    assert!(req.is::<ListenGetDirReq>());
    // no request id on the wire, so one was generated
    assert_eq!(ctx.req_id.len(), 32);
}

#[tokio::test]
async fn test_listen_without_prefix_url_path() {
    let seen = Seen::default();
    let base = start(false, recording_service(&seen, || None)).await;

    let resp = Client::new().get(format!("{}/dir", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = Client::new()
        .get(format!("{}/{}/dir", base, SVC_NAME))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], ERROR_CODE_NOT_FOUND);
}

#[tokio::test]
async fn test_listen_method_not_allowed() {
    let seen = Seen::default();
    let base = start(true, recording_service(&seen, || None)).await;

    let resp = Client::new()
        .patch(format!("{}/{}/", base, SVC_NAME))
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body(r#"{"s":"str","i":42}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET, POST");
    assert!(seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_listen_health_check() {
    let seen = Seen::default();
    let base = start(true, recording_service(&seen, || None)).await;

    let resp = Client::new()
        .get(format!("{}{}", base, HEALTH_CHECK_PATH))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_listen_bad_content_type() {
    let seen = Seen::default();
    let base = start(true, recording_service(&seen, || None)).await;

    let resp = Client::new()
        .post(format!("{}/{}/", base, SVC_NAME))
        .header("Content-Type", "text/plain")
        .body(r#"{"s":"str","i":42}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], ERROR_CODE_BAD_CONTENT_TYPE);
    assert!(seen.lock().unwrap().is_none());
}

async fn check_error_response(code: &'static str, expected: StatusCode) {
    let svc = FnService::new(SVC_NAME, move |_ctx: Ctx, _req: Payload| async move {
        Err(RpcError::new(code, "test error").into())
    });
    let base = start(true, svc).await;

    let resp = Client::new()
        .get(format!("{}/{}/", base, SVC_NAME))
        .header(HEADER_REQ_ID, REQ_ID)
        .header(HEADER_CLIENT_NAME, CLIENT_NAME)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), expected);
    assert_eq!(resp.headers()["content-type"], JSON_CONTENT_TYPE);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"code": code, "msg": "test error"}));
}

#[tokio::test]
async fn test_listen_not_found_error_response() {
    check_error_response(ERROR_CODE_NOT_FOUND, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn test_listen_client_error_response() {
    check_error_response("C-MYERROR", StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_listen_server_error_response() {
    check_error_response("S-MYERROR", StatusCode::INTERNAL_SERVER_ERROR).await;
}

#[tokio::test]
async fn test_listen_wrong_response_type() {
    let seen = Seen::default();
    // GET / declares ListenGetResp
    let base = start(
        true,
        recording_service(&seen, || Some(Payload::new(ListenResp::default()))),
    )
    .await;

    let resp = Client::new()
        .get(format!("{}/{}/", base, SVC_NAME))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"code": ERROR_CODE_SERVER_ERROR, "msg": "Internal Server Error"})
    );
}

#[tokio::test]
async fn test_listen_envelope_protocol_rejects_json() {
    let seen = Seen::default();
    let registry = ServiceRegistry::build(vec![Arc::new(recording_service(&seen, || None))]).await;
    let mut listener = HttpListener::new(
        ListenerOptions {
            serializer: Protocol::Envelope.server_side(),
            ..Default::default()
        },
        vec![descriptor()],
    );
    listener.init(&registry).unwrap();
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    tokio::spawn(async move { listener.serve(tcp).await });

    let resp = Client::new()
        .post(format!("http://{}/", addr))
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_listener_init_duplicate_endpoint() {
    let registry = ServiceRegistry::build(vec![Arc::new(recording_service(
        &Seen::default(),
        || None,
    ))])
    .await;
    let descriptor = descriptor().endpoint(EndpointDescriptor::new::<ListenGetDirReq>(Method::GET, "/"));
    let mut listener = HttpListener::new(ListenerOptions::default(), vec![descriptor]);

    let err = listener.init(&registry).unwrap_err();
    assert!(matches!(err, NanoError::DuplicateEndpoint { .. }));
    assert_eq!(err.to_string(), "service test_svc: duplicate endpoint: GET /");
}

#[tokio::test]
async fn test_listener_serve_requires_init() {
    let listener = HttpListener::new(ListenerOptions::default(), vec![descriptor()]);
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    assert!(matches!(listener.serve(tcp).await, Err(NanoError::Config(_))));
}
