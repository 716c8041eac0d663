//! HTTP Client Integration Tests
//!
//! These tests put an [`HttpServiceClient`] in front of a real
//! [`HttpListener`] and verify that:
//! - Requests and responses survive the trip for both protocols
//! - Request ids and caller names cross the wire
//! - Remote errors keep their code and message
//! - Local failures (discovery, unknown request types, cancellation) are
//!   reported without touching the network

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyper::Method;
use nanorpc_client::{ClientOptions, HttpServiceClient};
use nanorpc_common::discovery::{DiscoveryError, StaticDiscoverer};
use nanorpc_common::protocol::error::{ERROR_CODE_NOT_FOUND, ERROR_CODE_UNRECOGNIZED_REQUEST};
use nanorpc_common::transport::Protocol;
use nanorpc_common::{
    error_code, Cancellation, ClientExt, Ctx, EndpointDescriptor, FnService, NanoError, Payload,
    RpcError, Service, ServiceDescriptor, ServiceRegistry,
};
use nanorpc_server::{HttpListener, Listener, ListenerOptions};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

const SVC_NAME: &str = "remote_svc";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClientReq {
    s: String,
    i: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClientResp {
    b0: bool,
    b1: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClientGetReq {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClientGetResp {
    s: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClientGetDirReq {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClientSlowReq {}

fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(SVC_NAME)
        .endpoint(
            EndpointDescriptor::new::<ClientReq>(Method::POST, "/")
                .with_request_body()
                .with_response::<ClientResp>(),
        )
        .endpoint(
            EndpointDescriptor::new::<ClientGetReq>(Method::GET, "/").with_response::<ClientGetResp>(),
        )
        .endpoint(EndpointDescriptor::new::<ClientGetDirReq>(Method::GET, "/dir"))
        .endpoint(EndpointDescriptor::new::<ClientSlowReq>(Method::GET, "/slow"))
}

type Seen = Arc<Mutex<Vec<(String, String)>>>;

/// The remote side: records `(req_id, client_name)` of every call.
fn remote_service(seen: Seen) -> FnService {
    FnService::new(SVC_NAME, move |ctx: Ctx, req: Payload| {
        seen.lock()
            .unwrap()
            .push((ctx.req_id.clone(), ctx.client_name.clone()));
        async move {
            if let Some(req) = req.downcast_ref::<ClientReq>() {
                if req.s == "fail" {
                    return Err(RpcError::new("C-MYERROR", "test error").into());
                }
                return Ok(Some(Payload::new(ClientResp {
                    b0: req.i == 0,
                    b1: req.s == "str",
                })));
            }
            if req.is::<ClientGetReq>() {
                return Err(RpcError::new(ERROR_CODE_NOT_FOUND, "nothing here").into());
            }
            if req.is::<ClientSlowReq>() {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok(None)
        }
    })
}

/// Starts a listener and returns its address.
async fn start_remote(protocol: Protocol, prefix_url_path: bool, seen: Seen) -> String {
    let registry = ServiceRegistry::build(vec![Arc::new(remote_service(seen))]).await;
    let mut listener = HttpListener::new(
        ListenerOptions {
            serializer: protocol.server_side(),
            prefix_url_path,
            ..Default::default()
        },
        vec![descriptor()],
    );
    listener.init(&registry).unwrap();

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap().to_string();
    tokio::spawn(async move { listener.serve(tcp).await });
    addr
}

fn remote_client(protocol: Protocol, prefix_url_path: bool, addr: &str) -> HttpServiceClient {
    let mut opts = ClientOptions::new(Arc::new(StaticDiscoverer::new().with(SVC_NAME, addr)));
    opts.serializer = protocol.client_side();
    opts.prefix_url_path = prefix_url_path;
    HttpServiceClient::new(opts, descriptor()).unwrap()
}

async fn check_round_trip(protocol: Protocol, prefix_url_path: bool) {
    let seen = Seen::default();
    let addr = start_remote(protocol, prefix_url_path, seen.clone()).await;
    let clients = ServiceRegistry::test_client_set(vec![Arc::new(remote_client(
        protocol,
        prefix_url_path,
        &addr,
    ))])
    .await;
    let client = clients.lookup_client(SVC_NAME).unwrap();

    let ctx = Ctx::new().with_req_id("TestReqID");
    let resp: ClientResp = client
        .call(
            Some(&ctx),
            ClientReq {
                s: "str".into(),
                i: 42,
            },
        )
        .await
        .unwrap();
    assert_eq!(resp, ClientResp { b0: false, b1: true });

    let resp = client
        .request(Some(&ctx), Payload::new(ClientGetDirReq {}))
        .await
        .unwrap();
    assert!(resp.is_none());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    for (req_id, client_name) in seen.iter() {
        assert_eq!(req_id, "TestReqID");
        assert_eq!(client_name, "test");
    }
}

#[tokio::test]
async fn test_client_json_round_trip() {
    check_round_trip(Protocol::Json, true).await;
}

#[tokio::test]
async fn test_client_json_without_prefix() {
    check_round_trip(Protocol::Json, false).await;
}

#[tokio::test]
async fn test_client_envelope_round_trip() {
    check_round_trip(Protocol::Envelope, true).await;
}

#[tokio::test]
async fn test_client_remote_errors_keep_code_and_message() {
    for protocol in [Protocol::Json, Protocol::Envelope] {
        let addr = start_remote(protocol, false, Seen::default()).await;
        let client = remote_client(protocol, false, &addr);

        let err = client
            .handle(
                &Ctx::new(),
                Payload::new(ClientReq {
                    s: "fail".into(),
                    i: 0,
                }),
            )
            .await
            .unwrap_err();
        let err = err.downcast_ref::<RpcError>().unwrap();
        assert_eq!(err.code(), "C-MYERROR");
        assert_eq!(err.message(), "test error");

        let err = client
            .handle(&Ctx::new(), Payload::new(ClientGetReq {}))
            .await
            .unwrap_err();
        assert_eq!(error_code(&*err), ERROR_CODE_NOT_FOUND);
        assert_eq!(err.to_string(), "nothing here");
    }
}

#[tokio::test]
async fn test_client_unrecognized_request_type() {
    let client = remote_client(Protocol::Json, false, "127.0.0.1:1");
    let err = client
        .handle(&Ctx::new(), Payload::new(42u32))
        .await
        .unwrap_err();
    assert_eq!(error_code(&*err), ERROR_CODE_UNRECOGNIZED_REQUEST);
}

#[tokio::test]
async fn test_client_discovery_failure() {
    let opts = ClientOptions::new(Arc::new(StaticDiscoverer::new()));
    let client = HttpServiceClient::new(opts, descriptor()).unwrap();
    let err = client
        .handle(&Ctx::new(), Payload::new(ClientGetDirReq {}))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DiscoveryError>(),
        Some(DiscoveryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_client_cancellation() {
    let addr = start_remote(Protocol::Json, false, Seen::default()).await;
    let client = remote_client(Protocol::Json, false, &addr);

    let ctx = Ctx::new().with_cancellation(Cancellation::with_timeout(Duration::from_millis(50)));
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.handle(&ctx, Payload::new(ClientSlowReq {})),
    )
    .await
    .expect("cancellation should end the request");

    let err = result.unwrap_err();
    assert!(err.to_string().contains("request cancelled"), "{}", err);
}

#[test]
fn test_client_rejects_duplicate_request_types() {
    let descriptor = descriptor().endpoint(EndpointDescriptor::new::<ClientReq>(Method::PUT, "/put"));
    let opts = ClientOptions::new(Arc::new(StaticDiscoverer::new()));
    let result = HttpServiceClient::new(opts, descriptor);
    assert!(matches!(
        result,
        Err(NanoError::DuplicateRequestType { .. })
    ));
}
