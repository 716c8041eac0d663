//! HTTP Router for nanorpc Listeners
//!
//! This module maps `(method, path)` pairs onto service endpoints and runs
//! the per-request pipeline.
//!
//! # Architecture
//!
//! For every inbound request the router:
//! - Looks up the route. Unknown paths get a classified `C-NOT-FOUND`,
//!   known paths with another method get `405` with an `Allow` header
//! - Decodes the request; decode errors are sent back right away
//! - Calls the service through the registry's client factory, with the
//!   decoded request id and the caller's name as owner
//! - Checks the response against the endpoint's declared response type
//! - Encodes the response, or the narrowed error
//!
//! `GET /health-check` is always routed and answers `200` with an empty body.

use std::collections::HashMap;
use std::sync::Arc;

use hyper::header::{HeaderValue, ALLOW};
use hyper::{Method, StatusCode};
use nanorpc_common::protocol::error::ERROR_CODE_NOT_FOUND;
use nanorpc_common::transport::{ServerSideSerializer, WireRequest, WireResponse};
use nanorpc_common::{
    ClientFactory, Ctx, EndpointDescriptor, NanoError, Payload, RpcError, Service,
    ServiceDescriptor, ServiceRegistry,
};

pub const HEALTH_CHECK_PATH: &str = "/health-check";

struct RouteEndpoint {
    service: Arc<dyn Service>,
    endpoint: EndpointDescriptor,
}

enum Route {
    HealthCheck,
    Endpoint(RouteEndpoint),
}

/// Routing table plus everything needed to serve a request. Immutable once
/// built.
pub struct HttpRouter {
    routes: HashMap<String, HashMap<Method, Route>>,
    serializer: ServerSideSerializer,
    factory: Arc<dyn ClientFactory>,
}

impl HttpRouter {
    /// Builds the routing table for the given services.
    ///
    /// # Arguments
    ///
    /// * `registry` - Resolves service names and provides the client factory
    /// * `descriptors` - The services and endpoints to expose
    /// * `serializer` - Server side of the wire protocol
    /// * `prefix_url_path` - Serve every endpoint under `/<service name>`
    ///
    /// # Errors
    ///
    /// [`NanoError::ServiceNotFound`] for an unknown service and
    /// [`NanoError::DuplicateEndpoint`] when two endpoints share a method and
    /// path.
    pub fn build(
        registry: &ServiceRegistry,
        descriptors: &[ServiceDescriptor],
        serializer: ServerSideSerializer,
        prefix_url_path: bool,
    ) -> Result<Self, NanoError> {
        let mut routes: HashMap<String, HashMap<Method, Route>> = HashMap::new();
        routes
            .entry(HEALTH_CHECK_PATH.to_owned())
            .or_default()
            .insert(Method::GET, Route::HealthCheck);

        for descriptor in descriptors {
            let service = registry.lookup_service(&descriptor.service_name)?;

            for endpoint in &descriptor.endpoints {
                let path = if prefix_url_path {
                    format!("/{}{}", descriptor.service_name, endpoint.path)
                } else {
                    endpoint.path.clone()
                };

                let methods = routes.entry(path.clone()).or_default();
                if methods.contains_key(&endpoint.method) {
                    return Err(NanoError::DuplicateEndpoint {
                        service: descriptor.service_name.clone(),
                        endpoint: format!("{} {}", endpoint.method, path),
                    });
                }
                tracing::debug!(
                    service = %descriptor.service_name,
                    method = %endpoint.method,
                    path = %path,
                    "registered endpoint"
                );
                methods.insert(
                    endpoint.method.clone(),
                    Route::Endpoint(RouteEndpoint {
                        service: service.clone(),
                        endpoint: endpoint.clone(),
                    }),
                );
            }
        }

        Ok(Self {
            routes,
            serializer,
            factory: registry.client_factory().clone(),
        })
    }

    /// Serves one request. Every failure is turned into a response.
    pub async fn dispatch(&self, req: WireRequest) -> WireResponse {
        let Some(methods) = self.routes.get(&req.path) else {
            tracing::warn!(method = %req.method, path = %req.path, "no route");
            return self.serializer.encode_error(&RpcError::new(
                ERROR_CODE_NOT_FOUND,
                format!("not found: {}", req.path),
            ));
        };

        match methods.get(&req.method) {
            Some(Route::HealthCheck) => WireResponse::new(StatusCode::OK),
            Some(Route::Endpoint(route)) => self.call(route, req).await,
            None => method_not_allowed(methods),
        }
    }

    /// Encodes an error that occurred before routing.
    pub fn encode_error(&self, err: &RpcError) -> WireResponse {
        self.serializer.encode_error(err)
    }

    async fn call(&self, route: &RouteEndpoint, req: WireRequest) -> WireResponse {
        let (payload, meta) = match self.serializer.decode_request(&route.endpoint, &req) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(
                    service = route.service.name(),
                    code = err.code(),
                    error = %err,
                    "error deserialising request"
                );
                return self.serializer.encode_error(&err);
            }
        };

        let ctx = Ctx::new().with_req_id(meta.req_id);
        let client = self
            .factory
            .new_client(route.service.clone(), &meta.client_name);

        let resp = match client.request(Some(&ctx), payload).await {
            Ok(resp) => resp,
            Err(err) => return self.serializer.encode_error(&RpcError::narrow(&*err)),
        };

        if !route.endpoint.accepts_response(resp.as_ref()) {
            tracing::error!(
                service = route.service.name(),
                got = resp.as_ref().map(Payload::type_name).unwrap_or("none"),
                want = route.endpoint.response_type_name(),
                "service returned a response of unexpected type"
            );
            return self.serializer.encode_error(&RpcError::server_error());
        }

        match self.serializer.encode_response(&route.endpoint, resp.as_ref()) {
            Ok(wire) => wire,
            Err(err) => {
                tracing::error!(service = route.service.name(), error = %err, "error serialising response");
                self.serializer.encode_error(&RpcError::server_error())
            }
        }
    }
}

fn method_not_allowed(methods: &HashMap<Method, Route>) -> WireResponse {
    let mut allowed: Vec<&str> = methods.keys().map(Method::as_str).collect();
    allowed.sort_unstable();

    let mut resp = WireResponse::new(StatusCode::METHOD_NOT_ALLOWED);
    if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
        resp.headers.insert(ALLOW, value);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanorpc_common::protocol::error::{ERROR_CODE_BAD_REQUEST, ERROR_CODE_SERVER_ERROR};
    use nanorpc_common::transport::{Protocol, HEADER_CLIENT_NAME, HEADER_REQ_ID};
    use nanorpc_common::FnService;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Req {
        param: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Resp {
        value: String,
    }

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new("svc1").endpoint(
            EndpointDescriptor::new::<Req>(Method::POST, "/")
                .with_request_body()
                .with_response::<Resp>(),
        )
    }

    fn post(path: &str, body: &'static str) -> WireRequest {
        let mut req = WireRequest {
            method: Method::POST,
            path: path.into(),
            body: body.into(),
            ..Default::default()
        };
        req.headers.insert(
            hyper::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        req
    }

    async fn router_for(svc: FnService, prefix: bool) -> HttpRouter {
        let registry = ServiceRegistry::build(vec![Arc::new(svc)]).await;
        HttpRouter::build(&registry, &[descriptor()], Protocol::Json.server_side(), prefix).unwrap()
    }

    fn svc1() -> FnService {
        FnService::new("svc1", |_ctx: Ctx, req: Payload| async move {
            let req = req.downcast::<Req>().map_err(|_| "bad request type")?;
            Ok(Some(Payload::new(Resp {
                value: format!("svc1_{}", req.param),
            })))
        })
    }

    #[tokio::test]
    async fn test_dispatch_calls_service() {
        let router = router_for(svc1(), false).await;
        let resp = router.dispatch(post("/", r#"{"param":"hello"}"#)).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(&resp.body[..], br#"{"value":"svc1_hello"}"#);
    }

    #[tokio::test]
    async fn test_dispatch_prefixed_path() {
        let router = router_for(svc1(), true).await;
        assert_eq!(
            router.dispatch(post("/svc1/", r#"{"param":"x"}"#)).await.status,
            StatusCode::OK
        );
        assert_eq!(
            router.dispatch(post("/", r#"{"param":"x"}"#)).await.status,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_dispatch_passes_meta_to_handler() {
        let seen = Arc::new(Mutex::new(None));
        let svc = {
            let seen = seen.clone();
            FnService::new("svc1", move |ctx: Ctx, _req: Payload| {
                *seen.lock().unwrap() = Some((ctx.req_id.clone(), ctx.client_name.clone()));
                async move { Ok(Some(Payload::new(Resp::default()))) }
            })
        };
        let router = router_for(svc, false).await;

        let mut req = post("/", r#"{"param":"x"}"#);
        req.headers.insert(HEADER_REQ_ID, HeaderValue::from_static("rid-1"));
        req.headers.insert(HEADER_CLIENT_NAME, HeaderValue::from_static("svc2"));
        router.dispatch(req).await;

        let (req_id, client_name) = seen.lock().unwrap().take().unwrap();
        assert_eq!(req_id, "rid-1");
        assert_eq!(client_name, "svc2");
    }

    #[tokio::test]
    async fn test_health_check_and_method_not_allowed() {
        let router = router_for(svc1(), false).await;

        let health = router
            .dispatch(WireRequest {
                method: Method::GET,
                path: HEALTH_CHECK_PATH.into(),
                ..Default::default()
            })
            .await;
        assert_eq!(health.status, StatusCode::OK);
        assert!(health.body.is_empty());

        let resp = router
            .dispatch(WireRequest {
                method: Method::GET,
                path: "/".into(),
                ..Default::default()
            })
            .await;
        assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers.get(ALLOW).unwrap(), "POST");
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn test_decode_error_skips_handler() {
        let router = router_for(svc1(), false).await;
        let resp = router.dispatch(post("/", "{broken")).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["code"], ERROR_CODE_BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_response_type_is_server_error() {
        let svc = FnService::new("svc1", |_ctx: Ctx, _req: Payload| async move {
            Ok(Some(Payload::new(String::from("not a Resp"))))
        });
        let router = router_for(svc, false).await;
        let resp = router.dispatch(post("/", r#"{"param":"x"}"#)).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["code"], ERROR_CODE_SERVER_ERROR);
        assert_eq!(body["msg"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_duplicate_endpoint_rejected() {
        let registry = ServiceRegistry::build(vec![Arc::new(svc1())]).await;
        let descriptor = descriptor().endpoint(EndpointDescriptor::new::<Resp>(Method::POST, "/"));
        let result = HttpRouter::build(&registry, &[descriptor], Protocol::Json.server_side(), false);
        assert!(matches!(result, Err(NanoError::DuplicateEndpoint { .. })));
    }

    #[tokio::test]
    async fn test_unknown_service_rejected() {
        let registry = ServiceRegistry::build(vec![]).await;
        let result = HttpRouter::build(&registry, &[descriptor()], Protocol::Json.server_side(), false);
        assert!(matches!(result, Err(NanoError::ServiceNotFound(_))));
    }
}
