//! Messages and HTTP endpoints of the demo services
//!
//! Each service module holds its request/response types and the
//! [`ServiceDescriptor`] shared by the service's listener and by remote
//! clients of the service.
//!
//! | Service | Endpoint   | Request  | Response  |
//! |---------|------------|----------|-----------|
//! | svc1    | `POST /`   | `Req`    | `Resp`    |
//! | svc2    | `POST /`   | `Req`    | `Resp`    |
//! | svc2    | `GET /`    | `GetReq` | `GetResp` |
//! | svc3    | `POST /`   | `Req`    | `Resp`    |
//! | svc4    | `POST /`   | `Req`    | `Resp`    |

use hyper::Method;
use nanorpc_common::{EndpointDescriptor, ServiceDescriptor};

/// Names of every demo service.
pub const SERVICE_NAMES: [&str; 4] = [svc1::NAME, svc2::NAME, svc3::NAME, svc4::NAME];

/// Looks up the descriptor of a demo service.
pub fn descriptor(name: &str) -> Option<ServiceDescriptor> {
    match name {
        svc1::NAME => Some(svc1::descriptor()),
        svc2::NAME => Some(svc2::descriptor()),
        svc3::NAME => Some(svc3::descriptor()),
        svc4::NAME => Some(svc4::descriptor()),
        _ => None,
    }
}

/// A service whose only endpoint is `POST /` taking `Req` and answering `Resp`.
macro_rules! param_service {
    ($module:ident) => {
        pub mod $module {
            use super::*;
            use serde::{Deserialize, Serialize};

            pub const NAME: &str = stringify!($module);

            #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
            pub struct Req {
                pub param: String,
            }

            #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
            pub struct Resp {
                pub value: String,
            }

            pub fn descriptor() -> ServiceDescriptor {
                ServiceDescriptor::new(NAME).endpoint(
                    EndpointDescriptor::new::<Req>(Method::POST, "/")
                        .with_request_body()
                        .with_response::<Resp>(),
                )
            }
        }
    };
}

param_service!(svc1);
param_service!(svc3);
param_service!(svc4);

pub mod svc2 {
    use super::*;
    use serde::{Deserialize, Serialize};

    pub const NAME: &str = "svc2";

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Req {
        pub param: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Resp {
        pub value: String,
    }

    /// Travels without a body.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GetReq {}

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GetResp {
        pub value: String,
    }

    pub fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new(NAME)
            .endpoint(
                EndpointDescriptor::new::<Req>(Method::POST, "/")
                    .with_request_body()
                    .with_response::<Resp>(),
            )
            .endpoint(EndpointDescriptor::new::<GetReq>(Method::GET, "/").with_response::<GetResp>())
    }
}
