pub mod descriptor;
pub mod error;
pub mod payload;
pub mod status;

#[cfg(test)]
mod tests;

pub use descriptor::{EndpointDescriptor, PayloadType, ServiceDescriptor, WireMessage};
pub use error::{error_code, BoxError, Fault, NanoError, Result, RpcError};
pub use payload::Payload;
pub use status::status_for;
