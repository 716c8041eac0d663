//! nanorpc Client
//!
//! Remote services as local [`Service`](nanorpc_common::Service) values.

pub mod client;

pub use client::{ClientOptions, HttpServiceClient, DEFAULT_REQUEST_TIMEOUT};
