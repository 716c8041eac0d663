//! Error types for nanorpc
//!
//! Two kinds of errors live here:
//!
//! - [`NanoError`]: startup, configuration and transport failures reported to
//!   the code that builds registries, listeners and remote clients.
//! - [`RpcError`]: a classified error carrying a code. Handlers produce it
//!   freely and the transport maps its code onto an HTTP status.
//!
//! # Error Codes
//!
//! A code is either empty (unclassified), starts with [`CLIENT_ERROR_PREFIX`]
//! (the caller is at fault) or with [`SERVER_ERROR_PREFIX`] (the callee is at
//! fault). Handlers may invent their own codes, e.g. `"C-MYERROR"`, and still
//! get classified correctly by the transport.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Arbitrary error value returned by handlers and hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Prefix of codes that blame the caller.
pub const CLIENT_ERROR_PREFIX: &str = "C-";
/// Prefix of codes that blame the callee.
pub const SERVER_ERROR_PREFIX: &str = "S-";

/// The request payload couldn't be decoded.
pub const ERROR_CODE_BAD_REQUEST: &str = "C-BAD-REQUEST";
/// The requested resource or service doesn't exist.
pub const ERROR_CODE_NOT_FOUND: &str = "C-NOT-FOUND";
/// The request Content-Type is missing or not supported.
pub const ERROR_CODE_BAD_CONTENT_TYPE: &str = "C-BAD-CONTENT-TYPE";
/// Generic internal error.
pub const ERROR_CODE_SERVER_ERROR: &str = "S-ERROR";
/// A service received a payload type it doesn't handle.
pub const ERROR_CODE_UNRECOGNIZED_REQUEST: &str = "S-UNRECOGNIZED-REQUEST";

/// Separator between an error message and the message of its cause.
pub const ERR_MSG_CHAIN_SEPARATOR: &str = " :: ";

/// Startup, configuration and transport errors.
#[derive(Error, Debug)]
pub enum NanoError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] postcard::Error),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("error initialising service {service:?} :: {source}")]
    ServiceInit {
        service: String,
        #[source]
        source: BoxError,
    },

    #[error("InitFinished error in service {service:?} :: {source}")]
    ServiceInitFinished {
        service: String,
        #[source]
        source: BoxError,
    },

    #[error("service {service}: duplicate endpoint: {endpoint}")]
    DuplicateEndpoint { service: String, endpoint: String },

    #[error("service {service}: multiple endpoints have the same request type: {type_name}")]
    DuplicateRequestType {
        service: String,
        type_name: &'static str,
    },

    #[error("expected payload of type {expected}, got {actual}")]
    PayloadMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, NanoError>;

/// Who is to blame for an error, derived from its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Caller,
    Callee,
    Unclassified,
}

impl Fault {
    /// Classifies an error code by its prefix.
    pub fn of(code: &str) -> Self {
        if code.starts_with(CLIENT_ERROR_PREFIX) {
            Fault::Caller
        } else if code.starts_with(SERVER_ERROR_PREFIX) {
            Fault::Callee
        } else {
            Fault::Unclassified
        }
    }
}

/// A classified error.
///
/// Only `(code, message)` survives a trip through the wire. The optional
/// cause is in-process detail: it shows up in [`Display`](fmt::Display) and
/// [`source`](StdError::source) but is dropped by [`RpcError::narrow`].
///
/// # Example
///
/// ```
/// use nanorpc_common::protocol::error::{RpcError, Fault};
///
/// let err = RpcError::new("C-MYERROR", "test error");
/// assert_eq!(err.code(), "C-MYERROR");
/// assert_eq!(err.fault(), Fault::Caller);
/// ```
#[derive(Debug)]
pub struct RpcError {
    code: String,
    message: String,
    cause: Option<BoxError>,
}

impl RpcError {
    /// Creates a classified error without a cause.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Creates an error with an empty code.
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::new("", message)
    }

    /// The generic error sent instead of details the caller must not see.
    pub fn server_error() -> Self {
        Self::new(ERROR_CODE_SERVER_ERROR, "Internal Server Error")
    }

    /// Returned by handlers that received a payload type they don't handle.
    pub fn unrecognized_request(type_name: &str) -> Self {
        Self::new(
            ERROR_CODE_UNRECOGNIZED_REQUEST,
            format!("unrecognized request type: {}", type_name),
        )
    }

    /// Attaches a cause. An empty code is inherited from the cause when the
    /// cause is itself classified.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        let cause = cause.into();
        if self.code.is_empty() {
            self.code = error_code(&*cause).to_owned();
        }
        self.cause = Some(cause);
        self
    }

    /// Reduces any error to the two fields the wire preserves.
    pub fn narrow(err: &(dyn StdError + 'static)) -> Self {
        Self::new(error_code(err), err.to_string())
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// The message without the cause chain.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fault(&self) -> Fault {
        Fault::of(&self.code)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, "{}{}", ERR_MSG_CHAIN_SEPARATOR, cause)?;
        }
        Ok(())
    }
}

impl StdError for RpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Returns the code of a classified error, or `""` for anything else.
pub fn error_code<'a>(err: &'a (dyn StdError + 'static)) -> &'a str {
    err.downcast_ref::<RpcError>()
        .map(RpcError::code)
        .unwrap_or("")
}
