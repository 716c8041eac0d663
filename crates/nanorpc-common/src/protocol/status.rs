//! Error code to HTTP status mapping
//!
//! This table is part of the wire contract: clients and servers built from
//! different versions must agree on it, so it only ever grows.
//!
//! | Code                  | Status |
//! |-----------------------|--------|
//! | `C-BAD-REQUEST`       | 400    |
//! | `C-NOT-FOUND`         | 404    |
//! | `C-BAD-CONTENT-TYPE`  | 415    |
//! | any other `C-` code   | 400    |
//! | anything else         | 500    |

use hyper::StatusCode;

use super::error::{
    CLIENT_ERROR_PREFIX, ERROR_CODE_BAD_CONTENT_TYPE, ERROR_CODE_BAD_REQUEST, ERROR_CODE_NOT_FOUND,
};

/// Returns the HTTP status that carries an error with the given code.
///
/// # Example
///
/// ```
/// use nanorpc_common::protocol::status::status_for;
/// use hyper::StatusCode;
///
/// assert_eq!(status_for("C-NOT-FOUND"), StatusCode::NOT_FOUND);
/// assert_eq!(status_for("C-MYERROR"), StatusCode::BAD_REQUEST);
/// assert_eq!(status_for(""), StatusCode::INTERNAL_SERVER_ERROR);
/// ```
pub fn status_for(code: &str) -> StatusCode {
    match code {
        ERROR_CODE_BAD_REQUEST => StatusCode::BAD_REQUEST,
        ERROR_CODE_NOT_FOUND => StatusCode::NOT_FOUND,
        ERROR_CODE_BAD_CONTENT_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ if code.starts_with(CLIENT_ERROR_PREFIX) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
