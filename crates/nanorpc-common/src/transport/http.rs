//! HTTP Transport Utilities
//!
//! Serializers work on plain in-memory messages instead of live hyper
//! requests, so they can be tested without sockets and shared by the
//! listener and the remote client:
//!
//! - **[`WireRequest`]**: method, path, headers and the fully read body
//! - **[`WireResponse`]**: status, headers and body
//! - **[`check_content_type`]**: Content-Type negotiation shared by all
//!   serializers

use std::fmt;

use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::{Method, StatusCode};

/// An HTTP request with its body already collected.
#[derive(Debug, Clone, Default)]
pub struct WireRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// An HTTP response with its body already collected.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WireResponse {
    /// Creates a response with no headers and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Returns a header as a string, treating unreadable values as absent.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// A parsed `type/subtype; param=value` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Lowercased `type/subtype`.
    pub essence: String,
    /// The `charset` parameter if present, unquoted.
    pub charset: Option<String>,
}

/// Parses a Content-Type header value.
///
/// # Example
///
/// ```
/// use nanorpc_common::transport::http::parse_media_type;
///
/// let mt = parse_media_type("Application/JSON; charset=\"UTF-8\"").unwrap();
/// assert_eq!(mt.essence, "application/json");
/// assert_eq!(mt.charset.as_deref(), Some("UTF-8"));
/// ```
pub fn parse_media_type(value: &str) -> Result<MediaType, String> {
    let mut parts = value.split(';');
    let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();

    let valid_token = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };
    match essence.split_once('/') {
        Some((main, sub)) if valid_token(main) && valid_token(sub) => {}
        _ => return Err(format!("invalid media type {:?}", essence)),
    }

    let mut charset = None;
    for param in parts {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        let (key, val) = param
            .split_once('=')
            .ok_or_else(|| format!("invalid media type parameter {:?}", param))?;
        let key = key.trim().to_ascii_lowercase();
        let val = val.trim().trim_matches('"');
        if key.is_empty() {
            return Err(format!("invalid media type parameter {:?}", param));
        }
        if key == "charset" {
            charset = Some(val.to_owned());
        }
    }

    Ok(MediaType { essence, charset })
}

/// Reasons a Content-Type header is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTypeError {
    Missing,
    Malformed(String),
    Unsupported(String),
    Charset(String),
}

impl fmt::Display for ContentTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentTypeError::Missing => write!(f, "missing Content-Type header"),
            ContentTypeError::Malformed(ct) => write!(f, "error parsing Content-Type: {:?}", ct),
            ContentTypeError::Unsupported(ct) => write!(f, "unsupported Content-Type: {:?}", ct),
            ContentTypeError::Charset(cs) => write!(f, "unsupported charset: {}", cs),
        }
    }
}

/// Checks that the Content-Type header names `essence`.
///
/// With `utf8_only` set, a charset parameter is allowed only if it is
/// `utf-8` (case-insensitive).
pub fn check_content_type(
    headers: &HeaderMap,
    essence: &str,
    utf8_only: bool,
) -> Result<(), ContentTypeError> {
    let ct = match header_str(headers, CONTENT_TYPE.as_str()) {
        Some(ct) if !ct.is_empty() => ct,
        _ => return Err(ContentTypeError::Missing),
    };
    let media_type =
        parse_media_type(ct).map_err(|_| ContentTypeError::Malformed(ct.to_owned()))?;
    if media_type.essence != essence {
        return Err(ContentTypeError::Unsupported(ct.to_owned()));
    }
    if utf8_only {
        if let Some(charset) = media_type.charset {
            if !charset.eq_ignore_ascii_case("utf-8") {
                return Err(ContentTypeError::Charset(charset));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(ct: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        headers
    }

    #[test]
    fn test_parse_media_type_plain() {
        let mt = parse_media_type("application/x-postcard").unwrap();
        assert_eq!(mt.essence, "application/x-postcard");
        assert!(mt.charset.is_none());
    }

    #[test]
    fn test_parse_media_type_invalid() {
        assert!(parse_media_type("").is_err());
        assert!(parse_media_type("json").is_err());
        assert!(parse_media_type("application/").is_err());
        assert!(parse_media_type("application/json; charset").is_err());
    }

    #[test]
    fn test_check_content_type_accepts_canonical() {
        let headers = headers_with("application/json; charset=utf-8");
        assert_eq!(check_content_type(&headers, "application/json", true), Ok(()));
    }

    #[test]
    fn test_check_content_type_accepts_missing_charset() {
        let headers = headers_with("application/json");
        assert_eq!(check_content_type(&headers, "application/json", true), Ok(()));
    }

    #[test]
    fn test_check_content_type_rejections() {
        assert_eq!(
            check_content_type(&HeaderMap::new(), "application/json", true),
            Err(ContentTypeError::Missing)
        );
        assert!(matches!(
            check_content_type(&headers_with("text/plain"), "application/json", true),
            Err(ContentTypeError::Unsupported(_))
        ));
        assert!(matches!(
            check_content_type(&headers_with("application/json; charset=latin1"), "application/json", true),
            Err(ContentTypeError::Charset(_))
        ));
        assert!(matches!(
            check_content_type(&headers_with("application json"), "application/json", true),
            Err(ContentTypeError::Malformed(_))
        ));
    }

    #[test]
    fn test_charset_ignored_when_not_utf8_only() {
        let headers = headers_with("application/x-postcard; charset=latin1");
        assert_eq!(check_content_type(&headers, "application/x-postcard", false), Ok(()));
    }
}
