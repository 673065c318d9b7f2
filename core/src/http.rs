//! Transport-facing request and response types.
//!
//! # Design
//! Requests and raw responses reuse the `http` crate's containers so a
//! `Doer` can hand them to any transport without conversion. Only the body
//! is defined here: it is absent, fully buffered, or a one-shot reader.
//!
//! Header names stored in an `http::HeaderMap` are lowercased on insertion,
//! which gives case-insensitive keys for every merge layer.

use std::fmt;
use std::io::{self, Cursor, Read};

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::error::{Error, Result};

/// A fully built request, ready for the middleware chain.
pub type Request = http::Request<Body>;

/// A response as returned by a `Doer`, before it is bound to a decoder.
pub type RawResponse = http::Response<Body>;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_MULTIPART: &str = "multipart/form-data";

/// Request or response body.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Reader(Box<dyn Read + Send>),
}

impl Body {
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Body::Reader(Box::new(reader))
    }

    /// True when the body is known to carry no bytes. Readers are never
    /// considered empty since their length is unknown.
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(bytes) => bytes.is_empty(),
            Body::Reader(_) => false,
        }
    }

    /// Buffered content, if any. `None` for readers.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Empty => Some(&[][..]),
            Body::Bytes(bytes) => Some(bytes.as_ref()),
            Body::Reader(_) => None,
        }
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Body::Empty => Box::new(io::empty()),
            Body::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Body::Reader(reader) => reader,
        }
    }

    /// Drain the body into memory.
    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(bytes).finish(),
            Body::Reader(_) => f.write_str("Body::Reader(..)"),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::Bytes(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Bytes(Bytes::from(value))
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(value.as_bytes()))
    }
}

/// Methods that carry a request body. Every other method routes "data"
/// payloads into the query string.
pub fn allows_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Parse a method token case-insensitively. The result is uppercase.
pub fn parse_method(method: &str) -> Result<Method> {
    let upper = method.trim().to_ascii_uppercase();
    Method::from_bytes(upper.as_bytes()).map_err(|_| Error::InvalidMethod(method.to_string()))
}

pub(crate) fn parse_header(key: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidHeader(key.to_string()))?;
    let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(key.to_string()))?;
    Ok((name, value))
}

/// `Basic <base64(user:pass)>`.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64_STANDARD.encode(format!("{username}:{password}")))
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `application/json` or any `+json` suffix type.
pub fn is_json_type(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == CONTENT_TYPE_JSON || essence.ends_with("+json")
}

pub fn is_form_type(content_type: &str) -> bool {
    essence(content_type) == CONTENT_TYPE_FORM
}

/// One header per line, multiple values joined with `;`.
pub(crate) fn headers_to_string(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for name in headers.keys() {
        let values: Vec<_> = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(&values.join(";"));
        out.push('\n');
    }
    out
}

/// Render a request for logs: request line, headers and, when buffered, the
/// body. Not a wire-exact serialization.
pub fn request_to_string(req: &Request) -> String {
    let mut out = format!("{} {} {:?}\n", req.method(), req.uri(), req.version());
    out.push_str(&headers_to_string(req.headers()));
    match req.body() {
        Body::Empty => {}
        Body::Bytes(bytes) if bytes.is_empty() => {}
        Body::Bytes(bytes) => {
            out.push('\n');
            out.push_str(&String::from_utf8_lossy(bytes));
        }
        Body::Reader(_) => out.push_str("\n<streamed body>"),
    }
    out
}
