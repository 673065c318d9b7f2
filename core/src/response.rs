//! Response wrapper bound to a decoder.
//!
//! # Design
//! The body is a one-shot resource held in an `Option`. Every consuming call
//! takes it out, so the stream is dropped (closed) exactly once whether the
//! consumer succeeds or fails, and any later consumer gets `BodyConsumed`
//! instead of stale or empty data.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;

use crate::decoder::ResponseDecoder;
use crate::error::{Error, Result};
use crate::http::{headers_to_string, is_json_type, Body, RawResponse};

pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Option<Body>,
    decoder: ResponseDecoder,
}

impl Response {
    pub fn new(raw: RawResponse, decoder: ResponseDecoder) -> Self {
        let (parts, body) = raw.into_parts();
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body: Some(body),
            decoder,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of header `key`, empty when missing or not valid text.
    pub fn header(&self, key: &str) -> &str {
        self.headers
            .get(key)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    /// Status is exactly 200.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Status is in `[200, 300)`.
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// Status is anything but exactly 200. A 201 is both successful and a
    /// failure under this definition.
    pub fn is_fail(&self) -> bool {
        !self.is_ok()
    }

    /// The declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }

    /// True when the response is known to carry no body bytes.
    pub fn is_empty_body(&self) -> bool {
        match self.content_length() {
            Some(len) => len == 0,
            None => self.body.as_ref().map_or(true, Body::is_empty),
        }
    }

    pub fn content_type(&self) -> &str {
        self.header(http::header::CONTENT_TYPE.as_str())
    }

    /// Case-insensitive prefix match on the `Content-Type` header.
    pub fn is_content_type(&self, prefix: &str) -> bool {
        self.content_type()
            .to_ascii_lowercase()
            .starts_with(&prefix.to_ascii_lowercase())
    }

    pub fn is_json_type(&self) -> bool {
        is_json_type(self.content_type())
    }

    pub fn decoder(&self) -> ResponseDecoder {
        self.decoder
    }

    pub fn set_decoder(&mut self, decoder: ResponseDecoder) -> &mut Self {
        self.decoder = decoder;
        self
    }

    /// Decode the body with the bound decoder. The body is consumed and
    /// closed whatever the outcome.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<T> {
        let body = self.body.take().ok_or(Error::BodyConsumed)?;
        self.decoder.decode(body.into_reader())
    }

    /// Buffer the whole body.
    pub fn body_bytes(&mut self) -> Result<Bytes> {
        let body = self.body.take().ok_or(Error::BodyConsumed)?;
        Ok(body.into_bytes()?)
    }

    /// Buffer the body as text, replacing invalid UTF-8.
    pub fn body_string(&mut self) -> Result<String> {
        let bytes = self.body_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn header_string(&self) -> String {
        headers_to_string(&self.headers)
    }

    /// Consumes the body: renders status line, headers and body for logs,
    /// after which `decode` returns `BodyConsumed`. A body that was already
    /// consumed renders as absent.
    pub fn render(&mut self) -> String {
        let mut out = format!("{:?} {}\n", self.version, self.status);
        out.push_str(&self.header_string());
        if let Ok(body) = self.body_string() {
            if !body.is_empty() {
                out.push('\n');
                out.push_str(&body);
            }
        }
        out
    }

    /// Drop the body without reading it. Safe to call repeatedly.
    pub fn close_body(&mut self) {
        self.body.take();
    }

    /// Take the raw body, leaving the response consumed.
    pub fn into_body(mut self) -> Result<Body> {
        self.body.take().ok_or(Error::BodyConsumed)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("consumed", &self.body.is_none())
            .field("decoder", &self.decoder)
            .finish()
    }
}
