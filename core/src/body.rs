//! Request body providers.

use std::io::Read;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::http::{Body, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON};
use crate::types::Payload;

/// Produces a request body together with its content type.
pub trait BodyProvider: Send {
    /// Content type of the produced body. An empty string means
    /// "unspecified" and lets option or client defaults apply.
    fn content_type(&self) -> &str;

    fn into_body(self: Box<Self>) -> Result<Body>;
}

/// Passes an existing stream through unchanged.
pub struct ReaderBody {
    reader: Box<dyn Read + Send>,
}

impl ReaderBody {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }
}

impl BodyProvider for ReaderBody {
    fn content_type(&self) -> &str {
        ""
    }

    fn into_body(self: Box<Self>) -> Result<Body> {
        Ok(Body::Reader(self.reader))
    }
}

/// Serializes a value as JSON.
pub struct JsonBody<T> {
    payload: T,
}

impl<T: Serialize + Send> JsonBody<T> {
    pub fn new(payload: T) -> Self {
        Self { payload }
    }
}

impl<T: Serialize + Send> BodyProvider for JsonBody<T> {
    fn content_type(&self) -> &str {
        CONTENT_TYPE_JSON
    }

    fn into_body(self: Box<Self>) -> Result<Body> {
        serde_json::to_vec(&self.payload)
            .map(Body::from)
            .map_err(Error::EncodeJson)
    }
}

/// Form-encodes a key/value map, or passes an already-encoded string.
pub struct FormBody {
    payload: Payload,
}

impl FormBody {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl BodyProvider for FormBody {
    fn content_type(&self) -> &str {
        CONTENT_TYPE_FORM
    }

    fn into_body(self: Box<Self>) -> Result<Body> {
        match self.payload {
            Payload::Values(values) => Ok(Body::from(values.encode())),
            Payload::Text(encoded) => Ok(Body::from(encoded)),
            Payload::Reader(_) | Payload::Bytes(_) | Payload::Structured(_) => Err(
                Error::UnsupportedPayload("form body accepts a key/value map or an encoded string"),
            ),
        }
    }
}
