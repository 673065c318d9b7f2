//! Error types for request construction, dispatch and decoding.
//!
//! # Design
//! Build-time failures (bad URL, unencodable body, unsupported payload,
//! invalid method or header) abort before any transport is touched.
//! Transport and decode failures wrap the underlying error unchanged so
//! callers can downcast or print the parser's own message.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building, sending or decoding a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The resolved target (base URL + path + query) is not a valid URL.
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The method token is not a valid HTTP method.
    #[error("invalid method `{0}`")]
    InvalidMethod(String),

    /// A header name or value could not be parsed.
    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    /// A structured value could not be flattened into query parameters.
    #[error("invalid query parameters: {0}")]
    InvalidQuery(#[source] serde_urlencoded::ser::Error),

    /// The payload could not be serialized to JSON.
    #[error("failed to encode JSON body: {0}")]
    EncodeJson(#[source] serde_json::Error),

    /// The payload could not be serialized as a form.
    #[error("failed to encode form body: {0}")]
    EncodeForm(#[source] serde_urlencoded::ser::Error),

    /// The payload variant is not accepted by the selected encoding.
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(&'static str),

    /// The `http` request constructor rejected the method/target combination.
    #[error("failed to construct request: {0}")]
    Request(#[from] http::Error),

    /// The transport failed. The source is the transport's own error.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// The request deadline expired before the transport was called.
    #[error("request deadline exceeded")]
    Timeout,

    /// The request context was cancelled before the transport was called.
    #[error("request canceled")]
    Canceled,

    /// The response body is not valid JSON for the destination type.
    #[error(transparent)]
    DecodeJson(serde_json::Error),

    /// The response body is not valid XML for the destination type.
    #[error(transparent)]
    DecodeXml(quick_xml::DeError),

    /// The response body was already consumed or closed.
    #[error("response body already consumed")]
    BodyConsumed,

    /// Reading a body stream failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any transport failure without altering it.
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport(Box::new(err))
    }

    /// True for failures raised while building the request, before any I/O.
    pub fn is_build(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl { .. }
                | Error::InvalidMethod(_)
                | Error::InvalidHeader(_)
                | Error::InvalidQuery(_)
                | Error::EncodeJson(_)
                | Error::EncodeForm(_)
                | Error::UnsupportedPayload(_)
                | Error::Request(_)
        )
    }

    /// True when the request context expired or was cancelled.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Timeout | Error::Canceled)
    }
}
