//! Synchronous HTTP request construction and dispatch.
//!
//! # Overview
//! A `Client` holds long-lived defaults (base URL, headers, query,
//! content type, decoder, transport, middleware). A `Builder` accumulates
//! per-request `Options` fluently; the client merges them over its defaults,
//! resolves URL, headers and body, and runs the result through the
//! middleware chain around a pluggable `Doer` transport. The raw result is
//! wrapped in a `Response` bound to a `ResponseDecoder`.
//!
//! # Design
//! - Layering, lowest first: client defaults, builder options, options given
//!   to the final send. Merging never mutates the client.
//! - Body source priority: `BodyProvider`, then explicit body, then "data".
//!   For methods without a body, "data" goes to the query string.
//! - Content type priority: a non-empty provider report, then the explicit
//!   option, then a fixed `Content-Type` header, then the client default.
//! - Dispatch is synchronous. Cancellation and deadlines are carried by a
//!   `Context` on each request.
//! - Invalid input is reported from `build`/`send` before any I/O.

pub mod body;
pub mod builder;
pub mod client;
pub mod config;
pub mod context;
pub mod decoder;
pub mod error;
pub mod global;
pub mod http;
pub mod middleware;
pub mod options;
pub mod response;
pub mod transport;
pub mod types;

pub use body::{BodyProvider, FormBody, JsonBody, ReaderBody};
pub use builder::Builder;
pub use client::{AfterSendFn, BeforeSendFn, Client};
pub use config::ClientConfig;
pub use context::Context;
pub use decoder::ResponseDecoder;
pub use error::{Error, Result};
pub use global::{configure_default_client, default_client, reset_default_client};
pub use crate::http::{Body, RawResponse, Request};
pub use middleware::{from_fn, FnMiddleware, Middleware, Next};
pub use options::{LoggerFn, Options};
pub use response::Response;
pub use transport::{Doer, UreqDoer};
pub use types::{Payload, Values};

pub use ::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
