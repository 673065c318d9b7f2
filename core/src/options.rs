//! Per-request options and their merge.
//!
//! # Design
//! `Options` is one merge layer. Headers and query parameters are kept as
//! edit logs so a later layer's "set" still clears values contributed by
//! earlier layers once everything is replayed over the client defaults.
//! Setters never fail: the first invalid input is recorded and returned
//! when the request is built.

use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use crate::body::BodyProvider;
use crate::context::Context;
use crate::error::Error;
use crate::http::{parse_header, parse_method, Request};
use crate::types::{Edits, Payload, Values};

/// Hook called with every fully built request right before dispatch.
pub type LoggerFn = Arc<dyn Fn(&Request) + Send + Sync>;

#[derive(Default)]
pub struct Options {
    pub(crate) method: Option<Method>,
    pub(crate) target: Option<String>,
    pub(crate) headers: Edits<HeaderName, HeaderValue>,
    pub(crate) fixed_headers: HeaderMap,
    pub(crate) query: Edits<String, String>,
    pub(crate) data: Option<Payload>,
    pub(crate) body: Option<Payload>,
    pub(crate) provider: Option<Box<dyn BodyProvider>>,
    pub(crate) content_type: Option<String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) context: Option<Context>,
    pub(crate) logger: Option<LoggerFn>,
    pub(crate) error: Option<Error>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method. Case-insensitive; an empty string leaves it unset.
    pub fn method(mut self, method: &str) -> Self {
        if !method.trim().is_empty() {
            match parse_method(method) {
                Ok(method) => self.method = Some(method),
                Err(err) => self.record(err),
            }
        }
        self
    }

    /// Relative path or absolute URL.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn add_header(mut self, key: &str, value: &str) -> Self {
        self.push_header(key, value, false);
        self
    }

    pub fn set_header(mut self, key: &str, value: &str) -> Self {
        self.push_header(key, value, true);
        self
    }

    /// Single-value header applied after every add/set edit.
    pub fn fixed_header(mut self, key: &str, value: &str) -> Self {
        match parse_header(key, value) {
            Ok((name, value)) => {
                self.fixed_headers.insert(name, value);
            }
            Err(err) => self.record(err),
        }
        self
    }

    pub fn add_query(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.query.add(key.into(), value.to_string());
        self
    }

    pub fn set_query(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.query.set(key.into(), value.to_string());
        self
    }

    /// Append every pair of `values`.
    pub fn query_values(mut self, values: impl Into<Values>) -> Self {
        self.append_query(values.into());
        self
    }

    /// Append the fields of a serializable struct or map.
    pub fn query_serialize<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match Values::from_serialize(value) {
            Ok(values) => self.append_query(values),
            Err(err) => self.record(err),
        }
        self
    }

    /// Generic payload: query string for body-less methods, body otherwise.
    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn body(mut self, body: impl Into<Payload>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn provider(mut self, provider: impl BodyProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Layer `over` on top of `self`. Scalars from `over` win when present;
    /// header and query edits are concatenated in order.
    pub fn merge(mut self, over: Options) -> Options {
        if over.method.is_some() {
            self.method = over.method;
        }
        if over.target.is_some() {
            self.target = over.target;
        }
        self.headers.extend(over.headers);
        for (name, value) in &over.fixed_headers {
            self.fixed_headers.insert(name.clone(), value.clone());
        }
        self.query.extend(over.query);
        if over.data.is_some() {
            self.data = over.data;
        }
        if over.body.is_some() {
            self.body = over.body;
        }
        if over.provider.is_some() {
            self.provider = over.provider;
        }
        if over.content_type.is_some() {
            self.content_type = over.content_type;
        }
        if over.timeout.is_some() {
            self.timeout = over.timeout;
        }
        if over.context.is_some() {
            self.context = over.context;
        }
        if over.logger.is_some() {
            self.logger = over.logger;
        }
        if self.error.is_none() {
            self.error = over.error;
        }
        self
    }

    /// The first setter failure, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub(crate) fn push_header(&mut self, key: &str, value: &str, replace: bool) {
        match parse_header(key, value) {
            Ok((name, value)) if replace => self.headers.set(name, value),
            Ok((name, value)) => self.headers.add(name, value),
            Err(err) => self.record(err),
        }
    }

    pub(crate) fn append_query(&mut self, values: Values) {
        for (key, value) in values.iter() {
            self.query.add(key.to_string(), value.to_string());
        }
    }

    pub(crate) fn record(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("headers", &self.headers)
            .field("fixed_headers", &self.fixed_headers)
            .field("query", &self.query)
            .field("data", &self.data)
            .field("body", &self.body)
            .field("provider", &self.provider.as_ref().map(|p| p.content_type().to_string()))
            .field("content_type", &self.content_type)
            .field("timeout", &self.timeout)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
