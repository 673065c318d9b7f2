//! Fluent request builder.
//!
//! # Design
//! A `Builder` owns one `Options` value and forwards every setter onto it.
//! It borrows the client it was started from; a builder created without one
//! sends through a snapshot of the process-wide default client. Terminal
//! calls (`build`, `send`, the `*_do` verbs) consume the builder.

use std::io::Read;
use std::time::Duration;

use bytes::Bytes;
use http::header;
use serde::Serialize;

use crate::body::{BodyProvider, FormBody, JsonBody, ReaderBody};
use crate::client::Client;
use crate::context::Context;
use crate::error::Result;
use crate::global::default_client;
use crate::http::{
    basic_auth, request_to_string, Request, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON,
    CONTENT_TYPE_MULTIPART, CONTENT_TYPE_XML,
};
use crate::options::Options;
use crate::response::Response;
use crate::types::{Payload, Values};

#[derive(Debug, Default)]
pub struct Builder<'a> {
    options: Options,
    client: Option<&'a Client>,
}

impl Builder<'static> {
    /// A builder bound to the default client.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> Builder<'a> {
    pub fn with_client(client: &'a Client) -> Self {
        Self {
            options: Options::new(),
            client: Some(client),
        }
    }

    /// Rebind to another client, keeping accumulated options.
    pub fn client<'b>(self, client: &'b Client) -> Builder<'b> {
        Builder {
            options: self.options,
            client: Some(client),
        }
    }

    fn map(mut self, f: impl FnOnce(Options) -> Options) -> Self {
        self.options = f(self.options);
        self
    }

    pub fn method(self, method: &str) -> Self {
        self.map(|o| o.method(method))
    }

    pub fn target(self, target: impl Into<String>) -> Self {
        self.map(|o| o.target(target))
    }

    /// Merge an options layer over the accumulated one.
    pub fn options(self, options: Options) -> Self {
        self.map(|o| o.merge(options))
    }

    // Query

    pub fn add_query(self, key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.map(|o| o.add_query(key, value))
    }

    pub fn set_query(self, key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.map(|o| o.set_query(key, value))
    }

    pub fn query_params(self, values: impl Into<Values>) -> Self {
        self.map(|o| o.query_values(values))
    }

    pub fn query_serialize<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.map(|o| o.query_serialize(value))
    }

    // Headers

    pub fn add_header(self, key: &str, value: &str) -> Self {
        self.map(|o| o.add_header(key, value))
    }

    pub fn set_header(self, key: &str, value: &str) -> Self {
        self.map(|o| o.set_header(key, value))
    }

    pub fn add_headers<'h>(mut self, headers: impl IntoIterator<Item = (&'h str, &'h str)>) -> Self {
        for (key, value) in headers {
            self.options.push_header(key, value, false);
        }
        self
    }

    pub fn set_headers<'h>(mut self, headers: impl IntoIterator<Item = (&'h str, &'h str)>) -> Self {
        for (key, value) in headers {
            self.options.push_header(key, value, true);
        }
        self
    }

    /// Single-value header applied after all add/set edits.
    pub fn fixed_header(self, key: &str, value: &str) -> Self {
        self.map(|o| o.fixed_header(key, value))
    }

    pub fn user_agent(self, value: &str) -> Self {
        self.set_header(header::USER_AGENT.as_str(), value)
    }

    /// `Authorization` header, sent verbatim.
    pub fn user_auth(self, value: &str) -> Self {
        self.set_header(header::AUTHORIZATION.as_str(), value)
    }

    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        self.user_auth(&basic_auth(username, password))
    }

    /// Raw `Cookie` header, e.g. `a=1; b=2`.
    pub fn cookie_string(self, value: &str) -> Self {
        self.set_header(header::COOKIE.as_str(), value)
    }

    // Content type

    pub fn content_type(self, content_type: impl Into<String>) -> Self {
        self.map(|o| o.content_type(content_type))
    }

    pub fn json_type(self) -> Self {
        self.content_type(CONTENT_TYPE_JSON)
    }

    pub fn xml_type(self) -> Self {
        self.content_type(CONTENT_TYPE_XML)
    }

    pub fn form_type(self) -> Self {
        self.content_type(CONTENT_TYPE_FORM)
    }

    pub fn multipart_type(self) -> Self {
        self.content_type(CONTENT_TYPE_MULTIPART)
    }

    // Body

    /// Explicit body, encoded by the resolved content type.
    pub fn body(self, body: impl Into<Payload>) -> Self {
        self.map(|o| o.body(body))
    }

    pub fn body_provider(self, provider: impl BodyProvider + 'static) -> Self {
        self.map(|o| o.provider(provider))
    }

    pub fn body_reader<R: Read + Send + 'static>(self, reader: R) -> Self {
        self.body_provider(ReaderBody::new(reader))
    }

    pub fn json_body<T: Serialize + Send + 'static>(self, value: T) -> Self {
        self.body_provider(JsonBody::new(value))
    }

    pub fn form_body(self, form: impl Into<Payload>) -> Self {
        self.body_provider(FormBody::new(form))
    }

    pub fn bytes_body(self, bytes: impl Into<Bytes>) -> Self {
        self.body(Payload::Bytes(bytes.into()))
    }

    pub fn string_body(self, text: impl Into<String>) -> Self {
        self.body(Payload::Text(text.into()))
    }

    /// Payload routed to the query string for body-less methods and to the
    /// body otherwise.
    pub fn data(self, data: impl Into<Payload>) -> Self {
        self.map(|o| o.data(data))
    }

    // Request scope

    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|o| o.timeout(timeout))
    }

    pub fn context(self, context: Context) -> Self {
        self.map(|o| o.context(context))
    }

    pub fn logger<F>(self, logger: F) -> Self
    where
        F: Fn(&Request) + Send + Sync + 'static,
    {
        self.map(|o| o.logger(logger))
    }

    // Verb setters

    pub fn get(self, target: &str) -> Self {
        self.method("GET").target(target)
    }

    pub fn post(self, target: &str, data: impl Into<Payload>) -> Self {
        self.method("POST").target(target).body(data)
    }

    pub fn put(self, target: &str, data: impl Into<Payload>) -> Self {
        self.method("PUT").target(target).body(data)
    }

    pub fn patch(self, target: &str, data: impl Into<Payload>) -> Self {
        self.method("PATCH").target(target).body(data)
    }

    pub fn delete(self, target: &str) -> Self {
        self.method("DELETE").target(target)
    }

    // Terminal operations

    /// Materialize the request without sending it.
    pub fn build(self) -> Result<Request> {
        match self.client {
            Some(client) => client.new_request_with_options("", self.options),
            None => default_client().new_request_with_options("", self.options),
        }
    }

    /// Build and render the request for logs.
    pub fn render(self) -> Result<String> {
        self.build().map(|req| request_to_string(&req))
    }

    pub fn send(self) -> Result<Response> {
        match self.client {
            Some(client) => client.send_with_options("", self.options),
            None => default_client().send_with_options("", self.options),
        }
    }

    /// Merge `options` as the highest layer, then send.
    pub fn send_with(self, options: Options) -> Result<Response> {
        self.options(options).send()
    }

    /// Like `send`, but panics on failure.
    pub fn must_send(self) -> Response {
        match self.send() {
            Ok(res) => res,
            Err(err) => panic!("request failed: {err}"),
        }
    }

    pub fn get_do(self, target: &str) -> Result<Response> {
        self.get(target).send()
    }

    pub fn post_do(self, target: &str, data: impl Into<Payload>) -> Result<Response> {
        self.post(target, data).send()
    }

    pub fn put_do(self, target: &str, data: impl Into<Payload>) -> Result<Response> {
        self.put(target, data).send()
    }

    pub fn patch_do(self, target: &str, data: impl Into<Payload>) -> Result<Response> {
        self.patch(target, data).send()
    }

    pub fn delete_do(self, target: &str) -> Result<Response> {
        self.delete(target).send()
    }
}
