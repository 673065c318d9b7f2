//! Client defaults, request materialization and dispatch.
//!
//! # Design
//! A `Client` holds long-lived defaults and never mutates them while
//! building a request: every merge starts from a clone of the defaults and
//! replays the per-request edit logs on top. Dispatch composes the
//! middleware chain from the current list on every call, then runs it
//! synchronously around the transport.
//!
//! Layer precedence, lowest first: client defaults, builder options, options
//! passed to the final send call.

use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::{header, HeaderMap, HeaderValue, Method};

use crate::body::BodyProvider;
use crate::builder::Builder;
use crate::config::ClientConfig;
use crate::context::{CancelOnDrop, Context, TimeoutScope};
use crate::decoder::ResponseDecoder;
use crate::error::{Error, Result};
use crate::http::{allows_body, basic_auth, parse_header, parse_method, Body, Request};
use crate::middleware::{Middleware, Next};
use crate::options::{LoggerFn, Options};
use crate::response::Response;
use crate::transport::{Doer, UreqDoer};
use crate::types::{Payload, Values};

/// Hook run on every request before it enters the middleware chain.
pub type BeforeSendFn = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// Hook run with the outcome of every dispatch.
pub type AfterSendFn = Arc<dyn Fn(&Result<Response>) + Send + Sync>;

/// Request extension carrying the per-request logger hook.
#[derive(Clone)]
pub(crate) struct RequestLogger(pub(crate) LoggerFn);

#[derive(Clone)]
pub struct Client {
    doer: Arc<dyn Doer>,
    middlewares: Vec<Arc<dyn Middleware>>,
    before_send: Option<BeforeSendFn>,
    after_send: Option<AfterSendFn>,
    method: Method,
    base_url: String,
    headers: HeaderMap,
    query: Values,
    content_type: Option<String>,
    decoder: ResponseDecoder,
    timeout: Option<Duration>,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            doer: Arc::new(UreqDoer::new()),
            middlewares: Vec::new(),
            before_send: None,
            after_send: None,
            method: Method::GET,
            base_url: String::new(),
            headers: HeaderMap::new(),
            query: Values::new(),
            content_type: None,
            decoder: ResponseDecoder::default(),
            timeout: None,
        }
    }
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Build a client from deserialized configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut client = Client::new(config.base_url);
        if let Some(method) = config.method {
            client.default_method(&method)?;
        }
        for (key, value) in &config.headers {
            client.default_header(key, value)?;
        }
        client.default_query(config.query);
        if let Some(content_type) = config.content_type {
            client.default_content_type(content_type);
        }
        client.response_decoder(config.decoder);
        if let Some(ms) = config.timeout_ms {
            client.default_timeout(Duration::from_millis(ms));
        }
        Ok(client)
    }

    /// A fresh client sharing this one's transport, base URL, method,
    /// headers and decoder. Middleware, hooks and query are not inherited.
    pub fn sub(&self) -> Client {
        Client {
            doer: self.doer.clone(),
            method: self.method.clone(),
            base_url: self.base_url.clone(),
            headers: self.headers.clone(),
            decoder: self.decoder,
            ..Client::default()
        }
    }

    // Configuration

    pub fn base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = base_url.into();
        self
    }

    pub fn default_method(&mut self, method: &str) -> Result<&mut Self> {
        self.method = parse_method(method)?;
        Ok(self)
    }

    /// Set a default header, replacing earlier values for the key.
    pub fn default_header(&mut self, key: &str, value: &str) -> Result<&mut Self> {
        let (name, value) = parse_header(key, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replace the whole default header map.
    pub fn default_headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.headers = headers;
        self
    }

    /// Append default query parameters.
    pub fn default_query(&mut self, query: impl Into<Values>) -> &mut Self {
        self.query.extend(query.into());
        self
    }

    pub fn default_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        let content_type = content_type.into();
        self.content_type = (!content_type.is_empty()).then_some(content_type);
        self
    }

    pub fn default_user_agent(&mut self, value: &str) -> Result<&mut Self> {
        self.default_header(header::USER_AGENT.as_str(), value)
    }

    /// Default `Authorization` header, sent verbatim.
    pub fn default_user_auth(&mut self, value: &str) -> Result<&mut Self> {
        self.default_header(header::AUTHORIZATION.as_str(), value)
    }

    pub fn default_basic_auth(&mut self, username: &str, password: &str) -> Result<&mut Self> {
        self.default_user_auth(&basic_auth(username, password))
    }

    /// Timeout applied to requests that do not set their own.
    pub fn default_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_decoder(&mut self, decoder: ResponseDecoder) -> &mut Self {
        self.decoder = decoder;
        self
    }

    pub fn doer(&mut self, doer: impl Doer + 'static) -> &mut Self {
        self.doer = Arc::new(doer);
        self
    }

    /// Append a middleware. Earlier registrations wrap later ones.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn on_before_send<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.before_send = Some(Arc::new(hook));
        self
    }

    pub fn on_after_send<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Result<Response>) + Send + Sync + 'static,
    {
        self.after_send = Some(Arc::new(hook));
        self
    }

    /// The configured base URL.
    pub fn base(&self) -> &str {
        &self.base_url
    }

    pub fn decoder(&self) -> ResponseDecoder {
        self.decoder
    }

    // Builder starters

    pub fn builder(&self) -> Builder<'_> {
        Builder::with_client(self)
    }

    pub fn request(&self, method: &str, target: &str) -> Builder<'_> {
        self.builder().method(method).target(target)
    }

    pub fn get(&self, target: &str) -> Builder<'_> {
        self.request("GET", target)
    }

    pub fn post(&self, target: &str) -> Builder<'_> {
        self.request("POST", target)
    }

    pub fn put(&self, target: &str) -> Builder<'_> {
        self.request("PUT", target)
    }

    pub fn patch(&self, target: &str) -> Builder<'_> {
        self.request("PATCH", target)
    }

    pub fn delete(&self, target: &str) -> Builder<'_> {
        self.request("DELETE", target)
    }

    pub fn head(&self, target: &str) -> Builder<'_> {
        self.request("HEAD", target)
    }

    pub fn options(&self, target: &str) -> Builder<'_> {
        self.request("OPTIONS", target)
    }

    pub fn trace(&self, target: &str) -> Builder<'_> {
        self.request("TRACE", target)
    }

    pub fn connect(&self, target: &str) -> Builder<'_> {
        self.request("CONNECT", target)
    }

    pub fn json_type(&self) -> Builder<'_> {
        self.builder().json_type()
    }

    pub fn form_type(&self) -> Builder<'_> {
        self.builder().form_type()
    }

    pub fn user_agent(&self, value: &str) -> Builder<'_> {
        self.builder().user_agent(value)
    }

    pub fn user_auth(&self, value: &str) -> Builder<'_> {
        self.builder().user_auth(value)
    }

    pub fn basic_auth(&self, username: &str, password: &str) -> Builder<'_> {
        self.builder().basic_auth(username, password)
    }

    pub fn query_params(&self, values: impl Into<Values>) -> Builder<'_> {
        self.builder().query_params(values)
    }

    pub fn body(&self, body: impl Into<Payload>) -> Builder<'_> {
        self.builder().body(body)
    }

    pub fn body_reader<R: Read + Send + 'static>(&self, reader: R) -> Builder<'_> {
        self.builder().body_reader(reader)
    }

    pub fn body_provider(&self, provider: impl BodyProvider + 'static) -> Builder<'_> {
        self.builder().body_provider(provider)
    }

    // Sending

    /// Send with `method` overriding any method in `opts`.
    pub fn send(&self, method: &str, target: &str, opts: Options) -> Result<Response> {
        self.send_with_options(target, opts.method(method))
    }

    /// Like `send`, but panics on failure.
    pub fn must_send(&self, method: &str, target: &str, opts: Options) -> Response {
        match self.send(method, target, opts) {
            Ok(res) => res,
            Err(err) => panic!("{method} {target} failed: {err}"),
        }
    }

    pub fn get_do(&self, target: &str, opts: Options) -> Result<Response> {
        self.send("GET", target, opts)
    }

    pub fn post_do(&self, target: &str, data: impl Into<Payload>, opts: Options) -> Result<Response> {
        self.send("POST", target, Options::new().body(data).merge(opts))
    }

    pub fn put_do(&self, target: &str, data: impl Into<Payload>, opts: Options) -> Result<Response> {
        self.send("PUT", target, Options::new().body(data).merge(opts))
    }

    pub fn patch_do(&self, target: &str, data: impl Into<Payload>, opts: Options) -> Result<Response> {
        self.send("PATCH", target, Options::new().body(data).merge(opts))
    }

    pub fn delete_do(&self, target: &str, opts: Options) -> Result<Response> {
        self.send("DELETE", target, opts)
    }

    pub fn head_do(&self, target: &str, opts: Options) -> Result<Response> {
        self.send("HEAD", target, opts)
    }

    /// Build from `opts` and dispatch. An empty `target` falls back to the
    /// target stored in `opts`.
    pub fn send_with_options(&self, target: &str, opts: Options) -> Result<Response> {
        let req = self.new_request_with_options(target, opts)?;
        self.send_request(req)
    }

    /// Run a built request through hooks, middleware and the transport.
    pub fn send_request(&self, mut req: Request) -> Result<Response> {
        // Per-request timeout scopes end with the dispatch.
        let _scope = req
            .extensions()
            .get::<TimeoutScope>()
            .map(|scope| CancelOnDrop(scope.0.clone()));

        if let Some(hook) = &self.before_send {
            hook(&mut req);
        }
        if let Some(RequestLogger(logger)) = req.extensions().get::<RequestLogger>().cloned() {
            logger(&req);
        }

        let method = req.method().clone();
        let uri = req.uri().clone();
        tracing::debug!(%method, %uri, middlewares = self.middlewares.len(), "dispatching request");

        let reached = AtomicBool::new(false);
        let terminal = |req: Request| -> Result<Response> {
            reached.store(true, Ordering::Relaxed);
            if let Some(err) = req.extensions().get::<Context>().and_then(Context::err) {
                return Err(err);
            }
            let raw = self.doer.do_request(req)?;
            Ok(Response::new(raw, self.decoder))
        };
        let result = Next::new(&self.middlewares, &terminal).run(req);

        if !reached.load(Ordering::Relaxed) {
            tracing::trace!(%method, %uri, "middleware chain short-circuited");
        }
        match &result {
            Ok(res) => tracing::debug!(%method, %uri, status = res.status().as_u16(), "request completed"),
            Err(err) => tracing::warn!(%method, %uri, error = %err, "request failed"),
        }

        if let Some(hook) = &self.after_send {
            hook(&result);
        }
        result
    }

    // Building

    pub fn new_request(&self, method: &str, target: &str, opts: Options) -> Result<Request> {
        self.new_request_with_options(target, opts.method(method))
    }

    /// Merge `opts` over the client defaults and materialize the request.
    /// Fails before any I/O on invalid input.
    pub fn new_request_with_options(&self, target: &str, opts: Options) -> Result<Request> {
        let Options {
            method,
            target: opts_target,
            headers: header_edits,
            fixed_headers,
            query: query_edits,
            data,
            body,
            provider,
            content_type,
            timeout,
            context,
            logger,
            error,
        } = opts;

        if let Some(err) = error {
            return Err(err);
        }

        let target = match target {
            "" => opts_target.unwrap_or_default(),
            target => target.to_string(),
        };
        let method = method.unwrap_or_else(|| self.method.clone());

        let mut headers = self.headers.clone();
        header_edits.apply_to(&mut headers);
        for (name, value) in &fixed_headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut query = self.query.clone();
        query_edits.apply_to(&mut query);

        // A non-empty provider report, then the explicit option, then a
        // fixed header, then the client default.
        let content_type = content_type.filter(|ct| !ct.is_empty());
        let reported = provider
            .as_ref()
            .map(|provider| provider.content_type().to_string())
            .filter(|ct| !ct.is_empty());
        let fixed = fixed_headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let content_type = reported
            .or(content_type)
            .or(fixed)
            .or_else(|| self.content_type.clone());

        let body = match (provider, body, data) {
            (Some(provider), _, _) => provider.into_body()?,
            (None, Some(body), _) => body.encode(content_type.as_deref())?,
            (None, None, Some(data)) if allows_body(&method) => {
                data.encode(content_type.as_deref())?
            }
            (None, None, Some(data)) => {
                query.extend(data.into_query()?);
                Body::Empty
            }
            (None, None, None) => Body::Empty,
        };

        let url = append_query(&self.resolve_url(&target), &query);
        if let Err(source) = url::Url::parse(&url) {
            return Err(Error::InvalidUrl { url, source });
        }

        let mut req = http::Request::builder()
            .method(method)
            .uri(url.as_str())
            .body(body)?;
        *req.headers_mut() = headers;
        if let Some(content_type) = content_type {
            let value = HeaderValue::from_str(&content_type)
                .map_err(|_| Error::InvalidHeader(header::CONTENT_TYPE.to_string()))?;
            req.headers_mut().insert(header::CONTENT_TYPE, value);
        }

        let context = context.unwrap_or_default();
        match timeout.or(self.timeout) {
            Some(timeout) => {
                let scoped = context.with_timeout(timeout);
                req.extensions_mut().insert(TimeoutScope(scoped.clone()));
                req.extensions_mut().insert(scoped);
            }
            None => {
                req.extensions_mut().insert(context);
            }
        }
        if let Some(logger) = logger {
            req.extensions_mut().insert(RequestLogger(logger));
        }

        Ok(req)
    }

    /// Absolute targets are used as is; anything else is appended to the
    /// base URL.
    fn resolve_url(&self, target: &str) -> String {
        if self.base_url.is_empty() || has_scheme(target) {
            return target.to_string();
        }
        match (self.base_url.ends_with('/'), target.strip_prefix('/')) {
            (true, Some(rest)) => format!("{}{rest}", self.base_url),
            _ => format!("{}{target}", self.base_url),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("content_type", &self.content_type)
            .field("decoder", &self.decoder)
            .field("timeout", &self.timeout)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// `scheme://...`, where the scheme starts with a letter.
fn has_scheme(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Append encoded `query` after any query already in `url`, keeping a
/// trailing fragment in place.
pub(crate) fn append_query(url: &str, query: &Values) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let separator = match head.find('?') {
        None => "?",
        Some(at) if at + 1 == head.len() || head.ends_with('&') => "",
        Some(_) => "&",
    };
    let mut out = format!("{head}{separator}{}", query.encode());
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::body::{JsonBody, ReaderBody};
    use crate::http::{RawResponse, CONTENT_TYPE_FORM as FORM, CONTENT_TYPE_JSON as JSON};
    use crate::middleware::from_fn;

    /// Doer that records the last request and answers 200 with `body`.
    fn recording(body: &'static str) -> (impl Doer, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let doer = move |req: Request| -> Result<RawResponse> {
            log.lock().push(req.uri().to_string());
            Ok(http::Response::new(Body::from(body)))
        };
        (doer, seen)
    }

    fn body_of(req: Request) -> String {
        String::from_utf8(req.into_body().into_bytes().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn relative_target_is_appended_to_base() {
        let client = Client::new("http://h/api");
        let req = client.new_request("GET", "/v1/x", Options::new()).unwrap();
        assert_eq!(req.uri(), "http://h/api/v1/x");
    }

    #[test]
    fn absolute_target_ignores_base() {
        let client = Client::new("http://h/api");
        let req = client.new_request("GET", "http://other/x", Options::new()).unwrap();
        assert_eq!(req.uri(), "http://other/x");
    }

    #[test]
    fn base_trailing_slash_is_not_doubled() {
        let client = Client::new("http://h/api/");
        let req = client.new_request("GET", "/v1", Options::new()).unwrap();
        assert_eq!(req.uri(), "http://h/api/v1");
    }

    #[test]
    fn method_defaults_and_normalizes() {
        let mut client = Client::new("http://h");
        let req = client.new_request_with_options("/", Options::new()).unwrap();
        assert_eq!(req.method(), Method::GET);

        client.default_method("put").unwrap();
        let req = client.new_request_with_options("/", Options::new()).unwrap();
        assert_eq!(req.method(), Method::PUT);

        let req = client.new_request("delete", "/", Options::new()).unwrap();
        assert_eq!(req.method(), Method::DELETE);
    }

    #[test]
    fn header_layers_follow_set_and_add() {
        let mut client = Client::new("http://h");
        client.default_header("X-Tag", "client").unwrap();
        client.default_header("X-Keep", "client").unwrap();

        let opts = Options::new()
            .set_header("x-tag", "request")
            .add_header("X-Keep", "request");
        let req = client.new_request("GET", "/", opts).unwrap();

        let tags: Vec<_> = req.headers().get_all("x-tag").iter().collect();
        assert_eq!(tags, ["request"]);
        let kept: Vec<_> = req.headers().get_all("x-keep").iter().collect();
        assert_eq!(kept, ["client", "request"]);
    }

    #[test]
    fn fixed_headers_override_edits() {
        let client = Client::new("http://h");
        let opts = Options::new()
            .add_header("x-mode", "a")
            .add_header("x-mode", "b")
            .fixed_header("X-Mode", "fixed");
        let req = client.new_request("GET", "/", opts).unwrap();
        let modes: Vec<_> = req.headers().get_all("x-mode").iter().collect();
        assert_eq!(modes, ["fixed"]);
    }

    #[test]
    fn client_defaults_are_not_mutated_by_merges() {
        let mut client = Client::new("http://h");
        client.default_header("x-tag", "client").unwrap();
        client.default_query(Values::from([("k", "1")]));

        let opts = Options::new().set_header("x-tag", "other").add_query("k", 2);
        client.new_request("GET", "/", opts).unwrap();

        let req = client.new_request("GET", "/", Options::new()).unwrap();
        assert_eq!(req.headers()["x-tag"], "client");
        assert_eq!(req.uri(), "http://h/?k=1");
    }

    #[test]
    fn get_data_is_routed_to_query() {
        let client = Client::new("http://h");
        for method in ["GET", "HEAD", "DELETE"] {
            let opts = Options::new().data(Values::from([("name", "in here"), ("age", "3")]));
            let req = client.new_request(method, "/search?page=1", opts).unwrap();
            assert_eq!(req.uri(), "http://h/search?page=1&age=3&name=in+here");
            assert!(req.body().is_empty());
        }
    }

    #[test]
    fn query_layers_append_per_key() {
        let mut client = Client::new("http://h");
        client.default_query(Values::from([("tag", "a")]));
        let opts = Options::new().add_query("tag", "b").data(Values::from([("tag", "c")]));
        let req = client.new_request("GET", "/", opts).unwrap();
        assert_eq!(req.uri(), "http://h/?tag=a&tag=b&tag=c");
    }

    #[test]
    fn query_is_inserted_before_fragment() {
        let client = Client::new("http://h");
        let opts = Options::new().add_query("a", 1);
        let req = client.new_request("GET", "/p", opts).unwrap();
        assert_eq!(req.uri(), "http://h/p?a=1");
        assert_eq!(append_query("http://h/p?#frag", &Values::from([("a", "1")])), "http://h/p?a=1#frag");
    }

    #[test]
    fn post_json_payload() {
        let client = Client::new("http://h");
        let opts = Options::new()
            .content_type(JSON)
            .data(json!({"name": "x"}));
        let req = client.new_request("POST", "/post", opts).unwrap();
        assert_eq!(req.headers()[header::CONTENT_TYPE], "application/json");
        let expected = serde_json::to_string(&json!({"name": "x"})).unwrap();
        assert_eq!(body_of(req), expected);
    }

    #[test]
    fn data_uses_client_default_content_type() {
        let mut client = Client::new("http://h");
        client.default_content_type(FORM);
        let opts = Options::new().data(json!({"name": "x y"}));
        let req = client.new_request("POST", "/", opts).unwrap();
        assert_eq!(req.headers()[header::CONTENT_TYPE], FORM);
        assert_eq!(body_of(req), "name=x+y");
    }

    #[test]
    fn body_priority_provider_then_body_then_data() {
        let client = Client::new("http://h");
        let opts = Options::new()
            .provider(JsonBody::new(json!({"from": "provider"})))
            .body("from body")
            .data("from=data");
        let req = client.new_request("POST", "/", opts).unwrap();
        assert_eq!(body_of(req), r#"{"from":"provider"}"#);

        let opts = Options::new().body("from body").data("from=data");
        let req = client.new_request("POST", "/", opts).unwrap();
        assert_eq!(body_of(req), "from body");
    }

    #[test]
    fn content_type_precedence() {
        let mut client = Client::new("http://h");
        client.default_content_type("text/plain");

        let opts = Options::new().provider(JsonBody::new(json!({})));
        let req = client.new_request("POST", "/", opts).unwrap();
        assert_eq!(req.headers()[header::CONTENT_TYPE], JSON);

        let opts = Options::new()
            .content_type("text/plain")
            .provider(JsonBody::new(json!({"a": 1})));
        let req = client.new_request("POST", "/", opts).unwrap();
        assert_eq!(req.headers()[header::CONTENT_TYPE], JSON);

        let opts = Options::new()
            .content_type("application/octet-stream")
            .provider(ReaderBody::new(std::io::empty()));
        let req = client.new_request("POST", "/", opts).unwrap();
        assert_eq!(req.headers()[header::CONTENT_TYPE], "application/octet-stream");

        let opts = Options::new().provider(ReaderBody::new(std::io::empty()));
        let req = client.new_request("POST", "/", opts).unwrap();
        assert_eq!(req.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn basic_auth_header() {
        let mut client = Client::new("http://h");
        client.default_basic_auth("u", "p").unwrap();
        let req = client.new_request("GET", "/", Options::new()).unwrap();
        assert_eq!(req.headers()[header::AUTHORIZATION], "Basic dTpw");
    }

    #[test]
    fn build_errors_abort_before_transport() {
        let (doer, seen) = recording("");
        let mut client = Client::new("http://h");
        client.doer(doer);

        let err = client.send("GET", "/", Options::new().add_header("bad key", "v")).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));

        let err = client.send("GET", "", Options::new().target("::not a url")).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));

        let err = client.send("POST", "/", Options::new().data(json!({"a": 1})).content_type("text/plain"));
        assert!(matches!(err, Err(Error::UnsupportedPayload(_))));

        let err = client.send("GET", "/", Options::new().data(Payload::reader(std::io::empty())));
        assert!(matches!(err, Err(Error::UnsupportedPayload(_))));

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn middleware_wraps_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let doer_log = log.clone();
        let mut client = Client::new("http://h");
        client.doer(move |_req: Request| -> Result<RawResponse> {
            doer_log.lock().push("T".to_string());
            Ok(http::Response::new(Body::Empty))
        });
        for name in ["A", "B"] {
            let log = log.clone();
            client.use_middleware(from_fn(move |req, next: Next<'_>| {
                log.lock().push(format!("{name}-enter"));
                let res = next.run(req);
                log.lock().push(format!("{name}-exit"));
                res
            }));
        }

        client.get_do("/", Options::new()).unwrap();
        assert_eq!(*log.lock(), ["A-enter", "B-enter", "T", "B-exit", "A-exit"]);
    }

    #[test]
    fn middleware_added_between_requests_takes_effect() {
        let (doer, _) = recording("");
        let mut client = Client::new("http://h");
        client.doer(doer);
        assert_eq!(client.get_do("/", Options::new()).unwrap().status(), 200);

        client.use_middleware(from_fn(|_req, _next: Next<'_>| {
            let raw = http::Response::builder().status(503).body(Body::Empty)?;
            Ok(Response::new(raw, ResponseDecoder::Json))
        }));
        assert_eq!(client.get_do("/", Options::new()).unwrap().status(), 503);
    }

    #[test]
    fn hooks_and_logger_see_the_request() {
        let (doer, seen) = recording("{}");
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let logged = Arc::new(Mutex::new(Vec::new()));

        let mut client = Client::new("http://h");
        client.doer(doer);
        client.on_before_send(|req| {
            req.headers_mut().insert("x-hook", HeaderValue::from_static("1"));
        });
        let sink = outcomes.clone();
        client.on_after_send(move |res| sink.lock().push(res.is_ok()));

        let sink = logged.clone();
        let opts = Options::new().logger(move |req| {
            sink.lock().push(req.headers().contains_key("x-hook"));
        });
        client.get_do("/hook", opts).unwrap();

        assert_eq!(*seen.lock(), ["http://h/hook"]);
        assert_eq!(*logged.lock(), [true]);
        assert_eq!(*outcomes.lock(), [true]);
    }

    #[test]
    fn cancelled_context_never_reaches_transport() {
        let (doer, seen) = recording("");
        let mut client = Client::new("http://h");
        client.doer(doer);

        let ctx = Context::background();
        ctx.cancel();
        let err = client.get_do("/", Options::new().context(ctx)).unwrap_err();
        assert!(matches!(err, Error::Canceled));

        let err = client
            .get_do("/", Options::new().timeout(Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn timeout_scope_is_cancelled_after_dispatch() {
        let captured = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let mut client = Client::new("http://h");
        client.doer(move |req: Request| -> Result<RawResponse> {
            *sink.lock() = req.extensions().get::<Context>().cloned();
            Ok(http::Response::new(Body::Empty))
        });

        client
            .get_do("/", Options::new().timeout(Duration::from_secs(30)))
            .unwrap();
        let ctx = captured.lock().take().unwrap();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn unbounded_timeout_builds_without_deadline() {
        let client = Client::new("http://h");
        let req = client
            .new_request("GET", "/", Options::new().timeout(Duration::MAX))
            .unwrap();
        let ctx = req.extensions().get::<Context>().unwrap();
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());
    }

    #[test]
    fn sub_inherits_defaults_but_not_middleware() {
        let mut client = Client::new("http://h");
        client.default_header("x-tag", "1").unwrap();
        client.default_query(Values::from([("q", "1")]));
        client.use_middleware(from_fn(|req, next: Next<'_>| next.run(req)));

        let sub = client.sub();
        assert_eq!(sub.base(), "http://h");
        assert!(sub.middlewares.is_empty());
        let req = sub.new_request("GET", "/", Options::new()).unwrap();
        assert_eq!(req.headers()["x-tag"], "1");
        assert_eq!(req.uri(), "http://h/");
    }

    #[test]
    #[should_panic(expected = "GET")]
    fn must_send_panics_on_error() {
        let client = Client::new("http://h");
        client.must_send("GET", "/", Options::new().add_header("bad key", "v"));
    }
}
