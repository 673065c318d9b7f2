//! Process-wide default client.
//!
//! # Design
//! The default client is built lazily on first use and guarded by a
//! read-write lock. Senders clone a snapshot under the read lock and
//! dispatch without holding it, so configuration changes never block on
//! in-flight requests and never affect a request already started.
//!
//! The instance is shared by the whole process. Tests must not rely on its
//! state surviving between test cases; construct a dedicated `Client` for
//! isolated use.

use std::sync::LazyLock;

use parking_lot::RwLock;

use crate::client::Client;
use crate::error::Result;
use crate::options::Options;
use crate::response::Response;
use crate::types::Payload;

static DEFAULT_CLIENT: LazyLock<RwLock<Client>> = LazyLock::new(|| RwLock::new(Client::default()));

/// A snapshot of the default client.
pub fn default_client() -> Client {
    DEFAULT_CLIENT.read().clone()
}

/// Mutate the default client in place.
pub fn configure_default_client<F>(f: F)
where
    F: FnOnce(&mut Client),
{
    let mut client = DEFAULT_CLIENT.write();
    f(&mut *client);
}

/// Replace the default client with a fresh one.
pub fn reset_default_client() {
    *DEFAULT_CLIENT.write() = Client::default();
}

pub fn send_do(method: &str, target: &str, opts: Options) -> Result<Response> {
    default_client().send(method, target, opts)
}

/// Like `send_do`, but panics on failure.
pub fn must_do(method: &str, target: &str, opts: Options) -> Response {
    default_client().must_send(method, target, opts)
}

pub fn get_do(target: &str, opts: Options) -> Result<Response> {
    default_client().get_do(target, opts)
}

pub fn post_do(target: &str, data: impl Into<Payload>, opts: Options) -> Result<Response> {
    default_client().post_do(target, data, opts)
}

pub fn put_do(target: &str, data: impl Into<Payload>, opts: Options) -> Result<Response> {
    default_client().put_do(target, data, opts)
}

pub fn patch_do(target: &str, data: impl Into<Payload>, opts: Options) -> Result<Response> {
    default_client().patch_do(target, data, opts)
}

pub fn delete_do(target: &str, opts: Options) -> Result<Response> {
    default_client().delete_do(target, opts)
}

pub fn head_do(target: &str, opts: Options) -> Result<Response> {
    default_client().head_do(target, opts)
}

pub fn trace_do(target: &str, opts: Options) -> Result<Response> {
    send_do("TRACE", target, opts)
}

pub fn options_do(target: &str, opts: Options) -> Result<Response> {
    send_do("OPTIONS", target, opts)
}

pub fn connect_do(target: &str, opts: Options) -> Result<Response> {
    send_do("CONNECT", target, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Body, RawResponse, Request};

    // Every assertion on the shared instance lives in this one test so
    // parallel test threads cannot interleave configure/reset calls.
    #[test]
    fn configure_snapshot_and_reset() {
        configure_default_client(|client| {
            client.base_url("http://default.test");
            client.doer(|req: Request| -> Result<RawResponse> {
                let body = Body::from(format!("{} {}", req.method(), req.uri()));
                Ok(http::Response::new(body))
            });
        });

        let snapshot = default_client();
        assert_eq!(snapshot.base(), "http://default.test");

        let mut res = trace_do("/t", Options::new()).unwrap();
        assert_eq!(res.body_string().unwrap(), "TRACE http://default.test/t");

        let mut res = post_do("/p", "x", Options::new()).unwrap();
        assert_eq!(res.body_string().unwrap(), "POST http://default.test/p");

        let mut res = crate::Builder::new().get_do("/b").unwrap();
        assert_eq!(res.body_string().unwrap(), "GET http://default.test/b");

        reset_default_client();
        assert_eq!(default_client().base(), "");
        assert_eq!(snapshot.base(), "http://default.test");
    }
}
