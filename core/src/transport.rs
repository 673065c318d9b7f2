//! The transport seam.
//!
//! # Design
//! A `Doer` takes a fully built request and returns the raw response or the
//! transport's own failure. Any `Fn(Request) -> Result<RawResponse>` is a
//! `Doer`, which keeps test doubles to a closure. `UreqDoer` is the default
//! blocking transport: it bounds each call by the remaining time on the
//! request context and hands the response body back as an unbuffered
//! stream with no size limit, read once by the `Response` consumer.
//!
//! The context is consulted once, before the call. Cancelling it from
//! another thread does not interrupt a request already blocked in the agent;
//! only the deadline, passed down as the agent timeout, bounds that wait.

use std::fmt;
use std::io::Read;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{Body, RawResponse, Request};

/// Sends a built request and returns the raw response.
pub trait Doer: Send + Sync {
    fn do_request(&self, req: Request) -> Result<RawResponse>;
}

impl<F> Doer for F
where
    F: Fn(Request) -> Result<RawResponse> + Send + Sync,
{
    fn do_request(&self, req: Request) -> Result<RawResponse> {
        self(req)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// Non-2xx statuses are returned as responses, not errors.
#[derive(Clone)]
pub struct UreqDoer {
    agent: ureq::Agent,
}

impl UreqDoer {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent. Its status handling is left untouched.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }

    fn run<B: ureq::AsSendBody>(&self, req: http::Request<B>) -> Result<RawResponse> {
        let remaining = req.extensions().get::<Context>().and_then(Context::remaining);
        let req = match remaining {
            Some(timeout) => self
                .agent
                .configure_request(req)
                .timeout_global(Some(timeout))
                .build(),
            None => req,
        };

        let res = self.agent.run(req).map_err(map_ureq_error)?;
        let (parts, body) = res.into_parts();
        Ok(http::Response::from_parts(parts, Body::reader(body.into_reader())))
    }
}

impl Default for UreqDoer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqDoer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqDoer").finish_non_exhaustive()
    }
}

impl Doer for UreqDoer {
    fn do_request(&self, req: Request) -> Result<RawResponse> {
        let (parts, body) = req.into_parts();
        match body {
            Body::Empty => self.run(http::Request::from_parts(parts, ())),
            Body::Bytes(bytes) => self.run(http::Request::from_parts(parts, bytes.to_vec())),
            // Streams are drained so the agent sees a sized body.
            Body::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                self.run(http::Request::from_parts(parts, buf))
            }
        }
    }
}

fn map_ureq_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Timeout(_) => Error::Timeout,
        err => Error::transport(err),
    }
}
