//! Interceptors wrapped around the transport call.
//!
//! # Design
//! A chain is a borrowed slice of middlewares plus the terminal handler.
//! `Next::run` peels the first middleware off the slice and hands it a
//! `Next` over the rest, so the first registered middleware is outermost.
//! The chain is assembled per dispatch from the client's current list and
//! owns nothing, which makes list changes between requests visible without
//! any cache to invalidate.

use std::sync::Arc;

use crate::error::Result;
use crate::http::Request;
use crate::response::Response;

/// An interceptor around request dispatch.
///
/// Implementations may rewrite the request, call `next.run(req)` zero or
/// more times, and inspect or replace the result.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: Request, next: Next<'_>) -> Result<Response>;
}

/// The remainder of the chain, ending in the terminal handler.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    terminal: &'a (dyn Fn(Request) -> Result<Response> + Sync),
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        middlewares: &'a [Arc<dyn Middleware>],
        terminal: &'a (dyn Fn(Request) -> Result<Response> + Sync),
    ) -> Self {
        Self {
            middlewares,
            terminal,
        }
    }

    pub fn run(self, req: Request) -> Result<Response> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.handle(req, Next::new(rest, self.terminal)),
            None => (self.terminal)(req),
        }
    }
}

/// Middleware backed by a closure.
pub struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next<'_>) -> Result<Response> + Send + Sync,
{
    fn handle(&self, req: Request, next: Next<'_>) -> Result<Response> {
        (self.0)(req, next)
    }
}

/// Wrap a closure as a middleware.
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next<'_>) -> Result<Response> + Send + Sync,
{
    FnMiddleware(f)
}
