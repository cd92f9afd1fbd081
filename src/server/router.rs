//! Route table and dispatch.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::{HttpRequest, Method};
use crate::server::error::Error;
use crate::server::response::HttpResponse;

/// Type alias for a boxed future that resolves to a handler result.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for a handler function that takes an HttpRequest and returns
/// a HandlerFuture.
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// A registered route.
#[derive(Clone)]
pub struct Route {
    /// The HTTP method to match.
    pub method: Method,
    /// The exact path to match. Query strings are stripped before matching.
    pub path: String,
    /// The handler function.
    pub handler: HandlerFn,
}

/// An immutable dispatch table, snapshotted from the registered routes when
/// the server starts.
pub(crate) struct Router {
    routes: Vec<Route>,
}

/// Outcome of resolving a (method, path) pair.
pub(crate) enum Dispatch<'a> {
    /// A route matched both method and path.
    Matched(&'a Route),
    /// The path is registered, but not for this method.
    MethodNotAllowed(Vec<Method>),
    /// No route matches the path.
    NotFound,
}

impl Router {
    pub(crate) fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub(crate) fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolve a (method, path) pair. The first registered exact match
    /// wins; there is no pattern or prefix matching.
    pub(crate) fn dispatch(&self, method: Method, path: &str) -> Dispatch<'_> {
        if let Some(route) = self
            .routes
            .iter()
            .find(|route| route.path == path && route.method == method)
        {
            return Dispatch::Matched(route);
        }

        let allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|route| route.path == path)
            .map(|route| route.method)
            .collect();

        if allowed.is_empty() {
            Dispatch::NotFound
        } else {
            Dispatch::MethodNotAllowed(allowed)
        }
    }
}
