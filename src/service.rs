//! Hyper service adapter.
//!
//! The server clones one [`ProxyService`] per accepted connection, tagging it
//! with the peer address, and hyper calls it once per request on that
//! connection.

use std::{convert::Infallible, net::SocketAddr, pin::Pin, sync::Arc};

use http::{Request, Response};
use hyper::{body::Incoming, service::Service as HyperService};
use tracing::debug;

use crate::forwarder::{ProxyBody, UpstreamForwarder};

/// Per-connection handle onto the shared forwarder.
pub struct ProxyService<F> {
    forwarder: Arc<F>,
    /// Address of the client this connection belongs to
    pub from: SocketAddr,
}

impl<F> Clone for ProxyService<F> {
    fn clone(&self) -> Self {
        Self {
            forwarder: Arc::clone(&self.forwarder),
            from: self.from,
        }
    }
}

impl<F: UpstreamForwarder> ProxyService<F> {
    pub fn new(forwarder: Arc<F>, from: SocketAddr) -> Self {
        Self { forwarder, from }
    }
}

impl<F: UpstreamForwarder> HyperService<Request<Incoming>> for ProxyService<F> {
    type Response = Response<ProxyBody>;

    type Error = Infallible;

    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    /// Hands the request to the forwarder. Never fails: upstream trouble is
    /// already turned into an error response by the forwarder.
    fn call(&self, req: Request<Incoming>) -> Self::Future {
        debug!("Processing request from {}: {} {}", self.from, req.method(), req.uri());

        let forwarded = self.forwarder.forward(self.from, req);
        Box::pin(async move { Ok(forwarded.await) })
    }
}
