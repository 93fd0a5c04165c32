use std::net::SocketAddr;

use http::{HeaderValue, Request, Response, header::ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::body::Incoming;

use crate::forwarder::{ForwardFuture, ProxyBody, UpstreamForwarder};

/// Wraps any [`UpstreamForwarder`] so every response allows any origin.
///
/// The header is applied to whatever the inner forwarder returns, error
/// responses included. A value already set by the upstream is overwritten.
#[derive(Debug, Clone)]
pub struct CorsForwarder<F> {
    inner: F,
}

impl<F: UpstreamForwarder> CorsForwarder<F> {
    /// Wraps `inner`; its responses are passed through with the header added.
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

/// Sets `Access-Control-Allow-Origin: *`, replacing any existing values.
pub fn allow_any_origin<B>(response: &mut Response<B>) {
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}

impl<F: UpstreamForwarder> UpstreamForwarder for CorsForwarder<F> {
    fn forward(&self, from: SocketAddr, req: Request<Incoming>) -> ForwardFuture {
        let forwarded = self.inner.forward(from, req);
        Box::pin(async move {
            let mut response: Response<ProxyBody> = forwarded.await;
            allow_any_origin(&mut response);
            response
        })
    }
}
