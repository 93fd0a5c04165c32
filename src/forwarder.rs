//! Forwarding of inbound requests to the upstream.
//!
//! [`UpstreamForwarder`] is the seam the rest of the crate is written against:
//! given a request, produce the response that goes back to the client.
//! [`HttpForwarder`] is the plain HTTP/1.1 implementation that talks to the
//! fixed [`Upstream`].

use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use anyhow::Context as _;
use futures::future::BoxFuture;
use http::{
    HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Version, header,
    uri::PathAndQuery,
};
use http_body_util::{BodyExt as _, Empty, combinators::BoxBody};
use hyper::{
    body::{Bytes, Incoming},
    client::conn::http1::Builder,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::{debug, error};

use crate::{upstream::Upstream, utils::strip_hop_by_hop};

static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Longest wait for the upstream to accept a TCP connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body type of every response handed back to the client.
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Future returned by [`UpstreamForwarder::forward`].
pub type ForwardFuture = BoxFuture<'static, Response<ProxyBody>>;

/// Something that turns an inbound request into the response for the client.
///
/// Implementations must always produce a response: failures talking to the
/// upstream are reported to the client, never to the caller.
pub trait UpstreamForwarder: Send + Sync + 'static {
    /// Forwards `req`, received from the client at `from`.
    fn forward(&self, from: SocketAddr, req: Request<Incoming>) -> ForwardFuture;
}

/// Empty response with the given status.
pub fn empty_response(status: StatusCode) -> Response<ProxyBody> {
    let mut response = Response::new(
        Empty::<Bytes>::new()
            .map_err(|never| match never {})
            .boxed(),
    );
    *response.status_mut() = status;
    response
}

/// Forwards requests over a fresh HTTP/1.1 connection to the upstream.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    upstream: Upstream,
    /// Upper bound on connecting to the upstream
    connect_timeout: Duration,
}

impl HttpForwarder {
    /// Creates a forwarder for `upstream`.
    ///
    /// # Arguments
    ///
    /// * `upstream` - The target every request is rewritten onto
    ///
    /// # Returns
    ///
    /// A forwarder that gives up connecting after [`CONNECT_TIMEOUT`].
    pub fn new(upstream: Upstream) -> Self {
        Self {
            upstream,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Replaces the connect timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Rewrites the request head for the upstream hop.
    fn prepare<B>(
        upstream: &Upstream,
        from: SocketAddr,
        req: Request<B>,
    ) -> anyhow::Result<Request<B>> {
        let (mut parts, body) = req.into_parts();

        let target = upstream.target_uri(&parts.uri)?;
        debug!("Rewriting {} to {}", parts.uri, target);

        if !parts.headers.contains_key(header::HOST) {
            let host = parts
                .uri
                .authority()
                .unwrap_or(&upstream.authority)
                .as_str();
            let host = HeaderValue::from_str(host)?;
            parts.headers.insert(header::HOST, host);
        }

        let keep_te_trailers = parts
            .headers
            .get_all(header::TE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("trailers"));

        strip_hop_by_hop(&mut parts.headers);

        if keep_te_trailers {
            parts
                .headers
                .insert(header::TE, HeaderValue::from_static("trailers"));
        }

        append_forwarded_for(&mut parts.headers, from.ip());

        // The upstream leg is always HTTP/1.1 in origin-form.
        parts.uri = target
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"))
            .into();
        parts.version = Version::HTTP_11;

        Ok(Request::from_parts(parts, body))
    }

    async fn try_forward(
        upstream: Upstream,
        connect_timeout: Duration,
        from: SocketAddr,
        req: Request<Incoming>,
    ) -> anyhow::Result<Response<ProxyBody>> {
        let request = Self::prepare(&upstream, from, req)?;

        debug!("Connecting to upstream: {}", upstream);
        let host = upstream
            .authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']');
        let port = upstream.authority.port_u16().unwrap_or(80);
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .with_context(|| {
                format!("timed out after {connect_timeout:?} connecting to upstream {upstream}")
            })?
            .with_context(|| format!("failed to connect to upstream {upstream}"))?;

        let io = TokioIo::new(stream);

        debug!("Performing HTTP handshake");
        let (mut sender, conn) = Builder::new()
            .preserve_header_case(true)
            .handshake(io)
            .await
            .context("HTTP handshake with upstream failed")?;

        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                error!("Upstream connection error: {}", err);
            }
        });

        debug!("Sending request to upstream");
        let (mut parts, body) = sender
            .send_request(request)
            .await
            .context("failed to send request to upstream")?
            .into_parts();

        strip_hop_by_hop(&mut parts.headers);

        debug!("Upstream responded with {}", parts.status);
        Ok(Response::from_parts(parts, body.boxed()))
    }
}

/// Appends `client` to the `X-Forwarded-For` chain.
///
/// Every prior header line is kept, in order, joined into a single value.
/// Values are joined as raw bytes so non-ASCII input never blocks forwarding.
fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let mut chain = Vec::new();
    for prior in headers.get_all(&X_FORWARDED_FOR) {
        chain.extend_from_slice(prior.as_bytes());
        chain.extend_from_slice(b", ");
    }
    chain.extend_from_slice(client.to_string().as_bytes());

    match HeaderValue::from_bytes(&chain) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR.clone(), value);
        }
        Err(e) => debug!("Leaving X-Forwarded-For untouched: {}", e),
    }
}

impl UpstreamForwarder for HttpForwarder {
    fn forward(&self, from: SocketAddr, req: Request<Incoming>) -> ForwardFuture {
        let upstream = self.upstream.clone();
        let connect_timeout = self.connect_timeout;
        let method = req.method().clone();
        let uri = req.uri().clone();

        Box::pin(async move {
            match Self::try_forward(upstream, connect_timeout, from, req).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Proxy error for {} {}: {:#}", method, uri, e);
                    empty_response(StatusCode::BAD_GATEWAY)
                }
            }
        })
    }
}
