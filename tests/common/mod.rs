#![allow(dead_code)]

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use devproxy::{
    cors::CorsForwarder, forwarder::HttpForwarder, server::Server, upstream::Upstream,
};
use http::{HeaderValue, Request, Response, StatusCode, header, response::Parts};
use http_body_util::{BodyExt as _, Full};
use hyper::{
    body::{Bytes, Incoming},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

/// Test backend.
///
/// - `/hello` answers `hi`
/// - `/teapot` answers 418
/// - `/cors` sets its own `Access-Control-Allow-Origin`
/// - `/hop` sends connection-specific headers
/// - anything else echoes the request body, with method, path, host and
///   forwarding chain reported in `x-echo-*` headers
async fn backend(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await.map(|c| c.to_bytes()).unwrap_or_default();

    let mut response = match parts.uri.path() {
        "/hello" => Response::new(Full::new(Bytes::from_static(b"hi"))),
        "/teapot" => {
            let mut response = Response::new(Full::new(Bytes::from_static(b"short and stout")));
            *response.status_mut() = StatusCode::IM_A_TEAPOT;
            response
        }
        "/cors" => {
            let mut response = Response::new(Full::new(Bytes::new()));
            response.headers_mut().insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("https://upstream.example"),
            );
            response
        }
        "/hop" => {
            let mut response = Response::new(Full::new(Bytes::from_static(b"hop")));
            let headers = response.headers_mut();
            headers.insert(header::CONNECTION, HeaderValue::from_static("x-secret"));
            headers.insert("x-secret", HeaderValue::from_static("do not forward"));
            headers.insert("x-public", HeaderValue::from_static("forward me"));
            response
        }
        _ => Response::new(Full::new(body)),
    };

    let echo = |value: &str| HeaderValue::from_str(value).unwrap();
    let headers = response.headers_mut();
    headers.insert("x-echo-method", echo(parts.method.as_str()));
    headers.insert(
        "x-echo-path",
        echo(parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("")),
    );
    for (from, to) in [("host", "x-echo-host"), ("x-forwarded-for", "x-echo-forwarded-for")] {
        if let Some(value) = parts.headers.get(from) {
            headers.insert(to, value.clone());
        }
    }
    Ok(response)
}

/// Serves the test backend on an already bound listener.
pub fn serve_backend(listener: TcpListener) -> SocketAddr {
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(backend))
                    .await;
            });
        }
    });
    addr
}

pub async fn spawn_backend() -> SocketAddr {
    serve_backend(TcpListener::bind("127.0.0.1:0").await.unwrap())
}

/// Starts the proxy on an ephemeral port, forwarding to `upstream`.
pub async fn spawn_proxy(upstream: SocketAddr) -> SocketAddr {
    let upstream = Upstream::from_host_port(&upstream.to_string()).unwrap();
    spawn_proxy_with(HttpForwarder::new(upstream)).await
}

/// Starts the proxy on an ephemeral port around a preconfigured forwarder.
pub async fn spawn_proxy_with(forwarder: HttpForwarder) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0", Arc::new(CorsForwarder::new(forwarder)))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// Sends one request over a fresh connection and collects the response.
pub async fn send(addr: SocketAddr, req: Request<Full<Bytes>>) -> (Parts, Bytes) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(conn);

    let (parts, body) = sender.send_request(req).await.unwrap().into_parts();
    let body = body.collect().await.unwrap().to_bytes();
    (parts, body)
}

pub fn get(addr: SocketAddr, path: &str) -> Request<Full<Bytes>> {
    Request::get(path)
        .header(header::HOST, addr.to_string())
        .body(Full::new(Bytes::new()))
        .unwrap()
}
