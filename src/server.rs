use std::{io, net::SocketAddr, sync::Arc};

use anyhow::{Context as _, Result};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error};

use crate::{forwarder::UpstreamForwarder, service::ProxyService};

/// Plain HTTP server handing every request to one forwarder.
///
/// Each accepted connection is served on its own task, speaking HTTP/1.1 or
/// cleartext HTTP/2 depending on what the client opens with.
pub struct Server<F> {
    /// The TCP listener for accepting incoming connections
    connection: TcpListener,
    forwarder: Arc<F>,
}

impl<F: UpstreamForwarder> Server<F> {
    /// Binds a listener on `addr`.
    ///
    /// # Arguments
    ///
    /// * `addr` - Where to listen, as `host:port`
    /// * `forwarder` - Shared forwarder every request on every connection goes to
    ///
    /// # Returns
    ///
    /// A server ready for [`Server::run`].
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be resolved or bound, e.g. when the port
    /// is already in use or binding needs privileges the process lacks.
    pub async fn bind(addr: &str, forwarder: Arc<F>) -> Result<Self> {
        let connection = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to listen on {addr}"))?;
        debug!("Listening on {}", connection.local_addr()?);

        Ok(Self {
            connection,
            forwarder,
        })
    }

    /// Address the listener actually bound, useful with port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.connection.local_addr()?)
    }

    /// Accepts a new connection and spawns a task to serve it.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the connection is handed off, or the accept error.
    pub async fn accept(&self) -> Result<()> {
        let (conn, address) = self
            .connection
            .accept()
            .await
            .context("failed to accept connection")?;
        debug!("Accepted connection from {}", address);

        let service = ProxyService::new(Arc::clone(&self.forwarder), address);
        Self::serve(service, conn);
        Ok(())
    }

    /// Serves connections until the listener fails.
    ///
    /// A client that resets before its connection is accepted only loses that
    /// connection; any other accept error stops the server.
    pub async fn run(self) -> Result<()> {
        loop {
            if let Err(e) = self.accept().await {
                match e.downcast_ref::<io::Error>().map(io::Error::kind) {
                    Some(
                        io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::ConnectionReset
                        | io::ErrorKind::Interrupted,
                    ) => error!("{:#}", e),
                    _ => return Err(e),
                }
            }
        }
    }

    fn serve(service: ProxyService<F>, conn: TcpStream) {
        let io = TokioIo::new(conn);

        tokio::spawn(async move {
            let from = service.from;
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection from {}: {:?}", from, e);
            }
        });
    }
}
