//! TCP binding of the quasi-http transport contracts.
//!
//! Endpoints are plain `host:port` strings. The client transport opens one
//! TCP connection per exchange and splits it into owned halves for the
//! protocol core; the server side is an accept loop that wraps each
//! accepted socket in a connection and hands it to a
//! [`Server`](quasi_http::connection::Server). Peer addresses travel in the
//! connection environment under the well-known endpoint keys.

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use quasi_http::connection::Server;
use quasi_http::options::ProcessingOptions;
use quasi_http::protocol::{EnvValue, Environment, ExchangeError, ProtocolError, env_keys};
use quasi_http::transport::{ClientTransport, Connection, ServerTransport};

/// Client transport opening one TCP connection per exchange.
#[derive(Debug, Default)]
pub struct TcpClientTransport;

#[async_trait]
impl ClientTransport for TcpClientTransport {
    async fn allocate_connection(
        &self,
        remote_endpoint: &str,
        options: &ProcessingOptions,
    ) -> Result<Connection, ExchangeError> {
        let stream = TcpStream::connect(remote_endpoint).await.map_err(ProtocolError::io)?;
        let _ = stream.set_nodelay(true);

        let environment = peer_environment(&stream, remote_endpoint);
        let (reader, writer) = stream.into_split();

        Ok(Connection::new(Box::new(reader), Box::new(writer))
            .with_options(options.clone())
            .with_environment(environment))
    }

    async fn release_connection(&self, mut connection: Connection, _response_streaming: bool) -> Result<(), ExchangeError> {
        // closing the write half is safe in both modes: a streaming
        // response body owns the read half and keeps reading through the
        // half-close
        if let Some(mut writer) = connection.take_writer() {
            let _ = writer.shutdown().await;
        }
        Ok(())
    }
}

/// Server-side release: flush and close the write half, drops do the rest.
#[derive(Debug, Default)]
pub struct TcpServerTransport;

#[async_trait]
impl ServerTransport for TcpServerTransport {
    async fn release_connection(&self, mut connection: Connection) -> Result<(), ExchangeError> {
        if let Some(mut writer) = connection.take_writer() {
            let _ = writer.shutdown().await;
        }
        Ok(())
    }
}

/// Accept loop feeding a quasi-http server from a TCP listener.
pub struct TcpServer {
    listener: TcpListener,
    server: Arc<Server>,
}

impl TcpServer {
    pub async fn bind(address: &str, server: Arc<Server>) -> io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        info!(address, "listening for quasi-http connections");
        Ok(Self { listener, server })
    }

    /// Accepts connections until the listener fails, one spawned exchange
    /// per accepted socket.
    pub async fn serve(self) -> io::Result<()> {
        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let _ = stream.set_nodelay(true);
            let environment = peer_environment(&stream, &remote_addr.to_string());
            let (reader, writer) = stream.into_split();
            let connection = Connection::new(Box::new(reader), Box::new(writer)).with_environment(environment);

            let server = Arc::clone(&self.server);
            tokio::spawn(async move {
                if let Err(e) = server.accept_connection(connection).await {
                    error!(remote = %remote_addr, "exchange failed, cause: {}", e);
                }
            });
        }
    }
}

impl fmt::Debug for TcpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpServer").field("listener", &self.listener).finish()
    }
}

fn peer_environment(stream: &TcpStream, remote_endpoint: &str) -> Environment {
    let mut environment = Environment::new();
    environment.insert(env_keys::REMOTE_PEER_ENDPOINT.to_owned(), EnvValue::from(remote_endpoint));
    if let Ok(local_addr) = stream.local_addr() {
        environment.insert(env_keys::LOCAL_PEER_ENDPOINT.to_owned(), EnvValue::from(local_addr.to_string()));
    }
    environment
}
