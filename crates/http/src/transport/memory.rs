//! In-process transport over paired duplex pipes.
//!
//! Allocating a connection creates a `tokio::io::duplex` pair, hands one
//! end to an in-process [`Server`] (spawned onto the runtime) and returns
//! the other end to the client. Exchanges then run the full wire protocol
//! without any sockets involved, which is what the end-to-end tests and
//! demos use.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, duplex, split};
use tracing::warn;

use crate::connection::Server;
use crate::options::ProcessingOptions;
use crate::protocol::{EnvValue, Environment, ExchangeError, env_keys};
use crate::transport::{ClientTransport, Connection, ServerTransport};

const PIPE_CAPACITY: usize = 8 * 1024;

/// Client transport that runs every exchange against an in-process server.
pub struct MemoryClientTransport {
    server: Arc<Server>,
}

impl MemoryClientTransport {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }
}

impl fmt::Debug for MemoryClientTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryClientTransport").finish()
    }
}

#[async_trait]
impl ClientTransport for MemoryClientTransport {
    async fn allocate_connection(
        &self,
        remote_endpoint: &str,
        options: &ProcessingOptions,
    ) -> Result<Connection, ExchangeError> {
        let (client_side, server_side) = duplex(PIPE_CAPACITY);
        let (client_reader, client_writer) = split(client_side);
        let (server_reader, server_writer) = split(server_side);

        let mut client_environment = Environment::new();
        client_environment.insert(env_keys::REMOTE_PEER_ENDPOINT.to_owned(), EnvValue::from(remote_endpoint));
        let mut server_environment = Environment::new();
        server_environment.insert(env_keys::LOCAL_PEER_ENDPOINT.to_owned(), EnvValue::from(remote_endpoint));

        // the server side runs on its own defaults; client options only
        // govern the client half of the exchange
        let server_connection =
            Connection::new(Box::new(server_reader), Box::new(server_writer)).with_environment(server_environment);

        let server = Arc::clone(&self.server);
        tokio::spawn(async move {
            if let Err(e) = server.accept_connection(server_connection).await {
                warn!("in-memory exchange failed on the server side, cause: {}", e);
            }
        });

        Ok(Connection::new(Box::new(client_reader), Box::new(client_writer))
            .with_options(options.clone())
            .with_environment(client_environment))
    }

    async fn release_connection(&self, mut connection: Connection, _response_streaming: bool) -> Result<(), ExchangeError> {
        if let Some(mut writer) = connection.take_writer() {
            let _ = writer.shutdown().await;
        }
        Ok(())
    }
}

/// Server-side release for in-memory connections: flush and close the
/// write half, let drops take care of the rest.
#[derive(Debug, Default)]
pub struct MemoryServerTransport;

#[async_trait]
impl ServerTransport for MemoryServerTransport {
    async fn release_connection(&self, mut connection: Connection) -> Result<(), ExchangeError> {
        if let Some(mut writer) = connection.take_writer() {
            let _ = writer.shutdown().await;
        }
        Ok(())
    }
}
