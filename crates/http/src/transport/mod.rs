//! Transport collaborator contracts.
//!
//! The protocol core never opens, accepts or closes anything itself; it
//! consumes duplex byte streams that a transport allocates. A transport
//! hands the core a [`Connection`] carrying the two stream halves,
//! per-connection processing options, an environment map and an optional
//! cancellation token, and gets the connection back through
//! `release_connection` when the exchange is over — on every path, success
//! or failure.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::options::ProcessingOptions;
use crate::protocol::{Environment, ExchangeError};

pub mod memory;

pub type ConnectionReader = Box<dyn AsyncRead + Send + Unpin>;
pub type ConnectionWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A duplex connection handle, constructed by transports only.
///
/// The core takes the stream halves out when an exchange starts; a missing
/// half is a configuration bug surfaced as a missing-dependency error, not
/// silently ignored. Whatever is still inside when the connection comes
/// back through `release_connection` is the transport's to clean up.
pub struct Connection {
    reader: Option<ConnectionReader>,
    writer: Option<ConnectionWriter>,
    options: ProcessingOptions,
    environment: Environment,
    cancellation: Option<CancellationToken>,
}

impl Connection {
    pub fn new(reader: ConnectionReader, writer: ConnectionWriter) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            options: ProcessingOptions::default(),
            environment: Environment::new(),
            cancellation: None,
        }
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn cancellation(&self) -> Option<CancellationToken> {
        self.cancellation.clone()
    }

    pub fn take_reader(&mut self) -> Option<ConnectionReader> {
        self.reader.take()
    }

    pub fn take_writer(&mut self) -> Option<ConnectionWriter> {
        self.writer.take()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("has_reader", &self.reader.is_some())
            .field("has_writer", &self.writer.is_some())
            .field("options", &self.options)
            .field("environment", &self.environment)
            .finish()
    }
}

/// What a client-side transport provides.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    /// Allocates a connection to `remote_endpoint`. The merged processing
    /// options are passed along so the transport can honor connectivity
    /// params and attach the options to the connection it returns.
    async fn allocate_connection(
        &self,
        remote_endpoint: &str,
        options: &ProcessingOptions,
    ) -> Result<Connection, ExchangeError>;

    /// Gives the connection back. `response_streaming` true means the
    /// response body still owns the read half and is being consumed; the
    /// transport must not reclaim in a way that would break that read.
    async fn release_connection(&self, connection: Connection, response_streaming: bool) -> Result<(), ExchangeError>;
}

/// What a server-side transport provides.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    async fn release_connection(&self, connection: Connection) -> Result<(), ExchangeError>;
}
