use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use tokio::select;
use tokio_util::codec::FramedRead;
use tracing::{debug, error};

use crate::codec::MessageDecoder;
use crate::connection::message_writer::MessageWriter;
use crate::connection::{Deadline, run_under_deadline};
use crate::handler::Handler;
use crate::options::{EffectiveOptions, ProcessingOptions};
use crate::protocol::body::body_channel;
use crate::protocol::{Body, ExchangeError, Message, ProtocolError, Request, env_keys, flag_enabled};
use crate::transport::{Connection, ServerTransport};

/// The receiving side of an exchange.
///
/// The surrounding host code accepts connections however its transport
/// works and hands each one to [`accept_connection`](Server::accept_connection),
/// which drives the complete exchange: decode the request, bridge its body
/// to the application while the application runs, require a response, write
/// it back, and release everything through the transport whatever the
/// outcome.
pub struct Server {
    application: Option<Arc<dyn Handler>>,
    transport: Option<Arc<dyn ServerTransport>>,
    default_options: ProcessingOptions,
}

impl Server {
    pub fn new(application: Arc<dyn Handler>, transport: Arc<dyn ServerTransport>) -> Self {
        Self { application: Some(application), transport: Some(transport), default_options: ProcessingOptions::default() }
    }

    pub fn with_default_options(mut self, options: ProcessingOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Runs one exchange over `connection`.
    ///
    /// Connection-level options are preferred over the server defaults. The
    /// whole exchange runs under the resolved deadline; the connection is
    /// released through the transport on every path, best-effort when the
    /// exchange already failed.
    pub async fn accept_connection(&self, mut connection: Connection) -> Result<(), ExchangeError> {
        let application =
            self.application.clone().ok_or_else(|| ExchangeError::missing_dependency("application handler"))?;
        let transport =
            self.transport.clone().ok_or_else(|| ExchangeError::missing_dependency("server transport"))?;

        let effective = EffectiveOptions::resolve(&[connection.options(), &self.default_options]);
        let cancellation = connection.cancellation();
        debug!(?effective, "starting server exchange");

        let exchange = Self::run_exchange(&mut connection, application, effective);
        let result = run_under_deadline(Deadline::Receive, effective.timeout_millis, cancellation, exchange).await;

        match result {
            Ok(()) => transport.release_connection(connection).await,
            Err(e) => {
                error!("exchange failed, releasing connection, cause: {}", e);
                let _ = transport.release_connection(connection).await;
                Err(e)
            }
        }
    }

    async fn run_exchange(
        connection: &mut Connection,
        application: Arc<dyn Handler>,
        effective: EffectiveOptions,
    ) -> Result<(), ExchangeError> {
        let environment = connection.environment().clone();
        let reader = connection
            .take_reader()
            .ok_or_else(|| ExchangeError::missing_dependency("connection readable stream"))?;
        let writer = connection
            .take_writer()
            .ok_or_else(|| ExchangeError::missing_dependency("connection writable stream"))?;

        let mut framed_read =
            FramedRead::with_capacity(reader, MessageDecoder::new(effective.max_headers_size), 8 * 1024);

        let (head, payload_size) = match framed_read.next().await {
            None => return Err(ExchangeError::NoRequest),
            Some(Ok(Message::Header(header))) => header,
            Some(Ok(Message::Payload(_))) => {
                return Err(ProtocolError::violation("received body bytes before a request header section").into());
            }
            Some(Err(e)) => return Err(e.into()),
        };
        let mut request = Request::from_head(head)?;
        request.environment = environment;

        let response_result = if payload_size.is_empty() {
            application.handle(request).await
        } else {
            let (mut body_sender, body_receiver) = body_channel(&mut framed_read);
            request.body = Some(Body::from_stream(body_receiver));

            // the application and the body pump must run concurrently: the
            // application may block on body chunks only the pump can
            // deliver, and the pump only reads when the application asks
            let response_result = {
                tokio::pin! {
                    let handle_future = application.handle(request);
                    let pump_future = body_sender.run();
                }

                let mut pump_done = false;
                loop {
                    select! {
                        biased;
                        response = &mut handle_future => break response,
                        pump_result = &mut pump_future, if !pump_done => {
                            pump_done = true;
                            pump_result?;
                        }
                    }
                }
            };

            // whatever of the body the application left unread belongs to
            // this exchange and has to come off the connection
            let drain_result = body_sender.skip_data().await;
            let response = response_result;
            drain_result?;
            response
        };

        let mut response = response_result.map_err(ExchangeError::application)?;

        let write_result = if flag_enabled(&response.environment, env_keys::SKIP_SENDING) {
            Ok(())
        } else {
            let mut message_writer = MessageWriter::new(writer, effective.max_headers_size);
            let head = response.to_head();
            let content_length = response.content_length;
            let body = response.body.take();
            message_writer.write_message(head, content_length, body).await
        };

        // response resources go regardless of how the write went
        response.release();
        write_result?;
        Ok(())
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("has_application", &self.application.is_some())
            .field("has_transport", &self.transport.is_some())
            .field("default_options", &self.default_options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use crate::protocol::{EnvValue, Environment, Response};
    use crate::transport::memory::MemoryServerTransport;
    use std::error::Error;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex, split};

    fn server_with<F, Fut>(handler: F) -> Server
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, Box<dyn Error + Send + Sync>>> + Send + 'static,
    {
        Server::new(Arc::new(make_handler(handler)), Arc::new(MemoryServerTransport))
    }

    fn request_wire(block: &[u8]) -> Vec<u8> {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"hdrs");
        wire.extend_from_slice(&(block.len() as u32).to_be_bytes());
        wire.extend_from_slice(block);
        wire
    }

    #[tokio::test]
    async fn request_environment_comes_from_the_connection() {
        let server = server_with(|request: Request| async move {
            assert!(matches!(
                request.environment.get(env_keys::LOCAL_PEER_ENDPOINT),
                Some(EnvValue::Str(endpoint)) if endpoint == "test-endpoint"
            ));
            Ok(Response::new(204))
        });

        let (peer, local) = duplex(8 * 1024);
        let (local_reader, local_writer) = split(local);
        let (mut peer_reader, mut peer_writer) = split(peer);

        let mut environment = Environment::new();
        environment.insert(env_keys::LOCAL_PEER_ENDPOINT.to_owned(), EnvValue::from("test-endpoint"));
        let connection =
            Connection::new(Box::new(local_reader), Box::new(local_writer)).with_environment(environment);

        let exchange = tokio::spawn(async move { server.accept_connection(connection).await });

        peer_writer.write_all(&request_wire(b"GET,/,\"\",0\n")).await.unwrap();
        peer_writer.shutdown().await.unwrap();

        let mut response_bytes = Vec::new();
        peer_reader.read_to_end(&mut response_bytes).await.unwrap();
        assert!(response_bytes.starts_with(b"hdrs"));

        exchange.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn empty_connection_is_no_request() {
        let server = server_with(|_request| async move { Ok(Response::new(200)) });

        let (peer, local) = duplex(1024);
        let (local_reader, local_writer) = split(local);
        let connection = Connection::new(Box::new(local_reader), Box::new(local_writer));

        drop(peer);
        let result = server.accept_connection(connection).await;
        assert!(matches!(result, Err(ExchangeError::NoRequest)));
    }

    #[tokio::test]
    async fn skip_sending_suppresses_the_response_bytes() {
        let server = server_with(|_request| async move {
            let mut response = Response::new(200);
            response.environment.insert(env_keys::SKIP_SENDING.to_owned(), EnvValue::Bool(true));
            Ok(response)
        });

        let (peer, local) = duplex(8 * 1024);
        let (local_reader, local_writer) = split(local);
        let (mut peer_reader, mut peer_writer) = split(peer);
        let connection = Connection::new(Box::new(local_reader), Box::new(local_writer));

        let exchange = tokio::spawn(async move { server.accept_connection(connection).await });

        peer_writer.write_all(&request_wire(b"GET,/,\"\",0\n")).await.unwrap();
        peer_writer.shutdown().await.unwrap();

        let mut response_bytes = Vec::new();
        peer_reader.read_to_end(&mut response_bytes).await.unwrap();
        assert!(response_bytes.is_empty());

        exchange.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unread_request_body_is_drained_before_the_response() {
        let server = server_with(|request: Request| async move {
            // ignore the body entirely
            drop(request);
            Ok(Response::new(204))
        });

        let (peer, local) = duplex(64 * 1024);
        let (local_reader, local_writer) = split(local);
        let (mut peer_reader, mut peer_writer) = split(peer);
        let connection = Connection::new(Box::new(local_reader), Box::new(local_writer));

        let exchange = tokio::spawn(async move { server.accept_connection(connection).await });

        let mut wire = request_wire(b"POST,/,\"\",1000\n");
        wire.extend_from_slice(&[b'x'; 1000]);
        peer_writer.write_all(&wire).await.unwrap();
        peer_writer.shutdown().await.unwrap();

        let mut response_bytes = Vec::new();
        peer_reader.read_to_end(&mut response_bytes).await.unwrap();
        assert!(response_bytes.starts_with(b"hdrs"));

        exchange.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn application_failure_surfaces_as_application_error() {
        let server = server_with(|_request| async move { Err("boom".into()) });

        let (peer, local) = duplex(8 * 1024);
        let (local_reader, local_writer) = split(local);
        let (_peer_reader, mut peer_writer) = split(peer);
        let connection = Connection::new(Box::new(local_reader), Box::new(local_writer));

        let exchange = tokio::spawn(async move { server.accept_connection(connection).await });

        peer_writer.write_all(&request_wire(b"GET,/,\"\",0\n")).await.unwrap();
        peer_writer.shutdown().await.unwrap();

        let result = exchange.await.unwrap();
        assert!(matches!(result, Err(ExchangeError::Application { .. })));
    }

    #[tokio::test]
    async fn garbage_on_the_wire_is_a_protocol_error() {
        let server = server_with(|_request| async move { Ok(Response::new(200)) });

        let (peer, local) = duplex(1024);
        let (local_reader, local_writer) = split(local);
        let (_peer_reader, mut peer_writer) = split(peer);
        let connection = Connection::new(Box::new(local_reader), Box::new(local_writer));

        let exchange = tokio::spawn(async move { server.accept_connection(connection).await });

        peer_writer.write_all(b"not a quasi-http frame").await.unwrap();
        peer_writer.shutdown().await.unwrap();

        let result = exchange.await.unwrap();
        assert!(matches!(result, Err(ExchangeError::Protocol { .. })));
    }
}
