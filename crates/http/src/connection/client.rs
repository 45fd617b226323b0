use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio_util::codec::FramedRead;
use tracing::debug;

use crate::codec::MessageDecoder;
use crate::connection::message_writer::MessageWriter;
use crate::connection::{Deadline, run_under_deadline};
use crate::options::{EffectiveOptions, ProcessingOptions};
use crate::protocol::{
    Body, ExchangeError, Message, PayloadItem, PayloadSize, ProtocolError, Request, Response, env_keys, flag_enabled,
};
use crate::transport::{ClientTransport, Connection, ConnectionReader};

/// The sending side of an exchange.
///
/// A client owns a transport and default processing options; every
/// [`send`](Client::send) allocates a connection from the transport, drives
/// one complete request/response exchange over it under the resolved
/// deadline, and releases the connection on every path — forcibly and
/// best-effort when the exchange failed, so a release problem never masks
/// the original error.
pub struct Client {
    transport: Option<Arc<dyn ClientTransport>>,
    default_options: ProcessingOptions,
}

impl Client {
    pub fn new(transport: Arc<dyn ClientTransport>) -> Self {
        Self { transport: Some(transport), default_options: ProcessingOptions::default() }
    }

    /// A client with no transport; every send fails fast with a
    /// missing-dependency error.
    pub fn unconfigured() -> Self {
        Self { transport: None, default_options: ProcessingOptions::default() }
    }

    pub fn with_default_options(mut self, options: ProcessingOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Sends `request` to `remote_endpoint` and returns the decoded
    /// response.
    ///
    /// Per-call options are preferred over the client defaults over the
    /// built-in defaults. With response buffering enabled (the default) the
    /// returned response carries its complete body, bounded by the
    /// max-response-body-size guard; otherwise the body is a stream that
    /// owns the connection's read half, and the transport is told the
    /// response is still streaming when the connection is released.
    pub async fn send(
        &self,
        remote_endpoint: &str,
        request: Request,
        send_options: Option<ProcessingOptions>,
    ) -> Result<Response, ExchangeError> {
        let transport =
            self.transport.clone().ok_or_else(|| ExchangeError::missing_dependency("client transport"))?;

        let send_options = send_options.unwrap_or_default();
        let merged = ProcessingOptions::merge(&send_options, &self.default_options);

        let mut connection = transport.allocate_connection(remote_endpoint, &merged).await?;
        let effective = EffectiveOptions::resolve(&[connection.options(), &merged]);
        let cancellation = connection.cancellation();
        debug!(endpoint = remote_endpoint, ?effective, "starting client exchange");

        let exchange = Self::run_exchange(&mut connection, request, effective);
        let result = run_under_deadline(Deadline::Send, effective.timeout_millis, cancellation, exchange).await;

        match result {
            Ok((response, response_streaming)) => {
                transport.release_connection(connection, response_streaming).await?;
                Ok(response)
            }
            Err(e) => {
                // best-effort forced release; its outcome must not mask the
                // original failure
                let _ = transport.release_connection(connection, false).await;
                Err(e)
            }
        }
    }

    async fn run_exchange(
        connection: &mut Connection,
        mut request: Request,
        effective: EffectiveOptions,
    ) -> Result<(Response, bool), ExchangeError> {
        if !flag_enabled(&request.environment, env_keys::SKIP_SENDING) {
            let writer = connection
                .take_writer()
                .ok_or_else(|| ExchangeError::missing_dependency("connection writable stream"))?;
            let mut message_writer = MessageWriter::new(writer, effective.max_headers_size);

            let head = request.to_head();
            let content_length = request.content_length;
            let body = request.body.take();
            message_writer.write_message(head, content_length, body).await?;
        }
        request.release();

        let reader = connection
            .take_reader()
            .ok_or_else(|| ExchangeError::missing_dependency("connection readable stream"))?;
        let body_limit = if effective.response_buffering_enabled { effective.max_response_body_size } else { 0 };
        let decoder = MessageDecoder::new(effective.max_headers_size).with_body_limit(body_limit);
        let mut framed_read = FramedRead::with_capacity(reader, decoder, 8 * 1024);

        let (head, payload_size) = match framed_read.next().await {
            None => return Err(ExchangeError::NoResponse),
            Some(Ok(Message::Header(header))) => header,
            Some(Ok(Message::Payload(_))) => {
                return Err(ProtocolError::violation("received body bytes before a response header section").into());
            }
            Some(Err(e)) => return Err(e.into()),
        };
        let mut response = Response::from_head(head)?;

        match payload_size {
            PayloadSize::Empty => Ok((response, false)),
            _ if effective.response_buffering_enabled => {
                response.body = Some(Body::from_bytes(buffer_response_body(&mut framed_read).await?));
                Ok((response, false))
            }
            _ => {
                response.body = Some(Body::from_stream(streamed_response_body(framed_read)));
                Ok((response, true))
            }
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("has_transport", &self.transport.is_some())
            .field("default_options", &self.default_options)
            .finish()
    }
}

async fn buffer_response_body(
    framed_read: &mut FramedRead<ConnectionReader, MessageDecoder>,
) -> Result<Bytes, ExchangeError> {
    let mut buffer = BytesMut::new();
    loop {
        match framed_read.next().await {
            Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => buffer.extend_from_slice(&bytes),
            Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(buffer.freeze()),
            Some(Ok(Message::Header(_))) => {
                return Err(ProtocolError::violation("received a header section in the middle of a body").into());
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(closed_mid_body().into()),
        }
    }
}

fn streamed_response_body(
    framed_read: FramedRead<ConnectionReader, MessageDecoder>,
) -> impl Stream<Item = Result<Bytes, ProtocolError>> + Send {
    futures::stream::unfold(Some(framed_read), |state| async move {
        let mut framed_read = state?;
        match framed_read.next().await {
            Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => Some((Ok(bytes), Some(framed_read))),
            Some(Ok(Message::Payload(PayloadItem::Eof))) => None,
            Some(Ok(Message::Header(_))) => {
                Some((Err(ProtocolError::violation("received a header section in the middle of a body")), None))
            }
            Some(Err(e)) => Some((Err(e), None)),
            None => Some((Err(closed_mid_body()), None)),
        }
    })
}

fn closed_mid_body() -> ProtocolError {
    ProtocolError::io(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed in the middle of a body"))
}
