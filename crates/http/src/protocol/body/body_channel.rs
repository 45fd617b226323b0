//! Pull-driven bridge between a decoded payload stream and a body consumer.
//!
//! The server invokes the application while the request body is still
//! arriving on the connection. The bridge splits that into two halves:
//!
//! - [`BodySender`]: owns the framed payload stream and reads from it only
//!   when the consumer has asked for the next chunk
//! - [`BodyReceiver`]: the [`Stream`] handed to the application, which sends
//!   one request-data signal per chunk it wants
//!
//! Because the sender reads at most one item per signal, backpressure is
//! real: a consumer that stops polling stops all reads from the underlying
//! connection. When the consumer drops its half without reaching end of
//! body, the remaining wire bytes are drained through
//! [`BodySender::skip_data`] so the connection stays usable.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt, channel::mpsc};
use tracing::{error, info};

use crate::protocol::{Message, MessageHead, PayloadItem, PayloadSize, ProtocolError};

pub(crate) fn body_channel<S>(payload_stream: &mut S) -> (BodySender<'_, S>, BodyReceiver)
where
    S: Stream<Item = Result<Message<(MessageHead, PayloadSize)>, ProtocolError>> + Unpin,
{
    let (signal_sender, signal_receiver) = mpsc::channel(8);
    let (data_sender, data_receiver) = mpsc::channel(8);

    (
        BodySender { payload_stream, signal_receiver, data_sender, eof: false },
        BodyReceiver { signal_sender, data_receiver, in_flight: false, finished: false },
    )
}

#[derive(Debug)]
pub(crate) enum BodySignal {
    RequestData,
}

pub(crate) struct BodySender<'conn, S> {
    payload_stream: &'conn mut S,
    signal_receiver: mpsc::Receiver<BodySignal>,
    data_sender: mpsc::Sender<Result<PayloadItem, ProtocolError>>,
    eof: bool,
}

impl<S> BodySender<'_, S>
where
    S: Stream<Item = Result<Message<(MessageHead, PayloadSize)>, ProtocolError>> + Unpin,
{
    /// Forwards body items to the receiver, one per request signal, until
    /// end of body or until the receiver goes away.
    pub(crate) async fn run(&mut self) -> Result<(), ProtocolError> {
        if self.eof {
            return Ok(());
        }

        while let Some(BodySignal::RequestData) = self.signal_receiver.next().await {
            match self.read_item().await {
                Ok(payload_item) => {
                    self.eof = payload_item.is_eof();
                    if self.data_sender.send(Ok(payload_item)).await.is_err() {
                        // consumer dropped its half; leftover bytes are
                        // drained by skip_data afterwards
                        break;
                    }
                    if self.eof {
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("failed to read body item from connection, {}", e);
                    // hand the consumer a mirror of the failure, keep the
                    // original for the exchange outcome
                    let copy = ProtocolError::io(io::Error::other(e.to_string()));
                    let _ = self.data_sender.send(Err(copy)).await;
                    self.eof = true;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    async fn read_item(&mut self) -> Result<PayloadItem, ProtocolError> {
        match self.payload_stream.next().await {
            Some(Ok(Message::Payload(payload_item))) => Ok(payload_item),
            Some(Ok(Message::Header(_))) => {
                error!("received a header section in the middle of a body");
                Err(ProtocolError::violation("received a header section in the middle of a body"))
            }
            Some(Err(e)) => Err(e),
            None => Err(ProtocolError::io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed in the middle of a body",
            ))),
        }
    }

    /// Drains whatever is left of the body from the connection.
    ///
    /// Required when the application finished without reading the complete
    /// body; the bytes logically belong to this exchange and must not be
    /// left for a later reader of the same connection.
    pub(crate) async fn skip_data(&mut self) -> Result<(), ProtocolError> {
        if self.eof {
            return Ok(());
        }

        let mut skipped: usize = 0;
        loop {
            match self.read_item().await? {
                PayloadItem::Eof => {
                    self.eof = true;
                    if skipped > 0 {
                        info!(skipped, "discarded unread body bytes");
                    }
                    return Ok(());
                }
                PayloadItem::Chunk(bytes) => skipped += bytes.len(),
            }
        }
    }
}

/// The consumer half: a chunk stream with one in-flight request at a time.
#[derive(Debug)]
pub(crate) struct BodyReceiver {
    signal_sender: mpsc::Sender<BodySignal>,
    data_receiver: mpsc::Receiver<Result<PayloadItem, ProtocolError>>,
    in_flight: bool,
    finished: bool,
}

impl Stream for BodyReceiver {
    type Item = Result<Bytes, ProtocolError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // termination is idempotent: once end of body was observed, further
        // polls return None without touching the channels
        if this.finished {
            return Poll::Ready(None);
        }

        if !this.in_flight {
            match Pin::new(&mut this.signal_sender).poll_ready(cx) {
                Poll::Ready(Ok(())) => {
                    if Pin::new(&mut this.signal_sender).start_send(BodySignal::RequestData).is_err() {
                        this.finished = true;
                        return Poll::Ready(Some(Err(pump_gone())));
                    }
                    this.in_flight = true;
                }
                Poll::Ready(Err(_)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(pump_gone())));
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        match this.data_receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(PayloadItem::Chunk(bytes)))) => {
                this.in_flight = false;
                Poll::Ready(Some(Ok(bytes)))
            }
            Poll::Ready(Some(Ok(PayloadItem::Eof))) => {
                this.in_flight = false;
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                this.in_flight = false;
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(Some(Err(pump_gone())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

fn pump_gone() -> ProtocolError {
    ProtocolError::io(io::Error::new(io::ErrorKind::UnexpectedEof, "body stream closed before end of body"))
}
