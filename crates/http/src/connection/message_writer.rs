use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

use crate::codec::MessageEncoder;
use crate::protocol::{Body, Message, MessageHead, PayloadItem, PayloadSize, ProtocolError};

/// Encodes a message into an owned buffer and writes it out.
///
/// Header bytes always reach the wire before the first body byte, and each
/// body chunk is flushed as it is encoded so a streaming peer sees progress
/// without waiting for the end of the message.
pub(crate) struct MessageWriter<W> {
    writer: W,
    buffer: BytesMut,
    encoder: MessageEncoder,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(writer: W, max_headers_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(8 * 1024), encoder: MessageEncoder::new(max_headers_size) }
    }

    /// Writes one complete message: header section, then the body pumped
    /// chunk by chunk, then the end-of-body marker.
    ///
    /// The body pipeline runs whenever a body object is present, even at a
    /// declared length of zero; the zero-length encoder contributes no
    /// bytes but still flags a body that produces data it never declared.
    pub(crate) async fn write_message(
        &mut self,
        head: MessageHead,
        content_length: i64,
        body: Option<Body>,
    ) -> Result<(), ProtocolError> {
        let payload_size = PayloadSize::from_content_length(content_length);
        self.encoder.encode(Message::<_, Bytes>::Header((head, payload_size)), &mut self.buffer)?;
        self.flush().await?;

        if let Some(mut body) = body {
            while let Some(chunk) = body.next().await {
                self.encoder
                    .encode(Message::<(MessageHead, PayloadSize)>::Payload(PayloadItem::Chunk(chunk?)), &mut self.buffer)?;
                self.flush().await?;
            }
        }

        self.encoder.encode(Message::<(MessageHead, PayloadSize)>::Payload(PayloadItem::Eof), &mut self.buffer)?;
        self.flush().await
    }

    async fn flush(&mut self) -> Result<(), ProtocolError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.writer.write_all(self.buffer.as_ref()).await?;
        self.buffer.clear();
        Ok(self.writer.flush().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    fn head(line: &[&str]) -> MessageHead {
        MessageHead::new(line.iter().map(|s| (*s).to_owned()).collect(), HeaderMap::new())
    }

    #[tokio::test]
    async fn fixed_length_message_on_the_wire() {
        let mut sink = Vec::new();
        let mut writer = MessageWriter::new(&mut sink, 8192);

        writer
            .write_message(head(&["200", "", "", "5"]), 5, Some(Body::from_bytes("hello")))
            .await
            .unwrap();

        let block = b"200,\"\",\"\",5\n";
        let mut expected = Vec::new();
        expected.extend_from_slice(b"hdrs");
        expected.extend_from_slice(&(block.len() as u32).to_be_bytes());
        expected.extend_from_slice(block);
        expected.extend_from_slice(b"hello");
        assert_eq!(sink, expected);
    }

    #[tokio::test]
    async fn missing_body_for_declared_length_fails_with_shortfall() {
        let mut sink = Vec::new();
        let mut writer = MessageWriter::new(&mut sink, 8192);

        let result = writer.write_message(head(&["200", "", "", "5"]), 5, None).await;
        assert!(matches!(result, Err(ProtocolError::ContentLengthNotSatisfied { declared: 5, shortfall: 5 })));
    }

    #[tokio::test]
    async fn zero_length_with_body_object_writes_nothing_extra() {
        let mut sink = Vec::new();
        let mut writer = MessageWriter::new(&mut sink, 8192);

        writer.write_message(head(&["200", "", "", "0"]), 0, Some(Body::from_bytes(""))).await.unwrap();

        let block = b"200,\"\",\"\",0\n";
        assert_eq!(sink.len(), 8 + block.len());
    }

    #[tokio::test]
    async fn zero_length_with_a_producing_body_is_flagged() {
        let mut sink = Vec::new();
        let mut writer = MessageWriter::new(&mut sink, 8192);

        let result = writer.write_message(head(&["200", "", "", "0"]), 0, Some(Body::from_bytes("x"))).await;
        assert!(matches!(result, Err(ProtocolError::ExpectationViolation { .. })));
    }
}
