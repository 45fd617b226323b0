//! Streaming encoder for complete quasi-HTTP messages.
//!
//! Mirror image of [`MessageDecoder`](crate::codec::MessageDecoder): a
//! header item opens the message and installs the body encoder selected by
//! the declared content length; payload items then flow through that
//! encoder until its end-of-body marker. Feeding items out of order is an
//! expectation violation, since the item sequence is produced by this
//! crate's own writers.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::body::PayloadEncoder;
use crate::codec::header::encode_header_block;
use crate::codec::{BODY_TAG, HEADERS_TAG};
use crate::ensure;
use crate::protocol::{Message, MessageHead, PayloadSize, ProtocolError};

#[derive(Debug)]
pub struct MessageEncoder {
    max_headers_size: usize,
    payload_encoder: Option<PayloadEncoder>,
}

impl MessageEncoder {
    pub fn new(max_headers_size: usize) -> Self {
        Self { max_headers_size, payload_encoder: None }
    }
}

impl<D: Buf> Encoder<Message<(MessageHead, PayloadSize), D>> for MessageEncoder {
    type Error = ProtocolError;

    fn encode(&mut self, item: Message<(MessageHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                ensure!(
                    self.payload_encoder.is_none(),
                    ProtocolError::expectation_violation("header section while a body is being encoded")
                );

                let block = encode_header_block(&head.line, &head.headers, self.max_headers_size)?;
                dst.reserve(8 + block.len());
                dst.put_u32(HEADERS_TAG);
                dst.put_u32(block.len() as u32);
                dst.extend_from_slice(&block);

                self.payload_encoder = Some(PayloadEncoder::for_size(payload_size, BODY_TAG));
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(encoder) = &mut self.payload_encoder else {
                    return Err(ProtocolError::expectation_violation("payload item before a header section"));
                };

                let result = encoder.encode(payload_item, dst);
                if encoder.is_finished() {
                    self.payload_encoder.take();
                }
                result
            }
        }
    }
}
