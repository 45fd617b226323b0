//! Encoder for bodies with a declared exact byte count.
//!
//! Writes payload bytes straight through, but holds the caller to its own
//! declaration: producing more bytes than declared is an expectation
//! violation (a bug in the producing code, not a peer problem), and ending
//! the body short of the declaration fails with the declared length and the
//! missing byte count.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::ensure;
use crate::protocol::{PayloadItem, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    declared: u64,
    remaining: u64,
    finished: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { declared: length, remaining: length, finished: false }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = ProtocolError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(data) => {
                if !data.has_remaining() {
                    return Ok(());
                }

                let len = data.remaining() as u64;
                ensure!(
                    len <= self.remaining,
                    ProtocolError::expectation_violation(format!(
                        "body produced more than the declared {} bytes",
                        self.declared
                    ))
                );

                dst.put(data);
                self.remaining -= len;
                Ok(())
            }
            PayloadItem::Eof => {
                ensure!(
                    self.remaining == 0,
                    ProtocolError::content_length_not_satisfied(self.declared, self.remaining)
                );
                self.finished = true;
                Ok(())
            }
        }
    }
}
