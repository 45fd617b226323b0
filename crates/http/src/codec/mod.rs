//! Wire codec for quasi-HTTP messages.
//!
//! Everything on the wire is built from two frame shapes:
//!
//! - the header section: one `[4-byte tag][4-byte big-endian length]`
//!   frame whose payload is a delimited-text block (see [`header`])
//! - the body: either exactly content-length raw bytes, or a run of
//!   tag/length/value frames closed by a zero-length frame (see [`body`])
//!
//! [`MessageDecoder`] and [`MessageEncoder`] sequence those pieces into
//! whole messages. Both are `tokio_util` codecs: the decoder is pumped by a
//! `FramedRead`, which gives the pull-driven backpressure and
//! leftover-bytes behavior the connection layer depends on; the encoder
//! writes into a caller-owned buffer that is flushed explicitly.

pub mod body;
pub mod header;

mod message_decoder;
mod message_encoder;

pub use message_decoder::MessageDecoder;
pub use message_encoder::MessageEncoder;

/// Frame tag introducing a header section ("hdrs").
pub const HEADERS_TAG: u32 = 0x6864_7273;

/// Frame tag carried by body chunk frames and the body terminator ("body").
pub const BODY_TAG: u32 = 0x626f_6479;
