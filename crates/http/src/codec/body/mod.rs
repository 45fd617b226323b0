//! Body framing codecs.
//!
//! Two interchangeable strategies delimit a body within the shared
//! connection stream, selected by the declared content length:
//!
//! - [`LengthDecoder`] / [`LengthEncoder`]: fixed-length passthrough, the
//!   declared byte count enforced exactly on both sides
//! - [`ChunkDecoder`] / [`ChunkEncoder`]: tag/length/value frames with a
//!   zero-length terminator, for bodies whose length is unknown upfront
//!
//! [`PayloadDecoder`] and [`PayloadEncoder`] dispatch between them, and
//! [`GuardedDecoder`] bounds the bytes any decoder may deliver.

mod chunk_decoder;
mod chunk_encoder;
mod guarded_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunk_decoder::ChunkDecoder;
pub use chunk_encoder::ChunkEncoder;
pub use guarded_decoder::GuardedDecoder;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
