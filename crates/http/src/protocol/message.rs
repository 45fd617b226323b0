use bytes::{Buf, Bytes};

/// A decoded or to-be-encoded item of a quasi-HTTP message stream.
///
/// A message on the wire is a header section followed by zero or more body
/// payload chunks; both directions (request and response) share this shape.
/// The generic parameter `T` is the header item produced or consumed by the
/// codec, `Data` the payload chunk type (defaults to [`Bytes`]).
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    /// The decoded header section of a message
    Header(T),
    /// A body chunk or the end-of-body marker
    Payload(PayloadItem<Data>),
}

/// One item of a message body stream: a chunk of bytes, or end of body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of body data
    Chunk(Data),
    /// Marks the end of the body stream
    Eof,
}

/// How a message body is delimited within the shared connection stream.
///
/// Derived from the declared content length of a message: a positive length
/// selects fixed-length passthrough, a negative length selects
/// tag/length/value chunk framing, and zero means the message has no body
/// bytes on the wire at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Exactly this many raw bytes follow the header section
    Length(u64),
    /// A sequence of tagged frames terminated by a zero-length frame
    Chunked,
    /// No body bytes on the wire
    Empty,
}

impl PayloadSize {
    /// Maps a declared content length onto a framing strategy.
    pub fn from_content_length(content_length: i64) -> Self {
        match content_length {
            n if n > 0 => PayloadSize::Length(n as u64),
            0 => PayloadSize::Empty,
            _ => PayloadSize::Chunked,
        }
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    /// Converts the message into its payload item, or `None` for headers.
    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Header(_) => None,
            Message::Payload(payload_item) => Some(payload_item),
        }
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Returns the contained bytes if this is a chunk, `None` for EOF.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the item and returns the contained bytes, `None` for EOF.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
