//! Message body representations.
//!
//! A body is either a fully buffered chunk of bytes or a pull-driven stream
//! of chunks. Streamed bodies are how large payloads cross an exchange
//! without being held in memory: the consumer polls, and only then does the
//! underlying connection get read.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::protocol::ProtocolError;

mod body_channel;
pub(crate) use body_channel::body_channel;

/// The body of a request or response.
pub enum Body {
    /// A body that is entirely in memory
    Full(Bytes),
    /// A body delivered chunk by chunk as the consumer polls
    Stream(BoxStream<'static, Result<Bytes, ProtocolError>>),
}

impl Body {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Body::Full(bytes.into())
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ProtocolError>> + Send + 'static,
    {
        Body::Stream(stream.boxed())
    }

    /// Reads the body to its end and returns the concatenated bytes.
    ///
    /// Size limits are enforced where the chunks are produced (the decode
    /// layer), not here.
    pub async fn collect(self) -> Result<Bytes, ProtocolError> {
        match self {
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Ok(buffer.freeze())
            }
        }
    }
}

impl Stream for Body {
    type Item = Result<Bytes, ProtocolError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this {
            // a full body yields its bytes once, then stays terminated
            Body::Full(bytes) => {
                if bytes.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(std::mem::take(bytes))))
                }
            }
            Body::Stream(stream) => Pin::new(stream).poll_next(cx),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Body::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_body_yields_once() {
        let mut body = Body::from_bytes("hello");
        assert_eq!(body.next().await.unwrap().unwrap().as_ref(), b"hello");
        assert!(body.next().await.is_none());
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn collect_concatenates_stream_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"he")), Ok(Bytes::from_static(b"llo"))];
        let body = Body::from_stream(futures::stream::iter(chunks));
        assert_eq!(body.collect().await.unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn collect_surfaces_stream_errors() {
        let chunks = vec![Ok(Bytes::from_static(b"he")), Err(ProtocolError::violation("broken"))];
        let body = Body::from_stream(futures::stream::iter(chunks));
        assert!(body.collect().await.is_err());
    }
}
