//! Quasi-HTTP response representation.

use http::HeaderMap;

use crate::protocol::{Body, Environment, MessageHead, ProtocolError};

/// A quasi-HTTP response.
///
/// The response special line carries the status code, a status message, the
/// http version and the declared content length, in that order. See
/// [`Request`](crate::protocol::Request) for the content-length framing
/// rules; they are identical in both directions.
#[derive(Debug, Default)]
pub struct Response {
    pub status_code: u16,
    pub status_message: String,
    pub http_version: String,
    pub content_length: i64,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub environment: Environment,
    released: bool,
}

impl Response {
    pub fn new(status_code: u16) -> Self {
        Self { status_code, ..Default::default() }
    }

    /// Releases resources owned by this response, dropping any body stream.
    ///
    /// Idempotent; see [`Request::release`](crate::protocol::Request::release).
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.body.take();
    }

    pub(crate) fn to_head(&self) -> MessageHead {
        MessageHead::new(
            vec![
                self.status_code.to_string(),
                self.status_message.clone(),
                self.http_version.clone(),
                self.content_length.to_string(),
            ],
            self.headers.clone(),
        )
    }

    pub(crate) fn from_head(head: MessageHead) -> Result<Self, ProtocolError> {
        let content_length = head.content_length()?;
        let status_text = head.line.first().map(String::as_str).unwrap_or("");
        let status_code = status_text
            .parse::<u16>()
            .map_err(|_| ProtocolError::violation(format!("malformed status code: {status_text:?}")))?;

        let mut line = head.line.into_iter().skip(1);
        Ok(Self {
            status_code,
            status_message: line.next().unwrap_or_default(),
            http_version: line.next().unwrap_or_default(),
            content_length,
            headers: head.headers,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_round_trip() {
        let mut response = Response::new(200);
        response.status_message = "OK".to_owned();
        response.content_length = -1;

        let head = response.to_head();
        assert_eq!(head.line, vec!["200", "OK", "", "-1"]);

        let decoded = Response::from_head(head).unwrap();
        assert_eq!(decoded.status_code, 200);
        assert_eq!(decoded.status_message, "OK");
        assert_eq!(decoded.http_version, "");
        assert_eq!(decoded.content_length, -1);
    }

    #[test]
    fn malformed_status_code_is_a_violation() {
        let head = MessageHead::new(
            vec!["two hundred".to_owned(), String::new(), String::new(), "0".to_owned()],
            HeaderMap::new(),
        );
        assert!(Response::from_head(head).is_err());
    }
}
