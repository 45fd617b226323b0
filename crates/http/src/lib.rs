//! Request/response messaging with HTTP semantics over arbitrary duplex
//! transports.
//!
//! This crate implements a "quasi-HTTP" protocol: exchanges keep the shape
//! of HTTP — a method, a target, headers, a status code, a body — but the
//! bytes travel over whatever byte-oriented duplex connection a transport
//! collaborator provides: TCP, in-process pipes, or anything custom. The
//! crate owns the wire codec and the exchange orchestration; transports own
//! connection allocation and teardown, and applications own turning a
//! request into a response.
//!
//! # Features
//!
//! - Header sections as delimited text with strict quoting and validation
//! - Fixed-length and tag/length/value body framing, selected per message
//!   by its declared content length
//! - Pull-driven body streaming with real backpressure on both sides
//! - Deadline and cancellation racing around every exchange
//! - Configurable size limits for header sections and buffered responses
//! - Deterministic connection and message release on every path
//!
//! # Example
//!
//! A complete exchange over the bundled in-process transport:
//!
//! ```
//! use std::error::Error;
//! use std::sync::Arc;
//!
//! use http::HeaderValue;
//! use quasi_http::connection::{Client, Server};
//! use quasi_http::handler::make_handler;
//! use quasi_http::protocol::{Body, Request, Response};
//! use quasi_http::transport::memory::{MemoryClientTransport, MemoryServerTransport};
//!
//! async fn greet(request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
//!     let mut response = Response::new(200);
//!     response.headers.append("content-type", HeaderValue::from_static("text/plain"));
//!     response.content_length = 2;
//!     response.body = Some(Body::from_bytes("hi"));
//!     Ok(response)
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
//!     let server = Arc::new(Server::new(Arc::new(make_handler(greet)), Arc::new(MemoryServerTransport)));
//!     let client = Client::new(Arc::new(MemoryClientTransport::new(server)));
//!
//!     let mut request = Request::new("GET", "/");
//!     request.headers.append("accept", HeaderValue::from_static("text/plain"));
//!
//!     let mut response = client.send("in-memory", request, None).await?;
//!     assert_eq!(response.status_code, 200);
//!
//!     let body = response.body.take().expect("response body").collect().await?;
//!     assert_eq!(&body[..], b"hi");
//!     response.release();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: the wire codec — header-section encoding/decoding and the
//!   two body framing strategies, all as `tokio_util` codecs
//! - [`protocol`]: requests, responses, bodies, environments and errors
//! - [`connection`]: the [`Client`](connection::Client) and
//!   [`Server`](connection::Server) exchange orchestrators
//! - [`transport`]: the contracts transports implement, plus the
//!   in-process duplex transport
//! - [`handler`]: the application callback contract
//! - [`options`]: processing options and their tiered merge rules
//! - [`race`]: the first-settled-wins primitive behind deadline handling
//!
//! # Wire format
//!
//! A message starts with a header-section frame: a 4-byte tag, a 4-byte
//! big-endian length, then that many bytes of delimited text (row 0 the
//! special line, further rows one header name with its values). Body bytes
//! follow either raw (positive declared content length, exactly that many
//! bytes) or as tag/length/value frames closed by a zero-length frame
//! (negative declared length). A declared length of zero means no body
//! bytes at all.
//!
//! # Limits
//!
//! - Header section: 8 KiB by default, per message
//! - Buffered response bodies: 128 MiB by default
//!
//! Both are adjustable through [`options::ProcessingOptions`].

pub mod codec;
pub mod connection;
pub mod handler;
pub mod options;
pub mod protocol;
pub mod race;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
