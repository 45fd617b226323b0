//! Core quasi-HTTP protocol abstractions.
//!
//! This module holds the data model shared by the codec and connection
//! layers:
//!
//! - **Messages** ([`message`]): [`Message`], [`PayloadItem`] and
//!   [`PayloadSize`] — the items flowing between the codecs and the
//!   exchange orchestrators, and the mapping from declared content lengths
//!   to body framing strategies
//! - **Header sections** ([`head`]): [`MessageHead`], the decoded special
//!   line plus header multimap
//! - **Requests and responses** ([`request`], [`response`]): the
//!   per-exchange message structs with their idempotent release semantics
//! - **Bodies** ([`body`]): buffered and pull-driven streaming bodies
//! - **Environment** ([`environment`]): the opaque side-channel map shared
//!   between transports, orchestrators and applications
//! - **Errors** ([`error`]): [`ProtocolError`] for the codec layer and
//!   [`ExchangeError`], the single type exchange callers observe
//!
//! Nothing here touches a socket; the connection layer wires these types to
//! whatever duplex byte streams a transport provides.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod head;
pub use head::MessageHead;

mod request;
pub use request::Request;

mod response;
pub use response::Response;

mod error;
pub use error::ExchangeError;
pub use error::ProtocolError;

mod environment;
pub use environment::{EnvValue, Environment, env_keys, flag_enabled};

pub mod body;
pub use body::Body;
