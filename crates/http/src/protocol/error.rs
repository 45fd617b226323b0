use std::error::Error;
use std::io;
use thiserror::Error;

/// Errors raised by the wire codec layer.
///
/// Everything here is an application-level failure, not a panic: protocol
/// violations and limit overruns are recoverable by rejecting the exchange,
/// io errors come from the backing transport, and expectation violations
/// signal a bug in the calling code rather than bad peer input.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("protocol violation: {reason}")]
    Violation { reason: String },

    #[error("header section too large: {current_size} exceeds the limit {max_size}")]
    LengthLimitExceeded { current_size: usize, max_size: usize },

    #[error("stream exceeds the limit of {max_size} bytes")]
    StreamSizeExceeded { max_size: u64 },

    #[error("content length not satisfied: declared {declared}, short by {shortfall} bytes")]
    ContentLengthNotSatisfied { declared: u64, shortfall: u64 },

    #[error("expectation violation: {reason}")]
    ExpectationViolation { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ProtocolError {
    pub fn violation<S: ToString>(reason: S) -> Self {
        Self::Violation { reason: reason.to_string() }
    }

    pub fn length_limit_exceeded(current_size: usize, max_size: usize) -> Self {
        Self::LengthLimitExceeded { current_size, max_size }
    }

    pub fn stream_size_exceeded(max_size: u64) -> Self {
        Self::StreamSizeExceeded { max_size }
    }

    pub fn content_length_not_satisfied(declared: u64, shortfall: u64) -> Self {
        Self::ContentLengthNotSatisfied { declared, shortfall }
    }

    pub fn expectation_violation<S: ToString>(reason: S) -> Self {
        Self::ExpectationViolation { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// The single error type callers of the exchange orchestrators observe.
///
/// Every failure that escapes a client `send` or server `accept_connection`
/// is one of these variants; codec-level causes are chained through
/// [`ExchangeError::Protocol`] and application callback failures through
/// [`ExchangeError::Application`].
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("send timeout")]
    SendTimeout,

    #[error("receive timeout")]
    ReceiveTimeout,

    #[error("no request received")]
    NoRequest,

    #[error("no response received")]
    NoResponse,

    #[error("missing dependency: {name}")]
    MissingDependency { name: &'static str },

    #[error("protocol error: {source}")]
    Protocol {
        #[from]
        source: ProtocolError,
    },

    #[error("application error: {source}")]
    Application { source: Box<dyn Error + Send + Sync> },
}

impl ExchangeError {
    pub fn missing_dependency(name: &'static str) -> Self {
        Self::MissingDependency { name }
    }

    pub fn application<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Application { source: e.into() }
    }
}
