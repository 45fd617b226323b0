//! Exchange orchestration.
//!
//! One exchange is one request travelling one way over a connection and one
//! response travelling back. [`Client`] drives the sending side: encode and
//! write the request, read and decode the response, hand the connection
//! back to the transport. [`Server`] drives the receiving side: read and
//! decode the request, invoke the application, encode and write its
//! response, release everything.
//!
//! Both directions run their whole exchange under an optional deadline and
//! cancellation token, racing the main sequence against them with a
//! first-settled-wins primitive. A lost race abandons the sequence (the
//! future is dropped, in-flight io is not cancelled) and releases the
//! connection best-effort before surfacing a timeout error.

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::protocol::ExchangeError;
use crate::race::first_settled;

mod client;
mod message_writer;
mod server;

pub use client::Client;
pub use server::Server;

/// Which side's deadline is being enforced; decides the timeout error.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deadline {
    Send,
    Receive,
}

impl Deadline {
    fn error(self) -> ExchangeError {
        match self {
            Deadline::Send => ExchangeError::SendTimeout,
            Deadline::Receive => ExchangeError::ReceiveTimeout,
        }
    }
}

/// Races `main` against the configured deadline and cancellation token.
///
/// `timeout_millis <= 0` disables the deadline. Whichever participant
/// settles first wins: a finished main sequence makes the deadline
/// irrelevant, a fired deadline or cancellation abandons the sequence and
/// yields the side's timeout error.
pub(crate) async fn run_under_deadline<T, F>(
    deadline: Deadline,
    timeout_millis: i64,
    cancellation: Option<CancellationToken>,
    main: F,
) -> Result<T, ExchangeError>
where
    T: Send,
    F: Future<Output = Result<T, ExchangeError>> + Send,
{
    if timeout_millis <= 0 && cancellation.is_none() {
        return main.await;
    }

    let mut candidates: Vec<BoxFuture<'_, Result<T, ExchangeError>>> = vec![main.boxed()];

    if timeout_millis > 0 {
        candidates.push(
            async move {
                tokio::time::sleep(Duration::from_millis(timeout_millis as u64)).await;
                Err(deadline.error())
            }
            .boxed(),
        );
    }

    if let Some(token) = cancellation {
        candidates.push(
            async move {
                token.cancelled().await;
                Err(deadline.error())
            }
            .boxed(),
        );
    }

    first_settled(candidates).await
}
