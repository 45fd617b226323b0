//! First-settled racing of asynchronous operations.
//!
//! The protocol layer never cancels in-flight io; it abandons it. Racing an
//! operation against a deadline (or any number of other operations) means
//! waiting for whichever settles first and dropping the rest — a dropped
//! future simply stops being polled, and if its underlying work completes
//! anyway the result goes nowhere.

use futures::future::{BoxFuture, select_all};

/// Resolves to the output of whichever candidate settles first; the
/// remaining candidates are dropped.
///
/// Needs at least one candidate. Generic over the output so the same
/// primitive serves timeout racing, cancellation tokens and any-of-N
/// cleanup waits.
pub async fn first_settled<T>(candidates: Vec<BoxFuture<'_, T>>) -> T {
    debug_assert!(!candidates.is_empty(), "racing zero candidates can never settle");
    let (value, _winner_index, _rest) = select_all(candidates).await;
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::time::Duration;

    #[tokio::test]
    async fn winner_takes_all_against_never_settling_candidates() {
        let candidates: Vec<BoxFuture<'_, u32>> = vec![
            futures::future::pending().boxed(),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                7
            }
            .boxed(),
            futures::future::pending().boxed(),
        ];

        assert_eq!(first_settled(candidates).await, 7);
    }

    #[tokio::test]
    async fn fastest_of_several_wins() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "slow"
        }
        .boxed();
        let fast = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            "fast"
        }
        .boxed();

        assert_eq!(first_settled(vec![slow, fast]).await, "fast");
    }

    #[tokio::test]
    async fn single_candidate_resolves_directly() {
        let only = async { 42 }.boxed();
        assert_eq!(first_settled::<i32>(vec![only]).await, 42);
    }
}
