//! The application collaborator contract.
//!
//! A server turns each decoded request into a response by calling its
//! configured [`Handler`]; [`make_handler`] adapts a plain async function.
//! Handler failures propagate as exchange failures with the original error
//! as the cause.

use std::error::Error;
use std::future::Future;

use async_trait::async_trait;

use crate::protocol::{Request, Response};

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, Box<dyn Error + Send + Sync>>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Box<dyn Error + Send + Sync>>> + Send,
{
    async fn handle(&self, request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
        (self.f)(request).await
    }
}

pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Box<dyn Error + Send + Sync>>> + Send,
{
    HandlerFn { f }
}
