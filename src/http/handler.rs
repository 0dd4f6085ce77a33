//! Handler abstraction.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::request::Request;
use crate::http::response::{IntoResponse, Response};

/// Terminal request handler (a view).
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<'static, Response>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut, R> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        let fut = (self.f)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```
/// use switchyard::http::{handler_fn, Request};
///
/// let hello = handler_fn(|_req: Request| async { "hello" });
/// # let _ = hello;
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    Arc::new(HandlerFn { f })
}
