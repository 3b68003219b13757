//! Handler capability and the link variants a chain is built from

use std::fmt;
use std::sync::Arc;

use super::context::Request;
use super::entity::Chain;
use super::response::ResponseWriter;

/// A unit of request processing.
///
/// Handlers signal failure or redirection through the chain they run in,
/// which they retrieve from the request with [`Request::chain`].
pub trait Handler: Send + Sync {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request);
}

/// Adapts a closure into a [`Handler`]
pub struct HandlerFn<F>(F);

impl<F> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        (self.0)(w, req)
    }
}

/// Shorthand for [`HandlerFn::new`]
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync,
{
    HandlerFn::new(f)
}

impl Handler for Arc<Chain> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        Chain::serve(self, w, req)
    }
}

/// A handler registered in a chain.
///
/// Only the `Chain` variant has its error copied into the parent after it
/// runs. A chain wrapped as a `Leaf` runs normally but its error stays local.
#[derive(Clone)]
pub enum Link {
    Leaf(Arc<dyn Handler>),
    Chain(Arc<Chain>),
}

impl Link {
    pub fn leaf(handler: impl Handler + 'static) -> Self {
        Self::Leaf(Arc::new(handler))
    }

    pub fn is_chain(&self) -> bool {
        matches!(self, Self::Chain(_))
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(_) => f.write_str("Leaf"),
            Self::Chain(chain) => f.debug_tuple("Chain").field(&chain.key()).finish(),
        }
    }
}

impl From<Arc<dyn Handler>> for Link {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Self::Leaf(handler)
    }
}

impl From<Arc<Chain>> for Link {
    fn from(chain: Arc<Chain>) -> Self {
        Self::Chain(chain)
    }
}

impl<F> From<HandlerFn<F>> for Link
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn from(handler: HandlerFn<F>) -> Self {
        Self::leaf(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::{BufferedResponse, ContextKey};
    use bytes::Bytes;

    fn request() -> Request {
        Request::new(axum::http::Request::new(Bytes::new()))
    }

    #[test]
    fn test_handler_fn_writes() {
        let handler = handler_fn(|w, _req| w.write(b"hi"));
        let mut response = BufferedResponse::new();

        handler.serve(&mut response, &request());

        assert_eq!(response.body_text(), "hi");
    }

    #[test]
    fn test_link_variants() {
        let chain = Chain::new(ContextKey::new("k"));

        assert!(Link::from(chain.clone()).is_chain());
        assert!(!Link::from(handler_fn(|_, _| {})).is_chain());

        let wrapped: Arc<dyn Handler> = Arc::new(chain);
        assert!(!Link::from(wrapped).is_chain());
    }
}
