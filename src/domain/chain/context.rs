//! Request view and the per-request context chains attach themselves to
//!
//! A traversal never mutates the incoming request. It derives a new
//! [`Request`] view whose [`Context`] carries a reference to the running
//! chain under the chain's [`ContextKey`], and passes that view to every
//! handler it invokes. Handlers look the chain up again with the same key.

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;

use super::entity::Chain;

/// Opaque key a chain is stored under in the request context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey(Arc<str>);

impl ContextKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// A fresh key that cannot collide with any other key
    pub fn unique() -> Self {
        Self::new(format!("chain-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ContextKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

struct Entry {
    key: ContextKey,
    chain: Arc<Chain>,
    parent: Option<Arc<Entry>>,
}

/// Immutable per-request context.
///
/// Attaching returns a new context; existing contexts are never modified.
/// Lookups resolve the most recent attachment first.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Entry>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that additionally carries `chain` under `key`
    pub fn with_chain(&self, key: ContextKey, chain: Arc<Chain>) -> Self {
        Self {
            head: Some(Arc::new(Entry {
                key,
                chain,
                parent: self.head.clone(),
            })),
        }
    }

    /// Find the chain attached under `key`
    pub fn chain(&self, key: &ContextKey) -> Option<Arc<Chain>> {
        let mut current = self.head.as_deref();

        while let Some(entry) = current {
            if &entry.key == key {
                return Some(entry.chain.clone());
            }
            current = entry.parent.as_deref();
        }

        None
    }

    /// Number of chain attachments, innermost included
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.head.as_deref();

        while let Some(entry) = current {
            depth += 1;
            current = entry.parent.as_deref();
        }

        depth
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        let mut current = self.head.as_deref();

        while let Some(entry) = current {
            keys.push(entry.key.as_str());
            current = entry.parent.as_deref();
        }

        f.debug_struct("Context").field("chains", &keys).finish()
    }
}

/// An inbound request as seen by chain handlers
#[derive(Clone, Debug)]
pub struct Request {
    http: Arc<axum::http::Request<Bytes>>,
    context: Context,
}

impl Request {
    pub fn new(http: axum::http::Request<Bytes>) -> Self {
        Self {
            http: Arc::new(http),
            context: Context::new(),
        }
    }

    /// Derive a view of this request carrying `chain` under `key`.
    ///
    /// The underlying HTTP request is shared, not copied.
    pub fn with_chain(&self, key: ContextKey, chain: Arc<Chain>) -> Self {
        Self {
            http: self.http.clone(),
            context: self.context.with_chain(key, chain),
        }
    }

    /// Retrieve the chain attached under `key`
    pub fn chain(&self, key: &ContextKey) -> Option<Arc<Chain>> {
        self.context.chain(key)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn http(&self) -> &axum::http::Request<Bytes> {
        &self.http
    }

    pub fn method(&self) -> &Method {
        self.http.method()
    }

    pub fn uri(&self) -> &Uri {
        self.http.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.http.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.http.body()
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }
}

impl From<axum::http::Request<Bytes>> for Request {
    fn from(http: axum::http::Request<Bytes>) -> Self {
        Self::new(http)
    }
}

/// Retrieve the chain attached to `request` under `key`
pub fn unpack(request: &Request, key: &ContextKey) -> Option<Arc<Chain>> {
    request.chain(key)
}
