//! Domain layer - the chain engine

pub mod chain;

pub use chain::{Chain, ChainError, ContextKey, Handler, HandlerError, Link, Request};
