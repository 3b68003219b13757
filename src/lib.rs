//! chainer
//!
//! Ordered, named handler chains for HTTP request processing:
//! - Handlers registered under unique names, run in sequence
//! - Per-chain error state that stops a traversal and propagates out of
//!   nested chains
//! - Redirection to any registered handler by name
//! - Shared variables readable by every handler of a traversal
//! - Chains discoverable from the request they are processing

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod pipeline;

pub use config::AppConfig;
pub use domain::chain::{
    handler_fn, unpack, BufferedResponse, Chain, ChainError, Context, ContextKey, Handler,
    HandlerError, HandlerFn, Link, Request, ResponseWriter,
};

use axum::Router;
use tracing::info;

use api::{create_router, ChainService};

/// Build the HTTP application serving the demo pipeline
pub fn create_app(config: &AppConfig) -> anyhow::Result<Router> {
    let chain = pipeline::build_pipeline(&config.chain)?;
    info!(handlers = ?chain.names(), "Chain ready");

    Ok(create_router(ChainService::from_config(chain, &config.chain)))
}
