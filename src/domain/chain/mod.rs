//! Handler chains - ordered, named handlers run in sequence against a request
//!
//! A [`Chain`] invokes its handlers one after another. Handlers cooperate with
//! the chain they run in, looked up from the request by the chain's
//! [`ContextKey`]:
//! - [`Chain::set_error`] stops the traversal once the handler returns
//! - [`Chain::move_to`] continues the traversal at another named handler
//! - [`Chain::get`] / [`Chain::set`] share variables between handlers
//!
//! A chain registered inside another chain runs as one step of its parent,
//! and an error recorded inside it stops the parent as well.

mod context;
mod entity;
mod error;
mod executor;
mod handler;
mod response;
mod state;

pub use context::{unpack, Context, ContextKey, Request};
pub use entity::Chain;
pub use error::{ChainError, HandlerError};
pub use handler::{handler_fn, Handler, HandlerFn, Link};
pub use response::{BufferedResponse, ResponseWriter};
