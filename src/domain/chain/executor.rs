//! Chain executor - sequential traversal with abort, redirection and nesting

use std::sync::Arc;

use tracing::{debug, debug_span, trace};

use super::context::Request;
use super::entity::Chain;
use super::error::HandlerError;
use super::handler::Link;
use super::response::ResponseWriter;

impl Chain {
    /// Pass `w` and `req` through every handler of the chain in order.
    ///
    /// Blocks until all handlers ran or one of them recorded an error. The
    /// outcome is available afterwards through [`last_error`](Self::last_error).
    pub fn serve(self: &Arc<Self>, w: &mut dyn ResponseWriter, req: &Request) {
        self.traverse(w, req);
    }

    /// Like [`serve`](Self::serve), but returns the traversal's outcome.
    ///
    /// The error is read before the traversal lock is released, so callers
    /// sharing one instance never see the outcome of another traversal.
    pub fn run(
        self: &Arc<Self>,
        w: &mut dyn ResponseWriter,
        req: &Request,
    ) -> Result<(), HandlerError> {
        match self.traverse(w, req) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// One traversal; returns the error it ended with, read under the
    /// traversal lock
    fn traverse(
        self: &Arc<Self>,
        w: &mut dyn ResponseWriter,
        req: &Request,
    ) -> Option<HandlerError> {
        let links = self.lock_links();
        let span = debug_span!("chain", key = %self.key(), handlers = links.len());
        let _enter = span.enter();

        self.lock_state().reset();
        let req = req.with_chain(self.key().clone(), self.clone());

        let mut position = 0;
        while position < links.len() && self.last_error().is_none() {
            let entry = &links[position];
            trace!(handler = %entry.name, position, "Invoking handler");

            match &entry.link {
                // Nested chains are shared between forks
                Link::Chain(nested) => self.record_error(nested.traverse(w, &req)),
                Link::Leaf(handler) => handler.serve(w, &req),
            }

            let mut state = self.lock_state();

            if let Some(err) = &state.error {
                debug!(handler = %entry.name, error = %err, "Chain aborted");
                state.next = None;
                break;
            }

            match state.take_target() {
                Some((target, index)) => {
                    debug!(from = %entry.name, to = %target, "Chain redirected");
                    position = index;
                }
                None => position += 1,
            }
        }

        self.last_error()
    }
}
