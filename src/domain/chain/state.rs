//! Mutable execution state shared by all handlers of one chain instance

use std::collections::HashMap;

use serde_json::Value;

use super::error::HandlerError;

/// State guarded by the chain's state lock.
///
/// `index` mirrors the registry so redirection can be validated from inside
/// a running handler while the registry itself is locked by the traversal.
#[derive(Debug, Default)]
pub(crate) struct ExecutionState {
    pub error: Option<HandlerError>,
    pub next: Option<String>,
    pub variables: HashMap<String, Value>,
    pub index: HashMap<String, usize>,
}

impl ExecutionState {
    /// State for a cloned chain: same variables and names, no error or target
    pub fn fork(&self) -> Self {
        Self {
            error: None,
            next: None,
            variables: self.variables.clone(),
            index: self.index.clone(),
        }
    }

    /// Clear per-traversal state
    pub fn reset(&mut self) {
        self.error = None;
        self.next = None;
    }

    /// Take the pending redirection target and resolve it to a position
    pub fn take_target(&mut self) -> Option<(String, usize)> {
        let name = self.next.take()?;
        let position = *self.index.get(&name)?;
        Some((name, position))
    }
}
