//! Chain entity - handler registry and shared execution state

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::context::ContextKey;
use super::error::{ChainError, HandlerError};
use super::handler::Link;
use super::state::ExecutionState;

/// A handler registered under a name
#[derive(Debug, Clone)]
pub(crate) struct NamedLink {
    pub name: String,
    pub link: Link,
}

/// An ordered, named collection of handlers executed in sequence against
/// one request.
///
/// Chains are always shared through `Arc` so that a running traversal can
/// expose itself to its handlers via the request context.
///
/// Two locks guard a chain. The registry lock is held for the whole of a
/// traversal, which serializes traversals of one instance. The state lock
/// guards the error, the redirection target and the variables, and is only
/// held for the duration of a single accessor call.
///
/// A handler must not call [`append`](Self::append), [`names`](Self::names),
/// [`fork`](Self::fork) or [`serve`](Self::serve) on the chain that is
/// currently running it; those calls wait for the traversal and deadlock.
pub struct Chain {
    key: ContextKey,
    links: Mutex<Vec<NamedLink>>,
    state: Mutex<ExecutionState>,
}

impl Chain {
    /// Create an empty chain stored in request contexts under `key`
    pub fn new(key: impl Into<ContextKey>) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            links: Mutex::new(Vec::new()),
            state: Mutex::new(ExecutionState::default()),
        })
    }

    pub fn key(&self) -> &ContextKey {
        &self.key
    }

    /// Register `handler` under `name`, which must be unique in this chain
    pub fn append(
        &self,
        name: impl Into<String>,
        handler: impl Into<Link>,
    ) -> Result<(), ChainError> {
        let name = name.into();
        let mut links = self.lock_links();
        let mut state = self.lock_state();

        if state.index.contains_key(&name) {
            warn!(chain = %self.key, handler = %name, "Duplicate handler name rejected");
            return Err(ChainError::duplicate_name(name));
        }

        let link = handler.into();
        debug!(
            chain = %self.key,
            handler = %name,
            position = links.len(),
            nested = link.is_chain(),
            "Handler registered"
        );

        state.index.insert(name.clone(), links.len());
        links.push(NamedLink { name, link });
        Ok(())
    }

    /// Handler names in registration order.
    ///
    /// Shares the lock with traversals, so the result is never a torn list.
    pub fn names(&self) -> Vec<String> {
        self.lock_links()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock_links().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_links().is_empty()
    }

    /// Returns `true` if a handler is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.lock_state().index.contains_key(name)
    }

    /// Clone this chain.
    ///
    /// The clone shares the key and the registered handlers and starts with a
    /// copy of the current variables. Error and redirection state are not
    /// carried over. Useful to give concurrent callers their own variables.
    pub fn fork(&self) -> Arc<Self> {
        let links = self.lock_links();
        let state = self.lock_state().fork();

        Arc::new(Self {
            key: self.key.clone(),
            links: Mutex::new(links.clone()),
            state: Mutex::new(state),
        })
    }

    /// Record an error; the traversal stops once the current handler returns
    pub fn set_error(&self, err: impl Into<anyhow::Error>) {
        self.record_error(Some(HandlerError::new(err)));
    }

    /// Clear the recorded error
    pub fn clear_error(&self) {
        self.record_error(None);
    }

    /// The most recently recorded error, if any
    pub fn last_error(&self) -> Option<HandlerError> {
        self.lock_state().error.clone()
    }

    pub(crate) fn record_error(&self, err: Option<HandlerError>) {
        self.lock_state().error = err;
    }

    /// Continue execution at the handler registered under `name` once the
    /// current handler returns.
    ///
    /// The target may lie ahead of or behind the current handler. Moving
    /// backwards can loop forever; breaking such loops is up to the caller.
    /// An unknown name leaves any previously requested target in place.
    pub fn move_to(&self, name: &str) -> Result<(), ChainError> {
        let mut state = self.lock_state();

        if !state.index.contains_key(name) {
            warn!(chain = %self.key, target = %name, "Redirection to unknown handler rejected");
            return Err(ChainError::invalid_name(name));
        }

        state.next = Some(name.to_string());
        Ok(())
    }

    /// Value of the variable `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock_state().variables.get(key).cloned()
    }

    /// Value of the variable `key` deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Set the variable `key`, replacing any previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock_state()
            .variables
            .insert(key.into(), value.into());
    }

    pub(crate) fn lock_links(&self) -> MutexGuard<'_, Vec<NamedLink>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ExecutionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("key", &self.key).finish_non_exhaustive()
    }
}
