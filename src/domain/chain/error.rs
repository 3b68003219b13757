//! Chain error types

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors returned by chain registration and redirection
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Duplicate handler name: '{0}'")]
    DuplicateName(String),

    #[error("No handler registered under name '{0}'")]
    InvalidName(String),
}

impl ChainError {
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::DuplicateName(name) | Self::InvalidName(name) => name,
        }
    }
}

/// An error recorded by a handler while a chain runs.
///
/// Cloning is cheap and shares the underlying error, so an error raised deep
/// inside nested chains is the same value at every level it propagates to.
#[derive(Clone)]
pub struct HandlerError(Arc<anyhow::Error>);

impl HandlerError {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    /// Create an error from a plain message
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(anyhow::Error::msg(message)))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    /// Attempt to downcast the recorded error to a concrete type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Returns `true` if both values share the same recorded error
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChainError::duplicate_name("auth");
        assert_eq!(err.to_string(), "Duplicate handler name: 'auth'");

        let err = ChainError::invalid_name("missing");
        assert_eq!(
            err.to_string(),
            "No handler registered under name 'missing'"
        );
        assert_eq!(err.name(), "missing");
    }

    #[test]
    fn test_handler_error_shares_value() {
        let err = HandlerError::msg("boom");
        let copy = err.clone();

        assert!(err.ptr_eq(&copy));
        assert_eq!(copy.to_string(), "boom");
        assert!(!err.ptr_eq(&HandlerError::msg("boom")));
    }

    #[test]
    fn test_handler_error_downcast() {
        let err = HandlerError::new(ChainError::invalid_name("x"));

        assert_eq!(
            err.downcast_ref::<ChainError>(),
            Some(&ChainError::invalid_name("x"))
        );
        assert!(err.downcast_ref::<std::io::Error>().is_none());
    }
}
