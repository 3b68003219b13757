//! API layer - HTTP endpoints and middleware

pub mod error;
pub mod health;
pub mod middleware;
pub mod router;
pub mod service;

pub use router::create_router;
pub use service::ChainService;
