//! HTTP control-plane gateway for the fuzzing platform: session/CSRF
//! middleware, request handlers for every resource in the path hierarchy,
//! and the MQ reconcilers that fold scheduler/reporter/pool-manager
//! callbacks back into the domain model.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod path;
pub mod pool_manager;
pub mod reconcile;
pub mod routes;
pub mod state;
#[cfg(test)]
mod test_support;

pub use routes::GatewayRouter;
pub use state::AppState;

/// Errors that can abort startup before the server ever accepts a request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] gateway_error::GatewayError),

    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("object storage connection failed: {0}")]
    Storage(gateway_error::GatewayError),
}

/// Server result type.
pub type Result<T> = std::result::Result<T, ServerError>;
