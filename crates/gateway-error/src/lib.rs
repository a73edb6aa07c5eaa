//! Unified error type for the gateway crates.
//!
//! Every fallible operation in `gateway-db`, `gateway-storage`,
//! `gateway-auth`, `gateway-mq` and `gateway-server` resolves to
//! [`GatewayError`], which carries one of the closed [`ErrorCode`] values
//! plus optional structured parameters for the response body.

// Error variants are self-documenting via their #[error(...)] messages.
#![allow(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codes;
#[cfg(feature = "axum-compat")]
mod http;

pub use codes::ErrorCode;
#[cfg(feature = "axum-compat")]
pub use http::ErrorBody;

/// Unified error type returned by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A known, client-facing condition identified by a stable [`ErrorCode`].
    #[error("{}", .code.message())]
    Known {
        code: ErrorCode,
        params: Option<serde_json::Value>,
    },

    /// A lower layer failed in a way with no corresponding API semantics.
    /// Always reported to the client as `E_INTERNAL_ERROR`.
    #[error("internal error: {0}")]
    Internal(String),

    #[cfg(feature = "sqlx-compat")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GatewayError {
    /// Construct an error from a known code with no extra parameters.
    #[must_use]
    pub const fn code(code: ErrorCode) -> Self {
        Self::Known { code, params: None }
    }

    /// Construct an error from a known code with structured parameters,
    /// interpolated into the response body for the caller to render.
    #[must_use]
    pub fn code_with_params(code: ErrorCode, params: serde_json::Value) -> Self {
        Self::Known {
            code,
            params: Some(params),
        }
    }

    /// The wire error code for this error, for logging and the HTTP envelope.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Known { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
            #[cfg(feature = "sqlx-compat")]
            Self::Database(_) => ErrorCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, GatewayError};

    #[test]
    fn known_error_reports_its_own_code() {
        let err = GatewayError::code(ErrorCode::UserNotFound);
        assert_eq!(err.error_code().as_str(), "E_USER_NOT_FOUND");
    }

    #[test]
    fn internal_error_masks_as_internal_error_code() {
        let err = GatewayError::Internal("boom".into());
        assert_eq!(err.error_code().as_str(), "E_INTERNAL_ERROR");
    }
}
