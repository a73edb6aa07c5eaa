use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::GatewayError;

/// The `{code, message, params}` JSON body returned on every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status =
            StatusCode::from_u16(code.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error_code = code.as_str(), error = %self, "internal error");
        } else {
            tracing::warn!(error_code = code.as_str(), "request failed");
        }

        let params = match &self {
            Self::Known { params, .. } => params.clone(),
            _ => None,
        };

        let body = ErrorBody {
            code: code.as_str(),
            message: code.message().to_string(),
            params,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn internal_errors_are_never_leaked_verbatim() {
        let err = GatewayError::Internal("connection refused by 10.0.0.5:5432".into());
        let body = ErrorBody {
            code: err.error_code().as_str(),
            message: err.error_code().message().to_string(),
            params: None,
        };
        assert_eq!(body.code, "E_INTERNAL_ERROR");
        assert!(!body.message.contains("10.0.0.5"));
    }

    #[test]
    fn known_error_status_matches_code_table() {
        let err = GatewayError::code(ErrorCode::FileTooLarge);
        assert_eq!(err.error_code().status(), 413);
    }
}
