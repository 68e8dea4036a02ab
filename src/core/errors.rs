use std::collections::BTreeMap;

use http::StatusCode;
use spin_sdk::http::Response;
use thiserror::Error;

/// Field name to the list of messages explaining why it was rejected.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type ApiResult = Result<Response, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Method Not Allowed: {0}")]
    MethodNotAllowed(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal Error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => serde_json::json!({ "error": msg }),
            ApiError::Validation(fields) => serde_json::json!({
                "error": "Validation failed",
                "fields": fields,
            }),
            ApiError::Unauthorized => {
                serde_json::json!({ "error": "Authentication credentials were not provided or are invalid" })
            }
            ApiError::Forbidden => {
                serde_json::json!({ "error": "You do not have permission to perform this action" })
            }
            ApiError::MethodNotAllowed(method) => {
                serde_json::json!({ "error": format!("Method \"{}\" not allowed", method) })
            }
            // never leak store internals to clients
            ApiError::Internal(_) => serde_json::json!({ "error": "Internal server error" }),
        }
    }

    /// Single-field validation failure.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![message.into()]);
        ApiError::Validation(fields)
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let body = serde_json::to_vec(&err.body()).unwrap_or_default();
        Response::builder()
            .status(err.status().as_u16())
            .header("Content-Type", "application/json")
            .body(body)
            .build()
    }
}
