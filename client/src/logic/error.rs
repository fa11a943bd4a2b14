//! Client errors

use serde::Deserialize;
use serde_json::Value;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised while talking to the prediction API
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Transport failure (DNS, connection refused, reset...)
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// Non-2xx response
    #[error("Server error {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Body is not the JSON we expected
    #[error("Parse error: {0}")]
    Parse(String),

    /// Body parsed but violates the response contract
    #[error("Invalid response: {0}")]
    Invalid(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Status code of a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// `{"detail": ...}` error body. `detail` is a string for most errors and a
/// list of field errors for request validation failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Human readable detail of an error response body
pub(crate) fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { detail: Value::String(s) }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no details".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_string() {
        assert_eq!(error_detail(r#"{"detail": "Sample index out of range"}"#), "Sample index out of range");
    }

    #[test]
    fn test_error_detail_fallbacks() {
        assert_eq!(error_detail(""), "no details");
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
        assert!(error_detail(r#"{"detail": [{"loc": ["body"]}]}"#).contains("loc"));
    }

    #[test]
    fn test_status_accessor() {
        let err = ApiError::Status { status: 404, detail: "missing".into() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(ApiError::Timeout.status(), None);
        assert_eq!(err.to_string(), "Server error 404: missing");
    }
}
