// Error codes and error types shared by every SafeZone crate.
//
// `ApiError` is what a request handler returns to its caller; `SafezoneError`
// covers internal failures (configuration, storage, crypto) that are never
// shown verbatim to clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable error codes carried in every error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    EmailAlreadyRegistered,
    InvalidEmail,
    InvalidPoints,
    IncorrectEmailOrPassword,
    CouldNotValidateCredentials,
    TaskNotFound,
    HelpRequestNotFound,
    AlertNotFound,
    CommunityTaskNotFound,
    TaskNoLongerAvailable,
    InternalServerError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::EmailAlreadyRegistered => "Email already registered",
            Self::InvalidEmail => "Invalid email address",
            Self::InvalidPoints => "Points must be between 0 and 1000000",
            Self::IncorrectEmailOrPassword => "Incorrect email or password",
            Self::CouldNotValidateCredentials => "Could not validate credentials",
            Self::TaskNotFound => "Task not found",
            Self::HelpRequestNotFound => "Help request not found",
            Self::AlertNotFound => "Alert not found",
            Self::CommunityTaskNotFound => "Community task not found",
            Self::TaskNoLongerAvailable => "Task is no longer available",
            Self::InternalServerError => "Internal server error",
        };
        write!(f, "{msg}")
    }
}

/// HTTP status codes used by the API error system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpStatus {
    BadRequest = 400,
    Unauthorized = 401,
    NotFound = 404,
    UnprocessableEntity = 422,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn status_code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code())
    }
}

/// Client-facing error: an HTTP status, an error code and a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status} {code:?}: {message}")]
pub struct ApiError {
    pub status: HttpStatus,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: HttpStatus, code: ErrorCode) -> Self {
        Self {
            message: code.to_string(),
            status,
            code,
        }
    }

    /// A referenced record id does not exist.
    pub fn not_found(code: ErrorCode) -> Self {
        Self::new(HttpStatus::NotFound, code)
    }

    /// The request conflicts with current state (duplicate email, task
    /// already claimed). Reported as 400.
    pub fn conflict(code: ErrorCode) -> Self {
        Self::new(HttpStatus::BadRequest, code)
    }

    /// Missing, invalid or expired credentials.
    pub fn unauthorized(code: ErrorCode) -> Self {
        Self::new(HttpStatus::Unauthorized, code)
    }

    pub fn validation(code: ErrorCode) -> Self {
        Self::new(HttpStatus::UnprocessableEntity, code)
    }

    pub fn internal() -> Self {
        Self::new(
            HttpStatus::InternalServerError,
            ErrorCode::InternalServerError,
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == HttpStatus::Unauthorized
    }

    /// JSON body for the error response.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "detail": self.message,
            "code": self.code,
        })
    }
}

/// Internal (non-HTTP) error.
#[derive(Debug, thiserror::Error)]
pub enum SafezoneError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A write hit a unique constraint.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<SafezoneError> for ApiError {
    fn from(err: SafezoneError) -> Self {
        match err {
            SafezoneError::Api(api) => api,
            other => {
                tracing::error!(error = %other, "request failed with an internal error");
                ApiError::internal()
            }
        }
    }
}

/// Unified result type for internal operations.
pub type Result<T> = std::result::Result<T, SafezoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_reported_as_bad_request() {
        let err = ApiError::conflict(ErrorCode::EmailAlreadyRegistered);
        assert_eq!(err.status.status_code(), 400);
        assert_eq!(err.message, "Email already registered");
    }

    #[test]
    fn test_error_body_shape() {
        let body = ApiError::not_found(ErrorCode::TaskNotFound).to_json();
        assert_eq!(body["detail"], "Task not found");
        assert_eq!(body["code"], "TASK_NOT_FOUND");
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let api: ApiError = SafezoneError::Database("connection reset".into()).into();
        assert_eq!(api.status, HttpStatus::InternalServerError);
        assert!(!api.message.contains("connection reset"));
    }

    #[test]
    fn test_duplicate_is_internal_unless_handled() {
        let api: ApiError = SafezoneError::Duplicate("users.email".into()).into();
        assert_eq!(api.status, HttpStatus::InternalServerError);
    }

    #[test]
    fn test_api_error_passes_through() {
        let api: ApiError =
            SafezoneError::Api(ApiError::unauthorized(ErrorCode::CouldNotValidateCredentials))
                .into();
        assert!(api.is_unauthorized());
    }
}
