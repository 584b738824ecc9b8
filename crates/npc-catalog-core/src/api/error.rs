use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Request rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Session storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Access token expired or missing; one refresh-and-retry was attempted
    AuthenticationExpired,
    /// Bad credentials or an action the user may not perform
    AuthenticationInvalid,
    /// Any other 4xx
    ValidationRejected,
    /// 5xx, transport failure or unreadable response
    NetworkOrServerFailure,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::Rejected { status, body: truncated },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized | ApiError::NotAuthenticated | ApiError::RefreshFailed(_) => {
                ErrorKind::AuthenticationExpired
            }
            ApiError::InvalidCredentials | ApiError::AccessDenied(_) => {
                ErrorKind::AuthenticationInvalid
            }
            ApiError::NotFound(_)
            | ApiError::RateLimited
            | ApiError::Rejected { .. }
            | ApiError::InvalidUrl(_) => ErrorKind::ValidationRejected,
            ApiError::ServerError(_)
            | ApiError::NetworkError(_)
            | ApiError::InvalidResponse(_)
            | ApiError::Storage(_) => ErrorKind::NetworkOrServerFailure,
        }
    }

    /// HTTP status behind this error, when there was a response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::InvalidCredentials | ApiError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::NetworkError(e) => e.status(),
            _ => None,
        }
    }

    /// True for 403s, which the UI reports as "not permitted"
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN)
    }
}
