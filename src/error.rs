use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

/// The one error type that leaves the service layer.
///
/// Logical outcomes (missing rows, duplicate memberships, denied access) are
/// returned as values; only store and infrastructure failures end up here,
/// after the surrounding transaction has been rolled back.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("data operation failed: {0}")]
    Data(#[from] sqlx::Error),

    #[error("transaction timed out")]
    Timeout,

    #[error("password hashing failed: {0}")]
    Password(String),
}

impl ServiceError {
    /// Whether the caller may simply try the operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Timeout => true,
            ServiceError::Data(sqlx::Error::PoolTimedOut) => true,
            ServiceError::Data(sqlx::Error::Database(e)) => {
                // primary result code SQLITE_BUSY (5) or SQLITE_LOCKED (6)
                let primary = e
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);
                matches!(primary, Some(5) | Some(6))
            }
            _ => false,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Handler-side mapping: log the cause, hand the client a generic message.
pub fn internal(e: ServiceError) -> (StatusCode, String) {
    error!(error = %e, retryable = e.is_retryable(), "service call failed");
    if e.is_retryable() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "temporarily unavailable, try again".into(),
        )
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
    }
}

pub fn forbidden() -> (StatusCode, String) {
    (StatusCode::FORBIDDEN, "not allowed".into())
}

pub fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retryable() {
        assert!(ServiceError::Timeout.is_retryable());
        assert!(ServiceError::Data(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!ServiceError::Data(sqlx::Error::RowNotFound).is_retryable());
        assert!(!ServiceError::Password("bad salt".into()).is_retryable());
    }

    #[test]
    fn internal_hides_store_message() {
        let (status, body) = internal(ServiceError::Data(sqlx::Error::Protocol(
            "secret table layout".into(),
        )));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("secret"));

        let (status, _) = internal(ServiceError::Timeout);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
