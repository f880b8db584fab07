//! Web API errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebApiError {
    #[error("Invalid service root: {0}")]
    InvalidBaseUrl(String),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Web API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Record not found: {entity} {id}")]
    NotFound { entity: String, id: String },
    #[error("Create response carried no record id")]
    MissingEntityId,
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

impl WebApiError {
    /// HTTP status code, when the error came from a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

pub type WebApiResult<T> = Result<T, WebApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = WebApiError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.status_code(), Some(503));

        let err = WebApiError::NotFound {
            entity: "annotation".to_string(),
            id: "x".to_string(),
        };
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "Record not found: annotation x");

        assert_eq!(WebApiError::MissingEntityId.status_code(), None);
    }
}
