use crate::models::{InvalidDate, InvalidFieldValue, UnknownLine};
use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("repository unreachable: {0}")]
    Connectivity(String),
    #[error("credential rejected with status {status}; credential cleared")]
    Auth { status: u16 },
    #[error("{0} not found")]
    NotFound(String),
    #[error("version token is stale")]
    Conflict,
    #[error("version conflict persisted after {attempts} attempts")]
    ConflictExhausted { attempts: u32 },
    #[error("stored payload is malformed: {0}")]
    Encoding(String),
    #[error("load failed with status {status}")]
    Load { status: u16 },
    #[error("save failed with status {status}")]
    Save { status: u16 },
    #[error("saving requires a write credential")]
    CredentialRequired,
    #[error("credential store: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict | StoreError::ConflictExhausted { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Connectivity(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("journal is not open; log in first")]
    NotOpen,
    #[error("current login may not write to the journal")]
    Forbidden,
    #[error(transparent)]
    InvalidValue(#[from] InvalidFieldValue),
    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),
    #[error(transparent)]
    UnknownLine(#[from] UnknownLine),
    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let status = match &err {
            SessionError::NotOpen | SessionError::Forbidden => StatusCode::FORBIDDEN,
            SessionError::InvalidValue(_)
            | SessionError::InvalidDate(_)
            | SessionError::UnknownLine(_)
            | SessionError::InvalidMonth(_) => StatusCode::BAD_REQUEST,
            SessionError::Store(store) => match store {
                StoreError::Auth { .. } | StoreError::CredentialRequired => StatusCode::UNAUTHORIZED,
                StoreError::Conflict | StoreError::ConflictExhausted { .. } => StatusCode::CONFLICT,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<UnknownLine> for AppError {
    fn from(err: UnknownLine) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
