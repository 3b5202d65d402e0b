use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileDeskError {
    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),
}

impl FileDeskError {
    pub fn file_not_found(id: &str) -> Self {
        Self::NotFound(format!("File not found: {id}"))
    }

    pub fn folder_not_found(id: &str) -> Self {
        Self::NotFound(format!("Folder not found: {id}"))
    }
}

impl IntoResponse for FileDeskError {
    fn into_response(self) -> axum::response::Response {
        match self {
            FileDeskError::IO(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
            FileDeskError::Serde(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
            FileDeskError::NotFound(e) => (StatusCode::NOT_FOUND, e).into_response(),
            FileDeskError::Validation(e) => (StatusCode::BAD_REQUEST, e).into_response(),
        }
    }
}
