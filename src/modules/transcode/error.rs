use axum::extract::rejection::QueryRejection;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use super::model::SettingsError;
use crate::common::response::ApiError;
use crate::common::upload::UploadError;
use crate::infrastructure::encoder::EncodeError;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("no file part in multipart request")]
    MissingFile,
    #[error("only single-file uploads are accepted")]
    TooManyFiles,
    #[error("transcoding failed: {0}")]
    Encoder(#[from] EncodeError),
    #[error("transcoded output unavailable at {}: {source}", .path.display())]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TranscodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            TranscodeError::InvalidQuery(_)
            | TranscodeError::InvalidSettings(_)
            | TranscodeError::MissingFile
            | TranscodeError::TooManyFiles => StatusCode::BAD_REQUEST,
            TranscodeError::Upload(UploadError::Malformed { status, .. }) => *status,
            TranscodeError::Upload(UploadError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            TranscodeError::Upload(UploadError::TooManyParts(_)) => StatusCode::BAD_REQUEST,
            TranscodeError::Upload(UploadError::Io { .. })
            | TranscodeError::Encoder(_)
            | TranscodeError::OutputUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for TranscodeError {
    fn from(rejection: QueryRejection) -> Self {
        TranscodeError::InvalidQuery(rejection.body_text())
    }
}

impl From<MultipartRejection> for TranscodeError {
    fn from(rejection: MultipartRejection) -> Self {
        TranscodeError::Upload(rejection.into())
    }
}

impl From<TranscodeError> for ApiError {
    fn from(e: TranscodeError) -> Self {
        let status = e.status();
        ApiError(e.to_string(), status)
    }
}
