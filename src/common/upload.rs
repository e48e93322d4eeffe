use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart,
    },
    http::StatusCode,
};
use bytes::Bytes;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
};
use tracing::{debug, error, info};

/// Parts examined before the request is rejected.
pub const MAX_FORM_PARTS: usize = 32;

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// One received file, already written to disk.
#[derive(Debug, Clone)]
pub struct Upload {
    pub path: PathBuf,
    pub original_name: String,
    pub field_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

#[derive(Debug)]
pub enum Extraction {
    Single(Upload),
    Absent,
    TooMany,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("malformed multipart body: {message}")]
    Malformed { status: StatusCode, message: String },
    #[error("upload exceeds the configured size limit")]
    TooLarge,
    #[error("multipart body has more than {0} parts")]
    TooManyParts(usize),
    #[error("failed to write upload to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        match e.status() {
            StatusCode::PAYLOAD_TOO_LARGE => UploadError::TooLarge,
            status => UploadError::Malformed {
                status,
                message: e.body_text(),
            },
        }
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(rejection: MultipartRejection) -> Self {
        UploadError::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl FileSink {
    async fn create(path: &Path) -> Result<Self, UploadError> {
        let file = File::create(path).await.map_err(|source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
            written: 0,
        })
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), UploadError> {
        self.writer
            .write_all(&chunk)
            .await
            .map_err(|source| UploadError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    async fn finish(mut self) -> Result<u64, UploadError> {
        self.writer.flush().await.map_err(|source| UploadError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.written)
    }

    async fn abort(self) {
        drop(self.writer);
        let _ = tokio::fs::remove_file(&self.path).await;
    }
}

async fn write_field(mut field: Field<'_>, destination: &Path) -> Result<u64, UploadError> {
    let mut sink = FileSink::create(destination).await?;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Upload stream error: {}", e);
                sink.abort().await;
                return Err(e.into());
            }
        };

        if let Err(e) = sink.write_chunk(chunk).await {
            error!("Upload write error: {}", e);
            sink.abort().await;
            return Err(e);
        }
    }

    sink.finish().await
}

/// Walks the multipart body and writes the single expected file part to `destination`.
///
/// Plain form fields are drained and ignored. A part whose filename is empty is a
/// file input the client left blank and counts as a plain field. Iteration stops at
/// the second file part.
pub async fn receive_single_file(
    multipart: &mut Multipart,
    destination: &Path,
) -> Result<Extraction, UploadError> {
    let mut received: Option<Upload> = None;
    let mut parts = 0usize;

    while let Some(field) = multipart.next_field().await? {
        parts += 1;
        if parts > MAX_FORM_PARTS {
            return Err(UploadError::TooManyParts(MAX_FORM_PARTS));
        }

        let field_name = field.name().unwrap_or("").to_string();
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let value = field.bytes().await?;
                debug!("Ignoring form field `{}` ({} bytes)", field_name, value.len());
                continue;
            }
        };

        if received.is_some() {
            return Ok(Extraction::TooMany);
        }

        let content_type = field.content_type().map(str::to_string);
        let size = write_field(field, destination).await?;
        info!(
            "Received `{}` (`{}`: {:?}) {} bytes -> {}",
            field_name,
            file_name,
            content_type,
            size,
            destination.display()
        );

        received = Some(Upload {
            path: destination.to_path_buf(),
            original_name: file_name,
            field_name,
            content_type,
            size,
        });
    }

    Ok(match received {
        Some(upload) => Extraction::Single(upload),
        None => Extraction::Absent,
    })
}
