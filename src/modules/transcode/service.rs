use axum::extract::Multipart;
use std::path::Path;
use tokio::fs::File;
use tracing::{error, info, warn};
use validator::Validate;

use super::dto::UploadQuery;
use super::error::TranscodeError;
use super::model::{ErrorPolicy, TranscodeSettings};
use crate::common::upload::{receive_single_file, Extraction};
use crate::infrastructure::workspace::Ticket;
use crate::state::AppState;

/// A finished transcode, ready to be streamed back.
/// Dropping it releases the request's files.
pub struct TranscodedFile {
    pub ticket: Ticket,
    pub file: File,
    pub len: u64,
    pub content_type: String,
    pub download_name: String,
}

pub struct TranscodeService;

impl TranscodeService {
    pub async fn process(
        state: &AppState,
        query: UploadQuery,
        multipart: &mut Multipart,
    ) -> Result<TranscodedFile, TranscodeError> {
        query
            .validate()
            .map_err(|e| TranscodeError::InvalidQuery(e.to_string()))?;
        let settings = state.config.transcode.resolve(&query)?;

        let ticket = state.workspace.allocate(settings.container);

        let upload = match receive_single_file(multipart, ticket.input()).await? {
            Extraction::Single(upload) => upload,
            Extraction::Absent => return Err(TranscodeError::MissingFile),
            Extraction::TooMany => return Err(TranscodeError::TooManyFiles),
        };

        info!(
            "Ticket {}: transcoding `{}` from field `{}` ({}, {} bytes at {}) at {} ({} bps) into {}",
            ticket.id(),
            upload.original_name,
            upload.field_name,
            upload.content_type.as_deref().unwrap_or("unknown type"),
            upload.size,
            upload.path.display(),
            settings.bitrate,
            settings.bitrate.bits_per_second(),
            settings.container.extension()
        );

        if let Err(e) = state
            .encoder
            .encode(ticket.input(), ticket.output(), &settings)
            .await
        {
            match state.config.error_policy {
                ErrorPolicy::Strict => {
                    error!("Ticket {}: {}", ticket.id(), e);
                    return Err(e.into());
                }
                ErrorPolicy::Lenient => {
                    warn!(
                        "Ticket {}: {}; serving {} anyway",
                        ticket.id(),
                        e,
                        ticket.output().display()
                    );
                }
            }
        }

        let download_name = download_name(&upload.original_name, &settings);
        Self::open_output(ticket, download_name).await
    }

    async fn open_output(
        ticket: Ticket,
        download_name: String,
    ) -> Result<TranscodedFile, TranscodeError> {
        let unavailable = |source: std::io::Error| TranscodeError::OutputUnavailable {
            path: ticket.output().to_path_buf(),
            source,
        };

        let file = File::open(ticket.output()).await.map_err(unavailable)?;
        let len = file.metadata().await.map_err(unavailable)?.len();
        let content_type = mime_guess::from_path(ticket.output())
            .first_or_octet_stream()
            .to_string();

        Ok(TranscodedFile {
            ticket,
            file,
            len,
            content_type,
            download_name,
        })
    }
}

/// `<sanitised stem>_<bitrate>.<ext>`; the client's name is only a hint.
fn download_name(original_name: &str, settings: &TranscodeSettings) -> String {
    let stem: String = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    let stem = if stem.trim_matches('_').is_empty() {
        "video".to_string()
    } else {
        stem
    };

    format!(
        "{}_{}.{}",
        stem,
        settings.bitrate,
        settings.container.extension()
    )
}
