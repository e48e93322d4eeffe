use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, rejection::QueryRejection, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::error;

use super::dto::UploadQuery;
use super::service::{TranscodeService, TranscodedFile};
use crate::common::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// Landing page with the upload form
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Upload form", content_type = "text/html", body = String),
        (status = 500, description = "Landing page unavailable", body = ApiResponse<String>)
    ),
    tag = "Transcode"
)]
pub async fn landing_page(State(state): State<AppState>) -> impl IntoResponse {
    let page = &state.config.index_page;

    match tokio::fs::read(page).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(page).first_or_octet_stream().to_string();
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(e) => {
            error!("Failed to read landing page {}: {}", page.display(), e);
            ApiError(
                "Landing page unavailable".to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    }
}

/// Upload a video and receive it re-encoded
/// Exactly one file part is expected; its field name is not constrained.
#[utoipa::path(
    post,
    path = "/upload",
    params(UploadQuery),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Transcoded media", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 400, description = "Missing file, several files, malformed body or bad settings", body = ApiResponse<String>),
        (status = 413, description = "Upload exceeds the configured limit", body = ApiResponse<String>),
        (status = 500, description = "Encoder or storage failure", body = ApiResponse<String>)
    ),
    tag = "Transcode"
)]
pub async fn upload(
    State(state): State<AppState>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let outcome = match (query, multipart) {
        (Ok(Query(query)), Ok(mut multipart)) => {
            TranscodeService::process(&state, query, &mut multipart).await
        }
        (Err(rejection), _) => Err(rejection.into()),
        (_, Err(rejection)) => Err(rejection.into()),
    };

    match outcome {
        Ok(transcoded) => stream_transcoded(transcoded),
        Err(e) => {
            error!("Upload failed: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

fn stream_transcoded(transcoded: TranscodedFile) -> Response {
    let TranscodedFile {
        ticket,
        file,
        len,
        content_type,
        download_name,
    } = transcoded;

    // The ticket rides along with the body so the files live until the last chunk is sent.
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _held = &ticket;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(Body::from_stream(stream))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
