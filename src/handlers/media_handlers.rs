//! HTTP handlers for media upload, download, and deletion.
//! Streams payloads in both directions and delegates storage concerns to
//! `MediaStore`; nothing is buffered whole in memory.

use crate::{
    auth,
    errors::ApiError,
    models::media::MediaBucket,
    services::resolver::{RequestBase, image_url},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use std::io;
use uuid::Uuid;

/// Metadata projection returned by `GET /images`.
#[derive(Serialize, Debug)]
pub struct MediaSummary {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub upload_date: DateTime<Utc>,
    pub url: String,
}

/// GET `/image/{id}.{ext}` — stream an object's bytes.
///
/// The extension is cosmetic: only the part before the first `.` is parsed
/// as the identifier.
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_media_id(&id)?;
    let (meta, stream) = state.media.open(id).await?;

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(meta.length.max(0) as u64),
    );
    Ok(response)
}

/// POST `/image` — multipart upload; the payload arrives in the `file`
/// field. Responds 201 with the new media id.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    auth::authorize(&state.tokens, &headers, auth::WRITE_IMAGE)?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("file").to_owned();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let stream = field.map_err(io::Error::other);
        let file = state.media.put(&filename, &content_type, stream).await?;
        return Ok((StatusCode::CREATED, file.id.to_string()));
    }

    Err(ApiError::MissingFile)
}

/// DELETE `/image/{id}` — remove metadata and chunks as a unit; 404 when
/// the id does not resolve. Products referencing the object keep their
/// reference and degrade at read time.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    auth::authorize(&state.tokens, &headers, auth::DELETE_IMAGE)?;
    let id = parse_media_id(&id)?;
    state.media.delete(id).await?;
    Ok(StatusCode::OK)
}

/// GET `/images` — metadata of everything in the images bucket, with
/// download URLs.
pub async fn list_images(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let base = RequestBase::from_headers(&headers, state.port);
    let files = state.media.list(MediaBucket::Images).await?;
    Ok(Json(
        files
            .into_iter()
            .map(|file| MediaSummary {
                url: image_url(&base, file.id, &file.content_type),
                id: file.id,
                filename: file.filename,
                content_type: file.content_type,
                upload_date: file.upload_date,
            })
            .collect::<Vec<_>>(),
    ))
}

fn parse_media_id(raw: &str) -> Result<Uuid, ApiError> {
    let raw = raw.split('.').next().unwrap_or(raw);
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidIdentifier(raw.to_owned()))
}
