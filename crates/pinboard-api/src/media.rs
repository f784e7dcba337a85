use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::files::{content_type, file_ext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET /media/{*key}?expires=&signature=: streams an object behind a signed link.
pub async fn serve_media(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = state
        .storage
        .verify_link(&key, query.expires, &query.signature)
    {
        debug!("Refused media link for {}: {}", key, e);
        return Err(ApiError::forbidden(e.to_string()));
    }

    let (file, len) = state.storage.open_object(&key).await.map_err(|e| {
        warn!("Signed object {} unavailable: {:#}", key, e);
        ApiError::not_found("object")
    })?;

    let mime = file_ext(&key).map_or("application/octet-stream", |ext| content_type(&ext));
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=300"),
    );

    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}
