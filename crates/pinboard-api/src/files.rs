use std::path::Path as FsPath;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use pinboard_core::MANAGERS;
use pinboard_core::enrich::{board_cover_key, board_media_key};
use pinboard_types::api::{ApiResponse, Claims, FileUploadQuery};
use pinboard_types::models::{ConciseProfile, ItemState, Thing, ThingDetail};

use crate::error::ApiError;
use crate::posts::require_post;
use crate::state::AppState;

/// 50 MB upload limit for files
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// Mime type for a lowercase extension with its leading dot.
pub(crate) fn content_type(ext: &str) -> &'static str {
    match ext {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".svg" => "image/svg+xml",
        ".mp4" => "video/mp4",
        ".webm" => "video/webm",
        ".mov" => "video/quicktime",
        ".pdf" => "application/pdf",
        ".txt" => "text/plain",
        ".json" => "application/json",
        ".zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// `.png` for `photo.PNG`; `None` when the name has no extension.
pub(crate) fn file_ext(name: &str) -> Option<String> {
    FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

async fn board_owner(state: &AppState, owner: Uuid) -> Result<ConciseProfile, ApiError> {
    state
        .blocking(move |db| db.get_profile_by_id(owner)?.map(|p| p.concise()).transpose())
        .await?
        .ok_or_else(|| ApiError::not_found("board owner"))
}

fn check_size(bytes: &Bytes) -> Result<(), ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::bad_request("empty upload"));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "file too large"));
    }
    Ok(())
}

/// POST /boards/{board_id}/posts/{post_id}/files?fileName=&title=&pos=: raw bytes in
/// the body. Stored under the board owner's media key as `{thingID}{ext}`.
pub async fn upload_file(
    State(state): State<AppState>,
    Path((board_id, post_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<FileUploadQuery>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    check_size(&bytes)?;
    let ext = file_ext(&query.file_name)
        .ok_or_else(|| ApiError::bad_request("fileName needs an extension"))?;

    let board = require_post(&state, board_id, post_id, claims.sub).await?;
    let owner = board_owner(&state, board.owner).await?;

    let now = Utc::now();
    let thing = Thing {
        id: Uuid::new_v4(),
        board_id,
        post_id,
        owner: claims.sub,
        title: query.title.unwrap_or_else(|| query.file_name.clone()),
        tags: vec![],
        state: ItemState::Active,
        pos: query.pos,
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
        detail: ThingDetail::File {
            file_mime: content_type(&ext).to_string(),
            file_size: bytes.len() as i64,
            file_ext: ext,
        },
    };

    let key = board_media_key(owner.account_id, owner.id, board_id, "");
    let name = thing
        .object_name()
        .ok_or_else(|| ApiError::internal(anyhow::anyhow!("file thing without object name")))?;
    let digest = state
        .storage
        .put_object(&format!("{}{}", key, name), &bytes)
        .await
        .map_err(ApiError::internal)?;

    let stored = thing.clone();
    state.blocking(move |db| db.insert_thing(&stored)).await?;
    info!(
        "{} uploaded {} ({} bytes, sha256 {}) to board {}",
        claims.username,
        name,
        bytes.len(),
        digest,
        board_id
    );

    let deps = state.engine.collaborators().clone();
    let profile_id = claims.sub;
    let view = tokio::task::spawn_blocking(move || {
        deps.enricher(profile_id).thing(thing, Some(&owner))
    })
    .await
    .map_err(|e| ApiError::internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}

/// POST /boards/{board_id}/cover: replaces the board's cover image (PNG bytes).
pub async fn upload_cover(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    check_size(&bytes)?;
    let (board, _) = state
        .engine
        .require_role(board_id, claims.sub, &MANAGERS)
        .await?;
    let owner = board_owner(&state, board.owner).await?;

    let key = board_cover_key(owner.account_id, owner.id, board_id, "");
    state
        .storage
        .put_object(&format!("{}{}.png", key, board_id), &bytes)
        .await
        .map_err(ApiError::internal)?;
    info!("{} replaced the cover of board {}", claims.username, board_id);

    Ok(Json(ApiResponse::with_message(
        serde_json::json!({ "_id": board_id }),
        1,
        "Cover updated",
    )))
}
