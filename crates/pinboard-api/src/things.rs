use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use pinboard_types::api::{ApiResponse, BookmarkToggleResponse, Claims, LikeToggleResponse};
use pinboard_types::models::ThingKind;

use crate::error::ApiError;
use crate::extract::optional_password;
use crate::state::AppState;

/// Reactions need the same access as reading the board the item lives on.
async fn require_visible(
    state: &AppState,
    item_id: Uuid,
    profile_id: Uuid,
    password: Option<String>,
) -> Result<ThingKind, ApiError> {
    let (kind, board_id) = state
        .blocking(move |db| db.item_kind(item_id))
        .await?
        .ok_or_else(|| ApiError::not_found("thing"))?;

    let resolved = state.engine.access(board_id, profile_id, password).await?;
    if !resolved.access.is_allowed() {
        return Err(ApiError::forbidden(resolved.access.outcome.message()));
    }
    Ok(kind)
}

/// POST /things/{thing_id}/likes: toggle the caller's like on a thing, post or board.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(thing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let password = optional_password(&body)?;
    require_visible(&state, thing_id, claims.sub, password).await?;

    let profile_id = claims.sub;
    let (is_liked, total_likes) = state
        .blocking(move |db| db.toggle_like(thing_id, profile_id))
        .await?
        .ok_or_else(|| ApiError::not_found("thing"))?;

    Ok(Json(ApiResponse::ok(LikeToggleResponse {
        is_liked,
        total_likes,
    })))
}

/// POST /things/{thing_id}/bookmark
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Path(thing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let password = optional_password(&body)?;
    let kind = require_visible(&state, thing_id, claims.sub, password).await?;

    let profile_id = claims.sub;
    let bookmark_id = state
        .blocking(move |db| db.toggle_bookmark(thing_id, profile_id, kind))
        .await?;

    Ok(Json(ApiResponse::ok(BookmarkToggleResponse {
        is_bookmarked: bookmark_id.is_some(),
        bookmark_id,
    })))
}
