use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use pinboard_types::api::{
    ApiResponse, BoardThingsQuery, Claims, CreateBoardRequest, UpdateBoardRequest,
};

use crate::error::ApiError;
use crate::extract::{gated_response, optional_password};
use crate::state::AppState;

/// GET /boards/{board_id}/things: gate, then every content list of the board.
pub async fn get_board_things(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Query(query): Query<BoardThingsQuery>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let password = optional_password(&body)?;
    let gated = state
        .engine
        .board_things(board_id, claims.sub, &query, password)
        .await?;
    Ok(gated_response(gated))
}

/// GET /boards/{board_id}: gate, then the enriched board with cover and thumbnails.
pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let password = optional_password(&body)?;
    let gated = state
        .engine
        .board_detail(board_id, claims.sub, password)
        .await?;
    Ok(gated_response(gated))
}

pub async fn create_board(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBoardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.engine.create_board(claims.sub, req).await?;
    info!("{} created board {}", claims.username, board.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(board))))
}

/// POST /boards/{board_id}: settings update by the owner or an admin.
pub async fn update_board(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateBoardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .engine
        .update_settings(board_id, claims.sub, req)
        .await?;
    Ok(Json(ApiResponse::ok(board)))
}

/// DELETE /boards/{board_id}: soft delete, owner only.
pub async fn delete_board(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.delete_board(board_id, claims.sub).await?;
    info!("{} deleted board {}", claims.username, board_id);
    Ok(Json(ApiResponse::with_message(
        serde_json::json!({ "_id": board_id }),
        1,
        "Board deleted",
    )))
}
