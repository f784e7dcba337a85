use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use pinboard_core::CONTRIBUTORS;
use pinboard_types::api::{ApiResponse, Claims, CreatePostRequest, CreateThingRequest};
use pinboard_types::models::{Board, ItemState, Post, Thing, ThingDetail, ThingKind};

use crate::error::ApiError;
use crate::extract::{gated_response, optional_password};
use crate::state::AppState;

/// GET /boards/{board_id}/posts/{post_id}/things
pub async fn get_post_things(
    State(state): State<AppState>,
    Path((board_id, post_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let password = optional_password(&body)?;
    let gated = state
        .engine
        .post_things(board_id, post_id, claims.sub, password)
        .await?;
    Ok(gated_response(gated))
}

pub async fn create_post(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    state
        .engine
        .require_role(board_id, claims.sub, &CONTRIBUTORS)
        .await?;

    let now = Utc::now();
    let post = Post {
        id: Uuid::new_v4(),
        board_id,
        owner: claims.sub,
        title,
        tags: req.tags,
        state: ItemState::Active,
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
    };
    let stored = post.clone();
    state.blocking(move |db| db.insert_post(&stored)).await?;

    info!("{} added post {} to board {}", claims.username, post.id, board_id);

    let deps = state.engine.collaborators().clone();
    let profile_id = claims.sub;
    let view = tokio::task::spawn_blocking(move || deps.enricher(profile_id).post(post))
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}

/// POST /boards/{board_id}/posts/{post_id}/things: notes, tasks and collections.
/// Files arrive through the upload route instead.
pub async fn create_thing(
    State(state): State<AppState>,
    Path((board_id, post_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateThingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = match req.thing_type {
        ThingKind::Note => ThingDetail::Note {
            body: req.body.unwrap_or_default(),
        },
        ThingKind::Task => ThingDetail::Task {
            status: req.status.unwrap_or_default(),
            due_date: req.due_date,
        },
        ThingKind::Collection => ThingDetail::Collection { file_count: 0 },
        ThingKind::File => {
            return Err(ApiError::bad_request(
                "files are added through /boards/{boardID}/posts/{postID}/files",
            ));
        }
        other => {
            return Err(ApiError::bad_request(format!(
                "{} is not a post item",
                other.as_str()
            )));
        }
    };

    require_post(&state, board_id, post_id, claims.sub).await?;

    let now = Utc::now();
    let thing = Thing {
        id: Uuid::new_v4(),
        board_id,
        post_id,
        owner: claims.sub,
        title: req.title,
        tags: req.tags,
        state: req.state.unwrap_or_default(),
        pos: req.pos,
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
        detail,
    };
    let stored = thing.clone();
    state.blocking(move |db| db.insert_thing(&stored)).await?;

    info!(
        "{} added {} {} to post {}",
        claims.username,
        thing.kind().as_str(),
        thing.id,
        post_id
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(thing))))
}

/// Caller must be a contributor on the board and the post must belong to it.
pub(crate) async fn require_post(
    state: &AppState,
    board_id: Uuid,
    post_id: Uuid,
    profile_id: Uuid,
) -> Result<Board, ApiError> {
    let (board, _) = state
        .engine
        .require_role(board_id, profile_id, &CONTRIBUTORS)
        .await?;
    let post = state.blocking(move |db| db.get_post(post_id)).await?;
    match post {
        Some(post) if post.board_id == board_id && post.state != ItemState::Hidden => Ok(board),
        _ => Err(ApiError::not_found("post")),
    }
}
