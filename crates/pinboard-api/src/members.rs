use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use pinboard_core::{InvitationAnswer, InviteOutcome};
use pinboard_types::api::{
    ApiResponse, Claims, InvitationReply, InviteMemberRequest, MemberTargetRequest,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Records a pending invitation; the invitee answers through `POST /invitations`.
pub async fn invite(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .engine
        .invite_member(board_id, claims.sub, req.profile_id, req.role)
        .await?;
    let message = match outcome {
        InviteOutcome::Sent => "Invites have been sent!",
        InviteOutcome::AlreadyPending => "Invites are already sent!",
    };
    Ok(Json(ApiResponse::<()> {
        data: None,
        status: 1,
        message: message.to_string(),
    }))
}

/// GET /invitations: the caller's pending invitations.
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let invitations = state.engine.invitations(claims.sub).await?;
    let message = if invitations.is_empty() {
        "You have no pending board invitations"
    } else {
        ""
    };
    Ok(Json(ApiResponse::with_message(invitations, 1, message)))
}

/// POST /invitations: `{"boardID", "type": "accept" | "decline"}`.
pub async fn answer_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InvitationReply>,
) -> Result<impl IntoResponse, ApiError> {
    let answer = state
        .engine
        .answer_invitation(req.board_id, claims.sub, req.action)
        .await?;
    let (data, message) = match answer {
        InvitationAnswer::Accepted { board, sender_id } => (
            serde_json::json!({ "senderID": sender_id, "board": board }),
            "Invitation accepted!",
        ),
        InvitationAnswer::Declined { sender_id } => (
            serde_json::json!({ "senderID": sender_id }),
            "Invitation rejected!",
        ),
    };
    Ok(Json(ApiResponse::with_message(data, 1, message)))
}

pub async fn change_role(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .engine
        .change_member_role(board_id, claims.sub, req.profile_id, req.role)
        .await?;
    Ok(Json(ApiResponse::ok(board)))
}

pub async fn block(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MemberTargetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .engine
        .block_member(board_id, claims.sub, req.profile_id)
        .await?;
    Ok(Json(ApiResponse::ok(board)))
}

pub async fn unblock(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MemberTargetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .engine
        .unblock_member(board_id, claims.sub, req.profile_id)
        .await?;
    Ok(Json(ApiResponse::ok(board)))
}

/// Managers remove others; any member may remove themselves.
pub async fn remove(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MemberTargetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .engine
        .remove_member(board_id, claims.sub, req.profile_id)
        .await?;
    Ok(Json(ApiResponse::ok(board)))
}

pub async fn follow(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.engine.follow(board_id, claims.sub).await?;
    Ok(Json(ApiResponse::ok(board)))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.engine.unfollow(board_id, claims.sub).await?;
    Ok(Json(ApiResponse::ok(board)))
}
