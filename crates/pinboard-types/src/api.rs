use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Board, ConciseProfile, ItemState, Post, Role, TaskStatus, Thing, ThingKind, Thumbnails,
    Visibility,
};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the WebSocket gateway.
/// `sub` is the caller's profile id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Envelope --

/// Every JSON response is wrapped in `{data, status, message}`.
/// `status` is 1 on success (including a password prompt) and 0 on refusal or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub status: u8,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            status: 1,
            message: String::new(),
        }
    }

    pub fn with_message(data: T, status: u8, message: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            status,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            data: None,
            status: 0,
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub profile_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub profile_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Board things --

/// Query-string filters for `GET /boards/{id}/things`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardThingsQuery {
    /// Comma separated; every tag must match.
    pub tags: Option<String>,
    pub file_type: Option<String>,
    pub owner: Option<Uuid>,
    /// `YYYY-MM-DD`
    pub upload_date: Option<String>,
}

/// Optional request body carrying a board password.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordBody {
    #[serde(default)]
    pub password: String,
}

/// Board identity and gate flags. Returned alone whenever the gate does not allow the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateData {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub is_password: bool,
    pub is_password_validate: bool,
    pub is_client_accessible: bool,
    pub is_board_follower: bool,
}

/// A thing with its per-caller derived state attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingView {
    #[serde(flatten)]
    pub thing: Thing,
    pub total_likes: usize,
    pub is_liked: bool,
    pub total_comments: usize,
    pub is_bookmarked: bool,
    #[serde(rename = "bookmarkID")]
    pub bookmark_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Thumbnails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_info: Option<ConciseProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    #[serde(flatten)]
    pub board: Board,
    pub total_likes: usize,
    pub is_liked: bool,
    pub total_comments: usize,
    pub is_bookmarked: bool,
    #[serde(rename = "bookmarkID")]
    pub bookmark_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_things_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_info: Option<ConciseProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Thumbnails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_password: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub total_likes: usize,
    pub is_liked: bool,
    pub total_comments: usize,
    pub is_bookmarked: bool,
    #[serde(rename = "bookmarkID")]
    pub bookmark_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_info: Option<ConciseProfile>,
}

/// Full payload of an allowed `GET /boards/{id}/things`.
/// `None` list fields serialize as `null`: a unit that did not run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardThingsData {
    #[serde(flatten)]
    pub gate: GateData,
    pub role: Role,
    pub board: Option<BoardView>,
    pub sub_boards: Option<Vec<BoardView>>,
    pub tasks: Option<Vec<ThingView>>,
    pub notes: Option<Vec<ThingView>>,
    pub files: Option<Vec<ThingView>>,
    pub collections: Option<Vec<ThingView>>,
    pub recently_added: Option<Vec<ThingView>>,
}

/// Payload of an allowed `GET /boards/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDetailData {
    #[serde(flatten)]
    pub gate: GateData,
    pub role: Role,
    pub board: BoardView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostThingsData {
    #[serde(flatten)]
    pub gate: GateData,
    pub role: Role,
    pub things: Vec<ThingView>,
}

// -- Board management --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateBoardRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visible: Visibility,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "parentID")]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial settings update. An empty `password` clears it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateBoardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visible: Option<Visibility>,
    pub password: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `POST /boards/{id}/posts/{postID}/things`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateThingRequest {
    pub thing_type: ThingKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub state: Option<ItemState>,
    #[serde(default)]
    pub pos: Option<i64>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
}

// -- Membership --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct InviteMemberRequest {
    #[serde(rename = "profileID")]
    pub profile_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberTargetRequest {
    #[serde(rename = "profileID")]
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationAction {
    Accept,
    #[serde(alias = "reject")]
    Decline,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvitationReply {
    #[serde(rename = "boardID")]
    pub board_id: Uuid,
    #[serde(rename = "type")]
    pub action: InvitationAction,
}

/// A pending invitation as its invitee sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationView {
    #[serde(rename = "boardID")]
    pub board_id: Uuid,
    pub board_title: String,
    pub role: Role,
    pub sender: Option<ConciseProfile>,
    #[serde(rename = "createDate")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Reactions --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggleResponse {
    pub is_liked: bool,
    pub total_likes: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkToggleResponse {
    pub is_bookmarked: bool,
    #[serde(rename = "bookmarkID")]
    pub bookmark_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadQuery {
    pub title: Option<String>,
    pub file_name: String,
    pub pos: Option<i64>,
}
