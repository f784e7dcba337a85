use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ThingKind;

/// What happened to the thing a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    BoardMemberAdded,
    BoardMemberRoleChanged,
    BoardMemberBlocked,
    BoardMemberUnblocked,
    BoardMemberRemoved,
    BoardFollowed,
    BoardUnfollowed,
    BoardSettingsUpdated,
    BoardDeleted,
}

/// A fire-and-forget notification addressed to one or more profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "receiverIDs")]
    pub receiver_ids: Vec<Uuid>,
    #[serde(rename = "senderID")]
    pub sender_id: Uuid,
    pub thing_type: ThingKind,
    pub action_type: ActionType,
    pub message: String,
    #[serde(rename = "thingID")]
    pub thing_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Notification {
    pub fn is_addressed_to(&self, profile_id: Uuid) -> bool {
        self.receiver_ids.contains(&profile_id)
    }
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { profile_id: Uuid, username: String },

    /// A notification addressed to the connected profile
    Notification(Notification),
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Client keepalive
    Ping,
}
