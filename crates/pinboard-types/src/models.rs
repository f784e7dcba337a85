use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Roles --

/// A profile's access level on a board.
///
/// `None` is the absence of any standing on the board and serializes as `""`,
/// which is what clients and the permission cache have always stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    Owner,
    Admin,
    Author,
    Viewer,
    Subscriber,
    Guest,
    Blocked,
    #[default]
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Author => "author",
            Self::Viewer => "viewer",
            Self::Subscriber => "subscriber",
            Self::Guest => "guest",
            Self::Blocked => "blocked",
            Self::None => "",
        }
    }

    /// Blocked profiles and non-members have no standing access.
    pub fn has_standing(&self) -> bool {
        !matches!(self, Self::Blocked | Self::None)
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// The member list a role is stored in. Owners live on the board row itself.
    pub fn member_list(&self) -> Option<MemberList> {
        match self {
            Self::Admin => Some(MemberList::Admins),
            Self::Author => Some(MemberList::Authors),
            Self::Viewer => Some(MemberList::Viewers),
            Self::Subscriber => Some(MemberList::Subscribers),
            Self::Guest => Some(MemberList::Guests),
            Self::Blocked => Some(MemberList::Blocked),
            Self::Owner | Self::None => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "author" => Ok(Self::Author),
            "viewer" => Ok(Self::Viewer),
            "subscriber" => Ok(Self::Subscriber),
            "guest" => Ok(Self::Guest),
            "blocked" => Ok(Self::Blocked),
            "" => Ok(Self::None),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Named member lists on a board. Followers are tracked but confer no role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberList {
    Admins,
    Authors,
    Viewers,
    Subscribers,
    Guests,
    Blocked,
    Followers,
}

impl MemberList {
    /// Role-bearing lists in resolution precedence order. The order is load-bearing.
    pub const PRECEDENCE: [(MemberList, Role); 6] = [
        (MemberList::Admins, Role::Admin),
        (MemberList::Authors, Role::Author),
        (MemberList::Viewers, Role::Viewer),
        (MemberList::Subscribers, Role::Subscriber),
        (MemberList::Guests, Role::Guest),
        (MemberList::Blocked, Role::Blocked),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::Authors => "authors",
            Self::Viewers => "viewers",
            Self::Subscribers => "subscribers",
            Self::Guests => "guests",
            Self::Blocked => "blocked",
            Self::Followers => "followers",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admins" => Some(Self::Admins),
            "authors" => Some(Self::Authors),
            "viewers" => Some(Self::Viewers),
            "subscribers" => Some(Self::Subscribers),
            "guests" => Some(Self::Guests),
            "blocked" => Some(Self::Blocked),
            "followers" => Some(Self::Followers),
            _ => None,
        }
    }
}

// -- Enumerations --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Self::Public),
            "PRIVATE" => Some(Self::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemState {
    #[default]
    Active,
    Hidden,
    Archive,
    Draft,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Hidden => "HIDDEN",
            Self::Archive => "ARCHIVE",
            Self::Draft => "DRAFT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "HIDDEN" => Some(Self::Hidden),
            "ARCHIVE" => Some(Self::Archive),
            "DRAFT" => Some(Self::Draft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThingKind {
    Board,
    Post,
    Note,
    Task,
    File,
    Collection,
}

impl ThingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Board => "BOARD",
            Self::Post => "POST",
            Self::Note => "NOTE",
            Self::Task => "TASK",
            Self::File => "FILE",
            Self::Collection => "COLLECTION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BOARD" => Some(Self::Board),
            "POST" => Some(Self::Post),
            "NOTE" => Some(Self::Note),
            "TASK" => Some(Self::Task),
            "FILE" => Some(Self::File),
            "COLLECTION" => Some(Self::Collection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

// -- Boards --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "profileID")]
    pub profile_id: Uuid,
    pub body: String,
    #[serde(rename = "createDate")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "visible")]
    pub visibility: Visibility,
    pub state: ItemState,
    /// Argon2 PHC string (or a legacy plaintext value). Never serialized.
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(rename = "parentID")]
    pub parent_id: Option<Uuid>,
    pub admins: Vec<Uuid>,
    pub authors: Vec<Uuid>,
    pub viewers: Vec<Uuid>,
    pub subscribers: Vec<Uuid>,
    pub guests: Vec<Uuid>,
    pub blocked: Vec<Uuid>,
    pub followers: Vec<Uuid>,
    pub tags: Vec<String>,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Comment>,
    #[serde(rename = "createDate")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "modifiedDate")]
    pub modified_at: DateTime<Utc>,
}

impl Board {
    pub fn members(&self, list: MemberList) -> &[Uuid] {
        match list {
            MemberList::Admins => &self.admins,
            MemberList::Authors => &self.authors,
            MemberList::Viewers => &self.viewers,
            MemberList::Subscribers => &self.subscribers,
            MemberList::Guests => &self.guests,
            MemberList::Blocked => &self.blocked,
            MemberList::Followers => &self.followers,
        }
    }

    pub fn members_mut(&mut self, list: MemberList) -> &mut Vec<Uuid> {
        match list {
            MemberList::Admins => &mut self.admins,
            MemberList::Authors => &mut self.authors,
            MemberList::Viewers => &mut self.viewers,
            MemberList::Subscribers => &mut self.subscribers,
            MemberList::Guests => &mut self.guests,
            MemberList::Blocked => &mut self.blocked,
            MemberList::Followers => &mut self.followers,
        }
    }

    /// Every profile that may hold a cache entry mentioning this board.
    pub fn all_members(&self) -> Vec<Uuid> {
        let mut ids = vec![self.owner];
        for (list, _) in MemberList::PRECEDENCE {
            ids.extend_from_slice(self.members(list));
        }
        ids.extend_from_slice(&self.followers);
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn is_password_protected(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn is_follower(&self, profile_id: Uuid) -> bool {
        self.followers.contains(&profile_id)
    }
}

// -- Posts and things --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "boardID")]
    pub board_id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub tags: Vec<String>,
    pub state: ItemState,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Comment>,
    #[serde(rename = "createDate")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "modifiedDate")]
    pub modified_at: DateTime<Utc>,
}

/// Kind-specific fields of a thing, tagged by `thingType` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "thingType", rename_all = "UPPERCASE")]
pub enum ThingDetail {
    Note {
        #[serde(default)]
        body: String,
    },
    #[serde(rename_all = "camelCase")]
    Task {
        #[serde(default)]
        status: TaskStatus,
        #[serde(default)]
        due_date: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    File {
        file_ext: String,
        file_mime: String,
        #[serde(default)]
        file_size: i64,
    },
    #[serde(rename_all = "camelCase")]
    Collection {
        #[serde(default)]
        file_count: i64,
    },
}

impl ThingDetail {
    pub fn kind(&self) -> ThingKind {
        match self {
            Self::Note { .. } => ThingKind::Note,
            Self::Task { .. } => ThingKind::Task,
            Self::File { .. } => ThingKind::File,
            Self::Collection { .. } => ThingKind::Collection,
        }
    }
}

/// A content item living inside a post: note, task, file or collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "boardID")]
    pub board_id: Uuid,
    #[serde(rename = "postID")]
    pub post_id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub tags: Vec<String>,
    pub state: ItemState,
    pub pos: Option<i64>,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Comment>,
    #[serde(rename = "createDate")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "modifiedDate")]
    pub modified_at: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: ThingDetail,
}

impl Thing {
    pub fn kind(&self) -> ThingKind {
        self.detail.kind()
    }

    /// Files with image or video mime types are served through presigned URLs.
    pub fn is_presignable_media(&self) -> bool {
        match &self.detail {
            ThingDetail::File { file_mime, .. } => {
                file_mime.starts_with("image/") || file_mime.starts_with("video/")
            }
            _ => false,
        }
    }

    /// Object name of the stored bytes: `{id}{ext}`.
    pub fn object_name(&self) -> Option<String> {
        match &self.detail {
            ThingDetail::File { file_ext, .. } => Some(format!("{}{}", self.id, file_ext)),
            _ => None,
        }
    }
}

// -- Profiles, bookmarks, media --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConciseProfile {
    pub id: Uuid,
    #[serde(rename = "accountID")]
    pub account_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub screen_name: String,
    pub photo: String,
}

/// A role offered to a profile that takes effect once the invitee accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardInvite {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "boardID")]
    pub board_id: Uuid,
    #[serde(rename = "senderID")]
    pub sender_id: Uuid,
    #[serde(rename = "inviteeID")]
    pub invitee_id: Uuid,
    pub role: Role,
    #[serde(rename = "createDate")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "thingID")]
    pub thing_id: Uuid,
    #[serde(rename = "profileID")]
    pub profile_id: Uuid,
    #[serde(rename = "thingType")]
    pub thing_kind: ThingKind,
    #[serde(rename = "createDate")]
    pub created_at: DateTime<Utc>,
}

/// Named thumbnail sizes as stored under `thumbs/{code}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbVariant {
    Icon,
    Small,
    Medium,
    Large,
}

impl ThumbVariant {
    pub const ALL: [ThumbVariant; 4] = [
        ThumbVariant::Icon,
        ThumbVariant::Small,
        ThumbVariant::Medium,
        ThumbVariant::Large,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Icon => "ic",
            Self::Small => "sm",
            Self::Medium => "md",
            Self::Large => "lg",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

impl Thumbnails {
    pub fn set(&mut self, variant: ThumbVariant, url: String) {
        match variant {
            ThumbVariant::Icon => self.icon = Some(url),
            ThumbVariant::Small => self.small = Some(url),
            ThumbVariant::Medium => self.medium = Some(url),
            ThumbVariant::Large => self.large = Some(url),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.icon.is_none()
            && self.small.is_none()
            && self.medium.is_none()
            && self.large.is_none()
            && self.original.is_none()
    }
}
