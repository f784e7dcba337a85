//! Narrow interfaces to the stores and peer services the engine depends on.
//!
//! Every method is synchronous; the engine only calls them from the blocking pool.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use pinboard_types::api::BoardThingsQuery;
use pinboard_types::events::Notification;
use pinboard_types::models::{
    Board, BoardInvite, Bookmark, ConciseProfile, ItemState, MemberList, Post, Thing, ThingKind,
    ThumbVariant, Thumbnails,
};
use uuid::Uuid;

use crate::error::CoreError;

/// Filters shared by every listing unit of a board fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThingFilter {
    /// All must be present on an item.
    pub tags: Vec<String>,
    /// Extension including the leading dot, e.g. `.pdf`.
    pub file_ext: Option<String>,
    pub owner: Option<Uuid>,
    /// Items created on this UTC day.
    pub upload_date: Option<NaiveDate>,
}

impl ThingFilter {
    pub fn from_query(query: &BoardThingsQuery) -> Result<Self, CoreError> {
        let tags = query
            .tags
            .as_deref()
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let file_ext = query
            .file_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!(".{}", t.trim_start_matches('.')));

        let upload_date = match query.upload_date.as_deref().filter(|d| !d.is_empty()) {
            Some(d) => Some(NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                CoreError::validation(format!("uploadDate '{}' is not YYYY-MM-DD", d))
            })?),
            None => None,
        };

        Ok(Self {
            tags,
            file_ext,
            owner: query.owner,
            upload_date,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.tags.is_empty()
            || self.file_ext.is_some()
            || self.owner.is_some()
            || self.upload_date.is_some()
    }
}

/// Paginated envelope some listings come back in.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Read side of the document store.
pub trait ContentSource: Send + Sync {
    /// Active board by id. Hidden (deleted) boards read as `None`.
    fn fetch_board(&self, board_id: Uuid) -> Result<Option<Board>>;

    /// Distinct tags across the board's posts and things.
    fn board_things_tags(&self, board_id: Uuid) -> Result<Vec<String>>;

    /// Active children, newest first, skipping the first `offset`.
    fn sub_boards(
        &self,
        parent_id: Uuid,
        filter: &ThingFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Board>>;

    /// Newest first, excluding hidden items.
    fn things(
        &self,
        board_id: Uuid,
        kind: ThingKind,
        filter: &ThingFilter,
        limit: usize,
    ) -> Result<Page<Thing>>;

    fn post(&self, post_id: Uuid) -> Result<Option<Post>>;

    fn post_things(&self, post_id: Uuid, kind: ThingKind) -> Result<Vec<Thing>>;

    /// Things of any kind created since `since`, newest first.
    fn recent_things(&self, board_id: Uuid, since: DateTime<Utc>, limit: usize)
    -> Result<Vec<Thing>>;
}

/// Source of truth for board membership and parentage.
pub trait RoleStore: Send + Sync {
    /// Board with its member lists and parent pointer. Hidden boards read as `None`.
    fn load_board(&self, board_id: Uuid) -> Result<Option<Board>>;

    fn child_board_ids(&self, board_id: Uuid) -> Result<Vec<Uuid>>;

    fn insert_board(&self, board: &Board) -> Result<()>;

    /// Persist title, description, visibility, password and tags.
    fn update_board_settings(&self, board: &Board) -> Result<()>;

    fn set_board_state(&self, board_id: Uuid, state: ItemState) -> Result<()>;

    /// Remove the profile from every role-bearing list, then add it to `list` if given.
    fn set_member_list(&self, board_id: Uuid, profile_id: Uuid, list: Option<MemberList>)
    -> Result<()>;

    fn set_follower(&self, board_id: Uuid, profile_id: Uuid, following: bool) -> Result<()>;

    /// Record a pending invitation. `false` when the invitee already has one for the board.
    fn insert_invite(&self, invite: &BoardInvite) -> Result<bool>;

    fn pending_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<Option<BoardInvite>>;

    /// Grant the invited role and drop the invitation together.
    fn accept_invite(&self, invite: &BoardInvite, list: MemberList) -> Result<()>;

    fn delete_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<()>;

    /// Pending invitations addressed to `invitee_id`, oldest first.
    fn invites_for(&self, invitee_id: Uuid) -> Result<Vec<BoardInvite>>;
}

pub trait BookmarkLookup: Send + Sync {
    fn bookmark(&self, thing_id: Uuid, profile_id: Uuid) -> Result<Option<Bookmark>>;
}

pub trait ProfileDirectory: Send + Sync {
    fn concise_profile(&self, profile_id: Uuid) -> Result<Option<ConciseProfile>>;
}

/// Blob storage that hands out time-limited URLs.
pub trait MediaStore: Send + Sync {
    /// Presigned URL for `{key}{name}`. Errors when the object does not exist.
    fn user_file(&self, key: &str, name: &str) -> Result<String>;

    /// Presigned URLs of `{key}{code}/{name}` for each variant. Missing variants are skipped.
    fn thumbnails(&self, key: &str, name: &str, variants: &[ThumbVariant]) -> Thumbnails {
        let variants = if variants.is_empty() {
            &ThumbVariant::ALL[..]
        } else {
            variants
        };

        let mut thumbs = Thumbnails::default();
        for variant in variants {
            let variant_key = format!("{}{}/", key, variant.code());
            if let Ok(url) = self.user_file(&variant_key, name) {
                thumbs.set(*variant, url);
            }
        }
        thumbs
    }
}

/// Fire-and-forget notification dispatch.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
