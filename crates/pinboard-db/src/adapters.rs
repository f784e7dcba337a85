//! The store as seen by the engine.

use anyhow::Result;
use chrono::{DateTime, Utc};
use pinboard_core::{BookmarkLookup, ContentSource, Page, ProfileDirectory, RoleStore, ThingFilter};
use pinboard_types::models::{
    Board, BoardInvite, Bookmark, ConciseProfile, ItemState, MemberList, Post, Thing, ThingKind,
};
use uuid::Uuid;

use crate::Database;

impl ContentSource for Database {
    fn fetch_board(&self, board_id: Uuid) -> Result<Option<Board>> {
        self.get_board(board_id, false)
    }

    fn board_things_tags(&self, board_id: Uuid) -> Result<Vec<String>> {
        Database::board_things_tags(self, board_id)
    }

    fn sub_boards(
        &self,
        parent_id: Uuid,
        filter: &ThingFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Board>> {
        Database::sub_boards(self, parent_id, filter, offset, limit)
    }

    fn things(
        &self,
        board_id: Uuid,
        kind: ThingKind,
        filter: &ThingFilter,
        limit: usize,
    ) -> Result<Page<Thing>> {
        self.list_things(board_id, kind, filter, limit)
    }

    fn post(&self, post_id: Uuid) -> Result<Option<Post>> {
        self.get_post(post_id)
    }

    fn post_things(&self, post_id: Uuid, kind: ThingKind) -> Result<Vec<Thing>> {
        Database::post_things(self, post_id, kind)
    }

    fn recent_things(&self, board_id: Uuid, since: DateTime<Utc>, limit: usize) -> Result<Vec<Thing>> {
        Database::recent_things(self, board_id, since, limit)
    }
}

impl RoleStore for Database {
    fn load_board(&self, board_id: Uuid) -> Result<Option<Board>> {
        self.get_board(board_id, false)
    }

    fn child_board_ids(&self, board_id: Uuid) -> Result<Vec<Uuid>> {
        Database::child_board_ids(self, board_id)
    }

    fn insert_board(&self, board: &Board) -> Result<()> {
        Database::insert_board(self, board)
    }

    fn update_board_settings(&self, board: &Board) -> Result<()> {
        Database::update_board_settings(self, board)
    }

    fn set_board_state(&self, board_id: Uuid, state: ItemState) -> Result<()> {
        Database::set_board_state(self, board_id, state)
    }

    fn set_member_list(&self, board_id: Uuid, profile_id: Uuid, list: Option<MemberList>) -> Result<()> {
        Database::set_member_list(self, board_id, profile_id, list)
    }

    fn set_follower(&self, board_id: Uuid, profile_id: Uuid, following: bool) -> Result<()> {
        Database::set_follower(self, board_id, profile_id, following)
    }

    fn insert_invite(&self, invite: &BoardInvite) -> Result<bool> {
        Database::insert_invite(self, invite)
    }

    fn pending_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<Option<BoardInvite>> {
        self.get_invite(board_id, invitee_id)
    }

    fn accept_invite(&self, invite: &BoardInvite, list: MemberList) -> Result<()> {
        Database::accept_invite(self, invite, list)
    }

    fn delete_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<()> {
        Database::delete_invite(self, board_id, invitee_id)
    }

    fn invites_for(&self, invitee_id: Uuid) -> Result<Vec<BoardInvite>> {
        self.list_invites(invitee_id)
    }
}

impl BookmarkLookup for Database {
    fn bookmark(&self, thing_id: Uuid, profile_id: Uuid) -> Result<Option<Bookmark>> {
        self.get_bookmark(thing_id, profile_id)
    }
}

impl ProfileDirectory for Database {
    fn concise_profile(&self, profile_id: Uuid) -> Result<Option<ConciseProfile>> {
        self.get_profile_by_id(profile_id)?
            .map(|row| row.concise())
            .transpose()
    }
}
