//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use pinboard_types::events::Notification;
use pinboard_types::models::{
    Board, BoardInvite, Bookmark, ConciseProfile, ItemState, MemberList, Post, TaskStatus, Thing, ThingDetail,
    ThingKind, Visibility,
};
use uuid::Uuid;

use crate::cache::MemoryPermissionCache;
use crate::collab::{
    BookmarkLookup, ContentSource, MediaStore, Notifier, Page, ProfileDirectory, RoleStore,
    ThingFilter,
};
use crate::engine::{Collaborators, Engine};

pub fn board(owner: Uuid) -> Board {
    let now = Utc::now();
    Board {
        id: Uuid::new_v4(),
        owner,
        title: "Board".into(),
        description: String::new(),
        visibility: Visibility::Public,
        state: ItemState::Active,
        password: None,
        parent_id: None,
        admins: vec![],
        authors: vec![],
        viewers: vec![],
        subscribers: vec![],
        guests: vec![],
        blocked: vec![],
        followers: vec![],
        tags: vec![],
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
    }
}

fn thing(board_id: Uuid, owner: Uuid, detail: ThingDetail) -> Thing {
    let now = Utc::now();
    Thing {
        id: Uuid::new_v4(),
        board_id,
        post_id: Uuid::new_v4(),
        owner,
        title: "thing".into(),
        tags: vec![],
        state: ItemState::Active,
        pos: None,
        likes: vec![],
        comments: vec![],
        created_at: now,
        modified_at: now,
        detail,
    }
}

pub fn note_thing(board_id: Uuid, owner: Uuid) -> Thing {
    thing(board_id, owner, ThingDetail::Note { body: "body".into() })
}

pub fn task_thing(board_id: Uuid, owner: Uuid) -> Thing {
    thing(
        board_id,
        owner,
        ThingDetail::Task {
            status: TaskStatus::Todo,
            due_date: None,
        },
    )
}

pub fn file_thing(board_id: Uuid, owner: Uuid, ext: &str, mime: &str) -> Thing {
    thing(
        board_id,
        owner,
        ThingDetail::File {
            file_ext: ext.into(),
            file_mime: mime.into(),
            file_size: 10,
        },
    )
}

pub fn engine(store: Arc<MemoryStore>) -> Engine {
    let deps = Collaborators {
        content: store.clone(),
        roles: store.clone(),
        bookmarks: store.clone(),
        profiles: store.clone(),
        media: store.clone(),
        notifier: store,
        cache: Arc::new(MemoryPermissionCache::new(None)),
    };
    Engine::new(deps, Duration::from_secs(5))
}

#[derive(Default)]
pub struct MemoryStore {
    boards: Mutex<HashMap<Uuid, Board>>,
    posts: Mutex<HashMap<Uuid, Post>>,
    things: Mutex<Vec<Thing>>,
    profiles: Mutex<HashMap<Uuid, ConciseProfile>>,
    bookmarks: Mutex<Vec<Bookmark>>,
    invites: Mutex<Vec<BoardInvite>>,
    objects: Mutex<HashSet<String>>,
    sent: Mutex<Vec<Notification>>,
    failing_kinds: Mutex<HashSet<ThingKind>>,
    bookmarks_fail: Mutex<bool>,
}

impl MemoryStore {
    pub fn add_board(&self, board: Board) {
        self.boards.lock().unwrap().insert(board.id, board);
    }

    pub fn with_board(&self, id: Uuid, f: impl FnOnce(&mut Board)) {
        let mut boards = self.boards.lock().unwrap();
        f(boards.get_mut(&id).expect("board exists"));
    }

    pub fn add_profile(&self, account_id: i64) -> ConciseProfile {
        let profile = ConciseProfile {
            id: Uuid::new_v4(),
            account_id,
            first_name: "Ada".into(),
            last_name: format!("No{}", account_id),
            screen_name: format!("ada{}", account_id),
            photo: String::new(),
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id, profile.clone());
        profile
    }

    pub fn add_thing(&self, thing: Thing) {
        self.things.lock().unwrap().push(thing);
    }

    pub fn add_post(&self, board_id: Uuid, owner: Uuid) -> Uuid {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            board_id,
            owner,
            title: "post".into(),
            tags: vec![],
            state: ItemState::Active,
            likes: vec![],
            comments: vec![],
            created_at: now,
            modified_at: now,
        };
        let id = post.id;
        self.posts.lock().unwrap().insert(id, post);
        id
    }

    pub fn add_bookmark(&self, thing_id: Uuid, profile_id: Uuid) -> Uuid {
        let bookmark = Bookmark {
            id: Uuid::new_v4(),
            thing_id,
            profile_id,
            thing_kind: ThingKind::Note,
            created_at: Utc::now(),
        };
        let id = bookmark.id;
        self.bookmarks.lock().unwrap().push(bookmark);
        id
    }

    pub fn add_object(&self, key: &str, name: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}{}", key, name));
    }

    pub fn fail_bookmarks(&self) {
        *self.bookmarks_fail.lock().unwrap() = true;
    }

    pub fn fail_kind(&self, kind: ThingKind) {
        self.failing_kinds.lock().unwrap().insert(kind);
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    fn matches(thing: &Thing, filter: &ThingFilter) -> bool {
        if let Some(ext) = &filter.file_ext {
            match &thing.detail {
                ThingDetail::File { file_ext, .. } if file_ext == ext => {}
                _ => return false,
            }
        }
        if filter.owner.is_some_and(|o| o != thing.owner) {
            return false;
        }
        if filter.upload_date.is_some_and(|d| thing.created_at.date_naive() != d) {
            return false;
        }
        filter.tags.iter().all(|t| thing.tags.contains(t))
    }
}

impl ContentSource for MemoryStore {
    fn fetch_board(&self, board_id: Uuid) -> Result<Option<Board>> {
        self.load_board(board_id)
    }

    fn board_things_tags(&self, board_id: Uuid) -> Result<Vec<String>> {
        let mut tags: Vec<String> = self
            .things
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.board_id == board_id)
            .flat_map(|t| t.tags.clone())
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    fn sub_boards(
        &self,
        parent_id: Uuid,
        _filter: &ThingFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Board>> {
        let mut children: Vec<Board> = self
            .boards
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.parent_id == Some(parent_id) && b.state != ItemState::Hidden)
            .cloned()
            .collect();
        children.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(children.into_iter().skip(offset).take(limit).collect())
    }

    fn things(
        &self,
        board_id: Uuid,
        kind: ThingKind,
        filter: &ThingFilter,
        limit: usize,
    ) -> Result<Page<Thing>> {
        if self.failing_kinds.lock().unwrap().contains(&kind) {
            bail!("{} listing unavailable", kind.as_str());
        }
        let all: Vec<Thing> = self
            .things
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.board_id == board_id && t.kind() == kind)
            .filter(|t| t.state != ItemState::Hidden && Self::matches(t, filter))
            .cloned()
            .collect();
        let total = all.len();
        let items: Vec<Thing> = all.into_iter().take(limit).collect();
        Ok(Page {
            has_more: items.len() < total,
            items,
            total,
        })
    }

    fn post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.lock().unwrap().get(&post_id).cloned())
    }

    fn post_things(&self, post_id: Uuid, kind: ThingKind) -> Result<Vec<Thing>> {
        Ok(self
            .things
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.post_id == post_id && t.kind() == kind && t.state != ItemState::Hidden)
            .cloned()
            .collect())
    }

    fn recent_things(&self, board_id: Uuid, since: DateTime<Utc>, limit: usize) -> Result<Vec<Thing>> {
        Ok(self
            .things
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.board_id == board_id && t.created_at >= since)
            .filter(|t| t.state != ItemState::Hidden)
            .take(limit)
            .cloned()
            .collect())
    }
}

impl RoleStore for MemoryStore {
    fn load_board(&self, board_id: Uuid) -> Result<Option<Board>> {
        Ok(self
            .boards
            .lock()
            .unwrap()
            .get(&board_id)
            .filter(|b| b.state != ItemState::Hidden)
            .cloned())
    }

    fn child_board_ids(&self, board_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .boards
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.parent_id == Some(board_id))
            .map(|b| b.id)
            .collect())
    }

    fn insert_board(&self, board: &Board) -> Result<()> {
        self.add_board(board.clone());
        Ok(())
    }

    fn update_board_settings(&self, board: &Board) -> Result<()> {
        self.add_board(board.clone());
        Ok(())
    }

    fn set_board_state(&self, board_id: Uuid, state: ItemState) -> Result<()> {
        self.with_board(board_id, |b| b.state = state);
        Ok(())
    }

    fn set_member_list(&self, board_id: Uuid, profile_id: Uuid, list: Option<MemberList>) -> Result<()> {
        self.with_board(board_id, |b| {
            for (l, _) in MemberList::PRECEDENCE {
                b.members_mut(l).retain(|p| *p != profile_id);
            }
            if let Some(l) = list {
                b.members_mut(l).push(profile_id);
            }
        });
        Ok(())
    }

    fn set_follower(&self, board_id: Uuid, profile_id: Uuid, following: bool) -> Result<()> {
        self.with_board(board_id, |b| {
            b.followers.retain(|p| *p != profile_id);
            if following {
                b.followers.push(profile_id);
            }
        });
        Ok(())
    }

    fn insert_invite(&self, invite: &BoardInvite) -> Result<bool> {
        let mut invites = self.invites.lock().unwrap();
        if invites
            .iter()
            .any(|i| i.board_id == invite.board_id && i.invitee_id == invite.invitee_id)
        {
            return Ok(false);
        }
        invites.push(invite.clone());
        Ok(true)
    }

    fn pending_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<Option<BoardInvite>> {
        Ok(self
            .invites
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.board_id == board_id && i.invitee_id == invitee_id)
            .cloned())
    }

    fn accept_invite(&self, invite: &BoardInvite, list: MemberList) -> Result<()> {
        self.set_member_list(invite.board_id, invite.invitee_id, Some(list))?;
        self.delete_invite(invite.board_id, invite.invitee_id)
    }

    fn delete_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<()> {
        self.invites
            .lock()
            .unwrap()
            .retain(|i| !(i.board_id == board_id && i.invitee_id == invitee_id));
        Ok(())
    }

    fn invites_for(&self, invitee_id: Uuid) -> Result<Vec<BoardInvite>> {
        let mut invites: Vec<BoardInvite> = self
            .invites
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.invitee_id == invitee_id)
            .cloned()
            .collect();
        invites.sort_by_key(|i| i.created_at);
        Ok(invites)
    }
}

impl BookmarkLookup for MemoryStore {
    fn bookmark(&self, thing_id: Uuid, profile_id: Uuid) -> Result<Option<Bookmark>> {
        if *self.bookmarks_fail.lock().unwrap() {
            bail!("bookmark store offline");
        }
        Ok(self
            .bookmarks
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.thing_id == thing_id && b.profile_id == profile_id)
            .cloned())
    }
}

impl ProfileDirectory for MemoryStore {
    fn concise_profile(&self, profile_id: Uuid) -> Result<Option<ConciseProfile>> {
        Ok(self.profiles.lock().unwrap().get(&profile_id).cloned())
    }
}

impl MediaStore for MemoryStore {
    fn user_file(&self, key: &str, name: &str) -> Result<String> {
        let path = format!("{}{}", key, name);
        if self.objects.lock().unwrap().contains(&path) {
            Ok(format!("https://media.test/{}?signature=x", path))
        } else {
            bail!("object {} not found", path)
        }
    }
}

impl Notifier for MemoryStore {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}
