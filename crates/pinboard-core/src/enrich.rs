use std::cell::RefCell;
use std::collections::HashMap;

use pinboard_types::api::{BoardView, PostView, ThingView};
use pinboard_types::models::{Board, ConciseProfile, Post, Thing, ThingKind};
use tracing::warn;
use uuid::Uuid;

use crate::collab::{BookmarkLookup, MediaStore, ProfileDirectory};

/// `user/{account}/profile/{profile}/board/{board}/media/`, plus `{sub}/` when given.
pub fn board_media_key(account_id: i64, profile_id: Uuid, board_id: Uuid, sub: &str) -> String {
    let base = format!(
        "user/{}/profile/{}/board/{}/media/",
        account_id, profile_id, board_id
    );
    if sub.is_empty() {
        base
    } else {
        format!("{}{}/", base, sub)
    }
}

/// `user/{account}/profile/{profile}/board/{board}/cover/`, plus `{sub}/` when given.
pub fn board_cover_key(account_id: i64, profile_id: Uuid, board_id: Uuid, sub: &str) -> String {
    let base = format!(
        "user/{}/profile/{}/board/{}/cover/",
        account_id, profile_id, board_id
    );
    if sub.is_empty() {
        base
    } else {
        format!("{}{}/", base, sub)
    }
}

/// Attaches per-caller derived state to items. Failures never abort: a failed
/// lookup leaves the corresponding field at its default.
pub struct Enricher<'a> {
    bookmarks: &'a dyn BookmarkLookup,
    media: &'a dyn MediaStore,
    profiles: &'a dyn ProfileDirectory,
    profile_id: Uuid,
    owners: RefCell<HashMap<Uuid, Option<ConciseProfile>>>,
}

impl<'a> Enricher<'a> {
    pub fn new(
        bookmarks: &'a dyn BookmarkLookup,
        media: &'a dyn MediaStore,
        profiles: &'a dyn ProfileDirectory,
        profile_id: Uuid,
    ) -> Self {
        Self {
            bookmarks,
            media,
            profiles,
            profile_id,
            owners: RefCell::new(HashMap::new()),
        }
    }

    pub fn profile(&self, profile_id: Uuid) -> Option<ConciseProfile> {
        if let Some(hit) = self.owners.borrow().get(&profile_id) {
            return hit.clone();
        }
        let found = match self.profiles.concise_profile(profile_id) {
            Ok(found) => found,
            Err(e) => {
                warn!("Profile lookup failed for {}: {:#}", profile_id, e);
                None
            }
        };
        self.owners.borrow_mut().insert(profile_id, found.clone());
        found
    }

    fn bookmark_state(&self, thing_id: Uuid) -> (bool, Option<Uuid>) {
        match self.bookmarks.bookmark(thing_id, self.profile_id) {
            Ok(Some(b)) => (true, Some(b.id)),
            Ok(None) => (false, None),
            Err(e) => {
                warn!("Bookmark lookup failed for {}: {:#}", thing_id, e);
                (false, None)
            }
        }
    }

    /// `board_owner` locates the board's media; without it files get no URLs.
    pub fn thing(&self, thing: Thing, board_owner: Option<&ConciseProfile>) -> ThingView {
        let (is_bookmarked, bookmark_id) = self.bookmark_state(thing.id);

        let (mut url, mut thumbnails) = (None, None);
        if let (ThingKind::File, Some(owner)) = (thing.kind(), board_owner) {
            if thing.is_presignable_media() {
                if let Some(name) = thing.object_name() {
                    let key = board_media_key(owner.account_id, owner.id, thing.board_id, "");
                    url = match self.media.user_file(&key, &name) {
                        Ok(u) => Some(u),
                        Err(e) => {
                            warn!("Presign failed for {}{}: {:#}", key, name, e);
                            None
                        }
                    };
                }
            }
            let thumb_key = board_media_key(owner.account_id, owner.id, thing.board_id, "thumbs");
            thumbnails = Some(
                self.media
                    .thumbnails(&thumb_key, &format!("{}.png", thing.id), &[]),
            );
        }

        let owner_info = match thing.kind() {
            ThingKind::File => self.profile(thing.owner),
            _ => None,
        };

        ThingView {
            total_likes: thing.likes.len(),
            is_liked: thing.likes.contains(&self.profile_id),
            total_comments: thing.comments.len(),
            is_bookmarked,
            bookmark_id,
            url,
            thumbnails,
            owner_info,
            thing,
        }
    }

    pub fn things(&self, things: Vec<Thing>, board_owner: Option<&ConciseProfile>) -> Vec<ThingView> {
        things
            .into_iter()
            .map(|t| self.thing(t, board_owner))
            .collect()
    }

    pub fn board(&self, board: Board) -> BoardView {
        let (is_bookmarked, bookmark_id) = self.bookmark_state(board.id);
        BoardView {
            total_likes: board.likes.len(),
            is_liked: board.likes.contains(&self.profile_id),
            total_comments: board.comments.len(),
            is_bookmarked,
            bookmark_id,
            all_things_tags: None,
            owner_info: self.profile(board.owner),
            cover: None,
            thumbnails: None,
            has_password: None,
            board,
        }
    }

    /// Cover image `{boardID}.png` and its thumbnails, stored under the owner's account.
    pub fn attach_cover(&self, view: &mut BoardView) {
        let Some(owner) = view.owner_info.as_ref() else {
            return;
        };
        let board_id = view.board.id;
        let name = format!("{}.png", board_id);

        let key = board_cover_key(owner.account_id, owner.id, board_id, "");
        view.cover = self.media.user_file(&key, &name).ok();

        let thumb_key = board_cover_key(owner.account_id, owner.id, board_id, "thumbs");
        let thumbs = self.media.thumbnails(&thumb_key, &name, &[]);
        view.thumbnails = (!thumbs.is_empty()).then_some(thumbs);
    }

    pub fn post(&self, post: Post) -> PostView {
        let (is_bookmarked, bookmark_id) = self.bookmark_state(post.id);
        PostView {
            total_likes: post.likes.len(),
            is_liked: post.likes.contains(&self.profile_id),
            total_comments: post.comments.len(),
            is_bookmarked,
            bookmark_id,
            owner_info: self.profile(post.owner),
            post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, file_thing, note_thing};

    #[test]
    fn media_keys_follow_the_storage_layout() {
        let (p, b) = (Uuid::nil(), Uuid::nil());
        assert_eq!(
            board_media_key(7, p, b, "thumbs"),
            format!("user/7/profile/{}/board/{}/media/thumbs/", p, b)
        );
        assert_eq!(
            board_cover_key(7, p, b, ""),
            format!("user/7/profile/{}/board/{}/cover/", p, b)
        );
    }

    #[test]
    fn counts_and_flags_are_derived_per_caller() {
        let store = MemoryStore::default();
        let caller = Uuid::new_v4();
        let mut note = note_thing(Uuid::new_v4(), Uuid::new_v4());
        note.likes = vec![caller, Uuid::new_v4()];
        let bookmark = store.add_bookmark(note.id, caller);

        let enricher = Enricher::new(&store, &store, &store, caller);
        let view = enricher.thing(note, None);

        assert_eq!(view.total_likes, 2);
        assert!(view.is_liked);
        assert_eq!(view.total_comments, 0);
        assert!(view.is_bookmarked);
        assert_eq!(view.bookmark_id, Some(bookmark));
        assert!(view.url.is_none());
        assert!(view.thumbnails.is_none());
    }

    #[test]
    fn bookmark_failure_degrades_to_not_bookmarked() {
        let store = MemoryStore::default();
        store.fail_bookmarks();
        let enricher = Enricher::new(&store, &store, &store, Uuid::new_v4());

        let view = enricher.thing(note_thing(Uuid::new_v4(), Uuid::new_v4()), None);
        assert!(!view.is_bookmarked);
        assert!(view.bookmark_id.is_none());
    }

    #[test]
    fn image_files_get_presigned_urls_and_thumbnails() {
        let store = MemoryStore::default();
        let owner = store.add_profile(3);
        let board_id = Uuid::new_v4();
        let file = file_thing(board_id, owner.id, ".png", "image/png");
        let media_key = board_media_key(3, owner.id, board_id, "");
        let thumb_key = board_media_key(3, owner.id, board_id, "thumbs");
        store.add_object(&media_key, &format!("{}.png", file.id));
        store.add_object(&format!("{}md/", thumb_key), &format!("{}.png", file.id));

        let enricher = Enricher::new(&store, &store, &store, Uuid::new_v4());
        let view = enricher.thing(file, Some(&owner));

        assert!(view.url.unwrap().contains(&media_key));
        let thumbs = view.thumbnails.unwrap();
        assert!(thumbs.medium.is_some());
        assert!(thumbs.icon.is_none());
        assert_eq!(view.owner_info.map(|o| o.id), Some(owner.id));
    }

    #[test]
    fn documents_get_thumbnails_but_no_url() {
        let store = MemoryStore::default();
        let owner = store.add_profile(1);
        let file = file_thing(Uuid::new_v4(), owner.id, ".pdf", "application/pdf");

        let enricher = Enricher::new(&store, &store, &store, Uuid::new_v4());
        let view = enricher.thing(file, Some(&owner));

        assert!(view.url.is_none());
        assert!(view.thumbnails.unwrap().is_empty());
    }

    #[test]
    fn missing_image_object_leaves_url_absent() {
        let store = MemoryStore::default();
        let owner = store.add_profile(1);
        let file = file_thing(Uuid::new_v4(), owner.id, ".jpg", "image/jpeg");

        let enricher = Enricher::new(&store, &store, &store, Uuid::new_v4());
        assert!(enricher.thing(file, Some(&owner)).url.is_none());
    }
}
