use chrono::{Duration as ChronoDuration, Utc};
use pinboard_types::api::{
    BoardDetailData, BoardThingsData, BoardThingsQuery, BoardView, PostThingsData, ThingView,
};
use pinboard_types::models::{Board, Role, ThingKind};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::permission_key;
use crate::collab::ThingFilter;
use crate::engine::{Collaborators, Engine, Gated};
use crate::error::CoreError;
use crate::fanout::FanOut;
use crate::gate::{self, Denial, GateOutcome};
use crate::resolver;

/// Items per listing unit.
pub const UNIT_LIMIT: usize = 10;

/// How far back `recentlyAdded` looks.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Position given to post items that have none.
pub const DEFAULT_POS: i64 = 3;

/// Each unit owns exactly one field of the merged response.
enum Unit {
    Board(Option<BoardView>),
    SubBoards(Vec<BoardView>),
    Things(ThingKind, Vec<ThingView>),
    Recent(Vec<ThingView>),
}

impl Engine {
    /// Gate the caller, then fetch the board's contents concurrently.
    pub async fn board_things(
        &self,
        board_id: Uuid,
        profile_id: Uuid,
        query: &BoardThingsQuery,
        password: Option<String>,
    ) -> Result<Gated<BoardThingsData>, CoreError> {
        let filter = ThingFilter::from_query(query)?;
        let resolved = self.access(board_id, profile_id, password).await?;
        let board = resolved.board().clone();
        let gate = resolved
            .access
            .gate_data(&board, board.is_follower(profile_id));

        if !resolved.access.is_allowed() {
            return Ok(Gated::Refused {
                outcome: resolved.access.outcome,
                gate,
            });
        }

        let role = resolved.role();
        let mut group = FanOut::new(self.aggregate_timeout);

        let deps = self.deps.clone();
        group.spawn("board", move || board_unit(&deps, board_id, profile_id, role));

        if filter.file_ext.is_none() {
            let deps = self.deps.clone();
            let (f, chain) = (filter.clone(), resolved.chain.clone());
            let generation = resolved.generation;
            group.spawn("subBoards", move || {
                sub_boards_unit(&deps, &chain, generation, profile_id, &f)
            });

            for (unit, kind) in [
                ("tasks", ThingKind::Task),
                ("notes", ThingKind::Note),
                ("collections", ThingKind::Collection),
            ] {
                let deps = self.deps.clone();
                let f = filter.clone();
                let owner = board.owner;
                group.spawn(unit, move || {
                    things_unit(&deps, board_id, owner, profile_id, kind, &f)
                });
            }
        }

        let deps = self.deps.clone();
        let f = filter.clone();
        let owner = board.owner;
        group.spawn("files", move || {
            things_unit(&deps, board_id, owner, profile_id, ThingKind::File, &f)
        });

        if !filter.is_active() {
            let deps = self.deps.clone();
            group.spawn("recentlyAdded", move || {
                recent_unit(&deps, board_id, owner, profile_id)
            });
        }

        let units = group.join().await?;

        let mut data = BoardThingsData {
            gate,
            role,
            board: None,
            sub_boards: None,
            tasks: None,
            notes: None,
            files: None,
            collections: None,
            recently_added: None,
        };
        for (_, unit) in units {
            match unit {
                Unit::Board(view) => data.board = view,
                Unit::SubBoards(boards) => data.sub_boards = Some(boards),
                Unit::Things(ThingKind::Task, items) => data.tasks = Some(items),
                Unit::Things(ThingKind::Note, items) => data.notes = Some(items),
                Unit::Things(ThingKind::File, items) => data.files = Some(items),
                Unit::Things(ThingKind::Collection, items) => data.collections = Some(items),
                Unit::Things(kind, _) => {
                    return Err(CoreError::Store(anyhow::anyhow!(
                        "no board listing for {} items",
                        kind.as_str()
                    )));
                }
                Unit::Recent(items) => data.recently_added = Some(items),
            }
        }

        info!(
            "Board {} aggregated for profile {} (filters active: {})",
            board_id,
            profile_id,
            filter.is_active()
        );
        Ok(Gated::Allowed(data))
    }

    /// Gate the caller, then return the enriched board with its cover.
    pub async fn board_detail(
        &self,
        board_id: Uuid,
        profile_id: Uuid,
        password: Option<String>,
    ) -> Result<Gated<BoardDetailData>, CoreError> {
        let resolved = self.access(board_id, profile_id, password).await?;
        let board = resolved.board().clone();
        let gate = resolved
            .access
            .gate_data(&board, board.is_follower(profile_id));

        if !resolved.access.is_allowed() {
            return Ok(Gated::Refused {
                outcome: resolved.access.outcome,
                gate,
            });
        }

        let role = resolved.role();
        let deps = self.deps.clone();
        let view = Self::blocking(move || {
            let enricher = deps.enricher(profile_id);
            let has_password = board.is_password_protected();
            let mut view = enricher.board(board);
            enricher.attach_cover(&mut view);
            if role.can_manage_members() {
                view.has_password = Some(has_password);
            }
            Ok(view)
        })
        .await?;

        Ok(Gated::Allowed(BoardDetailData {
            gate,
            role,
            board: view,
        }))
    }

    /// Gate the caller, then fetch every item of one post, ordered by position.
    pub async fn post_things(
        &self,
        board_id: Uuid,
        post_id: Uuid,
        profile_id: Uuid,
        password: Option<String>,
    ) -> Result<Gated<PostThingsData>, CoreError> {
        let resolved = self.access(board_id, profile_id, password).await?;
        let board = resolved.board().clone();
        let gate = resolved
            .access
            .gate_data(&board, board.is_follower(profile_id));

        if !resolved.access.is_allowed() {
            return Ok(Gated::Refused {
                outcome: resolved.access.outcome,
                gate,
            });
        }

        let deps = self.deps.clone();
        let post = Self::blocking(move || Ok(deps.content.post(post_id)?)).await?;
        match post {
            Some(post) if post.board_id == board_id => {}
            _ => return Err(CoreError::NotFound("post")),
        }

        let mut group = FanOut::new(self.aggregate_timeout);
        for (unit, kind) in [
            ("notes", ThingKind::Note),
            ("collections", ThingKind::Collection),
            ("tasks", ThingKind::Task),
            ("files", ThingKind::File),
        ] {
            let deps = self.deps.clone();
            let owner = board.owner;
            group.spawn(unit, move || {
                let things = deps.content.post_things(post_id, kind)?;
                let enricher = deps.enricher(profile_id);
                let board_owner = enricher.profile(owner);
                Ok(enricher.things(things, board_owner.as_ref()))
            });
        }

        let mut things: Vec<ThingView> = group
            .join()
            .await?
            .into_iter()
            .flat_map(|(_, items)| items)
            .collect();
        things.sort_by_key(|t| t.thing.pos.unwrap_or(DEFAULT_POS));

        Ok(Gated::Allowed(PostThingsData {
            gate,
            role: resolved.role(),
            things,
        }))
    }
}

fn board_unit(
    deps: &Collaborators,
    board_id: Uuid,
    profile_id: Uuid,
    role: Role,
) -> anyhow::Result<Unit> {
    let Some(board) = deps.content.fetch_board(board_id)? else {
        return Ok(Unit::Board(None));
    };
    let tags = deps.content.board_things_tags(board_id)?;

    let enricher = deps.enricher(profile_id);
    let has_password = board.is_password_protected();
    let mut view = enricher.board(board);
    view.all_things_tags = Some(tags);
    if role.can_manage_members() {
        view.has_password = Some(has_password);
    }
    Ok(Unit::Board(Some(view)))
}

/// Children the caller could open: hidden when the gate would refuse them outright.
/// Pages through the newest children until `UNIT_LIMIT` visible ones are found.
fn sub_boards_unit(
    deps: &Collaborators,
    parent_chain: &[Board],
    generation: u64,
    profile_id: Uuid,
    filter: &ThingFilter,
) -> anyhow::Result<Unit> {
    let parent_id = parent_chain[0].id;
    let key = permission_key(profile_id);
    let enricher = deps.enricher(profile_id);

    let mut views = Vec::with_capacity(UNIT_LIMIT);
    let mut offset = 0;
    while views.len() < UNIT_LIMIT {
        let children = deps.content.sub_boards(parent_id, filter, offset, UNIT_LIMIT)?;
        let fetched = children.len();
        offset += fetched;

        for child in children {
            if views.len() == UNIT_LIMIT {
                break;
            }
            let mut chain = Vec::with_capacity(parent_chain.len() + 1);
            chain.push(child);
            chain.extend_from_slice(parent_chain);

            let role = resolver::resolve(&*deps.cache, &key, generation, &chain, profile_id)?;
            let outcome = gate::evaluate(&chain[0], role, None).outcome;
            if outcome == GateOutcome::Denied(Denial::NoAccess) {
                debug!("Sub-board {} hidden from {}", chain[0].id, profile_id);
                continue;
            }
            let child = chain.swap_remove(0);
            views.push(enricher.board(child));
        }

        if fetched < UNIT_LIMIT {
            break;
        }
    }
    Ok(Unit::SubBoards(views))
}

fn things_unit(
    deps: &Collaborators,
    board_id: Uuid,
    board_owner: Uuid,
    profile_id: Uuid,
    kind: ThingKind,
    filter: &ThingFilter,
) -> anyhow::Result<Unit> {
    let page = deps.content.things(board_id, kind, filter, UNIT_LIMIT)?;
    let enricher = deps.enricher(profile_id);
    let owner = enricher.profile(board_owner);
    Ok(Unit::Things(
        kind,
        enricher.things(page.into_items(), owner.as_ref()),
    ))
}

fn recent_unit(
    deps: &Collaborators,
    board_id: Uuid,
    board_owner: Uuid,
    profile_id: Uuid,
) -> anyhow::Result<Unit> {
    let since = Utc::now() - ChronoDuration::days(RECENT_WINDOW_DAYS);
    let things = deps.content.recent_things(board_id, since, UNIT_LIMIT)?;
    let enricher = deps.enricher(profile_id);
    let owner = enricher.profile(board_owner);
    Ok(Unit::Recent(enricher.things(things, owner.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, board, engine, file_thing, note_thing, task_thing};
    use pinboard_types::models::{ItemState, Visibility};
    use std::sync::Arc;

    fn viewer_board(store: &MemoryStore) -> (Uuid, Uuid) {
        let viewer = Uuid::new_v4();
        let owner = store.add_profile(1);
        let mut b = board(owner.id);
        b.viewers.push(viewer);
        let id = b.id;
        store.add_board(b);
        (id, viewer)
    }

    #[tokio::test]
    async fn allowed_fetch_returns_every_list() {
        let store = Arc::new(MemoryStore::default());
        let (board_id, viewer) = viewer_board(&store);
        store.add_thing(note_thing(board_id, viewer));
        store.add_thing(task_thing(board_id, viewer));
        let engine = engine(store);

        let Gated::Allowed(data) = engine
            .board_things(board_id, viewer, &BoardThingsQuery::default(), None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };

        assert_eq!(data.role, Role::Viewer);
        assert!(data.gate.is_client_accessible);
        assert!(!data.gate.is_password);
        assert_eq!(data.notes.unwrap().len(), 1);
        assert_eq!(data.tasks.unwrap().len(), 1);
        assert_eq!(data.files.unwrap().len(), 0);
        assert_eq!(data.collections.unwrap().len(), 0);
        assert!(data.sub_boards.unwrap().is_empty());
        assert_eq!(data.recently_added.unwrap().len(), 2);
        assert!(data.board.unwrap().all_things_tags.is_some());
    }

    #[tokio::test]
    async fn file_type_filter_suppresses_other_units() {
        let store = Arc::new(MemoryStore::default());
        let (board_id, viewer) = viewer_board(&store);
        store.add_thing(file_thing(board_id, viewer, ".pdf", "application/pdf"));
        store.add_thing(file_thing(board_id, viewer, ".png", "image/png"));
        store.add_thing(note_thing(board_id, viewer));
        let engine = engine(store);

        let query = BoardThingsQuery {
            file_type: Some("pdf".into()),
            ..Default::default()
        };
        let Gated::Allowed(data) = engine
            .board_things(board_id, viewer, &query, None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };

        assert!(data.tasks.is_none());
        assert!(data.notes.is_none());
        assert!(data.collections.is_none());
        assert!(data.sub_boards.is_none());
        assert!(data.recently_added.is_none());
        assert!(data.board.is_some());
        assert_eq!(data.files.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn any_filter_suppresses_recently_added() {
        let store = Arc::new(MemoryStore::default());
        let (board_id, viewer) = viewer_board(&store);
        let engine = engine(store);

        let query = BoardThingsQuery {
            tags: Some("x".into()),
            ..Default::default()
        };
        let Gated::Allowed(data) = engine
            .board_things(board_id, viewer, &query, None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };
        assert!(data.recently_added.is_none());
        assert!(data.notes.is_some());
    }

    #[tokio::test]
    async fn a_failing_unit_fails_the_aggregate() {
        let store = Arc::new(MemoryStore::default());
        let (board_id, viewer) = viewer_board(&store);
        store.fail_kind(ThingKind::Task);
        let engine = engine(store);

        let err = engine
            .board_things(board_id, viewer, &BoardThingsQuery::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Aggregate { unit: "tasks", .. }));
    }

    #[tokio::test]
    async fn refused_caller_gets_gate_flags_only() {
        let store = Arc::new(MemoryStore::default());
        let mut b = board(Uuid::new_v4());
        b.visibility = Visibility::Private;
        let id = b.id;
        store.add_board(b);
        let engine = engine(store);

        match engine
            .board_things(id, Uuid::new_v4(), &BoardThingsQuery::default(), None)
            .await
            .unwrap()
        {
            Gated::Refused { outcome, gate } => {
                assert_eq!(outcome, GateOutcome::Denied(Denial::NoAccess));
                assert!(!gate.is_client_accessible);
                assert_eq!(gate.id, id);
            }
            Gated::Allowed(_) => panic!("private board leaked"),
        }
    }

    #[tokio::test]
    async fn sub_boards_hide_private_children_from_outsiders() {
        let store = Arc::new(MemoryStore::default());
        let outsider = Uuid::new_v4();
        let parent = board(Uuid::new_v4());
        let mut open = board(Uuid::new_v4());
        open.parent_id = Some(parent.id);
        let mut closed = board(Uuid::new_v4());
        closed.parent_id = Some(parent.id);
        closed.visibility = Visibility::Private;
        let (parent_id, open_id) = (parent.id, open.id);
        store.add_board(parent);
        store.add_board(open);
        store.add_board(closed);
        let engine = engine(store);

        let Gated::Allowed(data) = engine
            .board_things(parent_id, outsider, &BoardThingsQuery::default(), None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };
        let ids: Vec<Uuid> = data.sub_boards.unwrap().iter().map(|b| b.board.id).collect();
        assert_eq!(ids, vec![open_id]);
    }

    #[tokio::test]
    async fn visible_sub_boards_behind_a_full_page_of_private_ones_are_found() {
        let store = Arc::new(MemoryStore::default());
        let outsider = Uuid::new_v4();
        let parent = board(Uuid::new_v4());
        let parent_id = parent.id;
        store.add_board(parent);

        let mut open = board(Uuid::new_v4());
        open.parent_id = Some(parent_id);
        open.created_at -= ChronoDuration::days(1);
        let open_id = open.id;
        store.add_board(open);
        for _ in 0..UNIT_LIMIT {
            let mut closed = board(Uuid::new_v4());
            closed.parent_id = Some(parent_id);
            closed.visibility = Visibility::Private;
            store.add_board(closed);
        }
        let engine = engine(store);

        let Gated::Allowed(data) = engine
            .board_things(parent_id, outsider, &BoardThingsQuery::default(), None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };
        let ids: Vec<Uuid> = data.sub_boards.unwrap().iter().map(|b| b.board.id).collect();
        assert_eq!(ids, vec![open_id]);
    }

    #[tokio::test]
    async fn sub_boards_stop_at_the_unit_limit() {
        let store = Arc::new(MemoryStore::default());
        let parent = board(Uuid::new_v4());
        let parent_id = parent.id;
        store.add_board(parent);
        for _ in 0..UNIT_LIMIT + 3 {
            let mut child = board(Uuid::new_v4());
            child.parent_id = Some(parent_id);
            store.add_board(child);
        }
        let engine = engine(store);

        let Gated::Allowed(data) = engine
            .board_things(parent_id, Uuid::new_v4(), &BoardThingsQuery::default(), None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };
        assert_eq!(data.sub_boards.unwrap().len(), UNIT_LIMIT);
    }

    #[tokio::test]
    async fn hidden_items_are_not_listed() {
        let store = Arc::new(MemoryStore::default());
        let (board_id, viewer) = viewer_board(&store);
        let mut hidden = note_thing(board_id, viewer);
        hidden.state = ItemState::Hidden;
        store.add_thing(hidden);
        let engine = engine(store);

        let Gated::Allowed(data) = engine
            .board_things(board_id, viewer, &BoardThingsQuery::default(), None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };
        assert!(data.notes.unwrap().is_empty());
    }

    #[tokio::test]
    async fn post_things_are_merged_and_ordered_by_position() {
        let store = Arc::new(MemoryStore::default());
        let (board_id, viewer) = viewer_board(&store);
        let post_id = store.add_post(board_id, viewer);

        let mut first = task_thing(board_id, viewer);
        first.post_id = post_id;
        first.pos = Some(1);
        let mut unpositioned = note_thing(board_id, viewer);
        unpositioned.post_id = post_id;
        unpositioned.pos = None;
        let mut last = file_thing(board_id, viewer, ".txt", "text/plain");
        last.post_id = post_id;
        last.pos = Some(7);
        let order = vec![first.id, unpositioned.id, last.id];
        store.add_thing(last);
        store.add_thing(unpositioned);
        store.add_thing(first);
        let engine = engine(store);

        let Gated::Allowed(data) = engine
            .post_things(board_id, post_id, viewer, None)
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };
        let ids: Vec<Uuid> = data.things.iter().map(|t| t.thing.id).collect();
        assert_eq!(ids, order);
    }

    #[tokio::test]
    async fn post_from_another_board_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let (board_id, viewer) = viewer_board(&store);
        let post_id = store.add_post(Uuid::new_v4(), viewer);
        let engine = engine(store);

        let err = engine
            .post_things(board_id, post_id, viewer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound("post")));
    }

    #[tokio::test]
    async fn managers_see_password_flag_on_detail() {
        let store = Arc::new(MemoryStore::default());
        let owner = store.add_profile(9);
        let mut b = board(owner.id);
        b.password = Some("pw".into());
        let id = b.id;
        store.add_board(b);
        let engine = engine(store);

        let Gated::Allowed(detail) = engine
            .board_detail(id, owner.id, Some("pw".into()))
            .await
            .unwrap()
        else {
            panic!("expected allowed");
        };
        assert_eq!(detail.role, Role::Owner);
        assert_eq!(detail.board.has_password, Some(true));
        assert!(detail.gate.is_password_validate);
    }
}
