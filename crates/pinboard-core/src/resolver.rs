use std::collections::HashSet;

use anyhow::Result;
use pinboard_types::models::{Board, MemberList, Role};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::PermissionCache;
use crate::collab::RoleStore;
use crate::error::CacheError;

/// Role taken from the board's own lists, ignoring any parent.
/// Owner first, then admins, authors, viewers, subscribers, guests and blocked.
pub fn direct_role(board: &Board, profile_id: Uuid) -> Role {
    if board.owner == profile_id {
        return Role::Owner;
    }
    MemberList::PRECEDENCE
        .iter()
        .find(|(list, _)| board.members(*list).contains(&profile_id))
        .map(|(_, role)| *role)
        .unwrap_or(Role::None)
}

/// Effective role of `profile_id` on `chain[0]`.
///
/// `chain` is the target board followed by its ancestors, nearest first. A cached
/// role for the target wins; otherwise the direct role is computed and, when empty,
/// inherited from the parent. Non-empty results are written back under `key`.
///
/// `seen` is the cache generation read before `chain` was loaded. The write-back is
/// dropped when membership was invalidated since then.
pub fn resolve(
    cache: &dyn PermissionCache,
    key: &str,
    seen: u64,
    chain: &[Board],
    profile_id: Uuid,
) -> Result<Role, CacheError> {
    let Some(board) = chain.first() else {
        return Ok(Role::None);
    };

    if let Some(role) = cache.get(key)?.and_then(|p| p.get(&board.id).copied()) {
        debug!("Cached role '{}' for board {} under {}", role, board.id, key);
        return Ok(role);
    }

    let mut role = direct_role(board, profile_id);
    if role == Role::None && chain.len() > 1 {
        role = resolve(cache, key, seen, &chain[1..], profile_id)?;
    }

    if role != Role::None {
        let board_id = board.id;
        let stored = cache.update_if(key, seen, &mut |p| {
            p.insert(board_id, role);
        })?;
        if stored.is_none() {
            debug!("Skipped stale role '{}' for board {} under {}", role, board_id, key);
        }
    }

    Ok(role)
}

/// Load `board_id` and its ancestors, nearest first. Returns an empty chain when the
/// board does not exist. Stops at a missing parent or a repeated board id.
pub fn load_chain(store: &dyn RoleStore, board_id: Uuid) -> Result<Vec<Board>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(board_id);

    while let Some(id) = next {
        if !seen.insert(id) {
            warn!("Board parent cycle detected at {}", id);
            break;
        }
        let Some(board) = store.load_board(id)? else {
            break;
        };
        next = board.parent_id;
        chain.push(board);
    }

    Ok(chain)
}

/// Every board below `board_id`, breadth first. Used to drop inherited cache entries.
pub fn descendant_ids(store: &dyn RoleStore, board_id: Uuid) -> Result<Vec<Uuid>> {
    let mut seen = HashSet::from([board_id]);
    let mut queue = vec![board_id];
    let mut out = Vec::new();

    while let Some(id) = queue.pop() {
        for child in store.child_board_ids(id)? {
            if seen.insert(child) {
                out.push(child);
                queue.push(child);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryPermissionCache, permission_key};
    use crate::testing::{MemoryStore, board};

    #[test]
    fn precedence_is_first_match() {
        let p = Uuid::new_v4();
        let mut b = board(Uuid::new_v4());
        b.blocked.push(p);
        b.viewers.push(p);
        b.authors.push(p);
        assert_eq!(direct_role(&b, p), Role::Author);

        b.owner = p;
        assert_eq!(direct_role(&b, p), Role::Owner);

        assert_eq!(direct_role(&b, Uuid::new_v4()), Role::None);
    }

    #[test]
    fn followers_confer_no_role() {
        let p = Uuid::new_v4();
        let mut b = board(Uuid::new_v4());
        b.followers.push(p);
        assert_eq!(direct_role(&b, p), Role::None);
    }

    #[test]
    fn role_is_inherited_through_ancestors() {
        let p = Uuid::new_v4();
        let mut root = board(Uuid::new_v4());
        root.subscribers.push(p);
        let mut mid = board(Uuid::new_v4());
        mid.parent_id = Some(root.id);
        let mut leaf = board(Uuid::new_v4());
        leaf.parent_id = Some(mid.id);

        let cache = MemoryPermissionCache::new(None);
        let key = permission_key(p);
        let chain = vec![leaf.clone(), mid.clone(), root.clone()];

        assert_eq!(resolve(&cache, &key, 0, &chain, p).unwrap(), Role::Subscriber);

        let cached = cache.get(&key).unwrap().unwrap();
        assert_eq!(cached.get(&leaf.id), Some(&Role::Subscriber));
        assert_eq!(cached.get(&mid.id), Some(&Role::Subscriber));
        assert_eq!(cached.get(&root.id), Some(&Role::Subscriber));
    }

    #[test]
    fn direct_role_shadows_parent() {
        let p = Uuid::new_v4();
        let mut parent = board(Uuid::new_v4());
        parent.admins.push(p);
        let mut child = board(Uuid::new_v4());
        child.parent_id = Some(parent.id);
        child.blocked.push(p);

        let cache = MemoryPermissionCache::new(None);
        let role = resolve(&cache, &permission_key(p), 0, &[child, parent], p).unwrap();
        assert_eq!(role, Role::Blocked);
    }

    #[test]
    fn cached_role_is_returned_without_recomputation() {
        let p = Uuid::new_v4();
        let b = board(Uuid::new_v4());
        let cache = MemoryPermissionCache::new(None);
        let key = permission_key(p);
        cache
            .update(&key, &mut |m| {
                m.insert(b.id, Role::Admin);
            })
            .unwrap();

        // The board itself grants nothing; only the cache can answer admin.
        assert_eq!(resolve(&cache, &key, 0, &[b], p).unwrap(), Role::Admin);
    }

    #[test]
    fn absence_is_not_cached() {
        let p = Uuid::new_v4();
        let cache = MemoryPermissionCache::new(None);
        let key = permission_key(p);
        let role = resolve(&cache, &key, 0, &[board(Uuid::new_v4())], p).unwrap();

        assert_eq!(role, Role::None);
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn role_change_during_resolution_is_not_cached() {
        let store = MemoryStore::default();
        let p = Uuid::new_v4();
        let mut b = board(Uuid::new_v4());
        b.admins.push(p);
        let id = b.id;
        store.add_board(b);
        let cache = MemoryPermissionCache::new(None);
        let key = permission_key(p);

        let seen = cache.generation(&key).unwrap();
        let stale_chain = load_chain(&store, id).unwrap();

        store
            .set_member_list(id, p, Some(MemberList::Blocked))
            .unwrap();
        cache.forget(&key, &[id]).unwrap();

        // The in-flight lookup still answers from what it read...
        assert_eq!(resolve(&cache, &key, seen, &stale_chain, p).unwrap(), Role::Admin);
        // ...but leaves nothing behind for the next one.
        assert!(cache.get(&key).unwrap().is_none());

        let seen = cache.generation(&key).unwrap();
        let chain = load_chain(&store, id).unwrap();
        assert_eq!(resolve(&cache, &key, seen, &chain, p).unwrap(), Role::Blocked);
        assert_eq!(cache.get(&key).unwrap().unwrap().get(&id), Some(&Role::Blocked));
    }

    #[test]
    fn cache_decode_failure_propagates() {
        let p = Uuid::new_v4();
        let cache = MemoryPermissionCache::new(None);
        let key = permission_key(p);
        cache.put_raw(&key, "[]");

        assert!(resolve(&cache, &key, 0, &[board(Uuid::new_v4())], p).is_err());
    }

    #[test]
    fn chain_loading_stops_at_cycles() {
        let store = MemoryStore::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut ba = board(Uuid::new_v4());
        ba.id = a;
        ba.parent_id = Some(b);
        let mut bb = board(Uuid::new_v4());
        bb.id = b;
        bb.parent_id = Some(a);
        store.add_board(ba);
        store.add_board(bb);

        let chain = load_chain(&store, a).unwrap();
        assert_eq!(chain.iter().map(|b| b.id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn descendants_are_collected_transitively() {
        let store = MemoryStore::default();
        let root = board(Uuid::new_v4());
        let mut child = board(Uuid::new_v4());
        child.parent_id = Some(root.id);
        let mut grandchild = board(Uuid::new_v4());
        grandchild.parent_id = Some(child.id);
        let (root_id, child_id, grandchild_id) = (root.id, child.id, grandchild.id);
        store.add_board(root);
        store.add_board(child);
        store.add_board(grandchild);

        let mut ids = descendant_ids(&store, root_id).unwrap();
        ids.sort();
        let mut expected = vec![child_id, grandchild_id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
