use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use pinboard_types::models::Role;
use uuid::Uuid;

use crate::error::CacheError;

/// A profile's resolved roles, keyed by board id. Encoded as JSON `{boardID: role}`.
pub type BoardPermissions = HashMap<Uuid, Role>;

/// Cache key holding every board role resolved for a profile.
pub fn permission_key(profile_id: Uuid) -> String {
    format!("boards:{}", profile_id)
}

/// Process-wide permission cache shared by every request.
///
/// `update` applies a read-modify-write under the cache's own lock so two
/// concurrent resolutions for the same profile never drop each other's entries.
///
/// Every key carries a generation that `invalidate` and `forget` bump. A resolver
/// reads it before loading board state and writes back through `update_if`, so a
/// role computed from membership that changed mid-flight is never stored.
pub trait PermissionCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<BoardPermissions>, CacheError>;

    fn put(&self, key: &str, permissions: &BoardPermissions) -> Result<(), CacheError>;

    /// Drop the whole entry and bump the generation.
    fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Drop the roles of `boards` from the entry and bump the generation.
    fn forget(&self, key: &str, boards: &[Uuid]) -> Result<(), CacheError>;

    fn generation(&self, key: &str) -> Result<u64, CacheError>;

    /// Apply `f` to the entry for `key` (created empty if absent) and store the result.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(&mut BoardPermissions),
    ) -> Result<BoardPermissions, CacheError>;

    /// `update`, but only while the generation still equals `seen`.
    /// Returns `None` when the entry was invalidated in between.
    fn update_if(
        &self,
        key: &str,
        seen: u64,
        f: &mut dyn FnMut(&mut BoardPermissions),
    ) -> Result<Option<BoardPermissions>, CacheError>;
}

struct Entry {
    json: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct Slots {
    entries: HashMap<String, Entry>,
    generations: HashMap<String, u64>,
}

impl Slots {
    fn generation(&self, key: &str) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &str) {
        *self.generations.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// In-process cache storing each entry as its JSON encoding.
pub struct MemoryPermissionCache {
    slots: Mutex<Slots>,
    ttl: Option<Duration>,
}

impl MemoryPermissionCache {
    /// `ttl` of `None` keeps entries until they are invalidated.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            ttl,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Slots>, CacheError> {
        self.slots
            .lock()
            .map_err(|e| CacheError::Backend(format!("cache lock poisoned: {}", e)))
    }

    fn live<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
        entries
            .get(key)
            .filter(|e| e.expires_at.is_none_or(|at| Instant::now() < at))
    }

    fn decode(key: &str, json: &str) -> Result<BoardPermissions, CacheError> {
        serde_json::from_str(json).map_err(|source| CacheError::Decode {
            key: key.to_string(),
            source,
        })
    }

    fn encode(&self, key: &str, permissions: &BoardPermissions) -> Result<Entry, CacheError> {
        let json = serde_json::to_string(permissions).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        Ok(Entry {
            json,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        })
    }

    fn apply(
        &self,
        slots: &mut Slots,
        key: &str,
        f: &mut dyn FnMut(&mut BoardPermissions),
    ) -> Result<BoardPermissions, CacheError> {
        let mut permissions = match Self::live(&slots.entries, key) {
            Some(entry) => Self::decode(key, &entry.json)?,
            None => BoardPermissions::new(),
        };
        f(&mut permissions);
        let entry = self.encode(key, &permissions)?;
        slots.entries.insert(key.to_string(), entry);
        Ok(permissions)
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &str, json: &str) {
        if let Ok(mut slots) = self.lock() {
            slots.entries.insert(
                key.to_string(),
                Entry {
                    json: json.to_string(),
                    expires_at: None,
                },
            );
        }
    }
}

impl PermissionCache for MemoryPermissionCache {
    fn get(&self, key: &str) -> Result<Option<BoardPermissions>, CacheError> {
        let slots = self.lock()?;
        match Self::live(&slots.entries, key) {
            Some(entry) => Self::decode(key, &entry.json).map(Some),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, permissions: &BoardPermissions) -> Result<(), CacheError> {
        let entry = self.encode(key, permissions)?;
        self.lock()?.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut slots = self.lock()?;
        slots.entries.remove(key);
        slots.bump(key);
        Ok(())
    }

    fn forget(&self, key: &str, boards: &[Uuid]) -> Result<(), CacheError> {
        let mut slots = self.lock()?;
        slots.bump(key);
        if Self::live(&slots.entries, key).is_none() {
            return Ok(());
        }
        self.apply(&mut slots, key, &mut |perms| {
            for id in boards {
                perms.remove(id);
            }
        })?;
        Ok(())
    }

    fn generation(&self, key: &str) -> Result<u64, CacheError> {
        Ok(self.lock()?.generation(key))
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(&mut BoardPermissions),
    ) -> Result<BoardPermissions, CacheError> {
        let mut slots = self.lock()?;
        self.apply(&mut slots, key, f)
    }

    fn update_if(
        &self,
        key: &str,
        seen: u64,
        f: &mut dyn FnMut(&mut BoardPermissions),
    ) -> Result<Option<BoardPermissions>, CacheError> {
        let mut slots = self.lock()?;
        if slots.generation(key) != seen {
            return Ok(None);
        }
        self.apply(&mut slots, key, f).map(Some)
    }
}
