use std::sync::Arc;
use std::time::Duration;

use pinboard_types::api::GateData;
use pinboard_types::models::{Board, Role};
use tracing::debug;
use uuid::Uuid;

use crate::cache::{PermissionCache, permission_key};
use crate::collab::{BookmarkLookup, ContentSource, MediaStore, Notifier, ProfileDirectory, RoleStore};
use crate::enrich::Enricher;
use crate::error::CoreError;
use crate::gate::{self, AccessContext, GateOutcome};
use crate::resolver;

/// Everything the engine talks to, shareable across blocking tasks.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentSource>,
    pub roles: Arc<dyn RoleStore>,
    pub bookmarks: Arc<dyn BookmarkLookup>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub media: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn Notifier>,
    pub cache: Arc<dyn PermissionCache>,
}

impl Collaborators {
    pub fn enricher(&self, profile_id: Uuid) -> Enricher<'_> {
        Enricher::new(&*self.bookmarks, &*self.media, &*self.profiles, profile_id)
    }
}

/// Result of a gated read: the payload, or the gate flags explaining the refusal.
#[derive(Debug)]
pub enum Gated<T> {
    Allowed(T),
    Refused { outcome: GateOutcome, gate: GateData },
}

/// A board with its ancestors (nearest first) and the caller's access to it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub chain: Vec<Board>,
    pub access: AccessContext,
    /// Cache generation read before `chain` was loaded.
    pub(crate) generation: u64,
}

impl Resolved {
    pub fn board(&self) -> &Board {
        &self.chain[0]
    }

    pub fn role(&self) -> Role {
        self.access.role
    }
}

/// Board access resolution and content aggregation.
pub struct Engine {
    pub(crate) deps: Collaborators,
    pub(crate) aggregate_timeout: Duration,
}

impl Engine {
    pub fn new(deps: Collaborators, aggregate_timeout: Duration) -> Self {
        Self {
            deps,
            aggregate_timeout,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.deps
    }

    /// Run store-bound work on the blocking pool.
    pub(crate) async fn blocking<T, F>(f: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| CoreError::Store(anyhow::anyhow!("blocking task failed: {}", e)))?
    }

    /// Load the board chain and resolve the caller's role on the target.
    pub async fn resolve_role(&self, board_id: Uuid, profile_id: Uuid) -> Result<(Board, Role), CoreError> {
        let deps = self.deps.clone();
        Self::blocking(move || {
            let (mut chain, role, _) = resolve_chain(&deps, board_id, profile_id)?;
            Ok((chain.swap_remove(0), role))
        })
        .await
    }

    /// Resolve the caller's role and run the visibility gate.
    pub async fn access(
        &self,
        board_id: Uuid,
        profile_id: Uuid,
        password: Option<String>,
    ) -> Result<Resolved, CoreError> {
        let deps = self.deps.clone();
        let resolved = Self::blocking(move || {
            let (chain, role, generation) = resolve_chain(&deps, board_id, profile_id)?;
            let access = gate::evaluate(&chain[0], role, password.as_deref());
            Ok(Resolved {
                chain,
                access,
                generation,
            })
        })
        .await?;

        debug!(
            "Gate for board {} profile {}: role '{}' -> {:?}",
            board_id,
            profile_id,
            resolved.role(),
            resolved.access.outcome
        );
        Ok(resolved)
    }

    /// Caller must hold one of `allowed` on the board.
    pub async fn require_role(
        &self,
        board_id: Uuid,
        profile_id: Uuid,
        allowed: &[Role],
    ) -> Result<(Board, Role), CoreError> {
        let (board, role) = self.resolve_role(board_id, profile_id).await?;
        if allowed.contains(&role) {
            Ok((board, role))
        } else {
            Err(CoreError::AccessDenied)
        }
    }
}

/// Load the chain and resolve against it. The cache generation is read first so a
/// membership change landing while the chain is read cannot be cached over.
fn resolve_chain(
    deps: &Collaborators,
    board_id: Uuid,
    profile_id: Uuid,
) -> Result<(Vec<Board>, Role, u64), CoreError> {
    let key = permission_key(profile_id);
    let generation = deps.cache.generation(&key)?;
    let chain = resolver::load_chain(&*deps.roles, board_id)?;
    if chain.is_empty() {
        return Err(CoreError::NotFound("board"));
    }
    let role = resolver::resolve(&*deps.cache, &key, generation, &chain, profile_id)?;
    Ok((chain, role, generation))
}
