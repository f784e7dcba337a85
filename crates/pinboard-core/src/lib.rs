//! Board access resolution and concurrent content aggregation.
//!
//! A request flows through the [`gate`] (role resolution against the permission
//! cache, then the visibility/password decision) and, when allowed, fans out to
//! the content stores through [`fanout::FanOut`] before [`enrich`] attaches
//! per-caller state to every item.

pub mod aggregate;
pub mod cache;
pub mod collab;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod fanout;
pub mod gate;
pub mod membership;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{BoardPermissions, MemoryPermissionCache, PermissionCache, permission_key};
pub use collab::{
    BookmarkLookup, ContentSource, MediaStore, Notifier, Page, ProfileDirectory, RoleStore,
    ThingFilter,
};
pub use engine::{Collaborators, Engine, Gated, Resolved};
pub use error::{CacheError, CoreError};
pub use gate::{AccessContext, Denial, GateOutcome};
pub use membership::{CONTRIBUTORS, InvitationAnswer, InviteOutcome, MANAGERS};
