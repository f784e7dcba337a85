use chrono::Utc;
use pinboard_types::api::{
    CreateBoardRequest, InvitationAction, InvitationView, UpdateBoardRequest,
};
use pinboard_types::events::{ActionType, Notification};
use pinboard_types::models::{
    Board, BoardInvite, ConciseProfile, ItemState, MemberList, Role, ThingKind,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::permission_key;
use crate::engine::{Collaborators, Engine};
use crate::error::CoreError;
use crate::gate::{self, Denial, GateOutcome};
use crate::resolver::{self, direct_role};

/// Roles that may change board settings and membership.
pub const MANAGERS: [Role; 2] = [Role::Owner, Role::Admin];
/// Roles that may add content or sub-boards.
pub const CONTRIBUTORS: [Role; 3] = [Role::Owner, Role::Admin, Role::Author];

/// Whether `invite_member` recorded a new invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteOutcome {
    Sent,
    AlreadyPending,
}

#[derive(Debug)]
pub enum InvitationAnswer {
    Accepted { board: Board, sender_id: Uuid },
    /// `sender_id` is `None` when there was nothing to decline.
    Declined { sender_id: Option<Uuid> },
}

/// Roles that can be granted through an invitation or role change.
fn grantable(role: Role) -> Result<MemberList, CoreError> {
    match role {
        Role::Admin | Role::Author | Role::Viewer | Role::Subscriber | Role::Guest => {
            role.member_list().ok_or_else(|| CoreError::validation("role has no member list"))
        }
        other => Err(CoreError::validation(format!(
            "role '{}' cannot be granted",
            other
        ))),
    }
}

/// Admins manage everyone below them; only the owner touches admins.
fn may_manage(actor: Role, target: Role) -> bool {
    match actor {
        Role::Owner => true,
        Role::Admin => target != Role::Admin && target != Role::Owner,
        _ => false,
    }
}

fn display_name(profile: Option<&ConciseProfile>) -> String {
    match profile {
        Some(p) => {
            let full = format!("{} {}", p.first_name, p.last_name);
            let full = full.trim();
            if !full.is_empty() {
                full.to_string()
            } else if !p.screen_name.is_empty() {
                p.screen_name.clone()
            } else {
                "Someone".to_string()
            }
        }
        None => "Someone".to_string(),
    }
}

/// Drop cached roles of `profiles` for the board and every board below it.
fn invalidate(deps: &Collaborators, board_id: Uuid, profiles: &[Uuid]) -> Result<(), CoreError> {
    let mut ids = resolver::descendant_ids(&*deps.roles, board_id)?;
    ids.push(board_id);

    for profile_id in profiles {
        deps.cache.forget(&permission_key(*profile_id), &ids)?;
    }
    Ok(())
}

fn notify(
    deps: &Collaborators,
    receivers: Vec<Uuid>,
    sender: Uuid,
    action: ActionType,
    board_id: Uuid,
    message: String,
) {
    let receiver_ids: Vec<Uuid> = receivers.into_iter().filter(|r| *r != sender).collect();
    if receiver_ids.is_empty() {
        return;
    }
    deps.notifier.notify(Notification {
        receiver_ids,
        sender_id: sender,
        thing_type: ThingKind::Board,
        action_type: action,
        message,
        thing_id: board_id,
        created_at: Utc::now(),
    });
}

fn reload(deps: &Collaborators, board_id: Uuid) -> Result<Board, CoreError> {
    deps.roles
        .load_board(board_id)?
        .ok_or(CoreError::NotFound("board"))
}

impl Engine {
    /// Create a board owned by `actor`. Sub-boards need a contributing role on the parent.
    pub async fn create_board(
        &self,
        actor: Uuid,
        req: CreateBoardRequest,
    ) -> Result<Board, CoreError> {
        let title = req.title.trim().to_string();
        if title.is_empty() || title.len() > 256 {
            return Err(CoreError::validation("title must be 1-256 characters"));
        }
        if let Some(parent_id) = req.parent_id {
            self.require_role(parent_id, actor, &CONTRIBUTORS).await?;
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            let password = match req.password.as_deref().filter(|p| !p.is_empty()) {
                Some(p) => Some(gate::hash_password(p)?),
                None => None,
            };
            let now = Utc::now();
            let board = Board {
                id: Uuid::new_v4(),
                owner: actor,
                title,
                description: req.description,
                visibility: req.visible,
                state: ItemState::Active,
                password,
                parent_id: req.parent_id,
                admins: vec![],
                authors: vec![],
                viewers: vec![],
                subscribers: vec![],
                guests: vec![],
                blocked: vec![],
                followers: vec![],
                tags: req.tags,
                likes: vec![],
                comments: vec![],
                created_at: now,
                modified_at: now,
            };
            deps.roles.insert_board(&board)?;
            info!("Board {} created by {}", board.id, actor);
            Ok(board)
        })
        .await
    }

    pub async fn update_settings(
        &self,
        board_id: Uuid,
        actor: Uuid,
        req: UpdateBoardRequest,
    ) -> Result<Board, CoreError> {
        let (mut board, _) = self.require_role(board_id, actor, &MANAGERS).await?;

        if let Some(title) = req.title {
            let title = title.trim().to_string();
            if title.is_empty() || title.len() > 256 {
                return Err(CoreError::validation("title must be 1-256 characters"));
            }
            board.title = title;
        }
        if let Some(description) = req.description {
            board.description = description;
        }
        if let Some(visible) = req.visible {
            board.visibility = visible;
        }
        if let Some(tags) = req.tags {
            board.tags = tags;
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            let password_changed = req.password.is_some();
            if let Some(password) = req.password {
                board.password = if password.is_empty() {
                    None
                } else {
                    Some(gate::hash_password(&password)?)
                };
            }
            board.modified_at = Utc::now();
            deps.roles.update_board_settings(&board)?;

            let members = board.all_members();
            invalidate(&deps, board_id, &members)?;

            let message = if password_changed {
                format!("The password of {} was changed.", board.title)
            } else {
                format!("{} settings were updated.", board.title)
            };
            notify(&deps, members, actor, ActionType::BoardSettingsUpdated, board_id, message);
            reload(&deps, board_id)
        })
        .await
    }

    /// Soft delete. Owner only.
    pub async fn delete_board(&self, board_id: Uuid, actor: Uuid) -> Result<(), CoreError> {
        let (board, _) = self.require_role(board_id, actor, &[Role::Owner]).await?;

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.roles.set_board_state(board_id, ItemState::Hidden)?;
            let members = board.all_members();
            invalidate(&deps, board_id, &members)?;
            notify(
                &deps,
                members,
                actor,
                ActionType::BoardDeleted,
                board_id,
                format!("{} was deleted.", board.title),
            );
            info!("Board {} deleted by {}", board_id, actor);
            Ok(())
        })
        .await
    }

    /// Offer `role` to `target`. The role is granted only once the invitee accepts.
    pub async fn invite_member(
        &self,
        board_id: Uuid,
        actor: Uuid,
        target: Uuid,
        role: Role,
    ) -> Result<InviteOutcome, CoreError> {
        grantable(role)?;
        let (board, actor_role) = self.require_role(board_id, actor, &MANAGERS).await?;
        if board.owner == target {
            return Err(CoreError::validation("the owner cannot be given another role"));
        }
        let current = direct_role(&board, target);
        if !may_manage(actor_role, role) || !may_manage(actor_role, current) {
            return Err(CoreError::AccessDenied);
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.profiles
                .concise_profile(target)?
                .ok_or(CoreError::NotFound("profile"))?;
            let invite = BoardInvite {
                id: Uuid::new_v4(),
                board_id,
                sender_id: actor,
                invitee_id: target,
                role,
                created_at: Utc::now(),
            };
            if !deps.roles.insert_invite(&invite)? {
                return Ok(InviteOutcome::AlreadyPending);
            }
            info!("Profile {} invited to board {} as {}", target, board_id, role);
            Ok(InviteOutcome::Sent)
        })
        .await
    }

    /// Accept or decline the invitation `invitee` holds for `board_id`.
    pub async fn answer_invitation(
        &self,
        board_id: Uuid,
        invitee: Uuid,
        action: InvitationAction,
    ) -> Result<InvitationAnswer, CoreError> {
        let deps = self.deps.clone();
        Self::blocking(move || {
            let pending = deps.roles.pending_invite(board_id, invitee)?;
            if action == InvitationAction::Decline {
                deps.roles.delete_invite(board_id, invitee)?;
                return Ok(InvitationAnswer::Declined {
                    sender_id: pending.map(|i| i.sender_id),
                });
            }

            let invite = pending.ok_or(CoreError::NoInvitation)?;
            let Some(board) = deps.roles.load_board(board_id)? else {
                deps.roles.delete_invite(board_id, invitee)?;
                return Err(CoreError::NotFound("board"));
            };
            if board.owner == invitee {
                deps.roles.delete_invite(board_id, invitee)?;
                return Err(CoreError::validation("the owner cannot be given another role"));
            }

            deps.roles.accept_invite(&invite, grantable(invite.role)?)?;
            invalidate(&deps, board_id, &[invitee])?;

            let board = reload(&deps, board_id)?;
            let profile = deps.profiles.concise_profile(invitee).ok().flatten();
            notify(
                &deps,
                board.all_members(),
                invitee,
                ActionType::BoardMemberAdded,
                board_id,
                format!("{} has been added to the board.", display_name(profile.as_ref())),
            );
            info!(
                "Profile {} joined board {} as {}",
                invitee, board_id, invite.role
            );
            Ok(InvitationAnswer::Accepted {
                board,
                sender_id: invite.sender_id,
            })
        })
        .await
    }

    /// Pending invitations for `invitee`, oldest first. Invitations to boards that
    /// are gone are skipped.
    pub async fn invitations(&self, invitee: Uuid) -> Result<Vec<InvitationView>, CoreError> {
        let deps = self.deps.clone();
        Self::blocking(move || {
            let mut views = Vec::new();
            for invite in deps.roles.invites_for(invitee)? {
                let Some(board) = deps.roles.load_board(invite.board_id)? else {
                    warn!("Invitation {} points at missing board {}", invite.id, invite.board_id);
                    continue;
                };
                views.push(InvitationView {
                    board_id: board.id,
                    board_title: board.title,
                    role: invite.role,
                    sender: deps.profiles.concise_profile(invite.sender_id)?,
                    created_at: invite.created_at,
                });
            }
            Ok(views)
        })
        .await
    }

    pub async fn change_member_role(
        &self,
        board_id: Uuid,
        actor: Uuid,
        target: Uuid,
        role: Role,
    ) -> Result<Board, CoreError> {
        let list = grantable(role)?;
        let (board, actor_role) = self.require_role(board_id, actor, &MANAGERS).await?;
        let current = direct_role(&board, target);
        if !current.has_standing() || current == Role::Owner {
            return Err(CoreError::NotFound("member"));
        }
        if !may_manage(actor_role, role) || !may_manage(actor_role, current) {
            return Err(CoreError::AccessDenied);
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.roles.set_member_list(board_id, target, Some(list))?;
            invalidate(&deps, board_id, &[target])?;
            let board = reload(&deps, board_id)?;
            notify(
                &deps,
                vec![target],
                actor,
                ActionType::BoardMemberRoleChanged,
                board_id,
                format!("Your role on {} is now {}.", board.title, role),
            );
            Ok(board)
        })
        .await
    }

    /// Block a profile: drops any role and follow, then lists it as blocked.
    pub async fn block_member(
        &self,
        board_id: Uuid,
        actor: Uuid,
        target: Uuid,
    ) -> Result<Board, CoreError> {
        let (board, actor_role) = self.require_role(board_id, actor, &MANAGERS).await?;
        if target == actor || target == board.owner {
            return Err(CoreError::validation("cannot block this profile"));
        }
        if !may_manage(actor_role, direct_role(&board, target)) {
            return Err(CoreError::AccessDenied);
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.roles.set_member_list(board_id, target, Some(MemberList::Blocked))?;
            deps.roles.set_follower(board_id, target, false)?;
            invalidate(&deps, board_id, &[target])?;
            let board = reload(&deps, board_id)?;
            notify(
                &deps,
                vec![target],
                actor,
                ActionType::BoardMemberBlocked,
                board_id,
                format!("You have been blocked from {}.", board.title),
            );
            info!("Profile {} blocked on board {}", target, board_id);
            Ok(board)
        })
        .await
    }

    pub async fn unblock_member(
        &self,
        board_id: Uuid,
        actor: Uuid,
        target: Uuid,
    ) -> Result<Board, CoreError> {
        let (board, _) = self.require_role(board_id, actor, &MANAGERS).await?;
        if direct_role(&board, target) != Role::Blocked {
            return Err(CoreError::NotFound("blocked member"));
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.roles.set_member_list(board_id, target, None)?;
            invalidate(&deps, board_id, &[target])?;
            let board = reload(&deps, board_id)?;
            notify(
                &deps,
                vec![target],
                actor,
                ActionType::BoardMemberUnblocked,
                board_id,
                format!("You have been unblocked from {}.", board.title),
            );
            Ok(board)
        })
        .await
    }

    /// Remove a member. Members may also remove themselves.
    pub async fn remove_member(
        &self,
        board_id: Uuid,
        actor: Uuid,
        target: Uuid,
    ) -> Result<Board, CoreError> {
        let (board, actor_role) = self.resolve_role(board_id, actor).await?;
        let current = direct_role(&board, target);
        if current == Role::Owner {
            return Err(CoreError::validation("the owner cannot be removed"));
        }
        if current == Role::None {
            return Err(CoreError::NotFound("member"));
        }
        let leaving = target == actor && current != Role::Blocked;
        if !leaving && !may_manage(actor_role, current) {
            return Err(CoreError::AccessDenied);
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.roles.set_member_list(board_id, target, None)?;
            invalidate(&deps, board_id, &[target])?;
            let board = reload(&deps, board_id)?;
            notify(
                &deps,
                vec![target],
                actor,
                ActionType::BoardMemberRemoved,
                board_id,
                format!("You have been removed from {}.", board.title),
            );
            Ok(board)
        })
        .await
    }

    /// Follow a board the caller could open without being refused outright.
    pub async fn follow(&self, board_id: Uuid, actor: Uuid) -> Result<Board, CoreError> {
        let (board, role) = self.resolve_role(board_id, actor).await?;
        if gate::evaluate(&board, role, None).outcome == GateOutcome::Denied(Denial::NoAccess) {
            return Err(CoreError::AccessDenied);
        }
        if board.is_follower(actor) {
            return Ok(board);
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.roles.set_follower(board_id, actor, true)?;
            let follower = deps.profiles.concise_profile(actor).ok().flatten();
            notify(
                &deps,
                vec![board.owner],
                actor,
                ActionType::BoardFollowed,
                board_id,
                format!("{} followed your board.", display_name(follower.as_ref())),
            );
            reload(&deps, board_id)
        })
        .await
    }

    pub async fn unfollow(&self, board_id: Uuid, actor: Uuid) -> Result<Board, CoreError> {
        let (board, _) = self.resolve_role(board_id, actor).await?;
        if !board.is_follower(actor) {
            return Ok(board);
        }

        let deps = self.deps.clone();
        Self::blocking(move || {
            deps.roles.set_follower(board_id, actor, false)?;
            notify(
                &deps,
                vec![board.owner],
                actor,
                ActionType::BoardUnfollowed,
                board_id,
                format!("Someone unfollowed {}.", board.title),
            );
            reload(&deps, board_id)
        })
        .await
    }
}
