use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use pinboard_types::api::GateData;
use pinboard_types::models::{Board, Role, Visibility};
use rand_core::OsRng;

/// Why the gate refused a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoAccess,
    InvalidPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Allowed,
    RequirePassword,
    Denied(Denial),
}

impl GateOutcome {
    /// Envelope status: a password prompt still counts as success.
    pub fn status(&self) -> u8 {
        match self {
            Self::Allowed | Self::RequirePassword => 1,
            Self::Denied(_) => 0,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Allowed => "",
            Self::RequirePassword => "Please enter the password",
            Self::Denied(Denial::NoAccess) => "User does not have the access",
            Self::Denied(Denial::InvalidPassword) => "Invalid password",
        }
    }
}

/// Per-request access state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessContext {
    pub role: Role,
    pub is_password_protected: bool,
    pub is_password_validated: bool,
    pub is_client_accessible: bool,
    pub outcome: GateOutcome,
}

impl AccessContext {
    pub fn is_allowed(&self) -> bool {
        self.outcome == GateOutcome::Allowed
    }

    pub fn gate_data(&self, board: &Board, is_board_follower: bool) -> GateData {
        GateData {
            id: board.id,
            owner: board.owner,
            title: board.title.clone(),
            is_password: self.is_password_protected,
            is_password_validate: self.is_password_validated,
            is_client_accessible: self.is_client_accessible,
            is_board_follower,
        }
    }
}

/// Decide whether a caller holding `role` may see `board`.
///
/// `supplied` is the password from the request body, if one was sent.
pub fn evaluate(board: &Board, role: Role, supplied: Option<&str>) -> AccessContext {
    let protected = board.is_password_protected();

    let refused = match board.visibility {
        Visibility::Private => !role.has_standing(),
        Visibility::Public => role == Role::Blocked,
    };
    if refused {
        return AccessContext {
            role,
            is_password_protected: false,
            is_password_validated: false,
            is_client_accessible: false,
            outcome: GateOutcome::Denied(Denial::NoAccess),
        };
    }

    let (validated, outcome) = match (board.password.as_deref(), supplied) {
        (Some(stored), Some(given)) if protected => {
            if verify_password(stored, given) {
                (true, GateOutcome::Allowed)
            } else {
                (false, GateOutcome::Denied(Denial::InvalidPassword))
            }
        }
        _ if protected => (false, GateOutcome::RequirePassword),
        _ => (true, GateOutcome::Allowed),
    };

    AccessContext {
        role,
        is_password_protected: protected,
        is_password_validated: validated,
        is_client_accessible: true,
        outcome,
    }
}

/// Argon2 PHC strings are verified; anything else is a legacy plaintext value
/// compared verbatim.
pub fn verify_password(stored: &str, supplied: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(supplied.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => stored == supplied,
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))
}
