//! Effective role resolution for the current server context

use crate::shared::types::account::{Role, Session};

/// Minimum level an action needs, by role or raw power level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Role(Role),
    Level(i64)
}

impl Requirement {
    pub fn power_level(self) -> i64 {
        match self {
            Requirement::Role(role) => role.power_level(),
            Requirement::Level(level) => level
        }
    }
}

impl From<Role> for Requirement {
    fn from(role: Role) -> Self { Requirement::Role(role) }
}

impl From<i64> for Requirement {
    fn from(level: i64) -> Self { Requirement::Level(level) }
}

impl From<i32> for Requirement {
    fn from(level: i32) -> Self { Requirement::Level(level as i64) }
}

// Unknown role names require the highest level
impl From<&str> for Requirement {
    fn from(name: &str) -> Self {
        match name.parse::<Role>() {
            Ok(role) => Requirement::Role(role),
            Err(_) => Requirement::Role(Role::SuperAdmin)
        }
    }
}

/// Resolves the single role a session holds on `server_id`.
///
/// Superadmin overrides everything; an explicit server role comes next; a
/// logged in user without one is a plain USER. Must be evaluated against the
/// current server context on every check, never cached across switches.
pub fn effective_role(session: Option<&Session>, server_id: &str) -> Role {
    let session = match session {
        Some(s) => s,
        None => return Role::Guest
    };
    if session.is_global_superadmin() {
        return Role::SuperAdmin;
    }
    session.server_perms.get(server_id).copied().unwrap_or(Role::User)
}

pub fn has_permission(role: Role, required: impl Into<Requirement>) -> bool {
    role.power_level() >= required.into().power_level()
}

/// Roles `actor` may hand out: above GUEST, strictly below its own
pub fn assignable_roles(actor: Role) -> Vec<Role> {
    Role::ALL.iter()
        .copied()
        .filter(|r| *r > Role::Guest && *r < actor)
        .collect()
}
