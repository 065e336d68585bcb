//! Session + role schema for `/api/me` and permission checks

use serde::{Serialize, Deserialize};
use num_derive::FromPrimitive;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type ServerId = String;

/// A permission level on one server
/// In general:
/// - **guest:** Not logged in, read only
/// - **user:** Logged in, read only
/// - **editor:** Report resources, edit stats, planets and status
/// - **admin:** Retire resources, read the command log
/// - **superadmin:** Global override, every server
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, FromPrimitive)]
#[serde(rename_all = "UPPERCASE", from = "RoleRepr")]
#[repr(i32)]
pub enum Role {
    Guest = 0,
    User = 1,
    Editor = 2,
    Admin = 3,
    SuperAdmin = 100
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Guest, Role::User, Role::Editor, Role::Admin, Role::SuperAdmin];

    /// Numeric power level, matches the server's role hierarchy
    pub fn power_level(self) -> i64 {
        self as i64
    }

    pub fn from_power_level(level: i64) -> Option<Role> {
        <Role as num_traits::FromPrimitive>::from_i64(level)
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::User => "USER",
            Role::Editor => "EDITOR",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPERADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL.iter()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown role `{}`", s))
    }
}

// Server payloads carry role names, but older rows carry power levels
#[derive(Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Name(String),
    Level(i64)
}

impl From<RoleRepr> for Role {
    fn from(repr: RoleRepr) -> Self {
        match repr {
            RoleRepr::Name(name) => name.parse().unwrap_or_else(|_| {
                log::warn!("Unknown role `{}` in payload, treating as GUEST", name);
                Role::Guest
            }),
            RoleRepr::Level(level) => Role::from_power_level(level).unwrap_or(Role::Guest)
        }
    }
}

/// Payload of `GET /api/me`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MePayload {
    pub authenticated: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_superadmin: bool,
    #[serde(default)]
    pub server_perms: HashMap<ServerId, Role>
}

impl MePayload {
    /// None when the viewer is not logged in
    pub fn into_session(self) -> Option<Session> {
        if !self.authenticated {
            return None;
        }
        Some(Session {
            id: self.id.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            avatar: self.avatar,
            global_role: if self.is_superadmin { Role::SuperAdmin } else { Role::User },
            server_perms: self.server_perms
        })
    }
}

/// A logged in viewer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub global_role: Role,
    pub server_perms: HashMap<ServerId, Role>
}

impl Session {
    pub fn is_global_superadmin(&self) -> bool {
        self.global_role == Role::SuperAdmin
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_ref().map(|a| format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, a))
    }
}
