use crate::shared::types::account::{Role, ServerId};

use serde::{Serialize, Deserialize};
use serde_json::Value;

const PREVIEW_LEN: usize = 50;

/// A user listed in the server's permission manager
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManagedUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: Role
}

impl ManagedUser {
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_ref().map(|a| format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, a))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ManagedUsersResponse {
    #[serde(default)]
    pub users: Vec<ManagedUser>
}

/// Body of `POST /api/set-role`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleChange {
    pub target_user_id: String,
    pub role: Role,
    pub server_id: ServerId
}

/// One audited command
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub id: i64,
    pub timestamp: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    // Discord avatar hash despite the name
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub command: String,
    #[serde(default)]
    pub details: Value
}

impl CommandLogEntry {
    /// One line summary of `details` for the log table
    pub fn preview(&self) -> String {
        if let Some(name) = self.details.get("name").and_then(Value::as_str) {
            return format!("Resource: {}", name);
        }
        if let Some(target) = self.details.get("target_user_id") {
            let target = target.as_str().map(str::to_string).unwrap_or_else(|| target.to_string());
            return format!("Target: {}", target);
        }
        let json = self.details.to_string();
        let excerpt: String = json.chars().take(PREVIEW_LEN).collect();
        format!("{}...", excerpt)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandLogPage {
    #[serde(default)]
    pub logs: Vec<CommandLogEntry>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u64
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLogQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String
}

impl Default for CommandLogQuery {
    fn default() -> Self {
        CommandLogQuery { page: 1, limit: 20, search: String::new() }
    }
}
