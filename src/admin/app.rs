use crate::admin::types::{CommandLogPage, CommandLogQuery, ManagedUser, RoleChange};
use crate::app::tracker::Tracker;
use crate::auth::permission;
use crate::mutation::gateway::{MutationAction, MutationKey};
use crate::mutation::transaction::Transaction;
use crate::shared::error::{Error, FieldError, Result};
use crate::shared::types::account::Role;
use crate::shared::types::app::{require_role, WriteResponse};
use crate::shared::util::handler::TrackerApi;

impl<H: TrackerApi> Tracker<H> {
    /// Reloads the permission manager's user list for the current server
    pub async fn fetch_managed_users(&self) -> Result<Vec<ManagedUser>> {
        let role = self.effective_role();
        require_role!(role, Role::Editor);

        let server_id = self.server_id();
        let users = match self.api.fetch_managed_users(&server_id).await {
            Ok(users) => users,
            Err(err) => {
                self.handle_denied(&err).await;
                return Err(err);
            }
        };
        // A switch while loading makes this list stale
        if self.server_id() == server_id {
            *self.managed_users.lock() = users.clone();
        }
        Ok(users)
    }

    pub fn managed_users(&self) -> Vec<ManagedUser> {
        self.managed_users.lock().clone()
    }

    /// Case-insensitive username match over the loaded list
    pub fn filter_managed_users(&self, term: &str) -> Vec<ManagedUser> {
        let term = term.trim().to_lowercase();
        self.managed_users.lock().iter()
            .filter(|u| u.username.to_lowercase().contains(&term))
            .cloned()
            .collect()
    }

    /// Roles the viewer may assign on the current server
    pub fn assignable_roles(&self) -> Vec<Role> {
        permission::assignable_roles(self.effective_role())
    }

    /// Assign `role` to a user, shown in the user list right away
    pub async fn set_role(&self, user_id: &str, role: Role) -> Result<WriteResponse> {
        let actor = self.effective_role();
        require_role!(actor, Role::Editor);
        if !permission::assignable_roles(actor).contains(&role) {
            return Err(Error::Validation(vec![FieldError::new("role",
                format!("A {} cannot assign {}", actor, role))]));
        }
        let _guard = self.gateway.acquire(MutationKey::user(MutationAction::SetRole, user_id))?;

        let server_id = self.server_id();
        let previous = {
            let mut users = self.managed_users.lock();
            users.iter_mut().find(|u| u.id == user_id).map(|u| std::mem::replace(&mut u.role, role))
        };
        let tx = match previous {
            Some(previous) => {
                let users = self.managed_users.clone();
                let target = user_id.to_string();
                Transaction::pending(format!("set role of `{}`", user_id), move || {
                    if let Some(user) = users.lock().iter_mut().find(|u| u.id == target) {
                        user.role = previous;
                    }
                })
            }
            None => Transaction::without_undo(format!("set role of `{}`", user_id))
        };

        let change = RoleChange { target_user_id: user_id.to_string(), role, server_id };
        match self.api.set_role(&change).await {
            Ok(response) => {
                tx.commit();
                log::info!("Set role of `{}` to {} on `{}`", user_id, role, change.server_id);
                Ok(response)
            }
            Err(err) => {
                tx.rollback();
                log::warn!("Setting role of `{}` failed: {}", user_id, err);
                self.handle_denied(&err).await;
                Err(err)
            }
        }
    }

    pub async fn fetch_command_log(&self, query: &CommandLogQuery) -> Result<CommandLogPage> {
        let role = self.effective_role();
        require_role!(role, Role::Admin);

        let server_id = self.server_id();
        match self.api.fetch_command_log(&server_id, query).await {
            Ok(page) => Ok(page),
            Err(err) => {
                self.handle_denied(&err).await;
                Err(err)
            }
        }
    }

    /// Asks the backend to reload its own caches
    pub async fn reload_server_cache(&self) -> Result<WriteResponse> {
        let role = self.effective_role();
        require_role!(role, Role::SuperAdmin);

        match self.api.reload_cache().await {
            Ok(response) => {
                log::info!("Backend cache reloaded");
                Ok(response)
            }
            Err(err) => {
                self.handle_denied(&err).await;
                Err(err)
            }
        }
    }
}
