//! An abstraction layer interface for the tracker server
use crate::admin::types::{CommandLogPage, CommandLogQuery, ManagedUser, RoleChange};
use crate::resource::types::{Resource, ResourceId, ResourcePayload, Timestamp};
use crate::shared::error::Result;
use crate::shared::types::account::MePayload;
use crate::shared::types::app::WriteResponse;
use crate::taxonomy::types::TaxonomyNode;

use async_trait::async_trait;

#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// `GET /api/taxonomy`
    async fn fetch_taxonomy(&self) -> Result<Vec<TaxonomyNode>>;

    /// `GET /api/resource_log`, `since = 0` asks for the full set
    async fn fetch_resources(&self, server_id: &str, since: Timestamp) -> Result<Vec<Resource>>;

    /// `GET /api/me`
    async fn fetch_session(&self) -> Result<MePayload>;

    async fn add_resource(&self, payload: &ResourcePayload) -> Result<WriteResponse>;
    async fn update_resource(&self, payload: &ResourcePayload) -> Result<WriteResponse>;
    async fn retire_resource(&self, server_id: &str, id: ResourceId) -> Result<WriteResponse>;

    async fn set_role(&self, change: &RoleChange) -> Result<WriteResponse>;

    // Admin
    async fn fetch_managed_users(&self, server_id: &str) -> Result<Vec<ManagedUser>>;
    async fn fetch_command_log(&self, server_id: &str, query: &CommandLogQuery) -> Result<CommandLogPage>;
    async fn reload_cache(&self) -> Result<WriteResponse>;
}
