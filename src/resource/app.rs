//! Resource writes: report, edit, status and planet toggles, retire.
//!
//! Each write runs the same steps: role check, double-submit guard, local
//! validation, optional optimistic change, server call, then either commit
//! (merge the server's record and re-sync) or rollback.

use crate::app::tracker::Tracker;
use crate::mutation::gateway::{MutationAction, MutationKey};
use crate::mutation::transaction::Transaction;
use crate::resource::types::{Resource, ResourceDraft, ResourceId, ResourcePayload, ALL_PLANETS};
use crate::resource::validation::{self, validate_draft};
use crate::shared::error::{Error, FieldError, Result};
use crate::shared::types::account::Role;
use crate::shared::types::app::{require_role, WriteResponse};
use crate::shared::util::handler::TrackerApi;

impl<H: TrackerApi> Tracker<H> {
    /// Report a new resource. A report carries at most one planet; the rest
    /// are added with [`Tracker::toggle_planet`] once the record exists.
    pub async fn add_resource(&self, draft: &ResourceDraft) -> Result<WriteResponse> {
        let role = self.effective_role();
        require_role!(role, Role::Editor);
        let _guard = self.gateway.acquire(MutationKey::new(MutationAction::Add))?;

        let taxonomy = self.taxonomy();
        let config = validate_draft(draft, &taxonomy)?;
        if draft.planets.len() > 1 {
            return Err(Error::Validation(vec![
                FieldError::new("planet", "Report one planet, add the others from the planet list")]));
        }
        let server_id = self.server_id();
        let payload = ResourcePayload {
            id: None,
            name: Some(draft.name.trim().to_string()),
            resource_type: Some(config.label.clone()),
            resource_class_id: config.class_id,
            stats: draft.stats.clone(),
            is_active: Some(true),
            notes: draft.notes.clone(),
            planet: draft.planets.first()
                .map(|p| config.planet_name(p).unwrap_or(p).to_string()),
            server_id: server_id.clone()
        };

        let tx = Transaction::without_undo(format!("add `{}`", draft.name.trim()));
        let result = self.api.add_resource(&payload).await;
        self.finish_write(tx, &server_id, result).await
    }

    /// Edit name, type, stats and notes of an existing resource. Planets are
    /// not part of an edit; they only change through the toggle.
    pub async fn update_resource(&self, draft: &ResourceDraft) -> Result<WriteResponse> {
        let role = self.effective_role();
        require_role!(role, Role::Editor);
        let id = draft.id
            .ok_or_else(|| Error::Validation(vec![FieldError::new("id", "Only saved resources can be edited")]))?;
        let _guard = self.gateway.acquire(MutationKey::resource(MutationAction::Update, id))?;

        let current = self.resource(id).ok_or(Error::NotFound(id))?;
        let taxonomy = self.taxonomy();
        let config = validate_draft(draft, &taxonomy)?;
        let server_id = self.server_id();

        let mut payload = ResourcePayload::from_resource(&current, &server_id);
        payload.name = Some(draft.name.trim().to_string());
        payload.resource_type = Some(config.label.clone());
        payload.resource_class_id = config.class_id;
        payload.stats = draft.stats.clone();
        payload.notes = draft.notes.clone();

        let tx = Transaction::without_undo(format!("update resource {}", id));
        let result = self.api.update_resource(&payload).await;
        self.finish_write(tx, &server_id, result).await
    }

    /// Flip active / inactive, shown immediately
    pub async fn toggle_status(&self, id: ResourceId) -> Result<WriteResponse> {
        let role = self.effective_role();
        require_role!(role, Role::Editor);
        let _guard = self.gateway.acquire(MutationKey::resource(MutationAction::ToggleStatus, id))?;

        let current = self.resource(id).ok_or(Error::NotFound(id))?;
        let was_active = current.is_active;
        let server_id = self.server_id();

        let mut payload = self.outgoing(&current, &server_id)?;
        payload.is_active = Some(!was_active);

        let tx = self.optimistic(format!("toggle status of {}", id), id,
            move |r| r.is_active = !was_active,
            move |r| r.is_active = was_active)?;
        let result = self.api.update_resource(&payload).await;
        self.finish_write(tx, &server_id, result).await
    }

    /// Add `planet` if unassigned, remove it otherwise. The record goes out
    /// whole with the one planet name; the server applies the same toggle
    /// and recomputes ratings from the stats it receives.
    pub async fn toggle_planet(&self, id: ResourceId, planet: &str) -> Result<WriteResponse> {
        let role = self.effective_role();
        require_role!(role, Role::Editor);
        let _guard = self.gateway.acquire(MutationKey::resource(MutationAction::TogglePlanet, id))?;

        let current = self.resource(id).ok_or(Error::NotFound(id))?;
        let planet = self.toggle_target(&current, planet)?;
        let server_id = self.server_id();

        let mut payload = self.outgoing(&current, &server_id)?;
        payload.planet = Some(planet.clone());
        payload.is_active = None;

        let before = current.planets.clone();
        let toggled = planet.clone();
        let tx = self.optimistic(format!("toggle {} on {}", planet, id), id,
            move |r| r.toggle_planet(&toggled),
            move |r| r.planets = before)?;
        let result = self.api.update_resource(&payload).await;
        self.finish_write(tx, &server_id, result).await
    }

    /// Soft delete: the record stays, flagged inactive. Only the id is sent.
    pub async fn retire_resource(&self, id: ResourceId) -> Result<WriteResponse> {
        let role = self.effective_role();
        require_role!(role, Role::Admin);
        let _guard = self.gateway.acquire(MutationKey::resource(MutationAction::Retire, id))?;

        let current = self.resource(id).ok_or(Error::NotFound(id))?;
        let was_active = current.is_active;
        let server_id = self.server_id();

        let tx = self.optimistic(format!("retire {}", id), id,
            |r| r.is_active = false,
            move |r| r.is_active = was_active)?;
        let result = self.api.retire_resource(&server_id, id).await;
        self.finish_write(tx, &server_id, result).await
    }

    /// Draft for editing a cached resource
    pub fn draft_for(&self, id: ResourceId) -> Option<ResourceDraft> {
        self.resource(id).map(|r| ResourceDraft::from_resource(&r))
    }

    /// Switch a draft's type under the current taxonomy
    pub fn change_draft_type(&self, draft: &mut ResourceDraft, label: &str) {
        validation::change_type(draft, label, &self.taxonomy());
    }

    /// Planets that can still be added to a cached resource
    pub fn addable_planets(&self, id: ResourceId) -> Vec<String> {
        match self.resource(id) {
            Some(resource) => self.taxonomy().addable_planets(&resource),
            None => Vec::new()
        }
    }

    /// Canonical name of the planet being toggled. Removing an assigned
    /// planet is always allowed; adding needs the type to permit it.
    fn toggle_target(&self, resource: &Resource, planet: &str) -> Result<String> {
        if let Some(assigned) = resource.planets.iter().find(|p| p.eq_ignore_ascii_case(planet.trim())) {
            return Ok(assigned.clone());
        }
        let taxonomy = self.taxonomy();
        let canonical = match taxonomy.config_for(&resource.resource_type) {
            Some(config) => config.planet_name(planet.trim()).map(str::to_string),
            None => ALL_PLANETS.iter().find(|p| p.eq_ignore_ascii_case(planet.trim())).map(|p| p.to_string())
        };
        canonical.ok_or_else(|| Error::Validation(vec![FieldError::new("planet",
            format!("{} does not spawn on {}", resource.resource_type, planet.trim()))]))
    }

    /// The cached record as a toggle payload. Its stats are re-checked
    /// before they are sent back.
    fn outgoing(&self, current: &Resource, server_id: &str) -> Result<ResourcePayload> {
        let taxonomy = self.taxonomy();
        let config = taxonomy.config_for(&current.resource_type);
        let errors = validation::validate_stats(&current.stats, config);
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let mut payload = ResourcePayload::from_resource(current, server_id);
        payload.resource_class_id = payload.resource_class_id.or_else(|| config.and_then(|c| c.class_id));
        Ok(payload)
    }

    /// Applies `apply` to the cached record now and returns a pending
    /// transaction whose rollback applies `undo`, as long as the cache is
    /// still the one the change was made against
    fn optimistic<F, U>(&self, label: String, id: ResourceId, apply: F, undo: U) -> Result<Transaction>
            where F: FnOnce(&mut Resource),
                  U: FnOnce(&mut Resource) + Send + 'static {
        let stamp = {
            let mut sync = self.sync.lock();
            let stamp = sync.stamp();
            sync.modify(id, apply).ok_or(Error::NotFound(id))?;
            stamp
        };
        self.notify_changed();

        let sync = self.sync.clone();
        Ok(Transaction::pending(label, move || {
            if !sync.lock().modify_if_current(&stamp, id, undo) {
                log::debug!("Skipping rollback of resource {}, cache has moved on", id);
            }
        }))
    }

    /// Commit: merge the server's record, then reconcile with a delta load.
    /// Failure: undo the optimistic change before anything else.
    async fn finish_write(&self, tx: Transaction, server_id: &str, result: Result<WriteResponse>) -> Result<WriteResponse> {
        let label = tx.label().to_string();
        match result {
            Ok(response) => {
                tx.commit();
                if let Some(resource) = response.resource.clone() {
                    self.sync.lock().commit_resource(server_id, resource);
                }
                self.notify_changed();
                log::info!("{} succeeded", label);

                if let Err(err) = self.delta_load().await {
                    log::warn!("Re-sync after {} failed: {}", label, err);
                }
                Ok(response)
            }
            Err(err) => {
                tx.rollback();
                self.notify_changed();
                log::warn!("{} failed: {}", label, err);
                self.handle_denied(&err).await;
                Err(err)
            }
        }
    }
}
