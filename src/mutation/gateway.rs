//! Double-submit guard for write actions

use crate::resource::types::ResourceId;
use crate::shared::error::{Error, Result};

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationAction {
    Add,
    Update,
    Retire,
    ToggleStatus,
    TogglePlanet,
    SetRole
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MutationTarget {
    None,
    Resource(ResourceId),
    User(String)
}

/// One logical control, e.g. the status toggle of resource 12
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MutationKey {
    pub action: MutationAction,
    pub target: MutationTarget
}

impl MutationKey {
    pub fn new(action: MutationAction) -> MutationKey {
        MutationKey { action, target: MutationTarget::None }
    }

    pub fn resource(action: MutationAction, id: ResourceId) -> MutationKey {
        MutationKey { action, target: MutationTarget::Resource(id) }
    }

    pub fn user(action: MutationAction, user_id: &str) -> MutationKey {
        MutationKey { action, target: MutationTarget::User(user_id.to_string()) }
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.target {
            MutationTarget::None => write!(f, "{:?}", self.action),
            MutationTarget::Resource(id) => write!(f, "{:?} of resource {}", self.action, id),
            MutationTarget::User(id) => write!(f, "{:?} of user `{}`", self.action, id)
        }
    }
}

/// Set of controls with a write in flight. Different keys never block each
/// other.
#[derive(Clone, Debug, Default)]
pub struct MutationGateway {
    in_flight: Arc<Mutex<HashSet<MutationKey>>>
}

impl MutationGateway {
    pub fn new() -> MutationGateway {
        MutationGateway::default()
    }

    /// Latches `key` until the returned guard is dropped
    pub fn acquire(&self, key: MutationKey) -> Result<InFlightGuard> {
        if !self.in_flight.lock().insert(key.clone()) {
            log::debug!("Rejected double submit: {}", key);
            return Err(Error::InFlight(key.to_string()));
        }
        Ok(InFlightGuard { key, in_flight: Arc::clone(&self.in_flight) })
    }

    pub fn is_in_flight(&self, key: &MutationKey) -> bool {
        self.in_flight.lock().contains(key)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    key: MutationKey,
    in_flight: Arc<Mutex<HashSet<MutationKey>>>
}

impl InFlightGuard {
    pub fn key(&self) -> &MutationKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}
