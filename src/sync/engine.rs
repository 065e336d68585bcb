//! Local resource cache and the full / delta reconciliation rules.
//!
//! The engine does no I/O. A load is split into `begin_*`, which hands out a
//! [`SyncTicket`] tagged with the server context and baseline generation at
//! issue time, and [`SyncEngine::complete`], which applies the fetched
//! records only if that tag is still current. Anything else is a stale
//! response and is dropped silently.

use crate::resource::types::{Resource, ResourceId, Timestamp};
use crate::shared::types::account::ServerId;

use indexmap::IndexMap;
use std::sync::Arc;

/// Source of "now" for sync tickets
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

pub fn system_clock() -> Clock {
    Arc::new(unix_now)
}

/// Resources keyed by id, in server order for the baseline and arrival order
/// for later inserts
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cache {
    resources: IndexMap<ResourceId, Resource>
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize
}

impl Cache {
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Resource> {
        self.resources.values().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub(crate) fn replace_all(&mut self, records: Vec<Resource>) {
        self.resources = records.into_iter().map(|r| (r.id, r)).collect();
    }

    /// Replaces existing ids in place, appends new ones, never removes
    pub(crate) fn merge(&mut self, records: Vec<Resource>) -> MergeStats {
        let mut stats = MergeStats::default();
        for record in records {
            match self.resources.get_mut(&record.id) {
                Some(existing) => {
                    *existing = record;
                    stats.updated += 1;
                }
                None => {
                    self.resources.insert(record.id, record);
                    stats.inserted += 1;
                }
            }
        }
        stats
    }

    pub(crate) fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    pub(crate) fn clear(&mut self) {
        self.resources.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncKind {
    Full,
    Delta
}

/// Tag of one outstanding load
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncTicket {
    pub kind: SyncKind,
    pub server_id: ServerId,
    pub generation: u64,
    /// Watermark sent as `since`
    pub since: Timestamp,
    pub issued_at: Timestamp
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Replaced { count: usize },
    Merged(MergeStats),
    /// Response belonged to a context that is no longer current
    Discarded
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        match self {
            SyncOutcome::Replaced { .. } => true,
            SyncOutcome::Merged(stats) => stats.inserted + stats.updated > 0,
            SyncOutcome::Discarded => false
        }
    }
}

/// Identity of the cache a local change was made against
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStamp {
    pub server_id: ServerId,
    pub generation: u64
}

#[derive(Debug)]
pub struct SyncEngine {
    server_id: ServerId,
    generation: u64,
    cache: Cache,
    watermark: Timestamp
}

impl SyncEngine {
    pub fn new(server_id: &str) -> SyncEngine {
        SyncEngine {
            server_id: server_id.to_string(),
            generation: 0,
            cache: Cache::default(),
            watermark: 0
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn watermark(&self) -> Timestamp {
        self.watermark
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn stamp(&self) -> CacheStamp {
        CacheStamp { server_id: self.server_id.clone(), generation: self.generation }
    }

    /// Starts a new baseline for the current server. Every ticket issued
    /// before this one becomes stale.
    pub fn begin_full(&mut self, now: Timestamp) -> SyncTicket {
        self.generation += 1;
        self.watermark = 0;
        log::debug!("Full load #{} for `{}`", self.generation, self.server_id);
        SyncTicket {
            kind: SyncKind::Full,
            server_id: self.server_id.clone(),
            generation: self.generation,
            since: 0,
            issued_at: now
        }
    }

    pub fn begin_delta(&self, now: Timestamp) -> SyncTicket {
        SyncTicket {
            kind: SyncKind::Delta,
            server_id: self.server_id.clone(),
            generation: self.generation,
            since: self.watermark,
            issued_at: now
        }
    }

    /// Moves to another server. The old server's records are dropped right
    /// away, before the new baseline arrives.
    pub fn switch_server(&mut self, server_id: &str, now: Timestamp) -> SyncTicket {
        if self.server_id != server_id {
            log::info!("Server context `{}` -> `{}`", self.server_id, server_id);
        }
        self.server_id = server_id.to_string();
        self.cache.clear();
        self.begin_full(now)
    }

    pub fn is_current(&self, ticket: &SyncTicket) -> bool {
        ticket.server_id == self.server_id && ticket.generation == self.generation
    }

    pub fn is_current_stamp(&self, stamp: &CacheStamp) -> bool {
        stamp.server_id == self.server_id && stamp.generation == self.generation
    }

    /// Applies a successful load. The watermark advances to the ticket's
    /// issue time, so changes made while the request was in flight are
    /// requested again next time.
    pub fn complete(&mut self, ticket: &SyncTicket, records: Vec<Resource>) -> SyncOutcome {
        if !self.is_current(ticket) {
            log::debug!("Discarding {:?} response for `{}` (generation {}), current is `{}` ({})",
                ticket.kind, ticket.server_id, ticket.generation, self.server_id, self.generation);
            return SyncOutcome::Discarded;
        }

        let outcome = match ticket.kind {
            SyncKind::Full => {
                let count = records.len();
                self.cache.replace_all(records);
                SyncOutcome::Replaced { count }
            }
            SyncKind::Delta => SyncOutcome::Merged(self.cache.merge(records))
        };
        self.watermark = self.watermark.max(ticket.issued_at);
        log::debug!("{:?} sync for `{}`: {:?}, watermark {}", ticket.kind, self.server_id, outcome, self.watermark);
        outcome
    }

    /// Merges a record the server confirmed for a write. Ignored when the
    /// write was made against another server context.
    pub fn commit_resource(&mut self, server_id: &str, resource: Resource) -> bool {
        if server_id != self.server_id {
            return false;
        }
        self.cache.merge(vec![resource]);
        true
    }

    /// Applies a local change to one cached record, returning its value
    /// from before the change
    pub(crate) fn modify<F>(&mut self, id: ResourceId, change: F) -> Option<Resource>
            where F: FnOnce(&mut Resource) {
        let record = self.cache.get_mut(id)?;
        let before = record.clone();
        change(record);
        Some(before)
    }

    /// Same as [`SyncEngine::modify`] but only if the cache is still the one
    /// `stamp` was taken from
    pub(crate) fn modify_if_current<F>(&mut self, stamp: &CacheStamp, id: ResourceId, change: F) -> bool
            where F: FnOnce(&mut Resource) {
        if !self.is_current_stamp(stamp) {
            return false;
        }
        self.modify(id, change).is_some()
    }
}
