// A handler that just stores data in memory (non-persistent)
// Used for debugging and tests: behaves like the tracker server, with knobs
// for injecting failures and a journal of every call made

use crate::admin::types::{CommandLogEntry, CommandLogPage, CommandLogQuery, ManagedUser, RoleChange};
use crate::auth::permission::effective_role;
use crate::resource::types::{Resource, ResourceId, ResourcePayload, StatKey, Timestamp, STAT_MAX};
use crate::shared::error::{Error, Result};
use crate::shared::types::account::{MePayload, Role, ServerId};
use crate::shared::types::app::WriteResponse;
use crate::shared::util::handler::TrackerApi;
use crate::sync::engine::Clock;
use crate::taxonomy::index::TaxonomyIndex;
use crate::taxonomy::types::TaxonomyNode;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Notify;

pub const DEBUG_EPOCH: Timestamp = 1_700_000_000;

/// How an injected failure surfaces
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    Network,
    Rejected(String),
    AccessDenied
}

impl Failure {
    fn into_error(self) -> Error {
        match self {
            Failure::Network => Error::Network("connection reset".to_string()),
            Failure::Rejected(msg) => Error::Rejected(msg),
            Failure::AccessDenied => Error::AccessDenied
        }
    }
}

/// One request the handler received
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Taxonomy,
    Resources { server_id: ServerId, since: Timestamp },
    Session,
    Add(ResourcePayload),
    Update(ResourcePayload),
    Retire { server_id: ServerId, id: ResourceId },
    SetRole(RoleChange),
    ManagedUsers(ServerId),
    CommandLog(ServerId),
    ReloadCache
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Add(_) | Call::Update(_) | Call::Retire { .. } | Call::SetRole(_) | Call::ReloadCache)
    }
}

#[derive(Default)]
struct DebugState {
    taxonomy: Vec<TaxonomyNode>,
    servers: HashMap<ServerId, IndexMap<ResourceId, Resource>>,
    next_id: ResourceId,
    me: Option<MePayload>,
    users: HashMap<ServerId, Vec<ManagedUser>>,
    command_log: HashMap<ServerId, Vec<CommandLogEntry>>,
    write_failures: VecDeque<Failure>,
    read_failures: VecDeque<Failure>,
    held_fetch: Option<Arc<Notify>>,
    echo_resources: bool,
    calls: Vec<Call>
}

#[derive(Clone)]
pub struct DebugHandler {
    state: Arc<Mutex<DebugState>>,
    clock: Arc<AtomicI64>
}

impl Default for DebugHandler {
    fn default() -> Self {
        DebugHandler::new()
    }
}

impl DebugHandler {
    pub fn new() -> DebugHandler {
        DebugHandler {
            state: Arc::new(Mutex::new(DebugState { next_id: 1, echo_resources: true, ..Default::default() })),
            clock: Arc::new(AtomicI64::new(DEBUG_EPOCH))
        }
    }

    pub fn init(&self) {
        // A dummy superadmin called "admin"
        self.set_session(Some(MePayload {
            authenticated: true,
            id: Some("admin".to_string()),
            username: Some("Admin Amadeus".to_string()),
            avatar: None,
            is_superadmin: true,
            server_perms: HashMap::new()
        }));
    }

    // --- Clock ---

    pub fn now(&self) -> Timestamp {
        self.clock.load(Ordering::SeqCst)
    }

    pub fn advance(&self, secs: Timestamp) -> Timestamp {
        self.clock.fetch_add(secs, Ordering::SeqCst) + secs
    }

    /// Clock for the client under test, shared with this server
    pub fn clock(&self) -> Clock {
        let clock = Arc::clone(&self.clock);
        Arc::new(move || clock.load(Ordering::SeqCst))
    }

    // --- Seeding ---

    pub fn set_taxonomy(&self, roots: Vec<TaxonomyNode>) {
        self.state.lock().taxonomy = roots;
    }

    pub fn set_session(&self, me: Option<MePayload>) {
        self.state.lock().me = me;
    }

    /// Changes the caller's role on one server, as an admin elsewhere would
    pub fn set_server_role(&self, server_id: &str, role: Role) {
        if let Some(me) = self.state.lock().me.as_mut() {
            me.server_perms.insert(server_id.to_string(), role);
        }
    }

    /// Stores a record as is, assigning an id and timestamps where missing
    pub fn insert_resource(&self, server_id: &str, mut resource: Resource) -> Resource {
        let now = self.now();
        let mut state = self.state.lock();
        if resource.id <= 0 {
            resource.id = state.next_id;
        }
        state.next_id = state.next_id.max(resource.id + 1);
        resource.server_id = Some(server_id.to_string());
        resource.date_reported_ts.get_or_insert(now as f64);
        resource.last_modified_ts.get_or_insert(now as f64);
        state.servers.entry(server_id.to_string()).or_default().insert(resource.id, resource.clone());
        resource
    }

    pub fn add_user(&self, server_id: &str, user: ManagedUser) {
        self.state.lock().users.entry(server_id.to_string()).or_default().push(user);
    }

    pub fn log_command(&self, server_id: &str, entry: CommandLogEntry) {
        self.state.lock().command_log.entry(server_id.to_string()).or_default().push(entry);
    }

    /// Whether write responses carry the stored record back
    pub fn set_echo_resources(&self, echo: bool) {
        self.state.lock().echo_resources = echo;
    }

    // --- Failure injection ---

    pub fn fail_next_write(&self, failure: Failure) {
        self.state.lock().write_failures.push_back(failure);
    }

    pub fn fail_next_fetch(&self, failure: Failure) {
        self.state.lock().read_failures.push_back(failure);
    }

    /// The next resource fetch reads its data right away but does not return
    /// until the returned handle is notified
    pub fn hold_next_fetch(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state.lock().held_fetch = Some(Arc::clone(&notify));
        notify
    }

    // --- Inspection ---

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().calls.iter().filter(|c| c.is_write()).count()
    }

    pub fn last_write(&self) -> Option<Call> {
        self.state.lock().calls.iter().rev().find(|c| c.is_write()).cloned()
    }

    pub fn session_fetches(&self) -> usize {
        self.state.lock().calls.iter().filter(|c| matches!(c, Call::Session)).count()
    }

    pub fn stored(&self, server_id: &str, id: ResourceId) -> Option<Resource> {
        self.state.lock().servers.get(server_id).and_then(|s| s.get(&id)).cloned()
    }

    pub fn stored_count(&self, server_id: &str) -> usize {
        self.state.lock().servers.get(server_id).map_or(0, |s| s.len())
    }

    pub fn managed_user(&self, server_id: &str, user_id: &str) -> Option<ManagedUser> {
        self.state.lock().users.get(server_id)
            .and_then(|users| users.iter().find(|u| u.id == user_id))
            .cloned()
    }
}

impl DebugState {
    fn role_on(&self, server_id: &str) -> Role {
        let session = self.me.clone().and_then(MePayload::into_session);
        effective_role(session.as_ref(), server_id)
    }

    fn require(&self, server_id: &str, required: Role) -> Result<Role> {
        let role = self.role_on(server_id);
        if role < required {
            return Err(Error::AccessDenied);
        }
        Ok(role)
    }

    fn record(&mut self, server_id: &str, command: &str, details: serde_json::Value, now: Timestamp) {
        let (user_id, username) = match &self.me {
            Some(me) => (me.id.clone(), me.username.clone()),
            None => (None, None)
        };
        let log = self.command_log.entry(server_id.to_string()).or_default();
        let id = log.len() as i64 + 1;
        log.push(CommandLogEntry {
            id,
            timestamp: now,
            user_id,
            username,
            avatar_url: None,
            command: command.to_string(),
            details
        });
    }

    fn respond(&self, resource: Resource) -> WriteResponse {
        if self.echo_resources {
            WriteResponse::with_resource(resource)
        } else {
            WriteResponse::ok()
        }
    }
}

/// Ratings as the server derives them: value over the class maximum, and
/// their average as the weight
fn compute_ratings(resource: &mut Resource, taxonomy: &TaxonomyIndex) {
    let config = taxonomy.config_for(&resource.resource_type);
    let mut ratings = Vec::new();
    for key in StatKey::ALL {
        let rating = resource.stats.get(key).map(|value| {
            let max = config.and_then(|c| c.stats.get(&key)).map_or(STAT_MAX, |r| r.max);
            if max > 0 { f64::from(value) / f64::from(max) } else { 0.0 }
        });
        resource.ratings.set(key, rating.map(round3));
        ratings.extend(rating);
    }
    resource.ratings.res_weight_rating = Some(if ratings.is_empty() {
        0.0
    } else {
        round3(ratings.iter().sum::<f64>() / ratings.len() as f64)
    });
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

impl DebugHandler {
    fn tick(&self) -> Timestamp {
        self.advance(1)
    }

    fn begin_write(&self, call: Call) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.write_failures.pop_front() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(())
        }
    }
}

#[async_trait]
impl TrackerApi for DebugHandler {
    async fn fetch_taxonomy(&self) -> Result<Vec<TaxonomyNode>> {
        let mut state = self.state.lock();
        state.calls.push(Call::Taxonomy);
        Ok(state.taxonomy.clone())
    }

    async fn fetch_resources(&self, server_id: &str, since: Timestamp) -> Result<Vec<Resource>> {
        let (result, hold) = {
            let mut state = self.state.lock();
            state.calls.push(Call::Resources { server_id: server_id.to_string(), since });
            let result = match state.read_failures.pop_front() {
                Some(failure) => Err(failure.into_error()),
                None => {
                    let since = since as f64;
                    Ok(state.servers.get(server_id)
                        .map(|records| records.values()
                            .filter(|r| r.date_reported_ts.map_or(false, |t| t > since)
                                || r.last_modified_ts.map_or(false, |t| t > since))
                            .cloned()
                            .collect())
                        .unwrap_or_default())
                }
            };
            (result, state.held_fetch.take())
        };

        if let Some(hold) = hold {
            hold.notified().await;
        }
        result
    }

    async fn fetch_session(&self) -> Result<MePayload> {
        let mut state = self.state.lock();
        state.calls.push(Call::Session);
        Ok(state.me.clone().unwrap_or(MePayload {
            authenticated: false,
            id: None,
            username: None,
            avatar: None,
            is_superadmin: false,
            server_perms: HashMap::new()
        }))
    }

    async fn add_resource(&self, payload: &ResourcePayload) -> Result<WriteResponse> {
        self.begin_write(Call::Add(payload.clone()))?;
        let now = self.tick();
        let mut state = self.state.lock();
        let server_id = payload.server_id.as_str();
        state.require(server_id, Role::Editor)?;

        let name = payload.name.clone().unwrap_or_default();
        let taxonomy = TaxonomyIndex::new(state.taxonomy.clone());
        let exists = state.servers.get(server_id).map_or(false, |s| s.values().any(|r| r.name == name));
        if exists {
            return Err(Error::Rejected(format!("Error: {} already exists for {}", name, server_id)));
        }

        let mut resource = Resource::new(state.next_id, &name, payload.resource_type.as_deref().unwrap_or_default());
        state.next_id += 1;
        resource.resource_class_id = payload.resource_class_id;
        resource.stats = payload.stats.clone();
        resource.planets = payload.planet.iter().cloned().collect();
        resource.notes = payload.notes.clone();
        resource.is_active = payload.is_active.unwrap_or(true);
        resource.date_reported_ts = Some(now as f64);
        resource.last_modified_ts = Some(now as f64);
        resource.reporter_id = state.me.as_ref().and_then(|m| m.id.clone());
        resource.reporter_name = state.me.as_ref().and_then(|m| m.username.clone());
        resource.server_id = Some(server_id.to_string());
        compute_ratings(&mut resource, &taxonomy);

        state.servers.entry(server_id.to_string()).or_default().insert(resource.id, resource.clone());
        state.record(server_id, "add_resource", json!({ "name": name }), now);
        Ok(state.respond(resource))
    }

    async fn update_resource(&self, payload: &ResourcePayload) -> Result<WriteResponse> {
        self.begin_write(Call::Update(payload.clone()))?;
        let now = self.tick();
        let mut state = self.state.lock();
        let server_id = payload.server_id.clone();
        state.require(&server_id, Role::Editor)?;

        let taxonomy = TaxonomyIndex::new(state.taxonomy.clone());
        let id = payload.id.ok_or_else(|| Error::Rejected("Missing ID for update command".to_string()))?;
        match &payload.resource_type {
            Some(label) if taxonomy.config_for(label).is_none() =>
                return Err(Error::Rejected(format!("Resource type '{}' is not valid for spawning.", label))),
            None if payload.resource_class_id.is_none() =>
                return Err(Error::Rejected("Missing Resource Type/Label".to_string())),
            _ => {}
        }
        let resource = state.servers.get_mut(&server_id)
            .and_then(|s| s.get_mut(&id))
            .ok_or_else(|| Error::Rejected(format!("Resource {} not found", id)))?;

        // A planet name toggles that planet; the list itself is never replaced
        if let Some(planet) = &payload.planet {
            resource.toggle_planet(planet);
        }
        if let Some(name) = &payload.name { resource.name = name.clone(); }
        if let Some(t) = &payload.resource_type { resource.resource_type = t.clone(); }
        if payload.resource_class_id.is_some() { resource.resource_class_id = payload.resource_class_id; }
        if let Some(active) = payload.is_active { resource.is_active = active; }
        if payload.notes.is_some() { resource.notes = payload.notes.clone(); }
        // Ratings always follow the stats that were sent
        resource.stats = payload.stats.clone();
        compute_ratings(resource, &taxonomy);
        resource.last_modified_ts = Some(now as f64);
        let resource = resource.clone();

        state.record(&server_id, "update_resource", json!({ "name": resource.name, "id": id }), now);
        Ok(state.respond(resource))
    }

    async fn retire_resource(&self, server_id: &str, id: ResourceId) -> Result<WriteResponse> {
        self.begin_write(Call::Retire { server_id: server_id.to_string(), id })?;
        let now = self.tick();
        let mut state = self.state.lock();
        state.require(server_id, Role::Admin)?;

        let resource = state.servers.get_mut(server_id)
            .and_then(|s| s.get_mut(&id))
            .ok_or_else(|| Error::Rejected(format!("Resource {} not found", id)))?;
        resource.is_active = false;
        resource.last_modified_ts = Some(now as f64);
        let resource = resource.clone();

        state.record(server_id, "retire_resource", json!({ "id": id }), now);
        Ok(state.respond(resource))
    }

    async fn set_role(&self, change: &RoleChange) -> Result<WriteResponse> {
        self.begin_write(Call::SetRole(change.clone()))?;
        let now = self.tick();
        let mut state = self.state.lock();
        let actor = state.require(&change.server_id, Role::Editor)?;
        if actor != Role::SuperAdmin && change.role >= actor {
            return Err(Error::Rejected(format!("Your role cannot assign {}", change.role)));
        }

        let user = state.users.get_mut(&change.server_id)
            .and_then(|users| users.iter_mut().find(|u| u.id == change.target_user_id))
            .ok_or_else(|| Error::Rejected(format!("Unknown user {}", change.target_user_id)))?;
        user.role = change.role;

        state.record(&change.server_id, "set_user_role",
            json!({ "target_user_id": change.target_user_id, "role": change.role }), now);
        Ok(WriteResponse::ok())
    }

    async fn fetch_managed_users(&self, server_id: &str) -> Result<Vec<ManagedUser>> {
        let mut state = self.state.lock();
        state.calls.push(Call::ManagedUsers(server_id.to_string()));
        state.require(server_id, Role::Editor)?;
        Ok(state.users.get(server_id).cloned().unwrap_or_default())
    }

    async fn fetch_command_log(&self, server_id: &str, query: &CommandLogQuery) -> Result<CommandLogPage> {
        let mut state = self.state.lock();
        state.calls.push(Call::CommandLog(server_id.to_string()));
        state.require(server_id, Role::Admin)?;

        let term = query.search.to_lowercase();
        let mut matching: Vec<CommandLogEntry> = state.command_log.get(server_id).cloned().unwrap_or_default()
            .into_iter()
            .filter(|e| term.is_empty()
                || e.command.to_lowercase().contains(&term)
                || e.username.as_deref().map_or(false, |u| u.to_lowercase().contains(&term))
                || e.details.to_string().to_lowercase().contains(&term))
            .collect();
        matching.reverse(); // Newest first

        let limit = query.limit.max(1) as usize;
        let total = matching.len();
        let start = (query.page.max(1) as usize - 1) * limit;
        Ok(CommandLogPage {
            logs: matching.into_iter().skip(start).take(limit).collect(),
            total: total as u64,
            pages: ((total + limit - 1) / limit) as u64
        })
    }

    async fn reload_cache(&self) -> Result<WriteResponse> {
        self.begin_write(Call::ReloadCache)?;
        let state = self.state.lock();
        if state.me.as_ref().map_or(true, |m| !m.is_superadmin) {
            return Err(Error::AccessDenied);
        }
        Ok(WriteResponse { success: true, message: Some("Cache reloaded".to_string()), ..Default::default() })
    }
}
