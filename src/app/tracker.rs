//! The tracker client: one constructed instance owning every piece of shared
//! state (server context, session, taxonomy, cache, view).
//!
//! Locks are only ever held between suspension points. Every operation that
//! talks to the server takes what it needs under a lock, releases it, awaits
//! the call, then re-acquires to apply the result.

use crate::admin::types::ManagedUser;
use crate::auth::permission::{self, Requirement};
use crate::mutation::gateway::MutationGateway;
use crate::query::pipeline::{self, Page, PageNav, ViewState};
use crate::query::sort::Column;
use crate::resource::types::{Resource, ResourceId, Timestamp};
use crate::shared::error::{Error, Result};
use crate::shared::types::account::{Role, Session};
use crate::shared::util::handler::TrackerApi;
use crate::shared::util::store::ClientStore;
use crate::sync::engine::{system_clock, Clock, SyncEngine, SyncOutcome, SyncTicket};
use crate::sync::poller::Poller;
use crate::taxonomy::index::TaxonomyIndex;
use crate::taxonomy::types::TypeConfig;

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub struct Tracker<H: TrackerApi> {
    pub(crate) api: H,
    pub(crate) sync: Arc<Mutex<SyncEngine>>,
    taxonomy: RwLock<Arc<TaxonomyIndex>>,
    session: RwLock<Option<Session>>,
    view: Mutex<ViewState>,
    pub(crate) gateway: MutationGateway,
    pub(crate) managed_users: Arc<Mutex<Vec<ManagedUser>>>,
    visible: watch::Sender<bool>,
    changes: watch::Sender<u64>,
    store: Option<ClientStore>,
    clock: Clock,
    poll_interval: Duration
}

impl<H: TrackerApi> Tracker<H> {
    pub fn new(api: H, server_id: &str) -> Tracker<H> {
        Tracker {
            api,
            sync: Arc::new(Mutex::new(SyncEngine::new(server_id))),
            taxonomy: RwLock::new(Arc::new(TaxonomyIndex::empty())),
            session: RwLock::new(None),
            view: Mutex::new(ViewState::default()),
            gateway: MutationGateway::new(),
            managed_users: Arc::new(Mutex::new(Vec::new())),
            visible: watch::channel(true).0,
            changes: watch::channel(0).0,
            store: None,
            clock: system_clock(),
            poll_interval: DEFAULT_POLL_INTERVAL
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store(mut self, store: ClientStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.view.lock().set_page_size(page_size);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn api(&self) -> &H {
        &self.api
    }

    pub(crate) fn now(&self) -> Timestamp {
        (self.clock)()
    }

    // --- Startup ---

    /// Loads session, taxonomy and the first baseline concurrently. Only a
    /// taxonomy failure is fatal: without a session the viewer is a guest,
    /// and a failed resource load is retried by the poller.
    pub async fn init(&self) -> Result<()> {
        let (session, taxonomy, resources) = futures::join!(
            self.refresh_session(),
            self.load_taxonomy(),
            self.full_load()
        );

        if let Err(err) = session {
            log::warn!("Could not load session, continuing as guest: {}", err);
            *self.session.write() = None;
        }
        if let Err(err) = resources {
            log::error!("Initial resource load failed: {}", err);
        }
        taxonomy.map(|_| ())
    }

    pub async fn load_taxonomy(&self) -> Result<Arc<TaxonomyIndex>> {
        let roots = self.api.fetch_taxonomy().await?;
        let index = Arc::new(TaxonomyIndex::new(roots));
        *self.taxonomy.write() = Arc::clone(&index);
        self.notify_changed();
        Ok(index)
    }

    /// Re-reads the session; the effective role follows on the next check
    pub async fn refresh_session(&self) -> Result<Role> {
        let me = self.api.fetch_session().await?;
        *self.session.write() = me.into_session();
        let role = self.effective_role();
        log::info!("Session refreshed, role on `{}` is {}", self.server_id(), role);
        Ok(role)
    }

    // --- Sync ---

    pub async fn full_load(&self) -> Result<SyncOutcome> {
        let ticket = self.sync.lock().begin_full(self.now());
        self.run_sync(ticket).await
    }

    pub async fn delta_load(&self) -> Result<SyncOutcome> {
        let ticket = self.sync.lock().begin_delta(self.now());
        self.run_sync(ticket).await
    }

    /// Moves to another server context: drops the old cache immediately,
    /// remembers the choice and loads a new baseline
    pub async fn switch_server(&self, server_id: &str) -> Result<SyncOutcome> {
        let ticket = self.sync.lock().switch_server(server_id, self.now());
        self.managed_users.lock().clear();
        self.view.lock().page = 1;
        self.notify_changed();

        if let Some(store) = &self.store {
            if let Err(err) = store.set_last_server(server_id) {
                log::warn!("Could not persist server choice: {}", err);
            }
        }
        self.run_sync(ticket).await
    }

    async fn run_sync(&self, ticket: SyncTicket) -> Result<SyncOutcome> {
        let records = match self.api.fetch_resources(&ticket.server_id, ticket.since).await {
            Ok(records) => records,
            Err(err) => {
                let current = self.sync.lock().is_current(&ticket);
                if !current {
                    return Ok(SyncOutcome::Discarded);
                }
                log::warn!("{:?} sync for `{}` failed: {}", ticket.kind, ticket.server_id, err);
                return Err(err);
            }
        };

        let outcome = self.sync.lock().complete(&ticket, records);
        if outcome.changed() {
            self.notify_changed();
        }
        Ok(outcome)
    }

    // --- State ---

    pub fn server_id(&self) -> String {
        self.sync.lock().server_id().to_string()
    }

    pub fn watermark(&self) -> Timestamp {
        self.sync.lock().watermark()
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Resolved against the current server context on every call
    pub fn effective_role(&self) -> Role {
        let server_id = self.server_id();
        permission::effective_role(self.session.read().as_ref(), &server_id)
    }

    pub fn can(&self, required: impl Into<Requirement>) -> bool {
        permission::has_permission(self.effective_role(), required)
    }

    pub fn taxonomy(&self) -> Arc<TaxonomyIndex> {
        self.taxonomy.read().clone()
    }

    pub fn type_config(&self, label: &str) -> Option<TypeConfig> {
        self.taxonomy.read().config_for(label).cloned()
    }

    pub fn resource(&self, id: ResourceId) -> Option<Resource> {
        self.sync.lock().cache().get(id).cloned()
    }

    pub fn find_resource(&self, name: &str) -> Option<Resource> {
        self.sync.lock().cache().find_by_name(name).cloned()
    }

    pub fn cache_len(&self) -> usize {
        self.sync.lock().cache().len()
    }

    /// Every cached record in cache order
    pub fn snapshot(&self) -> Vec<Resource> {
        self.sync.lock().cache().iter().cloned().collect()
    }

    // --- View ---

    pub fn view(&self) -> ViewState {
        self.view.lock().clone()
    }

    /// The current page, derived fresh from the cache
    pub fn render(&self) -> Page<Resource> {
        let view = self.view();
        let taxonomy = self.taxonomy();
        let sync = self.sync.lock();
        view.render_page(sync.cache(), &taxonomy)
    }

    pub fn set_search(&self, term: &str) {
        self.view.lock().set_search(term);
    }

    pub fn select_category(&self, label: &str) {
        self.view.lock().select_category(label);
    }

    pub fn toggle_sort(&self, column: Column) {
        self.view.lock().toggle_sort(column);
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.view.lock().set_page_size(page_size);
    }

    pub fn navigate(&self, nav: PageNav) {
        let mut view = self.view.lock();
        let taxonomy = self.taxonomy();
        let total = {
            let sync = self.sync.lock();
            pipeline::render(sync.cache(), &view.search, &view.category, &view.sort, &taxonomy).len()
        };
        view.navigate(nav, total);
    }

    // --- Polling ---

    pub fn set_view_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    pub fn is_view_visible(&self) -> bool {
        *self.visible.borrow()
    }

    /// Bumped whenever what [`Tracker::render`] would show may have changed
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub(crate) fn notify_changed(&self) {
        self.changes.send_modify(|rev| *rev += 1);
    }

    /// Re-arming delta poll while the resource view is visible
    pub fn start_polling(self: &Arc<Self>) -> Poller where H: 'static {
        let tracker = Arc::clone(self);
        Poller::start(self.poll_interval, self.visible.subscribe(), move || {
            let tracker = Arc::clone(&tracker);
            async move {
                if let Err(err) = tracker.delta_load().await {
                    log::warn!("Delta poll failed, retrying next tick: {}", err);
                }
            }
        })
    }

    /// After a server side denial the local role is stale; re-read it
    pub(crate) async fn handle_denied(&self, err: &Error) {
        if matches!(err, Error::AccessDenied) {
            log::warn!("Server denied access on `{}`, refreshing session", self.server_id());
            if let Err(refresh_err) = self.refresh_session().await {
                log::warn!("Session refresh failed: {}", refresh_err);
            }
        }
    }
}
