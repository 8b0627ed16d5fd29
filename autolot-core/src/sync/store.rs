//! Synchronized vehicle store: orchestrates the remote table, the local
//! mirror and the connectivity oracle behind one CRUD surface.
//!
//! Operations never return errors. A failure is recorded as the store's
//! last error and announced as a [`Notice`]; the store stays usable, possibly
//! with stale data.

use crate::import::{ImportReport, ImportSkip, VehicleDraft};
use crate::inventory::{
    filter_vehicles, sample_vehicles, FilterUpdate, InventoryFilters, NewVehicle, Vehicle,
    VehiclePatch,
};
use crate::sync::conflict::ConflictResolver;
use crate::sync::connectivity::ConnectivityOracle;
use crate::sync::mirror::LocalMirror;
use crate::sync::notice::{Notice, NoticeLevel};
use crate::sync::remote::RemoteStore;
use crate::{ErrorKind, InventoryError, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const NOTICE_CAPACITY: usize = 64;

/// The last failure recorded by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&InventoryError> for StoreFailure {
    fn from(e: &InventoryError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

#[derive(Default)]
struct StoreState {
    vehicles: Vec<Vehicle>,
    filters: InventoryFilters,
    loading: bool,
    last_error: Option<StoreFailure>,
}

/// Offline-first vehicle store.
///
/// Cloning is cheap and every clone shares the same state. Overlapping
/// mutations of the same vehicle are not serialized: the later one to
/// finish wins.
#[derive(Clone)]
pub struct VehicleStore {
    remote: Arc<dyn RemoteStore>,
    mirror: Arc<dyn LocalMirror>,
    connectivity: Arc<dyn ConnectivityOracle>,
    state: Arc<RwLock<StoreState>>,
    notices: broadcast::Sender<Notice>,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl VehicleStore {
    /// Create a store with an empty in-memory collection. Call [`fetch`]
    /// to populate it.
    ///
    /// [`fetch`]: VehicleStore::fetch
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        mirror: Arc<dyn LocalMirror>,
        connectivity: Arc<dyn ConnectivityOracle>,
    ) -> Self {
        let (notices, _rx) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            remote,
            mirror,
            connectivity,
            state: Arc::new(RwLock::new(StoreState::default())),
            notices,
            listener: Arc::new(Mutex::new(None)),
        }
    }

    // --- Lifecycle ---

    /// Register for connectivity transitions: going online reconciles,
    /// going offline announces offline mode. Must run inside a Tokio runtime.
    ///
    /// The task only holds weak references and ends at the first transition
    /// after the last store handle is dropped.
    pub fn start(&self) {
        let mut rx = self.connectivity.subscribe();
        let weak = self.downgrade();

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                let Some(store) = weak.upgrade() else {
                    debug!("Vehicle store dropped, connectivity task exiting");
                    break;
                };
                if online {
                    info!("Connection restored, reconciling inventory");
                    store.reconcile().await;
                } else {
                    store.notify(Notice::info("Working in offline mode"));
                }
            }
        });

        match self.listener.lock() {
            Ok(mut slot) => {
                if let Some(previous) = slot.replace(handle) {
                    previous.abort();
                }
            }
            Err(_) => {
                warn!("Listener slot poisoned, connectivity task left detached");
            }
        }
    }

    /// Tear down the connectivity subscription.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                info!("Vehicle store stopped listening for connectivity changes");
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    // --- Read access ---

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Full in-memory collection.
    pub async fn vehicles(&self) -> Vec<Vehicle> {
        self.state.read().await.vehicles.clone()
    }

    /// In-memory collection narrowed by the current filters.
    pub async fn visible(&self) -> Vec<Vehicle> {
        let state = self.state.read().await;
        filter_vehicles(&state.vehicles, &state.filters)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn filters(&self) -> InventoryFilters {
        self.state.read().await.filters.clone()
    }

    pub async fn set_filters(&self, update: FilterUpdate) {
        self.state.write().await.filters.apply(update);
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn last_error(&self) -> Option<StoreFailure> {
        self.state.read().await.last_error.clone()
    }

    // --- Operations ---

    /// Refresh the collection. Remote is the source of truth when reachable;
    /// otherwise the local mirror is used. Returns the collection size.
    pub async fn fetch(&self) -> usize {
        self.begin().await;

        let vehicles = if self.is_online() {
            match self.remote.list().await {
                Ok(vehicles) => {
                    self.persist(&vehicles).await;
                    vehicles
                }
                Err(e) => {
                    warn!("Remote fetch failed, using local mirror: {}", e);
                    self.record(&e).await;
                    self.notify(Notice::warning("Failed to fetch vehicles, using local data"));
                    self.mirror.load()
                }
            }
        } else {
            self.notify(Notice::info("Working in offline mode"));
            self.mirror.load()
        };

        let count = vehicles.len();
        let mut state = self.state.write().await;
        state.vehicles = vehicles;
        state.loading = false;
        count
    }

    /// Add a vehicle at the front of the collection.
    pub async fn create(&self, fields: NewVehicle) -> Option<Vehicle> {
        self.begin().await;
        let result = self.try_create(fields).await;
        self.settle(result, "Failed to add vehicle").await
    }

    /// Apply a partial update to the vehicle with `id`.
    pub async fn update(&self, id: Uuid, patch: VehiclePatch) -> Option<Vehicle> {
        self.begin().await;
        let result = self.try_update(id, patch).await;
        self.settle(result, "Failed to update vehicle").await
    }

    /// Delete the vehicle with `id`.
    ///
    /// Local removal happens even when the remote delete fails, so the
    /// vehicle can reappear on the next fetch. Returns false when the remote
    /// delete failed.
    pub async fn delete(&self, id: Uuid) -> bool {
        self.begin().await;
        let online = self.is_online();

        let mut remote_ok = true;
        if online {
            if let Err(e) = self.remote.delete(id).await {
                self.fail(&e, "Failed to delete vehicle").await;
                remote_ok = false;
            }
        }

        let mut mirrored = self.mirror.load();
        mirrored.retain(|v| v.id != id);
        self.persist(&mirrored).await;

        let mut state = self.state.write().await;
        state.vehicles.retain(|v| v.id != id);
        state.loading = false;
        drop(state);

        if remote_ok {
            self.notify(Notice::success(if online {
                "Vehicle deleted successfully"
            } else {
                "Vehicle deleted locally"
            }));
        }
        remote_ok
    }

    /// Merge remote and local collections with last-write-wins and write the
    /// result everywhere. Returns the merged size.
    pub async fn reconcile(&self) -> Option<usize> {
        self.begin().await;
        let result = self.try_reconcile().await;
        self.settle(result, "Failed to sync data").await
    }

    /// Insert the sample catalogue when the authoritative side is empty.
    /// Returns the number of vehicles inserted.
    pub async fn seed_if_empty(&self) -> usize {
        self.begin().await;
        let result = self.try_seed().await;
        self.settle(result, "Failed to seed initial data")
            .await
            .unwrap_or(0)
    }

    /// Create every importable draft; rows that fail are reported, not fatal.
    pub async fn import(&self, drafts: Vec<VehicleDraft>) -> ImportReport {
        let mut report = ImportReport::default();

        for draft in drafts {
            let line = draft.line;
            let fields = match draft.into_new_vehicle() {
                Ok(fields) => fields,
                Err(e) => {
                    report.skipped.push(ImportSkip {
                        line,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.create(fields).await {
                Some(_) => report.imported += 1,
                None => {
                    let reason = self
                        .last_error()
                        .await
                        .map(|f| f.message)
                        .unwrap_or_else(|| "unknown error".to_string());
                    report.skipped.push(ImportSkip { line, reason });
                }
            }
        }

        let summary = format!(
            "Imported {} vehicles, skipped {}",
            report.imported,
            report.skipped.len()
        );
        self.notify(if report.skipped.is_empty() {
            Notice::success(summary)
        } else {
            Notice::warning(summary)
        });
        report
    }

    // --- Operation bodies ---

    async fn try_create(&self, fields: NewVehicle) -> Result<Vehicle> {
        fields.validate()?;
        let vehicle = Vehicle::new(fields, Utc::now());

        let (stored, message) = if self.is_online() {
            (
                self.remote.insert(&vehicle).await?,
                "Vehicle added successfully",
            )
        } else {
            (vehicle, "Vehicle added locally")
        };

        let mut mirrored = self.mirror.load();
        mirrored.insert(0, stored.clone());
        self.persist(&mirrored).await;

        self.state.write().await.vehicles.insert(0, stored.clone());
        self.notify(Notice::success(message));
        Ok(stored)
    }

    async fn try_update(&self, id: Uuid, patch: VehiclePatch) -> Result<Vehicle> {
        patch.validate()?;
        let now = Utc::now();

        let (updated, message) = if self.is_online() {
            (
                self.remote.update(id, &patch, now).await?,
                "Vehicle updated successfully",
            )
        } else {
            let existing = match self.mirror.load().into_iter().find(|v| v.id == id) {
                Some(v) => Some(v),
                None => self
                    .state
                    .read()
                    .await
                    .vehicles
                    .iter()
                    .find(|v| v.id == id)
                    .cloned(),
            };
            let mut vehicle = existing.ok_or_else(|| InventoryError::NotFound(id.to_string()))?;
            patch.apply_to(&mut vehicle, now);
            (vehicle, "Vehicle updated locally")
        };

        let mut mirrored = self.mirror.load();
        replace_or_prepend(&mut mirrored, updated.clone());
        self.persist(&mirrored).await;

        replace_or_prepend(&mut self.state.write().await.vehicles, updated.clone());
        self.notify(Notice::success(message));
        Ok(updated)
    }

    async fn try_reconcile(&self) -> Result<usize> {
        let remote = self.remote.list().await?;
        let local = self.mirror.load();
        let merged = ConflictResolver::merge(remote, local);
        let count = merged.len();

        self.persist(&merged).await;
        self.state.write().await.vehicles = merged.clone();

        self.remote.upsert(&merged).await?;
        self.notify(Notice::success("Data synchronized successfully"));
        Ok(count)
    }

    async fn try_seed(&self) -> Result<usize> {
        let online = self.is_online();
        let existing = if online {
            self.remote.list().await?
        } else {
            self.mirror.load()
        };
        if !existing.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let samples: Vec<Vehicle> = sample_vehicles()
            .into_iter()
            .map(|fields| Vehicle::new(fields, now))
            .collect();
        let stored = if online {
            self.remote.upsert(&samples).await?
        } else {
            samples
        };
        let count = stored.len();

        let mut mirrored = self.mirror.load();
        mirrored.retain(|v| !stored.iter().any(|s| s.id == v.id));
        let collection: Vec<Vehicle> = stored.into_iter().chain(mirrored).collect();
        self.persist(&collection).await;
        self.state.write().await.vehicles = collection;

        self.notify(Notice::success("Successfully seeded initial vehicle data"));
        Ok(count)
    }

    // --- Internal helpers ---

    fn downgrade(&self) -> WeakStore {
        WeakStore {
            remote: Arc::downgrade(&self.remote),
            mirror: Arc::downgrade(&self.mirror),
            connectivity: Arc::downgrade(&self.connectivity),
            state: Arc::downgrade(&self.state),
            notices: self.notices.clone(),
            listener: Arc::downgrade(&self.listener),
        }
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.loading = true;
        state.last_error = None;
    }

    async fn settle<T>(&self, result: Result<T>, context: &str) -> Option<T> {
        let value = match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(&e, context).await;
                None
            }
        };
        self.state.write().await.loading = false;
        value
    }

    /// Write the mirror; a failure is recorded but never rolls back memory.
    async fn persist(&self, vehicles: &[Vehicle]) {
        if let Err(e) = self.mirror.save(vehicles) {
            warn!("Failed to save local mirror: {}", e);
            self.record(&e).await;
            self.notify(Notice::warning("Failed to save changes locally"));
        }
    }

    async fn record(&self, e: &InventoryError) {
        self.state.write().await.last_error = Some(StoreFailure::from(e));
    }

    async fn fail(&self, e: &InventoryError, context: &str) {
        error!("{}: {}", context, e);
        self.record(e).await;
        self.notify(Notice::error(format!("{}: {}", context, e)));
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
            NoticeLevel::Error => {}
        }
        // Nobody listening is fine.
        let _ = self.notices.send(notice);
    }
}

/// Non-owning handle used by the connectivity task.
struct WeakStore {
    remote: Weak<dyn RemoteStore>,
    mirror: Weak<dyn LocalMirror>,
    connectivity: Weak<dyn ConnectivityOracle>,
    state: Weak<RwLock<StoreState>>,
    notices: broadcast::Sender<Notice>,
    listener: Weak<Mutex<Option<JoinHandle<()>>>>,
}

impl WeakStore {
    fn upgrade(&self) -> Option<VehicleStore> {
        Some(VehicleStore {
            remote: self.remote.upgrade()?,
            mirror: self.mirror.upgrade()?,
            connectivity: self.connectivity.upgrade()?,
            state: self.state.upgrade()?,
            notices: self.notices.clone(),
            listener: self.listener.upgrade()?,
        })
    }
}

fn replace_or_prepend(vehicles: &mut Vec<Vehicle>, vehicle: Vehicle) {
    match vehicles.iter_mut().find(|v| v.id == vehicle.id) {
        Some(slot) => *slot = vehicle,
        None => vehicles.insert(0, vehicle),
    }
}
