use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog_store::{self, StoreError, MOST_USED_LIMIT};
use crate::config::{validate, Config, ConfigError};
use crate::discovery::{DiscoveryError, DiscoverySource};
use crate::icon_cache::{IconCache, IconData, IconResolver, NoIcons};
use crate::launcher::Launcher;
use crate::model::{now_epoch_secs, ApplicationRecord};
use crate::query_engine::{QueryEngine, ResultList};
use crate::reconcile::{self, ReconcileReport, Trust};
use crate::search_history::SearchHistory;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    Loading,
    Ready,
    NoApplicationsFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Reconciled(ReconcileReport),
    Merged(ReconcileReport),
    /// Discovery came back empty; the stored catalog was left as it was.
    NothingDiscovered,
    /// Another refresh was already running; this call waited for it instead.
    Joined,
}

/// The catalog context object: owns the store, discovery source, query engine and
/// icon cache, and is shared with the host behind an `Arc`.
pub struct CatalogService {
    config: Config,
    db: Arc<Mutex<Connection>>,
    discovery: Arc<DiscoverySource>,
    launcher: Arc<dyn Launcher>,
    engine: QueryEngine,
    icons: IconCache,
    history: Mutex<SearchHistory>,
    loading: watch::Sender<bool>,
    status: watch::Sender<CatalogStatus>,
    favorites: watch::Sender<ResultList>,
    most_used: watch::Sender<ResultList>,
    /// Bumped under the db lock each time views are loaded.
    view_seq: Arc<AtomicU64>,
    /// Sequence of the views currently published.
    applied_seq: Mutex<u64>,
}

impl CatalogService {
    pub fn new(
        config: Config,
        discovery: DiscoverySource,
        launcher: Arc<dyn Launcher>,
    ) -> Result<Self, ServiceError> {
        validate(&config)?;
        let db = catalog_store::open_from_config(&config)?;
        Self::with_connection(config, db, discovery, launcher)
    }

    /// Builds the service over an existing connection and publishes whatever the
    /// store already holds. Must be called from within a tokio runtime.
    pub fn with_connection(
        config: Config,
        db: Connection,
        discovery: DiscoverySource,
        launcher: Arc<dyn Launcher>,
    ) -> Result<Self, ServiceError> {
        validate(&config)?;
        let history = SearchHistory::load(&config.search_history_path);
        let engine = QueryEngine::new(Duration::from_millis(config.query_debounce_ms));
        let service = Self {
            config,
            db: Arc::new(Mutex::new(db)),
            discovery: Arc::new(discovery),
            launcher,
            engine,
            icons: IconCache::new(Arc::new(NoIcons)),
            history: Mutex::new(history),
            loading: watch::Sender::new(false),
            status: watch::Sender::new(CatalogStatus::Loading),
            favorites: watch::Sender::new(Arc::new(Vec::new())),
            most_used: watch::Sender::new(Arc::new(Vec::new())),
            view_seq: Arc::new(AtomicU64::new(0)),
            applied_seq: Mutex::new(0),
        };
        let stored = service.publish_blocking()?;
        if stored > 0 {
            service.status.send_replace(CatalogStatus::Ready);
        }
        Ok(service)
    }

    pub fn with_icon_resolver(mut self, resolver: Arc<dyn IconResolver>) -> Self {
        self.icons = IconCache::new(resolver);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn search(&self, query: &str) {
        self.engine.set_query(query);
    }

    pub fn clear_search(&self) {
        self.engine.set_query("");
    }

    pub fn current_query(&self) -> String {
        self.engine.query()
    }

    pub fn results(&self) -> watch::Receiver<ResultList> {
        self.engine.subscribe()
    }

    /// Ranks the current query against the current snapshot right now.
    pub fn evaluate(&self) -> Vec<ApplicationRecord> {
        self.engine.evaluate()
    }

    pub fn favorite_apps(&self) -> watch::Receiver<ResultList> {
        self.favorites.subscribe()
    }

    /// Most launched apps, at most `limit` (never more than 10). Follows the store
    /// independently of the live query. Must be called from within a tokio runtime.
    pub fn most_used_apps(&self, limit: usize) -> watch::Receiver<ResultList> {
        let limit = limit.min(MOST_USED_LIMIT);
        let mut source = self.most_used.subscribe();
        let initial = take_list(&source.borrow_and_update(), limit);
        let (tx, rx) = watch::channel(initial);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = source.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = take_list(&source.borrow_and_update(), limit);
                        tx.send_replace(next);
                    }
                    _ = tx.closed() => break,
                }
            }
        });
        rx
    }

    pub fn is_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<CatalogStatus> {
        self.status.subscribe()
    }

    pub fn icon_for(&self, id: &str) -> Option<Arc<IconData>> {
        self.icons.get(id)
    }

    /// Runs one discovery cycle. Concurrent callers collapse onto the cycle already
    /// in flight and get [`RefreshOutcome::Joined`] once it finishes.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ServiceError> {
        let started = self.loading.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        if !started {
            let mut loading = self.loading.subscribe();
            let _ = loading.wait_for(|busy| !*busy).await;
            return Ok(RefreshOutcome::Joined);
        }

        let _cycle = CycleGuard { service: self };
        self.status.send_replace(CatalogStatus::Loading);
        let outcome = self.run_discovery_cycle().await;

        let status = if self.engine.snapshot().is_empty() {
            CatalogStatus::NoApplicationsFound
        } else {
            CatalogStatus::Ready
        };
        self.status.send_replace(status);
        outcome
    }

    async fn run_discovery_cycle(&self) -> Result<RefreshOutcome, ServiceError> {
        let discovery = Arc::clone(&self.discovery);
        let enumerated = tokio::task::spawn_blocking(move || discovery.enumerate()).await?;

        let enumeration = match enumerated {
            Ok(enumeration) => enumeration,
            Err(DiscoveryError::NothingDiscovered) => {
                warn!("discovery found nothing; keeping the stored catalog");
                return Ok(RefreshOutcome::NothingDiscovered);
            }
            Err(error) => {
                warn!(%error, "discovery failed; keeping the stored catalog");
                return Ok(RefreshOutcome::NothingDiscovered);
            }
        };

        let db = Arc::clone(&self.db);
        let min_trusted_ratio = self.config.min_trusted_ratio;
        let applied = tokio::task::spawn_blocking(move || {
            let conn = db.lock();
            let stored = catalog_store::count(&conn)?;
            match reconcile::assess(&enumeration, stored, min_trusted_ratio) {
                Trust::Authoritative => {
                    reconcile::reconcile(&conn, &enumeration.apps).map(RefreshOutcome::Reconciled)
                }
                Trust::MergeOnly => {
                    reconcile::merge(&conn, &enumeration.apps).map(RefreshOutcome::Merged)
                }
                Trust::Reject => Ok(RefreshOutcome::NothingDiscovered),
            }
        })
        .await??;

        self.publish().await?;
        Ok(applied)
    }

    /// Launches through the platform and, on success, counts the launch. A failed
    /// store write is logged and leaves the published state unchanged.
    pub async fn launch(&self, id: &str) -> bool {
        let launcher = Arc::clone(&self.launcher);
        let target = id.to_string();
        let launched = tokio::task::spawn_blocking(move || launcher.attempt_launch(&target))
            .await
            .unwrap_or(false);
        if !launched {
            warn!(id, "launch unavailable");
            return false;
        }

        let target = id.to_string();
        let recorded = self
            .write(move |conn| catalog_store::record_launch(conn, &target, now_epoch_secs()))
            .await;
        match recorded {
            Ok(true) => {}
            Ok(false) => warn!(id, "launched app is not in the catalog"),
            Err(error) => error!(id, %error, "failed to record launch"),
        }
        true
    }

    /// Returns the new favorite state, or `None` for unknown ids and failed writes.
    pub async fn toggle_favorite(&self, id: &str) -> Option<bool> {
        let target = id.to_string();
        match self
            .write(move |conn| catalog_store::toggle_favorite(conn, &target))
            .await
        {
            Ok(state) => state,
            Err(error) => {
                error!(id, %error, "failed to toggle favorite");
                None
            }
        }
    }

    pub fn record_search(&self, query: &str) {
        if let Err(error) = self.history.lock().record(query) {
            warn!(%error, "failed to persist search history");
        }
    }

    pub fn search_history(&self) -> Vec<String> {
        self.history.lock().recent_first()
    }

    pub fn clear_search_history(&self) {
        if let Err(error) = self.history.lock().clear() {
            warn!(%error, "failed to clear search history");
        }
    }

    /// Deletes never-launched, non-favorite records older than `retention_days`.
    pub async fn sweep_retention(&self) -> Result<usize, ServiceError> {
        let max_age_secs = i64::from(self.config.retention_days) * 86_400;
        let removed = self
            .write(move |conn| catalog_store::sweep_retention(conn, now_epoch_secs(), max_age_secs))
            .await?;
        if removed > 0 {
            info!(removed, "retention sweep removed stale records");
        }
        Ok(removed)
    }

    pub fn spawn_retention_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if *service.loading.borrow() {
                    continue;
                }
                if let Err(error) = service.sweep_retention().await {
                    warn!(%error, "retention sweep skipped");
                }
            }
        })
    }

    /// Runs a serialized store write and reloads the views under the same lock.
    /// Nothing is republished when the write fails. A reload failure after a
    /// committed write is logged and does not fail the write.
    async fn write<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let seq = Arc::clone(&self.view_seq);
        let (value, reloaded) = tokio::task::spawn_blocking(move || {
            let conn = db.lock();
            let value = op(&*conn)?;
            Ok::<_, StoreError>((value, load_sequenced(&conn, &seq)))
        })
        .await??;

        match reloaded {
            Ok((seq, views)) => {
                self.apply_views(seq, views);
            }
            Err(error) => warn!(%error, "write committed but views could not be reloaded"),
        }
        Ok(value)
    }

    async fn publish(&self) -> Result<usize, ServiceError> {
        let db = Arc::clone(&self.db);
        let seq = Arc::clone(&self.view_seq);
        let (seq, views) =
            tokio::task::spawn_blocking(move || load_sequenced(&db.lock(), &seq)).await??;
        Ok(self.apply_views(seq, views))
    }

    fn publish_blocking(&self) -> Result<usize, ServiceError> {
        let (seq, views) = load_sequenced(&self.db.lock(), &self.view_seq)?;
        Ok(self.apply_views(seq, views))
    }

    /// Publishes `views` unless views loaded later were already published.
    fn apply_views(&self, seq: u64, views: Views) -> usize {
        let total = views.all.len();
        let mut applied = self.applied_seq.lock();
        if seq <= *applied {
            debug!(seq, applied = *applied, "skipping superseded views");
            return total;
        }
        *applied = seq;
        self.favorites.send_replace(Arc::new(views.favorites));
        self.most_used.send_replace(Arc::new(views.most_used));
        self.engine.set_snapshot(Arc::new(views.all));
        total
    }
}

/// Clears the loading flag even when the refresh future is dropped early.
struct CycleGuard<'a> {
    service: &'a CatalogService,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.service.loading.send_replace(false);
    }
}

struct Views {
    all: Vec<ApplicationRecord>,
    favorites: Vec<ApplicationRecord>,
    most_used: Vec<ApplicationRecord>,
}

/// Loads the views and stamps them while the caller still holds the db lock, so
/// sequence order matches store order.
fn load_sequenced(conn: &Connection, seq: &AtomicU64) -> Result<(u64, Views), StoreError> {
    let views = load_views(conn)?;
    Ok((seq.fetch_add(1, Ordering::SeqCst) + 1, views))
}

fn load_views(conn: &Connection) -> Result<Views, StoreError> {
    Ok(Views {
        all: catalog_store::list_records(conn)?,
        favorites: catalog_store::list_favorites(conn)?,
        most_used: catalog_store::list_most_used(conn, MOST_USED_LIMIT)?,
    })
}

fn take_list(list: &ResultList, limit: usize) -> ResultList {
    Arc::new(list.iter().take(limit).cloned().collect())
}
