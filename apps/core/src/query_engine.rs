use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::trace;

use crate::model::ApplicationRecord;
use crate::ranker;

pub type Snapshot = Arc<Vec<ApplicationRecord>>;
pub type ResultList = Arc<Vec<ApplicationRecord>>;

/// Holds the live query and catalog snapshot and publishes the ranked list for them.
///
/// Every trigger takes a new generation when it starts. A recompute only publishes
/// if its generation is still the newest once ranking is done, so results from a
/// stale query or snapshot are dropped even when they finish last.
#[derive(Clone)]
pub struct QueryEngine {
    inner: Arc<Inner>,
}

struct Inner {
    query: Mutex<String>,
    snapshot: Mutex<Snapshot>,
    generation: AtomicU64,
    publish: Mutex<()>,
    results: watch::Sender<ResultList>,
    debounce: Duration,
}

impl QueryEngine {
    pub fn new(debounce: Duration) -> Self {
        let (results, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(Inner {
                query: Mutex::new(String::new()),
                snapshot: Mutex::new(Arc::new(Vec::new())),
                generation: AtomicU64::new(0),
                publish: Mutex::new(()),
                results,
                debounce,
            }),
        }
    }

    /// Latest published list is replayed to every new subscriber.
    pub fn subscribe(&self) -> watch::Receiver<ResultList> {
        self.inner.results.subscribe()
    }

    pub fn current_results(&self) -> ResultList {
        self.inner.results.borrow().clone()
    }

    pub fn query(&self) -> String {
        self.inner.query.lock().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.lock().clone()
    }

    /// Debounced: rapid successive calls publish only the last query's results.
    /// Must be called from within a tokio runtime.
    pub fn set_query(&self, query: &str) {
        *self.inner.query.lock() = query.to_string();
        self.trigger(self.inner.debounce);
    }

    /// Must be called from within a tokio runtime.
    pub fn set_snapshot(&self, snapshot: Snapshot) {
        *self.inner.snapshot.lock() = snapshot;
        self.trigger(Duration::ZERO);
    }

    /// Synchronous ranking of the current inputs without publishing.
    pub fn evaluate(&self) -> Vec<ApplicationRecord> {
        let query = self.query();
        let snapshot = self.snapshot();
        ranker::rank(&snapshot, &query)
    }

    fn trigger(&self, delay: Duration) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = self.query();
        let snapshot = self.snapshot();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
                if !inner.is_current(generation) {
                    trace!(generation, "recompute superseded during debounce");
                    return;
                }
            }

            let ranked = ranker::rank(&snapshot, &query);

            let _guard = inner.publish.lock();
            if inner.is_current(generation) {
                inner.results.send_replace(Arc::new(ranked));
            } else {
                trace!(generation, "dropping stale recompute");
            }
        });
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}
