use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::config::Config;
use crate::domain::upload::ModelStore;
use crate::report::BenchmarkReport;

/// Shared across all workers of the server
pub struct AppState {
    pub config: Config,
    pub store: ModelStore,
    runs: Mutex<LruCache<u64, Arc<BenchmarkReport>>>,
    next_run: AtomicU64,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let capacity = NonZeroUsize::new(config.run_cache_size).unwrap_or(NonZeroUsize::MIN);
        AppState {
            store: ModelStore::new(&config.upload_dir, config.model_size_limit),
            config,
            runs: Mutex::new(LruCache::new(capacity)),
            next_run: AtomicU64::new(1),
        }
    }

    pub fn next_run_id(&self) -> u64 {
        self.next_run.fetch_add(1, Ordering::SeqCst)
    }

    /// Keep a finished report; the least recently viewed one is evicted when full
    pub fn remember(&self, report: BenchmarkReport) -> Arc<BenchmarkReport> {
        let report = Arc::new(report);
        self.runs.lock().put(report.run_id, Arc::clone(&report));
        report
    }

    pub fn run(&self, run_id: u64) -> Option<Arc<BenchmarkReport>> {
        self.runs.lock().get(&run_id).cloned()
    }
}
