// wavetable/store.rs
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{TableConfig, Wavetable};
use crate::OscillatorError;

static GLOBAL_STORE: Lazy<Arc<WavetableStore>> = Lazy::new(|| Arc::new(WavetableStore::new()));

struct TableEntry {
    table: Arc<Wavetable>,
    attached: usize,
}

#[derive(Default)]
struct StoreState {
    entries: FxHashMap<TableConfig, TableEntry>,
    bytes_in_use: usize,
    builds: u64,
}

/// Cache of shared cosine tables, one per `TableConfig`.
///
/// Each `attach` hands out a strong reference and bumps the attachment count;
/// the table is built on the first attach and dropped by the store when the
/// count returns to zero, so a later attach rebuilds it from scratch.
/// Attach/detach take a lock and belong on the maintenance path; reading a
/// table through the returned `Arc` needs no synchronisation.
#[derive(Default)]
pub struct WavetableStore {
    state: Mutex<StoreState>,
    byte_budget: Option<usize>,
}

impl WavetableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses to hold more than `bytes` of table data.
    pub fn with_byte_budget(bytes: usize) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            byte_budget: Some(bytes),
        }
    }

    /// Process-wide store for hosts that do not manage their own.
    pub fn global() -> Arc<WavetableStore> {
        Arc::clone(&GLOBAL_STORE)
    }

    pub fn attach(&self, config: TableConfig) -> Result<Arc<Wavetable>, OscillatorError> {
        config.validate()?;
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get_mut(&config) {
            entry.attached += 1;
            return Ok(Arc::clone(&entry.table));
        }

        if let Some(budget) = self.byte_budget {
            if state.bytes_in_use + config.bytes() > budget {
                tracing::error!(
                    size = config.size,
                    bytes = config.bytes(),
                    budget,
                    "wavetable store budget exhausted"
                );
                return Err(OscillatorError::AllocationFailed {
                    samples: config.len(),
                });
            }
        }

        let table = match Wavetable::cosine(config) {
            Ok(table) => Arc::new(table),
            Err(err) => {
                tracing::error!(size = config.size, "failed to build cosine table: {}", err);
                return Err(err);
            }
        };

        state.bytes_in_use += config.bytes();
        state.builds += 1;
        state.entries.insert(
            config,
            TableEntry {
                table: Arc::clone(&table),
                attached: 1,
            },
        );
        tracing::info!(
            size = config.size,
            guard_sample = config.guard_sample,
            "initialized cosine table"
        );

        Ok(table)
    }

    /// Drops one attachment and returns how many remain. The count never
    /// goes below zero: detaching a configuration that is not attached is a
    /// no-op.
    pub fn detach(&self, config: TableConfig) -> usize {
        let mut state = self.state.lock();

        let remaining = match state.entries.get_mut(&config) {
            Some(entry) => {
                entry.attached = entry.attached.saturating_sub(1);
                entry.attached
            }
            None => {
                tracing::warn!(size = config.size, "detach without a matching attach");
                return 0;
            }
        };

        if remaining == 0 {
            state.entries.remove(&config);
            state.bytes_in_use = state.bytes_in_use.saturating_sub(config.bytes());
            tracing::info!(size = config.size, "freed cosine table");
        }

        remaining
    }

    pub fn attach_count(&self, config: TableConfig) -> usize {
        self.state
            .lock()
            .entries
            .get(&config)
            .map_or(0, |entry| entry.attached)
    }

    pub fn is_built(&self, config: TableConfig) -> bool {
        self.state.lock().entries.contains_key(&config)
    }

    /// Total number of tables constructed over the store's lifetime.
    pub fn builds(&self) -> u64 {
        self.state.lock().builds
    }

    pub fn bytes_in_use(&self) -> usize {
        self.state.lock().bytes_in_use
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: TableConfig = TableConfig::new(4096, true);

    #[test]
    fn test_attach_builds_once_and_shares() {
        let store = WavetableStore::new();
        let a = store.attach(CONFIG).unwrap();
        let b = store.attach(CONFIG).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.attach_count(CONFIG), 2);
        assert_eq!(store.builds(), 1);
        assert_eq!(store.bytes_in_use(), CONFIG.bytes());
    }

    #[test]
    fn test_balanced_detach_releases_table() {
        let store = WavetableStore::new();
        let n = 5;
        for _ in 0..n {
            store.attach(CONFIG).unwrap();
        }
        for expected in (0..n).rev() {
            assert_eq!(store.detach(CONFIG), expected);
        }

        assert!(!store.is_built(CONFIG));
        assert_eq!(store.attach_count(CONFIG), 0);
        assert_eq!(store.bytes_in_use(), 0);
    }

    #[test]
    fn test_extra_detach_does_not_underflow() {
        let store = WavetableStore::new();
        store.attach(CONFIG).unwrap();
        assert_eq!(store.detach(CONFIG), 0);
        assert_eq!(store.detach(CONFIG), 0);
        assert_eq!(store.detach(CONFIG), 0);
        assert!(!store.is_built(CONFIG));

        // The next attach starts over with a fresh build and a count of one.
        store.attach(CONFIG).unwrap();
        assert_eq!(store.builds(), 2);
        assert_eq!(store.attach_count(CONFIG), 1);
        assert_eq!(store.detach(CONFIG), 0);
    }

    #[test]
    fn test_configurations_are_independent() {
        let store = WavetableStore::new();
        let small = TableConfig::new(4096, false);
        let large = TableConfig::new(65536, false);

        let a = store.attach(small).unwrap();
        let b = store.attach(large).unwrap();
        assert_eq!(a.size(), 4096);
        assert_eq!(b.size(), 65536);

        store.detach(small);
        assert!(!store.is_built(small));
        assert!(store.is_built(large));
    }

    #[test]
    fn test_budget_exhaustion_reports_allocation_failure() {
        let store = WavetableStore::with_byte_budget(TableConfig::new(4096, false).bytes());
        store.attach(TableConfig::new(4096, false)).unwrap();

        assert_eq!(
            store.attach(TableConfig::new(16384, false)).unwrap_err(),
            OscillatorError::AllocationFailed { samples: 16384 }
        );
        assert!(!store.is_built(TableConfig::new(16384, false)));
        assert_eq!(store.attach_count(TableConfig::new(16384, false)), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let store = WavetableStore::new();
        assert!(store.attach(TableConfig::new(3000, false)).is_err());
        assert_eq!(store.builds(), 0);
    }

    #[test]
    fn test_concurrent_attach_and_detach() {
        let store = Arc::new(WavetableStore::new());
        let threads = 8;
        let rounds = 500;

        // An anchor attachment keeps the table alive: no thread may rebuild it.
        let anchor = store.attach(CONFIG).unwrap();
        std::thread::scope(|scope| {
            for _ in 0..threads {
                let store = Arc::clone(&store);
                let anchor = Arc::clone(&anchor);
                scope.spawn(move || {
                    for _ in 0..rounds {
                        let table = store.attach(CONFIG).unwrap();
                        assert!(Arc::ptr_eq(&table, &anchor));
                        assert_eq!(table.at(0), 1.0);
                        store.detach(CONFIG);
                    }
                });
            }
        });
        assert_eq!(store.builds(), 1);
        assert_eq!(store.attach_count(CONFIG), 1);
        assert_eq!(store.detach(CONFIG), 0);
        drop(anchor);

        // Without an anchor the table may come and go, but two attachments
        // held at the same time always share one build.
        let builds_before = store.builds();
        std::thread::scope(|scope| {
            for _ in 0..threads {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for _ in 0..rounds {
                        let first = store.attach(CONFIG).unwrap();
                        let second = store.attach(CONFIG).unwrap();
                        assert!(Arc::ptr_eq(&first, &second));
                        store.detach(CONFIG);
                        store.detach(CONFIG);
                    }
                });
            }
        });
        let builds = store.builds() - builds_before;
        assert!(builds >= 1 && builds <= (threads * rounds) as u64);
        assert_eq!(store.attach_count(CONFIG), 0);
        assert!(!store.is_built(CONFIG));
        assert_eq!(store.bytes_in_use(), 0);
    }

    #[test]
    fn test_tables_outlive_detach_for_existing_readers() {
        let store = WavetableStore::new();
        let table = store.attach(CONFIG).unwrap();
        store.detach(CONFIG);
        // The store no longer tracks it, but the reader's reference is intact.
        assert_eq!(table.at(0), 1.0);
    }
}
