//! Registry of live entries.
//!
//! Constructed once at startup and shared by reference (`Arc<Registry>`) with
//! every `Loader`. No global state, so it is testable in isolation. Entry
//! identities are issued here, so they stay unique however many loaders
//! commit into one registry.
//!
//! The lock is held only across list mutation. Device I/O never happens under
//! it: entries are built before `insert` and torn down after `drain`.

use crate::entry::{Entry, EntryId, EntrySummary};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Mutex-guarded, insertion-ordered collection of committed entries.
#[derive(Debug)]
pub struct Registry {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve a fresh entry identity. Never repeats within this registry.
    pub fn next_id(&self) -> EntryId {
        EntryId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Append a fully built entry.
    pub fn insert(&self, entry: Entry) {
        let id = entry.id();
        let mut entries = self.lock();
        entries.push(entry);
        debug!("Registered {} ({} live)", id, entries.len());
    }

    /// Take every entry out, leaving the registry empty.
    ///
    /// A single lock hold; the caller tears the entries down afterwards.
    pub fn drain(&self) -> Vec<Entry> {
        let drained = std::mem::take(&mut *self.lock());
        debug!("Drained {} entries", drained.len());
        drained
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no entry is live.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Diagnostic snapshot, in insertion order.
    pub fn snapshot(&self) -> Vec<EntrySummary> {
        self.lock().iter().map(Entry::summary).collect()
    }

    // A panic while the lock is held cannot leave the Vec half-updated
    // (push and take are the only mutations), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DeviceLocation;
    use crate::handle::OwnedExpander;
    use evo_common::expander::driver::{BusHandle, DriverError, ExpanderDriver, ExpanderHandle};
    use evo_common::expander::types::{ChipVariant, ExpanderConfig};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingDriver {
        destroyed: AtomicUsize,
    }

    impl ExpanderDriver for CountingDriver {
        fn create_expander(
            &self,
            _bus: &BusHandle,
            address: u16,
            _variant: ChipVariant,
            _config: &ExpanderConfig,
        ) -> Result<ExpanderHandle, DriverError> {
            Ok(ExpanderHandle::from_raw(u64::from(address)))
        }

        fn destroy_expander(&self, _handle: ExpanderHandle) -> Result<(), DriverError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn entry(driver: &Arc<CountingDriver>, id: u64) -> Entry {
        let dyn_driver: Arc<dyn ExpanderDriver> = driver.clone();
        Entry::new(
            EntryId(id),
            DeviceLocation {
                bus_id: 0,
                address: 0x20,
                variant: ChipVariant::Mcp23008,
            },
            OwnedExpander::new(ExpanderHandle::from_raw(id), dyn_driver),
            ExpanderConfig::new(100, 0),
            None,
        )
    }

    #[test]
    fn insert_preserves_order() {
        let driver = Arc::new(CountingDriver::default());
        let registry = Registry::new();
        for id in 1..=3 {
            registry.insert(entry(&driver, id));
        }
        assert_eq!(registry.len(), 3);
        let ids: Vec<_> = registry.snapshot().iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn drain_empties_and_second_drain_is_empty() {
        let driver = Arc::new(CountingDriver::default());
        let registry = Registry::new();
        registry.insert(entry(&driver, 1));
        registry.insert(entry(&driver, 2));

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert!(registry.drain().is_empty());

        // Nothing released until the drained entries are dropped.
        assert_eq!(driver.destroyed.load(Ordering::SeqCst), 0);
        drop(drained);
        assert_eq!(driver.destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn ids_start_at_one_and_never_repeat() {
        let registry = Registry::new();
        assert_eq!(registry.next_id(), EntryId(1));

        let ids: HashSet<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = &registry;
                    s.spawn(move || (0..100).map(|_| registry.next_id()).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        assert_eq!(ids.len(), 800);
        assert!(!ids.contains(&EntryId(1)));
    }

    #[test]
    fn dropping_registry_releases_entries() {
        let driver = Arc::new(CountingDriver::default());
        let registry = Registry::new();
        registry.insert(entry(&driver, 1));
        drop(registry);
        assert_eq!(driver.destroyed.load(Ordering::SeqCst), 1);
    }
}
