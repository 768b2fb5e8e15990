//! Loader: builds entries and tears them down.
//!
//! `Loader::create` validates a request, acquires the bus, the expander and
//! (optionally) the indicator bank in that order, and only then commits the
//! entry into the shared [`Registry`]. Every acquired resource is held by an
//! owned handle, so an early return on any step drops what was acquired so far
//! in reverse order. The registry lock is taken for the final insert only.

use crate::driver_registry::Backend;
use crate::entry::{DeviceLocation, Entry, EntryId, EntrySummary, IndicatorBank};
use crate::handle::{OwnedExpander, OwnedIndicatorBank};
use crate::registry::Registry;
use evo_common::consts::DEFAULT_INDICATOR_PREFIX;
use evo_common::expander::driver::{DriverError, LoadError};
use evo_common::expander::types::{ChipVariant, ExpanderConfig, IndicatorConfig, Request};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a bulk teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Entries torn down.
    pub entries: usize,
    /// Individual releases that failed.
    pub failures: usize,
}

/// Entry builder and teardown path over one backend and one registry.
pub struct Loader {
    backend: Backend,
    registry: Arc<Registry>,
    indicator_prefix: String,
}

impl Loader {
    /// Create a loader committing into `registry`.
    pub fn new(backend: Backend, registry: Arc<Registry>) -> Self {
        Self {
            backend,
            registry,
            indicator_prefix: DEFAULT_INDICATOR_PREFIX.to_string(),
        }
    }

    /// Use `prefix` for synthesized indicator names.
    pub fn with_indicator_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.indicator_prefix = prefix.into();
        self
    }

    /// Shared registry this loader commits into.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Instantiate the device described by `request` and register it.
    ///
    /// # Errors
    /// - `InvalidArgument` - bad channel count or GPIO range; nothing touched
    /// - `DeviceNotFound` - bus does not exist
    /// - `DriverInitFailed` - expander rejected
    /// - `IndicatorInitFailed` - bank rejected; expander already released
    /// - `AllocationFailed` - backend out of resources at any step
    ///
    /// On any error the registry is unchanged and nothing stays acquired.
    pub fn create(&self, request: &Request) -> Result<EntryId, LoadError> {
        let variant = request.validate().inspect_err(|e| error!("{}", e))?;

        let bus = self
            .backend
            .buses
            .resolve(request.bus_id)
            .map_err(|e| match e {
                DriverError::OutOfResources(msg) => LoadError::AllocationFailed(msg),
                _ => {
                    error!("adapter {} not found", request.bus_id);
                    LoadError::DeviceNotFound(request.bus_id)
                }
            })?;

        let expander_config = ExpanderConfig::new(request.base_offset, request.pullups);
        let expander = self
            .backend
            .expanders
            .create_expander(&bus, request.device_address, variant, &expander_config)
            .map_err(|e| {
                error!("failed to load driver: {}", e);
                match e {
                    DriverError::OutOfResources(msg) => LoadError::AllocationFailed(msg),
                    other => LoadError::DriverInitFailed(other.to_string()),
                }
            })?;
        let expander = OwnedExpander::new(expander, Arc::clone(&self.backend.expanders));

        // Dropping `expander` on `?` below rolls the device back.
        let indicators = if request.indicators {
            Some(self.load_indicators(request.base_offset, variant)?)
        } else {
            None
        };

        let id = self.registry.next_id();
        let location = DeviceLocation {
            bus_id: request.bus_id,
            address: request.device_address,
            variant,
        };
        self.registry.insert(Entry::new(
            id,
            location,
            expander,
            expander_config,
            indicators,
        ));

        info!(
            "device at adapter {} device 0x{:02x} instantiated ({}, {})",
            request.bus_id, request.device_address, variant, id
        );
        Ok(id)
    }

    fn load_indicators(
        &self,
        base_offset: u32,
        variant: ChipVariant,
    ) -> Result<IndicatorBank, LoadError> {
        let config = IndicatorConfig::derive(&self.indicator_prefix, base_offset, variant);
        let handle = self
            .backend
            .indicators
            .create_indicator_bank(&config.descriptors)
            .map_err(|e| {
                error!("failed to initialize LED device: {}", e);
                match e {
                    DriverError::OutOfResources(msg) => LoadError::AllocationFailed(msg),
                    other => LoadError::IndicatorInitFailed(other.to_string()),
                }
            })?;
        info!("LED initialized ({} outputs from gpio {})", config.len(), base_offset);

        Ok(IndicatorBank::new(
            OwnedIndicatorBank::new(handle, Arc::clone(&self.backend.indicators)),
            config,
        ))
    }

    /// Tear down every registered entry.
    ///
    /// The registry is drained under one lock hold; releases run afterwards.
    /// A failing release is counted and logged, never aborts the others.
    pub fn shutdown(&self) -> ShutdownSummary {
        let entries = self.registry.drain();
        if entries.is_empty() {
            return ShutdownSummary::default();
        }

        info!("Tearing down {} entries", entries.len());
        let mut summary = ShutdownSummary::default();
        for entry in entries {
            let report = entry.teardown();
            summary.entries += 1;
            summary.failures += report.failures();
        }

        if summary.failures > 0 {
            warn!(
                "Teardown finished with {} failed releases over {} entries",
                summary.failures, summary.entries
            );
        } else {
            info!("Teardown finished: {} entries released", summary.entries);
        }
        summary
    }

    /// Diagnostic view of the registry.
    pub fn snapshot(&self) -> Vec<EntrySummary> {
        self.registry.snapshot()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True when no entry is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::{SimEvent, SimulationBackend};
    use evo_common::expander::config::SimulationConfig;

    fn setup() -> (Arc<SimulationBackend>, Loader) {
        let sim = Arc::new(SimulationBackend::new(&SimulationConfig::default()));
        let loader = Loader::new(Backend::from_shared(sim.clone()), Arc::new(Registry::new()));
        (sim, loader)
    }

    #[test]
    fn create_without_indicators() {
        let (sim, loader) = setup();
        let id = loader.create(&Request::new(0, 0x20, 100, 8)).unwrap();
        assert_eq!(id, EntryId(1));
        assert_eq!(loader.len(), 1);
        assert_eq!(sim.stats().live_expanders, 1);
        assert_eq!(sim.stats().live_banks, 0);
        assert!(loader.snapshot()[0].indicators.is_none());
    }

    #[test]
    fn invalid_request_touches_nothing() {
        let (sim, loader) = setup();
        let result = loader.create(&Request::new(0, 0x20, 100, 7));
        assert!(matches!(result, Err(LoadError::InvalidArgument(_))));
        assert!(loader.is_empty());
        assert!(sim.events().is_empty());
    }

    #[test]
    fn indicator_failure_rolls_back_expander() {
        let (sim, loader) = setup();
        sim.fail_next_indicator_banks(1);

        let request = Request::new(0, 0x20, 100, 16).with_indicators(true);
        let result = loader.create(&request);
        assert!(matches!(result, Err(LoadError::IndicatorInitFailed(_))));
        assert!(loader.is_empty());

        let stats = sim.stats();
        assert_eq!(stats.expanders_created, 1);
        assert_eq!(stats.expanders_destroyed, 1);
        assert_eq!(stats.double_releases, 0);
    }

    #[test]
    fn shutdown_releases_in_reverse_order() {
        let (sim, loader) = setup();
        loader
            .create(&Request::new(0, 0x20, 100, 8).with_indicators(true))
            .unwrap();

        let summary = loader.shutdown();
        assert_eq!(summary, ShutdownSummary { entries: 1, failures: 0 });

        let events = sim.events();
        let (expander, bank) = match events[..2] {
            [SimEvent::ExpanderCreated(e), SimEvent::BankCreated(b)] => (e, b),
            _ => panic!("unexpected events {events:?}"),
        };
        assert_eq!(
            events[2..],
            [SimEvent::BankDestroyed(bank), SimEvent::ExpanderDestroyed(expander)]
        );
    }

    #[test]
    fn custom_indicator_prefix() {
        let (_sim, loader) = setup();
        let loader = loader.with_indicator_prefix("board");
        loader
            .create(&Request::new(0, 0x20, 40, 8).with_indicators(true))
            .unwrap();
        let names = loader.snapshot()[0].indicators.clone().unwrap();
        assert_eq!(names[0], "board:40");
    }
}
