//! Simulation backend implementation.
//!
//! The `SimulationBackend` implements all three collaborator traits over an
//! in-memory device table.

use super::state::{SimEvent, SimState, SimStats};
use evo_common::expander::config::SimulationConfig;
use evo_common::expander::driver::{
    BusHandle, BusLookup, DriverError, ExpanderDriver, ExpanderHandle, IndicatorDriver,
    IndicatorHandle,
};
use evo_common::expander::types::{ChipVariant, ExpanderConfig, IndicatorDescriptor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// In-memory bus and device model.
pub struct SimulationBackend {
    /// Bus id -> bus name
    buses: HashMap<u32, String>,
    /// Device table
    state: Mutex<SimState>,
    /// Simulated instantiation latency in microseconds
    io_delay_us: AtomicU64,
}

impl SimulationBackend {
    /// Create a backend with the configured buses and device limit.
    pub fn new(config: &SimulationConfig) -> Self {
        let buses: HashMap<u32, String> = config
            .buses
            .iter()
            .map(|b| (b.id, b.name.clone()))
            .collect();

        info!(
            "Simulation backend: {} buses, max {} devices",
            buses.len(),
            config.max_devices
        );

        Self {
            buses,
            state: Mutex::new(SimState::new(config.max_devices)),
            io_delay_us: AtomicU64::new(0),
        }
    }

    /// Reject the next `count` indicator bank instantiations.
    pub fn fail_next_indicator_banks(&self, count: usize) {
        self.lock().fail_bank_creates = count;
    }

    /// Reject the next `count` destroy calls (either kind).
    ///
    /// A rejected destroy leaves the device live.
    pub fn fail_next_destroys(&self, count: usize) {
        self.lock().fail_destroys = count;
    }

    /// Block every instantiation for `delay` before touching the table.
    pub fn set_io_delay(&self, delay: Duration) {
        let micros = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        self.io_delay_us.store(micros, Ordering::Relaxed);
    }

    /// Lifetime counters and live device counts.
    pub fn stats(&self) -> SimStats {
        self.lock().stats()
    }

    /// Journal of every successful create and destroy, in order.
    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().events().to_vec()
    }

    fn simulate_io(&self) {
        let micros = self.io_delay_us.load(Ordering::Relaxed);
        if micros > 0 {
            std::thread::sleep(Duration::from_micros(micros));
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BusLookup for SimulationBackend {
    fn resolve(&self, bus_id: u32) -> Result<BusHandle, DriverError> {
        self.buses
            .get(&bus_id)
            .map(|name| BusHandle::new(bus_id, name.as_str()))
            .ok_or_else(|| DriverError::NotFound(format!("bus {bus_id}")))
    }
}

impl ExpanderDriver for SimulationBackend {
    fn create_expander(
        &self,
        bus: &BusHandle,
        address: u16,
        variant: ChipVariant,
        config: &ExpanderConfig,
    ) -> Result<ExpanderHandle, DriverError> {
        if !self.buses.contains_key(&bus.id()) {
            return Err(DriverError::NotFound(format!("bus {}", bus.id())));
        }
        self.simulate_io();

        let device = SimState::expander(bus.id(), address, variant, config.base_offset)?;
        let raw = self.lock().add_expander(device)?;
        debug!(
            "Simulated {} at {} 0x{:02x} (gpio {}, pullups 0x{:04x}) -> #{}",
            variant,
            bus.name(),
            address,
            config.base_offset,
            config.pullups(),
            raw
        );
        Ok(ExpanderHandle::from_raw(raw))
    }

    fn destroy_expander(&self, handle: ExpanderHandle) -> Result<(), DriverError> {
        self.lock().remove_expander(handle.raw())?;
        debug!("Simulated expander {} destroyed", handle);
        Ok(())
    }
}

impl IndicatorDriver for SimulationBackend {
    fn create_indicator_bank(
        &self,
        descriptors: &[IndicatorDescriptor],
    ) -> Result<IndicatorHandle, DriverError> {
        self.simulate_io();

        let raw = self.lock().add_bank(descriptors)?;
        debug!("Simulated indicator bank of {} -> #{}", descriptors.len(), raw);
        Ok(IndicatorHandle::from_raw(raw))
    }

    fn destroy_indicator_bank(&self, handle: IndicatorHandle) -> Result<(), DriverError> {
        self.lock().remove_bank(handle.raw())?;
        debug!("Simulated indicator bank {} destroyed", handle);
        Ok(())
    }
}
