//! Simulated device table.
//!
//! Pure bookkeeping, no locking: `SimulationBackend` wraps a `SimState` in a
//! mutex and calls into it.

use evo_common::consts::MAX_DEVICE_ADDRESS;
use evo_common::expander::driver::DriverError;
use evo_common::expander::types::{ChipVariant, IndicatorDescriptor};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Journal record of a device table change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Expander instantiated.
    ExpanderCreated(u64),
    /// Expander destroyed.
    ExpanderDestroyed(u64),
    /// Indicator bank instantiated.
    BankCreated(u64),
    /// Indicator bank destroyed.
    BankDestroyed(u64),
}

/// Counters over the backend's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Successful expander instantiations.
    pub expanders_created: usize,
    /// Successful expander destroys.
    pub expanders_destroyed: usize,
    /// Successful bank instantiations.
    pub banks_created: usize,
    /// Successful bank destroys.
    pub banks_destroyed: usize,
    /// Destroy calls with an unknown or already destroyed handle.
    pub double_releases: usize,
    /// Expanders currently live.
    pub live_expanders: usize,
    /// Banks currently live.
    pub live_banks: usize,
}

#[derive(Debug)]
pub(super) struct SimExpander {
    pub bus_id: u32,
    pub address: u16,
    pub gpios: Range<u32>,
}

#[derive(Debug)]
struct SimBank {
    names: Vec<String>,
}

#[derive(Debug)]
pub(super) struct SimState {
    next_handle: u64,
    max_devices: usize,
    expanders: HashMap<u64, SimExpander>,
    banks: HashMap<u64, SimBank>,
    events: Vec<SimEvent>,
    stats: SimStats,
    /// Number of upcoming bank instantiations to reject.
    pub fail_bank_creates: usize,
    /// Number of upcoming destroys (of either kind) to reject.
    pub fail_destroys: usize,
}

impl SimState {
    pub fn new(max_devices: usize) -> Self {
        Self {
            next_handle: 1,
            max_devices,
            expanders: HashMap::new(),
            banks: HashMap::new(),
            events: Vec::new(),
            stats: SimStats::default(),
            fail_bank_creates: 0,
            fail_destroys: 0,
        }
    }

    pub fn expander(
        bus_id: u32,
        address: u16,
        variant: ChipVariant,
        base_offset: u32,
    ) -> Result<SimExpander, DriverError> {
        let end = base_offset
            .checked_add(u32::from(variant.channel_count()))
            .ok_or_else(|| DriverError::Rejected(format!("gpio base {base_offset} overflows")))?;
        Ok(SimExpander {
            bus_id,
            address,
            gpios: base_offset..end,
        })
    }

    fn live(&self) -> usize {
        self.expanders.len() + self.banks.len()
    }

    fn ensure_capacity(&self) -> Result<(), DriverError> {
        if self.live() >= self.max_devices {
            return Err(DriverError::OutOfResources(format!(
                "{} devices live (max {})",
                self.live(),
                self.max_devices
            )));
        }
        Ok(())
    }

    fn allocate_handle(&mut self) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        raw
    }

    pub fn add_expander(&mut self, device: SimExpander) -> Result<u64, DriverError> {
        if device.address > MAX_DEVICE_ADDRESS {
            return Err(DriverError::Rejected(format!(
                "address 0x{:02x} out of range",
                device.address
            )));
        }
        if let Some(busy) = self
            .expanders
            .values()
            .find(|d| d.bus_id == device.bus_id && d.address == device.address)
        {
            return Err(DriverError::Rejected(format!(
                "address 0x{:02x} busy on bus {}",
                busy.address, busy.bus_id
            )));
        }
        if let Some(other) = self
            .expanders
            .values()
            .find(|d| d.gpios.start < device.gpios.end && device.gpios.start < d.gpios.end)
        {
            return Err(DriverError::Rejected(format!(
                "gpio range {:?} overlaps {:?}",
                device.gpios, other.gpios
            )));
        }
        self.ensure_capacity()?;

        let raw = self.allocate_handle();
        self.expanders.insert(raw, device);
        self.events.push(SimEvent::ExpanderCreated(raw));
        self.stats.expanders_created += 1;
        Ok(raw)
    }

    pub fn remove_expander(&mut self, raw: u64) -> Result<(), DriverError> {
        if !self.expanders.contains_key(&raw) {
            self.stats.double_releases += 1;
            return Err(DriverError::UnknownHandle(raw));
        }
        self.take_destroy_fault(raw)?;
        self.expanders.remove(&raw);
        self.events.push(SimEvent::ExpanderDestroyed(raw));
        self.stats.expanders_destroyed += 1;
        Ok(())
    }

    pub fn add_bank(&mut self, descriptors: &[IndicatorDescriptor]) -> Result<u64, DriverError> {
        if self.fail_bank_creates > 0 {
            self.fail_bank_creates -= 1;
            return Err(DriverError::Rejected("injected indicator failure".to_string()));
        }
        if descriptors.is_empty() {
            return Err(DriverError::Rejected("empty indicator bank".to_string()));
        }

        let taken: HashSet<&str> = self
            .banks
            .values()
            .flat_map(|b| b.names.iter().map(String::as_str))
            .collect();
        let mut names = HashSet::new();
        for d in descriptors {
            if taken.contains(d.name.as_str()) || !names.insert(d.name.as_str()) {
                return Err(DriverError::Rejected(format!(
                    "indicator '{}' already registered",
                    d.name
                )));
            }
            if !self.expanders.values().any(|e| e.gpios.contains(&d.pin)) {
                return Err(DriverError::Rejected(format!(
                    "gpio {} not provided by any expander",
                    d.pin
                )));
            }
        }
        self.ensure_capacity()?;

        let raw = self.allocate_handle();
        self.banks.insert(
            raw,
            SimBank {
                names: descriptors.iter().map(|d| d.name.clone()).collect(),
            },
        );
        self.events.push(SimEvent::BankCreated(raw));
        self.stats.banks_created += 1;
        Ok(raw)
    }

    pub fn remove_bank(&mut self, raw: u64) -> Result<(), DriverError> {
        if !self.banks.contains_key(&raw) {
            self.stats.double_releases += 1;
            return Err(DriverError::UnknownHandle(raw));
        }
        self.take_destroy_fault(raw)?;
        self.banks.remove(&raw);
        self.events.push(SimEvent::BankDestroyed(raw));
        self.stats.banks_destroyed += 1;
        Ok(())
    }

    fn take_destroy_fault(&mut self, raw: u64) -> Result<(), DriverError> {
        if self.fail_destroys > 0 {
            self.fail_destroys -= 1;
            return Err(DriverError::Rejected(format!(
                "injected destroy failure for #{raw}"
            )));
        }
        Ok(())
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            live_expanders: self.expanders.len(),
            live_banks: self.banks.len(),
            ..self.stats
        }
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }
}
