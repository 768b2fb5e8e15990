//! Entry: the unit of ownership for one expander and its optional
//! indicator bank.
//!
//! Field order matters: Rust drops fields in declaration order, so the
//! indicator bank is declared before the expander it is built on. Dropping an
//! `Entry` therefore releases in reverse acquisition order, same as
//! [`Entry::teardown`].

use crate::handle::{OwnedExpander, OwnedIndicatorBank};
use evo_common::expander::driver::DriverError;
use evo_common::expander::types::{ChipVariant, ExpanderConfig, IndicatorConfig};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Identity of a committed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

/// Where the expander lives on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLocation {
    /// Bus number.
    pub bus_id: u32,
    /// Device address.
    pub address: u16,
    /// Instantiated part.
    pub variant: ChipVariant,
}

/// An indicator bank together with the layout it was created from.
///
/// Pairing the two makes "config present iff handle present" structural.
#[derive(Debug)]
pub struct IndicatorBank {
    handle: OwnedIndicatorBank,
    config: IndicatorConfig,
}

impl IndicatorBank {
    /// Bundle an acquired bank with its layout.
    pub fn new(handle: OwnedIndicatorBank, config: IndicatorConfig) -> Self {
        Self { handle, config }
    }

    /// Derived per-channel layout.
    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Driver-assigned identifier of the bank.
    pub fn raw(&self) -> u64 {
        self.handle.raw()
    }
}

/// One fully acquired device.
#[derive(Debug)]
pub struct Entry {
    id: EntryId,
    location: DeviceLocation,
    indicators: Option<IndicatorBank>,
    expander: OwnedExpander,
    expander_config: ExpanderConfig,
}

impl Entry {
    /// Assemble an entry from already acquired resources.
    pub fn new(
        id: EntryId,
        location: DeviceLocation,
        expander: OwnedExpander,
        expander_config: ExpanderConfig,
        indicators: Option<IndicatorBank>,
    ) -> Self {
        Self {
            id,
            location,
            indicators,
            expander,
            expander_config,
        }
    }

    /// Entry identity.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Bus placement.
    pub fn location(&self) -> DeviceLocation {
        self.location
    }

    /// Configuration the expander was created with.
    pub fn expander_config(&self) -> &ExpanderConfig {
        &self.expander_config
    }

    /// Driver-assigned identifier of the expander.
    pub fn expander_raw(&self) -> u64 {
        self.expander.raw()
    }

    /// Indicator bank, if one was requested.
    pub fn indicators(&self) -> Option<&IndicatorBank> {
        self.indicators.as_ref()
    }

    /// Indicator layout, present iff an indicator bank is held.
    pub fn indicator_config(&self) -> Option<&IndicatorConfig> {
        self.indicators.as_ref().map(IndicatorBank::config)
    }

    /// Diagnostic view of the entry.
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id,
            bus_id: self.location.bus_id,
            address: self.location.address,
            variant: self.location.variant,
            base_offset: self.expander_config.base_offset,
            pullups: self.expander_config.pullups(),
            indicators: self
                .indicator_config()
                .map(|c| c.names().map(str::to_string).collect()),
        }
    }

    /// Release the indicator bank (if any), then the expander.
    ///
    /// Both releases are attempted even if the first fails.
    pub fn teardown(self) -> TeardownReport {
        let Self {
            id,
            location,
            indicators,
            expander,
            ..
        } = self;

        let indicator = indicators.map(|bank| bank.handle.release());
        if let Some(Err(e)) = &indicator {
            warn!("{}: failed to release indicator bank: {}", id, e);
        }

        let expander = expander.release();
        match &expander {
            Ok(()) => info!(
                "{}: device at adapter {} device 0x{:02x} removed",
                id, location.bus_id, location.address
            ),
            Err(e) => warn!("{}: failed to release expander: {}", id, e),
        }

        TeardownReport {
            id,
            indicator,
            expander,
        }
    }
}

/// Outcome of tearing down one entry.
#[derive(Debug)]
pub struct TeardownReport {
    /// Entry that was torn down.
    pub id: EntryId,
    /// Indicator release result, `None` when there was no bank.
    pub indicator: Option<Result<(), DriverError>>,
    /// Expander release result.
    pub expander: Result<(), DriverError>,
}

impl TeardownReport {
    /// Number of releases that failed.
    pub fn failures(&self) -> usize {
        let indicator = matches!(self.indicator, Some(Err(_))) as usize;
        indicator + self.expander.is_err() as usize
    }

    /// True when every release succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Serializable snapshot of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    /// Entry identity.
    pub id: EntryId,
    /// Bus number.
    pub bus_id: u32,
    /// Device address.
    pub address: u16,
    /// Instantiated part.
    pub variant: ChipVariant,
    /// GPIO number of channel 0.
    pub base_offset: u32,
    /// Pull-up bitmask.
    pub pullups: u16,
    /// Indicator names, when a bank is held.
    pub indicators: Option<Vec<String>>,
}
