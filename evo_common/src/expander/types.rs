//! Expander request and configuration types.
//!
//! - `Request` - One parsed creation command (transient)
//! - `ChipVariant` - Expander part selected by channel count
//! - `ExpanderConfig` - Platform configuration handed to the expander driver
//! - `IndicatorDescriptor` / `IndicatorConfig` - Derived indicator bank layout

use crate::consts::{CHANNELS_16, CHANNELS_8, MAX_CHIP_SLOTS};
use crate::expander::driver::LoadError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single creation request as accepted by the control endpoint.
///
/// Not retained after `create` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Bus (adapter) number.
    pub bus_id: u32,
    /// Device address on the bus.
    pub device_address: u16,
    /// First GPIO number assigned to channel 0.
    pub base_offset: u32,
    /// Requested channel count; only 8 and 16 are valid.
    pub channel_count: u32,
    /// Pull-up bitmask, one bit per channel.
    pub pullups: u16,
    /// Whether an indicator bank should be built on top of the channels.
    pub indicators: bool,
}

impl Request {
    /// Request without pull-ups or indicators.
    pub fn new(bus_id: u32, device_address: u16, base_offset: u32, channel_count: u32) -> Self {
        Self {
            bus_id,
            device_address,
            base_offset,
            channel_count,
            pullups: 0,
            indicators: false,
        }
    }

    /// Set the pull-up bitmask.
    pub fn with_pullups(mut self, pullups: u16) -> Self {
        self.pullups = pullups;
        self
    }

    /// Request (or not) an indicator bank.
    pub fn with_indicators(mut self, indicators: bool) -> Self {
        self.indicators = indicators;
        self
    }

    /// Check the request without touching any resource.
    ///
    /// Returns the chip variant selected by `channel_count`.
    ///
    /// # Errors
    /// `LoadError::InvalidArgument` if the channel count is not 8 or 16, or
    /// if the GPIO range `base_offset..base_offset + channel_count` does not
    /// fit in a `u32`.
    pub fn validate(&self) -> Result<ChipVariant, LoadError> {
        let variant = ChipVariant::from_channel_count(self.channel_count).ok_or_else(|| {
            LoadError::InvalidArgument(format!(
                "gpio length must be 8 or 16 (got {})",
                self.channel_count
            ))
        })?;

        if self
            .base_offset
            .checked_add(u32::from(variant.channel_count()))
            .is_none()
        {
            return Err(LoadError::InvalidArgument(format!(
                "gpio range starting at {} overflows",
                self.base_offset
            )));
        }

        Ok(variant)
    }
}

/// Expander part, selected by channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipVariant {
    /// 8-channel part.
    Mcp23008,
    /// 16-channel part.
    Mcp23017,
}

impl ChipVariant {
    /// Map a channel count to its variant.
    pub fn from_channel_count(count: u32) -> Option<Self> {
        match count {
            c if c == u32::from(CHANNELS_8) => Some(Self::Mcp23008),
            c if c == u32::from(CHANNELS_16) => Some(Self::Mcp23017),
            _ => None,
        }
    }

    /// Number of GPIO channels the part exposes.
    pub fn channel_count(self) -> u16 {
        match self {
            Self::Mcp23008 => CHANNELS_8,
            Self::Mcp23017 => CHANNELS_16,
        }
    }

    /// Device type string understood by the expander driver.
    pub fn driver_name(self) -> &'static str {
        match self {
            Self::Mcp23008 => "mcp23008",
            Self::Mcp23017 => "mcp23017",
        }
    }
}

impl fmt::Display for ChipVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver_name())
    }
}

/// Per-chip slot of the expander platform configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipSlot {
    /// Pull-up bitmask for this chip.
    pub pullups: u16,
}

/// Immutable snapshot used to instantiate one expander device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpanderConfig {
    /// GPIO number of channel 0.
    pub base_offset: u32,
    /// Chip slots; bus-attached parts only use slot 0.
    pub chips: [ChipSlot; MAX_CHIP_SLOTS],
}

impl ExpanderConfig {
    /// Build the configuration with `pullups` placed in chip slot 0.
    pub fn new(base_offset: u32, pullups: u16) -> Self {
        let mut chips = [ChipSlot::default(); MAX_CHIP_SLOTS];
        chips[0].pullups = pullups;
        Self { base_offset, chips }
    }

    /// Pull-up bitmask of the single populated chip slot.
    pub fn pullups(&self) -> u16 {
        self.chips[0].pullups
    }
}

/// Power-on state of an indicator output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultState {
    /// Force the output off.
    Off,
    /// Force the output on.
    On,
    /// Keep whatever state the hardware currently has.
    #[default]
    Keep,
}

/// One indicator output driven from an expander channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorDescriptor {
    /// Unique indicator name (`<prefix>:<gpio>`).
    pub name: String,
    /// Source GPIO number.
    pub pin: u32,
    /// State applied when the bank is instantiated.
    pub default_state: DefaultState,
    /// Trigger attached at creation; `None` means no trigger.
    pub default_trigger: Option<String>,
    /// Output is active low.
    pub active_low: bool,
    /// Keep the output state across suspend.
    pub retain_state_suspended: bool,
}

/// Indicator bank layout derived from an expander configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// One descriptor per expander channel, index `i` maps to `base + i`.
    pub descriptors: Vec<IndicatorDescriptor>,
}

impl IndicatorConfig {
    /// Derive one descriptor per channel of `variant` starting at `base_offset`.
    ///
    /// Callers must have validated the request so that `base_offset` plus the
    /// channel count does not overflow.
    pub fn derive(prefix: &str, base_offset: u32, variant: ChipVariant) -> Self {
        let descriptors = (0..u32::from(variant.channel_count()))
            .map(|i| {
                let pin = base_offset + i;
                IndicatorDescriptor {
                    name: indicator_name(prefix, pin),
                    pin,
                    default_state: DefaultState::Keep,
                    default_trigger: None,
                    active_low: false,
                    retain_state_suspended: true,
                }
            })
            .collect();

        Self { descriptors }
    }

    /// Number of descriptors (equals the expander channel count).
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True when the bank has no outputs.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterator over the indicator names in channel order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }
}

/// Indicator name for a GPIO number. Unique per GPIO, so banks on
/// non-overlapping GPIO ranges never collide.
pub fn indicator_name(prefix: &str, gpio: u32) -> String {
    format!("{prefix}:{gpio}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn channel_count_selects_variant() {
        assert_eq!(ChipVariant::from_channel_count(8), Some(ChipVariant::Mcp23008));
        assert_eq!(ChipVariant::from_channel_count(16), Some(ChipVariant::Mcp23017));
        for bad in [0, 1, 7, 9, 15, 17, 32, u32::MAX] {
            assert_eq!(ChipVariant::from_channel_count(bad), None, "count {bad}");
        }
    }

    #[test]
    fn validate_rejects_bad_channel_count() {
        let result = Request::new(0, 0x20, 100, 7).validate();
        assert!(matches!(result, Err(LoadError::InvalidArgument(_))));
    }

    #[test]
    fn validate_rejects_overflowing_range() {
        let result = Request::new(0, 0x20, u32::MAX - 3, 8).validate();
        assert!(matches!(result, Err(LoadError::InvalidArgument(_))));

        // Last representable range is accepted.
        let ok = Request::new(0, 0x20, u32::MAX - 8, 8).validate();
        assert_eq!(ok.unwrap(), ChipVariant::Mcp23008);
    }

    #[test]
    fn pullups_land_in_slot_zero() {
        let config = ExpanderConfig::new(200, 0x00ff);
        assert_eq!(config.base_offset, 200);
        assert_eq!(config.pullups(), 0x00ff);
        assert!(config.chips[1..].iter().all(|c| c.pullups == 0));
    }

    #[test]
    fn derived_indicators_follow_base_offset() {
        let config = IndicatorConfig::derive("mcp", 100, ChipVariant::Mcp23008);
        assert_eq!(config.len(), 8);
        let names: Vec<_> = config.names().collect();
        assert_eq!(names[0], "mcp:100");
        assert_eq!(names[7], "mcp:107");
        for (i, d) in config.descriptors.iter().enumerate() {
            assert_eq!(d.pin, 100 + i as u32);
            assert_eq!(d.default_state, DefaultState::Keep);
            assert!(d.default_trigger.is_none());
            assert!(!d.active_low);
            assert!(d.retain_state_suspended);
        }
    }

    #[test]
    fn names_do_not_collide_across_disjoint_ranges() {
        let a = IndicatorConfig::derive("mcp", 100, ChipVariant::Mcp23017);
        let b = IndicatorConfig::derive("mcp", 116, ChipVariant::Mcp23017);
        let names: HashSet<_> = a.names().chain(b.names()).collect();
        assert_eq!(names.len(), 32);
    }

    #[test]
    fn variant_display_is_driver_name() {
        assert_eq!(ChipVariant::Mcp23017.to_string(), "mcp23017");
        assert_eq!(ChipVariant::Mcp23008.channel_count(), 8);
    }
}
