//! System-wide constants for the EVO workspace.
//!
//! Single source of truth for all numeric limits and default paths.
//! Imported by all crates — no duplication permitted.

/// Canonical expander service name (used for logging).
pub const EXPANDER_SERVICE_NAME: &str = "expander";

/// Channel count of the 8-bit expander variant (MCP23008).
pub const CHANNELS_8: u16 = 8;

/// Channel count of the 16-bit expander variant (MCP23017).
pub const CHANNELS_16: u16 = 16;

/// Number of chip slots in an expander platform configuration.
///
/// Only slot 0 is populated for bus-attached I2C parts.
pub const MAX_CHIP_SLOTS: usize = 8;

/// Highest valid 7-bit bus address.
pub const MAX_DEVICE_ADDRESS: u16 = 0x7f;

/// Default prefix for synthesized indicator names (`mcp:<gpio>`).
pub const DEFAULT_INDICATOR_PREFIX: &str = "mcp";

/// Default backend used when neither CLI nor config selects one.
pub const DEFAULT_BACKEND: &str = "simulation";

/// Default limit of live simulated devices.
pub const DEFAULT_MAX_DEVICES: usize = 64;

/// Default loader configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/evo/expander.toml";
