//! Expander loader configuration types.
//!
//! - `LoaderConfig` - Main configuration loaded from `expander.toml`
//! - `LoaderSection` - Backend selection and indicator naming
//! - `SimulationConfig` / `SimulatedBusConfig` - Simulation backend model

use crate::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
use crate::consts::{DEFAULT_BACKEND, DEFAULT_INDICATOR_PREFIX, DEFAULT_MAX_DEVICES};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

fn default_indicator_prefix() -> String {
    DEFAULT_INDICATOR_PREFIX.to_string()
}

fn default_max_devices() -> usize {
    DEFAULT_MAX_DEVICES
}

fn default_buses() -> Vec<SimulatedBusConfig> {
    vec![SimulatedBusConfig {
        id: 0,
        name: "i2c-0".to_string(),
    }]
}

/// Main configuration loaded from `expander.toml`.
///
/// # TOML Example
///
/// ```toml
/// preload = ["0 0x20 100 8", "0 0x21 200 16 0xffff 1"]
///
/// [shared]
/// service_name = "evo-expander"
///
/// [loader]
/// backend = "simulation"
/// indicator_prefix = "mcp"
///
/// [simulation]
/// max_devices = 32
///
/// [[simulation.buses]]
/// id = 0
/// name = "i2c-0"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Common settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderSection,

    /// Simulation backend model.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Command lines applied at startup, in control endpoint syntax.
    #[serde(default)]
    pub preload: Vec<String>,
}

/// `[loader]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderSection {
    /// Backend name looked up in the driver registry.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Prefix of synthesized indicator names.
    #[serde(default = "default_indicator_prefix")]
    pub indicator_prefix: String,
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            indicator_prefix: default_indicator_prefix(),
        }
    }
}

/// `[simulation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Maximum number of live devices (expanders plus indicator banks).
    #[serde(default = "default_max_devices")]
    pub max_devices: usize,

    /// Buses the simulated lookup resolves.
    #[serde(default = "default_buses")]
    pub buses: Vec<SimulatedBusConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_devices: default_max_devices(),
            buses: default_buses(),
        }
    }
}

/// One simulated bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatedBusConfig {
    /// Bus number.
    pub id: u32,
    /// Bus name.
    pub name: String,
}

/// Where a loaded [`LoaderConfig`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from the given file.
    File,
    /// File absent; built-in defaults.
    Defaults,
}

impl LoaderConfig {
    /// Load `path`, falling back to defaults when the file is missing and
    /// `required` is false. The origin tells the caller which happened, so
    /// it can report the fallback once logging is up.
    ///
    /// # Errors
    /// Parse and validation errors are always returned; a missing file only
    /// when `required` is set.
    pub fn load_with_origin(
        path: &Path,
        required: bool,
    ) -> Result<(Self, ConfigOrigin), ConfigError> {
        match Self::load_validated(path) {
            Ok(config) => Ok((config, ConfigOrigin::File)),
            Err(ConfigError::FileNotFound) if !required => {
                let config = Self::default();
                config.validate()?;
                Ok((config, ConfigOrigin::Defaults))
            }
            Err(e) => Err(e),
        }
    }

    /// Same as [`LoaderConfig::load_with_origin`], warning on fallback.
    ///
    /// # Errors
    /// See [`LoaderConfig::load_with_origin`].
    pub fn load_or_default(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let (config, origin) = Self::load_with_origin(path, required)?;
        if origin == ConfigOrigin::Defaults {
            warn!("No config at {:?}, using defaults", path);
        }
        Ok(config)
    }
}

impl Validate for LoaderConfig {
    /// # Validation Rules
    /// 1. `shared.service_name` not empty
    /// 2. `loader.backend` not empty
    /// 3. `loader.indicator_prefix` not empty and free of whitespace
    /// 4. `simulation.max_devices` > 0
    /// 5. Simulated bus ids unique
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.loader.backend.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "loader.backend cannot be empty".to_string(),
            ));
        }

        let prefix = &self.loader.indicator_prefix;
        if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "loader.indicator_prefix '{prefix}' must be non-empty without whitespace"
            )));
        }

        if self.simulation.max_devices == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.max_devices must be greater than 0".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for bus in &self.simulation.buses {
            if !ids.insert(bus.id) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate simulated bus id: {}",
                    bus.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = LoaderConfig::from_toml("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.loader.backend, "simulation");
        assert_eq!(config.loader.indicator_prefix, "mcp");
        assert_eq!(config.simulation.max_devices, DEFAULT_MAX_DEVICES);
        assert_eq!(config.simulation.buses.len(), 1);
        assert_eq!(config.simulation.buses[0].id, 0);
        assert!(config.preload.is_empty());
    }

    #[test]
    fn duplicate_bus_ids_rejected() {
        let config = LoaderConfig::from_toml(
            r#"
[[simulation.buses]]
id = 1
name = "a"

[[simulation.buses]]
id = 1
name = "b"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn prefix_with_whitespace_rejected() {
        let mut config = LoaderConfig::default();
        config.loader.indicator_prefix = "my leds".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_devices_rejected() {
        let mut config = LoaderConfig::default();
        config.simulation.max_devices = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = LoaderConfig::from_toml("[loader]\nbogus = 1\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn missing_optional_file_falls_back_to_defaults() {
        let path = Path::new("/nonexistent/evo/expander.toml");
        let config = LoaderConfig::load_or_default(path, false).unwrap();
        assert_eq!(config.loader.backend, "simulation");

        let (_, origin) = LoaderConfig::load_with_origin(path, false).unwrap();
        assert_eq!(origin, ConfigOrigin::Defaults);

        let result = LoaderConfig::load_or_default(path, true);
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }
}
