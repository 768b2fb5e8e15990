//! Control endpoint integration tests.
//!
//! Feeds command lines through `ControlEndpoint::store` and checks byte
//! counts, errno codes and the resulting registry state.

use evo_common::config::ConfigLoader;
use evo_common::expander::config::LoaderConfig;
use evo_expander::{ControlEndpoint, DriverRegistry, Loader, Registry, USAGE};
use std::sync::Arc;

/// Helper: endpoint over the built-in simulation backend.
fn endpoint(config: &LoaderConfig) -> ControlEndpoint {
    let backend = DriverRegistry::with_builtin()
        .create_backend(&config.loader.backend, config)
        .expect("simulation backend");
    let loader = Loader::new(backend, Arc::new(Registry::new()))
        .with_indicator_prefix(config.loader.indicator_prefix.clone());
    ControlEndpoint::new(Arc::new(loader))
}

#[test]
fn show_returns_usage() {
    let ep = endpoint(&LoaderConfig::default());
    assert_eq!(ep.show(), USAGE);
}

#[test]
fn store_success_returns_line_length() {
    let ep = endpoint(&LoaderConfig::default());
    let line = "0 32 100 8\n";
    assert_eq!(ep.store(line), Ok(line.len()));
    assert_eq!(ep.loader().len(), 1);
}

#[test]
fn store_with_indicators() {
    let ep = endpoint(&LoaderConfig::default());
    assert!(ep.store("0 32 100 8 1 1").is_ok());

    let snapshot = ep.loader().snapshot();
    let names = snapshot[0].indicators.clone().expect("indicators");
    let expected: Vec<String> = (100..108).map(|g| format!("mcp:{g}")).collect();
    assert_eq!(names, expected);
    assert_eq!(snapshot[0].pullups, 1);
}

#[test]
fn store_maps_errors_to_errno() {
    let ep = endpoint(&LoaderConfig::default());

    assert_eq!(ep.store("0 32 100 7"), Err(-libc::EINVAL));
    assert_eq!(ep.store("0 32 100"), Err(-libc::EINVAL));
    assert_eq!(ep.store("99 32 100 8"), Err(-libc::ENODEV));
    assert!(ep.loader().is_empty());

    assert!(ep.store("0 32 100 8").is_ok());
    // Busy address: driver rejects.
    assert_eq!(ep.store("0 32 200 8"), Err(-libc::EINVAL));
    assert_eq!(ep.loader().len(), 1);
}

#[test]
fn store_accepts_trailing_characters_on_last_field() {
    let ep = endpoint(&LoaderConfig::default());
    let line = "0 32 100 8abc";
    assert_eq!(ep.store(line), Ok(line.len()));

    let snapshot = ep.loader().snapshot();
    assert_eq!(snapshot[0].base_offset, 100);
    assert!(snapshot[0].indicators.is_none());
}

#[test]
fn configured_prefix_and_buses_are_used() {
    let config = LoaderConfig::from_toml(
        r#"
[loader]
indicator_prefix = "front"

[[simulation.buses]]
id = 5
name = "i2c-5"
"#,
    )
    .unwrap();
    let ep = endpoint(&config);

    assert_eq!(ep.store("0 0x20 0 8"), Err(-libc::ENODEV));
    assert!(ep.store("5 0x20 0 8 0 1").is_ok());
    let names = ep.loader().snapshot()[0].indicators.clone().unwrap();
    assert_eq!(names[0], "front:0");
}

#[test]
fn shutdown_after_commands_releases_everything() {
    let ep = endpoint(&LoaderConfig::default());
    for line in ["0 0x20 0 8", "0 0x21 8 16 0xffff 1", "0 0x22 24 8 0 1"] {
        assert!(ep.store(line).is_ok(), "{line}");
    }

    let summary = ep.loader().shutdown();
    assert_eq!(summary.entries, 3);
    assert_eq!(summary.failures, 0);
    assert!(ep.loader().is_empty());
}

#[test]
fn shipped_config_preloads_cleanly() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/expander.toml");
    let config = LoaderConfig::load_or_default(&path, true).expect("shipped config");
    let ep = endpoint(&config);

    for line in &config.preload {
        ep.execute(line).expect("preload line");
    }
    assert_eq!(ep.loader().len(), config.preload.len());
}
