//! Config file loading and environment overrides.

use hp5316::commands::{GateMode, MeasMode, TriggerLevelMode, TriggerSlope};
use hp5316::config::AppConfig;
use hp5316::logging::LogFormat;
use hp5316::settings::CounterSettings;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("HP5316_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_load_full_file() {
    clear_env();
    let file = write_config(
        r#"
        [counter]
        resource = "GPIB1::20::INSTR"
        settle_time = "150ms"

        [settings]
        meas_mode = "period_a"
        gate_mode = "short_front"
        trigger_level_mode = "set_level"
        trigger_level_a = 0.01
        trigger_slope_b = "negative"
        timeout_ms = 5000

        [logging]
        level = "debug"
        format = "json"
        "#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.counter.resource.as_deref(), Some("GPIB1::20::INSTR"));
    assert_eq!(config.counter.settle_time, Duration::from_millis(150));
    assert_eq!(config.settings.meas_mode, MeasMode::PeriodA);
    assert_eq!(config.settings.gate_mode, GateMode::ShortFront);
    assert_eq!(config.settings.trigger_level_mode, TriggerLevelMode::SetLevel);
    assert_eq!(config.settings.trigger_level_a, 0.01);
    assert_eq!(config.settings.trigger_slope_a, TriggerSlope::Positive);
    assert_eq!(config.settings.trigger_slope_b, TriggerSlope::Negative);
    assert_eq!(config.settings.timeout_ms, 5000);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.settings, CounterSettings::default());
}

#[test]
#[serial]
fn test_bad_values_fail_to_load() {
    clear_env();
    let file = write_config(
        r#"
        [settings]
        meas_mode = "warp_speed"
        "#,
    );
    assert!(AppConfig::load_from(file.path()).is_err());

    let file = write_config(
        r#"
        [settings]
        timeout_ms = 1.5
        "#,
    );
    assert!(AppConfig::load_from(file.path()).is_err());
}

#[test]
#[serial]
fn test_out_of_range_level_fails_validation() {
    clear_env();
    let file = write_config(
        r#"
        [settings]
        trigger_level_b = -4.0
        "#,
    );
    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let file = write_config(
        r#"
        [counter]
        resource = "GPIB1::20::INSTR"

        [settings]
        meas_mode = "freq_a"
        "#,
    );

    std::env::set_var("HP5316_COUNTER__RESOURCE", "GPIB0::7::INSTR");
    std::env::set_var("HP5316_SETTINGS__MEAS_MODE", "period_a");
    std::env::set_var("HP5316_LOGGING__LEVEL", "warn");
    let config = AppConfig::load_from(file.path());
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.counter.resource.as_deref(), Some("GPIB0::7::INSTR"));
    assert_eq!(config.settings.meas_mode, MeasMode::PeriodA);
    assert_eq!(config.logging.level, "warn");
}

#[test]
#[serial]
fn test_env_only_load() {
    clear_env();
    std::env::set_var("HP5316_COUNTER__SETTLE_TIME", "1s");
    let config = AppConfig::load();
    clear_env();

    assert_eq!(config.unwrap().counter.settle_time, Duration::from_secs(1));
}
