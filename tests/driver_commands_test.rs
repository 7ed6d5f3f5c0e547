//! End-to-end driver behaviour against the mock bus.

use hp5316::bus::mock::{BusLog, MockBus, MockResourceManager};
use hp5316::bus::{BusError, ResourceManager};
use hp5316::commands::{
    Channel, GateMode, MeasMode, TriggerLevelMode, TriggerSlope, GATE_MODE_COMMANDS,
    MEAS_MODE_COMMANDS, TRIGGER_LEVEL_MODE_COMMANDS,
};
use hp5316::driver::Hp5316;
use hp5316::measurement::Unit;
use hp5316::settings::CounterSettings;
use hp5316::CounterError;
use std::time::Duration;

const ADDRESS: &str = "GPIB1::20::INSTR";

fn connect(bus: MockBus) -> (Hp5316<MockBus>, BusLog) {
    let log = bus.log();
    let manager = MockResourceManager::new();
    manager.register(bus);
    let counter = Hp5316::connect(&manager, ADDRESS, Duration::ZERO).unwrap();
    log.reset();
    (counter, log)
}

#[test]
fn test_connect_unknown_address() {
    let manager = MockResourceManager::new();
    let result = Hp5316::connect(&manager, "GPIB0::1::INSTR", Duration::ZERO);
    assert!(matches!(
        result,
        Err(CounterError::Bus(BusError::NotFound(_)))
    ));
}

#[test]
fn test_connect_lists_and_opens() {
    let manager = MockResourceManager::new();
    manager.register(MockBus::new(ADDRESS));
    assert_eq!(manager.list_resources().unwrap(), vec![ADDRESS.to_string()]);

    let counter = Hp5316::connect(&manager, ADDRESS, Duration::ZERO).unwrap();
    assert_eq!(counter.resource_name(), ADDRESS);
    assert!(manager.list_resources().unwrap().is_empty());
}

#[test]
fn test_enum_setters_write_table_tokens() {
    let (mut counter, log) = connect(MockBus::new(ADDRESS));

    for &mode in MeasMode::ALL {
        counter.set_meas_mode(mode).unwrap();
        assert_eq!(counter.meas_mode(), mode);
        assert_eq!(log.last_write().unwrap(), MEAS_MODE_COMMANDS[mode.index()]);
    }
    for &mode in GateMode::ALL {
        counter.set_gate_mode(mode).unwrap();
        assert_eq!(counter.gate_mode(), mode);
        assert_eq!(log.last_write().unwrap(), GATE_MODE_COMMANDS[mode.index()]);
    }
    for &mode in TriggerLevelMode::ALL {
        counter.set_trigger_level_mode(mode).unwrap();
        assert_eq!(counter.trigger_level_mode(), mode);
        assert_eq!(
            log.last_write().unwrap(),
            TRIGGER_LEVEL_MODE_COMMANDS[mode.index()]
        );
    }
    for channel in [Channel::A, Channel::B] {
        for &slope in TriggerSlope::ALL {
            counter.set_trigger_slope(channel, slope).unwrap();
            assert_eq!(counter.trigger_slope(channel), slope);
            assert_eq!(log.last_write().unwrap(), channel.slope_command(slope));
        }
    }

    assert_eq!(log.writes().len(), 15 + 4 + 2 + 4);
}

#[test]
fn test_period_measurement_session() {
    let mut bus = MockBus::new(ADDRESS);
    bus.push_response("T0.00100000000000000");
    bus.push_error(BusError::Timeout);
    bus.push_response("O00000000.000000000");
    let (mut counter, log) = connect(bus);

    counter.set_meas_mode(MeasMode::PeriodA).unwrap();
    counter.set_gate_mode(GateMode::LongFront).unwrap();
    counter
        .set_trigger_level_mode(TriggerLevelMode::SetLevel)
        .unwrap();
    counter.set_trigger_level(Channel::A, 0.01).unwrap();
    counter
        .set_trigger_slope(Channel::A, TriggerSlope::Positive)
        .unwrap();
    assert_eq!(log.writes(), vec!["FN7", "GA0", "TR1", "AT+0.01", "AS0"]);

    let first = counter.measure().unwrap().unwrap();
    assert_eq!(first.unit, Unit::Seconds);
    assert!((first.value - 0.001).abs() < 1e-12);

    assert!(counter.measure().unwrap().is_none());

    let third = counter.measure().unwrap().unwrap();
    assert!(third.overflow);
    assert_eq!(third.unit, Unit::None);

    assert_eq!(log.clears(), 3);
    assert_eq!(log.reads(), 3);
}

#[test]
fn test_apply_settings_from_config_block() {
    let (mut counter, log) = connect(MockBus::new(ADDRESS));
    let settings: CounterSettings = toml::from_str(
        r#"
        meas_mode = "int_a_to_b"
        gate_mode = "short_rear"
        trigger_slope_b = "negative"
        trigger_level_b = -1.25
        timeout_ms = 750
        "#,
    )
    .unwrap();

    counter.apply_settings(&settings).unwrap();
    assert_eq!(
        log.writes(),
        vec!["GA3", "FN2", "TR0", "AS0", "BS1", "AT+0.00", "BT-1.25"]
    );
    assert_eq!(log.timeouts(), vec![Duration::from_millis(750)]);
    assert_eq!(counter.settings(), &settings);
}

#[test]
fn test_boxed_resource_drives_counter() {
    let bus = MockBus::repeating(ADDRESS, "F00000050.000000000");
    let log = bus.log();
    let boxed: Box<dyn hp5316::bus::BusResource> = Box::new(bus);
    let mut counter = Hp5316::with_resource(boxed, Duration::ZERO).unwrap();

    counter.reset().unwrap();
    assert_eq!(log.last_write().unwrap(), "RE");
    assert_eq!(counter.measure().unwrap().unwrap().value, 50.0);
}

#[test]
fn test_connect_with_configured_settings() {
    let bus = MockBus::new(ADDRESS);
    let log = bus.log();
    let manager = MockResourceManager::new();
    manager.register(bus);

    let settings = CounterSettings {
        meas_mode: MeasMode::PeriodA,
        gate_mode: GateMode::ShortFront,
        trigger_slope_b: TriggerSlope::Negative,
        ..Default::default()
    };
    let counter = Hp5316::connect_with(&manager, ADDRESS, Duration::ZERO, &settings).unwrap();

    assert_eq!(
        log.writes(),
        vec!["WA1", "GA1", "FN7", "TR0", "AS0", "BS1", "AT+0.00", "BT+0.00"]
    );
    assert_eq!(log.clears(), 1);
    assert_eq!(counter.settings(), &settings);
}

#[test]
fn test_connect_with_invalid_settings_leaves_resource() {
    let manager = MockResourceManager::new();
    manager.register(MockBus::new(ADDRESS));
    let settings = CounterSettings {
        trigger_level_a: -3.0,
        ..Default::default()
    };

    let result = Hp5316::connect_with(&manager, ADDRESS, Duration::ZERO, &settings);
    assert!(matches!(result, Err(CounterError::OutOfRange { .. })));
    assert_eq!(manager.list_resources().unwrap(), vec![ADDRESS.to_string()]);
}
