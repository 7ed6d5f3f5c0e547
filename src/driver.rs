//! HP 5316A/B Universal Counter Driver
//!
//! Reference: HP 5316A Operating and Service Manual, HP-IB programming section
//!
//! Protocol Overview:
//! - Format: Fixed ASCII tokens (NOT SCPI)
//! - Terminator: CR LF on writes and reads
//! - Settings: `FNn` function, `GAn` gate, `TRn` level source, `AS`/`BS` slopes,
//!   `AT`/`BT` trigger levels
//! - Control: `RE` reset, `IN` initialize, `WA1` single-shot wait mode
//! - Readings: one fixed-width record per read (see [`crate::measurement`])
//!
//! The counter cannot report its configuration back, so the driver keeps a
//! mirror of every setting it writes. Changing settings from the front panel
//! makes the mirror stale.
//!
//! Every configuration write is followed by a settle pause; the counter drops
//! commands that arrive while it is still applying the previous one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hp5316::bus::visa::VisaResourceManager;
//! use hp5316::commands::{Channel, MeasMode, TriggerLevelMode};
//! use hp5316::driver::{Hp5316, DEFAULT_SETTLE_TIME};
//!
//! let rm = VisaResourceManager::new()?;
//! let mut counter = Hp5316::connect(&rm, "GPIB1::20::INSTR", DEFAULT_SETTLE_TIME)?;
//!
//! counter.set_meas_mode(MeasMode::PeriodA)?;
//! counter.set_trigger_level_mode(TriggerLevelMode::SetLevel)?;
//! counter.set_trigger_level(Channel::A, 0.01)?;
//!
//! if let Some(reading) = counter.measure()? {
//!     println!("{} {}", reading.value, reading.unit);
//! }
//! ```

use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::bus::{BusResource, ResourceManager};
use crate::commands::{
    validate_trigger_level, Channel, Command, GateMode, MeasMode, TriggerLevelMode, TriggerSlope,
};
use crate::error::CounterResult;
use crate::measurement::{decode, Measurement};
use crate::settings::{CounterSettings, Setting, SettingValue};

/// Pause after each configuration write.
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_millis(200);

/// Driver session for one HP 5316 counter.
///
/// Owns its bus resource exclusively; dropping the driver releases it.
pub struct Hp5316<B: BusResource> {
    bus: B,
    settle_time: Duration,
    settings: CounterSettings,
}

impl<B: BusResource> Hp5316<B> {
    /// Open `address` through `manager` and bring the counter to its defaults.
    ///
    /// # Errors
    /// Returns error if:
    /// - The resource cannot be opened
    /// - The device clear or any default setting write fails
    pub fn connect<M>(manager: &M, address: &str, settle_time: Duration) -> CounterResult<Self>
    where
        M: ResourceManager<Resource = B>,
    {
        Self::connect_with(manager, address, settle_time, &CounterSettings::default())
    }

    /// Open `address` through `manager` and push `settings` instead of the
    /// defaults.
    ///
    /// `settings` is validated before the resource is opened.
    pub fn connect_with<M>(
        manager: &M,
        address: &str,
        settle_time: Duration,
        settings: &CounterSettings,
    ) -> CounterResult<Self>
    where
        M: ResourceManager<Resource = B>,
    {
        settings.validate()?;
        info!("Connecting to HP 5316: {}", address);
        let bus = manager.open(address)?;
        Self::with_settings(bus, settle_time, settings)
    }

    /// Take an already open resource, clear it and push the defaults.
    pub fn with_resource(bus: B, settle_time: Duration) -> CounterResult<Self> {
        Self::with_settings(bus, settle_time, &CounterSettings::default())
    }

    /// Take an already open resource, clear it and push `settings`.
    ///
    /// Each setting is written once; the defaults are not pushed first.
    pub fn with_settings(
        bus: B,
        settle_time: Duration,
        settings: &CounterSettings,
    ) -> CounterResult<Self> {
        settings.validate()?;
        let mut driver = Self {
            bus,
            settle_time,
            settings: CounterSettings::default(),
        };
        driver.bus.clear()?;
        driver.init_settings(settings)?;
        info!("HP 5316 '{}' connected", driver.bus.resource_name());
        Ok(driver)
    }

    /// Force single-shot wait mode, then write every setting in `settings`.
    fn init_settings(&mut self, settings: &CounterSettings) -> CounterResult<()> {
        self.send(Command::WaitSingle)?;
        for value in settings.values() {
            self.set(value)?;
        }
        Ok(())
    }

    /// Write one command and wait for the counter to apply it.
    fn send(&mut self, command: Command) -> CounterResult<()> {
        let text = command.to_string();
        debug!(command = %text, "HP 5316: sending command");
        self.bus.write_line(&text)?;
        self.settle();
        Ok(())
    }

    fn settle(&self) {
        if !self.settle_time.is_zero() {
            std::thread::sleep(self.settle_time);
        }
    }

    /// Address of the underlying bus resource.
    pub fn resource_name(&self) -> &str {
        self.bus.resource_name()
    }

    /// Mirrored configuration.
    pub fn settings(&self) -> &CounterSettings {
        &self.settings
    }

    /// Pause applied after each configuration write.
    pub fn settle_time(&self) -> Duration {
        self.settle_time
    }

    /// Change the pause applied after each configuration write.
    pub fn set_settle_time(&mut self, settle_time: Duration) {
        self.settle_time = settle_time;
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Current measurement function.
    pub fn meas_mode(&self) -> MeasMode {
        self.settings.meas_mode
    }

    /// Select the measurement function (`FNn`).
    pub fn set_meas_mode(&mut self, mode: MeasMode) -> CounterResult<()> {
        self.send(Command::Function(mode))?;
        self.settings.meas_mode = mode;
        Ok(())
    }

    /// Current gate mode.
    pub fn gate_mode(&self) -> GateMode {
        self.settings.gate_mode
    }

    /// Select the gate mode (`GAn`).
    pub fn set_gate_mode(&mut self, mode: GateMode) -> CounterResult<()> {
        self.send(Command::Gate(mode))?;
        self.settings.gate_mode = mode;
        Ok(())
    }

    /// Current trigger level source.
    pub fn trigger_level_mode(&self) -> TriggerLevelMode {
        self.settings.trigger_level_mode
    }

    /// Select front panel or programmed trigger levels (`TRn`).
    pub fn set_trigger_level_mode(&mut self, mode: TriggerLevelMode) -> CounterResult<()> {
        self.send(Command::TriggerLevelMode(mode))?;
        self.settings.trigger_level_mode = mode;
        Ok(())
    }

    /// Current slope of `channel`.
    pub fn trigger_slope(&self, channel: Channel) -> TriggerSlope {
        self.settings.trigger_slope(channel)
    }

    /// Select the trigger slope of `channel` (`ASn` / `BSn`).
    pub fn set_trigger_slope(&mut self, channel: Channel, slope: TriggerSlope) -> CounterResult<()> {
        self.send(Command::Slope(channel, slope))?;
        match channel {
            Channel::A => self.settings.trigger_slope_a = slope,
            Channel::B => self.settings.trigger_slope_b = slope,
        }
        Ok(())
    }

    /// Current programmed trigger level of `channel`, in volts.
    pub fn trigger_level(&self, channel: Channel) -> f64 {
        self.settings.trigger_level(channel)
    }

    /// Program the trigger level of `channel` (`AT±x.xx` / `BT±x.xx`).
    ///
    /// Only takes effect on the counter in [`TriggerLevelMode::SetLevel`].
    ///
    /// # Errors
    /// `OutOfRange` if `volts` is outside [-2.5, 2.5]; nothing is written.
    #[instrument(skip(self), err)]
    pub fn set_trigger_level(&mut self, channel: Channel, volts: f64) -> CounterResult<()> {
        let setting = match channel {
            Channel::A => Setting::TriggerLevelA,
            Channel::B => Setting::TriggerLevelB,
        };
        validate_trigger_level(setting.name(), volts)?;
        self.send(Command::TriggerLevel(channel, volts))?;
        match channel {
            Channel::A => self.settings.trigger_level_a = volts,
            Channel::B => self.settings.trigger_level_b = volts,
        }
        Ok(())
    }

    /// Current read timeout in milliseconds.
    pub fn timeout(&self) -> u32 {
        self.settings.timeout_ms
    }

    /// Set the read timeout on the bus resource.
    ///
    /// Nothing is written to the counter, so no settle pause follows.
    pub fn set_timeout(&mut self, timeout_ms: u32) -> CounterResult<()> {
        self.bus
            .set_timeout(Duration::from_millis(u64::from(timeout_ms)))?;
        self.settings.timeout_ms = timeout_ms;
        Ok(())
    }

    /// Apply one typed setting value.
    pub fn set(&mut self, value: SettingValue) -> CounterResult<()> {
        match value {
            SettingValue::MeasMode(mode) => self.set_meas_mode(mode),
            SettingValue::GateMode(mode) => self.set_gate_mode(mode),
            SettingValue::TriggerLevelMode(mode) => self.set_trigger_level_mode(mode),
            SettingValue::TriggerSlope(channel, slope) => self.set_trigger_slope(channel, slope),
            SettingValue::TriggerLevel(channel, volts) => self.set_trigger_level(channel, volts),
            SettingValue::TimeoutMs(ms) => self.set_timeout(ms),
        }
    }

    /// Apply a setting given by name with a loosely typed value.
    ///
    /// # Errors
    /// - `UnknownSetting` if `key` names no setting
    /// - `InvalidType` if `value` has the wrong type for the setting
    /// - `InvalidValue` / `OutOfRange` if the value is not acceptable
    ///
    /// Nothing is written when validation fails.
    pub fn apply_setting(&mut self, key: &str, value: &toml::Value) -> CounterResult<()> {
        let setting: Setting = key.parse()?;
        let value = setting.parse_value(value)?;
        self.set(value)
    }

    /// Push a complete settings block.
    ///
    /// The block is validated as a whole before the first write.
    pub fn apply_settings(&mut self, settings: &CounterSettings) -> CounterResult<()> {
        settings.validate()?;
        for value in settings.values() {
            self.set(value)?;
        }
        Ok(())
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Soft reset (`RE`). The mirror is left untouched.
    #[instrument(skip(self), err)]
    pub fn reset(&mut self) -> CounterResult<()> {
        self.send(Command::Reset)?;
        info!("HP 5316: reset");
        Ok(())
    }

    /// Full re-initialize (`IN`), then restore and push the defaults.
    #[instrument(skip(self), err)]
    pub fn initialize(&mut self) -> CounterResult<()> {
        self.send(Command::Initialize)?;
        self.settings = CounterSettings::default();
        self.init_settings(&CounterSettings::default())?;
        info!("HP 5316: initialized");
        Ok(())
    }

    /// Take one reading.
    ///
    /// Clears the bus, then blocks for one response up to the configured
    /// timeout. A failed read is logged and returns `Ok(None)`.
    ///
    /// # Errors
    /// - `Bus` if the device clear fails
    /// - `Decode` if the response is malformed
    pub fn measure(&mut self) -> CounterResult<Option<Measurement>> {
        self.bus.clear()?;
        let response = match self.bus.read_line() {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    resource = %self.bus.resource_name(),
                    error = %e,
                    "HP 5316: no reading"
                );
                return Ok(None);
            }
        };

        let measurement = decode(&response)?;
        debug!(
            raw = %measurement.raw,
            value = measurement.value,
            unit = %measurement.unit,
            overflow = measurement.overflow,
            "HP 5316: reading"
        );
        Ok(Some(measurement))
    }
}
