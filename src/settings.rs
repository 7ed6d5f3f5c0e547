//! Counter configuration state.
//!
//! [`CounterSettings`] is the driver's mirror of what it last wrote to the
//! instrument. It doubles as the `[settings]` table of the config file.
//!
//! [`Setting`] names individual settings so they can be changed from loosely
//! typed input (config values, CLI arguments). [`Setting::parse_value`] does
//! the type checking the typed setters get for free.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::commands::{
    validate_trigger_level, Channel, GateMode, MeasMode, TriggerLevelMode, TriggerSlope,
};
use crate::error::{CounterError, CounterResult};

/// Read timeout pushed on connect and initialize, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 2000;

/// Mirrored instrument configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CounterSettings {
    /// Measurement function
    pub meas_mode: MeasMode,
    /// Gate mode
    pub gate_mode: GateMode,
    /// Trigger level source
    pub trigger_level_mode: TriggerLevelMode,
    /// Channel A slope
    pub trigger_slope_a: TriggerSlope,
    /// Channel B slope
    pub trigger_slope_b: TriggerSlope,
    /// Channel A trigger level (V)
    pub trigger_level_a: f64,
    /// Channel B trigger level (V)
    pub trigger_level_b: f64,
    /// Read timeout (ms)
    pub timeout_ms: u32,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            meas_mode: MeasMode::FreqA,
            gate_mode: GateMode::LongFront,
            trigger_level_mode: TriggerLevelMode::FrontControl,
            trigger_slope_a: TriggerSlope::Positive,
            trigger_slope_b: TriggerSlope::Positive,
            trigger_level_a: 0.0,
            trigger_level_b: 0.0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CounterSettings {
    /// Check the range-limited fields.
    pub fn validate(&self) -> CounterResult<()> {
        validate_trigger_level(Setting::TriggerLevelA.name(), self.trigger_level_a)?;
        validate_trigger_level(Setting::TriggerLevelB.name(), self.trigger_level_b)?;
        Ok(())
    }

    /// Slope mirrored for `channel`.
    pub fn trigger_slope(&self, channel: Channel) -> TriggerSlope {
        match channel {
            Channel::A => self.trigger_slope_a,
            Channel::B => self.trigger_slope_b,
        }
    }

    /// Trigger level mirrored for `channel`.
    pub fn trigger_level(&self, channel: Channel) -> f64 {
        match channel {
            Channel::A => self.trigger_level_a,
            Channel::B => self.trigger_level_b,
        }
    }

    /// Every setting as a typed value, in the order they are pushed to the
    /// instrument.
    pub fn values(&self) -> [SettingValue; 8] {
        [
            SettingValue::GateMode(self.gate_mode),
            SettingValue::MeasMode(self.meas_mode),
            SettingValue::TriggerLevelMode(self.trigger_level_mode),
            SettingValue::TriggerSlope(Channel::A, self.trigger_slope_a),
            SettingValue::TriggerSlope(Channel::B, self.trigger_slope_b),
            SettingValue::TriggerLevel(Channel::A, self.trigger_level_a),
            SettingValue::TriggerLevel(Channel::B, self.trigger_level_b),
            SettingValue::TimeoutMs(self.timeout_ms),
        ]
    }
}

/// A named, individually settable counter setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// `meas_mode`
    MeasMode,
    /// `gate_mode`
    GateMode,
    /// `trigger_level_mode`
    TriggerLevelMode,
    /// `trigger_slope_a`
    TriggerSlopeA,
    /// `trigger_slope_b`
    TriggerSlopeB,
    /// `trigger_level_a`
    TriggerLevelA,
    /// `trigger_level_b`
    TriggerLevelB,
    /// `timeout_ms`
    TimeoutMs,
}

/// A typed value for one [`Setting`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingValue {
    /// Measurement function
    MeasMode(MeasMode),
    /// Gate mode
    GateMode(GateMode),
    /// Trigger level source
    TriggerLevelMode(TriggerLevelMode),
    /// Slope for one channel
    TriggerSlope(Channel, TriggerSlope),
    /// Trigger level for one channel (V)
    TriggerLevel(Channel, f64),
    /// Read timeout (ms)
    TimeoutMs(u32),
}

impl Setting {
    /// Every setting.
    pub const ALL: [Setting; 8] = [
        Setting::MeasMode,
        Setting::GateMode,
        Setting::TriggerLevelMode,
        Setting::TriggerSlopeA,
        Setting::TriggerSlopeB,
        Setting::TriggerLevelA,
        Setting::TriggerLevelB,
        Setting::TimeoutMs,
    ];

    /// Key used in config files.
    pub fn name(self) -> &'static str {
        match self {
            Setting::MeasMode => "meas_mode",
            Setting::GateMode => "gate_mode",
            Setting::TriggerLevelMode => "trigger_level_mode",
            Setting::TriggerSlopeA => "trigger_slope_a",
            Setting::TriggerSlopeB => "trigger_slope_b",
            Setting::TriggerLevelA => "trigger_level_a",
            Setting::TriggerLevelB => "trigger_level_b",
            Setting::TimeoutMs => "timeout_ms",
        }
    }

    /// Type-check `value` and convert it for this setting.
    ///
    /// Enumerated settings take a variant name or an integer ordinal. Trigger
    /// levels take a float or an integer and are range checked. The timeout
    /// takes a non-negative integer only.
    pub fn parse_value(self, value: &toml::Value) -> CounterResult<SettingValue> {
        match self {
            Setting::MeasMode => parse_enum(self, value, MeasMode::from_index)
                .map(SettingValue::MeasMode),
            Setting::GateMode => parse_enum(self, value, GateMode::from_index)
                .map(SettingValue::GateMode),
            Setting::TriggerLevelMode => parse_enum(self, value, TriggerLevelMode::from_index)
                .map(SettingValue::TriggerLevelMode),
            Setting::TriggerSlopeA => parse_enum(self, value, TriggerSlope::from_index)
                .map(|s| SettingValue::TriggerSlope(Channel::A, s)),
            Setting::TriggerSlopeB => parse_enum(self, value, TriggerSlope::from_index)
                .map(|s| SettingValue::TriggerSlope(Channel::B, s)),
            Setting::TriggerLevelA => {
                parse_level(self, value).map(|v| SettingValue::TriggerLevel(Channel::A, v))
            }
            Setting::TriggerLevelB => {
                parse_level(self, value).map(|v| SettingValue::TriggerLevel(Channel::B, v))
            }
            Setting::TimeoutMs => match value {
                toml::Value::Integer(ms) => u32::try_from(*ms)
                    .map(SettingValue::TimeoutMs)
                    .map_err(|_| CounterError::InvalidValue {
                        setting: self.name(),
                        value: ms.to_string(),
                    }),
                other => Err(CounterError::InvalidType {
                    setting: self.name(),
                    expected: "an integer number of milliseconds",
                    found: other.type_str(),
                }),
            },
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Setting {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `timeout` was the property name on older front ends
        let key = match s.trim() {
            "timeout" => "timeout_ms",
            other => other,
        };
        Setting::ALL
            .iter()
            .copied()
            .find(|setting| setting.name() == key)
            .ok_or_else(|| CounterError::UnknownSetting(s.to_string()))
    }
}

fn parse_enum<T>(
    setting: Setting,
    value: &toml::Value,
    from_index: fn(usize) -> Option<T>,
) -> CounterResult<T>
where
    T: FromStr<Err = CounterError>,
{
    match value {
        toml::Value::String(name) => name.parse::<T>().map_err(|_| CounterError::InvalidValue {
            setting: setting.name(),
            value: name.clone(),
        }),
        toml::Value::Integer(index) => usize::try_from(*index)
            .ok()
            .and_then(from_index)
            .ok_or_else(|| CounterError::InvalidValue {
                setting: setting.name(),
                value: index.to_string(),
            }),
        other => Err(CounterError::InvalidType {
            setting: setting.name(),
            expected: "a variant name or ordinal",
            found: other.type_str(),
        }),
    }
}

fn parse_level(setting: Setting, value: &toml::Value) -> CounterResult<f64> {
    let volts = match value {
        toml::Value::Float(v) => *v,
        toml::Value::Integer(v) => *v as f64,
        other => {
            return Err(CounterError::InvalidType {
                setting: setting.name(),
                expected: "a number of volts",
                found: other.type_str(),
            })
        }
    };
    validate_trigger_level(setting.name(), volts)?;
    Ok(volts)
}
