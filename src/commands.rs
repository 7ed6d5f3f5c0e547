//! HP 5316 command set
//!
//! The counter speaks plain two/three letter ASCII tokens, not SCPI. Every
//! enumerated setting maps through a static table from its ordinal to the
//! token the instrument expects:
//!
//! | Setting            | Tokens        |
//! |--------------------|---------------|
//! | Gate mode          | `GA0`..`GA3`  |
//! | Trigger level mode | `TR0`, `TR1`  |
//! | Slope, channel A   | `AS0`, `AS1`  |
//! | Slope, channel B   | `BS0`, `BS1`  |
//! | Function           | `FN0`..`FN14` |
//!
//! Trigger levels carry a parameter (`AT+0.25`, `BT-1.00`). The bare commands
//! are `RE` (reset), `IN` (initialize) and `WA1` (single-shot wait mode).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CounterError;

// =============================================================================
// Command tables
// =============================================================================

/// Gate mode tokens, indexed by [`GateMode::index`].
pub static GATE_MODE_COMMANDS: [&str; 4] = ["GA0", "GA1", "GA2", "GA3"];

/// Trigger level mode tokens, indexed by [`TriggerLevelMode::index`].
pub static TRIGGER_LEVEL_MODE_COMMANDS: [&str; 2] = ["TR0", "TR1"];

/// Channel A slope tokens, indexed by [`TriggerSlope::index`].
pub static TRIGGER_SLOPE_A_COMMANDS: [&str; 2] = ["AS0", "AS1"];

/// Channel B slope tokens, indexed by [`TriggerSlope::index`].
pub static TRIGGER_SLOPE_B_COMMANDS: [&str; 2] = ["BS0", "BS1"];

/// Measurement function tokens, indexed by [`MeasMode::index`].
pub static MEAS_MODE_COMMANDS: [&str; 15] = [
    "FN0", "FN1", "FN2", "FN3", "FN4", "FN5", "FN6", "FN7", "FN8", "FN9", "FN10", "FN11", "FN12",
    "FN13", "FN14",
];

/// Lowest trigger level the counter accepts, in volts.
pub const TRIGGER_LEVEL_MIN: f64 = -2.5;

/// Highest trigger level the counter accepts, in volts.
pub const TRIGGER_LEVEL_MAX: f64 = 2.5;

// =============================================================================
// Setting enums
// =============================================================================

/// Generates the ordinal/name plumbing shared by every setting enum.
macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $index:literal => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant = $index ),+
        }

        impl $name {
            /// Every variant in ordinal order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Ordinal used to index the command table.
            pub fn index(self) -> usize {
                self as usize
            }

            /// Variant for an ordinal, if one exists.
            pub fn from_index(index: usize) -> Option<Self> {
                Self::ALL.get(index).copied()
            }

            /// snake_case name as used in config files and on the command line.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = CounterError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == wanted)
                    .ok_or_else(|| CounterError::InvalidValue {
                        setting: $label,
                        value: s.to_string(),
                    })
            }
        }
    };
}

setting_enum! {
    /// Gate source and duration.
    GateMode, "gate_mode" {
        /// Long gate, front panel control
        LongFront = 0 => "long_front",
        /// Short gate, front panel control
        ShortFront = 1 => "short_front",
        /// Long gate, rear panel control
        LongRear = 2 => "long_rear",
        /// Short gate, rear panel control
        ShortRear = 3 => "short_rear",
    }
}

setting_enum! {
    /// Where the trigger level comes from.
    TriggerLevelMode, "trigger_level_mode" {
        /// Front panel trigger level knobs
        FrontControl = 0 => "front_control",
        /// Levels programmed over the bus (`AT`/`BT`)
        SetLevel = 1 => "set_level",
    }
}

setting_enum! {
    /// Trigger edge polarity.
    TriggerSlope, "trigger_slope" {
        /// Rising edge
        Positive = 0 => "positive",
        /// Falling edge
        Negative = 1 => "negative",
    }
}

setting_enum! {
    /// Measurement function (`FN` codes).
    MeasMode, "meas_mode" {
        /// Display test
        DisplayTest = 0 => "display_test",
        /// Frequency, channel A
        FreqA = 1 => "freq_a",
        /// Time interval A to B
        IntAToB = 2 => "int_a_to_b",
        /// Time interval with delay
        IntDelay = 3 => "int_delay",
        /// Ratio A/B
        RatioAB = 4 => "ratio_ab",
        /// Frequency, channel C
        FreqC = 5 => "freq_c",
        /// Totalize, stop
        TotalizeStop = 6 => "totalize_stop",
        /// Period, channel A
        PeriodA = 7 => "period_a",
        /// Time interval average A to B
        IntAvgAToB = 8 => "int_avg_a_to_b",
        /// Internal 10 MHz check
        Check10MHz = 9 => "check_10mhz",
        /// A gated by B
        AGatedByB = 10 => "a_gated_by_b",
        /// Gate time
        GateTime = 11 => "gate_time",
        /// Totalize, start
        TotalizeStart = 12 => "totalize_start",
        /// Frequency A, armed by positive edge of B
        FreqAArmedByBPos = 13 => "freq_a_armed_by_b_pos",
        /// Frequency A, armed by negative edge of B
        FreqAArmedByBNeg = 14 => "freq_a_armed_by_b_neg",
    }
}

impl GateMode {
    /// `GA` token for this mode.
    pub fn command(self) -> &'static str {
        GATE_MODE_COMMANDS[self.index()]
    }
}

impl TriggerLevelMode {
    /// `TR` token for this mode.
    pub fn command(self) -> &'static str {
        TRIGGER_LEVEL_MODE_COMMANDS[self.index()]
    }
}

impl MeasMode {
    /// `FN` token for this function.
    pub fn command(self) -> &'static str {
        MEAS_MODE_COMMANDS[self.index()]
    }
}

/// Input channel with a programmable trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Channel A
    A,
    /// Channel B
    B,
}

impl Channel {
    /// Slope token for this channel.
    pub fn slope_command(self, slope: TriggerSlope) -> &'static str {
        match self {
            Channel::A => TRIGGER_SLOPE_A_COMMANDS[slope.index()],
            Channel::B => TRIGGER_SLOPE_B_COMMANDS[slope.index()],
        }
    }

    fn level_prefix(self) -> &'static str {
        match self {
            Channel::A => "AT",
            Channel::B => "BT",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::A => f.write_str("A"),
            Channel::B => f.write_str("B"),
        }
    }
}

/// Check a trigger level against the counter's input range.
///
/// NaN is rejected along with anything outside [-2.5, 2.5] volts.
pub fn validate_trigger_level(setting: &'static str, volts: f64) -> Result<(), CounterError> {
    if (TRIGGER_LEVEL_MIN..=TRIGGER_LEVEL_MAX).contains(&volts) {
        Ok(())
    } else {
        Err(CounterError::OutOfRange {
            setting,
            value: volts,
            min: TRIGGER_LEVEL_MIN,
            max: TRIGGER_LEVEL_MAX,
        })
    }
}

// =============================================================================
// Outbound commands
// =============================================================================

/// One message written to the counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Select gate mode (`GAn`)
    Gate(GateMode),
    /// Select trigger level source (`TRn`)
    TriggerLevelMode(TriggerLevelMode),
    /// Select trigger slope (`ASn` / `BSn`)
    Slope(Channel, TriggerSlope),
    /// Select measurement function (`FNn`)
    Function(MeasMode),
    /// Program a trigger level in volts (`AT±x.xx` / `BT±x.xx`)
    TriggerLevel(Channel, f64),
    /// Soft reset (`RE`)
    Reset,
    /// Full re-initialize (`IN`)
    Initialize,
    /// Single-shot wait mode (`WA1`)
    WaitSingle,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Command::Gate(mode) => f.write_str(mode.command()),
            Command::TriggerLevelMode(mode) => f.write_str(mode.command()),
            Command::Slope(channel, slope) => f.write_str(channel.slope_command(slope)),
            Command::Function(mode) => f.write_str(mode.command()),
            Command::TriggerLevel(channel, volts) => {
                write!(f, "{}{:+.2}", channel.level_prefix(), volts)
            }
            Command::Reset => f.write_str("RE"),
            Command::Initialize => f.write_str("IN"),
            Command::WaitSingle => f.write_str("WA1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_follow_ordinals() {
        for (i, mode) in MeasMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
            assert_eq!(mode.command(), format!("FN{}", i));
        }
        for (i, mode) in GateMode::ALL.iter().enumerate() {
            assert_eq!(mode.command(), format!("GA{}", i));
        }
        assert_eq!(MeasMode::ALL.len(), 15);
        assert_eq!(GateMode::ALL.len(), 4);
    }

    #[test]
    fn test_period_a_is_fn7() {
        assert_eq!(Command::Function(MeasMode::PeriodA).to_string(), "FN7");
    }

    #[test]
    fn test_slope_commands_per_channel() {
        assert_eq!(
            Command::Slope(Channel::A, TriggerSlope::Negative).to_string(),
            "AS1"
        );
        assert_eq!(
            Command::Slope(Channel::B, TriggerSlope::Positive).to_string(),
            "BS0"
        );
    }

    #[test]
    fn test_trigger_level_format() {
        let cases = [
            (Channel::A, 0.01, "AT+0.01"),
            (Channel::A, 0.0, "AT+0.00"),
            (Channel::B, -2.5, "BT-2.50"),
            (Channel::B, 1.234, "BT+1.23"),
            (Channel::A, 2.5, "AT+2.50"),
        ];
        for (channel, volts, expected) in cases {
            assert_eq!(Command::TriggerLevel(channel, volts).to_string(), expected);
        }
    }

    #[test]
    fn test_bare_commands() {
        assert_eq!(Command::Reset.to_string(), "RE");
        assert_eq!(Command::Initialize.to_string(), "IN");
        assert_eq!(Command::WaitSingle.to_string(), "WA1");
    }

    #[test]
    fn test_from_str_accepts_kebab_and_case() {
        assert_eq!("period_a".parse::<MeasMode>().ok(), Some(MeasMode::PeriodA));
        assert_eq!("Period-A".parse::<MeasMode>().ok(), Some(MeasMode::PeriodA));
        assert_eq!(
            "short_rear".parse::<GateMode>().ok(),
            Some(GateMode::ShortRear)
        );
        assert!(matches!(
            "sideways".parse::<TriggerSlope>(),
            Err(CounterError::InvalidValue { setting: "trigger_slope", .. })
        ));
    }

    #[test]
    fn test_from_index_bounds() {
        assert_eq!(MeasMode::from_index(14), Some(MeasMode::FreqAArmedByBNeg));
        assert_eq!(MeasMode::from_index(15), None);
        assert_eq!(TriggerLevelMode::from_index(1), Some(TriggerLevelMode::SetLevel));
    }

    #[test]
    fn test_validate_trigger_level() {
        assert!(validate_trigger_level("trigger_level_a", -2.5).is_ok());
        assert!(validate_trigger_level("trigger_level_a", 2.5).is_ok());
        assert!(validate_trigger_level("trigger_level_a", 2.51).is_err());
        assert!(validate_trigger_level("trigger_level_a", -3.0).is_err());
        assert!(validate_trigger_level("trigger_level_a", f64::NAN).is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: MeasMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"check_10mhz\"").unwrap();
        assert_eq!(parsed.mode, MeasMode::Check10MHz);
        assert_eq!(parsed.mode.to_string(), "check_10mhz");
    }
}
