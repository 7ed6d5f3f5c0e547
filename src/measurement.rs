//! Counter readings and the response decoder.
//!
//! The HP 5316 answers a read with one fixed-width ASCII record:
//!
//! ```text
//! F00001000.000000000
//! ^^------ value ----^
//! |
//! tag: O overflow, F frequency, T time, X error, ' ' no unit
//! ```
//!
//! Byte 0 is the tag. The value is read from bytes 1..20, or up to the end of
//! a shorter record.

use serde::Serialize;
use std::fmt;
use std::num::ParseFloatError;
use thiserror::Error;

/// End of the value field (exclusive). The tag is byte 0 and the value field is
/// bytes 1..20; anything from byte 20 on is ignored. Shorter responses are
/// parsed up to their end.
const VALUE_END: usize = 20;

/// Unit tag of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Unit {
    /// Frequency (`F`)
    Hertz,
    /// Time (`T`)
    Seconds,
    /// No unit (space, or an overflow record)
    #[default]
    None,
    /// The counter flagged an error (`X`)
    Error,
}

impl Unit {
    /// Short label used in printed readings.
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Hertz => "HZ",
            Unit::Seconds => "SEC",
            Unit::None => "NONE",
            Unit::Error => "ERROR",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded counter reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Response text with the line terminator removed
    pub raw: String,
    /// Parsed value field
    pub value: f64,
    /// Unit tag
    pub unit: Unit,
    /// Display overflowed
    pub overflow: bool,
}

/// Why a response could not be decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Nothing but a line terminator was received.
    #[error("Empty response")]
    Empty,

    /// The value field is not a decimal number.
    #[error("Invalid value field in response '{raw}': {source}")]
    InvalidValue {
        /// Full response text
        raw: String,
        /// Underlying float parse failure
        #[source]
        source: ParseFloatError,
    },
}

/// Decode one response line into a [`Measurement`].
///
/// Unknown tag characters decode with no unit and no overflow. A value field
/// that is not numeric is an error.
pub fn decode(response: &str) -> Result<Measurement, DecodeError> {
    let raw = response.trim_end_matches(['\r', '\n']);
    let mut chars = raw.char_indices();
    let (_, tag) = chars.next().ok_or(DecodeError::Empty)?;

    let start = tag.len_utf8();
    let end = raw
        .char_indices()
        .nth(VALUE_END)
        .map_or(raw.len(), |(i, _)| i);
    let field = &raw[start..end];

    let value = field
        .trim()
        .parse::<f64>()
        .map_err(|source| DecodeError::InvalidValue {
            raw: raw.to_string(),
            source,
        })?;

    let (unit, overflow) = match tag {
        'O' => (Unit::None, true),
        'F' => (Unit::Hertz, false),
        'T' => (Unit::Seconds, false),
        'X' => (Unit::Error, false),
        ' ' => (Unit::None, false),
        other => {
            tracing::debug!(tag = ?other, raw, "HP 5316: unrecognised response tag");
            (Unit::None, false)
        }
    };

    Ok(Measurement {
        raw: raw.to_string(),
        value,
        unit,
        overflow,
    })
}
