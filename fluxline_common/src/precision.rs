use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

use crate::date_time::{DateTimeError, NanoDateTime};

/// Unit of integer timestamps on the wire.
///
/// Sent as `epoch` on queries and `precision` on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrecisionError {
    #[error("unknown precision `{0}`")]
    UnknownPrecision(String),
    #[error(transparent)]
    DateTime(#[from] DateTimeError),
}

impl Precision {
    /// The short wire tag for this precision.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nanoseconds => "n",
            Self::Microseconds => "u",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }

    /// Nanoseconds per unit of this precision.
    pub const fn nanos_per_unit(self) -> i128 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60 * 1_000_000_000,
            Self::Hours => 3_600 * 1_000_000_000,
        }
    }

    /// Converts an instant to a decimal integer timestamp at this precision.
    pub fn encode_timestamp(self, value: NanoDateTime) -> String {
        value
            .unix_nanos()
            .div_euclid(self.nanos_per_unit())
            .to_string()
    }

    /// Converts an integer timestamp at this precision back to an instant.
    ///
    /// # Errors
    ///
    /// Returns [`PrecisionError::DateTime`] if the scaled instant is not
    /// representable.
    pub fn parse_timestamp(self, value: i128) -> Result<NanoDateTime, PrecisionError> {
        let nanos = value
            .checked_mul(self.nanos_per_unit())
            .ok_or(DateTimeError::OutOfRange)?;
        Ok(NanoDateTime::from_unix_nanos(nanos)?)
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "n" => Ok(Self::Nanoseconds),
            "u" => Ok(Self::Microseconds),
            "ms" => Ok(Self::Milliseconds),
            "s" => Ok(Self::Seconds),
            "m" => Ok(Self::Minutes),
            "h" => Ok(Self::Hours),
            other => Err(PrecisionError::UnknownPrecision(other.into())),
        }
    }
}
