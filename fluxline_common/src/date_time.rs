#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// RFC 3339 with exactly nine fractional digits, the server's lossless form.
const RFC3339_NANOS: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

/// Query-text timestamp literal, millisecond resolution.
const QUERY_MILLIS: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
);

/// Query-text timestamp literal, nanosecond resolution.
const QUERY_NANOS: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:9]"
);

/// A UTC instant carrying full nanosecond resolution.
///
/// Ordinary accessors behave like a millisecond-resolution date via
/// [`NanoDateTime::unix_millis`], while [`NanoDateTime::nano_string`] exposes
/// the decimal unix-nanoseconds form used on the wire. The two views always
/// agree modulo one million.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NanoDateTime(OffsetDateTime);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("timestamp out of range")]
    OutOfRange,
    #[error("invalid unix nanosecond string `{0}`")]
    InvalidNanoString(String),
    #[error("invalid date time string format `{0}`")]
    InvalidFormat(String),
}

impl NanoDateTime {
    pub const UNIX_EPOCH: Self = Self(OffsetDateTime::UNIX_EPOCH);

    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Creates a date time from unix nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns [`DateTimeError::OutOfRange`] if the instant is not
    /// representable.
    pub fn from_unix_nanos(nanos: i128) -> Result<Self, DateTimeError> {
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| DateTimeError::OutOfRange)
            .map(Self)
    }

    /// Creates a date time from unix milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`DateTimeError::OutOfRange`] if the instant is not
    /// representable.
    pub fn from_unix_millis(millis: i64) -> Result<Self, DateTimeError> {
        Self::from_unix_nanos(millis as i128 * 1_000_000)
    }

    /// Parses a decimal unix-nanoseconds string, the precise wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DateTimeError::InvalidNanoString`] unless the input is all
    /// ASCII digits, and [`DateTimeError::OutOfRange`] if the instant is not
    /// representable.
    pub fn from_nano_string<S: AsRef<str>>(input: S) -> Result<Self, DateTimeError> {
        let input = input.as_ref();
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateTimeError::InvalidNanoString(input.into()));
        }
        let nanos: i128 = input
            .parse()
            .map_err(|_| DateTimeError::InvalidNanoString(input.into()))?;
        Self::from_unix_nanos(nanos)
    }

    /// Parses an RFC 3339 / ISO-8601 string with up to nine fractional
    /// digits; shorter fractions are zero-extended to nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns [`DateTimeError::InvalidFormat`] if parsing fails.
    pub fn parse_rfc3339<S: AsRef<str>>(input: S) -> Result<Self, DateTimeError> {
        OffsetDateTime::parse(input.as_ref(), &Rfc3339)
            .map_err(|_| DateTimeError::InvalidFormat(input.as_ref().into()))
            .map(Self)
    }

    /// Unix timestamp in nanoseconds.
    pub fn unix_nanos(self) -> i128 {
        self.0.unix_timestamp_nanos()
    }

    /// Unix timestamp truncated to milliseconds.
    pub fn unix_millis(self) -> i64 {
        (self.0.unix_timestamp_nanos().div_euclid(1_000_000)) as i64
    }

    /// Decimal unix-nanoseconds string; nineteen digits for current dates.
    pub fn nano_string(self) -> String {
        self.unix_nanos().to_string()
    }

    /// Formats with the nine-digit fractional form the server emits for
    /// nanosecond time columns.
    ///
    /// # Errors
    ///
    /// Returns an error if formatting fails.
    pub fn format_rfc3339_nanos(&self) -> Result<String, time::error::Format> {
        self.0.format(RFC3339_NANOS)
    }

    /// Formats the millisecond-resolution double-quoted literal embedded in
    /// query text.
    ///
    /// # Errors
    ///
    /// Returns an error if formatting fails.
    pub fn to_query_literal(&self) -> Result<String, time::error::Format> {
        Ok(format!("\"{}\"", self.0.format(QUERY_MILLIS)?))
    }

    /// Formats the nanosecond-resolution double-quoted literal embedded in
    /// query text.
    ///
    /// # Errors
    ///
    /// Returns an error if formatting fails.
    pub fn to_query_literal_nanos(&self) -> Result<String, time::error::Format> {
        Ok(format!("\"{}\"", self.0.format(QUERY_NANOS)?))
    }
}

impl Deref for NanoDateTime {
    type Target = OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for NanoDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.format_rfc3339_nanos() {
            Ok(formatted) => formatted.fmt(f),
            Err(_) => "INVALID_NANO_DATE_TIME".fmt(f),
        }
    }
}

impl FromStr for NanoDateTime {
    type Err = DateTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_rfc3339(s)
    }
}

impl From<OffsetDateTime> for NanoDateTime {
    fn from(value: OffsetDateTime) -> Self {
        Self(value)
    }
}

impl From<NanoDateTime> for OffsetDateTime {
    fn from(value: NanoDateTime) -> Self {
        value.0
    }
}

#[cfg(feature = "serde")]
impl Serialize for NanoDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for NanoDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de;
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}
