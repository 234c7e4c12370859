use std::collections::BTreeMap;

use fluxline_common::date_time::NanoDateTime;

use crate::value::FieldValue;

/// A single measurement point.
///
/// Tag and field name sets must be disjoint and must not contain the
/// reserved name `time`; the encoder rejects violations before transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Measurement name.
    pub measurement: String,
    /// Indexed string annotations.
    pub tags: BTreeMap<String, String>,
    /// Typed values.
    pub fields: BTreeMap<String, FieldValue>,
    /// Optional timestamp; when absent the server assigns arrival time.
    pub timestamp: Option<PointTimestamp>,
}

/// A timestamp supplied on a write call.
#[derive(Debug, Clone, PartialEq)]
pub enum PointTimestamp {
    /// An instant, converted to the request precision on encode.
    DateTime(NanoDateTime),
    /// A raw integer, passed through at the request precision.
    Raw(i128),
    /// A raw decimal string, passed through at the request precision.
    RawString(String),
}

impl From<NanoDateTime> for PointTimestamp {
    fn from(value: NanoDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<i64> for PointTimestamp {
    fn from(value: i64) -> Self {
        Self::Raw(value.into())
    }
}

impl From<i128> for PointTimestamp {
    fn from(value: i128) -> Self {
        Self::Raw(value)
    }
}

impl Point {
    /// Starts building a point for a measurement.
    pub fn builder<S: Into<String>>(measurement: S) -> PointBuilder {
        PointBuilder {
            point: Self {
                measurement: measurement.into(),
                tags: BTreeMap::new(),
                fields: BTreeMap::new(),
                timestamp: None,
            },
        }
    }
}

/// Builder for [`Point`].
#[derive(Debug, Clone)]
pub struct PointBuilder {
    point: Point,
}

impl PointBuilder {
    pub fn tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.point.tags.insert(key.into(), value.into());
        self
    }

    pub fn field<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.point.fields.insert(key.into(), value.into());
        self
    }

    pub fn timestamp<T: Into<PointTimestamp>>(mut self, timestamp: T) -> Self {
        self.point.timestamp = Some(timestamp.into());
        self
    }

    /// A raw timestamp string passed through at the request precision.
    pub fn timestamp_string<S: Into<String>>(mut self, timestamp: S) -> Self {
        self.point.timestamp = Some(PointTimestamp::RawString(timestamp.into()));
        self
    }

    pub fn build(self) -> Point {
        self.point
    }
}
