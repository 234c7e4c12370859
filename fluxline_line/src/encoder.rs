//! Serialization of point batches to the line protocol.
//!
//! ```text
//! <measurement>[,<tagK>=<tagV>...] <fieldK>=<fieldV>[,...] [<timestamp>]
//! ```

use itertools::Itertools;

use fluxline_common::precision::Precision;

use crate::error::{EncodeError, EncodeResult};
use crate::escape;
use crate::point::{Point, PointTimestamp};
use crate::schema::{self, SchemaRegistry, TIME_NAME};

/// Encodes a batch of points, newline-joined with no trailing newline.
///
/// Wire order follows the caller's point order.
///
/// # Errors
///
/// Returns the first validation error of any point in the batch.
pub fn encode_points(
    points: &[Point],
    schemas: &SchemaRegistry,
    database: &str,
    precision: Precision,
) -> EncodeResult<String> {
    Ok(points
        .iter()
        .map(|point| encode_point(point, schemas, database, precision))
        .collect::<EncodeResult<Vec<_>>>()?
        .join("\n"))
}

/// Encodes a single point.
///
/// # Errors
///
/// Returns a validation error for an empty measurement, a point without
/// fields, use of the reserved `time` name, a schema violation, or a
/// malformed raw timestamp.
pub fn encode_point(
    point: &Point,
    schemas: &SchemaRegistry,
    database: &str,
    precision: Precision,
) -> EncodeResult<String> {
    if point.measurement.is_empty() {
        return Err(EncodeError::EmptyMeasurement);
    }
    if point.fields.is_empty() {
        return Err(EncodeError::NoFields {
            measurement: point.measurement.clone(),
        });
    }
    if point.fields.contains_key(TIME_NAME) || point.tags.contains_key(TIME_NAME) {
        return Err(EncodeError::ReservedTimeName);
    }
    if let Some(overlap) = point.fields.keys().find(|name| point.tags.contains_key(*name)) {
        return Err(EncodeError::FieldTagOverlap(overlap.clone()));
    }

    let fields = match schemas.get(database, &point.measurement) {
        Some(declared) => {
            declared.check_tags(&point.tags)?;
            declared.coerce_fields(&point.fields)?
        }
        None => schema::coerce_fields_fallback(&point.fields),
    };

    let mut line = escape::measurement(&point.measurement);
    for (key, value) in &point.tags {
        line.push(',');
        line.push_str(&escape::tag(key));
        line.push('=');
        line.push_str(&escape::tag(value));
    }
    line.push(' ');
    line.push_str(
        &fields
            .iter()
            .map(|(key, value)| format!("{}={value}", escape::tag(key)))
            .join(","),
    );
    if let Some(timestamp) = &point.timestamp {
        line.push(' ');
        line.push_str(&cast_timestamp(timestamp, precision)?);
    }
    Ok(line)
}

/// Coerces a supplied timestamp to its wire form at the request precision.
fn cast_timestamp(timestamp: &PointTimestamp, precision: Precision) -> EncodeResult<String> {
    match timestamp {
        PointTimestamp::DateTime(value) => Ok(precision.encode_timestamp(*value)),
        PointTimestamp::Raw(value) => Ok(value.to_string()),
        PointTimestamp::RawString(value) => {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(EncodeError::InvalidTimestamp(value.clone()));
            }
            Ok(value.clone())
        }
    }
}
