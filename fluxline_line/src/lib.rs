#![doc = include_str!("../README.md")]

/// Position-specific string escaping.
pub mod escape;

/// Batch point serialization.
pub mod encoder;

/// Encoding and validation errors.
pub mod error;

/// Measurement points and timestamps.
pub mod point;

/// Per-measurement field and tag declarations.
pub mod schema;

/// Typed field values.
pub mod value;

pub use encoder::{encode_point, encode_points};
pub use error::{EncodeError, EncodeResult};
pub use escape::{Ident, Raw};
pub use point::{Point, PointBuilder, PointTimestamp};
pub use schema::{FieldType, Schema, SchemaRegistry};
pub use value::FieldValue;
