use thiserror::Error;

use crate::schema::FieldType;

/// Validation failures raised before any transport occurs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("point is missing a measurement name")]
    EmptyMeasurement,
    #[error("point on measurement `{measurement}` has no fields")]
    NoFields { measurement: String },
    #[error("`time` is reserved and cannot be declared as a field or tag name")]
    ReservedTimeName,
    #[error("name `{0}` is declared as both a field and a tag")]
    FieldTagOverlap(String),
    #[error("field `{field}` is not declared in the schema for measurement `{measurement}`")]
    UnknownField {
        measurement: String,
        field: String,
    },
    #[error("tag `{tag}` is not declared in the schema for measurement `{measurement}`")]
    UnknownTag {
        measurement: String,
        tag: String,
    },
    #[error(
        "field `{field}` on measurement `{measurement}` expected a {expected} value, got {actual}"
    )]
    TypeMismatch {
        measurement: String,
        field: String,
        expected: FieldType,
        actual: &'static str,
    },
    #[error("raw timestamp `{0}` is not a decimal integer")]
    InvalidTimestamp(String),
}

pub type EncodeResult<T> = Result<T, EncodeError>;
