use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::sync::OnceLock;

use crate::error::{EncodeError, EncodeResult};
use crate::escape;
use crate::value::FieldValue;

/// The name the server reserves for time columns.
pub const TIME_NAME: &str = "time";

/// Matches integers and decimals with an optional exponent.
fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?$").unwrap()
    })
}

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Float,
    Integer,
    String,
    Boolean,
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => "float".fmt(f),
            Self::Integer => "integer".fmt(f),
            Self::String => "string".fmt(f),
            Self::Boolean => "boolean".fmt(f),
        }
    }
}

/// Field and tag declarations for one `(database, measurement)` pair.
///
/// Field names are held sorted so encoder output is deterministic. Schemas
/// are created at client construction and are immutable thereafter.
#[derive(Debug, Clone)]
pub struct Schema {
    database: String,
    measurement: String,
    field_types: BTreeMap<String, FieldType>,
    tag_keys: BTreeSet<String>,
}

impl Schema {
    /// Creates a schema.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::FieldTagOverlap`] if a name appears in both
    /// sets and [`EncodeError::ReservedTimeName`] if either set declares
    /// `time`.
    pub fn new<S: Into<String>>(
        database: S,
        measurement: S,
        field_types: BTreeMap<String, FieldType>,
        tag_keys: BTreeSet<String>,
    ) -> EncodeResult<Self> {
        if field_types.contains_key(TIME_NAME) || tag_keys.contains(TIME_NAME) {
            return Err(EncodeError::ReservedTimeName);
        }
        if let Some(overlap) = field_types.keys().find(|name| tag_keys.contains(*name)) {
            return Err(EncodeError::FieldTagOverlap(overlap.clone()));
        }
        Ok(Self {
            database: database.into(),
            measurement: measurement.into(),
            field_types,
            tag_keys,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Coerces fields to their wire encoding, in declared (sorted) order.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownField`] for a field not in the declared
    /// list and [`EncodeError::TypeMismatch`] when a value cannot be coerced
    /// to its declared type.
    pub fn coerce_fields(
        &self,
        fields: &BTreeMap<String, FieldValue>,
    ) -> EncodeResult<Vec<(String, String)>> {
        if let Some(unknown) = fields
            .keys()
            .find(|name| !self.field_types.contains_key(*name))
        {
            return Err(EncodeError::UnknownField {
                measurement: self.measurement.clone(),
                field: unknown.clone(),
            });
        }

        let mut coerced = Vec::with_capacity(fields.len());
        for (name, field_type) in &self.field_types {
            let Some(value) = fields.get(name) else {
                continue;
            };
            coerced.push((name.clone(), self.coerce(name, *field_type, value)?));
        }
        Ok(coerced)
    }

    /// Validates that every tag key is declared.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownTag`] for an extraneous tag.
    pub fn check_tags(&self, tags: &BTreeMap<String, String>) -> EncodeResult<()> {
        if let Some(unknown) = tags.keys().find(|key| !self.tag_keys.contains(*key)) {
            return Err(EncodeError::UnknownTag {
                measurement: self.measurement.clone(),
                tag: unknown.clone(),
            });
        }
        Ok(())
    }

    fn coerce(&self, name: &str, field_type: FieldType, value: &FieldValue) -> EncodeResult<String> {
        let mismatch = || EncodeError::TypeMismatch {
            measurement: self.measurement.clone(),
            field: name.into(),
            expected: field_type,
            actual: value.type_name(),
        };
        match field_type {
            FieldType::Integer => {
                // Typed integers bypass the float path; values beyond 2^53
                // would lose precision there.
                let numeric = match value {
                    FieldValue::Integer(int) => return Ok(format!("{int}i")),
                    FieldValue::Float(float) => *float,
                    FieldValue::String(text) if numeric_pattern().is_match(text) => {
                        text.parse::<f64>().map_err(|_| mismatch())?
                    }
                    _ => return Err(mismatch()),
                };
                Ok(format!("{}i", numeric.floor() as i64))
            }
            FieldType::Float => {
                let numeric = match value {
                    FieldValue::Integer(int) => *int as f64,
                    FieldValue::Float(float) => *float,
                    FieldValue::String(text) if numeric_pattern().is_match(text) => {
                        text.parse::<f64>().map_err(|_| mismatch())?
                    }
                    _ => return Err(mismatch()),
                };
                Ok(numeric.to_string())
            }
            FieldType::String => match value {
                FieldValue::String(text) => Ok(escape::quoted(text)),
                _ => Err(mismatch()),
            },
            FieldType::Boolean => match value {
                FieldValue::Boolean(true) => Ok("T".into()),
                FieldValue::Boolean(false) => Ok("F".into()),
                _ => Err(mismatch()),
            },
        }
    }
}

/// Encodes fields without a schema: names ascending, strings quoted,
/// everything else stringified unchanged. No validation occurs.
pub fn coerce_fields_fallback(fields: &BTreeMap<String, FieldValue>) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.encode_schemaless()))
        .collect()
}

/// Schemas keyed by `(database, measurement)`.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<(String, String), Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: Schema) {
        self.schemas.insert(
            (schema.database.clone(), schema.measurement.clone()),
            schema,
        );
    }

    pub fn get(&self, database: &str, measurement: &str) -> Option<&Schema> {
        self.schemas
            .get(&(database.to_string(), measurement.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        let mut fields = BTreeMap::new();
        fields.insert("int".to_string(), FieldType::Integer);
        fields.insert("float".to_string(), FieldType::Float);
        fields.insert("string".to_string(), FieldType::String);
        fields.insert("bool".to_string(), FieldType::Boolean);
        let tags = BTreeSet::from(["host".to_string()]);
        Schema::new("db", "m", fields, tags).unwrap()
    }

    #[test]
    fn coerces_declared_types_in_sorted_order() {
        let schema = sample_schema();
        let mut fields = BTreeMap::new();
        fields.insert("int".to_string(), FieldValue::Integer(42));
        fields.insert("float".to_string(), FieldValue::Integer(43));
        fields.insert("string".to_string(), FieldValue::String("hello\"world".into()));
        fields.insert("bool".to_string(), FieldValue::Boolean(true));
        let coerced = schema.coerce_fields(&fields).unwrap();
        let rendered: Vec<String> = coerced
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        assert_eq!(
            rendered.join(","),
            "bool=T,float=43,int=42i,string=\"hello\\\"world\""
        );
    }

    #[test]
    fn integer_floors_numeric_input() {
        let schema = sample_schema();
        let mut fields = BTreeMap::new();
        fields.insert("int".to_string(), FieldValue::Float(7.9));
        assert_eq!(
            schema.coerce_fields(&fields).unwrap(),
            vec![("int".to_string(), "7i".to_string())]
        );
        fields.insert("int".to_string(), FieldValue::String("1.5e2".into()));
        assert_eq!(
            schema.coerce_fields(&fields).unwrap(),
            vec![("int".to_string(), "150i".to_string())]
        );
    }

    #[test]
    fn large_integers_keep_precision() {
        let schema = sample_schema();
        let mut fields = BTreeMap::new();
        fields.insert(
            "int".to_string(),
            FieldValue::Integer(9_007_199_254_740_993),
        );
        assert_eq!(
            schema.coerce_fields(&fields).unwrap(),
            vec![("int".to_string(), "9007199254740993i".to_string())]
        );
        fields.insert("int".to_string(), FieldValue::Integer(i64::MIN));
        assert_eq!(
            schema.coerce_fields(&fields).unwrap(),
            vec![("int".to_string(), format!("{}i", i64::MIN))]
        );
    }

    #[test]
    fn missing_declared_fields_are_skipped() {
        let schema = sample_schema();
        let mut fields = BTreeMap::new();
        fields.insert("bool".to_string(), FieldValue::Boolean(false));
        assert_eq!(
            schema.coerce_fields(&fields).unwrap(),
            vec![("bool".to_string(), "F".to_string())]
        );
    }

    #[test]
    fn rejects_extraneous_names() {
        let schema = sample_schema();
        let mut fields = BTreeMap::new();
        fields.insert("other".to_string(), FieldValue::Integer(1));
        assert!(matches!(
            schema.coerce_fields(&fields),
            Err(EncodeError::UnknownField { field, .. }) if field == "other"
        ));

        let mut tags = BTreeMap::new();
        tags.insert("region".to_string(), "us".to_string());
        assert!(matches!(
            schema.check_tags(&tags),
            Err(EncodeError::UnknownTag { tag, .. }) if tag == "region"
        ));
    }

    #[test]
    fn rejects_type_mismatch() {
        let schema = sample_schema();
        let mut fields = BTreeMap::new();
        fields.insert("int".to_string(), FieldValue::String("not a number".into()));
        assert!(matches!(
            schema.coerce_fields(&fields),
            Err(EncodeError::TypeMismatch { field, .. }) if field == "int"
        ));
        fields.clear();
        fields.insert("bool".to_string(), FieldValue::Integer(1));
        assert!(schema.coerce_fields(&fields).is_err());
    }

    #[test]
    fn rejects_reserved_and_overlapping_names() {
        let mut fields = BTreeMap::new();
        fields.insert("time".to_string(), FieldType::Integer);
        assert!(matches!(
            Schema::new("db", "m", fields, BTreeSet::new()),
            Err(EncodeError::ReservedTimeName)
        ));

        let mut fields = BTreeMap::new();
        fields.insert("host".to_string(), FieldType::String);
        let tags = BTreeSet::from(["host".to_string()]);
        assert!(matches!(
            Schema::new("db", "m", fields, tags),
            Err(EncodeError::FieldTagOverlap(name)) if name == "host"
        ));
    }

    #[test]
    fn fallback_is_ascending_and_unvalidated() {
        let mut fields = BTreeMap::new();
        fields.insert("b".to_string(), FieldValue::Integer(2));
        fields.insert("a".to_string(), FieldValue::Integer(1));
        assert_eq!(
            coerce_fields_fallback(&fields),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }
}
