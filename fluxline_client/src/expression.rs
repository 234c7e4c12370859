//! Typed combinators for building `where` clauses.
//!
//! Conditions render to query text with the same quoting rules as the rest
//! of the driver: identifiers double-quoted, string literals single-quoted,
//! timestamps as quoted UTC literals.
//!
//! ```
//! use fluxline_client::expression::{field, tag};
//!
//! let clause = field("water_level")
//!     .gt(8)
//!     .and(tag("location").eq("coyote_creek"));
//! assert_eq!(
//!     clause.to_string(),
//!     r#"("water_level" > 8 AND "location" = 'coyote_creek')"#
//! );
//! ```

use std::fmt::{self, Display, Formatter};

use fluxline_common::date_time::NanoDateTime;
use fluxline_line::escape;

/// A column reference in a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    name: String,
}

/// Starts a condition on a field column.
pub fn field<S: Into<String>>(name: S) -> Operand {
    Operand { name: name.into() }
}

/// Starts a condition on a tag column. Tags compare as strings.
pub fn tag<S: Into<String>>(name: S) -> Operand {
    Operand { name: name.into() }
}

/// A value on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    DateTime(NanoDateTime),
    /// Emitted verbatim.
    Raw(String),
}

impl Display for QueryValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
            Self::Boolean(true) => "TRUE".fmt(f),
            Self::Boolean(false) => "FALSE".fmt(f),
            Self::String(value) => escape::string_literal(value).fmt(f),
            Self::DateTime(value) => match value.to_query_literal_nanos() {
                Ok(literal) => literal.fmt(f),
                Err(_) => "INVALID_NANO_DATE_TIME".fmt(f),
            },
            Self::Raw(value) => value.fmt(f),
        }
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<NanoDateTime> for QueryValue {
    fn from(value: NanoDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl Operand {
    pub fn eq<V: Into<QueryValue>>(self, value: V) -> Condition {
        self.compare("=", value.into())
    }

    pub fn ne<V: Into<QueryValue>>(self, value: V) -> Condition {
        self.compare("!=", value.into())
    }

    pub fn gt<V: Into<QueryValue>>(self, value: V) -> Condition {
        self.compare(">", value.into())
    }

    pub fn gte<V: Into<QueryValue>>(self, value: V) -> Condition {
        self.compare(">=", value.into())
    }

    pub fn lt<V: Into<QueryValue>>(self, value: V) -> Condition {
        self.compare("<", value.into())
    }

    pub fn lte<V: Into<QueryValue>>(self, value: V) -> Condition {
        self.compare("<=", value.into())
    }

    /// Regular-expression match, `=~ /pattern/`.
    pub fn matches<S: AsRef<str>>(self, pattern: S) -> Condition {
        self.compare_raw("=~", format!("/{}/", pattern.as_ref()))
    }

    /// Negated regular-expression match, `!~ /pattern/`.
    pub fn not_matches<S: AsRef<str>>(self, pattern: S) -> Condition {
        self.compare_raw("!~", format!("/{}/", pattern.as_ref()))
    }

    fn compare(self, operator: &'static str, value: QueryValue) -> Condition {
        Condition {
            rendered: format!("{} {operator} {value}", escape::quoted(&self.name)),
        }
    }

    fn compare_raw(self, operator: &'static str, value: String) -> Condition {
        Condition {
            rendered: format!("{} {operator} {value}", escape::quoted(&self.name)),
        }
    }
}

/// A boolean condition over columns, renderable as query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    rendered: String,
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        Condition {
            rendered: format!("({} AND {})", self.rendered, other.rendered),
        }
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition {
            rendered: format!("({} OR {})", self.rendered, other.rendered),
        }
    }

    pub fn not(self) -> Condition {
        Condition {
            rendered: format!("NOT {}", self.rendered),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.rendered.fmt(f)
    }
}
