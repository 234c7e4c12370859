//! Decoding of query responses into flat row tables.
//!
//! The wire shape is `{ results: [ { series?: [ { name?, tags?, columns,
//! values } ], error? } ] }`. Each result entry flattens to one [`Results`]
//! value: rows of all series concatenated in series order, plus a recorded
//! group per series for exact tag-set lookup.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::ops::Range;

use fluxline_common::date_time::NanoDateTime;
use fluxline_common::precision::Precision;

use crate::error::{ClientError, ClientResult};

/// A full query response as decoded from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub results: Vec<WireResult>,
}

/// One result entry: either series blocks or an error string.
#[derive(Debug, Clone, Deserialize)]
pub struct WireResult {
    #[serde(default)]
    pub series: Vec<WireSeries>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One series block.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSeries {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<JsonValue>>,
}

/// One flattened row: the decoded time column plus the remaining columns
/// and the series tags, column values unchanged from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The decoded `time` column, when the series has one.
    pub time: Option<NanoDateTime>,
    /// Remaining columns and tags by name.
    pub values: BTreeMap<String, JsonValue>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.values.get(column)
    }

    /// Convenience accessor for string-valued columns and tags.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(JsonValue::as_str)
    }
}

/// A recorded series: its name, tag map, and the row range it produced.
#[derive(Debug, Clone, PartialEq)]
struct Group {
    name: Option<String>,
    tags: BTreeMap<String, String>,
    rows: Range<usize>,
}

/// A borrowed view of one recorded series group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRef<'a> {
    pub name: Option<&'a str>,
    pub tags: &'a BTreeMap<String, String>,
    pub rows: &'a [Row],
}

/// The flattened rows of one result entry, with group lookup by tag set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    rows: Vec<Row>,
    groups: Vec<Group>,
}

impl Results {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Returns the rows of the first series whose tag map exactly equals
    /// `matcher`, or an empty slice.
    ///
    /// All series in one entry share the same tag-key set, so equality
    /// reduces to comparing values over the shared key list.
    pub fn group(&self, matcher: &BTreeMap<String, String>) -> &[Row] {
        self.groups
            .iter()
            .find(|group| group.tags == *matcher)
            .map_or(&[], |group| &self.rows[group.rows.clone()])
    }

    /// Returns every recorded series group, in input order.
    pub fn groups(&self) -> Vec<GroupRef<'_>> {
        self.groups
            .iter()
            .map(|group| GroupRef {
                name: group.name.as_deref(),
                tags: &group.tags,
                rows: &self.rows[group.rows.clone()],
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Fails with the first non-empty `error` string in any result entry.
///
/// # Errors
///
/// Returns [`ClientError::Results`] carrying the server's message.
pub fn assert_no_errors(response: &WireResponse) -> ClientResult<()> {
    for entry in &response.results {
        if let Some(error) = &entry.error {
            if !error.is_empty() {
                return Err(ClientError::Results(error.clone()));
            }
        }
    }
    Ok(())
}

/// Parses every result entry of a response.
///
/// # Errors
///
/// Fails on a result-entry error string or a malformed time column.
pub fn parse_many(response: &WireResponse, precision: Precision) -> ClientResult<Vec<Results>> {
    assert_no_errors(response)?;
    response
        .results
        .iter()
        .map(|entry| parse_result(entry, precision))
        .collect()
}

/// Parses a response expected to contain exactly one result entry.
///
/// # Errors
///
/// Fails on a result-entry error string, a malformed time column, or an
/// unexpected number of entries.
pub fn parse_single(response: &WireResponse, precision: Precision) -> ClientResult<Results> {
    assert_no_errors(response)?;
    if response.results.len() != 1 {
        return Err(ClientError::Results(format!(
            "expected one result entry, got {}",
            response.results.len()
        )));
    }
    parse_result(&response.results[0], precision)
}

fn parse_result(entry: &WireResult, precision: Precision) -> ClientResult<Results> {
    let mut rows = Vec::new();
    let mut groups = Vec::new();
    for series in &entry.series {
        let start = rows.len();
        for value_row in &series.values {
            let mut row = Row {
                time: None,
                values: BTreeMap::new(),
            };
            for (column, value) in series.columns.iter().zip(value_row) {
                if column == "time" {
                    row.time = Some(parse_time(value, precision)?);
                } else {
                    row.values.insert(column.clone(), value.clone());
                }
            }
            // Tag keys never overlap column names by protocol invariant.
            for (key, value) in &series.tags {
                row.values
                    .insert(key.clone(), JsonValue::String(value.clone()));
            }
            rows.push(row);
        }
        groups.push(Group {
            name: series.name.clone(),
            tags: series.tags.clone(),
            rows: start..rows.len(),
        });
    }
    Ok(Results { rows, groups })
}

/// ISO strings take the lossless nanosecond path; integers are scaled at
/// the response precision.
fn parse_time(value: &JsonValue, precision: Precision) -> ClientResult<NanoDateTime> {
    match value {
        JsonValue::String(iso) => Ok(NanoDateTime::parse_rfc3339(iso)?),
        JsonValue::Number(number) => {
            let raw = number.as_i64().ok_or_else(|| {
                ClientError::Results(format!("time column value `{number}` is not an integer"))
            })?;
            Ok(precision.parse_timestamp(raw.into())?)
        }
        other => Err(ClientError::Results(format!(
            "time column value `{other}` is neither a string nor a number"
        ))),
    }
}
