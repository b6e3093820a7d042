//! Dataset representation for validation.
//!
//! A [`DataSet`] is the unit every validator consumes: a whole table for
//! one-shot validation, one bounded chunk of a larger source, or the payloads
//! collected for a single streaming window.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// A value in a dataset.
///
/// Represents different types of values that can appear in data records.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Null/missing value
    Null,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Timestamp value (ISO 8601 string)
    Timestamp(String),
    /// Map/struct value
    Map(HashMap<String, DataValue>),
    /// List/array value
    List(Vec<DataValue>),
}

static NULL: DataValue = DataValue::Null;

impl DataValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Returns true for nulls and NaN floats, which all rule statistics treat
    /// as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::String(_) => "string",
            DataValue::Int(_) => "int64",
            DataValue::Float(_) => "float64",
            DataValue::Bool(_) => "boolean",
            DataValue::Timestamp(_) => "timestamp",
            DataValue::Map(_) => "map",
            DataValue::List(_) => "list",
        }
    }

    /// Attempts to get this value as a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get this value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DataValue::Float(f) => Some(*f),
            DataValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Coerces this value to a number.
    ///
    /// Numeric strings are parsed; anything that does not yield a finite
    /// number is dropped rather than treated as a violation.
    pub fn as_numeric(&self) -> Option<f64> {
        let n = match self {
            DataValue::Int(i) => *i as f64,
            DataValue::Float(f) => *f,
            DataValue::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }

    /// Attempts to interpret this value as a UTC timestamp.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            DataValue::Timestamp(s) | DataValue::String(s) => parse_timestamp(s),
            DataValue::Int(epoch) => epoch_to_datetime(*epoch),
            _ => None,
        }
    }

    /// Text form used for pattern matching.
    pub fn display_string(&self) -> String {
        match self {
            DataValue::Null => String::new(),
            DataValue::String(s) | DataValue::Timestamp(s) => s.clone(),
            DataValue::Int(i) => i.to_string(),
            DataValue::Float(f) => f.to_string(),
            DataValue::Bool(b) => b.to_string(),
            DataValue::Map(_) | DataValue::List(_) => self.to_json().to_string(),
        }
    }

    /// Hashable identity of this value.
    ///
    /// Integral floats share the key of the equal integer so that `1` and
    /// `1.0` collide, while `1` and `"1"` do not.
    pub fn canonical_key(&self) -> String {
        match self {
            DataValue::Null => "null".to_string(),
            DataValue::String(s) | DataValue::Timestamp(s) => format!("s:{}", s),
            DataValue::Int(i) => format!("n:{}", i),
            DataValue::Float(f) => numeric_key(*f),
            DataValue::Bool(b) => format!("b:{}", b),
            DataValue::Map(_) | DataValue::List(_) => format!("j:{}", self.to_json()),
        }
    }

    /// Converts this value into JSON.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            DataValue::Null => Value::Null,
            DataValue::String(s) | DataValue::Timestamp(s) => Value::String(s.clone()),
            DataValue::Int(i) => Value::from(*i),
            DataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DataValue::Bool(b) => Value::Bool(*b),
            DataValue::Map(m) => {
                let mut keys: Vec<&String> = m.keys().collect();
                keys.sort();
                Value::Object(
                    keys.into_iter()
                        .map(|k| (k.clone(), m[k].to_json()))
                        .collect(),
                )
            }
            DataValue::List(l) => Value::Array(l.iter().map(DataValue::to_json).collect()),
        }
    }
}

/// Canonical key for a JSON scalar, consistent with [`DataValue::canonical_key`].
///
/// Returns `None` for arrays and objects, which cannot be set members.
pub fn json_canonical_key(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(format!("b:{}", b)),
        Value::String(s) => Some(format!("s:{}", s)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(format!("n:{}", i)),
            None => n.as_f64().map(numeric_key),
        },
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn numeric_key(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("n:{}", f as i64)
    } else {
        format!("n:{}", f)
    }
}

fn epoch_to_datetime(epoch: i64) -> Option<DateTime<Utc>> {
    // Large values are milliseconds
    if epoch.abs() > 10_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

/// Parses a timestamp string in multiple formats.
///
/// Supports:
/// - ISO 8601 / RFC 3339 (e.g., "2024-01-15T10:30:00Z", "2024-01-15T10:30:00+00:00")
/// - Unix epoch seconds (e.g., "1705318200")
/// - Unix epoch milliseconds (e.g., "1705318200000")
/// - Date only format (e.g., "2024-01-15")
/// - Common datetime formats (e.g., "2024-01-15 10:30:00")
pub fn parse_timestamp(ts_str: &str) -> Option<DateTime<Utc>> {
    let ts_str = ts_str.trim();
    if ts_str.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(ts_str) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(epoch) = ts_str.parse::<i64>() {
        return epoch_to_datetime(epoch);
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(ts_str, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(ts_str, "%Y-%m-%d") {
        let datetime = date.and_hms_opt(0, 0, 0)?;
        return Some(DateTime::from_naive_utc_and_offset(datetime, Utc));
    }

    ts_str.parse::<DateTime<Utc>>().ok()
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Int(i)
    }
}

impl From<f64> for DataValue {
    fn from(f: f64) -> Self {
        DataValue::Float(f)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}

impl From<serde_json::Value> for DataValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => DataValue::Null,
            Value::Bool(b) => DataValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DataValue::Int(i),
                None => n.as_f64().map(DataValue::Float).unwrap_or(DataValue::Null),
            },
            Value::String(s) => DataValue::String(s),
            Value::Array(items) => DataValue::List(items.into_iter().map(DataValue::from).collect()),
            Value::Object(map) => DataValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, DataValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A single row of data.
pub type DataRow = HashMap<String, DataValue>;

/// Builds a row from a JSON object.
pub fn row_from_json(object: serde_json::Map<String, serde_json::Value>) -> DataRow {
    object
        .into_iter()
        .map(|(k, v)| (k, DataValue::from(v)))
        .collect()
}

/// A dataset containing multiple rows.
///
/// A column exists in a dataset if any row carries it; rows that lack the key
/// read as null for that column.
#[derive(Debug, Clone)]
pub struct DataSet {
    /// The data rows
    rows: Vec<DataRow>,
}

impl DataSet {
    /// Creates a new empty dataset.
    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    /// Creates a new dataset from rows.
    pub fn from_rows(rows: Vec<DataRow>) -> Self {
        Self { rows }
    }

    /// Creates a dataset from JSON objects, one row per object.
    pub fn from_json_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = serde_json::Map<String, serde_json::Value>>,
    {
        objects.into_iter().map(row_from_json).collect()
    }

    /// Returns the number of rows in the dataset.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows.
    pub fn rows(&self) -> impl Iterator<Item = &DataRow> {
        self.rows.iter()
    }

    /// Consumes the dataset, returning its rows.
    pub fn into_rows(self) -> Vec<DataRow> {
        self.rows
    }

    /// Gets a specific row by index.
    pub fn get_row(&self, index: usize) -> Option<&DataRow> {
        self.rows.get(index)
    }

    /// Adds a row to the dataset.
    pub fn add_row(&mut self, row: DataRow) {
        self.rows.push(row);
    }

    /// Returns true if any row carries `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(column))
    }

    /// Returns the sorted set of column names present in the dataset.
    pub fn columns(&self) -> BTreeSet<String> {
        self.rows
            .iter()
            .flat_map(|row| row.keys().cloned())
            .collect()
    }

    /// Iterates over one column, yielding null for rows that lack the key.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a DataValue> + 'a {
        self.rows.iter().map(move |row| row.get(column).unwrap_or(&NULL))
    }

    /// Splits the dataset into consecutive chunks of at most `size` rows.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = DataSet> + '_ {
        self.rows
            .chunks(size.max(1))
            .map(|rows| DataSet::from_rows(rows.to_vec()))
    }

    /// Concatenates datasets in order.
    pub fn concat<I: IntoIterator<Item = DataSet>>(parts: I) -> Self {
        parts.into_iter().flat_map(DataSet::into_rows).collect()
    }
}

impl Default for DataSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<DataRow> for DataSet {
    fn from_iter<T: IntoIterator<Item = DataRow>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
