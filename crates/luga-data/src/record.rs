//! Records, rows and synthetic primary keys.
//!
//! A [`Record`] is an open-ended JSON object. Once inserted into a
//! [`DataSet`](crate::DataSet) it is frozen behind an `Rc` ([`Row`]) and
//! carries one extra field, [`PK_KEY`], holding its [`RowId`].
//!
//! # Invariants
//!
//! 1. Row ids are unique within their data set for its whole lifetime; the
//!    counter never rewinds, not even after `delete()`.
//! 2. `RowId` round-trips through its string form (`"lugaPk_<n>"`).

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::DataError;

/// Field name of the synthetic primary key added on insert.
pub const PK_KEY: &str = "lugaRowId";

/// Prefix of the string form of a [`RowId`].
pub const PK_PREFIX: &str = "lugaPk_";

/// One row of domain data.
pub type Record = Map<String, Value>;

/// A stored record. Identity is shared between a data set and its views.
pub type Row = Rc<Record>;

/// Synthetic primary key of a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    /// Wrap a raw counter value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Read the primary key stored on a row, if any.
    #[must_use]
    pub fn of(record: &Record) -> Option<Self> {
        record.get(PK_KEY)?.as_str()?.parse().ok()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PK_PREFIX}{}", self.0)
    }
}

impl FromStr for RowId {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_prefix(PK_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(Self)
            .ok_or_else(|| DataError::NotARecord(format!("row id '{s}'")))
    }
}

/// Monotonic generator of row ids, owned by one data set.
#[derive(Debug, Default)]
pub(crate) struct RowIdCounter {
    next: u64,
}

impl RowIdCounter {
    pub(crate) fn next_id(&mut self) -> RowId {
        let id = RowId(self.next);
        self.next += 1;
        id
    }
}

/// Convert a JSON value into a list of records.
///
/// An object becomes one record, an array must contain only objects.
/// Nothing is returned unless every element qualifies.
pub fn records_from_value(value: Value) -> Result<Vec<Record>, DataError> {
    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(DataError::NotARecord(describe(&other))),
            })
            .collect(),
        other => Err(DataError::NotARecord(describe(&other))),
    }
}

/// Look up a dotted path (`"a.b.0.c"`) inside a JSON value.
///
/// Numeric segments index into arrays. An empty path returns the value
/// itself.
#[must_use]
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Same as [`lookup_path`], starting from a record.
#[must_use]
pub fn lookup_field<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    };
    record.get(head).and_then(|v| lookup_path(v, rest))
}

/// A record without its synthetic key, for comparisons with source data.
#[must_use]
pub fn strip_row_id(record: &Record) -> Record {
    let mut copy = record.clone();
    copy.remove(PK_KEY);
    copy
}

/// Human-readable kind of a JSON value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}
