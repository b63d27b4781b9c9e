//! Column sorting for row stores.
//!
//! # Invariants
//!
//! 1. Sorting is stable: rows comparing equal keep their relative order.
//! 2. Missing fields and `null` compare as the smallest value.
//! 3. Values fall into classes ordered `null < number < bool < text`.
//!    Numbers (JSON numbers and numeric-looking strings) compare
//!    numerically, booleans as `false < true`, text by its string form.
//! 4. The comparison is a total order, so any column can be sorted.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::DataError;
use crate::record::{Row, lookup_field};

/// Requested direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
    /// Flip the order last applied to the same column set; ascending the
    /// first time.
    Toggle,
}

impl SortOrder {
    /// Resolve `Toggle` against the previous sort of the same columns.
    #[must_use]
    pub fn resolve(self, previous: Option<SortOrder>) -> SortOrder {
        match self {
            Self::Toggle => match previous {
                Some(Self::Ascending) => Self::Descending,
                _ => Self::Ascending,
            },
            fixed => fixed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
            Self::Toggle => "toggle",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            "toggle" => Ok(Self::Toggle),
            other => Err(DataError::Config(format!("unknown sort order '{other}'"))),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        _ => None,
    }
}

fn as_text(value: &Value) -> std::borrow::Cow<'_, str> {
    match value {
        Value::String(s) => std::borrow::Cow::Borrowed(s.as_str()),
        other => std::borrow::Cow::Owned(other.to_string()),
    }
}

/// Sort key of a present, non-null value. Variant order is class order.
#[derive(Debug)]
enum Key<'a> {
    Number(f64),
    Bool(bool),
    Text(std::borrow::Cow<'a, str>),
}

impl<'a> Key<'a> {
    fn of(value: &'a Value) -> Self {
        if let Some(n) = as_number(value) {
            return Self::Number(n);
        }
        match value {
            Value::Bool(b) => Self::Bool(*b),
            other => Self::Text(as_text(other)),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(x), Self::Number(y)) => x.total_cmp(y),
            (Self::Bool(x), Self::Bool(y)) => x.cmp(y),
            (Self::Text(x), Self::Text(y)) => x.cmp(y),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Bool(_) => 1,
            Self::Text(_) => 2,
        }
    }
}

/// Type-aware comparison of two optional field values.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => Key::of(a).compare(&Key::of(b)),
    }
}

/// Stable multi-column sort of `rows` in place.
///
/// `order` must already be resolved; `Toggle` is treated as ascending.
pub fn sort_rows(rows: &mut [Row], columns: &[String], order: SortOrder) {
    rows.sort_by(|a, b| {
        let ord = columns
            .iter()
            .map(|col| compare_values(lookup_field(a, col), lookup_field(b, col)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal);
        match order {
            SortOrder::Descending => ord.reverse(),
            _ => ord,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::rc::Rc;

    fn rows(values: Vec<Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| Rc::new(v.as_object().unwrap().clone()))
            .collect()
    }

    fn column(rows: &[Row], col: &str) -> Vec<Value> {
        rows.iter()
            .map(|r| r.get(col).cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn toggle_resolution() {
        assert_eq!(SortOrder::Toggle.resolve(None), SortOrder::Ascending);
        assert_eq!(
            SortOrder::Toggle.resolve(Some(SortOrder::Ascending)),
            SortOrder::Descending
        );
        assert_eq!(
            SortOrder::Toggle.resolve(Some(SortOrder::Descending)),
            SortOrder::Ascending
        );
        assert_eq!(
            SortOrder::Descending.resolve(Some(SortOrder::Descending)),
            SortOrder::Descending
        );
    }

    #[test]
    fn numeric_strings_compare_numerically() {
        assert_eq!(
            compare_values(Some(&json!("10")), Some(&json!("9"))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!("10"))),
            Ordering::Less
        );
    }

    #[test]
    fn mixed_string_column_is_totally_ordered() {
        // "9" < "10" numerically, "10" < "1a" textually: numbers must not
        // be compared with text, or the order has a cycle.
        let column_values = ["10", "9", "1a", "2", "b", "100", "3x", "", "0.5", "-1"];
        let mut data = rows(
            (0..60)
                .map(|i| json!({"c": column_values[(i * 7) % column_values.len()], "i": i}))
                .collect(),
        );
        sort_rows(&mut data, &["c".into()], SortOrder::Ascending);
        let sorted = column(&data, "c");
        for pair in sorted.windows(2) {
            assert_ne!(
                compare_values(Some(&pair[0]), Some(&pair[1])),
                Ordering::Greater
            );
        }
        let mut distinct: Vec<Value> = Vec::new();
        for value in sorted {
            if distinct.last() != Some(&value) {
                distinct.push(value);
            }
        }
        assert_eq!(
            distinct,
            vec![
                json!("-1"),
                json!("0.5"),
                json!("2"),
                json!("9"),
                json!("10"),
                json!("100"),
                json!(""),
                json!("1a"),
                json!("3x"),
                json!("b"),
            ]
        );
    }

    #[test]
    fn classes_order_numbers_bools_text() {
        let n = json!(5);
        let t = json!(true);
        let s = json!("abc");
        assert_eq!(compare_values(Some(&n), Some(&t)), Ordering::Less);
        assert_eq!(compare_values(Some(&t), Some(&s)), Ordering::Less);
        assert_eq!(compare_values(Some(&s), Some(&n)), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!("7")), Some(&t)), Ordering::Less);
    }

    #[test]
    fn null_and_missing_sort_first() {
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&Value::Null), Some(&json!("a"))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&Value::Null)), Ordering::Equal);
    }

    #[test]
    fn sort_is_stable() {
        let mut data = rows(vec![
            json!({"k": 1, "tag": "a"}),
            json!({"k": 0, "tag": "b"}),
            json!({"k": 1, "tag": "c"}),
            json!({"k": 0, "tag": "d"}),
        ]);
        sort_rows(&mut data, &["k".into()], SortOrder::Ascending);
        assert_eq!(
            column(&data, "tag"),
            vec![json!("b"), json!("d"), json!("a"), json!("c")]
        );
        sort_rows(&mut data, &["k".into()], SortOrder::Descending);
        assert_eq!(
            column(&data, "tag"),
            vec![json!("a"), json!("c"), json!("b"), json!("d")]
        );
    }

    #[test]
    fn multi_column_sort() {
        let mut data = rows(vec![
            json!({"last": "Ng", "first": "Zoe"}),
            json!({"last": "Adams", "first": "Bo"}),
            json!({"last": "Ng", "first": "Al"}),
        ]);
        sort_rows(
            &mut data,
            &["last".into(), "first".into()],
            SortOrder::Ascending,
        );
        assert_eq!(
            column(&data, "first"),
            vec![json!("Bo"), json!("Al"), json!("Zoe")]
        );
    }

    #[test]
    fn parse_sort_order() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
