//! The object a data source hands to a template.
//!
//! Contexts are plain JSON objects so that any template engine can consume
//! them. The well-known keys are:
//!
//! | key              | present on                 |
//! |------------------|----------------------------|
//! | `entities`       | DataSet, PagedView         |
//! | `entity`         | DetailSet                  |
//! | `recordCount`    | all                        |
//! | `state`, `isState*` | all                     |

use serde_json::{Map, Value};

use crate::record::Row;
use crate::state::State;

/// Template input produced by [`DataSource::context`](crate::DataSource::context).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    fields: Map<String, Value>,
}

impl Context {
    /// Context for a multi-row source.
    #[must_use]
    pub fn with_entities(rows: &[Row], record_count: usize, state: State) -> Self {
        let mut fields = Map::new();
        fields.insert(
            "entities".into(),
            Value::Array(rows.iter().map(|r| Value::Object((**r).clone())).collect()),
        );
        fields.insert("recordCount".into(), Value::from(record_count));
        fields.extend(state.describe());
        Self { fields }
    }

    /// Context for a single-row source.
    #[must_use]
    pub fn with_entity(row: Option<&Row>, state: State) -> Self {
        let mut fields = Map::new();
        let (entity, count) = match row {
            Some(row) => (Value::Object((**row).clone()), 1),
            None => (Value::Null, 0),
        };
        fields.insert("entity".into(), entity);
        fields.insert("recordCount".into(), Value::from(count));
        fields.extend(state.describe());
        Self { fields }
    }

    /// Set or replace a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Merge fields from another object; existing keys are overwritten.
    pub fn merge(&mut self, other: &Map<String, Value>) {
        for (k, v) in other {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// `recordCount`, or zero when absent.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.fields
            .get("recordCount")
            .and_then(Value::as_u64)
            .map_or(0, |n| n as usize)
    }

    /// `entities`, or an empty slice for single-row contexts.
    #[must_use]
    pub fn entities(&self) -> &[Value] {
        self.fields
            .get("entities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `entity`, when present and not null.
    #[must_use]
    pub fn entity(&self) -> Option<&Map<String, Value>> {
        self.fields.get("entity").and_then(Value::as_object)
    }

    /// Replace `entities` (used by windowed views).
    pub fn set_entities(&mut self, entities: Vec<Value>) {
        self.fields.insert("entities".into(), Value::Array(entities));
    }

    /// Borrow the underlying object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}
