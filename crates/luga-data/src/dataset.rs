//! The observable in-memory row store.
//!
//! A [`DataSet`] owns its records, a primary-key index, an optional filter
//! with its cached output, a current-row cursor, a lifecycle [`State`] and
//! a [`Notifier`]. Every mutation emits `DataChanged`.
//!
//! # Invariants
//!
//! 1. The filtered cache is `None` iff no filter is set; otherwise it is
//!    recomputed after every mutation of records or filter, before any read.
//! 2. `records` and the key index always hold the same rows.
//! 3. The cursor is `None` or names a row in the key index. After inserts,
//!    deletes and filter changes a dangling or empty cursor moves to the
//!    first row of the effective view.
//! 4. Sorting reorders `records` only; row ids never change.
//! 5. No `RefCell` borrow is held while a filter, formatter or observer
//!    runs, so all of them may call back into the data set.
//!
//! # Failure Modes
//!
//! - Inserting a JSON primitive: `DataError::NotARecord`, nothing stored.
//! - Cursor to an unknown id or out-of-range index: error, cursor unchanged.
//! - Sorting with no columns: `DataError::EmptySort`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::context::Context;
use crate::error::{DataError, Result};
use crate::event::{
    CurrentRowChanged, DataChanged, DataSorted, Event, PreDataSorted, SourceId, StateChanged,
};
use crate::notifier::{Notifier, Observable};
use crate::record::{PK_KEY, Record, Row, RowId, RowIdCounter, records_from_value};
use crate::sort::{SortOrder, sort_rows};
use crate::source::{DataSource, RecordSet};
use crate::state::State;

/// Filter predicate: keep a row by returning it (possibly reshaped), drop
/// it by returning `None`. Receives the index within the unfiltered records.
pub type Filter = Rc<dyn Fn(&DataSet, &Row, usize) -> Option<Row>>;

/// Per-record transformation applied on insert, before the key is added.
pub type Formatter = Rc<dyn Fn(Record, RowId) -> Record>;

#[derive(Default)]
struct RowStore {
    records: Vec<Row>,
    by_key: HashMap<RowId, Row>,
    filter: Option<Filter>,
    filtered: Option<Vec<Row>>,
    counter: RowIdCounter,
}

impl RowStore {
    fn effective(&self) -> &[Row] {
        self.filtered.as_deref().unwrap_or(&self.records)
    }
}

#[derive(Debug, Clone)]
struct LastSort {
    columns: Vec<String>,
    order: SortOrder,
}

/// Observable, filterable, sortable row store with a current-row cursor.
pub struct DataSet {
    id: SourceId,
    notifier: Notifier,
    store: RefCell<RowStore>,
    current_row_id: Cell<Option<RowId>>,
    state: Cell<State>,
    last_sort: RefCell<Option<LastSort>>,
    formatter: Option<Formatter>,
}

impl DataSet {
    /// Create an empty data set. Register it with a
    /// [`Registry`](crate::Registry) to make it resolvable by id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Rc::from(id.into()),
            notifier: Notifier::new(),
            store: RefCell::new(RowStore::default()),
            current_row_id: Cell::new(None),
            state: Cell::new(State::Unset),
            last_sort: RefCell::new(None),
            formatter: None,
        }
    }

    /// Apply `formatter` to every record inserted from now on.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Fn(Record, RowId) -> Record + 'static) -> Self {
        self.formatter = Some(Rc::new(formatter));
        self
    }

    pub(crate) fn set_formatter(&mut self, formatter: Option<Formatter>) {
        self.formatter = formatter;
    }

    /// Shared handle on the id, as carried by events.
    #[must_use]
    pub fn source_id(&self) -> SourceId {
        Rc::clone(&self.id)
    }

    // -- row store ----------------------------------------------------------

    /// Append records, assigning each the next row id.
    pub fn insert(&self, records: Vec<Record>) -> Result<Vec<RowId>> {
        let mut ids = Vec::with_capacity(records.len());
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let row_id = self.store.borrow_mut().counter.next_id();
            let mut record = match &self.formatter {
                Some(format) => format(record, row_id),
                None => record,
            };
            record.insert(PK_KEY.into(), Value::String(row_id.to_string()));
            ids.push(row_id);
            rows.push(Rc::new(record));
        }
        {
            let mut store = self.store.borrow_mut();
            for (row_id, row) in ids.iter().zip(&rows) {
                store.by_key.insert(*row_id, Rc::clone(row));
            }
            store.records.extend(rows);
        }
        tracing::trace!(source = %self.id, inserted = ids.len(), "records inserted");
        self.after_mutation();
        Ok(ids)
    }

    /// Insert a single record.
    pub fn insert_record(&self, record: Record) -> Result<RowId> {
        let ids = self.insert(vec![record])?;
        ids.into_iter()
            .next()
            .ok_or_else(|| DataError::NotARecord("empty insert".into()))
    }

    /// Insert one JSON object or an array of JSON objects.
    ///
    /// Any non-object element rejects the whole input before anything is
    /// stored.
    pub fn insert_value(&self, value: Value) -> Result<Vec<RowId>> {
        let records = records_from_value(value)?;
        self.insert(records)
    }

    /// The effective view: filtered rows when a filter is set, else all rows.
    #[must_use]
    pub fn select(&self) -> Vec<Row> {
        self.store.borrow().effective().to_vec()
    }

    /// Apply a one-shot filter to the effective view without storing it.
    pub fn select_with(&self, filter: impl Fn(&DataSet, &Row, usize) -> Option<Row>) -> Vec<Row> {
        let base = self.select();
        base.iter()
            .enumerate()
            .filter_map(|(index, row)| filter(self, row, index))
            .collect()
    }

    /// Every stored row in storage order, ignoring the filter.
    #[must_use]
    pub fn records(&self) -> Vec<Row> {
        self.store.borrow().records.clone()
    }

    /// Remove every record. The id counter keeps counting.
    pub fn delete(&self) {
        self.clear_store();
        tracing::trace!(source = %self.id, "records deleted");
        self.after_mutation();
    }

    /// Remove the rows `filter` keeps; the rest stay.
    pub fn delete_where(&self, filter: impl Fn(&DataSet, &Row, usize) -> Option<Row>) {
        let records = self.records();
        let survivors: Vec<Row> = records
            .iter()
            .enumerate()
            .filter(|&(index, row)| filter(self, row, index).is_none())
            .map(|(_, row)| Rc::clone(row))
            .collect();
        {
            let mut store = self.store.borrow_mut();
            store.by_key = survivors
                .iter()
                .filter_map(|row| RowId::of(row).map(|id| (id, Rc::clone(row))))
                .collect();
            store.records = survivors;
        }
        self.after_mutation();
    }

    /// Install `filter` as the active predicate.
    pub fn set_filter(&self, filter: impl Fn(&DataSet, &Row, usize) -> Option<Row> + 'static) {
        self.store.borrow_mut().filter = Some(Rc::new(filter));
        self.after_mutation();
    }

    /// Remove the active predicate. Emits `DataChanged` even when none was set.
    pub fn delete_filter(&self) {
        {
            let mut store = self.store.borrow_mut();
            store.filter = None;
            store.filtered = None;
        }
        self.after_mutation();
    }

    #[must_use]
    pub fn has_filter(&self) -> bool {
        self.store.borrow().filter.is_some()
    }

    /// O(1) lookup by id, ignoring the filter.
    #[must_use]
    pub fn row_by_id(&self, row_id: RowId) -> Option<Row> {
        self.store.borrow().by_key.get(&row_id).cloned()
    }

    /// Row at `index` in the effective view.
    #[must_use]
    pub fn row_by_index(&self, index: usize) -> Option<Row> {
        self.store.borrow().effective().get(index).cloned()
    }

    /// Position of a row in the effective view.
    #[must_use]
    pub fn row_index_by_id(&self, row_id: RowId) -> Option<usize> {
        self.store
            .borrow()
            .effective()
            .iter()
            .position(|row| RowId::of(row) == Some(row_id))
    }

    #[must_use]
    pub fn records_count(&self) -> usize {
        self.store.borrow().effective().len()
    }

    /// Drop records without notifying. Used before a replacing load.
    ///
    /// The cursor keeps its old id until the next mutation settles it, so
    /// `CurrentRowChanged` reports the real previous row. Returns whether
    /// any record was dropped.
    pub(crate) fn clear_silently(&self) -> bool {
        let had_records = !self.store.borrow().records.is_empty();
        self.clear_store();
        had_records
    }

    /// Settle the cursor and emit `DataChanged` after a silent clear that no
    /// insert followed.
    pub(crate) fn settle_after_clear(&self) {
        self.after_mutation();
    }

    fn clear_store(&self) {
        let mut store = self.store.borrow_mut();
        store.records.clear();
        store.by_key.clear();
        if store.filter.is_some() {
            store.filtered = Some(Vec::new());
        }
    }

    fn refresh_filter(&self) {
        let (filter, records) = {
            let store = self.store.borrow();
            match &store.filter {
                Some(filter) => (Rc::clone(filter), store.records.clone()),
                None => return,
            }
        };
        let filtered: Vec<Row> = records
            .iter()
            .enumerate()
            .filter_map(|(index, row)| filter(self, row, index))
            .collect();
        self.store.borrow_mut().filtered = Some(filtered);
    }

    fn after_mutation(&self) {
        self.refresh_filter();
        self.reset_current_row();
        self.emit_data_changed();
    }

    fn reset_current_row(&self) {
        let current = self.current_row_id.get();
        if current.is_some_and(|id| self.row_by_id(id).is_some()) {
            return;
        }
        let first = self.row_by_index(0).and_then(|row| RowId::of(&row));
        if first != current {
            self.current_row_id.set(first);
            self.emit(Event::CurrentRowChanged(CurrentRowChanged {
                source: self.source_id(),
                old_row_id: current,
                new_row_id: first,
            }));
        }
    }

    // -- cursor ---------------------------------------------------------------

    #[must_use]
    pub fn current_row_id(&self) -> Option<RowId> {
        self.current_row_id.get()
    }

    /// The row under the cursor.
    #[must_use]
    pub fn current_row(&self) -> Option<Row> {
        self.current_row_id.get().and_then(|id| self.row_by_id(id))
    }

    /// Position of the cursor in the effective view.
    #[must_use]
    pub fn current_row_index(&self) -> Option<usize> {
        self.current_row_id
            .get()
            .and_then(|id| self.row_index_by_id(id))
    }

    /// Move the cursor. Same value is a silent no-op.
    pub fn set_current_row_id(&self, row_id: Option<RowId>) -> Result<()> {
        let old = self.current_row_id.get();
        if old == row_id {
            return Ok(());
        }
        if let Some(id) = row_id {
            if self.row_by_id(id).is_none() {
                return Err(DataError::UnknownRowId {
                    source_id: self.id.to_string(),
                    row_id: id,
                });
            }
        }
        self.current_row_id.set(row_id);
        self.emit(Event::CurrentRowChanged(CurrentRowChanged {
            source: self.source_id(),
            old_row_id: old,
            new_row_id: row_id,
        }));
        Ok(())
    }

    pub fn set_current_row_index(&self, index: usize) -> Result<()> {
        let row = self.row_by_index(index).ok_or_else(|| DataError::RowIndexOutOfRange {
            source_id: self.id.to_string(),
            index,
            len: self.records_count(),
        })?;
        let row_id = RowId::of(&row).ok_or_else(|| DataError::NotARecord("row without id".into()))?;
        self.set_current_row_id(Some(row_id))
    }

    // -- sort -----------------------------------------------------------------

    /// Stable, type-aware reorder of the unfiltered records.
    pub fn sort(&self, columns: &[String], order: SortOrder) -> Result<()> {
        if columns.is_empty() {
            return Err(DataError::EmptySort);
        }
        let previous = self
            .last_sort
            .borrow()
            .as_ref()
            .filter(|last| last.columns == columns)
            .map(|last| last.order);
        let order = order.resolve(previous);
        let columns = columns.to_vec();

        self.emit(Event::PreDataSorted(PreDataSorted {
            source: self.source_id(),
            columns: columns.clone(),
            order,
        }));

        let mut records = self.records();
        sort_rows(&mut records, &columns, order);
        self.store.borrow_mut().records = records;
        self.refresh_filter();
        *self.last_sort.borrow_mut() = Some(LastSort {
            columns: columns.clone(),
            order,
        });
        tracing::debug!(source = %self.id, ?columns, %order, "records sorted");

        self.emit(Event::DataSorted(DataSorted {
            source: self.source_id(),
            columns,
            order,
        }));
        self.emit_data_changed();
        Ok(())
    }

    /// Columns of the last sort, empty if never sorted.
    #[must_use]
    pub fn sort_columns(&self) -> Vec<String> {
        self.last_sort
            .borrow()
            .as_ref()
            .map(|last| last.columns.clone())
            .unwrap_or_default()
    }

    /// Resolved order of the last sort.
    #[must_use]
    pub fn sort_order(&self) -> Option<SortOrder> {
        self.last_sort.borrow().as_ref().map(|last| last.order)
    }

    // -- state ----------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> State {
        self.state.get()
    }

    /// Change state, emitting `StateChanged` only when it differs.
    pub fn set_state(&self, state: State) {
        let old = self.state.replace(state);
        if old == state {
            return;
        }
        tracing::debug!(source = %self.id, from = %old, to = %state, "state changed");
        self.emit(Event::StateChanged(StateChanged {
            source: self.source_id(),
            old_state: old,
            current_state: state,
        }));
    }

    #[must_use]
    pub fn context(&self) -> Context {
        let rows = self.select();
        let count = rows.len();
        Context::with_entities(&rows, count, self.state())
    }

    pub(crate) fn emit(&self, event: Event) {
        self.notifier.notify_observers(&event);
    }

    pub(crate) fn emit_data_changed(&self) {
        self.emit(Event::DataChanged(DataChanged {
            source: self.source_id(),
        }));
    }
}

impl std::fmt::Debug for DataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSet")
            .field("id", &self.id)
            .field("records", &self.store.borrow().records.len())
            .field("filtered", &self.has_filter())
            .field("current_row_id", &self.current_row_id.get())
            .field("state", &self.state.get())
            .finish()
    }
}

impl Observable for DataSet {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

impl DataSource for DataSet {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> State {
        DataSet::state(self)
    }

    fn set_state(&self, state: State) {
        DataSet::set_state(self, state);
    }

    fn context(&self) -> Context {
        DataSet::context(self)
    }

    fn records_count(&self) -> usize {
        DataSet::records_count(self)
    }

    fn load_data(&self) -> Result<()> {
        Ok(())
    }

    fn current_row_id(&self) -> Option<RowId> {
        DataSet::current_row_id(self)
    }

    fn set_current_row_id(&self, row_id: Option<RowId>) -> Result<()> {
        DataSet::set_current_row_id(self, row_id)
    }

    fn set_current_row_index(&self, index: usize) -> Result<()> {
        DataSet::set_current_row_index(self, index)
    }

    fn sort(&self, columns: &[String], order: SortOrder) -> Result<()> {
        DataSet::sort(self, columns, order)
    }
}

impl RecordSet for DataSet {
    fn dataset(&self) -> &DataSet {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Observer};
    use crate::record::strip_row_id;
    use serde_json::json;

    fn people() -> Value {
        json!([
            {"name": "Ada", "country": "UK", "age": 36},
            {"name": "Grace", "country": "US", "age": 85},
            {"name": "Hedy", "country": "AT", "age": 85},
            {"name": "Mary", "country": "UK", "age": 54},
        ])
    }

    #[derive(Default)]
    struct Kinds(RefCell<Vec<EventKind>>);

    impl Observer for Kinds {
        fn on_event(&self, event: &Event) {
            self.0.borrow_mut().push(event.kind());
        }
    }

    fn watch(ds: &DataSet) -> Rc<Kinds> {
        let kinds = Rc::new(Kinds::default());
        ds.add_observer(kinds.clone());
        kinds
    }

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|r| r["name"].as_str().unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn insert_assigns_unique_keys_and_emits() {
        let ds = DataSet::new("people");
        let kinds = watch(&ds);
        let ids = ds.insert_value(people()).unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(ds.records_count(), 4);
        for id in &ids {
            let row = ds.row_by_id(*id).unwrap();
            assert_eq!(RowId::of(&row), Some(*id));
        }
        assert_eq!(
            *kinds.0.borrow(),
            vec![EventKind::CurrentRowChanged, EventKind::DataChanged]
        );
        assert_eq!(ds.current_row_id(), Some(ids[0]));
    }

    #[test]
    fn primitive_element_rejects_whole_insert() {
        let ds = DataSet::new("ds");
        let kinds = watch(&ds);
        let err = ds.insert_value(json!([{"a": 1}, 7])).unwrap_err();
        assert!(matches!(err, DataError::NotARecord(_)));
        assert_eq!(ds.records_count(), 0);
        assert!(kinds.0.borrow().is_empty());
    }

    #[test]
    fn keys_are_not_reused_after_delete() {
        let ds = DataSet::new("ds");
        let first = ds.insert_value(people()).unwrap();
        ds.delete();
        assert_eq!(ds.records_count(), 0);
        assert_eq!(ds.current_row_id(), None);
        let second = ds.insert_value(people()).unwrap();
        assert!(second.iter().all(|id| !first.contains(id)));
    }

    #[test]
    fn filter_selects_and_reshapes() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        ds.set_filter(|_, row, _| {
            if row["country"] == "UK" {
                None
            } else {
                let mut copy = (**row).clone();
                copy.insert("seen".into(), json!(true));
                Some(Rc::new(copy))
            }
        });
        let view = ds.select();
        assert_eq!(names(&view), vec!["Grace", "Hedy"]);
        assert!(view.iter().all(|r| r["seen"] == true));
        assert_eq!(ds.records_count(), 2);
        ds.delete_filter();
        assert_eq!(ds.records_count(), 4);
        assert!(!ds.has_filter());
    }

    #[test]
    fn filter_is_reapplied_after_insert() {
        let ds = DataSet::new("ds");
        ds.set_filter(|_, row, _| (row["age"].as_i64() > Some(50)).then(|| Rc::clone(row)));
        ds.insert_value(people()).unwrap();
        assert_eq!(ds.records_count(), 3);
        ds.insert_value(json!({"name": "Kid", "age": 3})).unwrap();
        assert_eq!(ds.records_count(), 3);
        assert_eq!(ds.records().len(), 5);
    }

    #[test]
    fn filter_receives_unfiltered_index() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        ds.set_filter(|_, row, index| (index % 2 == 1).then(|| Rc::clone(row)));
        assert_eq!(names(&ds.select()), vec!["Grace", "Mary"]);
    }

    #[test]
    fn delete_filter_without_filter_still_notifies() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        let before = ds.select();
        let kinds = watch(&ds);
        ds.delete_filter();
        assert_eq!(ds.select(), before);
        assert_eq!(*kinds.0.borrow(), vec![EventKind::DataChanged]);
    }

    #[test]
    fn select_with_is_one_shot() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        let young = ds.select_with(|_, row, _| (row["age"].as_i64() < Some(50)).then(|| Rc::clone(row)));
        assert_eq!(names(&young), vec!["Ada"]);
        assert_eq!(ds.records_count(), 4);
    }

    #[test]
    fn delete_where_removes_matches() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        let kinds = watch(&ds);
        ds.delete_where(|_, row, _| (row["country"] == "UK").then(|| Rc::clone(row)));
        assert_eq!(names(&ds.select()), vec!["Grace", "Hedy"]);
        // The cursor pointed at Ada, who is gone.
        assert_eq!(
            *kinds.0.borrow(),
            vec![EventKind::CurrentRowChanged, EventKind::DataChanged]
        );
        assert_eq!(ds.current_row().unwrap()["name"], "Grace");
    }

    #[test]
    fn round_trip_insert_delete_insert() {
        let ds = DataSet::new("ds");
        let source = records_from_value(people()).unwrap();
        ds.insert(source.clone()).unwrap();
        ds.delete();
        ds.insert(source.clone()).unwrap();
        let stripped: Vec<Record> = ds.select().iter().map(|r| strip_row_id(r)).collect();
        assert_eq!(stripped, source);
    }

    #[test]
    fn same_cursor_value_is_silent() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        let kinds = watch(&ds);
        let current = ds.current_row_id();
        ds.set_current_row_id(current).unwrap();
        assert!(kinds.0.borrow().is_empty());
    }

    #[test]
    fn unknown_cursor_id_fails_without_mutation() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        let before = ds.current_row_id();
        let err = ds.set_current_row_id(Some(RowId::new(999))).unwrap_err();
        assert!(matches!(err, DataError::UnknownRowId { .. }));
        assert_eq!(ds.current_row_id(), before);
    }

    #[test]
    fn cursor_event_carries_old_and_new() {
        let ds = Rc::new(DataSet::new("ds"));
        let ids = ds.insert_value(people()).unwrap();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let _sub = ds.subscribe(EventKind::CurrentRowChanged, move |event| {
            if let Event::CurrentRowChanged(e) = event {
                *sink.borrow_mut() = Some((e.old_row_id, e.new_row_id));
            }
        });
        ds.set_current_row_index(2).unwrap();
        assert_eq!(*seen.borrow(), Some((Some(ids[0]), Some(ids[2]))));
        assert_eq!(ds.current_row_index(), Some(2));
        assert!(ds.set_current_row_index(10).is_err());
        ds.set_current_row_id(None).unwrap();
        assert_eq!(ds.current_row(), None);
    }

    #[test]
    fn sort_keeps_keys_and_emits_in_order() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        let before: Vec<(RowId, String)> = ds
            .select()
            .iter()
            .map(|r| (RowId::of(r).unwrap(), r["name"].to_string()))
            .collect();
        let kinds = watch(&ds);
        ds.sort(&["age".into()], SortOrder::Descending).unwrap();
        assert_eq!(names(&ds.select()), vec!["Grace", "Hedy", "Mary", "Ada"]);
        for (id, name) in before {
            assert_eq!(ds.row_by_id(id).unwrap()["name"].to_string(), name);
        }
        assert_eq!(
            *kinds.0.borrow(),
            vec![
                EventKind::PreDataSorted,
                EventKind::DataSorted,
                EventKind::DataChanged
            ]
        );
    }

    #[test]
    fn toggle_sort_flips_per_column_set() {
        let ds = DataSet::new("ds");
        ds.insert_value(people()).unwrap();
        ds.sort(&["name".into()], SortOrder::Toggle).unwrap();
        assert_eq!(ds.sort_order(), Some(SortOrder::Ascending));
        ds.sort(&["name".into()], SortOrder::Toggle).unwrap();
        assert_eq!(ds.sort_order(), Some(SortOrder::Descending));
        assert_eq!(names(&ds.select()), vec!["Mary", "Hedy", "Grace", "Ada"]);
        ds.sort(&["age".into()], SortOrder::Toggle).unwrap();
        assert_eq!(ds.sort_order(), Some(SortOrder::Ascending));
        assert_eq!(ds.sort_columns(), vec!["age".to_owned()]);
    }

    #[test]
    fn empty_sort_is_rejected() {
        let ds = DataSet::new("ds");
        assert_eq!(ds.sort(&[], SortOrder::Ascending), Err(DataError::EmptySort));
    }

    #[test]
    fn state_changes_only_emit_on_change() {
        let ds = DataSet::new("ds");
        let kinds = watch(&ds);
        ds.set_state(State::Loading);
        ds.set_state(State::Loading);
        ds.set_state(State::Ready);
        assert_eq!(
            *kinds.0.borrow(),
            vec![EventKind::StateChanged, EventKind::StateChanged]
        );
        let ctx = ds.context();
        assert_eq!(ctx.get("isStateReady"), Some(&json!(true)));
    }

    #[test]
    fn formatter_runs_before_key_assignment() {
        let ds = DataSet::new("ds").with_formatter(|mut record, row_id| {
            record.insert("label".into(), json!(format!("#{}", row_id.get())));
            record
        });
        let ids = ds.insert_value(json!([{"a": 1}, {"a": 2}])).unwrap();
        let row = ds.row_by_id(ids[1]).unwrap();
        assert_eq!(row["label"], json!(format!("#{}", ids[1].get())));
        assert!(row.contains_key(PK_KEY));
    }

    #[test]
    fn observer_may_reenter_during_notification() {
        struct Reentrant(Rc<DataSet>, Cell<usize>);
        impl Observer for Reentrant {
            fn on_data_changed(&self, _event: &DataChanged) {
                self.1.set(self.1.get() + 1);
                let _ = self.0.select();
                let _ = self.0.set_current_row_index(0);
            }
        }
        let ds = Rc::new(DataSet::new("ds"));
        let observer = Rc::new(Reentrant(Rc::clone(&ds), Cell::new(0)));
        ds.add_observer(observer.clone());
        ds.insert_value(people()).unwrap();
        assert_eq!(observer.1.get(), 1);
    }
}
