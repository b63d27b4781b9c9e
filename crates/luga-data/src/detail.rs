//! Single-row projection of a parent data set's current row.
//!
//! # Invariants
//!
//! 1. `row()` is the parent's current row object itself (`Rc::ptr_eq`),
//!    never a copy.
//! 2. The row is captured at construction without notifying, then refreshed
//!    with a `DataChanged` on every parent `DataChanged`,
//!    `CurrentRowChanged` and `StateChanged`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::Context;
use crate::error::Result;
use crate::event::{CurrentRowChanged, DataChanged, Event, Observer, SourceId, StateChanged};
use crate::notifier::{Notifier, Observable};
use crate::record::{Row, RowId};
use crate::sort::SortOrder;
use crate::source::{DataSource, RecordSet};
use crate::state::State;

/// The current row of a parent, as its own data source.
pub struct DetailSet {
    id: SourceId,
    parent: Rc<dyn RecordSet>,
    row: RefCell<Option<Row>>,
    notifier: Notifier,
}

impl DetailSet {
    /// Create a detail set observing `parent`.
    #[must_use]
    pub fn new(id: impl Into<String>, parent: Rc<dyn RecordSet>) -> Rc<Self> {
        let row = parent.current_row();
        let detail = Rc::new(Self {
            id: Rc::from(id.into()),
            parent: Rc::clone(&parent),
            row: RefCell::new(row),
            notifier: Notifier::new(),
        });
        parent.add_observer(detail.clone());
        detail
    }

    #[must_use]
    pub fn parent(&self) -> &Rc<dyn RecordSet> {
        &self.parent
    }

    /// The parent's current row as of the last refresh.
    #[must_use]
    pub fn row(&self) -> Option<Row> {
        self.row.borrow().clone()
    }

    fn refresh(&self) {
        let row = self.parent.current_row();
        *self.row.borrow_mut() = row;
        self.notifier.notify_observers(&Event::DataChanged(DataChanged {
            source: Rc::clone(&self.id),
        }));
    }
}

impl Observer for DetailSet {
    fn on_data_changed(&self, _event: &DataChanged) {
        self.refresh();
    }

    fn on_current_row_changed(&self, _event: &CurrentRowChanged) {
        self.refresh();
    }

    fn on_state_changed(&self, _event: &StateChanged) {
        self.refresh();
    }
}

impl std::fmt::Debug for DetailSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailSet")
            .field("id", &self.id)
            .field("parent", &self.parent.id())
            .field("row", &self.row.borrow().as_ref().and_then(|r| RowId::of(r)))
            .finish()
    }
}

impl Observable for DetailSet {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

impl DataSource for DetailSet {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> State {
        self.parent.state()
    }

    fn set_state(&self, state: State) {
        self.parent.set_state(state);
    }

    fn context(&self) -> Context {
        Context::with_entity(self.row.borrow().as_ref(), self.parent.state())
    }

    fn records_count(&self) -> usize {
        usize::from(self.row.borrow().is_some())
    }

    fn load_data(&self) -> Result<()> {
        self.parent.load_data()
    }

    fn current_row_id(&self) -> Option<RowId> {
        self.parent.current_row_id()
    }

    fn set_current_row_id(&self, row_id: Option<RowId>) -> Result<()> {
        self.parent.set_current_row_id(row_id)
    }

    fn set_current_row_index(&self, index: usize) -> Result<()> {
        self.parent.set_current_row_index(index)
    }

    fn sort(&self, columns: &[String], order: SortOrder) -> Result<()> {
        self.parent.sort(columns, order)
    }
}
