//! Capability traits shared by every data source.
//!
//! - [`DataSource`]: what a region (or any consumer) needs: identity,
//!   lifecycle state, template context and the cursor/sort operations.
//! - [`RecordSet`]: sources backed by a row store, exposing the underlying
//!   [`DataSet`].
//!
//! Derived sources implement [`DataSource`] by delegating to their parent.

use crate::context::Context;
use crate::dataset::DataSet;
use crate::error::Result;
use crate::notifier::Observable;
use crate::record::{Row, RowId};
use crate::sort::SortOrder;
use crate::state::State;

/// A notifying source of template contexts.
pub trait DataSource: Observable {
    /// Registry identifier.
    fn id(&self) -> &str;

    fn state(&self) -> State;

    /// Change the lifecycle state, emitting `StateChanged` on actual change.
    fn set_state(&self, state: State);

    /// Template input reflecting the current records and state.
    fn context(&self) -> Context;

    /// Length of the effective (filtered) view.
    fn records_count(&self) -> usize;

    /// Fetch records. A no-op for sources without a remote origin.
    fn load_data(&self) -> Result<()>;

    fn current_row_id(&self) -> Option<RowId>;

    fn set_current_row_id(&self, row_id: Option<RowId>) -> Result<()>;

    /// Move the cursor to the row at `index` in the effective view.
    fn set_current_row_index(&self, index: usize) -> Result<()>;

    fn sort(&self, columns: &[String], order: SortOrder) -> Result<()>;
}

/// A [`DataSource`] that owns a row store.
pub trait RecordSet: DataSource {
    fn dataset(&self) -> &DataSet;

    fn select(&self) -> Vec<Row> {
        self.dataset().select()
    }

    fn current_row(&self) -> Option<Row> {
        self.dataset().current_row()
    }

    fn row_by_id(&self, row_id: RowId) -> Option<Row> {
        self.dataset().row_by_id(row_id)
    }
}
