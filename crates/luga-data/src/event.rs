//! Notifications exchanged between data sources, views and regions.
//!
//! Every notification is a variant of [`Event`] with its own typed payload.
//! Receivers implement [`Observer`], overriding only the handlers they care
//! about; a missing override is a silent skip, never an error.

use std::fmt;
use std::rc::Rc;

use crate::record::RowId;
use crate::sort::SortOrder;
use crate::state::State;

/// Identifier of the source that emitted an event.
pub type SourceId = Rc<str>;

/// Discriminant of [`Event`], used for targeted registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DataChanged,
    CurrentRowChanged,
    StateChanged,
    DataLoading,
    XhrError,
    PreDataSorted,
    DataSorted,
    RegionRendered,
}

impl EventKind {
    /// Conventional event name (`dataChanged`, `xhrError`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DataChanged => "dataChanged",
            Self::CurrentRowChanged => "currentRowChanged",
            Self::StateChanged => "stateChanged",
            Self::DataLoading => "dataLoading",
            Self::XhrError => "xhrError",
            Self::PreDataSorted => "preDataSorted",
            Self::DataSorted => "dataSorted",
            Self::RegionRendered => "regionRendered",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The records (or their projection) changed.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChanged {
    pub source: SourceId,
}

/// The current-row cursor moved.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentRowChanged {
    pub source: SourceId,
    pub old_row_id: Option<RowId>,
    pub new_row_id: Option<RowId>,
}

/// The lifecycle state changed.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChanged {
    pub source: SourceId,
    pub old_state: State,
    pub current_state: State,
}

/// A fetch is about to be issued.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLoading {
    pub source: SourceId,
}

/// A fetch (or the parsing of its body) failed.
#[derive(Debug, Clone, PartialEq)]
pub struct XhrError {
    pub source: SourceId,
    pub message: String,
    pub url: String,
    /// HTTP status, `0` for network failures and parse errors.
    pub status: u16,
}

/// Emitted right before records are reordered.
#[derive(Debug, Clone, PartialEq)]
pub struct PreDataSorted {
    pub source: SourceId,
    pub columns: Vec<String>,
    /// The resolved order (never `Toggle`).
    pub order: SortOrder,
}

/// Emitted after records have been reordered.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSorted {
    pub source: SourceId,
    pub columns: Vec<String>,
    pub order: SortOrder,
}

/// A region finished rendering into its node.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRendered {
    pub source: SourceId,
    pub node: String,
}

/// A notification with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DataChanged(DataChanged),
    CurrentRowChanged(CurrentRowChanged),
    StateChanged(StateChanged),
    DataLoading(DataLoading),
    XhrError(XhrError),
    PreDataSorted(PreDataSorted),
    DataSorted(DataSorted),
    RegionRendered(RegionRendered),
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DataChanged(_) => EventKind::DataChanged,
            Self::CurrentRowChanged(_) => EventKind::CurrentRowChanged,
            Self::StateChanged(_) => EventKind::StateChanged,
            Self::DataLoading(_) => EventKind::DataLoading,
            Self::XhrError(_) => EventKind::XhrError,
            Self::PreDataSorted(_) => EventKind::PreDataSorted,
            Self::DataSorted(_) => EventKind::DataSorted,
            Self::RegionRendered(_) => EventKind::RegionRendered,
        }
    }

    /// Id of the emitting source.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::DataChanged(e) => &e.source,
            Self::CurrentRowChanged(e) => &e.source,
            Self::StateChanged(e) => &e.source,
            Self::DataLoading(e) => &e.source,
            Self::XhrError(e) => &e.source,
            Self::PreDataSorted(e) => &e.source,
            Self::DataSorted(e) => &e.source,
            Self::RegionRendered(e) => &e.source,
        }
    }
}

/// Receiver of notifications.
///
/// Each handler has an empty default body. [`on_event`](Self::on_event) is
/// the single entry point used by the [`Notifier`](crate::Notifier); override
/// it to intercept every event unchanged (as `PagedView` does to re-emit).
pub trait Observer {
    fn on_data_changed(&self, _event: &DataChanged) {}
    fn on_current_row_changed(&self, _event: &CurrentRowChanged) {}
    fn on_state_changed(&self, _event: &StateChanged) {}
    fn on_data_loading(&self, _event: &DataLoading) {}
    fn on_xhr_error(&self, _event: &XhrError) {}
    fn on_pre_data_sorted(&self, _event: &PreDataSorted) {}
    fn on_data_sorted(&self, _event: &DataSorted) {}
    fn on_region_rendered(&self, _event: &RegionRendered) {}

    fn on_event(&self, event: &Event) {
        match event {
            Event::DataChanged(e) => self.on_data_changed(e),
            Event::CurrentRowChanged(e) => self.on_current_row_changed(e),
            Event::StateChanged(e) => self.on_state_changed(e),
            Event::DataLoading(e) => self.on_data_loading(e),
            Event::XhrError(e) => self.on_xhr_error(e),
            Event::PreDataSorted(e) => self.on_pre_data_sorted(e),
            Event::DataSorted(e) => self.on_data_sorted(e),
            Event::RegionRendered(e) => self.on_region_rendered(e),
        }
    }
}
