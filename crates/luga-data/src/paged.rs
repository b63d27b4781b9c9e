//! Page-windowed projection of a parent data source.
//!
//! A `PagedView` stores nothing. Mutating calls go straight to the parent,
//! parent notifications are re-emitted unchanged, and only
//! [`context`](DataSource::context) applies the window.
//!
//! # Invariants
//!
//! 1. `records_count()` is the parent's count; paging never changes it.
//! 2. The window holds at most `page_size` entities.
//! 3. After the parent shrinks, the current page is clamped to the last
//!    page before the notification is forwarded.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;

use crate::context::Context;
use crate::error::{DataError, Result};
use crate::event::{DataChanged, Event, Observer, SourceId};
use crate::notifier::{Notifier, Observable};
use crate::record::RowId;
use crate::sort::SortOrder;
use crate::source::DataSource;
use crate::state::State;

/// Page size used when none is given.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A paging window over a parent source.
pub struct PagedView {
    id: SourceId,
    parent: Rc<dyn DataSource>,
    page_size: usize,
    current_page: Cell<usize>,
    notifier: Notifier,
}

impl PagedView {
    /// Create a view over `parent`. `page_size` defaults to
    /// [`DEFAULT_PAGE_SIZE`] and must be positive.
    pub fn new(
        id: impl Into<String>,
        parent: Rc<dyn DataSource>,
        page_size: Option<usize>,
    ) -> Result<Rc<Self>> {
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(DataError::InvalidPageSize);
        }
        let view = Rc::new(Self {
            id: Rc::from(id.into()),
            parent: Rc::clone(&parent),
            page_size,
            current_page: Cell::new(1),
            notifier: Notifier::new(),
        });
        parent.add_observer(view.clone());
        Ok(view)
    }

    #[must_use]
    pub fn parent(&self) -> &Rc<dyn DataSource> {
        &self.parent
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// 1-based page number.
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page.get()
    }

    /// Number of pages, `0` when the parent is empty.
    #[must_use]
    pub fn pages_count(&self) -> usize {
        self.parent.records_count().div_ceil(self.page_size)
    }

    /// Show page `page` (1-based) and emit `DataChanged`.
    pub fn set_current_page(&self, page: usize) -> Result<()> {
        let pages = self.pages_count();
        if page == 0 || page > pages {
            return Err(DataError::PageOutOfRange { page, pages });
        }
        self.current_page.set(page);
        self.notifier.notify_observers(&Event::DataChanged(DataChanged {
            source: Rc::clone(&self.id),
        }));
        Ok(())
    }

    fn clamp_page(&self) {
        let last = self.pages_count().max(1);
        if self.current_page.get() > last {
            tracing::debug!(view = %self.id, page = last, "clamping current page");
            self.current_page.set(last);
        }
    }
}

impl Observer for PagedView {
    fn on_event(&self, event: &Event) {
        if matches!(event, Event::DataChanged(_)) {
            self.clamp_page();
        }
        self.notifier.notify_observers(event);
    }
}

impl std::fmt::Debug for PagedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedView")
            .field("id", &self.id)
            .field("parent", &self.parent.id())
            .field("page_size", &self.page_size)
            .field("current_page", &self.current_page.get())
            .finish()
    }
}

impl Observable for PagedView {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

impl DataSource for PagedView {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> State {
        self.parent.state()
    }

    fn set_state(&self, state: State) {
        self.parent.set_state(state);
    }

    /// Parent context with `entities` windowed to the current page, plus
    /// paging fields.
    fn context(&self) -> Context {
        let mut context = self.parent.context();
        let all = context.entities();
        let offset = (self.current_page.get() - 1) * self.page_size;
        let window: Vec<Value> = all
            .iter()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();
        let on_page = window.len();
        let (start, end) = if on_page == 0 {
            (0, 0)
        } else {
            (offset + 1, offset + on_page)
        };
        context.set_entities(window);
        context.insert("currentPageNumber", self.current_page.get());
        context.insert("pagesCount", self.pages_count());
        context.insert("currentPageRecordsCount", on_page);
        context.insert("currentOffsetStart", start);
        context.insert("currentOffsetEnd", end);
        context.insert("pageSize", self.page_size);
        context
    }

    fn records_count(&self) -> usize {
        self.parent.records_count()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataSet;
    use crate::event::EventKind;
    use crate::testing::EventLog;
    use serde_json::json;

    fn parent(n: usize) -> Rc<DataSet> {
        let ds = Rc::new(DataSet::new("numbers"));
        let rows: Vec<Value> = (0..n).map(|i| json!({"n": i})).collect();
        ds.insert_value(Value::Array(rows)).unwrap();
        ds
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = PagedView::new("p", parent(3), Some(0)).unwrap_err();
        assert_eq!(err, DataError::InvalidPageSize);
    }

    #[test]
    fn windows_and_counts() {
        let view = PagedView::new("p", parent(35), None).unwrap();
        assert_eq!(view.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(view.pages_count(), 4);
        assert_eq!(view.records_count(), 35);

        let ctx = view.context();
        assert_eq!(ctx.entities().len(), 10);
        assert_eq!(ctx.record_count(), 35);
        assert_eq!(ctx.get("currentOffsetStart"), Some(&json!(1)));

        view.set_current_page(4).unwrap();
        let ctx = view.context();
        assert_eq!(ctx.entities().len(), 5);
        assert_eq!(ctx.entities()[0]["n"], 30);
        assert_eq!(ctx.get("currentOffsetEnd"), Some(&json!(35)));
        assert_eq!(ctx.get("pagesCount"), Some(&json!(4)));
    }

    #[test]
    fn out_of_range_page() {
        let view = PagedView::new("p", parent(5), Some(2)).unwrap();
        assert_eq!(
            view.set_current_page(4),
            Err(DataError::PageOutOfRange { page: 4, pages: 3 })
        );
        assert!(view.set_current_page(0).is_err());
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn parent_events_are_forwarded_unchanged() {
        let parent = parent(3);
        let view = PagedView::new("p", parent.clone(), None).unwrap();
        let log = EventLog::attach(&*view);
        parent.set_current_row_index(2).unwrap();
        parent.sort(&["n".into()], SortOrder::Descending).unwrap();
        assert_eq!(
            log.kinds(),
            vec![
                EventKind::CurrentRowChanged,
                EventKind::PreDataSorted,
                EventKind::DataSorted,
                EventKind::DataChanged
            ]
        );
        assert!(log.events().iter().all(|e| e.source() == "numbers"));
    }

    #[test]
    fn page_is_clamped_when_parent_shrinks() {
        let parent = parent(25);
        let view = PagedView::new("p", parent.clone(), None).unwrap();
        view.set_current_page(3).unwrap();
        parent.delete_where(|_, row, _| (row["n"].as_u64() >= Some(5)).then(|| Rc::clone(row)));
        assert_eq!(view.current_page(), 1);
        assert_eq!(view.context().entities().len(), 5);
    }

    #[test]
    fn mutations_delegate_to_parent() {
        let parent = parent(12);
        let view = PagedView::new("p", parent.clone(), Some(5)).unwrap();
        view.set_current_row_index(7).unwrap();
        assert_eq!(parent.current_row_index(), Some(7));
        view.set_state(State::Ready);
        assert_eq!(parent.state(), State::Ready);
        view.sort(&["n".into()], SortOrder::Descending).unwrap();
        assert_eq!(parent.select()[0]["n"], 11);
        assert!(view.load_data().is_ok());
    }
}
