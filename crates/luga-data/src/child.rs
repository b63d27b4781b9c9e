//! Master-detail: an HTTP data set whose URL follows a parent's current row.
//!
//! The URL template uses `{field}` placeholders (dotted paths allowed),
//! resolved strictly against the parent's current row. Each parent
//! `CurrentRowChanged` either loads the resolved URL once or, when the
//! parent has no current row, clears this set.

use std::rc::Rc;

use serde_json::Value;

use crate::context::Context;
use crate::dataset::DataSet;
use crate::error::Result;
use crate::event::{CurrentRowChanged, EventKind, Observer};
use crate::http::HttpDataSet;
use crate::notifier::{Notifier, Observable};
use crate::placeholder;
use crate::record::{Row, RowId};
use crate::sort::SortOrder;
use crate::source::{DataSource, RecordSet};
use crate::state::State;

/// A dependent [`HttpDataSet`] driven by a parent cursor.
pub struct ChildDataSet {
    http: Rc<HttpDataSet>,
    parent: Rc<dyn RecordSet>,
    url_template: String,
}

impl ChildDataSet {
    /// Bind `http` to `parent`. Nothing is fetched until the parent's
    /// current row changes (or [`bind_row`](Self::bind_row) is called).
    #[must_use]
    pub fn new(
        http: Rc<HttpDataSet>,
        parent: Rc<dyn RecordSet>,
        url_template: impl Into<String>,
    ) -> Rc<Self> {
        let child = Rc::new(Self {
            http,
            parent: Rc::clone(&parent),
            url_template: url_template.into(),
        });
        parent.add_event_observer(child.clone(), EventKind::CurrentRowChanged);
        child
    }

    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    #[must_use]
    pub fn parent(&self) -> &Rc<dyn RecordSet> {
        &self.parent
    }

    /// The HTTP data set doing the fetching.
    #[must_use]
    pub fn http(&self) -> &Rc<HttpDataSet> {
        &self.http
    }

    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.http.url()
    }

    /// Resolve the URL template against `row`.
    pub fn resolve_url(&self, row: &Row) -> Result<String> {
        placeholder::resolve(&self.url_template, &Value::Object((**row).clone()))
    }

    /// Load for `row`, or clear when `None`.
    ///
    /// An unresolvable placeholder fails before the URL or state change.
    pub fn bind_row(&self, row: Option<&Row>) -> Result<()> {
        match row {
            Some(row) => {
                let url = self.resolve_url(row)?;
                tracing::debug!(source = %self.http.id(), %url, "binding child data set");
                self.http.set_url(url);
                self.http.load_data()
            }
            None => {
                self.http.cancel_request();
                self.http.dataset().delete();
                Ok(())
            }
        }
    }
}

impl Observer for ChildDataSet {
    fn on_current_row_changed(&self, _event: &CurrentRowChanged) {
        let row = self.parent.current_row();
        if let Err(err) = self.bind_row(row.as_ref()) {
            tracing::error!(
                source = %self.http.id(),
                parent = %self.parent.id(),
                %err,
                "failed to bind child data set"
            );
        }
    }
}

impl std::fmt::Debug for ChildDataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildDataSet")
            .field("id", &self.http.id())
            .field("parent", &self.parent.id())
            .field("url_template", &self.url_template)
            .finish()
    }
}

impl Observable for ChildDataSet {
    fn notifier(&self) -> &Notifier {
        self.http.notifier()
    }
}

impl DataSource for ChildDataSet {
    fn id(&self) -> &str {
        self.http.id()
    }

    fn state(&self) -> State {
        self.http.state()
    }

    fn set_state(&self, state: State) {
        self.http.set_state(state);
    }

    fn context(&self) -> Context {
        self.http.context()
    }

    fn records_count(&self) -> usize {
        self.http.records_count()
    }

    fn load_data(&self) -> Result<()> {
        self.http.load_data()
    }

    fn current_row_id(&self) -> Option<RowId> {
        self.http.current_row_id()
    }

    fn set_current_row_id(&self, row_id: Option<RowId>) -> Result<()> {
        DataSource::set_current_row_id(&*self.http, row_id)
    }

    fn set_current_row_index(&self, index: usize) -> Result<()> {
        DataSource::set_current_row_index(&*self.http, index)
    }

    fn sort(&self, columns: &[String], order: SortOrder) -> Result<()> {
        DataSource::sort(&*self.http, columns, order)
    }
}

impl RecordSet for ChildDataSet {
    fn dataset(&self) -> &DataSet {
        self.http.dataset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::format::RecordFormat;
    use crate::testing::{EventLog, MockTransport};
    use serde_json::json;

    fn states() -> Rc<DataSet> {
        let ds = Rc::new(DataSet::new("states"));
        ds.insert_value(json!([
            {"name": "Alabama", "abbreviation": "AL"},
            {"name": "American Samoa", "abbreviation": "AS"},
            {"name": "Nowhere"},
        ]))
        .unwrap();
        ds
    }

    fn child(parent: &Rc<DataSet>, transport: &Rc<MockTransport>) -> Rc<ChildDataSet> {
        let http = HttpDataSet::builder("state-detail", RecordFormat::json()).build(transport.clone());
        ChildDataSet::new(http, parent.clone(), "data/{abbreviation}.json")
    }

    #[test]
    fn cursor_change_resolves_url_and_loads_once() {
        let parent = states();
        let transport = Rc::new(MockTransport::new());
        let child = child(&parent, &transport);
        parent.set_current_row_index(1).unwrap();
        assert_eq!(child.url().as_deref(), Some("data/AS.json"));
        assert_eq!(transport.urls(), vec!["data/AS.json"]);
        assert_eq!(child.state(), State::Loading);

        transport.respond(0, r#"{"capital": "Pago Pago"}"#);
        assert_eq!(child.records_count(), 1);
        assert_eq!(child.select()[0]["capital"], "Pago Pago");
    }

    #[test]
    fn unresolvable_placeholder_fails_binding() {
        let parent = states();
        let transport = Rc::new(MockTransport::new());
        let child = child(&parent, &transport);
        let row = parent.row_by_index(2).unwrap();
        let err = child.bind_row(Some(&row)).unwrap_err();
        assert!(matches!(err, DataError::UnresolvedPlaceholder { .. }));
        assert_eq!(transport.request_count(), 0);
        assert_eq!(child.url(), None);
    }

    #[test]
    fn handler_failure_is_logged_not_propagated() {
        let parent = states();
        let transport = Rc::new(MockTransport::new());
        let child = child(&parent, &transport);
        parent.set_current_row_index(2).unwrap();
        assert_eq!(transport.request_count(), 0);
        assert_eq!(child.state(), State::Unset);
    }

    #[test]
    fn no_current_row_clears() {
        let parent = states();
        let transport = Rc::new(MockTransport::new());
        transport.auto_respond(r#"[{"x": 1}, {"x": 2}]"#);
        let child = child(&parent, &transport);
        parent.set_current_row_index(1).unwrap();
        assert_eq!(child.records_count(), 2);

        let log = EventLog::attach(&*child);
        parent.set_current_row_id(None).unwrap();
        assert_eq!(child.records_count(), 0);
        assert!(log.count(EventKind::DataChanged) >= 1);
        assert_eq!(transport.request_count(), 1);
    }
}
