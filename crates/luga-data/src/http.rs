//! Data sets populated by fetching a URL.
//!
//! # Lifecycle
//!
//! ```text
//!   Unset ──load_data──► Loading ──success──► Ready
//!                          ▲   └────failure──► Error
//!                          └──────load_data────┘ (from Ready or Error)
//! ```
//!
//! `load_data` sets `Loading`, emits `DataLoading`, cancels any in-flight
//! request and only then issues the fetch. On success the body is parsed,
//! existing records are cleared silently (unless `incremental_load`), the
//! state becomes `Ready` and the parsed records are inserted, which emits
//! `DataChanged`. On failure the state becomes `Error` and `XhrError` is
//! emitted.
//!
//! # Invariants
//!
//! 1. Only the completion of the latest request is applied. Each request
//!    carries a generation number; completions for any other generation,
//!    or arriving after `cancel_request`, are dropped without touching
//!    state or notifying.
//! 2. Transport failures never surface as `Err`.
//! 3. A body that fails to parse leaves the existing records untouched.
//! 4. A replacing load that yields no records still emits
//!    `CurrentRowChanged` and `DataChanged` when it dropped records, with
//!    the cursor held before the load as `old_row_id`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::context::Context;
use crate::dataset::{DataSet, Formatter};
use crate::error::{DataError, Result};
use crate::event::{DataLoading, Event, XhrError};
use crate::format::{Extracted, RawPayload, RecordFormat};
use crate::notifier::{Notifier, Observable};
use crate::record::{Record, RowId};
use crate::sort::SortOrder;
use crate::source::{DataSource, RecordSet};
use crate::state::State;
use crate::transport::{FetchHandle, FetchOutcome, FetchRequest, Transport};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Request and loading options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    /// Passed to the transport; `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    /// When `false`, a `_=<millis>` query parameter defeats caches.
    pub cache: bool,
    /// Append fetched records instead of replacing them.
    pub incremental_load: bool,
    pub headers: Vec<(String, String)>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            cache: true,
            incremental_load: false,
            headers: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct FetchState {
    url: Option<String>,
    options: HttpOptions,
    generation: u64,
    in_flight: Option<u64>,
    pending: Option<FetchHandle>,
    error_message: Option<String>,
    raw: RawPayload,
}

/// A [`DataSet`] whose records come from a URL.
pub struct HttpDataSet {
    base: DataSet,
    format: RecordFormat,
    transport: Rc<dyn Transport>,
    fetch: RefCell<FetchState>,
    this: Weak<HttpDataSet>,
}

/// Builder for [`HttpDataSet`].
#[must_use]
pub struct HttpDataSetBuilder {
    id: String,
    format: RecordFormat,
    url: Option<String>,
    options: HttpOptions,
    formatter: Option<Formatter>,
}

impl HttpDataSetBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn options(mut self, options: HttpOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.options.cache = cache;
        self
    }

    pub fn incremental_load(mut self, incremental: bool) -> Self {
        self.options.incremental_load = incremental;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.push((name.into(), value.into()));
        self
    }

    pub fn formatter(mut self, formatter: impl Fn(Record, RowId) -> Record + 'static) -> Self {
        self.formatter = Some(Rc::new(formatter));
        self
    }

    #[must_use]
    pub fn build(self, transport: Rc<dyn Transport>) -> Rc<HttpDataSet> {
        let mut base = DataSet::new(self.id);
        base.set_formatter(self.formatter);
        let fetch = FetchState {
            url: self.url,
            options: self.options,
            ..FetchState::default()
        };
        Rc::new_cyclic(|this| HttpDataSet {
            base,
            format: self.format,
            transport,
            fetch: RefCell::new(fetch),
            this: this.clone(),
        })
    }
}

fn cache_busted(url: &str) -> String {
    let millis = web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_={millis}")
}

impl HttpDataSet {
    pub fn builder(id: impl Into<String>, format: RecordFormat) -> HttpDataSetBuilder {
        HttpDataSetBuilder {
            id: id.into(),
            format,
            url: None,
            options: HttpOptions::default(),
            formatter: None,
        }
    }

    /// The underlying row store.
    #[must_use]
    pub fn dataset(&self) -> &DataSet {
        &self.base
    }

    #[must_use]
    pub fn format(&self) -> &RecordFormat {
        &self.format
    }

    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.fetch.borrow().url.clone()
    }

    /// Change the URL used by the next `load_data`.
    pub fn set_url(&self, url: impl Into<String>) {
        self.fetch.borrow_mut().url = Some(url.into());
    }

    #[must_use]
    pub fn options(&self) -> HttpOptions {
        self.fetch.borrow().options.clone()
    }

    pub fn set_options(&self, options: HttpOptions) {
        self.fetch.borrow_mut().options = options;
    }

    /// Message of the last failed fetch, cleared by the next success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.fetch.borrow().error_message.clone()
    }

    /// Whether a request is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.fetch.borrow().in_flight.is_some()
    }

    /// Parsed body of the last successful JSON load.
    #[must_use]
    pub fn raw_json(&self) -> Option<Value> {
        match &self.fetch.borrow().raw {
            RawPayload::Json(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Body of the last successful XML load.
    #[must_use]
    pub fn raw_xml(&self) -> Option<String> {
        match &self.fetch.borrow().raw {
            RawPayload::Xml(body) => Some(body.clone()),
            _ => None,
        }
    }

    /// Channel metadata of the last successful RSS load.
    #[must_use]
    pub fn channel_meta(&self) -> Option<Map<String, Value>> {
        match &self.fetch.borrow().raw {
            RawPayload::Rss { channel } => Some(channel.clone()),
            _ => None,
        }
    }

    /// Issue a fetch of the configured URL.
    ///
    /// Fails only when no URL is configured; every other failure arrives
    /// later as `State::Error` plus `XhrError`.
    pub fn load_data(&self) -> Result<()> {
        let (url, options) = {
            let fetch = self.fetch.borrow();
            let url = fetch
                .url
                .clone()
                .ok_or_else(|| DataError::MissingUrl(self.base.id().to_owned()))?;
            (url, fetch.options.clone())
        };

        self.base.set_state(State::Loading);
        self.base.emit(Event::DataLoading(DataLoading {
            source: self.base.source_id(),
        }));
        self.cancel_request();

        let generation = {
            let mut fetch = self.fetch.borrow_mut();
            fetch.generation += 1;
            fetch.in_flight = Some(fetch.generation);
            fetch.generation
        };

        let request_url = if options.cache {
            url.clone()
        } else {
            cache_busted(&url)
        };
        let mut request = FetchRequest::get(request_url).with_timeout(options.timeout);
        request.headers = options.headers;

        tracing::debug!(source = %self.base.id(), url = %request.url, generation, "issuing fetch");

        let this = self.this.clone();
        let handle = self.transport.fetch(
            request,
            Box::new(move |outcome| {
                if let Some(source) = this.upgrade() {
                    source.complete(generation, &url, outcome);
                }
            }),
        );

        let mut fetch = self.fetch.borrow_mut();
        if fetch.in_flight == Some(generation) {
            fetch.pending = Some(handle);
        }
        Ok(())
    }

    /// Abort the outstanding request, if any. Its completion will be ignored.
    pub fn cancel_request(&self) {
        let handle = {
            let mut fetch = self.fetch.borrow_mut();
            if let Some(generation) = fetch.in_flight.take() {
                tracing::debug!(source = %self.base.id(), generation, "cancelling fetch");
            }
            fetch.pending.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn complete(&self, generation: u64, url: &str, outcome: FetchOutcome) {
        {
            let mut fetch = self.fetch.borrow_mut();
            if fetch.in_flight != Some(generation) {
                tracing::debug!(
                    source = %self.base.id(),
                    generation,
                    current = fetch.generation,
                    "discarding stale fetch completion"
                );
                return;
            }
            fetch.in_flight = None;
            fetch.pending = None;
        }

        match outcome {
            FetchOutcome::Success(response) => match self.format.extract(&response.body) {
                Ok(extracted) => self.apply(extracted),
                Err(err) => self.fail(url, 0, &err.to_string()),
            },
            FetchOutcome::Failure(failure) => self.fail(url, failure.status, &failure.status_text),
        }
    }

    fn apply(&self, extracted: Extracted) {
        let incremental = {
            let mut fetch = self.fetch.borrow_mut();
            fetch.error_message = None;
            fetch.raw = extracted.raw;
            fetch.options.incremental_load
        };
        let cleared = !incremental && self.base.clear_silently();
        self.base.set_state(State::Ready);
        match extracted.records {
            Some(records) => {
                if let Err(err) = self.base.insert(records) {
                    tracing::error!(source = %self.base.id(), %err, "failed to store fetched records");
                }
            }
            None if cleared => self.base.settle_after_clear(),
            None => {}
        }
    }

    fn fail(&self, url: &str, status: u16, cause: &str) {
        let message = format!("Failed to retrieve: {url}. HTTP status: {status}. Error: {cause}");
        tracing::warn!(source = %self.base.id(), %url, status, cause, "fetch failed");
        self.fetch.borrow_mut().error_message = Some(message.clone());
        self.base.set_state(State::Error);
        self.base.emit(Event::XhrError(XhrError {
            source: self.base.source_id(),
            message,
            url: url.to_owned(),
            status,
        }));
    }

    /// Base context, plus channel metadata for RSS sources.
    #[must_use]
    pub fn context(&self) -> Context {
        let mut context = self.base.context();
        if let RawPayload::Rss { channel } = &self.fetch.borrow().raw {
            context.merge(channel);
        }
        context
    }
}

impl Drop for HttpDataSet {
    fn drop(&mut self) {
        if let Some(handle) = self.fetch.get_mut().pending.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for HttpDataSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fetch = self.fetch.borrow();
        f.debug_struct("HttpDataSet")
            .field("base", &self.base)
            .field("format", &self.format)
            .field("url", &fetch.url)
            .field("generation", &fetch.generation)
            .field("in_flight", &fetch.in_flight)
            .finish()
    }
}

impl Observable for HttpDataSet {
    fn notifier(&self) -> &Notifier {
        self.base.notifier()
    }
}

impl DataSource for HttpDataSet {
    fn id(&self) -> &str {
        self.base.id()
    }

    fn state(&self) -> State {
        self.base.state()
    }

    fn set_state(&self, state: State) {
        self.base.set_state(state);
    }

    fn context(&self) -> Context {
        HttpDataSet::context(self)
    }

    fn records_count(&self) -> usize {
        self.base.records_count()
    }

    fn load_data(&self) -> Result<()> {
        HttpDataSet::load_data(self)
    }

    fn current_row_id(&self) -> Option<RowId> {
        self.base.current_row_id()
    }

    fn set_current_row_id(&self, row_id: Option<RowId>) -> Result<()> {
        self.base.set_current_row_id(row_id)
    }

    fn set_current_row_index(&self, index: usize) -> Result<()> {
        self.base.set_current_row_index(index)
    }

    fn sort(&self, columns: &[String], order: SortOrder) -> Result<()> {
        self.base.sort(columns, order)
    }
}

impl RecordSet for HttpDataSet {
    fn dataset(&self) -> &DataSet {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::testing::{EventLog, MockTransport};
    use crate::transport::FetchFailure;

    const LADIES: &str = r#"{"ladies": [{"name": "Ada"}, {"name": "Grace"}, {"name": "Hedy"}], "others": {}}"#;

    fn json_source(transport: &Rc<MockTransport>, path: Option<&str>) -> Rc<HttpDataSet> {
        let format = match path {
            Some(path) => RecordFormat::json_at(path),
            None => RecordFormat::json(),
        };
        HttpDataSet::builder("ladies", format)
            .url("http://test/ladies.json")
            .build(transport.clone())
    }

    #[test]
    fn missing_url_fails_synchronously() {
        let transport = Rc::new(MockTransport::new());
        let ds = HttpDataSet::builder("nourl", RecordFormat::json()).build(transport.clone());
        assert_eq!(ds.load_data(), Err(DataError::MissingUrl("nourl".into())));
        assert_eq!(ds.state(), State::Unset);
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn loading_is_announced_before_the_request() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("ladies"));
        let log = EventLog::attach(&*ds);
        ds.load_data().unwrap();
        assert_eq!(ds.state(), State::Loading);
        assert!(ds.is_pending());
        assert_eq!(
            log.kinds(),
            vec![EventKind::StateChanged, EventKind::DataLoading]
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn success_populates_and_becomes_ready() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("ladies"));
        ds.load_data().unwrap();
        let log = EventLog::attach(&*ds);
        transport.respond(0, LADIES);
        assert_eq!(ds.state(), State::Ready);
        assert_eq!(ds.records_count(), 3);
        assert!(!ds.is_pending());
        assert_eq!(
            log.kinds(),
            vec![
                EventKind::StateChanged,
                EventKind::CurrentRowChanged,
                EventKind::DataChanged
            ]
        );
        assert!(ds.raw_json().is_some());
    }

    #[test]
    fn unmatched_path_inserts_nothing() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("invalid"));
        ds.load_data().unwrap();
        let log = EventLog::attach(&*ds);
        transport.respond(0, LADIES);
        assert_eq!(ds.records_count(), 0);
        assert_eq!(log.count(EventKind::DataChanged), 0);
        assert_eq!(ds.state(), State::Ready);
    }

    #[test]
    fn reload_replaces_unless_incremental() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("ladies"));
        ds.load_data().unwrap();
        transport.respond(0, LADIES);
        ds.load_data().unwrap();
        transport.respond(1, LADIES);
        assert_eq!(ds.records_count(), 3);

        ds.set_options(HttpOptions {
            incremental_load: true,
            ..HttpOptions::default()
        });
        ds.load_data().unwrap();
        transport.respond(2, LADIES);
        assert_eq!(ds.records_count(), 6);
    }

    #[test]
    fn empty_reload_of_populated_source_notifies() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("ladies"));
        ds.load_data().unwrap();
        transport.respond(0, LADIES);
        let before = ds.current_row_id();
        assert!(before.is_some());

        let log = EventLog::attach(&*ds);
        ds.load_data().unwrap();
        transport.respond(1, r#"{"nothing": true}"#);

        assert_eq!(ds.records_count(), 0);
        assert_eq!(ds.current_row_id(), None);
        assert_eq!(
            log.kinds(),
            vec![
                EventKind::StateChanged,
                EventKind::DataLoading,
                EventKind::StateChanged,
                EventKind::CurrentRowChanged,
                EventKind::DataChanged,
            ]
        );
        let moved = log.events().into_iter().find_map(|e| match e {
            crate::event::Event::CurrentRowChanged(c) => Some((c.old_row_id, c.new_row_id)),
            _ => None,
        });
        assert_eq!(moved, Some((before, None)));
    }

    #[test]
    fn replacing_reload_reports_previous_cursor() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("ladies"));
        ds.load_data().unwrap();
        transport.respond(0, LADIES);
        let before = ds.current_row_id();

        let log = EventLog::attach(&*ds);
        ds.load_data().unwrap();
        transport.respond(1, LADIES);

        let after = ds.current_row_id();
        assert_ne!(after, before);
        let moved = log.events().into_iter().find_map(|e| match e {
            crate::event::Event::CurrentRowChanged(c) => Some((c.old_row_id, c.new_row_id)),
            _ => None,
        });
        assert_eq!(moved, Some((before, after)));
        assert_eq!(log.count(EventKind::DataChanged), 1);
    }

    #[test]
    fn transport_failure_goes_to_error() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, None);
        ds.load_data().unwrap();
        let log = EventLog::attach(&*ds);
        transport.fail(0, FetchFailure::new(404, "Not Found"));
        assert_eq!(ds.state(), State::Error);
        assert_eq!(
            ds.error_message().as_deref(),
            Some("Failed to retrieve: http://test/ladies.json. HTTP status: 404. Error: Not Found")
        );
        let errors = log.xhr_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status, 404);
        assert_eq!(errors[0].url, "http://test/ladies.json");
    }

    #[test]
    fn parse_failure_goes_to_error_and_keeps_records() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("ladies"));
        ds.load_data().unwrap();
        transport.respond(0, LADIES);
        ds.load_data().unwrap();
        transport.respond(1, "{broken");
        assert_eq!(ds.state(), State::Error);
        assert_eq!(ds.records_count(), 3);
        assert!(ds.error_message().unwrap().contains("HTTP status: 0"));
    }

    #[test]
    fn cancelled_request_completion_is_ignored() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, Some("ladies"));
        ds.load_data().unwrap();
        ds.cancel_request();
        assert!(transport.was_aborted(0));
        ds.load_data().unwrap();

        let log = EventLog::attach(&*ds);
        transport.respond(0, LADIES);
        assert!(log.is_empty());
        assert_eq!(ds.state(), State::Loading);
        assert_eq!(ds.records_count(), 0);

        transport.respond(1, LADIES);
        assert_eq!(ds.records_count(), 3);
    }

    #[test]
    fn cancel_without_request_is_safe() {
        let transport = Rc::new(MockTransport::new());
        let ds = json_source(&transport, None);
        ds.cancel_request();
        ds.cancel_request();
        assert!(!ds.is_pending());
    }

    #[test]
    fn cache_busting_and_headers() {
        let transport = Rc::new(MockTransport::new());
        let ds = HttpDataSet::builder("x", RecordFormat::json())
            .url("http://test/data.json?v=1")
            .cache(false)
            .header("Accept", "application/json")
            .build(transport.clone());
        ds.load_data().unwrap();
        let request = transport.request(0).unwrap();
        assert!(request.url.starts_with("http://test/data.json?v=1&_="));
        assert_eq!(request.headers, vec![("Accept".to_owned(), "application/json".to_owned())]);
        assert_eq!(request.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn synchronous_transport_completes_inside_load() {
        let transport = Rc::new(MockTransport::new());
        transport.auto_respond(LADIES);
        let ds = json_source(&transport, Some("ladies"));
        ds.load_data().unwrap();
        assert_eq!(ds.state(), State::Ready);
        assert_eq!(ds.records_count(), 3);
        assert!(!ds.is_pending());
    }

    #[test]
    fn rss_channel_meta_reaches_context() {
        let transport = Rc::new(MockTransport::new());
        let ds = HttpDataSet::builder("feed", RecordFormat::Rss2)
            .url("http://test/feed.xml")
            .build(transport.clone());
        ds.load_data().unwrap();
        transport.respond(
            0,
            "<rss><channel><title>News</title><item><title>a</title></item></channel></rss>",
        );
        let ctx = DataSource::context(&*ds);
        assert_eq!(ctx.get("title"), Some(&Value::from("News")));
        assert_eq!(ctx.record_count(), 1);
        assert_eq!(ds.channel_meta().unwrap()["title"], "News");
    }
}
