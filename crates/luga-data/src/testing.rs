//! Test doubles for data-source code: a scriptable [`MockTransport`] and an
//! [`EventLog`] observer.
//!
//! Available in this crate's tests and, with the `test-helpers` feature, to
//! downstream test suites.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::event::{Event, EventKind, Observer, XhrError};
use crate::notifier::Observable;
use crate::transport::{
    FetchCallback, FetchFailure, FetchHandle, FetchOutcome, FetchRequest, FetchResponse, Transport,
};

struct Recorded {
    request: FetchRequest,
    callback: Option<FetchCallback>,
    aborted: Rc<Cell<bool>>,
}

/// Transport that records requests and completes them on demand.
///
/// Requests are numbered from zero in issue order. Completing an aborted
/// request still runs its callback, which is how late completions after a
/// cancellation are simulated.
#[derive(Default)]
pub struct MockTransport {
    requests: RefCell<Vec<Recorded>>,
    auto: RefCell<Option<FetchOutcome>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete every future request immediately with `body`.
    pub fn auto_respond(&self, body: impl Into<String>) {
        *self.auto.borrow_mut() = Some(FetchOutcome::Success(FetchResponse::ok(body)));
    }

    /// Complete every future request immediately with `failure`.
    pub fn auto_fail(&self, failure: FetchFailure) {
        *self.auto.borrow_mut() = Some(FetchOutcome::Failure(failure));
    }

    /// Stop completing requests immediately.
    pub fn manual(&self) {
        *self.auto.borrow_mut() = None;
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    #[must_use]
    pub fn request(&self, index: usize) -> Option<FetchRequest> {
        self.requests.borrow().get(index).map(|r| r.request.clone())
    }

    /// URLs of every request, in issue order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.request.url.clone())
            .collect()
    }

    #[must_use]
    pub fn was_aborted(&self, index: usize) -> bool {
        self.requests
            .borrow()
            .get(index)
            .is_some_and(|r| r.aborted.get())
    }

    /// Complete request `index` with a 200 response. Returns `false` if the
    /// request does not exist or was already completed.
    pub fn respond(&self, index: usize, body: impl Into<String>) -> bool {
        self.complete(index, FetchOutcome::Success(FetchResponse::ok(body)))
    }

    /// Complete request `index` with a failure.
    pub fn fail(&self, index: usize, failure: FetchFailure) -> bool {
        self.complete(index, FetchOutcome::Failure(failure))
    }

    /// Complete the most recent request with a 200 response.
    pub fn respond_last(&self, body: impl Into<String>) -> bool {
        match self.request_count().checked_sub(1) {
            Some(index) => self.respond(index, body),
            None => false,
        }
    }

    fn complete(&self, index: usize, outcome: FetchOutcome) -> bool {
        let callback = self
            .requests
            .borrow_mut()
            .get_mut(index)
            .and_then(|r| r.callback.take());
        match callback {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => false,
        }
    }
}

impl Transport for MockTransport {
    fn fetch(&self, request: FetchRequest, on_complete: FetchCallback) -> FetchHandle {
        let aborted = Rc::new(Cell::new(false));
        let auto = self.auto.borrow().clone();
        let (callback, immediate) = match auto {
            Some(outcome) => (None, Some((on_complete, outcome))),
            None => (Some(on_complete), None),
        };
        self.requests.borrow_mut().push(Recorded {
            request,
            callback,
            aborted: Rc::clone(&aborted),
        });
        if let Some((on_complete, outcome)) = immediate {
            on_complete(outcome);
        }
        FetchHandle::new(move || aborted.set(true))
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.urls())
            .finish()
    }
}

/// Observer that records every event it receives.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RefCell<Vec<Event>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Create a log registered as a generic observer of `source`.
    #[must_use]
    pub fn attach<O: Observable + ?Sized>(source: &O) -> Rc<Self> {
        let log = Self::new();
        source.add_observer(log.clone());
        log
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(Event::kind).collect()
    }

    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    #[must_use]
    pub fn xhr_errors(&self) -> Vec<XhrError> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::XhrError(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Observer for EventLog {
    fn on_event(&self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}
