#![forbid(unsafe_code)]

//! Test harness and reference fixtures for luga.
//!
//! - fixture bodies (`LADIES_JSON`, `STATES_JSON`, ...) matching the files
//!   under `fixtures/`
//! - [`FixtureTransport`], a [`Transport`] that serves those bodies by URL
//!   and completes synchronously
//! - record generators and small constructors for common sources
//! - [`assert_snapshot!`] for rendered markup
//!
//! # Snapshots
//!
//! Snapshots live in `tests/snapshots/<name>.snap`. Run
//! `BLESS=1 cargo test --package luga-harness` to create or update them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use luga_data::{
    DataSet, FetchFailure, FetchHandle, FetchOutcome, FetchRequest, FetchResponse, Transport,
};
use serde_json::{Value, json};

pub use luga_data::testing::{EventLog, MockTransport};

// ============================================================================
// Fixtures
// ============================================================================

/// Seven ladies under `ladies` (two from the UK) plus an `others` object.
pub const LADIES_JSON: &str = include_str!("../fixtures/ladies.json");
/// Four US states, including American Samoa (`AS`).
pub const STATES_JSON: &str = include_str!("../fixtures/states.json");
/// Detail record for `AS`.
pub const STATE_AS_JSON: &str = include_str!("../fixtures/state-AS.json");
/// Three `<lady>` elements with an `id` attribute each.
pub const LADIES_XML: &str = include_str!("../fixtures/ladies.xml");
/// Header plus three rows; one blank line, one short row.
pub const LADIES_TSV: &str = include_str!("../fixtures/ladies.tsv");
/// RSS 2.0 channel with two items.
pub const FEED_RSS: &str = include_str!("../fixtures/feed.rss");
/// Source declarations for the fixtures above.
pub const SOURCES_TOML: &str = include_str!("../fixtures/sources.toml");

/// Number of records in [`LADIES_JSON`].
pub const LADIES_COUNT: usize = 7;
/// Number of UK records in [`LADIES_JSON`].
pub const UK_LADIES: usize = 2;

/// URL → body table for every fixture.
#[must_use]
pub fn fixture_routes() -> Vec<(&'static str, &'static str)> {
    vec![
        ("fixtures/ladies.json", LADIES_JSON),
        ("fixtures/states.json", STATES_JSON),
        ("fixtures/state-AS.json", STATE_AS_JSON),
        ("fixtures/ladies.xml", LADIES_XML),
        ("fixtures/ladies.tsv", LADIES_TSV),
        ("fixtures/feed.rss", FEED_RSS),
    ]
}

/// `count` records `{"n": i, "label": "item-i", "even": bool}`, `i` from 1.
#[must_use]
pub fn numbered_records(count: usize) -> Value {
    Value::Array(
        (1..=count)
            .map(|i| json!({"n": i, "label": format!("item-{i}"), "even": i % 2 == 0}))
            .collect(),
    )
}

/// In-memory data set holding `records`.
///
/// # Panics
///
/// When `records` is not an object or an array of objects.
#[must_use]
pub fn static_set(id: &str, records: Value) -> Rc<DataSet> {
    let ds = Rc::new(DataSet::new(id));
    if let Err(err) = ds.insert_value(records) {
        panic!("fixture records for '{id}' rejected: {err}");
    }
    ds
}

/// The `ladies` array of [`LADIES_JSON`] as an in-memory data set.
#[must_use]
pub fn ladies_set(id: &str) -> Rc<DataSet> {
    let body: Value = match serde_json::from_str(LADIES_JSON) {
        Ok(body) => body,
        Err(err) => panic!("ladies fixture is not JSON: {err}"),
    };
    static_set(id, body["ladies"].clone())
}

// ============================================================================
// Strategies
// ============================================================================

/// Proptest strategies over records and row-store operations.
pub mod strategies {
    use proptest::prelude::*;
    use serde_json::{Value, json};

    /// A flat record with a country from a small set and an integer score.
    pub fn record() -> impl Strategy<Value = Value> {
        (
            prop::sample::select(vec!["UK", "US", "France", "Italy"]),
            -1000i64..1000,
            "[a-z]{1,8}",
        )
            .prop_map(|(country, score, name)| json!({"name": name, "country": country, "score": score}))
    }

    /// A field value of any sortable class: null, numbers, numeric and
    /// non-numeric strings, booleans.
    pub fn mixed_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            (-50i64..50).prop_map(Value::from),
            (-5.0f64..5.0).prop_map(Value::from),
            (-50i64..150).prop_map(|n| Value::from(n.to_string())),
            prop::sample::select(vec!["1a", "3x", "b", "", " 7 ", "10e1", "-0"])
                .prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ]
    }

    /// Records `{"seq": i, "v": <mixed>}`; `v` is sometimes missing.
    pub fn mixed_batch(max: usize) -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(prop::option::weighted(0.9, mixed_value()), 0..=max).prop_map(
            |values| {
                values
                    .into_iter()
                    .enumerate()
                    .map(|(seq, v)| match v {
                        Some(v) => json!({"seq": seq, "v": v}),
                        None => json!({"seq": seq}),
                    })
                    .collect()
            },
        )
    }

    /// One `insert` argument: up to `max` records.
    pub fn batch(max: usize) -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(record(), 0..=max)
    }

    /// A mutation applied to a data set in property tests.
    #[derive(Debug, Clone)]
    pub enum Op {
        Insert(Vec<Value>),
        /// Delete every row whose `score` is below the threshold.
        DeleteBelow(i64),
        DeleteAll,
        SortByScore(bool),
        FilterCountry(&'static str),
        ClearFilter,
    }

    pub fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => batch(6).prop_map(Op::Insert),
            1 => (-1000i64..1000).prop_map(Op::DeleteBelow),
            1 => Just(Op::DeleteAll),
            2 => any::<bool>().prop_map(Op::SortByScore),
            1 => prop::sample::select(vec!["UK", "US", "France"]).prop_map(Op::FilterCountry),
            1 => Just(Op::ClearFilter),
        ]
    }
}

// ============================================================================
// FixtureTransport
// ============================================================================

/// Serves registered bodies by URL, synchronously.
///
/// The query string is ignored when matching, so cache-busted URLs still
/// resolve. Unknown URLs fail with 404.
#[derive(Default)]
pub struct FixtureTransport {
    routes: RefCell<HashMap<String, String>>,
    requested: RefCell<Vec<String>>,
}

impl FixtureTransport {
    /// A transport serving [`fixture_routes`].
    #[must_use]
    pub fn new() -> Rc<Self> {
        let transport = Self::default();
        for (url, body) in fixture_routes() {
            transport.route(url, body);
        }
        Rc::new(transport)
    }

    pub fn route(&self, url: impl Into<String>, body: impl Into<String>) {
        self.routes.borrow_mut().insert(url.into(), body.into());
    }

    /// Every requested URL, as issued.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl Transport for FixtureTransport {
    fn fetch(&self, request: FetchRequest, on_complete: luga_data::transport::FetchCallback) -> FetchHandle {
        self.requested.borrow_mut().push(request.url.clone());
        let path = request.url.split('?').next().unwrap_or_default();
        let body = self.routes.borrow().get(path).cloned();
        let outcome = match body {
            Some(body) => FetchOutcome::Success(FetchResponse::ok(body)),
            None => FetchOutcome::Failure(FetchFailure::new(404, "Not Found")),
        };
        tracing::trace!(url = %request.url, "fixture transport completing");
        on_complete(outcome);
        FetchHandle::detached()
    }
}

impl std::fmt::Debug for FixtureTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureTransport")
            .field("routes", &self.routes.borrow().len())
            .field("requested", &self.requested.borrow())
            .finish()
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Compare `actual` with `<manifest_dir>/tests/snapshots/<name>.snap`.
///
/// With `BLESS=1` the snapshot is written instead.
///
/// # Panics
///
/// On mismatch, or when the snapshot is missing and `BLESS` is unset.
pub fn check_snapshot(name: &str, actual: &str, manifest_dir: &str) {
    let path = Path::new(manifest_dir)
        .join("tests")
        .join("snapshots")
        .join(format!("{name}.snap"));
    let bless = std::env::var("BLESS").is_ok_and(|v| v == "1");
    if bless {
        if let Some(dir) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(dir) {
                panic!("cannot create {}: {err}", dir.display());
            }
        }
        if let Err(err) = std::fs::write(&path, format!("{actual}\n")) {
            panic!("cannot write {}: {err}", path.display());
        }
        return;
    }
    match std::fs::read_to_string(&path) {
        Ok(expected) => assert_eq!(
            actual,
            expected.trim_end_matches('\n'),
            "snapshot '{name}' differs; rerun with BLESS=1 to accept"
        ),
        Err(_) => panic!(
            "snapshot '{}' missing at {}; run with BLESS=1 to create it",
            name,
            path.display()
        ),
    }
}

/// Assert that rendered markup matches a stored snapshot.
#[macro_export]
macro_rules! assert_snapshot {
    ($name:expr, $actual:expr) => {
        $crate::check_snapshot($name, &$actual, env!("CARGO_MANIFEST_DIR"))
    };
}
