#![forbid(unsafe_code)]

//! Observable data sets for luga.
//!
//! This crate provides:
//! - [`DataSet`]: an in-memory row store with filtering, primary keys, a
//!   current-row cursor and sorting
//! - [`HttpDataSet`]: a data set loaded from a URL through a [`Transport`],
//!   with JSON, XML, TSV and RSS 2.0 [`RecordFormat`]s
//! - derived sources: [`DetailSet`], [`PagedView`] and [`ChildDataSet`]
//! - the [`Notifier`] / [`Observer`] protocol and the [`Registry`] that
//!   resolves sources by id
//!
//! Everything is single-threaded (`Rc`/`RefCell`); fetch outcomes arrive
//! through transport callbacks.

pub mod child;
#[cfg(feature = "config")]
pub mod config;
pub mod context;
pub mod dataset;
pub mod detail;
pub mod error;
pub mod event;
pub mod format;
pub mod http;
pub mod notifier;
pub mod paged;
pub mod placeholder;
pub mod record;
pub mod registry;
pub mod sort;
pub mod source;
pub mod state;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod transport;

pub use child::ChildDataSet;
#[cfg(feature = "config")]
pub use config::{SourceConfig, SourceKind, SourcesConfig};
pub use context::Context;
pub use dataset::{DataSet, Filter, Formatter};
pub use detail::DetailSet;
pub use error::{DataError, Result};
pub use event::{
    CurrentRowChanged, DataChanged, DataLoading, DataSorted, Event, EventKind, Observer,
    PreDataSorted, RegionRendered, SourceId, StateChanged, XhrError,
};
pub use format::{RawPayload, RecordFormat};
pub use http::{HttpDataSet, HttpDataSetBuilder, HttpOptions};
pub use notifier::{Notifier, Observable, Subscription};
pub use paged::PagedView;
pub use record::{PK_KEY, Record, Row, RowId};
pub use registry::Registry;
pub use sort::SortOrder;
pub use source::{DataSource, RecordSet};
pub use state::State;
#[cfg(feature = "http-client")]
pub use transport::BlockingTransport;
pub use transport::{FetchFailure, FetchHandle, FetchOutcome, FetchRequest, FetchResponse, Transport};
