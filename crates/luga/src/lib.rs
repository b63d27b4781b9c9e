#![forbid(unsafe_code)]

//! luga: observable data sets projected into template-rendered regions.
//!
//! This crate re-exports [`luga_data`] as [`data`] and, with the default
//! `region` feature, [`luga_region`] as [`region`]. Most programs only
//! need the [`prelude`].
//!
//! ```ignore
//! use luga::prelude::*;
//!
//! let registry = Rc::new(Registry::new());
//! let ladies = Rc::new(DataSet::new("ladies"));
//! registry.register(ladies.clone())?;
//!
//! let dom = Rc::new(MemoryDom::parse(r#"<ul id="list"/>"#)?);
//! let env = RegionEnv::new(dom, registry);
//! let region = Region::new(
//!     RegionOptions::new("list", "ladies")
//!         .template(TemplateSource::Inline("{#entities}<li>{name}</li>{/entities}".into())),
//!     &env,
//! )?;
//! ```

pub use luga_data as data;
#[cfg(feature = "region")]
pub use luga_region as region;

pub use luga_data::{DataError, DataSet, DataSource, Registry};
#[cfg(feature = "region")]
pub use luga_region::{Region, RegionError};

/// Everything needed to declare sources and render regions.
pub mod prelude {
    pub use std::rc::Rc;

    pub use luga_data::{
        ChildDataSet, Context, DataError, DataSet, DataSource, DetailSet, Event, EventKind,
        FetchFailure, FetchHandle, FetchOutcome, FetchRequest, FetchResponse, HttpDataSet,
        HttpOptions, Observable, Observer, PagedView, RecordFormat, RecordSet, Registry, Row,
        RowId, SortOrder, State, Subscription, Transport,
    };
    #[cfg(feature = "http-client")]
    pub use luga_data::BlockingTransport;
    #[cfg(feature = "config")]
    pub use luga_data::SourcesConfig;

    #[cfg(feature = "region")]
    pub use luga_region::{
        Dom, MemoryDom, NodeId, PlaceholderEngine, Region, RegionEnv, RegionError, RegionOptions,
        TemplateEngine, TemplateSource, TraitContext, TraitRegistry, wire_regions,
    };
}
