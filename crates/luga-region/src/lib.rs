#![forbid(unsafe_code)]

//! Template-driven regions for luga.
//!
//! A [`Region`] binds a DOM node to a data source: it renders the source's
//! [`Context`](luga_data::Context) through a [`Template`] on every data or
//! state change and re-applies its traits when the cursor moves.
//!
//! The DOM is reached through the [`Dom`] trait; [`MemoryDom`] is a
//! headless implementation. [`wire_regions`] builds regions from
//! `data-lugaregion-*` attributes.

pub mod dom;
pub mod error;
pub mod region;
pub mod template;
pub mod traits;
pub mod wiring;

pub use dom::{ClickHandler, Dom, MemoryDom, NodeId};
pub use error::{RegionError, Result};
pub use region::{NodeRef, Region, RegionEnv, RegionOptions, SourceRef, TemplateSource};
pub use template::{PlaceholderEngine, Template, TemplateEngine, template_fn};
pub use traits::{DEFAULT_TRAITS, RegionTrait, TraitContext, TraitRegistry};
pub use wiring::{region_options, wire_regions};
