//! A DOM node kept in sync with a data source through a template.
//!
//! # Lifecycle
//!
//! 1. [`Region::new`] resolves the node, the data source, the traits and
//!    the template, registers the region as an observer and renders once.
//! 2. `DataChanged` and `StateChanged` from the source re-render;
//!    `CurrentRowChanged` only re-applies traits.
//! 3. A template loaded from a URL leaves the region pending: `render` is a
//!    no-op until the body arrives, then the region renders.
//!
//! # Invariants
//!
//! 1. No borrow of region state is held while the template, the DOM or a
//!    trait runs, so traits may move the cursor of the source mid-render.
//! 2. Every successful render ends with a `RegionRendered` event on the
//!    region's own notifier.
//!
//! # Failure Modes
//!
//! - Unknown node, source, template element or trait name, and template
//!   compile errors fail construction.
//! - Failures inside notification handlers are logged with `error!`.
//! - A failed template fetch is logged with `warn!`; the region stays
//!   pending.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use luga_data::{
    CurrentRowChanged, DataChanged, DataSource, Event, FetchHandle, FetchOutcome, FetchRequest,
    Notifier, Observable, Observer, RegionRendered, Registry, StateChanged, Transport,
};

use crate::dom::{Dom, NodeId};
use crate::error::{RegionError, Result};
use crate::template::{PlaceholderEngine, Template, TemplateEngine};
use crate::traits::{DEFAULT_TRAITS, TraitContext, TraitRegistry};

/// Where a region attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// Element `id` attribute.
    Id(String),
    Node(NodeId),
}

impl From<&str> for NodeRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

impl From<NodeId> for NodeRef {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

/// Which data source a region renders.
#[derive(Clone)]
pub enum SourceRef {
    /// Registry id.
    Id(String),
    Source(Rc<dyn DataSource>),
}

impl From<&str> for SourceRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

impl From<Rc<dyn DataSource>> for SourceRef {
    fn from(source: Rc<dyn DataSource>) -> Self {
        Self::Source(source)
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Self::Source(source) => f.debug_tuple("Source").field(&source.id()).finish(),
        }
    }
}

/// Where the template comes from. Without one, the node's own content is
/// the template source.
#[derive(Clone)]
pub enum TemplateSource {
    Inline(String),
    /// Content of the element with this id.
    ElementId(String),
    /// Fetched through the environment's transport.
    Url(String),
    Compiled(Template),
}

impl fmt::Debug for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(source) => f.debug_tuple("Inline").field(source).finish(),
            Self::ElementId(id) => f.debug_tuple("ElementId").field(id).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Compiled(_) => f.write_str("Compiled(..)"),
        }
    }
}

/// Construction options of a [`Region`].
#[derive(Debug, Clone)]
pub struct RegionOptions {
    pub node: NodeRef,
    pub data_source: SourceRef,
    pub template: Option<TemplateSource>,
    /// Custom traits applied after the built-ins.
    pub traits: Vec<String>,
}

impl RegionOptions {
    pub fn new(node: impl Into<NodeRef>, data_source: impl Into<SourceRef>) -> Self {
        Self {
            node: node.into(),
            data_source: data_source.into(),
            template: None,
            traits: Vec::new(),
        }
    }

    #[must_use]
    pub fn template(mut self, template: TemplateSource) -> Self {
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.traits.push(name.into());
        self
    }
}

/// Shared collaborators of every region in a document.
#[derive(Clone)]
pub struct RegionEnv {
    pub dom: Rc<dyn Dom>,
    pub registry: Rc<Registry>,
    pub engine: Rc<dyn TemplateEngine>,
    pub traits: Rc<TraitRegistry>,
    pub transport: Option<Rc<dyn Transport>>,
}

impl RegionEnv {
    /// Environment with the placeholder engine, the built-in traits and no
    /// transport.
    pub fn new(dom: Rc<dyn Dom>, registry: Rc<Registry>) -> Self {
        Self {
            dom,
            registry,
            engine: Rc::new(PlaceholderEngine),
            traits: Rc::new(TraitRegistry::new()),
            transport: None,
        }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Rc<dyn TemplateEngine>) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn with_traits(mut self, traits: Rc<TraitRegistry>) -> Self {
        self.traits = traits;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Rc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl fmt::Debug for RegionEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionEnv")
            .field("registry", &self.registry)
            .field("traits", &self.traits)
            .field("transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

/// A rendered view of one data source.
pub struct Region {
    node: NodeId,
    label: String,
    data_source: Rc<dyn DataSource>,
    dom: Rc<dyn Dom>,
    engine: Rc<dyn TemplateEngine>,
    traits: Rc<TraitRegistry>,
    trait_names: Vec<String>,
    template: RefCell<Option<Template>>,
    fetch: RefCell<Option<FetchHandle>>,
    notifier: Notifier,
}

impl Region {
    /// Build, register and render a region.
    pub fn new(options: RegionOptions, env: &RegionEnv) -> Result<Rc<Self>> {
        let node = match &options.node {
            NodeRef::Id(id) => env
                .dom
                .find_by_id(id)
                .ok_or_else(|| RegionError::NodeNotFound(id.clone()))?,
            NodeRef::Node(node) => *node,
        };
        let data_source = match options.data_source {
            SourceRef::Id(id) => env
                .registry
                .lookup(&id)
                .ok_or(RegionError::UnknownSource(id))?,
            SourceRef::Source(source) => source,
        };

        let mut trait_names: Vec<String> = DEFAULT_TRAITS.iter().map(|n| (*n).to_owned()).collect();
        for name in options.traits {
            env.traits.resolve(&name)?;
            if !trait_names.contains(&name) {
                trait_names.push(name);
            }
        }

        let mut remote = None;
        let template = match options.template {
            Some(TemplateSource::Inline(source)) => Some(env.engine.compile(&source)?),
            Some(TemplateSource::Compiled(template)) => Some(template),
            Some(TemplateSource::ElementId(id)) => {
                let element = env
                    .dom
                    .find_by_id(&id)
                    .ok_or(RegionError::TemplateNotFound(id))?;
                Some(env.engine.compile(&env.dom.content(element))?)
            }
            Some(TemplateSource::Url(url)) => {
                let transport = env.transport.clone().ok_or_else(|| {
                    RegionError::TemplateNotFound(format!("{url} (no transport configured)"))
                })?;
                remote = Some((transport, url));
                None
            }
            None => Some(env.engine.compile(&env.dom.content(node))?),
        };

        let region = Rc::new(Self {
            node,
            label: env.dom.describe(node),
            data_source,
            dom: Rc::clone(&env.dom),
            engine: Rc::clone(&env.engine),
            traits: Rc::clone(&env.traits),
            trait_names,
            template: RefCell::new(template),
            fetch: RefCell::new(None),
            notifier: Notifier::new(),
        });
        region.data_source.add_observer(region.clone());
        tracing::debug!(
            region = %region.label,
            source = %region.data_source.id(),
            "region created"
        );

        match remote {
            Some((transport, url)) => region.fetch_template(transport.as_ref(), url),
            None => region.render()?,
        }
        Ok(region)
    }

    fn fetch_template(self: &Rc<Self>, transport: &dyn Transport, url: String) {
        let this: Weak<Self> = Rc::downgrade(self);
        let done = Rc::new(Cell::new(false));
        let finished = Rc::clone(&done);
        let request_url = url.clone();
        let handle = transport.fetch(
            FetchRequest::get(url),
            Box::new(move |outcome| {
                finished.set(true);
                let Some(region) = this.upgrade() else { return };
                region.fetch.borrow_mut().take();
                region.template_arrived(&request_url, outcome);
            }),
        );
        // Transports may complete inside `fetch`.
        if !done.get() {
            *self.fetch.borrow_mut() = Some(handle);
        }
    }

    fn template_arrived(&self, url: &str, outcome: FetchOutcome) {
        let body = match outcome {
            FetchOutcome::Success(response) if (200..300).contains(&response.status) => {
                response.body
            }
            FetchOutcome::Success(response) => {
                tracing::warn!(region = %self.label, %url, status = response.status, "template fetch failed");
                return;
            }
            FetchOutcome::Failure(failure) => {
                tracing::warn!(
                    region = %self.label,
                    %url,
                    status = failure.status,
                    reason = %failure.status_text,
                    "template fetch failed"
                );
                return;
            }
        };
        match self.engine.compile(&body) {
            Ok(template) => self.set_template(template),
            Err(err) => tracing::error!(region = %self.label, %url, %err, "remote template rejected"),
        }
    }

    /// Replace the template and render with it.
    pub fn set_template(&self, template: Template) {
        *self.template.borrow_mut() = Some(template);
        self.render_or_log();
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn data_source(&self) -> &Rc<dyn DataSource> {
        &self.data_source
    }

    /// Traits applied after each render, built-ins first.
    #[must_use]
    pub fn trait_names(&self) -> &[String] {
        &self.trait_names
    }

    #[must_use]
    pub fn has_template(&self) -> bool {
        self.template.borrow().is_some()
    }

    /// Whether a template fetch is still outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.fetch.borrow().is_some()
    }

    /// Regenerate the node's content from the source context, then apply
    /// traits. A no-op while the template is pending.
    pub fn render(&self) -> Result<()> {
        let Some(template) = self.template.borrow().clone() else {
            tracing::trace!(region = %self.label, "render skipped, template pending");
            return Ok(());
        };
        let markup = template(&self.data_source.context());
        self.dom.set_content(self.node, &markup)?;
        self.apply_traits()?;
        tracing::trace!(region = %self.label, source = %self.data_source.id(), "region rendered");
        self.notifier
            .notify_observers(&Event::RegionRendered(RegionRendered {
                source: Rc::from(self.data_source.id()),
                node: self.label.clone(),
            }));
        Ok(())
    }

    /// Re-bind every trait against the current DOM.
    pub fn apply_traits(&self) -> Result<()> {
        self.traits.apply(
            &self.trait_names,
            &TraitContext {
                node: self.node,
                data_source: &self.data_source,
                dom: &self.dom,
            },
        )
    }

    fn render_or_log(&self) {
        if let Err(err) = self.render() {
            tracing::error!(region = %self.label, source = %self.data_source.id(), %err, "region render failed");
        }
    }
}

impl Observer for Region {
    fn on_data_changed(&self, _event: &DataChanged) {
        self.render_or_log();
    }

    fn on_state_changed(&self, _event: &StateChanged) {
        self.render_or_log();
    }

    fn on_current_row_changed(&self, _event: &CurrentRowChanged) {
        if let Err(err) = self.apply_traits() {
            tracing::error!(region = %self.label, %err, "region traits failed");
        }
    }
}

impl Observable for Region {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if let Some(handle) = self.fetch.get_mut().take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("node", &self.label)
            .field("data_source", &self.data_source.id())
            .field("traits", &self.trait_names)
            .field("has_template", &self.has_template())
            .finish()
    }
}
