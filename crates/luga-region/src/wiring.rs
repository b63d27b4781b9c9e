//! Declarative region wiring.
//!
//! Markup marks region nodes with attributes:
//!
//! ```html
//! <ul data-lugaregion="true"
//!     data-lugaregion-datasource="ladies"
//!     data-lugaregion-template-id="ladiesTemplate"
//!     data-lugaregion-traits="highlight, tooltip">
//! </ul>
//! ```
//!
//! Without `data-lugaregion-template-id` or `data-lugaregion-template-src`
//! the node's own content is its template. A region node nested in another
//! region node is skipped: the outer template owns that markup.
//!
//! Regions observe their sources weakly; the caller keeps the returned
//! handles alive for as long as the regions should update.

use std::rc::Rc;

use crate::dom::NodeId;
use crate::error::{RegionError, Result};
use crate::region::{NodeRef, Region, RegionEnv, RegionOptions, SourceRef, TemplateSource};

pub const ATTR_REGION: &str = "data-lugaregion";
pub const ATTR_DATA_SOURCE: &str = "data-lugaregion-datasource";
pub const ATTR_TEMPLATE_ID: &str = "data-lugaregion-template-id";
pub const ATTR_TEMPLATE_SRC: &str = "data-lugaregion-template-src";
pub const ATTR_TRAITS: &str = "data-lugaregion-traits";

/// Options described by the attributes of a region node.
pub fn region_options(node: NodeId, env: &RegionEnv) -> Result<RegionOptions> {
    let dom = &env.dom;
    let data_source = dom
        .attribute(node, ATTR_DATA_SOURCE)
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RegionError::MissingAttribute {
            node: dom.describe(node),
            attribute: ATTR_DATA_SOURCE.to_owned(),
        })?;

    let template = match (
        dom.attribute(node, ATTR_TEMPLATE_ID),
        dom.attribute(node, ATTR_TEMPLATE_SRC),
    ) {
        (Some(id), _) => Some(TemplateSource::ElementId(id.trim().to_owned())),
        (None, Some(url)) => Some(TemplateSource::Url(url.trim().to_owned())),
        (None, None) => None,
    };

    let traits = dom
        .attribute(node, ATTR_TRAITS)
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(RegionOptions {
        node: NodeRef::Node(node),
        data_source: SourceRef::Id(data_source),
        template,
        traits,
    })
}

/// Build a [`Region`] for every region node under `root` (and `root`
/// itself), in document order.
///
/// Stops at the first node that fails; regions built before it are dropped.
pub fn wire_regions(root: NodeId, env: &RegionEnv) -> Result<Vec<Rc<Region>>> {
    let dom = &env.dom;
    let mut candidates = Vec::new();
    if dom.attribute(root, ATTR_REGION).is_some() {
        candidates.push(root);
    }
    candidates.extend(dom.descendants_with_attribute(root, ATTR_REGION));

    let mut outermost: Vec<NodeId> = Vec::with_capacity(candidates.len());
    for node in candidates {
        let nested = outermost
            .iter()
            .any(|outer| dom.descendants_with_attribute(*outer, ATTR_REGION).contains(&node));
        if nested {
            tracing::debug!(node = %dom.describe(node), "skipping nested region node");
        } else {
            outermost.push(node);
        }
    }

    let mut regions = Vec::with_capacity(outermost.len());
    for node in outermost {
        let options = region_options(node, env)?;
        regions.push(Region::new(options, env)?);
    }
    tracing::debug!(count = regions.len(), "regions wired");
    Ok(regions)
}
