//! Region traits: row-interaction behaviours re-applied after each render.
//!
//! A trait receives the region node, its data source and the DOM. The four
//! built-ins scan the node for marker attributes:
//!
//! | trait           | attribute                      | click does                    |
//! |-----------------|--------------------------------|-------------------------------|
//! | `select`        | `data-lugaregion-select`       | moves the CSS class           |
//! | `set_row_id`    | `data-lugaregion-setrowid`     | `set_current_row_id(value)`   |
//! | `set_row_index` | `data-lugaregion-setrowindex`  | `set_current_row_index(value)`|
//! | `sort`          | `data-lugaregion-sortcol`      | toggles a sort on the columns |
//!
//! # Invariants
//!
//! 1. Re-applying a trait never accumulates handlers: every binding uses
//!    the trait name as its click key.
//! 2. Handlers hold the data source weakly; a click after the source is
//!    dropped does nothing.
//!
//! # Failure Modes
//!
//! - A click whose attribute value cannot be used (bad row id, index out of
//!   range) is logged with `warn!` and leaves the source untouched.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use luga_data::{DataSource, PK_KEY, RowId, SortOrder};
use serde_json::Value;

use crate::dom::{Dom, NodeId};
use crate::error::{RegionError, Result};

pub const SELECT: &str = "select";
pub const SET_ROW_ID: &str = "set_row_id";
pub const SET_ROW_INDEX: &str = "set_row_index";
pub const SORT: &str = "sort";

/// Built-in trait names, in application order.
pub const DEFAULT_TRAITS: [&str; 4] = [SELECT, SET_ROW_ID, SET_ROW_INDEX, SORT];

pub const ATTR_SELECT: &str = "data-lugaregion-select";
pub const ATTR_SET_ROW_ID: &str = "data-lugaregion-setrowid";
pub const ATTR_SET_ROW_INDEX: &str = "data-lugaregion-setrowindex";
pub const ATTR_SORT_COLUMN: &str = "data-lugaregion-sortcol";

/// What a trait is applied to.
pub struct TraitContext<'a> {
    pub node: NodeId,
    pub data_source: &'a Rc<dyn DataSource>,
    pub dom: &'a Rc<dyn Dom>,
}

/// A trait implementation.
pub type RegionTrait = Rc<dyn Fn(&TraitContext<'_>) -> Result<()>>;

/// Name-to-implementation lookup for traits.
pub struct TraitRegistry {
    traits: RefCell<HashMap<String, RegionTrait>>,
}

impl Default for TraitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TraitRegistry {
    /// A registry holding the four built-ins.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(SELECT, select);
        registry.register(SET_ROW_ID, set_row_id);
        registry.register(SET_ROW_INDEX, set_row_index);
        registry.register(SORT, sort);
        registry
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            traits: RefCell::new(HashMap::new()),
        }
    }

    /// Register `name`, replacing any previous implementation.
    pub fn register(
        &self,
        name: impl Into<String>,
        apply: impl Fn(&TraitContext<'_>) -> Result<()> + 'static,
    ) {
        self.traits.borrow_mut().insert(name.into(), Rc::new(apply));
    }

    pub fn resolve(&self, name: &str) -> Result<RegionTrait> {
        self.traits
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RegionError::UnknownTrait(name.to_owned()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.traits.borrow().contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.traits.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply `names` in order. The first unknown name stops the run.
    pub fn apply(&self, names: &[String], cx: &TraitContext<'_>) -> Result<()> {
        for name in names {
            let apply = self.resolve(name)?;
            apply(cx)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TraitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitRegistry")
            .field("names", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

/// Position of the cursor among the rows the source renders.
fn rendered_cursor(data_source: &dyn DataSource) -> Option<usize> {
    let current = data_source.current_row_id()?;
    let matches = |value: &Value| {
        value
            .get(PK_KEY)
            .and_then(Value::as_str)
            .and_then(|key| key.parse::<RowId>().ok())
            == Some(current)
    };
    let context = data_source.context();
    if let Some(entity) = context.entity() {
        return matches(&Value::Object(entity.clone())).then_some(0);
    }
    context.entities().iter().position(matches)
}

fn bind_each(
    cx: &TraitContext<'_>,
    attribute: &str,
    key: &'static str,
    on_click: impl Fn(&dyn DataSource, &str) -> luga_data::Result<()> + 'static,
) {
    let on_click = Rc::new(on_click);
    for target in cx.dom.descendants_with_attribute(cx.node, attribute) {
        let Some(value) = cx.dom.attribute(target, attribute) else {
            continue;
        };
        let source: Weak<dyn DataSource> = Rc::downgrade(cx.data_source);
        let on_click = Rc::clone(&on_click);
        cx.dom.bind_click(
            target,
            key,
            Rc::new(move || {
                let Some(source) = source.upgrade() else {
                    return;
                };
                if let Err(err) = on_click(&*source, &value) {
                    tracing::warn!(source = %source.id(), trait_name = key, %value, %err, "region trait click failed");
                }
            }),
        );
    }
}

/// Mark the node of the current row with the attribute's CSS class and move
/// the class on click.
pub fn select(cx: &TraitContext<'_>) -> Result<()> {
    let nodes = cx.dom.descendants_with_attribute(cx.node, ATTR_SELECT);
    let Some(first) = nodes.first() else {
        return Ok(());
    };
    let Some(class) = cx.dom.attribute(*first, ATTR_SELECT) else {
        return Ok(());
    };
    for node in &nodes {
        cx.dom.remove_class(*node, &class);
    }
    if let Some(node) = rendered_cursor(cx.data_source.as_ref()).and_then(|i| nodes.get(i)) {
        cx.dom.add_class(*node, &class);
    }

    let nodes = Rc::new(nodes);
    for node in nodes.iter().copied() {
        let dom = Rc::downgrade(cx.dom);
        let siblings = Rc::clone(&nodes);
        let class = class.clone();
        cx.dom.bind_click(
            node,
            SELECT,
            Rc::new(move || {
                let Some(dom) = dom.upgrade() else { return };
                for sibling in siblings.iter() {
                    dom.remove_class(*sibling, &class);
                }
                dom.add_class(node, &class);
            }),
        );
    }
    Ok(())
}

/// Clicking sets the current row to the attribute's row id.
pub fn set_row_id(cx: &TraitContext<'_>) -> Result<()> {
    bind_each(cx, ATTR_SET_ROW_ID, SET_ROW_ID, |source, value| {
        let row_id: RowId = value.parse()?;
        source.set_current_row_id(Some(row_id))
    });
    Ok(())
}

/// Clicking sets the current row to the attribute's index.
pub fn set_row_index(cx: &TraitContext<'_>) -> Result<()> {
    bind_each(cx, ATTR_SET_ROW_INDEX, SET_ROW_INDEX, |source, value| {
        let index = value.trim().parse::<usize>().map_err(|err| {
            luga_data::DataError::Parse {
                format: "row index",
                reason: format!("'{value}': {err}"),
            }
        })?;
        source.set_current_row_index(index)
    });
    Ok(())
}

/// Clicking toggles a sort on the attribute's comma-separated columns.
pub fn sort(cx: &TraitContext<'_>) -> Result<()> {
    bind_each(cx, ATTR_SORT_COLUMN, SORT, |source, value| {
        let columns: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();
        source.sort(&columns, SortOrder::Toggle)
    });
    Ok(())
}
