//! The DOM seam used by regions, plus a headless implementation.
//!
//! [`Dom`] is the handful of operations a region needs: locate a node,
//! read and replace its content, read attributes, toggle classes and bind
//! click handlers. [`MemoryDom`] implements it over an in-memory element
//! tree parsed with `roxmltree`, for tests and host-driven embeddings.
//!
//! # Invariants
//!
//! 1. Click handlers are keyed per element: binding a key that is already
//!    bound replaces the previous handler instead of adding a second one.
//! 2. Replacing a node's content detaches its old descendants; they are no
//!    longer reachable from the root.
//! 3. No borrow of the tree is held while a click handler runs, so handlers
//!    may mutate the DOM.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{RegionError, Result};

/// Opaque element handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Click callback.
pub type ClickHandler = Rc<dyn Fn()>;

/// DOM operations needed by regions and traits.
pub trait Dom {
    /// Element whose `id` attribute is `id`.
    fn find_by_id(&self, id: &str) -> Option<NodeId>;

    /// Inner markup of `node`.
    fn content(&self, node: NodeId) -> String;

    /// Replace the inner markup of `node`.
    fn set_content(&self, node: NodeId, markup: &str) -> Result<()>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Descendants of `node` (excluding `node`) carrying attribute `name`,
    /// in document order.
    fn descendants_with_attribute(&self, node: NodeId, name: &str) -> Vec<NodeId>;

    fn add_class(&self, node: NodeId, class: &str);

    fn remove_class(&self, node: NodeId, class: &str);

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Bind `handler` under `key`, replacing any handler with the same key.
    fn bind_click(&self, node: NodeId, key: &str, handler: ClickHandler);

    fn unbind_click(&self, node: NodeId, key: &str);

    /// Human-readable label for logs and events.
    fn describe(&self, node: NodeId) -> String {
        self.attribute(node, "id")
            .map_or_else(|| format!("node#{}", node.0), |id| format!("#{id}"))
    }
}

// ---------------------------------------------------------------------------
// MemoryDom
// ---------------------------------------------------------------------------

enum Child {
    Element(NodeId),
    Text(String),
}

struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Child>,
    clicks: Vec<(String, ClickHandler)>,
}

impl Element {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            clicks: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: String) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_owned(), value)),
        }
    }
}

fn escape_markup(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

const FRAGMENT_ROOT: &str = "luga-fragment";

/// Headless, deterministic [`Dom`].
pub struct MemoryDom {
    nodes: RefCell<Vec<Element>>,
    root: NodeId,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// An empty document with a `body` root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![Element::new("body")]),
            root: NodeId(0),
        }
    }

    /// A document whose body holds `markup`.
    pub fn parse(markup: &str) -> Result<Self> {
        let dom = Self::new();
        dom.set_content(dom.root, markup)?;
        Ok(dom)
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn import(&self, source: roxmltree::Node<'_, '_>) -> Vec<Child> {
        let mut children = Vec::new();
        for child in source.children() {
            if child.is_element() {
                let mut element = Element::new(child.tag_name().name());
                for attr in child.attributes() {
                    element.set_attribute(attr.name(), attr.value().to_owned());
                }
                let grand_children = self.import(child);
                element.children = grand_children;
                let mut nodes = self.nodes.borrow_mut();
                nodes.push(element);
                children.push(Child::Element(NodeId(nodes.len() - 1)));
            } else if let Some(text) = child.text().filter(|_| child.is_text()) {
                children.push(Child::Text(text.to_owned()));
            }
        }
        children
    }

    fn walk(&self, from: NodeId, visit: &mut dyn FnMut(NodeId, &Element)) {
        let nodes = self.nodes.borrow();
        let mut stack: Vec<NodeId> = Vec::new();
        if let Some(element) = nodes.get(from.0) {
            stack.extend(element.children.iter().rev().filter_map(|c| match c {
                Child::Element(id) => Some(*id),
                Child::Text(_) => None,
            }));
        }
        while let Some(id) = stack.pop() {
            let Some(element) = nodes.get(id.0) else { continue };
            visit(id, element);
            stack.extend(element.children.iter().rev().filter_map(|c| match c {
                Child::Element(id) => Some(*id),
                Child::Text(_) => None,
            }));
        }
    }

    /// Concatenated text of `node` and its descendants.
    #[must_use]
    pub fn text(&self, node: NodeId) -> String {
        fn collect(nodes: &[Element], node: NodeId, out: &mut String) {
            let Some(element) = nodes.get(node.0) else {
                return;
            };
            for child in &element.children {
                match child {
                    Child::Text(text) => out.push_str(text),
                    Child::Element(id) => collect(nodes, *id, out),
                }
            }
        }
        let mut out = String::new();
        collect(&self.nodes.borrow(), node, &mut out);
        out
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow().get(node.0).map(|e| e.tag.clone())
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.nodes.borrow_mut().get_mut(node.0) {
            element.set_attribute(name, value.into());
        }
    }

    /// Element children of `node`.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|e| {
                e.children
                    .iter()
                    .filter_map(|c| match c {
                        Child::Element(id) => Some(*id),
                        Child::Text(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Descendants of `node` with tag `tag`, in document order.
    #[must_use]
    pub fn descendants_by_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(node, &mut |id, element| {
            if element.tag == tag {
                found.push(id);
            }
        });
        found
    }

    /// Number of click handlers bound on `node`.
    #[must_use]
    pub fn click_handler_count(&self, node: NodeId) -> usize {
        self.nodes.borrow().get(node.0).map_or(0, |e| e.clicks.len())
    }

    /// Simulate a click on `node`. Returns the number of handlers run.
    pub fn click(&self, node: NodeId) -> usize {
        let handlers: Vec<ClickHandler> = self
            .nodes
            .borrow()
            .get(node.0)
            .map(|e| e.clicks.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default();
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }
}

fn write_children(nodes: &[Element], node: NodeId, out: &mut String) {
    let Some(element) = nodes.get(node.0) else {
        return;
    };
    for child in &element.children {
        match child {
            Child::Text(text) => out.push_str(&escape_markup(text, false)),
            Child::Element(id) => {
                let Some(el) = nodes.get(id.0) else { continue };
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_markup(value, true));
                    out.push('"');
                }
                if el.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    write_children(nodes, *id, out);
                    out.push_str("</");
                    out.push_str(&el.tag);
                    out.push('>');
                }
            }
        }
    }
}

impl Dom for MemoryDom {
    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let mut found = None;
        self.walk(self.root, &mut |node, element| {
            if found.is_none() && element.attribute("id") == Some(id) {
                found = Some(node);
            }
        });
        found
    }

    fn content(&self, node: NodeId) -> String {
        let mut out = String::new();
        write_children(&self.nodes.borrow(), node, &mut out);
        out
    }

    fn set_content(&self, node: NodeId, markup: &str) -> Result<()> {
        if self.nodes.borrow().get(node.0).is_none() {
            return Err(RegionError::NodeNotFound(format!("node#{}", node.0)));
        }
        let wrapped = format!("<{FRAGMENT_ROOT}>{markup}</{FRAGMENT_ROOT}>");
        let doc = roxmltree::Document::parse(&wrapped)
            .map_err(|err| RegionError::Markup(err.to_string()))?;
        let children = self.import(doc.root_element());
        if let Some(element) = self.nodes.borrow_mut().get_mut(node.0) {
            element.children = children;
        }
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0)
            .and_then(|e| e.attribute(name))
            .map(str::to_owned)
    }

    fn descendants_with_attribute(&self, node: NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(node, &mut |id, element| {
            if element.attribute(name).is_some() {
                found.push(id);
            }
        });
        found
    }

    fn add_class(&self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        if let Some(element) = self.nodes.borrow_mut().get_mut(node.0) {
            let value = match element.attribute("class") {
                Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
                _ => class.to_owned(),
            };
            element.set_attribute("class", value);
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(element) = self.nodes.borrow_mut().get_mut(node.0) {
            if let Some(existing) = element.attribute("class") {
                let value = existing
                    .split_whitespace()
                    .filter(|c| *c != class)
                    .collect::<Vec<_>>()
                    .join(" ");
                element.set_attribute("class", value);
            }
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .borrow()
            .get(node.0)
            .and_then(|e| e.attribute("class"))
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn bind_click(&self, node: NodeId, key: &str, handler: ClickHandler) {
        if let Some(element) = self.nodes.borrow_mut().get_mut(node.0) {
            match element.clicks.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => *existing = handler,
                None => element.clicks.push((key.to_owned(), handler)),
            }
        }
    }

    fn unbind_click(&self, node: NodeId, key: &str) {
        if let Some(element) = self.nodes.borrow_mut().get_mut(node.0) {
            element.clicks.retain(|(k, _)| k != key);
        }
    }
}

impl std::fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDom")
            .field("nodes", &self.nodes.borrow().len())
            .field("content", &self.content(self.root))
            .finish()
    }
}
