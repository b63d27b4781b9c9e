//! XML extraction over `roxmltree`.
//!
//! Element to record conversion:
//!
//! - attributes become `_name` keys,
//! - text-only children without attributes become strings,
//! - other children become nested objects,
//! - repeated child names become arrays,
//! - non-blank text of a complex element is kept under `#text`.

use std::fmt;
use std::str::FromStr;

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use super::{Extracted, RawPayload};
use crate::error::{DataError, Result};
use crate::record::Record;

/// Key prefix for attributes.
pub const ATTRIBUTE_PREFIX: char = '_';

/// Key for the text of an element that also has attributes or children.
pub const TEXT_KEY: &str = "#text";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    descendant: bool,
    name: String,
}

impl Step {
    fn matches(&self, node: Node<'_, '_>) -> bool {
        node.is_element() && (self.name == "*" || node.tag_name().name() == self.name)
    }
}

/// A location path over element names.
///
/// Supported: absolute child steps (`/a/b`), descendant steps (`//b`,
/// `/a//c`), the `*` wildcard, and relative paths, which start at the
/// document. The empty path and `/` select the document element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlPath {
    steps: Vec<Step>,
}

impl XmlPath {
    pub fn parse(path: &str) -> Result<Self> {
        let mut steps = Vec::new();
        let mut rest = path.trim();
        while !rest.is_empty() {
            let descendant = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                true
            } else {
                rest = rest.strip_prefix('/').unwrap_or(rest);
                false
            };
            let end = rest.find('/').unwrap_or(rest.len());
            let name = rest[..end].trim();
            rest = &rest[end..];
            if name.is_empty() {
                if descendant {
                    return Err(DataError::Parse {
                        format: "xml",
                        reason: format!("path '{path}' has an empty descendant step"),
                    });
                }
                continue;
            }
            if name.contains(['[', ']', '@', '(', ')']) {
                return Err(DataError::Parse {
                    format: "xml",
                    reason: format!("unsupported path expression '{path}'"),
                });
            }
            steps.push(Step {
                descendant,
                name: name.to_owned(),
            });
        }
        Ok(Self { steps })
    }

    /// Matching elements in document order.
    #[must_use]
    pub fn select<'a, 'input>(&self, doc: &'a Document<'input>) -> Vec<Node<'a, 'input>> {
        if self.steps.is_empty() {
            return vec![doc.root_element()];
        }
        let mut current = vec![doc.root()];
        for step in &self.steps {
            let mut next: Vec<Node<'a, 'input>> = Vec::new();
            for node in &current {
                if step.descendant {
                    next.extend(node.descendants().skip(1).filter(|n| step.matches(*n)));
                } else {
                    next.extend(node.children().filter(|n| step.matches(*n)));
                }
            }
            next.sort_by_key(|n| n.id().get());
            next.dedup_by_key(|n| n.id().get());
            current = next;
        }
        current
    }
}

impl FromStr for XmlPath {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for XmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("/");
        }
        for step in &self.steps {
            f.write_str(if step.descendant { "//" } else { "/" })?;
            f.write_str(&step.name)?;
        }
        Ok(())
    }
}

pub(super) fn parse_document<'a>(body: &'a str, format: &'static str) -> Result<Document<'a>> {
    Document::parse(body).map_err(|err| DataError::Parse {
        format,
        reason: err.to_string(),
    })
}

fn is_simple(node: Node<'_, '_>) -> bool {
    node.attributes().next().is_none() && !node.children().any(|c| c.is_element())
}

fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .collect::<String>()
        .trim()
        .to_owned()
}

pub(super) fn push_value(map: &mut Map<String, Value>, name: &str, value: Value) {
    match map.get_mut(name) {
        None => {
            map.insert(name.to_owned(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Convert one element into a JSON value.
pub(super) fn element_to_value(node: Node<'_, '_>) -> Value {
    if is_simple(node) {
        Value::String(text_of(node))
    } else {
        Value::Object(element_to_record(node))
    }
}

/// Convert one element into a record.
pub(super) fn element_to_record(node: Node<'_, '_>) -> Record {
    let mut map = Map::new();
    for attr in node.attributes() {
        map.insert(
            format!("{ATTRIBUTE_PREFIX}{}", attr.name()),
            Value::String(attr.value().to_owned()),
        );
    }
    for child in node.children().filter(Node::is_element) {
        push_value(&mut map, child.tag_name().name(), element_to_value(child));
    }
    let text = text_of(node);
    if !text.is_empty() {
        map.insert(TEXT_KEY.into(), Value::String(text));
    }
    map
}

pub(super) fn extract(body: &str, path: Option<&str>) -> Result<Extracted> {
    let path = XmlPath::parse(path.unwrap_or("/"))?;
    let doc = parse_document(body, "xml")?;
    let records = path
        .select(&doc)
        .into_iter()
        .map(element_to_record)
        .collect();
    Ok(Extracted {
        records: Some(records),
        raw: RawPayload::Xml(body.to_owned()),
    })
}
