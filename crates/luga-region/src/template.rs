//! Templates: compiled functions from a [`Context`] to markup.
//!
//! A region only needs [`TemplateEngine::compile`]; any engine can be
//! plugged in. [`PlaceholderEngine`] is the built-in one:
//!
//! - `{path}` inserts the scalar at a dotted path, HTML-escaped
//! - `{#path}...{/path}` repeats its body for each element of an array,
//!   renders it once for an object or a truthy scalar, and skips it
//!   otherwise
//! - `{^path}...{/path}` renders its body only when `{#path}` would not
//! - `{.}` is the current section item
//!
//! Lookups inside a section try the item first, then the enclosing scopes.

use std::rc::Rc;

use luga_data::Context;
use luga_data::placeholder::scalar_text;
use luga_data::record::lookup_path;
use serde_json::Value;

use crate::error::{RegionError, Result};

/// A compiled template.
pub type Template = Rc<dyn Fn(&Context) -> String>;

/// Compiles template source into a [`Template`].
pub trait TemplateEngine {
    fn compile(&self, source: &str) -> Result<Template>;
}

/// Wrap a closure as a [`Template`].
pub fn template_fn(render: impl Fn(&Context) -> String + 'static) -> Template {
    Rc::new(render)
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Value(String),
    Section {
        path: String,
        inverted: bool,
        body: Vec<Node>,
    },
}

/// The built-in `{path}` / `{#section}` engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEngine;

impl PlaceholderEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for PlaceholderEngine {
    fn compile(&self, source: &str) -> Result<Template> {
        let nodes = Rc::new(parse(source)?);
        Ok(Rc::new(move |context: &Context| {
            let root = Value::Object(context.as_map().clone());
            let mut out = String::new();
            render_nodes(&nodes, &mut vec![&root], &mut out);
            out
        }))
    }
}

struct Frame {
    path: String,
    inverted: bool,
    nodes: Vec<Node>,
}

fn parse(source: &str) -> Result<Vec<Node>> {
    let mut stack = vec![Frame {
        path: String::new(),
        inverted: false,
        nodes: Vec::new(),
    }];
    let mut text = String::new();
    let mut chars = source.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            text.push(ch);
            continue;
        }
        let mut token = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            token.push(c);
        }
        if !closed {
            text.push('{');
            text.push_str(&token);
            continue;
        }

        let top = stack.len() - 1;
        if !text.is_empty() {
            stack[top].nodes.push(Node::Text(std::mem::take(&mut text)));
        }
        let token = token.trim();
        if let Some(path) = token.strip_prefix('#').or_else(|| token.strip_prefix('^')) {
            stack.push(Frame {
                path: path.trim().to_owned(),
                inverted: token.starts_with('^'),
                nodes: Vec::new(),
            });
        } else if let Some(path) = token.strip_prefix('/') {
            let path = path.trim();
            if stack.len() == 1 {
                return Err(RegionError::Template(format!(
                    "closing tag '{{/{path}}}' without an open section"
                )));
            }
            let frame = stack.pop().ok_or_else(|| RegionError::Template("empty scope".into()))?;
            if frame.path != path {
                return Err(RegionError::Template(format!(
                    "section '{}' closed by '{{/{path}}}'",
                    frame.path
                )));
            }
            let top = stack.len() - 1;
            stack[top].nodes.push(Node::Section {
                path: frame.path,
                inverted: frame.inverted,
                body: frame.nodes,
            });
        } else {
            stack[top].nodes.push(Node::Value(token.to_owned()));
        }
    }

    if stack.len() > 1 {
        let open = stack.last().map(|f| f.path.clone()).unwrap_or_default();
        return Err(RegionError::Template(format!("section '{open}' is never closed")));
    }
    let mut root = stack.pop().map(|f| f.nodes).unwrap_or_default();
    if !text.is_empty() {
        root.push(Node::Text(text));
    }
    Ok(root)
}

fn lookup<'a>(scopes: &[&'a Value], path: &str) -> Option<&'a Value> {
    let innermost = scopes.last().copied();
    if path == "." {
        return innermost;
    }
    scopes.iter().rev().find_map(|scope| lookup_path(*scope, path))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn render_nodes<'a>(nodes: &'a [Node], scopes: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Value(path) => {
                if let Some(text) = lookup(scopes, path).and_then(scalar_text) {
                    out.push_str(&v_htmlescape::escape(&text).to_string());
                }
            }
            Node::Section {
                path,
                inverted,
                body,
            } => {
                let value = lookup(scopes, path);
                let shown = value.is_some_and(truthy);
                if *inverted {
                    if !shown {
                        render_nodes(body, scopes, out);
                    }
                    continue;
                }
                match value {
                    Some(Value::Array(items)) => {
                        for item in items {
                            scopes.push(item);
                            render_nodes(body, scopes, out);
                            scopes.pop();
                        }
                    }
                    Some(object @ Value::Object(_)) => {
                        scopes.push(object);
                        render_nodes(body, scopes, out);
                        scopes.pop();
                    }
                    Some(_) if shown => render_nodes(body, scopes, out),
                    _ => {}
                }
            }
        }
    }
}
