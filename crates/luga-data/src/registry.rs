//! Explicit registry of data sources, keyed by id.
//!
//! One registry is created per application session and handed to whatever
//! needs to resolve sources by id (regions, declarative wiring, config).
//! Tests create their own and [`clear`](Registry::clear) it between cases.
//!
//! # Invariants
//!
//! 1. Ids are unique: registering an id twice fails and leaves the first
//!    registration in place.
//! 2. [`ids`](Registry::ids) reports registration order.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{DataError, Result};
use crate::source::DataSource;

#[derive(Default)]
struct Entries {
    by_id: HashMap<String, Rc<dyn DataSource>>,
    order: Vec<String>,
}

/// Id → source map shared by reference.
#[derive(Default)]
pub struct Registry {
    entries: RefCell<Entries>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under its own id.
    pub fn register(&self, source: Rc<dyn DataSource>) -> Result<()> {
        let id = source.id().to_owned();
        let mut entries = self.entries.borrow_mut();
        if entries.by_id.contains_key(&id) {
            return Err(DataError::DuplicateId(id));
        }
        tracing::debug!(source = %id, "data source registered");
        entries.order.push(id.clone());
        entries.by_id.insert(id, source);
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Rc<dyn DataSource>> {
        self.entries.borrow().by_id.get(id).cloned()
    }

    /// Like [`lookup`](Self::lookup), failing with `UnknownSource`.
    pub fn resolve(&self, id: &str) -> Result<Rc<dyn DataSource>> {
        self.lookup(id)
            .ok_or_else(|| DataError::UnknownSource(id.to_owned()))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.borrow().by_id.contains_key(id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.entries.borrow().order.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return a registration.
    pub fn remove(&self, id: &str) -> Option<Rc<dyn DataSource>> {
        let mut entries = self.entries.borrow_mut();
        let source = entries.by_id.remove(id)?;
        entries.order.retain(|existing| existing != id);
        Some(source)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        let mut entries = self.entries.borrow_mut();
        entries.by_id.clear();
        entries.order.clear();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("ids", &self.ids()).finish()
    }
}
