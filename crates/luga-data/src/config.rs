//! Declarative data-source configuration (feature `config`).
//!
//! Sources are declared as an ordered list, in TOML or JSON:
//!
//! ```toml
//! [[source]]
//! id = "ladies"
//! kind = "json"
//! url = "data/ladies.json"
//! path = "ladies"
//! cache = false
//!
//! [[source]]
//! id = "ladiesDetail"
//! kind = "detail"
//! parent = "ladies"
//! ```
//!
//! [`SourcesConfig::build`] constructs each source and registers it, in
//! declaration order.
//!
//! # Failure Modes
//!
//! - Malformed input, an unknown `kind` or an unknown key:
//!   `DataError::Config`.
//! - A derived source whose parent is not declared before it:
//!   `DataError::Config`.
//! - A duplicate id: `DataError::DuplicateId` from the registry. Sources
//!   built before the failure stay registered.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::child::ChildDataSet;
use crate::dataset::DataSet;
use crate::detail::DetailSet;
use crate::error::{DataError, Result};
use crate::format::RecordFormat;
use crate::http::{HttpDataSet, HttpOptions};
use crate::paged::PagedView;
use crate::registry::Registry;
use crate::source::{DataSource, RecordSet};
use crate::transport::Transport;

/// Kind of a declared source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// In-memory records given inline.
    #[default]
    Static,
    Json,
    Xml,
    Tsv,
    Rss2,
    Detail,
    Paged,
    Child,
}

/// One declared source. Which keys apply depends on `kind`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub id: String,
    pub kind: SourceKind,
    /// Fetch URL (`json`, `xml`, `tsv`, `rss2`).
    pub url: Option<String>,
    /// Record path (`json`, `xml`, and `child` with those formats).
    pub path: Option<String>,
    /// Parent id (`detail`, `paged`, `child`).
    pub parent: Option<String>,
    /// URL template with `{field}` placeholders (`child`).
    pub url_template: Option<String>,
    /// Response format of a `child` source; `json` when absent.
    pub format: Option<SourceKind>,
    /// Page size (`paged`).
    pub page_size: Option<usize>,
    /// Inline records (`static`).
    pub records: Vec<Value>,
    pub timeout_ms: Option<u64>,
    pub cache: Option<bool>,
    pub incremental_load: Option<bool>,
    pub headers: BTreeMap<String, String>,
}

/// An ordered list of source declarations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    #[serde(rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl SourcesConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|err| DataError::Config(err.to_string()))
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|err| DataError::Config(err.to_string()))
    }

    /// Build and register every declared source. Returns the ids built.
    pub fn build(&self, registry: &Registry, transport: Rc<dyn Transport>) -> Result<Vec<String>> {
        let mut built = Built::default();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(DataError::Config("a source is missing its id".into()));
            }
            let (any, records) = source.build(&built, &transport)?;
            registry.register(Rc::clone(&any))?;
            tracing::debug!(source = %source.id, kind = ?source.kind, "configured data source");
            built.sources.insert(source.id.clone(), any);
            if let Some(records) = records {
                built.record_sets.insert(source.id.clone(), records);
            }
            built.order.push(source.id.clone());
        }
        Ok(built.order)
    }
}

#[derive(Default)]
struct Built {
    sources: HashMap<String, Rc<dyn DataSource>>,
    record_sets: HashMap<String, Rc<dyn RecordSet>>,
    order: Vec<String>,
}

type Pair = (Rc<dyn DataSource>, Option<Rc<dyn RecordSet>>);

fn record_pair<T: RecordSet + 'static>(source: Rc<T>) -> Pair {
    let any: Rc<dyn DataSource> = source.clone();
    let records: Rc<dyn RecordSet> = source;
    (any, Some(records))
}

impl SourceConfig {
    fn options(&self) -> HttpOptions {
        let defaults = HttpOptions::default();
        HttpOptions {
            timeout: self
                .timeout_ms
                .map(Duration::from_millis)
                .or(defaults.timeout),
            cache: self.cache.unwrap_or(defaults.cache),
            incremental_load: self.incremental_load.unwrap_or(defaults.incremental_load),
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    fn record_format(&self, kind: SourceKind) -> Result<RecordFormat> {
        Ok(match kind {
            SourceKind::Json => RecordFormat::Json {
                path: self.path.clone(),
            },
            SourceKind::Xml => RecordFormat::Xml {
                path: self.path.clone(),
            },
            SourceKind::Tsv => RecordFormat::Tsv,
            SourceKind::Rss2 => RecordFormat::Rss2,
            other => {
                return Err(DataError::Config(format!(
                    "source '{}': {other:?} is not a response format",
                    self.id
                )));
            }
        })
    }

    fn http(&self, format: RecordFormat, transport: &Rc<dyn Transport>) -> Rc<HttpDataSet> {
        let mut builder = HttpDataSet::builder(self.id.clone(), format).options(self.options());
        if let Some(url) = &self.url {
            builder = builder.url(url.clone());
        }
        builder.build(Rc::clone(transport))
    }

    fn required<'a>(&self, value: Option<&'a String>, key: &str) -> Result<&'a str> {
        value.map(String::as_str).ok_or_else(|| {
            DataError::Config(format!(
                "source '{}' of kind {:?} requires '{key}'",
                self.id, self.kind
            ))
        })
    }

    fn record_parent(&self, built: &Built) -> Result<Rc<dyn RecordSet>> {
        let parent = self.required(self.parent.as_ref(), "parent")?;
        built.record_sets.get(parent).cloned().ok_or_else(|| {
            DataError::Config(format!(
                "parent '{parent}' of '{}' must be declared earlier as a record source",
                self.id
            ))
        })
    }

    fn build(&self, built: &Built, transport: &Rc<dyn Transport>) -> Result<Pair> {
        match self.kind {
            SourceKind::Static => {
                let ds = Rc::new(DataSet::new(self.id.clone()));
                if !self.records.is_empty() {
                    ds.insert_value(Value::Array(self.records.clone()))?;
                }
                Ok(record_pair(ds))
            }
            SourceKind::Json | SourceKind::Xml | SourceKind::Tsv | SourceKind::Rss2 => {
                let ds = self.http(self.record_format(self.kind)?, transport);
                Ok(record_pair(ds))
            }
            SourceKind::Detail => {
                let detail: Rc<dyn DataSource> =
                    DetailSet::new(self.id.clone(), self.record_parent(built)?);
                Ok((detail, None))
            }
            SourceKind::Paged => {
                let parent = self.required(self.parent.as_ref(), "parent")?;
                let parent = built.sources.get(parent).cloned().ok_or_else(|| {
                    DataError::Config(format!(
                        "parent '{parent}' of '{}' must be declared earlier",
                        self.id
                    ))
                })?;
                let view: Rc<dyn DataSource> =
                    PagedView::new(self.id.clone(), parent, self.page_size)?;
                Ok((view, None))
            }
            SourceKind::Child => {
                let parent = self.record_parent(built)?;
                let template = self.required(self.url_template.as_ref(), "url_template")?;
                let format = self.record_format(self.format.unwrap_or(SourceKind::Json))?;
                let child = ChildDataSet::new(self.http(format, transport), parent, template);
                Ok(record_pair(child))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    const TOML: &str = r#"
[[source]]
id = "ladies"
kind = "json"
url = "data/ladies.json"
path = "ladies"
cache = false
timeout_ms = 2500
headers = { Accept = "application/json" }

[[source]]
id = "ladiesDetail"
kind = "detail"
parent = "ladies"

[[source]]
id = "ladiesPaged"
kind = "paged"
parent = "ladies"
page_size = 3

[[source]]
id = "colors"
kind = "static"
records = [{ name = "red" }, { name = "green" }]

[[source]]
id = "states"
kind = "json"
url = "data/states.json"

[[source]]
id = "stateDetail"
kind = "child"
parent = "states"
url_template = "data/states/{abbreviation}.json"
"#;

    fn transport() -> Rc<dyn Transport> {
        Rc::new(MockTransport::new())
    }

    #[test]
    fn toml_builds_in_order() {
        let config = SourcesConfig::from_toml_str(TOML).unwrap();
        assert_eq!(config.sources.len(), 6);
        assert_eq!(config.sources[0].options().timeout, Some(Duration::from_millis(2500)));
        assert!(!config.sources[0].options().cache);

        let registry = Registry::new();
        let ids = config.build(&registry, transport()).unwrap();
        assert_eq!(
            ids,
            vec!["ladies", "ladiesDetail", "ladiesPaged", "colors", "states", "stateDetail"]
        );
        assert_eq!(registry.ids(), ids);
        assert_eq!(registry.lookup("colors").unwrap().records_count(), 2);
    }

    #[test]
    fn json_config_is_accepted() {
        let json = r#"{"source": [{"id": "feed", "kind": "rss2", "url": "feed.xml"}]}"#;
        let config = SourcesConfig::from_json_str(json).unwrap();
        assert_eq!(config.sources[0].kind, SourceKind::Rss2);
    }

    #[test]
    fn parent_must_be_declared_first() {
        let toml = r#"
[[source]]
id = "detail"
kind = "detail"
parent = "later"

[[source]]
id = "later"
"#;
        let config = SourcesConfig::from_toml_str(toml).unwrap();
        let err = config.build(&Registry::new(), transport()).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }

    #[test]
    fn unknown_kind_and_keys_are_rejected() {
        assert!(SourcesConfig::from_toml_str("[[source]]\nid = \"x\"\nkind = \"csv\"").is_err());
        assert!(SourcesConfig::from_toml_str("[[source]]\nid = \"x\"\ncolour = 1").is_err());
    }

    #[test]
    fn missing_keys_are_config_errors() {
        let config = SourcesConfig::from_toml_str(
            "[[source]]\nid = \"s\"\n\n[[source]]\nid = \"c\"\nkind = \"child\"\nparent = \"s\"",
        )
        .unwrap();
        let err = config.build(&Registry::new(), transport()).unwrap_err();
        assert!(matches!(err, DataError::Config(msg) if msg.contains("url_template")));
    }

    #[test]
    fn duplicate_ids_fail_at_registration() {
        let config =
            SourcesConfig::from_toml_str("[[source]]\nid = \"a\"\n\n[[source]]\nid = \"a\"").unwrap();
        let registry = Registry::new();
        let err = config.build(&registry, transport()).unwrap_err();
        assert_eq!(err, DataError::DuplicateId("a".into()));
        assert!(registry.contains("a"));
    }
}
