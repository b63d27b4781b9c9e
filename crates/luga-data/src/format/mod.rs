//! Record extraction for HTTP response bodies.
//!
//! Each [`RecordFormat`] turns a body into zero or more records plus a
//! format-specific [`RawPayload`] kept by the owning source. Extraction is
//! pure: it never touches a data set, so a parse failure leaves the
//! existing records untouched.

mod json;
mod rss;
mod tsv;
mod xml;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::record::Record;

pub use rss::{CHANNEL_TAGS, ITEM_TAGS};
pub use xml::XmlPath;

/// How records are located inside a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFormat {
    /// JSON body; `path` is a dotted lookup (`"data.items"`).
    Json { path: Option<String> },
    /// XML body; `path` is a small path expression (`/root/item`, `//item`).
    Xml { path: Option<String> },
    /// Tab-separated values with a header line.
    Tsv,
    /// RSS 2.0 feed.
    Rss2,
}

impl RecordFormat {
    #[must_use]
    pub fn json() -> Self {
        Self::Json { path: None }
    }

    #[must_use]
    pub fn json_at(path: impl Into<String>) -> Self {
        Self::Json {
            path: Some(path.into()),
        }
    }

    #[must_use]
    pub fn xml() -> Self {
        Self::Xml { path: None }
    }

    #[must_use]
    pub fn xml_at(path: impl Into<String>) -> Self {
        Self::Xml {
            path: Some(path.into()),
        }
    }

    /// Short lowercase name, as used in configuration and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Json { .. } => "json",
            Self::Xml { .. } => "xml",
            Self::Tsv => "tsv",
            Self::Rss2 => "rss2",
        }
    }

    /// Parse `body` into records.
    pub fn extract(&self, body: &str) -> Result<Extracted> {
        match self {
            Self::Json { path } => json::extract(body, path.as_deref()),
            Self::Xml { path } => xml::extract(body, path.as_deref()),
            Self::Tsv => tsv::extract(body),
            Self::Rss2 => rss::extract(body),
        }
    }
}

/// Output of [`RecordFormat::extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// `None` when nothing should be inserted at all (unmatched JSON path).
    pub records: Option<Vec<Record>>,
    pub raw: RawPayload,
}

/// The parsed body, kept alongside the records.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawPayload {
    #[default]
    None,
    Json(Value),
    Xml(String),
    Rss { channel: Map<String, Value> },
}
