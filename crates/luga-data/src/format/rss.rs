//! RSS 2.0 extraction: only allow-listed tags are read.

use serde_json::{Map, Value};

use super::xml::{element_to_value, parse_document, push_value};
use super::{Extracted, RawPayload};
use crate::error::{DataError, Result};
use crate::record::Record;

/// Channel-level elements kept as channel metadata.
pub const CHANNEL_TAGS: &[&str] = &[
    "title",
    "link",
    "description",
    "language",
    "copyright",
    "managingEditor",
    "webMaster",
    "pubDate",
    "lastBuildDate",
    "category",
    "generator",
    "docs",
    "cloud",
    "ttl",
    "image",
    "rating",
    "textInput",
    "skipHours",
    "skipDays",
];

/// Item-level elements kept on each record.
pub const ITEM_TAGS: &[&str] = &[
    "title",
    "link",
    "description",
    "author",
    "category",
    "comments",
    "enclosure",
    "guid",
    "pubDate",
    "source",
];

fn collect_allowed(node: roxmltree::Node<'_, '_>, allowed: &[&str]) -> Map<String, Value> {
    let mut map = Map::new();
    for child in node.children().filter(roxmltree::Node::is_element) {
        let name = child.tag_name().name();
        if allowed.contains(&name) {
            push_value(&mut map, name, element_to_value(child));
        }
    }
    map
}

pub(super) fn extract(body: &str) -> Result<Extracted> {
    let doc = parse_document(body, "rss2")?;
    let channel = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name("channel"))
        .ok_or_else(|| DataError::Parse {
            format: "rss2",
            reason: "document has no <channel> element".into(),
        })?;

    let meta = collect_allowed(channel, CHANNEL_TAGS);
    let records: Vec<Record> = channel
        .children()
        .filter(|n| n.has_tag_name("item"))
        .map(|item| collect_allowed(item, ITEM_TAGS))
        .collect();

    Ok(Extracted {
        records: Some(records),
        raw: RawPayload::Rss { channel: meta },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Release notes</title>
    <link>https://example.org</link>
    <description>Latest releases</description>
    <ttl>60</ttl>
    <image><url>https://example.org/logo.png</url><title>logo</title></image>
    <foo>not allowed</foo>
    <item>
      <title>1.0</title>
      <guid isPermaLink="false">rel-1</guid>
      <enclosure url="https://example.org/a.zip" length="10" type="application/zip"/>
      <custom>dropped</custom>
    </item>
    <item>
      <title>1.1</title>
      <category>stable</category>
      <category>lts</category>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn channel_metadata_is_separate_and_filtered() {
        let out = extract(FEED).unwrap();
        let RawPayload::Rss { channel } = out.raw else {
            panic!("expected rss payload");
        };
        assert_eq!(channel["title"], "Release notes");
        assert_eq!(channel["ttl"], "60");
        assert_eq!(channel["image"]["url"], "https://example.org/logo.png");
        assert!(!channel.contains_key("foo"));
        assert!(!channel.contains_key("item"));
    }

    #[test]
    fn items_keep_allowed_tags_only() {
        let records = extract(FEED).unwrap().records.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["title"], "1.0");
        assert_eq!(records[0]["guid"]["#text"], "rel-1");
        assert_eq!(records[0]["enclosure"]["_type"], "application/zip");
        assert!(!records[0].contains_key("custom"));
        assert_eq!(records[1]["category"], serde_json::json!(["stable", "lts"]));
    }

    #[test]
    fn missing_channel_is_a_parse_error() {
        let err = extract("<rss/>").unwrap_err();
        assert!(matches!(err, DataError::Parse { format: "rss2", .. }));
    }
}
