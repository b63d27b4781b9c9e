#![forbid(unsafe_code)]

//! XML, TSV and RSS sources loaded through the fixture transport.

use std::rc::Rc;

use luga_data::{DataSource, EventKind, HttpDataSet, RecordFormat, RecordSet, State, Transport};
use luga_harness::{EventLog, FixtureTransport};

fn load(id: &str, url: &str, format: RecordFormat) -> (Rc<HttpDataSet>, Rc<FixtureTransport>) {
    let transport = FixtureTransport::new();
    let dyn_transport: Rc<dyn Transport> = transport.clone();
    let ds = HttpDataSet::builder(id, format).url(url).build(dyn_transport);
    ds.load_data().unwrap();
    (ds, transport)
}

#[test]
fn xml_records_with_attributes() {
    let (ladies, _) = load("ladies", "fixtures/ladies.xml", RecordFormat::xml_at("/ladies/lady"));
    assert_eq!(ladies.state(), State::Ready);
    let rows = ladies.select();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["_id"], "ada");
    assert_eq!(rows[1]["lastName"], "Hopper");
    assert!(ladies.raw_xml().unwrap().contains("<lady id=\"marie\">"));
}

#[test]
fn xml_descendant_path() {
    let (ladies, _) = load("ladies", "fixtures/ladies.xml", RecordFormat::xml_at("//country"));
    let countries: Vec<_> = ladies
        .select()
        .iter()
        .map(|r| r["#text"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(countries, vec!["UK", "US", "France"]);
}

#[test]
fn tsv_pads_short_rows_and_skips_blank_lines() {
    let (ladies, _) = load("ladies", "fixtures/ladies.tsv", RecordFormat::Tsv);
    let rows = ladies.select();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["firstName"], "Marie");
    assert_eq!(rows[2]["country"], "");
}

#[test]
fn rss_items_and_channel_metadata() {
    let (feed, _) = load("feed", "fixtures/feed.rss", RecordFormat::Rss2);
    let items = feed.select();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["guid"], "luga-0.1.0");
    assert!(items[1].get("internal").is_none());

    let channel = feed.channel_meta().unwrap();
    assert_eq!(channel["title"], "luga releases");
    assert_eq!(channel["language"], "en");

    let context = feed.context();
    assert_eq!(context.get("title").unwrap(), "luga releases");
    assert_eq!(context.entities().len(), 2);
}

#[test]
fn malformed_body_is_an_xhr_error_with_status_zero() {
    let transport = FixtureTransport::new();
    transport.route("fixtures/broken.xml", "<ladies><lady>");
    let dyn_transport: Rc<dyn Transport> = transport.clone();
    let ds = HttpDataSet::builder("broken", RecordFormat::xml())
        .url("fixtures/broken.xml")
        .build(dyn_transport);
    let log = EventLog::attach(&*ds);
    ds.load_data().unwrap();

    assert_eq!(ds.state(), State::Error);
    let errors = log.xhr_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status, 0);
    assert!(errors[0].message.starts_with("Failed to retrieve: fixtures/broken.xml. HTTP status: 0."));
    assert_eq!(log.count(EventKind::DataChanged), 0);
}

#[test]
fn missing_resource_is_a_404() {
    let (ds, transport) = load("nope", "fixtures/nope.json", RecordFormat::json());
    assert_eq!(ds.state(), State::Error);
    assert!(ds.error_message().unwrap().contains("HTTP status: 404"));
    assert_eq!(transport.requested(), vec!["fixtures/nope.json"]);
}

#[test]
fn cache_busting_appends_a_timestamp() {
    let transport = FixtureTransport::new();
    let dyn_transport: Rc<dyn Transport> = transport.clone();
    let states = HttpDataSet::builder("states", RecordFormat::json())
        .url("fixtures/states.json")
        .cache(false)
        .build(dyn_transport);
    states.load_data().unwrap();
    let url = &transport.requested()[0];
    assert!(url.starts_with("fixtures/states.json?_="), "{url}");
    assert_eq!(states.records_count(), 4);
}

#[test]
fn incremental_load_appends() {
    let transport = FixtureTransport::new();
    let dyn_transport: Rc<dyn Transport> = transport.clone();
    let states = HttpDataSet::builder("states", RecordFormat::json())
        .url("fixtures/states.json")
        .incremental_load(true)
        .build(dyn_transport);
    states.load_data().unwrap();
    states.load_data().unwrap();
    assert_eq!(states.records_count(), 8);
}
