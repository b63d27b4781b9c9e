#![no_main]

use libfuzzer_sys::fuzz_target;
use luga_data::Context;
use luga_region::{PlaceholderEngine, TemplateEngine};
use serde_json::json;

fuzz_target!(|source: &str| {
    let Ok(template) = PlaceholderEngine.compile(source) else {
        return;
    };
    let mut context = Context::default();
    context.insert("entities", json!([{"a": 1, "b": "<x>"}, {"a": 2}]));
    context.insert("flag", true);
    let _ = template(&context);
});
