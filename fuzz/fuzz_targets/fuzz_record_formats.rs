#![no_main]

use libfuzzer_sys::fuzz_target;
use luga_data::{DataSet, RecordFormat};

fuzz_target!(|input: (&str, &str)| {
    let (body, path) = input;
    let formats = [
        RecordFormat::json(),
        RecordFormat::json_at(path),
        RecordFormat::xml(),
        RecordFormat::xml_at(path),
        RecordFormat::Tsv,
        RecordFormat::Rss2,
    ];
    for format in formats {
        let Ok(extracted) = format.extract(body) else {
            continue;
        };
        // Whatever parses must be storable.
        if let Some(records) = extracted.records {
            let count = records.len();
            let ds = DataSet::new("fuzz");
            let ids = ds.insert(records).unwrap();
            assert_eq!(ids.len(), count);
            assert_eq!(ds.records_count(), count);
        }
    }
});
