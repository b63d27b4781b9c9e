use serde_json::Value;

use super::{Extracted, RawPayload};
use crate::error::Result;
use crate::record::Record;

/// First non-blank line is the header. Short rows are padded with empty
/// strings; cells beyond the header are dropped.
pub(super) fn extract(body: &str) -> Result<Extracted> {
    let mut lines = body
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let Some(header) = lines.next() else {
        return Ok(Extracted {
            records: Some(Vec::new()),
            raw: RawPayload::None,
        });
    };
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

    let records = lines
        .map(|line| {
            let mut cells = line.split('\t');
            columns
                .iter()
                .map(|column| {
                    let cell = cells.next().unwrap_or_default();
                    ((*column).to_owned(), Value::String(cell.to_owned()))
                })
                .collect::<Record>()
        })
        .collect();

    Ok(Extracted {
        records: Some(records),
        raw: RawPayload::None,
    })
}
