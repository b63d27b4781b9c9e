use serde_json::Value;

use super::{Extracted, RawPayload};
use crate::error::{DataError, Result};
use crate::record::{lookup_path, records_from_value};

pub(super) fn extract(body: &str, path: Option<&str>) -> Result<Extracted> {
    let parsed: Value = serde_json::from_str(body).map_err(|err| DataError::Parse {
        format: "json",
        reason: err.to_string(),
    })?;

    let selected = match path {
        Some(path) => lookup_path(&parsed, path).cloned(),
        None => Some(parsed.clone()),
    };
    let records = match selected {
        Some(value) => Some(records_from_value(value).map_err(|err| DataError::Parse {
            format: "json",
            reason: err.to_string(),
        })?),
        None => None,
    };

    Ok(Extracted {
        records,
        raw: RawPayload::Json(parsed),
    })
}
