//! Single-pass `{name}` substitution.
//!
//! Tokens are dotted paths resolved against a JSON value. Two modes:
//!
//! - [`resolve`] is strict: an unresolvable token is an error. Used for
//!   child data set URLs.
//! - [`interpolate`] is lenient: unresolvable tokens render empty. Used by
//!   lightweight templates.
//!
//! An unclosed brace is emitted as-is in both modes.

use serde_json::Value;

use crate::error::{DataError, Result};
use crate::record::lookup_path;

/// Text form of a resolved value; `None` for null and containers.
#[must_use]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn substitute(
    template: &str,
    mut lookup: impl FnMut(&str) -> Result<String>,
) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            result.push(ch);
            continue;
        }
        let mut token = String::new();
        let mut found_close = false;
        for c in chars.by_ref() {
            if c == '}' {
                found_close = true;
                break;
            }
            token.push(c);
        }
        if found_close {
            result.push_str(&lookup(token.trim())?);
        } else {
            result.push('{');
            result.push_str(&token);
        }
    }

    Ok(result)
}

/// Replace every `{path}` with the matching scalar of `data`, failing on
/// the first token that cannot be resolved.
pub fn resolve(template: &str, data: &Value) -> Result<String> {
    substitute(template, |token| {
        lookup_path(data, token)
            .and_then(scalar_text)
            .ok_or_else(|| DataError::UnresolvedPlaceholder {
                template: template.to_owned(),
                placeholder: token.to_owned(),
            })
    })
}

/// Replace every `{path}`, rendering unresolvable tokens as `""` and
/// passing each resolved value through `escape`.
#[must_use]
pub fn interpolate(template: &str, data: &Value, escape: impl Fn(&str) -> String) -> String {
    substitute(template, |token| {
        Ok(lookup_path(data, token)
            .and_then(scalar_text)
            .map(|text| escape(&text))
            .unwrap_or_default())
    })
    .unwrap_or_default()
}

/// Tokens of `template`, in order of appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let _ = substitute(template, |token| {
        found.push(token.to_owned());
        Ok(String::new())
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_resolution() {
        let row = json!({"abbreviation": "AS", "meta": {"year": 1900}});
        assert_eq!(
            resolve("data/{abbreviation}.json", &row).unwrap(),
            "data/AS.json"
        );
        assert_eq!(resolve("{meta.year}/x", &row).unwrap(), "1900/x");
    }

    #[test]
    fn strict_resolution_fails_on_missing() {
        let row = json!({"abbreviation": "AS"});
        let err = resolve("data/{code}.json", &row).unwrap_err();
        assert_eq!(
            err,
            DataError::UnresolvedPlaceholder {
                template: "data/{code}.json".into(),
                placeholder: "code".into(),
            }
        );
    }

    #[test]
    fn null_and_objects_do_not_resolve() {
        let row = json!({"a": null, "b": {"c": 1}});
        assert!(resolve("{a}", &row).is_err());
        assert!(resolve("{b}", &row).is_err());
    }

    #[test]
    fn unclosed_brace_passes_through() {
        let row = json!({});
        assert_eq!(resolve("a{b", &row).unwrap(), "a{b");
    }

    #[test]
    fn lenient_interpolation_escapes() {
        let data = json!({"name": "<b>"});
        let out = interpolate("[{name}][{missing}]", &data, |s| s.replace('<', "&lt;"));
        assert_eq!(out, "[&lt;b>][]");
    }

    #[test]
    fn lists_placeholders() {
        assert_eq!(placeholders("/{a}/{b.c}"), vec!["a", "b.c"]);
    }
}
