//! Lenient JSON extraction from model output.
//!
//! Models wrap JSON in prose or code fences often enough that the whole text
//! is tried first, then the span from the first `{` to the last `}`.

use serde_json::{Map, Value};

use crate::ports::AdvisorVerdict;

type Object = Map<String, Value>;

/// Finds the JSON object in `raw`.
pub fn extract_object(raw: &str) -> Option<Object> {
    let trimmed = raw.trim();
    if let Ok(Value::Object(object)) = serde_json::from_str(trimmed) {
        return Some(object);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&trimmed[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn require<'a>(object: &'a Object, field: &str) -> Result<&'a Value, String> {
    object
        .get(field)
        .ok_or_else(|| format!("missing field `{}`", field))
}

/// Text of a scalar value. Numbers are accepted for free-form fields.
fn text_of(value: &Value, field: &str) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(format!("field `{}` is not text: {}", field, other)),
    }
}

/// Accepts `true`/`false` and `0`/`1`.
fn flag_of(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("field `is_finished` must be 0 or 1, got {}", n)),
        },
        other => Err(format!("field `is_finished` is not a flag: {}", other)),
    }
}

/// Parses `{"dubious": [...]}`. Blank entries are dropped.
pub fn parse_dubious(raw: &str) -> Result<Vec<String>, String> {
    let object = extract_object(raw).ok_or_else(|| "no JSON object in response".to_string())?;
    let items = require(&object, "dubious")?
        .as_array()
        .ok_or_else(|| "field `dubious` is not a list".to_string())?;

    items
        .iter()
        .map(|item| text_of(item, "dubious"))
        .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
        .collect()
}

/// Parses the dialogue advisor's decision.
pub fn parse_verdict(raw: &str) -> Result<AdvisorVerdict, String> {
    let object = extract_object(raw).ok_or_else(|| "no JSON object in response".to_string())?;

    Ok(AdvisorVerdict {
        process: text_of(require(&object, "process")?, "process")?,
        aim: text_of(require(&object, "aim")?, "aim")?,
        question: text_of(require(&object, "question")?, "question")?,
        is_finished: flag_of(require(&object, "is_finished")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod extract_object {
        use super::*;

        #[test]
        fn plain_json() {
            assert!(extract_object(r#"{"a": 1}"#).is_some());
        }

        #[test]
        fn json_inside_prose_and_fences() {
            let raw = "Sure, here it is:\n```json\n{\"a\": {\"b\": 2}}\n```\nAnything else?";
            let object = extract_object(raw).unwrap();
            assert_eq!(object["a"]["b"], 2);
        }

        #[test]
        fn rejects_arrays_and_garbage() {
            assert!(extract_object("[1, 2]").is_none());
            assert!(extract_object("no braces here").is_none());
            assert!(extract_object("} backwards {").is_none());
        }
    }

    #[test]
    fn dubious_list_is_parsed_and_blank_entries_dropped() {
        let snippets = parse_dubious(r#"{"dubious": ["born in 1850", "  ", "met Lincoln"]}"#).unwrap();
        assert_eq!(snippets, vec!["born in 1850", "met Lincoln"]);
    }

    #[test]
    fn dubious_requires_the_field() {
        let err = parse_dubious(r#"{"issues": []}"#).unwrap_err();
        assert!(err.contains("dubious"));
    }

    #[test]
    fn verdict_accepts_numeric_flag() {
        let verdict = parse_verdict(
            r#"{"process": 40, "aim": "School", "question": "Where?", "is_finished": 1}"#,
        )
        .unwrap();
        assert_eq!(verdict.process, "40");
        assert!(verdict.is_finished);
    }

    #[test]
    fn verdict_rejects_missing_fields_and_bad_flags() {
        assert!(parse_verdict(r#"{"process": "1%", "aim": "a", "is_finished": false}"#).is_err());
        assert!(parse_verdict(
            r#"{"process": "1%", "aim": "a", "question": "q", "is_finished": "yes"}"#
        )
        .is_err());
        assert!(parse_verdict(
            r#"{"process": "1%", "aim": "a", "question": "q", "is_finished": 2}"#
        )
        .is_err());
    }
}
