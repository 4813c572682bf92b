//! Maps every source response shape the backend uses onto `Vec<SourceLine>`.
//!
//! Shapes seen across deployments:
//!   * raw text (`sources/raw`)
//!   * bare array of line objects: `[{"line": 1, "code": "..."}]`
//!   * `{"lines": [...]}`
//!   * `{"sources": [{"lines": [...]}]}`
//!   * `{"sources": [{"line": 1, "code": "..."}]}` (`sources/lines`)
//!   * `{"sources": [[1, "..."]]}` (`sources/show`)

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{SonarContextError, SonarContextResult};
use crate::model::SourceLine;

/// A successful backend response, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResponse {
    Json(Value),
    Text(String),
}

impl NormalizedResponse {
    /// Builds a response from a body, preferring JSON when the payload parses.
    ///
    /// A declared `text/*` content type is taken at its word.
    pub fn from_body(content_type: Option<&str>, body: String) -> Self {
        if content_type.is_some_and(|ct| ct.trim_start().starts_with("text/")) {
            return Self::Text(body);
        }
        let declared_json = content_type.is_some_and(|ct| ct.contains("json"));
        let looks_json = matches!(body.trim_start().chars().next(), Some('{') | Some('['));

        if declared_json || looks_json {
            if let Ok(value) = serde_json::from_str::<Value>(&body) {
                return Self::Json(value);
            }
        }
        Self::Text(body)
    }

    /// Decodes a structured endpoint's JSON body.
    pub fn into_json<T: DeserializeOwned>(self) -> SonarContextResult<T> {
        match self {
            Self::Json(v) => Ok(serde_json::from_value(v)?),
            Self::Text(t) => Err(SonarContextError::InvalidResponse(format!(
                "expected JSON, got text ({} bytes)",
                t.len()
            ))),
        }
    }

    /// Canonical line sequence for any supported source shape.
    pub fn into_lines(self) -> SonarContextResult<Vec<SourceLine>> {
        match self {
            Self::Text(t) => Ok(text_to_lines(&t)),
            Self::Json(v) => json_to_lines(v),
        }
    }
}

/// Splits raw text into 1-based numbered lines.
pub fn text_to_lines(text: &str) -> Vec<SourceLine> {
    text.lines()
        .zip(1u32..)
        .map(|(text, n)| SourceLine::new(n, text))
        .collect()
}

fn json_to_lines(value: Value) -> SonarContextResult<Vec<SourceLine>> {
    match value {
        Value::Array(items) => entries_to_lines(items),
        Value::Object(mut obj) => {
            if let Some(Value::Array(items)) = obj.remove("lines") {
                return entries_to_lines(items);
            }
            if let Some(Value::Array(sources)) = obj.remove("sources") {
                let nested = sources
                    .iter()
                    .all(|s| s.get("lines").is_some_and(Value::is_array));
                if nested && !sources.is_empty() {
                    let mut out = Vec::new();
                    for mut source in sources {
                        if let Some(Value::Array(items)) = source.get_mut("lines").map(Value::take)
                        {
                            out.extend(entries_to_lines(items)?);
                        }
                    }
                    return Ok(out);
                }
                return entries_to_lines(sources);
            }
            Err(SonarContextError::InvalidResponse(
                "source payload has neither `lines` nor `sources`".into(),
            ))
        }
        Value::String(s) => Ok(text_to_lines(&s)),
        other => Err(SonarContextError::InvalidResponse(format!(
            "unsupported source payload: {}",
            type_name(&other)
        ))),
    }
}

fn entries_to_lines(items: Vec<Value>) -> SonarContextResult<Vec<SourceLine>> {
    items
        .into_iter()
        .zip(1u32..)
        .map(|(item, position)| entry_to_line(item, position))
        .collect()
}

/// One line entry: `{line, code|text|source}`, `[n, text]` or a bare string.
fn entry_to_line(item: Value, position: u32) -> SonarContextResult<SourceLine> {
    match item {
        Value::Object(mut obj) => {
            let number = obj
                .get("line")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(position);
            let text = ["code", "text", "source"]
                .iter()
                .find_map(|k| match obj.remove(*k) {
                    Some(Value::String(s)) => Some(s),
                    _ => None,
                })
                .unwrap_or_default();
            Ok(SourceLine::new(number, text))
        }
        Value::Array(pair) => match pair.as_slice() {
            [Value::Number(n), Value::String(text)] => {
                let number = n
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(position);
                Ok(SourceLine::new(number, text.clone()))
            }
            _ => Err(SonarContextError::InvalidResponse(
                "line tuple must be [number, text]".into(),
            )),
        },
        Value::String(text) => Ok(SourceLine::new(position, text)),
        other => Err(SonarContextError::InvalidResponse(format!(
            "unsupported line entry: {}",
            type_name(&other)
        ))),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn texts(lines: &[SourceLine]) -> Vec<(u32, &str)> {
        lines.iter().map(|l| (l.number, l.text.as_str())).collect()
    }

    #[rstest]
    #[case::bare_array(json!([{"line": 1, "code": "a"}, {"line": 2, "code": "b"}]))]
    #[case::lines_object(json!({"lines": [{"line": 1, "text": "a"}, {"line": 2, "text": "b"}]}))]
    #[case::nested_sources(json!({"sources": [{"lines": [{"line": 1, "code": "a"}, {"line": 2, "code": "b"}]}]}))]
    #[case::flat_sources(json!({"sources": [{"line": 1, "code": "a"}, {"line": 2, "code": "b"}]}))]
    #[case::show_tuples(json!({"sources": [[1, "a"], [2, "b"]]}))]
    fn every_json_shape_normalizes_to_the_same_lines(#[case] payload: Value) {
        let lines = NormalizedResponse::Json(payload).into_lines().unwrap();
        assert_eq!(texts(&lines), vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn raw_text_is_numbered_from_one() {
        let resp = NormalizedResponse::from_body(Some("text/plain"), "x = 1\n\ny = 2\n".into());
        let lines = resp.into_lines().unwrap();
        assert_eq!(texts(&lines), vec![(1, "x = 1"), (2, ""), (3, "y = 2")]);
    }

    #[test]
    fn text_that_merely_starts_with_a_bracket_stays_text() {
        let resp = NormalizedResponse::from_body(None, "[section]\nkey=value".into());
        assert!(matches!(resp, NormalizedResponse::Text(_)));
    }

    #[test]
    fn declared_text_is_not_sniffed_for_json() {
        let body = "{\n  \"name\": \"app\"\n}\n".to_string();
        let resp = NormalizedResponse::from_body(Some("text/plain;charset=utf-8"), body);
        let lines = resp.into_lines().unwrap();
        assert_eq!(texts(&lines), vec![(1, "{"), (2, "  \"name\": \"app\""), (3, "}")]);
    }

    #[test]
    fn entries_without_numbers_use_their_position() {
        let lines = NormalizedResponse::Json(json!({"lines": [{"code": "a"}, {"code": "b"}]}))
            .into_lines()
            .unwrap();
        assert_eq!(texts(&lines), vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let err = NormalizedResponse::Json(json!({"component": {}}))
            .into_lines()
            .unwrap_err();
        assert!(matches!(err, SonarContextError::InvalidResponse(_)));
    }

    #[test]
    fn text_is_not_json() {
        let err = NormalizedResponse::Text("nope".into())
            .into_json::<Value>()
            .unwrap_err();
        assert!(matches!(err, SonarContextError::InvalidResponse(_)));
    }
}
