//! Turning model replies into program data
//!
//! Models are told to answer with bare JSON but often wrap it in a markdown
//! fence anyway. Everything here starts by stripping that.

use serde::Deserialize;

use super::model::{null_as_default, renumber, Performance};

/// Error type for reading model replies
#[derive(Debug)]
pub enum ExtractError {
    /// The reply was not valid JSON
    InvalidJson(serde_json::Error),
    /// The reply was JSON but not the expected shape
    UnexpectedShape(&'static str),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::InvalidJson(e) => write!(f, "model reply was not valid JSON: {}", e),
            ExtractError::UnexpectedShape(expected) => {
                write!(f, "model reply was not {}", expected)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<serde_json::Error> for ExtractError {
    fn from(e: serde_json::Error) -> Self {
        ExtractError::InvalidJson(e)
    }
}

/// Remove a surrounding markdown code fence, if any.
///
/// A leading ```` ``` ```` line (with or without a language tag) is dropped,
/// along with a trailing ```` ``` ````.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if body.starts_with("```") {
        body = match body.split_once('\n') {
            Some((_, rest)) => rest,
            None => body.trim_start_matches('`'),
        };
        body = body.trim_end();
        if let Some(stripped) = body.strip_suffix("```") {
            body = stripped.trim_end();
        }
    }
    body.trim()
}

#[derive(Deserialize)]
struct PerformanceList {
    #[serde(default, deserialize_with = "null_as_default")]
    performances: Vec<Performance>,
}

/// Parse `{"performances": [...]}` out of an extraction reply.
///
/// A missing `performances` key yields an empty list. Missing order numbers
/// are filled from list position.
pub fn parse_performances(reply: &str) -> Result<Vec<Performance>, ExtractError> {
    let body = strip_code_fences(reply);
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(ExtractError::UnexpectedShape("a JSON object"));
    }
    let list: PerformanceList = serde_json::from_value(value)?;
    let mut performances = list.performances;
    renumber(&mut performances);
    Ok(performances)
}

/// Parse a correction reply into a JSON object suitable for merging.
pub fn parse_correction(reply: &str) -> Result<serde_json::Map<String, serde_json::Value>, ExtractError> {
    let body = strip_code_fences(reply);
    match serde_json::from_str(body)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ExtractError::UnexpectedShape("a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_performances_from_fenced_reply() {
        let reply = r#"```json
{
  "performances": [
    {"order": 1, "student_name": "Tommy Chen", "piece_name": "Fur Elise (Beethoven)", "instrument": "Piano", "estimated_duration_minutes": 4},
    {"student_name": "Lisa Wang", "piece_name": "Clair de Lune (Debussy)", "instrument": "Piano", "estimated_duration_minutes": 6}
  ]
}
```"#;
        let perfs = parse_performances(reply).unwrap();
        assert_eq!(perfs.len(), 2);
        assert_eq!(perfs[0].student_name, "Tommy Chen");
        assert_eq!(perfs[1].order, 2);
    }

    #[test]
    fn test_parse_performances_missing_key_is_empty() {
        assert!(parse_performances("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_performances_tolerates_nulls() {
        let reply = r#"{"performances": [
            {"order": 1, "student_name": null, "piece_name": "Fur Elise", "instrument": null, "estimated_duration_minutes": null},
            {"order": 2, "student_name": "Lisa Wang", "piece_name": null, "instrument": "Piano", "estimated_duration_minutes": 6}
        ]}"#;
        let perfs = parse_performances(reply).unwrap();
        assert_eq!(perfs.len(), 2);
        assert_eq!(perfs[0].student_name, "");
        assert_eq!(perfs[0].piece_name, "Fur Elise");
        assert_eq!(perfs[1].piece_name, "");

        assert!(parse_performances(r#"{"performances": null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_performances_rejects_prose() {
        assert!(matches!(
            parse_performances("Sure! Here are the performances."),
            Err(ExtractError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_performances("[1, 2]"),
            Err(ExtractError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_parse_correction_requires_object() {
        let map = parse_correction("{\"concert_title\": \"Winter Gala\"}").unwrap();
        assert_eq!(map["concert_title"], "Winter Gala");
        assert!(parse_correction("\"just a string\"").is_err());
    }
}
