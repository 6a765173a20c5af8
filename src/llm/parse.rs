//! Turning model text into typed output.

use crate::{Error, Result};
use serde::de::DeserializeOwned;

/// Strip a surrounding ```json ... ``` fence if the model added one.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag line (```json).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

/// Parse model text as `T`, tolerating code fences and leading prose
/// before the first `{`.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<T>(&cleaned) {
        return Ok(value);
    }
    let object = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => {
            return Err(Error::MalformedOutput(format!(
                "no JSON object in response: {}",
                crate::http::truncate_body(&cleaned)
            )))
        }
    };
    serde_json::from_str::<T>(object).map_err(|e| {
        Error::MalformedOutput(format!(
            "{}; raw: {}",
            e,
            crate::http::truncate_body(&cleaned)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::SummaryResult;

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn parses_with_prose_prefix() {
        let out: SummaryResult =
            parse_json("Here you go:\n{\"summary\": \"Brown spots.\"}").unwrap();
        assert_eq!(out.summary, "Brown spots.");
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_json::<SummaryResult>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, Error::MalformedOutput(_)));
        let err = parse_json::<SummaryResult>("{\"text\": \"wrong field\"}").unwrap_err();
        assert!(matches!(err, Error::MalformedOutput(_)));
    }
}
