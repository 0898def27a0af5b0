use crate::util::truncate_detail;
use serde::Deserialize;
use std::error::Error;
use std::fmt;

/// The provider response shape did not match the expected chat-completion
/// envelope. Carries the raw body so operators can see what actually arrived.
#[derive(Debug)]
pub struct ExtractError {
    reason: String,
    raw_body: String,
}

impl ExtractError {
    fn new(reason: impl Into<String>, raw_body: &str) -> Self {
        Self {
            reason: reason.into(),
            raw_body: raw_body.to_string(),
        }
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (body: {})",
            self.reason,
            truncate_detail(&self.raw_body, 256)
        )
    }
}

impl Error for ExtractError {}

#[derive(Deserialize)]
struct CompletionEnvelope {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

/// Pulls `choices[0].message.content` out of the provider envelope.
///
/// The parse is a tagged-variant check, not optimistic field access: invalid
/// JSON, a missing `choices` array, an absent `content` field, or a
/// non-string `content` all fail closed with `ExtractError`. An empty string
/// content is a valid (empty) extraction.
pub fn completion_content(raw_body: &str) -> Result<String, ExtractError> {
    let envelope: CompletionEnvelope = serde_json::from_str(raw_body)
        .map_err(|e| ExtractError::new(format!("unexpected response shape: {}", e), raw_body))?;

    let choice = envelope
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::new("response contained no choices", raw_body))?;

    Ok(choice.message.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(content: &str) -> String {
        serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        })
        .to_string()
    }

    #[test]
    fn extracts_first_choice_content() {
        assert_eq!(completion_content(&envelope("SELECT 1")).unwrap(), "SELECT 1");
    }

    #[test]
    fn extra_choices_and_fields_are_ignored() {
        let raw = r#"{"id":"x","choices":[
            {"index":0,"message":{"role":"assistant","content":"first"},"finish_reason":"stop"},
            {"index":1,"message":{"role":"assistant","content":"second"}}
        ],"usage":{"total_tokens":9}}"#;
        assert_eq!(completion_content(raw).unwrap(), "first");
    }

    #[test]
    fn empty_content_is_an_empty_extraction_not_an_error() {
        assert_eq!(completion_content(&envelope("")).unwrap(), "");
    }

    #[test]
    fn invalid_json_fails_closed_with_raw_body() {
        let err = completion_content("not json at all").unwrap_err();
        assert_eq!(err.raw_body(), "not json at all");
    }

    #[test]
    fn empty_choices_array_is_an_error() {
        assert!(completion_content(r#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn absent_content_field_is_an_error() {
        let raw = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        assert!(completion_content(raw).is_err());
    }

    #[test]
    fn non_string_content_is_an_error() {
        let raw = r#"{"choices":[{"message":{"content":42}}]}"#;
        assert!(completion_content(raw).is_err());
    }
}
