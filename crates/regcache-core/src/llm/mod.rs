//! LLM fallback for fields the heuristic pass could not resolve.

mod openai;

pub use openai::OpenAiClient;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::models::document::{ExtractionSchema, FieldValues};

/// A chat model answering with one JSON object.
pub trait LlmClient: Send + Sync {
    /// Send `prompt` and return the raw JSON text of the answer.
    fn complete_json(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Asks the LLM for a set of fields and never fails.
///
/// Transport errors, API errors and unparseable answers all degrade to an
/// empty map so the document still gets its heuristic values.
pub struct LlmFallback {
    client: Box<dyn LlmClient>,
}

impl LlmFallback {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Extract `fields` from `text`.
    ///
    /// Null, empty and missing answers come back as `None`.
    pub fn extract(&self, fields: &ExtractionSchema, text: &str) -> FieldValues {
        if fields.is_empty() {
            return FieldValues::new();
        }

        let prompt = build_prompt(fields, text);
        let raw = match self.client.complete_json(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("LLM call failed: {}", e);
                return FieldValues::new();
            }
        };

        match parse_answer(&raw, fields) {
            Ok(values) => {
                debug!(
                    asked = fields.len(),
                    answered = values.values().filter(|v| v.is_some()).count(),
                    "LLM answered"
                );
                values
            }
            Err(e) => {
                warn!("Discarding LLM answer: {}", e);
                FieldValues::new()
            }
        }
    }
}

/// Prompt asking for one JSON object keyed by field name.
pub fn build_prompt(fields: &ExtractionSchema, text: &str) -> String {
    let schema = serde_json::to_string_pretty(fields).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Extract the fields described below from the document text.\n\
         Answer with a single JSON object whose keys are the field names.\n\
         Use null for any field that does not appear in the text.\n\n\
         Fields (name: description):\n{schema}\n\n\
         Document text:\n{text}\n"
    )
}

/// Parse an answer into field values.
///
/// Every key of the answer is kept; fields that were asked for but not
/// answered come back as `None`. Deciding which keys belong to the document
/// schema is left to the caller.
pub fn parse_answer(raw: &str, fields: &ExtractionSchema) -> Result<FieldValues, LlmError> {
    let json = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(json).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    let Value::Object(object) = value else {
        return Err(LlmError::MalformedResponse(
            "answer is not a JSON object".to_string(),
        ));
    };

    let mut values: FieldValues = fields.keys().map(|field| (field.clone(), None)).collect();
    for (key, value) in object {
        values.insert(key, value_to_text(value));
    }
    Ok(values)
}

/// Text form of an answered value, `None` for null or blank.
fn value_to_text(value: Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s,
        other => other.to_string(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct ScriptedClient {
        answer: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LlmClient for ScriptedClient {
        fn complete_json(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer.clone().map_err(LlmError::Http)
        }
    }

    fn fields() -> ExtractionSchema {
        ExtractionSchema::from([
            ("data_emissao".to_string(), "Data de emissão".to_string()),
            ("nome".to_string(), "Nome completo".to_string()),
        ])
    }

    #[test]
    fn test_parse_answer_fills_missing_fields() {
        let values = parse_answer(r#"{"nome": "MARIA DA SILVA", "extra": "x"}"#, &fields()).unwrap();

        assert_eq!(
            values,
            FieldValues::from([
                ("data_emissao".to_string(), None),
                ("extra".to_string(), Some("x".to_string())),
                ("nome".to_string(), Some("MARIA DA SILVA".to_string())),
            ])
        );
    }

    #[test]
    fn test_parse_answer_normalizes_values() {
        let values = parse_answer(
            "```json\n{\"nome\": \"  \", \"data_emissao\": 2021}\n```",
            &fields(),
        )
        .unwrap();

        assert_eq!(values["nome"], None);
        assert_eq!(values["data_emissao"], Some("2021".to_string()));
    }

    #[test]
    fn test_parse_answer_fence_tag_any_case() {
        for answer in [
            "```JSON\n{\"nome\": \"MARIA\"}\n```",
            "```Json {\"nome\": \"MARIA\"}```",
            "```\n{\"nome\": \"MARIA\"}\n```",
        ] {
            let values = parse_answer(answer, &fields()).unwrap();
            assert_eq!(values["nome"], Some("MARIA".to_string()));
        }
    }

    #[test]
    fn test_parse_answer_rejects_non_objects() {
        assert!(parse_answer("[1, 2]", &fields()).is_err());
        assert!(parse_answer("not json", &fields()).is_err());
    }

    #[test]
    fn test_prompt_lists_fields_and_text() {
        let prompt = build_prompt(&fields(), "NOME MARIA");
        assert!(prompt.contains("\"data_emissao\": \"Data de emissão\""));
        assert!(prompt.ends_with("NOME MARIA\n"));
    }

    #[test]
    fn test_fallback_degrades_to_empty() {
        let failing = LlmFallback::new(Box::new(ScriptedClient {
            answer: Err("timed out".to_string()),
            prompts: Mutex::new(Vec::new()),
        }));
        assert!(failing.extract(&fields(), "text").is_empty());

        let garbage = LlmFallback::new(Box::new(ScriptedClient::answering("I cannot help")));
        assert!(garbage.extract(&fields(), "text").is_empty());
    }

    #[test]
    fn test_fallback_skips_call_without_fields() {
        let client = ScriptedClient::answering("{}");
        let fallback = LlmFallback::new(Box::new(client));
        assert!(fallback.extract(&ExtractionSchema::new(), "text").is_empty());
    }
}
