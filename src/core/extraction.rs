use async_trait::async_trait;
use thiserror::Error;

use crate::core::schema::{canonical_token, FieldDomain, FieldId, FieldSpec};
use crate::models::{ChatMessage, FieldValue, Profile};

/// Raw field updates pulled out of one user message, plus the model's own
/// conversational reply when it produced one.
///
/// Values are still untyped JSON here; `normalize_value` decides whether
/// they fit the field's domain. An empty `updates` list is an abstention.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub updates: Vec<(FieldId, serde_json::Value)>,
    pub reply: Option<String>,
}

/// Everything the extractor may look at for one turn
#[derive(Debug)]
pub struct ExtractionContext<'a> {
    pub history: &'a [ChatMessage],
    pub message: &'a str,
    pub profile: &'a Profile,
    /// Field the open question targets, if a question is open
    pub target: Option<FieldId>,
}

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("upstream completion failed: {0}")]
    Upstream(String),
}

/// Turns one free-text user reply into structured field updates.
///
/// The live implementation calls the LLM gateway; tests substitute scripted
/// stubs. Implementations must abstain rather than guess and never touch
/// persistent storage - the orchestrator owns all writes.
#[async_trait]
pub trait AnswerExtractor: Send + Sync {
    async fn extract(&self, ctx: ExtractionContext<'_>) -> Result<Extraction, ExtractorError>;
}

/// Validate a raw extracted value against the field's domain and normalize
/// it into stored form: lower-case tokens for enums, integers in range,
/// trimmed text, de-duplicated string lists.
///
/// Returns None when the value does not fit; the caller treats that as an
/// abstention, never as an error the user sees.
pub fn normalize_value(spec: &FieldSpec, raw: &serde_json::Value) -> Option<FieldValue> {
    match spec.domain {
        FieldDomain::Enum(tokens) => {
            let token = canonical_token(raw.as_str()?);
            tokens
                .iter()
                .find(|&&t| t == token)
                .map(|&t| FieldValue::Text(t.to_string()))
        }
        FieldDomain::Integer { min, max } => {
            let n = raw.as_i64().or_else(|| parse_leading_integer(raw.as_str()?))?;
            (min..=max).contains(&n).then_some(FieldValue::Integer(n))
        }
        FieldDomain::FreeText => {
            let text = raw.as_str()?.trim();
            (!text.is_empty()).then(|| FieldValue::Text(text.to_string()))
        }
        FieldDomain::StringArray => {
            let items: Vec<String> = match raw {
                serde_json::Value::Array(values) => values
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect(),
                serde_json::Value::String(s) => {
                    s.split([',', ';']).map(str::to_string).collect()
                }
                _ => return None,
            };

            let mut seen = Vec::new();
            let mut out = Vec::new();
            for item in items {
                let trimmed = item.trim().to_string();
                if trimmed.is_empty() {
                    continue;
                }
                let key = trimmed.to_lowercase();
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);
                out.push(trimmed);
            }
            (!out.is_empty()).then_some(FieldValue::List(out))
        }
    }
}

/// Parse an integer off the front of a string, tolerating units
/// ("180 cm", "22 years")
fn parse_leading_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema;
    use serde_json::json;

    #[test]
    fn test_enum_accepts_display_form() {
        let spec = schema::spec(FieldId::Gender);
        assert_eq!(
            normalize_value(spec, &json!("Female")),
            Some(FieldValue::Text("female".to_string()))
        );
        assert_eq!(
            normalize_value(spec, &json!(" MALE ")),
            Some(FieldValue::Text("male".to_string()))
        );
    }

    #[test]
    fn test_enum_rejects_unknown_token() {
        let spec = schema::spec(FieldId::Gender);
        assert_eq!(normalize_value(spec, &json!("dragon")), None);
    }

    #[test]
    fn test_enum_accepts_multi_word_options() {
        let spec = schema::spec(FieldId::TravelFrequency);
        assert_eq!(
            normalize_value(spec, &json!("Few times a year")),
            Some(FieldValue::Text("few_times_a_year".to_string()))
        );
    }

    #[test]
    fn test_integer_from_number_and_string() {
        let spec = schema::spec(FieldId::Age);
        assert_eq!(
            normalize_value(spec, &json!(22)),
            Some(FieldValue::Integer(22))
        );
        assert_eq!(
            normalize_value(spec, &json!("22")),
            Some(FieldValue::Integer(22))
        );

        let height = schema::spec(FieldId::HeightCm);
        assert_eq!(
            normalize_value(height, &json!("180 cm")),
            Some(FieldValue::Integer(180))
        );
    }

    #[test]
    fn test_integer_out_of_range_rejected() {
        let spec = schema::spec(FieldId::Age);
        assert_eq!(normalize_value(spec, &json!(12)), None);
        assert_eq!(normalize_value(spec, &json!(240)), None);
    }

    #[test]
    fn test_free_text_is_trimmed() {
        let spec = schema::spec(FieldId::LifeGoal);
        assert_eq!(
            normalize_value(spec, &json!("  see the world  ")),
            Some(FieldValue::Text("see the world".to_string()))
        );
        assert_eq!(normalize_value(spec, &json!("   ")), None);
    }

    #[test]
    fn test_string_array_deduplicates() {
        let spec = schema::spec(FieldId::PhysicalHobbies);
        assert_eq!(
            normalize_value(spec, &json!(["tennis", " Tennis", "swimming", ""])),
            Some(FieldValue::List(vec![
                "tennis".to_string(),
                "swimming".to_string()
            ]))
        );
    }

    #[test]
    fn test_string_array_from_comma_separated_text() {
        let spec = schema::spec(FieldId::RedFlags);
        assert_eq!(
            normalize_value(spec, &json!("smoking, rudeness")),
            Some(FieldValue::List(vec![
                "smoking".to_string(),
                "rudeness".to_string()
            ]))
        );
    }

    #[test]
    fn test_wrong_json_type_rejected() {
        assert_eq!(
            normalize_value(schema::spec(FieldId::Name), &json!(42)),
            None
        );
        assert_eq!(
            normalize_value(schema::spec(FieldId::RedFlags), &json!(42)),
            None
        );
    }
}
