use crate::core::schema::{self, display_token, FieldDomain, FieldId, FieldSpec};
use crate::models::{Ledger, Profile};

/// Open-ended prompt used once every field is filled or ledgered
pub const CLOSING_PROMPT: &str = "What are you looking for in a life partner?";

/// The next question Diana asks, or the closing prompt when the interview
/// is exhausted (`field_id` is None then)
#[derive(Debug, Clone, PartialEq)]
pub struct NextQuestion {
    pub field_id: Option<FieldId>,
    pub prompt: String,
}

/// Render the question text for a field.
///
/// Enum fields carry their options inline as a single parenthesized
/// slash-delimited group, e.g. "(Male / Female / Other)" - the UI parses
/// quick-reply buttons out of exactly that shape, so no other prompt text
/// may put slashes inside parentheses.
pub fn render_prompt(spec: &FieldSpec) -> String {
    match spec.domain {
        FieldDomain::Enum(tokens) => {
            let options = tokens
                .iter()
                .map(|t| display_token(t))
                .collect::<Vec<_>>()
                .join(" / ");
            format!("{} ({})", spec.prompt, options)
        }
        _ => spec.prompt.to_string(),
    }
}

/// Deterministically pick the next unanswered field.
///
/// A still-open (pending) question is re-asked first; otherwise the catalog
/// is walked in priority order and the first field that is neither filled in
/// the profile nor closed in the ledger wins. Same state, same question -
/// retries depend on that. The orchestrator alone decides when abstentions
/// turn a pending question into a skipped one.
pub fn next_question(profile: &Profile, ledger: &Ledger) -> NextQuestion {
    if let Some(entry) = ledger.pending() {
        if !profile.is_filled(entry.field_id) {
            let spec = schema::spec(entry.field_id);
            return NextQuestion {
                field_id: Some(entry.field_id),
                prompt: render_prompt(spec),
            };
        }
    }

    for spec in schema::fields() {
        if profile.is_filled(spec.id) || ledger.is_closed(spec.id) {
            continue;
        }
        return NextQuestion {
            field_id: Some(spec.id),
            prompt: render_prompt(spec),
        };
    }

    NextQuestion {
        field_id: None,
        prompt: CLOSING_PROMPT.to_string(),
    }
}
