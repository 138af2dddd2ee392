//! Diana - conversational profile-building engine for the Amora dating app
//!
//! This library implements the dialogue core behind Diana, the assistant
//! that interviews users and fills their dating profile from free-form
//! answers: a static field catalog, a deterministic question selector, the
//! per-turn orchestration pipeline, and the completion score that gates
//! feature access.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    completion_score, next_question, AnswerExtractor, DialogueEngine, Extraction, FieldId,
    TurnInput, TurnOutcome,
};
pub use crate::models::{ChatMessage, FieldValue, Ledger, LedgerEntry, Profile};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let question = next_question(&Profile::default(), &Ledger::new());
        assert_eq!(question.field_id, Some(FieldId::Name));
    }
}
