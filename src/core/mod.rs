// Core engine exports
pub mod completion;
pub mod extraction;
pub mod orchestrator;
pub mod schema;
pub mod selector;

pub use completion::{category_progress, completion_score};
pub use extraction::{
    normalize_value, AnswerExtractor, Extraction, ExtractionContext, ExtractorError,
};
pub use orchestrator::{DialogueEngine, TurnError, TurnInput, TurnLocks, TurnOutcome};
pub use schema::{Category, FieldDomain, FieldId, FieldSpec};
pub use selector::{next_question, render_prompt, NextQuestion, CLOSING_PROMPT};
