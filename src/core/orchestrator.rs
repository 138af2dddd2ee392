use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::core::completion::{category_progress, completion_score};
use crate::core::extraction::{
    normalize_value, AnswerExtractor, Extraction, ExtractionContext, ExtractorError,
};
use crate::core::schema::{self, FieldId};
use crate::core::selector::next_question;
use crate::models::{
    AskedStatus, CategoryProgress, ChatMessage, FieldValue, Ledger, LedgerEntry, Profile,
    ProgressSnapshot,
};

/// Everything a turn reads: snapshots in, snapshots out. No ambient session
/// state, so the whole pipeline is testable with a scripted extractor.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub profile: Profile,
    pub ledger: Ledger,
    pub history: Vec<ChatMessage>,
    pub message: String,
}

/// Result of one dialogue turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply_text: String,
    pub profile: Profile,
    pub ledger: Ledger,
    /// Ledger rows that changed this turn, ready for a transactional upsert
    pub ledger_delta: Vec<LedgerEntry>,
    /// Normalized values written into the profile this turn
    pub updated_fields: Vec<(FieldId, FieldValue)>,
    pub completion: u8,
    pub next_field: Option<FieldId>,
    pub categories: Vec<CategoryProgress>,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
}

/// The per-turn dialogue pipeline: extract, merge, advance the ledger,
/// pick the next question, compose the reply.
///
/// Nothing here touches storage; the HTTP layer loads the snapshots and
/// persists the outcome, so a failed turn leaves user state untouched.
#[derive(Debug, Clone)]
pub struct DialogueEngine {
    max_misses: i16,
}

impl DialogueEngine {
    pub fn new(max_misses: i16) -> Self {
        Self {
            max_misses: max_misses.max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(2)
    }

    /// Progress view without advancing the dialogue. Used for the empty
    /// session-start message and for /chat/progress; performs no writes.
    pub fn status(&self, profile: &Profile, ledger: &Ledger) -> ProgressSnapshot {
        let question = next_question(profile, ledger);
        ProgressSnapshot {
            completion: completion_score(profile),
            categories: category_progress(profile, ledger),
            next_field: question.field_id,
            next_prompt: question.prompt,
        }
    }

    /// Run one full turn against an inbound user message.
    pub async fn run_turn(
        &self,
        input: TurnInput,
        extractor: &dyn AnswerExtractor,
    ) -> Result<TurnOutcome, TurnError> {
        let TurnInput {
            mut profile,
            mut ledger,
            history,
            message,
        } = input;

        let target = ledger.pending().map(|e| (e.field_id, e.misses));

        debug!(open_question = ?target.map(|(id, _)| id), "turn: extracting");
        let extraction = extractor
            .extract(ExtractionContext {
                history: &history,
                message: &message,
                profile: &profile,
                target: target.map(|(id, _)| id),
            })
            .await?;

        debug!(
            raw_updates = extraction.updates.len(),
            "turn: merging extracted values"
        );
        let now = Utc::now();
        let mut delta: Vec<LedgerEntry> = Vec::new();
        let mut updated_fields: Vec<(FieldId, FieldValue)> = Vec::new();

        for (field_id, raw) in &extraction.updates {
            let spec = schema::spec(*field_id);
            let value = match normalize_value(spec, raw) {
                Some(v) => v,
                None => {
                    // Out-of-domain answers are dropped, not surfaced
                    debug!(field = %field_id, "discarding out-of-domain value");
                    continue;
                }
            };

            let is_target = target.map(|(id, _)| id) == Some(*field_id);
            if profile.is_filled(*field_id) && !is_target {
                // A volunteered value never silently replaces an earlier
                // answer; only the field under the open question may be
                // corrected.
                continue;
            }
            if profile.set(*field_id, value.clone()).is_err() {
                continue;
            }

            let entry = LedgerEntry {
                field_id: *field_id,
                status: AskedStatus::Answered,
                misses: 0,
                asked_at: ledger.get(*field_id).map(|e| e.asked_at).unwrap_or(now),
            };
            ledger.upsert(entry.clone());
            delta.push(entry);
            updated_fields.push((*field_id, value));
        }

        // Miss bookkeeping for the open question: the first abstention
        // re-asks, the second closes the field for good.
        if let Some((target_id, misses)) = target {
            if !profile.is_filled(target_id) {
                let next_misses = misses + 1;
                let status = if next_misses >= self.max_misses {
                    AskedStatus::Skipped
                } else {
                    AskedStatus::Pending
                };
                let entry = LedgerEntry {
                    field_id: target_id,
                    status,
                    misses: next_misses,
                    asked_at: ledger.get(target_id).map(|e| e.asked_at).unwrap_or(now),
                };
                debug!(field = %target_id, misses = next_misses, ?status, "turn: abstention");
                ledger.upsert(entry.clone());
                delta.push(entry);
            }
        }

        let question = next_question(&profile, &ledger);

        // Record the open question so the next turn knows its target
        if let Some(next_id) = question.field_id {
            let entry = LedgerEntry {
                field_id: next_id,
                status: AskedStatus::Pending,
                misses: ledger.get(next_id).map(|e| e.misses).unwrap_or(0),
                asked_at: now,
            };
            ledger.upsert(entry.clone());
            delta.push(entry);
        }

        debug!(next = ?question.field_id, "turn: responding");
        let reply_text = match extraction.reply.as_deref() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => fallback_reply(&extraction, &updated_fields, target.is_some(), &question.prompt),
        };

        let completion = completion_score(&profile);
        profile.completion_score = Some(completion);
        let categories = category_progress(&profile, &ledger);

        Ok(TurnOutcome {
            reply_text,
            profile,
            ledger,
            ledger_delta: dedupe_delta(delta),
            updated_fields,
            completion,
            next_field: question.field_id,
            categories,
        })
    }
}

impl Default for DialogueEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Deterministic reply used whenever the model returned no free text. The
/// dialogue must keep moving even on an empty completion body.
fn fallback_reply(
    extraction: &Extraction,
    updated: &[(FieldId, FieldValue)],
    had_open_question: bool,
    prompt: &str,
) -> String {
    if !updated.is_empty() {
        format!("Got it! {}", prompt)
    } else if had_open_question && extraction.updates.is_empty() {
        format!("No worries, we can come back to that. {}", prompt)
    } else {
        prompt.to_string()
    }
}

/// Keep only the last change per field; later writes supersede earlier ones
/// within a single turn
fn dedupe_delta(delta: Vec<LedgerEntry>) -> Vec<LedgerEntry> {
    let mut out: Vec<LedgerEntry> = Vec::with_capacity(delta.len());
    for entry in delta {
        out.retain(|e| e.field_id != entry.field_id);
        out.push(entry);
    }
    out
}

/// Per-user turn serialization.
///
/// Two concurrent turns for one user could both append contradictory ledger
/// rows; handlers take the user's lock with try_lock and reject the second
/// message instead of racing it. Turns for different users run in parallel.
#[derive(Debug, Default)]
pub struct TurnLocks {
    inner: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
