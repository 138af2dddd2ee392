use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::core::{DialogueEngine, TurnInput, TurnLocks};
use crate::models::{
    ChatMessage, ErrorResponse, HealthResponse, ProcessTurnRequest, ProcessTurnResponse,
    ProgressResponse, ProgressSnapshot, ResetRequest, ResetResponse, StoredMessage,
};
use crate::services::{AppwriteClient, LlmExtractor, PostgresClient, ProgressCache};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub appwrite: Arc<AppwriteClient>,
    pub postgres: Arc<PostgresClient>,
    pub cache: Arc<ProgressCache>,
    pub extractor: Arc<LlmExtractor>,
    pub engine: DialogueEngine,
    pub turn_locks: Arc<TurnLocks>,
}

/// Configure all chat-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/chat/turn", web::post().to(process_turn))
        .route("/chat/progress", web::get().to(get_progress))
        .route("/chat/reset", web::post().to(reset_interview));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Process one dialogue turn
///
/// POST /api/v1/chat/turn
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "message": "I'm 22",
///   "history": [{"role": "assistant", "content": "How old are you?"}]
/// }
/// ```
///
/// A blank message fetches the current progress state without advancing
/// the dialogue.
async fn process_turn(
    state: web::Data<AppState>,
    req: web::Json<ProcessTurnRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for process_turn request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let user_id = &req.user_id;

    // Session-start status fetch: no extraction, no writes
    if req.message.trim().is_empty() {
        return match snapshot_for(&state, user_id).await {
            Ok(snapshot) => HttpResponse::Ok().json(ProcessTurnResponse {
                reply_text: snapshot.next_prompt.clone(),
                profile_completion: snapshot.completion,
                updated_fields: serde_json::Map::new(),
                next_field: snapshot.next_field.map(|f| f.as_str().to_string()),
                category_progress: snapshot.categories,
            }),
            Err(response) => response,
        };
    }

    // One turn at a time per user; a second in-flight message is rejected,
    // not raced
    let lock = state.turn_locks.for_user(user_id);
    let _guard = match lock.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            tracing::info!("Rejecting concurrent turn for user {}", user_id);
            return HttpResponse::Conflict().json(ErrorResponse {
                error: "Turn in flight".to_string(),
                message: "Previous message is still being processed".to_string(),
                status_code: 409,
            });
        }
    };

    tracing::info!("Processing turn for user: {}", user_id);

    // Load profile snapshot
    let profile_doc = match state.appwrite.get_profile(user_id).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!("Failed to fetch profile for {}: {}", user_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch profile".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    // Load ledger snapshot
    let ledger = match state.postgres.get_ledger(user_id).await {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::error!("Failed to fetch ledger for {}: {}", user_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch ledger".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    // History from the client when provided, from the message store otherwise.
    // History is context only; losing it degrades extraction, not the turn.
    let history: Vec<ChatMessage> = match &req.history {
        Some(history) => history.clone(),
        None => match state.appwrite.list_messages(user_id).await {
            Ok(messages) => messages.iter().map(|m| m.as_chat_message()).collect(),
            Err(e) => {
                tracing::warn!("Failed to load history for {}, extracting without: {}", user_id, e);
                vec![]
            }
        },
    };

    let input = TurnInput {
        profile: profile_doc.profile,
        ledger,
        history,
        message: req.message.clone(),
    };

    let outcome = match state.engine.run_turn(input, state.extractor.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Nothing was written; the caller retries with the same message
            tracing::error!("Turn failed for {}: {}", user_id, e);
            return HttpResponse::BadGateway().json(ErrorResponse {
                error: "Extraction failed".to_string(),
                message: e.to_string(),
                status_code: 502,
            });
        }
    };

    // Persist: profile patch first, then the ledger transaction. If the
    // ledger write is lost the selector still skips profile-filled fields,
    // so the order is safe to re-derive from.
    if !outcome.updated_fields.is_empty() {
        let mut patch = serde_json::Map::new();
        for (field_id, value) in &outcome.updated_fields {
            patch.insert(field_id.as_str().to_string(), value.as_json());
        }
        patch.insert(
            "completionScore".to_string(),
            serde_json::json!(outcome.completion),
        );

        if let Err(e) = state
            .appwrite
            .update_profile(&profile_doc.document_id, &serde_json::Value::Object(patch))
            .await
        {
            tracing::error!("Failed to patch profile for {}: {}", user_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to persist profile".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    }

    if let Err(e) = state
        .postgres
        .apply_delta(user_id, &outcome.ledger_delta)
        .await
    {
        tracing::error!("Failed to apply ledger delta for {}: {}", user_id, e);
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to persist ledger".to_string(),
            message: e.to_string(),
            status_code: 500,
        });
    }

    // Conversation log is best-effort analytics; the turn has already
    // succeeded
    let now = Utc::now();
    let user_message = StoredMessage {
        sender_id: user_id.clone(),
        receiver_id: None,
        content: req.message.clone(),
        from_assistant: false,
        sent_at: now,
    };
    let assistant_message = StoredMessage {
        sender_id: "diana".to_string(),
        receiver_id: Some(user_id.clone()),
        content: outcome.reply_text.clone(),
        from_assistant: true,
        sent_at: now,
    };
    for message in [&user_message, &assistant_message] {
        if let Err(e) = state.appwrite.append_message(message).await {
            tracing::warn!("Failed to append conversation message: {}", e);
        }
    }

    // Progress changed; drop the cached snapshot
    if let Err(e) = state.cache.invalidate(user_id).await {
        tracing::warn!("Failed to invalidate progress cache: {}", e);
    }

    let mut updated_fields = serde_json::Map::new();
    for (field_id, value) in &outcome.updated_fields {
        updated_fields.insert(field_id.as_str().to_string(), value.as_json());
    }

    tracing::info!(
        "Turn complete for user {} ({} fields updated, completion {}%)",
        user_id,
        updated_fields.len(),
        outcome.completion
    );

    HttpResponse::Ok().json(ProcessTurnResponse {
        reply_text: outcome.reply_text,
        profile_completion: outcome.completion,
        updated_fields,
        next_field: outcome.next_field.map(|f| f.as_str().to_string()),
        category_progress: outcome.categories,
    })
}

/// Progress/category view for a user
///
/// GET /api/v1/chat/progress?userId={userId}
async fn get_progress(
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let user_id = match query.get("userId") {
        Some(id) => id,
        None => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Missing userId parameter".to_string(),
                message: "userId query parameter is required".to_string(),
                status_code: 400,
            });
        }
    };

    match snapshot_for(&state, user_id).await {
        Ok(snapshot) => HttpResponse::Ok().json(ProgressResponse {
            user_id: user_id.clone(),
            completion: snapshot.completion,
            categories: snapshot.categories,
            next_field: snapshot.next_field.map(|f| f.as_str().to_string()),
            next_prompt: snapshot.next_prompt,
        }),
        Err(response) => response,
    }
}

/// Restart the profile interview: forget which questions were asked
///
/// POST /api/v1/chat/reset
async fn reset_interview(
    state: web::Data<AppState>,
    req: web::Json<ResetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match state.postgres.clear_ledger(&req.user_id).await {
        Ok(cleared) => {
            if let Err(e) = state.cache.invalidate(&req.user_id).await {
                tracing::warn!("Failed to invalidate progress cache: {}", e);
            }
            HttpResponse::Ok().json(ResetResponse {
                success: true,
                cleared,
            })
        }
        Err(e) => {
            tracing::error!("Failed to reset interview for {}: {}", req.user_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to reset interview".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Cached progress snapshot, computed from the stores on a miss
async fn snapshot_for(
    state: &web::Data<AppState>,
    user_id: &str,
) -> Result<ProgressSnapshot, HttpResponse> {
    match state.cache.get(user_id).await {
        Ok(Some(snapshot)) => return Ok(snapshot),
        Ok(None) => {}
        Err(e) => tracing::warn!("Progress cache read failed: {}", e),
    }

    let profile_doc = state.appwrite.get_profile(user_id).await.map_err(|e| {
        tracing::error!("Failed to fetch profile for {}: {}", user_id, e);
        HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to fetch profile".to_string(),
            message: e.to_string(),
            status_code: 500,
        })
    })?;

    let ledger = state.postgres.get_ledger(user_id).await.map_err(|e| {
        tracing::error!("Failed to fetch ledger for {}: {}", user_id, e);
        HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to fetch ledger".to_string(),
            message: e.to_string(),
            status_code: 500,
        })
    })?;

    let snapshot = state.engine.status(&profile_doc.profile, &ledger);

    if let Err(e) = state.cache.put(user_id, &snapshot).await {
        tracing::warn!("Progress cache write failed: {}", e);
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }
}
