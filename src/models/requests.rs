use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::ChatMessage;

/// Request to process one dialogue turn.
///
/// A blank `message` fetches the current completion and category progress
/// without advancing the dialogue (used once at session start).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessTurnRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    /// Conversation history supplied by the client; loaded from the
    /// message store when absent
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
}

/// Request to restart the profile interview
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}
