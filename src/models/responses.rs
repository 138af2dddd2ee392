use serde::{Deserialize, Serialize};

use crate::models::domain::CategoryProgress;

/// Response for one dialogue turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTurnResponse {
    #[serde(rename = "replyText")]
    pub reply_text: String,
    #[serde(rename = "profileCompletion")]
    pub profile_completion: u8,
    /// Field values written this turn, keyed by field id
    #[serde(rename = "updatedFields")]
    pub updated_fields: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "nextField")]
    pub next_field: Option<String>,
    #[serde(rename = "categoryProgress")]
    pub category_progress: Vec<CategoryProgress>,
}

/// Response for the progress/category view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub completion: u8,
    pub categories: Vec<CategoryProgress>,
    #[serde(rename = "nextField")]
    pub next_field: Option<String>,
    #[serde(rename = "nextPrompt")]
    pub next_prompt: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Interview reset response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub success: bool,
    pub cleared: u64,
}
