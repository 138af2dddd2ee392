use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Profile, StoredMessage};

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Appwrite API client
///
/// Handles all communication with the hosted Appwrite backend:
/// - Reading and patching user profiles
/// - Appending and listing Diana conversation messages
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub profiles: String,
    pub messages: String,
}

/// A profile document: the parsed profile plus the Appwrite document id
/// needed for partial updates
#[derive(Debug, Clone)]
pub struct ProfileDocument {
    pub document_id: String,
    pub profile: Profile,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        }
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    /// Fetch the profile document for a given user ID
    pub async fn get_profile(&self, user_id: &str) -> Result<ProfileDocument, AppwriteError> {
        // Build Appwrite query format: JSON array of query strings
        let query_json = format!(r#"["userId={}"]"#, user_id);
        let encoded_query = urlencoding::encode(&query_json);

        let url = format!(
            "{}?query={}",
            self.documents_url(&self.collections.profiles),
            encoded_query
        );

        tracing::debug!("Fetching profile for user: {}", user_id);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch profile for {}: {} - {}", user_id, status, body);
            return Err(AppwriteError::ApiError(format!(
                "Failed to fetch profile: {}",
                status
            )));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        let doc = documents.first().ok_or_else(|| {
            AppwriteError::NotFound(format!("Profile not found for user {}", user_id))
        })?;

        let document_id = doc
            .get("$id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing document id".into()))?
            .to_string();

        let data = doc.get("data").unwrap_or(doc);
        let profile = serde_json::from_value(data.clone()).map_err(|e| {
            AppwriteError::InvalidResponse(format!("Failed to parse profile: {}", e))
        })?;

        Ok(ProfileDocument {
            document_id,
            profile,
        })
    }

    /// Partially update a profile document with the fields written this turn
    pub async fn update_profile(
        &self,
        document_id: &str,
        patch: &Value,
    ) -> Result<(), AppwriteError> {
        let url = format!(
            "{}/{}",
            self.documents_url(&self.collections.profiles),
            document_id
        );

        let payload = serde_json::json!({ "data": patch });

        let response = self
            .client
            .patch(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => {
                tracing::debug!("Patched profile document {}", document_id);
                Ok(())
            }
            401 => Err(AppwriteError::Unauthorized),
            404 => Err(AppwriteError::NotFound(format!(
                "Profile document {} not found",
                document_id
            ))),
            status => Err(AppwriteError::ApiError(format!(
                "Failed to update profile: {}",
                status
            ))),
        }
    }

    /// Append one conversation message
    pub async fn append_message(&self, message: &StoredMessage) -> Result<(), AppwriteError> {
        let url = self.documents_url(&self.collections.messages);

        let mut payload = serde_json::to_value(message)
            .map_err(|e| AppwriteError::InvalidResponse(e.to_string()))?;
        // Add Appwrite-specific fields
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "$id".to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }

        let response = self
            .client
            .post(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppwriteError::ApiError(format!(
                "Failed to append message: {}",
                response.status()
            )));
        }

        tracing::debug!(
            "Appended message from {} (assistant: {})",
            message.sender_id,
            message.from_assistant
        );

        Ok(())
    }

    /// List all messages where the user is sender or receiver, ordered by time
    pub async fn list_messages(&self, user_id: &str) -> Result<Vec<StoredMessage>, AppwriteError> {
        let mut messages = self
            .query_messages(&format!(r#"["senderId={}"]"#, user_id))
            .await?;
        let received = self
            .query_messages(&format!(r#"["receiverId={}"]"#, user_id))
            .await?;
        messages.extend(received);

        messages.sort_by_key(|m| m.sent_at);
        messages.dedup_by(|a, b| {
            a.sent_at == b.sent_at && a.sender_id == b.sender_id && a.content == b.content
        });

        tracing::debug!("Loaded {} messages for user {}", messages.len(), user_id);

        Ok(messages)
    }

    async fn query_messages(&self, query_json: &str) -> Result<Vec<StoredMessage>, AppwriteError> {
        let encoded_query = urlencoding::encode(query_json);
        let url = format!(
            "{}?query={}",
            self.documents_url(&self.collections.messages),
            encoded_query
        );

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppwriteError::ApiError(format!(
                "Failed to query messages: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        let messages = documents
            .iter()
            .filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                serde_json::from_value(data.clone()).ok()
            })
            .collect();

        Ok(messages)
    }
}
