// Service exports
pub mod appwrite;
pub mod cache;
pub mod llm;
pub mod postgres;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError, ProfileDocument};
pub use cache::{CacheError, ProgressCache};
pub use llm::{LlmClient, LlmConfig, LlmError, LlmExtractor, LlmReply};
pub use postgres::{PostgresClient, PostgresError};
