// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AskedStatus, CategoryProgress, ChatMessage, ChatRole, DomainMismatch, FieldValue, Ledger,
    LedgerEntry, Profile, ProgressSnapshot, StoredMessage,
};
pub use requests::{ProcessTurnRequest, ResetRequest};
pub use responses::{
    ErrorResponse, HealthResponse, ProcessTurnResponse, ProgressResponse, ResetResponse,
};
