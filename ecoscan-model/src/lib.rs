//! Core data model definitions shared across EcoScan crates.
#![allow(missing_docs)]

pub mod account;
pub mod error;
pub mod history;
pub mod image;
pub mod outcome;
pub mod profile;
pub mod scan;

// Intentionally curated re-exports for downstream consumers.
pub use account::{ApiMessage, ChatReply, ChatRequest, Credentials, SignupRequest};
pub use error::{ModelError, Result as ModelResult};
pub use history::HistoryEntry;
pub use image::{ImageDimensions, ImageDimensionsError};
pub use outcome::{ApiOutcome, OutcomeWire, ScanOutcome};
pub use profile::{ProfileUpdate, UserProfile};
pub use scan::{
    JobState, ScanAccepted, ScanAnalysis, ScanJob, TaskEnvelope, TaskId,
    TaskStatus, TaskStatusBody,
};
