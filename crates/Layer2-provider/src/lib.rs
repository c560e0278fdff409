//! # counsel-provider
//!
//! Model backend abstraction for Counsel.
//!
//! ## Features
//! - `ModelBackend` / `ChatHandle`: single-shot calls and multi-turn chats
//! - `RetryingInvoker`: exponential backoff with jitter, then one fallback attempt
//! - Structured error kinds (`BackendErrorKind`) decide what is worth retrying
//! - Gemini REST transport with search grounding

pub mod error;
pub mod message;
pub mod providers;
pub mod retry;
pub mod r#trait;

// Core traits and types
pub use message::{Content, ContentRole, Part};
pub use r#trait::{
    BackendTool, ChatHandle, FinishReason, GenerationOptions, GroundingCitation, ModelBackend,
    ModelRequest, ModelResponse, ReplaySession,
};

// Error and retry
pub use error::{BackendError, BackendErrorKind};
pub use retry::{RetryClassification, RetryPolicy, RetryableError, RetryingInvoker};

// Backend implementations
pub use providers::gemini::GeminiBackend;
