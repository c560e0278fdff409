//! # counsel-foundation
//!
//! Foundation layer for Counsel:
//! - Core: 데이터 모델 (ReferenceDocument, ConversationTurn, CitationSource, TokenUsage)
//! - Usage: 토큰 사용량 알림 (UsageTracker + 구독 리스너)
//! - Config: 통합 설정 (CounselConfig, 역할별 모델 설정)
//! - Storage: JsonStore (설정 파일)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer3: Session / Research / Drafting                  │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  Layer2: RetryingInvoker ──▶ ModelBackend (Gemini)      │
//! │                     │                                   │
//! │                     ▼                                   │
//! │  Layer1: UsageTracker, CounselConfig, Error             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod usage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (데이터 모델)
// ============================================================================
pub use crate::core::{
    BinaryPayload, CitationSource, ConversationTurn, ReferenceDocument, Speaker, TokenUsage,
};

// ============================================================================
// Usage (사용량)
// ============================================================================
pub use usage::{ListenerId, UsageAccumulator, UsageListener, UsageTracker};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ApiSettings, ContextSettings, CounselConfig, RetrySettings, RoleKind, RoleProfile,
    RoleSettings, RolesConfig, COUNSEL_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{ConfigScope, JsonStore};
