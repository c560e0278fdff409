//! Config - 통합 설정 관리
//!
//! - `counsel.rs` - CounselConfig 통합 설정 (API, 재시도, 컨텍스트, 역할)

mod counsel;

pub use counsel::{
    ApiSettings, ContextSettings, CounselConfig, RetrySettings, RoleKind, RoleProfile,
    RoleSettings, RolesConfig, COUNSEL_CONFIG_FILE, DEFAULT_BASE_URL, DEFAULT_MAX_DOCUMENT_CHARS,
    DEFAULT_TIMEOUT_SECS, ENV_API_KEY, ENV_BASE_URL,
};
