//! Error types for Counsel
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Counsel 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Backend 관련
    // ========================================================================
    /// A model call failed after its retry/fallback chain was exhausted
    #[error("Backend error ({kind}): {message}")]
    Backend { kind: String, message: String },

    /// One of the research roles failed; no partial report is produced
    #[error("Research could not be completed: {0}")]
    ResearchUnavailable(String),

    #[error("Document drafting failed: {0}")]
    DraftingFailed(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::ResearchUnavailable(_)
                | Error::DraftingFailed(_)
                | Error::InvalidInput(_)
                | Error::Cancelled
        )
    }

    /// Backend 에러 생성 헬퍼
    pub fn backend(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing() {
        assert!(Error::ResearchUnavailable("x".into()).is_user_facing());
        assert!(Error::Cancelled.is_user_facing());
        assert!(!Error::Config("bad".into()).is_user_facing());
        assert!(!Error::backend("rate_limited", "slow down").is_user_facing());
    }

    #[test]
    fn test_backend_display() {
        let err = Error::backend("unavailable", "try later");
        assert_eq!(err.to_string(), "Backend error (unavailable): try later");
    }
}
