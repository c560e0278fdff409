//! Backend error types
//!
//! BackendError는 모델 호출 실패를 구조화된 kind로 표현합니다.
//! 재시도 여부는 메시지 문자열이 아니라 kind로 결정되며, kind 분류는
//! 전송 계층(HTTP 응답 파싱)에서 한 번만 이루어집니다.
//! counsel_foundation::Error와의 변환을 지원합니다.

use crate::retry::{RetryClassification, RetryableError};
use counsel_foundation::Error as FoundationError;
use thiserror::Error;

/// What went wrong with a backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// Too many requests (429)
    RateLimited,

    /// Backend temporarily unable to serve (503)
    Unavailable,

    /// Quota or resource budget exhausted
    QuotaExhausted,

    /// API key missing or rejected
    Authentication,

    /// Malformed or unsupported request
    InvalidRequest,

    /// Blocked by content policy
    ContentFiltered,

    /// Response could not be understood
    InvalidResponse,

    /// Connection, DNS or timeout failure
    Network,

    /// Aborted by a cancellation token
    Cancelled,

    Unknown,
}

impl BackendErrorKind {
    /// Capacity errors worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendErrorKind::RateLimited
                | BackendErrorKind::Unavailable
                | BackendErrorKind::QuotaExhausted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendErrorKind::RateLimited => "rate_limited",
            BackendErrorKind::Unavailable => "unavailable",
            BackendErrorKind::QuotaExhausted => "quota_exhausted",
            BackendErrorKind::Authentication => "authentication",
            BackendErrorKind::InvalidRequest => "invalid_request",
            BackendErrorKind::ContentFiltered => "content_filtered",
            BackendErrorKind::InvalidResponse => "invalid_response",
            BackendErrorKind::Network => "network",
            BackendErrorKind::Cancelled => "cancelled",
            BackendErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a backend call, preserving status code and message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::RateLimited, message).with_status(429)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message).with_status(503)
    }

    pub fn quota_exhausted(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::QuotaExhausted, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidRequest, message).with_status(400)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidResponse, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Network, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Cancelled, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == BackendErrorKind::Cancelled
    }

    /// Classify an HTTP failure.
    ///
    /// `api_status` is the backend's symbolic status (e.g. `RESOURCE_EXHAUSTED`).
    /// 429/503 and quota/rate-limit markers are transient; everything else is
    /// permanent.
    pub fn from_http_status(status: u16, api_status: Option<&str>, message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        let mentions_quota = lowered.contains("quota");
        let mentions_rate = ["rate limit", "rate-limit", "resource_exhausted", "too many requests"]
            .iter()
            .any(|marker| lowered.contains(marker));

        let kind = match (status, api_status) {
            (429, _) | (_, Some("RESOURCE_EXHAUSTED")) if mentions_quota => {
                BackendErrorKind::QuotaExhausted
            }
            (429, _) | (_, Some("RESOURCE_EXHAUSTED")) => BackendErrorKind::RateLimited,
            (503, _) | (_, Some("UNAVAILABLE")) => BackendErrorKind::Unavailable,
            _ if mentions_quota => BackendErrorKind::QuotaExhausted,
            _ if mentions_rate => BackendErrorKind::RateLimited,
            (401 | 403, _) | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
                BackendErrorKind::Authentication
            }
            (400 | 404, _) | (_, Some("INVALID_ARGUMENT" | "NOT_FOUND")) => {
                BackendErrorKind::InvalidRequest
            }
            _ => BackendErrorKind::Unknown,
        };

        Self::new(kind, message).with_status(status)
    }
}

impl RetryableError for BackendError {
    fn classify(&self) -> RetryClassification {
        if self.kind.is_transient() {
            RetryClassification::Retry
        } else {
            RetryClassification::NoRetry
        }
    }
}

// ============================================================================
// counsel_foundation::Error 변환
// ============================================================================

impl From<BackendError> for FoundationError {
    fn from(err: BackendError) -> Self {
        match err.kind {
            BackendErrorKind::Cancelled => FoundationError::Cancelled,
            BackendErrorKind::Network => FoundationError::Http(err.message),
            kind => FoundationError::backend(kind.as_str(), err.message),
        }
    }
}
