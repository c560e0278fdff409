//! Counsel Config - 통합 설정
//!
//! API 접속 정보, 재시도 정책, 문서 컨텍스트 한도, 역할별 모델 설정을
//! 하나의 JSON 파일로 관리합니다.

use crate::storage::{read_json, JsonStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// 설정 파일명
pub const COUNSEL_CONFIG_FILE: &str = "config.json";

/// API 키 환경변수
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";

/// Base URL 환경변수
pub const ENV_BASE_URL: &str = "COUNSEL_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 4;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1800;
pub const DEFAULT_MAX_JITTER_MS: u64 = 400;
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 14_000;

const REASONING_MODEL: &str = "gemini-2.5-pro";
const FAST_MODEL: &str = "gemini-2.5-flash";
const LITE_MODEL: &str = "gemini-2.5-flash-lite";

// ============================================================================
// Counsel Config (통합)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounselConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub context: ContextSettings,

    #[serde(default)]
    pub roles: RolesConfig,
}

impl CounselConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Default::default()
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경변수 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // global 먼저, project가 덮어씀
        let stores = [JsonStore::global(), JsonStore::current_project()];
        for store in stores.into_iter().flatten() {
            if let Some(found) = store.read::<CounselConfig>(COUNSEL_CONFIG_FILE)? {
                config.merge(found);
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// 특정 파일에서 로드 (환경변수 적용 포함)
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let mut config: CounselConfig = read_json(path)?.ok_or_else(|| {
            Error::Config(format!("Config file not found: {}", path.display()))
        })?;
        config.apply_env();
        Ok(config)
    }

    // ========================================================================
    // Merge / Environment
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: CounselConfig) {
        self.version = self.version.max(other.version);
        self.api.merge(other.api);
        self.retry.merge(other.retry);
        self.context.merge(other.context);
        self.roles.merge(other.roles);
    }

    /// 환경변수 적용
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Environment values only fill settings the files left unset
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api.api_key.is_none() {
            self.api.api_key = lookup(ENV_API_KEY).filter(|k| !k.is_empty());
        }
        if self.api.base_url.is_none() {
            self.api.base_url = lookup(ENV_BASE_URL).filter(|u| !u.is_empty());
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = Some(url.into());
        self
    }
}

// ============================================================================
// API Settings
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// 타임아웃 (초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ApiSettings {
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn effective_timeout(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    fn merge(&mut self, other: ApiSettings) {
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
    }
}

// ============================================================================
// Retry Settings
// ============================================================================

/// 재시도 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    /// Retries after the first attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,

    /// Upper bound of the random jitter added to each backoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_jitter_ms: Option<u64>,
}

impl RetrySettings {
    pub fn effective_max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn effective_base_delay_ms(&self) -> u64 {
        self.base_delay_ms.unwrap_or(DEFAULT_BASE_DELAY_MS)
    }

    pub fn effective_max_jitter_ms(&self) -> u64 {
        self.max_jitter_ms.unwrap_or(DEFAULT_MAX_JITTER_MS)
    }

    fn merge(&mut self, other: RetrySettings) {
        if other.max_retries.is_some() {
            self.max_retries = other.max_retries;
        }
        if other.base_delay_ms.is_some() {
            self.base_delay_ms = other.base_delay_ms;
        }
        if other.max_jitter_ms.is_some() {
            self.max_jitter_ms = other.max_jitter_ms;
        }
    }
}

// ============================================================================
// Context Settings
// ============================================================================

/// 문서 컨텍스트 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSettings {
    /// 문서당 최대 문자 수
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_document_chars: Option<usize>,
}

impl ContextSettings {
    pub fn effective_max_document_chars(&self) -> usize {
        self.max_document_chars.unwrap_or(DEFAULT_MAX_DOCUMENT_CHARS)
    }

    fn merge(&mut self, other: ContextSettings) {
        if other.max_document_chars.is_some() {
            self.max_document_chars = other.max_document_chars;
        }
    }
}

// ============================================================================
// Role Settings
// ============================================================================

/// Model roles used by the orchestration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    Chat,
    CaseLaw,
    Statutes,
    Drafting,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Chat => "chat",
            RoleKind::CaseLaw => "case_law",
            RoleKind::Statutes => "statutes",
            RoleKind::Drafting => "drafting",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            RoleKind::Statutes => FAST_MODEL,
            _ => REASONING_MODEL,
        }
    }

    fn default_fallback(&self) -> &'static str {
        match self {
            RoleKind::Statutes => LITE_MODEL,
            _ => FAST_MODEL,
        }
    }

    fn default_temperature(&self) -> f32 {
        match self {
            RoleKind::Chat => 0.7,
            RoleKind::CaseLaw | RoleKind::Statutes => 0.2,
            RoleKind::Drafting => 0.4,
        }
    }

    fn default_top_p(&self) -> Option<f32> {
        match self {
            RoleKind::Chat => Some(0.95),
            _ => None,
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 개별 역할 설정 (모든 필드 선택)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// An empty string disables the fallback for this role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

impl RoleSettings {
    /// Fill unset fields with the role's defaults
    pub fn resolve(&self, kind: RoleKind) -> RoleProfile {
        let fallback_model = match self.fallback_model.as_deref() {
            Some("") => None,
            Some(model) => Some(model.to_string()),
            None => Some(kind.default_fallback().to_string()),
        };

        RoleProfile {
            kind,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string()),
            fallback_model,
            temperature: self.temperature.unwrap_or_else(|| kind.default_temperature()),
            top_p: self.top_p.or_else(|| kind.default_top_p()),
            system_instruction: self.system_instruction.clone(),
        }
    }

    fn merge(&mut self, other: RoleSettings) {
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.fallback_model.is_some() {
            self.fallback_model = other.fallback_model;
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.top_p.is_some() {
            self.top_p = other.top_p;
        }
        if other.system_instruction.is_some() {
            self.system_instruction = other.system_instruction;
        }
    }
}

/// 역할별 설정 모음
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolesConfig {
    #[serde(default)]
    pub chat: RoleSettings,
    #[serde(default)]
    pub case_law: RoleSettings,
    #[serde(default)]
    pub statutes: RoleSettings,
    #[serde(default)]
    pub drafting: RoleSettings,
}

impl RolesConfig {
    pub fn settings(&self, kind: RoleKind) -> &RoleSettings {
        match kind {
            RoleKind::Chat => &self.chat,
            RoleKind::CaseLaw => &self.case_law,
            RoleKind::Statutes => &self.statutes,
            RoleKind::Drafting => &self.drafting,
        }
    }

    pub fn profile(&self, kind: RoleKind) -> RoleProfile {
        self.settings(kind).resolve(kind)
    }

    fn merge(&mut self, other: RolesConfig) {
        self.chat.merge(other.chat);
        self.case_law.merge(other.case_law);
        self.statutes.merge(other.statutes);
        self.drafting.merge(other.drafting);
    }
}

/// Fully resolved role: which model to call, its fallback and sampling
#[derive(Debug, Clone, PartialEq)]
pub struct RoleProfile {
    pub kind: RoleKind,
    pub model: String,
    pub fallback_model: Option<String>,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub system_instruction: Option<String>,
}

impl RoleProfile {
    pub fn without_fallback(mut self) -> Self {
        self.fallback_model = None;
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

fn default_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CounselConfig::new();
        assert_eq!(config.retry.effective_max_retries(), 4);
        assert_eq!(config.retry.effective_base_delay_ms(), 1800);
        assert_eq!(config.retry.effective_max_jitter_ms(), 400);
        assert_eq!(config.context.effective_max_document_chars(), 14_000);
        assert_eq!(config.api.effective_base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_merge_project_overrides_global() {
        let mut global: CounselConfig = serde_json::from_str(
            r#"{"api":{"apiKey":"global-key","timeoutSecs":60},"retry":{"maxRetries":2}}"#,
        )
        .unwrap();
        let project: CounselConfig = serde_json::from_str(
            r#"{"api":{"apiKey":"project-key"},"roles":{"chat":{"model":"custom-model"}}}"#,
        )
        .unwrap();

        global.merge(project);

        assert_eq!(global.api.api_key.as_deref(), Some("project-key"));
        assert_eq!(global.api.effective_timeout(), 60);
        assert_eq!(global.retry.effective_max_retries(), 2);
        assert_eq!(global.roles.profile(RoleKind::Chat).model, "custom-model");
    }

    #[test]
    fn test_env_fills_missing_key_only() {
        let lookup = |key: &str| match key {
            ENV_API_KEY => Some("env-key".to_string()),
            _ => None,
        };

        let mut empty = CounselConfig::new();
        empty.apply_env_with(lookup);
        assert_eq!(empty.api.api_key.as_deref(), Some("env-key"));

        let mut configured = CounselConfig::new().api_key("file-key");
        configured.apply_env_with(lookup);
        assert_eq!(configured.api.api_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_role_resolution() {
        let roles = RolesConfig::default();
        let statutes = roles.profile(RoleKind::Statutes);
        assert_eq!(statutes.model, FAST_MODEL);
        assert_eq!(statutes.fallback_model.as_deref(), Some(LITE_MODEL));

        let chat = roles.profile(RoleKind::Chat);
        assert_eq!(chat.top_p, Some(0.95));

        let disabled = RoleSettings {
            fallback_model: Some(String::new()),
            ..Default::default()
        };
        assert!(disabled.resolve(RoleKind::Drafting).fallback_model.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"context":{"maxDocumentChars":500}}"#).unwrap();

        let config = CounselConfig::load_from(&path).unwrap();
        assert_eq!(config.context.effective_max_document_chars(), 500);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = CounselConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("absent.json")));
    }
}
