//! Core Types - 공용 타입 정의
//!
//! 모든 레이어에서 공통으로 사용하는 타입들

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Reference Document - 참고 문서
// ============================================================================

/// Inline binary content of a document (already base64 encoded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryPayload {
    pub mime_type: String,
    pub base64_data: String,
}

/// A user-supplied document used as prompt context.
///
/// Owned by the document store; the orchestration core only reads it.
/// Text documents carry `text_content`, binary documents carry
/// `binary_payload` and an empty `text_content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDocument {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub text_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_payload: Option<BinaryPayload>,
    pub added_at: DateTime<Utc>,
}

impl ReferenceDocument {
    /// 텍스트 문서 생성
    pub fn text(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime_type: mime_type.into(),
            text_content: content.into(),
            binary_payload: None,
            added_at: Utc::now(),
        }
    }

    /// 바이너리 문서 생성 (PDF, 이미지 등)
    pub fn binary(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        base64_data: impl Into<String>,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime_type: mime_type.clone(),
            text_content: String::new(),
            binary_payload: Some(BinaryPayload {
                mime_type,
                base64_data: base64_data.into(),
            }),
            added_at: Utc::now(),
        }
    }

    /// Binary documents are announced by type instead of serialized as text
    pub fn is_binary(&self) -> bool {
        self.binary_payload.is_some() && self.text_content.is_empty()
    }
}

// ============================================================================
// Conversation Turn - 대화 턴
// ============================================================================

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One immutable entry of a chat transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }
}

// ============================================================================
// Citation Source - 인용 출처
// ============================================================================

/// A grounding citation; identity is the `uri`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSource {
    pub title: String,
    pub uri: String,
}

impl CitationSource {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

// ============================================================================
// Token Usage - 토큰 사용량
// ============================================================================

/// Token counts as reported by the backend for one completed call.
/// Any field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn new(total: Option<u64>, prompt: Option<u64>, candidates: Option<u64>) -> Self {
        Self {
            total_tokens: total,
            prompt_tokens: prompt,
            candidate_tokens: candidates,
        }
    }

    /// Single representative count: total, else prompt, else candidates.
    ///
    /// A field only wins when it is strictly positive, so a reported total of
    /// zero falls through to the prompt count.
    pub fn representative_count(&self) -> u64 {
        [self.total_tokens, self.prompt_tokens, self.candidate_tokens]
            .into_iter()
            .flatten()
            .find(|count| *count > 0)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representative_count_priority() {
        assert_eq!(TokenUsage::new(Some(30), Some(10), Some(20)).representative_count(), 30);
        assert_eq!(TokenUsage::new(None, Some(10), Some(20)).representative_count(), 10);
        assert_eq!(TokenUsage::new(None, None, Some(20)).representative_count(), 20);
        assert_eq!(TokenUsage::default().representative_count(), 0);
    }

    #[test]
    fn test_zero_total_falls_through() {
        let usage = TokenUsage::new(Some(0), Some(5), None);
        assert_eq!(usage.representative_count(), 5);
    }

    #[test]
    fn test_document_kinds() {
        let text = ReferenceDocument::text("brief.txt", "text/plain", "hello");
        assert!(!text.is_binary());

        let pdf = ReferenceDocument::binary("order.pdf", "application/pdf", "JVBERi0=");
        assert!(pdf.is_binary());
        assert_eq!(pdf.binary_payload.as_ref().map(|p| p.mime_type.as_str()), Some("application/pdf"));
    }

    #[test]
    fn test_turn_serde() {
        let turn = ConversationTurn::assistant("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"speaker\":\"assistant\""));
    }
}
