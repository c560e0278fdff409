//! Backend trait and common types
//!
//! ## 호출 형태
//!
//! - `call`: 단일 생성 요청 (research, drafting)
//! - `open_session` + `ChatHandle::send`: 다중 턴 대화 (chat)
//!
//! 두 형태 모두 `BackendError`를 반환하며, 재시도 분류는 그 kind에 의존합니다.

use crate::error::BackendError;
use crate::message::{Content, Part};
use async_trait::async_trait;
use counsel_foundation::{RoleProfile, TokenUsage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Server-side tools a request may enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendTool {
    /// Web search grounding; responses carry citations
    GoogleSearch,
}

/// Sampling and tool options of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub tools: Vec<BackendTool>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: None,
            max_output_tokens: None,
            tools: Vec::new(),
        }
    }
}

impl GenerationOptions {
    /// Sampling options of a configured role
    pub fn for_role(profile: &RoleProfile) -> Self {
        Self {
            temperature: profile.temperature,
            top_p: profile.top_p,
            ..Default::default()
        }
    }

    pub fn with_tool(mut self, tool: BackendTool) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }
}

/// A single-shot generation request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Model ID (e.g., "gemini-2.5-pro")
    pub model: String,
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub options: GenerationOptions,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            contents,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Citation attached by search grounding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingCitation {
    pub title: Option<String>,
    pub uri: String,
}

/// Reason for completion finishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinishReason {
    /// Completed naturally
    Stop,

    /// Hit max tokens limit
    MaxTokens,

    /// Content filtered
    ContentFilter,

    /// Unknown/other
    #[default]
    Other,
}

/// Complete response of one backend call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Text content
    pub text: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Grounding citations in backend order (may repeat URIs)
    pub citations: Vec<GroundingCitation>,

    /// Finish reason
    pub finish_reason: FinishReason,

    /// Model that actually answered
    pub model: String,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: FinishReason::Stop,
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_citation(mut self, title: Option<&str>, uri: impl Into<String>) -> Self {
        self.citations.push(GroundingCitation {
            title: title.map(str::to_string),
            uri: uri.into(),
        });
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

// ============================================================================
// Backend Traits
// ============================================================================

/// Remote generative model backend
///
/// Implement this trait to add support for a new backend.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Backend name for logs (e.g., "gemini")
    fn name(&self) -> &str;

    /// Send a request and get a complete response
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, BackendError>;

    /// Open a multi-turn chat seeded with `history`.
    ///
    /// The default session replays the whole history through [`call`] on
    /// every send, which suits stateless REST backends.
    ///
    /// [`call`]: ModelBackend::call
    fn open_session(
        &self,
        model: &str,
        system_instruction: Option<String>,
        history: Vec<Content>,
        options: GenerationOptions,
    ) -> Box<dyn ChatHandle + '_> {
        Box::new(ReplaySession {
            backend: self,
            model: model.to_string(),
            system_instruction,
            history,
            options,
        })
    }
}

/// Handle to an open chat
#[async_trait]
pub trait ChatHandle: Send {
    /// Send the next user turn; the exchange joins the history on success
    async fn send(&mut self, parts: Vec<Part>) -> Result<ModelResponse, BackendError>;

    /// Turns exchanged so far, including the seed history
    fn history(&self) -> &[Content];
}

/// Chat session that resends the full history with every turn
pub struct ReplaySession<'a, B: ?Sized> {
    backend: &'a B,
    model: String,
    system_instruction: Option<String>,
    history: Vec<Content>,
    options: GenerationOptions,
}

#[async_trait]
impl<'a, B> ChatHandle for ReplaySession<'a, B>
where
    B: ModelBackend + ?Sized,
{
    async fn send(&mut self, parts: Vec<Part>) -> Result<ModelResponse, BackendError> {
        let user_turn = Content::user(parts);

        let mut contents = self.history.clone();
        contents.push(user_turn.clone());

        let mut request = ModelRequest::new(self.model.clone(), contents)
            .with_options(self.options.clone());
        request.system_instruction = self.system_instruction.clone();

        debug!(
            backend = self.backend.name(),
            model = %self.model,
            turns = request.contents.len(),
            "Sending chat turn"
        );
        let response = self.backend.call(request).await?;

        self.history.push(user_turn);
        self.history.push(Content::model_text(response.text.clone()));
        Ok(response)
    }

    fn history(&self) -> &[Content] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies with the number of contents it received
    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<ModelRequest>>,
    }

    #[async_trait]
    impl ModelBackend for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn call(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
            let reply = format!("{} turns", request.contents.len());
            self.requests.lock().unwrap().push(request);
            Ok(ModelResponse::text(reply))
        }
    }

    #[tokio::test]
    async fn test_replay_session_accumulates_history() {
        let backend = Recorder::default();
        let seed = vec![Content::user_text("hi"), Content::model_text("hello")];

        let reply = {
            let mut session = backend.open_session(
                "gemini-2.5-pro",
                Some("be brief".into()),
                seed,
                GenerationOptions::default(),
            );

            let first = session.send(vec![Part::text("one")]).await.unwrap();
            assert_eq!(first.text, "3 turns");
            assert_eq!(session.history().len(), 4);

            session.send(vec![Part::text("two")]).await.unwrap()
        };

        assert_eq!(reply.text, "5 turns");
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[1].system_instruction.as_deref(), Some("be brief"));
        assert_eq!(requests[1].contents[3].text(), "3 turns");
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history() {
        struct Failing;

        #[async_trait]
        impl ModelBackend for Failing {
            fn name(&self) -> &str {
                "failing"
            }

            async fn call(&self, _request: ModelRequest) -> Result<ModelResponse, BackendError> {
                Err(BackendError::unavailable("down"))
            }
        }

        let backend = Failing;
        let mut session =
            backend.open_session("m", None, Vec::new(), GenerationOptions::default());
        assert!(session.send(vec![Part::text("hi")]).await.is_err());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_options_for_role() {
        let profile = counsel_foundation::RolesConfig::default()
            .profile(counsel_foundation::RoleKind::Chat);
        let options = GenerationOptions::for_role(&profile)
            .with_tool(BackendTool::GoogleSearch)
            .with_tool(BackendTool::GoogleSearch);
        assert_eq!(options.temperature, profile.temperature);
        assert_eq!(options.tools.len(), 1);
    }
}
