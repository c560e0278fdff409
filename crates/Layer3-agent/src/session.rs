//! Conversation session
//!
//! 세션은 자신의 대화 기록을 소유합니다. `send`는 에러를 호출자에게
//! 전파하지 않으며, 최종 실패 시 고정된 사과 문구를 어시스턴트 턴으로
//! 기록합니다. 기록은 항상 사용자 턴 + 어시스턴트 턴, 2개씩 늘어납니다.

use crate::cancel::CancelHandle;
use crate::context::AgentContext;
use counsel_foundation::{ConversationTurn, ReferenceDocument, RoleKind};
use counsel_provider::{BackendError, Content, GenerationOptions, ModelResponse, Part};
use tracing::{debug, warn};
use uuid::Uuid;

/// Reply recorded when every attempt and the fallback failed
pub const APOLOGY: &str = "I'm sorry, I couldn't get an answer from the research \
service just now. Please try again in a moment.";

/// Reply recorded when the user cancelled the turn
pub const CANCELLED_NOTICE: &str = "Request cancelled.";

/// Reply recorded when the model answered with nothing
pub const EMPTY_REPLY: &str = "The model returned an empty response.";

/// A chat that owns its ordered history
#[derive(Debug)]
pub struct ConversationSession {
    id: Uuid,
    ctx: AgentContext,
    history: Vec<ConversationTurn>,
    cancel: CancelHandle,
}

impl ConversationSession {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            ctx,
            history: Vec::new(),
            cancel: CancelHandle::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel_in_flight(&self) {
        self.cancel.cancel_in_flight();
    }

    /// Send one user turn and return the assistant's reply.
    ///
    /// Documents are injected into this turn only; earlier turns replay as
    /// plain text. Failures degrade into [`APOLOGY`] instead of an error.
    pub async fn send(&mut self, user_text: &str, documents: &[ReferenceDocument]) -> String {
        let formatter = self.ctx.formatter();

        let mut parts = vec![Part::text(formatter.build_payload(documents, user_text))];
        parts.extend(formatter.binary_parts(documents));

        let reply = match self.exchange(parts).await {
            Ok(response) => {
                self.ctx.usage.record(&response.usage);
                let text = response.text.trim();
                if text.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    text.to_string()
                }
            }
            Err(e) if e.is_cancelled() => {
                debug!(session = %self.id, "Chat turn cancelled");
                CANCELLED_NOTICE.to_string()
            }
            Err(e) => {
                warn!(session = %self.id, "Chat turn failed: {}", e);
                APOLOGY.to_string()
            }
        };

        self.history.push(ConversationTurn::user(user_text));
        self.history.push(ConversationTurn::assistant(reply.clone()));
        reply
    }

    /// Open a chat on the prior history and send `parts`, with retries and
    /// the chat role's fallback model
    async fn exchange(&self, parts: Vec<Part>) -> Result<ModelResponse, BackendError> {
        let profile = self.ctx.profile(RoleKind::Chat);
        let options = GenerationOptions::for_role(&profile);
        let prior: Vec<Content> = self.history.iter().map(Content::from).collect();
        let invoker = self.ctx.invoker(&self.cancel);
        let backend = self.ctx.backend.as_ref();

        debug!(session = %self.id, turns = prior.len(), "Sending chat turn");

        let attempt = |model: &str| {
            let mut handle = backend.open_session(
                model,
                profile.system_instruction.clone(),
                prior.clone(),
                options.clone(),
            );
            let parts = parts.clone();
            async move { handle.send(parts).await }
        };

        match profile.fallback_model.as_deref() {
            Some(fallback_model) => {
                invoker
                    .invoke_with_fallback(
                        "chat",
                        || attempt(&profile.model),
                        || attempt(fallback_model),
                    )
                    .await
            }
            None => invoker.invoke("chat", || attempt(&profile.model)).await,
        }
    }
}
