//! Document drafting
//!
//! 지시문과 참조 문서로 문서 한 편을 생성합니다. 실패는 연구와 마찬가지로
//! 호출자에게 그대로 전달됩니다 (`Error::DraftingFailed`).

use crate::cancel::CancelHandle;
use crate::context::AgentContext;
use counsel_foundation::{Error, ReferenceDocument, Result, RoleKind};
use counsel_provider::{Content, GenerationOptions, Part};
use tracing::{info, warn};

/// Single-shot drafting on the drafting role
#[derive(Debug)]
pub struct DocumentDrafter {
    ctx: AgentContext,
    cancel: CancelHandle,
}

impl DocumentDrafter {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            cancel: CancelHandle::new(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel_in_flight(&self) {
        self.cancel.cancel_in_flight();
    }

    /// Draft a document from `instructions` and the reference documents
    pub async fn draft(&self, instructions: &str, documents: &[ReferenceDocument]) -> Result<String> {
        if instructions.trim().is_empty() {
            return Err(Error::InvalidInput("Drafting instructions are empty".into()));
        }

        let formatter = self.ctx.formatter();
        let mut parts = vec![Part::text(formatter.build_payload(documents, instructions))];
        parts.extend(formatter.binary_parts(documents));

        let profile = self.ctx.profile(RoleKind::Drafting);
        let invoker = self.ctx.invoker(&self.cancel);

        info!(model = %profile.model, documents = documents.len(), "Drafting document");

        let response = self
            .ctx
            .call_role(
                &invoker,
                &profile,
                vec![Content::user(parts)],
                GenerationOptions::for_role(&profile),
            )
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    Error::Cancelled
                } else {
                    warn!("Drafting failed: {}", e);
                    Error::DraftingFailed(e.to_string())
                }
            })?;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(Error::DraftingFailed("The model returned an empty draft".into()));
        }
        Ok(text.to_string())
    }
}
