//! Agent context - shared state for every orchestration component

use crate::cancel::CancelHandle;
use crate::formatter::ContextFormatter;
use crate::prompts;
use counsel_foundation::{CounselConfig, RoleKind, RoleProfile, UsageTracker};
use counsel_provider::{
    BackendError, Content, GenerationOptions, ModelBackend, ModelRequest, ModelResponse,
    RetryPolicy, RetryingInvoker,
};
use std::sync::Arc;
use tracing::debug;

/// Context shared across research, chat and drafting
///
/// Cheap to clone: the backend, config and usage registry are shared.
#[derive(Clone)]
pub struct AgentContext {
    /// Model backend every call goes through
    pub backend: Arc<dyn ModelBackend>,

    /// Usage observers
    pub usage: UsageTracker,

    /// Effective configuration
    pub config: Arc<CounselConfig>,
}

impl AgentContext {
    /// Create a new agent context with a fresh usage tracker
    pub fn new(backend: Arc<dyn ModelBackend>, config: CounselConfig) -> Self {
        Self {
            backend,
            usage: UsageTracker::new(),
            config: Arc::new(config),
        }
    }

    /// Share an existing usage tracker
    pub fn with_usage(mut self, usage: UsageTracker) -> Self {
        self.usage = usage;
        self
    }

    /// Resolved profile for a role; built-in instructions fill the gap
    /// when the config does not set one
    pub fn profile(&self, kind: RoleKind) -> RoleProfile {
        let profile = self.config.roles.profile(kind);
        if profile.system_instruction.is_some() {
            profile
        } else {
            profile.with_system_instruction(prompts::default_instruction(kind))
        }
    }

    /// Retry policy from the `retry` config section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_settings(&self.config.retry)
    }

    /// Invoker bound to the handle's current cancellation token
    pub(crate) fn invoker(&self, cancel: &CancelHandle) -> RetryingInvoker {
        RetryingInvoker::new(self.retry_policy()).with_cancellation(cancel.current())
    }

    /// Document formatter using the `context` config section
    pub fn formatter(&self) -> ContextFormatter {
        ContextFormatter::new(self.config.context.effective_max_document_chars())
    }

    /// Single-shot call for a role: primary model with retries, then the
    /// role's fallback model once. Usage of a successful call is recorded.
    pub(crate) async fn call_role(
        &self,
        invoker: &RetryingInvoker,
        profile: &RoleProfile,
        contents: Vec<Content>,
        options: GenerationOptions,
    ) -> Result<ModelResponse, BackendError> {
        let mut request = ModelRequest::new(profile.model.clone(), contents).with_options(options);
        request.system_instruction = profile.system_instruction.clone();

        let backend = self.backend.as_ref();
        let operation = profile.kind.as_str();
        debug!(role = operation, model = %profile.model, "Calling role");

        let primary = || backend.call(request.clone());
        let response = match &profile.fallback_model {
            Some(fallback_model) => {
                let mut fallback_request = request.clone();
                fallback_request.model = fallback_model.clone();
                invoker
                    .invoke_with_fallback(operation, primary, move || {
                        backend.call(fallback_request)
                    })
                    .await?
            }
            None => invoker.invoke(operation, primary).await?,
        };

        self.usage.record(&response.usage);
        Ok(response)
    }

    /// Name of the active backend
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("backend", &self.backend.name())
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}
