//! 오케스트레이션 시나리오 테스트
//!
//! 스크립트된 인-프로세스 백엔드로 research / chat / drafting 흐름을 검증합니다.
//! 백오프 대기는 `start_paused` 가상 시간으로 진행됩니다.

use async_trait::async_trait;
use counsel_agent::prompts::{
    CASE_LAW_INSTRUCTION, CHAT_INSTRUCTION, DRAFTING_INSTRUCTION, STATUTES_INSTRUCTION,
};
use counsel_agent::research::{NO_SUMMARY, UNTITLED_SOURCE};
use counsel_agent::session::{APOLOGY, CANCELLED_NOTICE};
use counsel_agent::{AgentContext, ConversationSession, DocumentDrafter, ResearchAggregator};
use counsel_foundation::{
    CitationSource, CounselConfig, Error, ReferenceDocument, RoleKind, Speaker, TokenUsage,
    UsageAccumulator,
};
use counsel_provider::{
    BackendError, BackendTool, ContentRole, ModelBackend, ModelRequest, ModelResponse, Part,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const PRO: &str = "gemini-2.5-pro";
const FLASH: &str = "gemini-2.5-flash";
const LITE: &str = "gemini-2.5-flash-lite";

type Handler =
    Box<dyn Fn(RoleKind, &ModelRequest, usize) -> Result<ModelResponse, BackendError> + Send + Sync>;

/// Answers through `handler(role, request, prior calls with the same role and model)`
struct ScriptedBackend {
    handler: Handler,
    calls: Mutex<Vec<(RoleKind, ModelRequest)>>,
}

impl ScriptedBackend {
    fn new(
        handler: impl Fn(RoleKind, &ModelRequest, usize) -> Result<ModelResponse, BackendError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls_for(&self, role: RoleKind, model: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, req)| *r == role && req.model == model)
            .count()
    }

    fn requests(&self, role: RoleKind) -> Vec<ModelRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, req)| req.clone())
            .collect()
    }
}

fn role_of(request: &ModelRequest) -> RoleKind {
    match request.system_instruction.as_deref() {
        Some(CASE_LAW_INSTRUCTION) => RoleKind::CaseLaw,
        Some(STATUTES_INSTRUCTION) => RoleKind::Statutes,
        Some(DRAFTING_INSTRUCTION) => RoleKind::Drafting,
        Some(CHAT_INSTRUCTION) => RoleKind::Chat,
        other => panic!("unexpected system instruction: {:?}", other),
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let role = role_of(&request);
        let prior = self.calls_for(role, &request.model);
        self.calls.lock().unwrap().push((role, request.clone()));
        (self.handler)(role, &request, prior)
    }
}

/// Never answers
struct Hanging;

#[async_trait]
impl ModelBackend for Hanging {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn call(&self, _request: ModelRequest) -> Result<ModelResponse, BackendError> {
        std::future::pending().await
    }
}

fn usage(total: u64) -> TokenUsage {
    TokenUsage::new(Some(total), None, None)
}

fn context(backend: Arc<dyn ModelBackend>) -> AgentContext {
    AgentContext::new(backend, CounselConfig::new())
}

// ============================================================================
// Research
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_custody_relocation_research() {
    let backend = ScriptedBackend::new(|role, _request, _prior| match role {
        RoleKind::CaseLaw => Ok(ModelResponse::text(
            "\n  Courts weigh the child's best interests before approving relocation.  \n",
        )
        .with_usage(usage(120))
        .with_citation(Some("In re Marriage of Burgess"), "https://law.example/burgess")
        .with_citation(None, "https://law.example/relocation-survey")),
        RoleKind::Statutes => Ok(ModelResponse::text(
            "A parent must give 60 days written notice before relocating.",
        )
        .with_usage(TokenUsage::new(Some(0), Some(80), Some(30)))
        .with_citation(Some("Family Code § 7501"), "https://law.example/fc-7501")
        .with_citation(Some("Burgess (Cal. 1996)"), "https://law.example/burgess")),
        other => panic!("unexpected role {:?}", other),
    });

    let ctx = context(backend.clone());
    let accumulator = UsageAccumulator::new();
    ctx.usage.subscribe(accumulator.clone());

    let report = ResearchAggregator::new(ctx)
        .research("Notice required to relocate with a child after a custody order?")
        .await
        .unwrap();

    assert!(report.text.starts_with("# Legal Research Report"));
    assert!(report
        .text
        .contains("## Case Law\n\nCourts weigh the child's best interests before approving relocation.\n\n"));
    assert!(report
        .text
        .contains("## Statutes & Procedure\n\nA parent must give 60 days written notice before relocating."));
    assert!(report.text.ends_with("Unique sources: 3"));

    assert_eq!(
        report.sources,
        vec![
            CitationSource::new("Burgess (Cal. 1996)", "https://law.example/burgess"),
            CitationSource::new(UNTITLED_SOURCE, "https://law.example/relocation-survey"),
            CitationSource::new("Family Code § 7501", "https://law.example/fc-7501"),
        ]
    );

    // 120 (total) + 80 (total is zero, prompt wins)
    assert_eq!(accumulator.total(), 200);
    assert_eq!(accumulator.calls(), 2);

    // Both roles ground on search with their own models
    let case_law = backend.requests(RoleKind::CaseLaw);
    let statutes = backend.requests(RoleKind::Statutes);
    assert_eq!(case_law[0].model, PRO);
    assert_eq!(statutes[0].model, FLASH);
    assert_eq!(case_law[0].options.tools, vec![BackendTool::GoogleSearch]);
    assert_eq!(statutes[0].options.tools, vec![BackendTool::GoogleSearch]);
}

#[tokio::test(start_paused = true)]
async fn test_research_placeholder_for_empty_role() {
    let backend = ScriptedBackend::new(|role, _request, _prior| match role {
        RoleKind::CaseLaw => Ok(ModelResponse::text("   ")),
        _ => Ok(ModelResponse::text("Statute text.")),
    });

    let report = ResearchAggregator::new(context(backend))
        .research("adverse possession")
        .await
        .unwrap();

    assert!(report.text.contains(&format!("## Case Law\n\n{}", NO_SUMMARY)));
    assert!(report.text.ends_with("Unique sources: 0"));
    assert!(report.sources.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_research_recovers_after_transient_errors() {
    let backend = ScriptedBackend::new(|role, _request, prior| match role {
        RoleKind::CaseLaw if prior < 2 => Err(BackendError::unavailable("model overloaded")),
        _ => Ok(ModelResponse::text("ok")),
    });

    let started = Instant::now();
    let report = ResearchAggregator::new(context(backend.clone()))
        .research("statute of limitations for breach of contract")
        .await;

    assert!(report.is_ok());
    assert_eq!(backend.calls_for(RoleKind::CaseLaw, PRO), 3);
    assert_eq!(backend.calls_for(RoleKind::CaseLaw, FLASH), 0);
    assert_eq!(backend.calls_for(RoleKind::Statutes, FLASH), 1);

    // 1800ms + 3600ms of backoff, plus up to 400ms jitter each
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(5_400));
    assert!(elapsed <= Duration::from_millis(6_200));
}

#[tokio::test(start_paused = true)]
async fn test_research_roles_back_off_concurrently() {
    let backend = ScriptedBackend::new(|_role, _request, prior| {
        if prior < 2 {
            Err(BackendError::unavailable("model overloaded"))
        } else {
            Ok(ModelResponse::text("ok"))
        }
    });

    let started = Instant::now();
    let report = ResearchAggregator::new(context(backend.clone()))
        .research("wrongful eviction remedies")
        .await;

    assert!(report.is_ok());
    assert_eq!(backend.calls_for(RoleKind::CaseLaw, PRO), 3);
    assert_eq!(backend.calls_for(RoleKind::Statutes, FLASH), 3);

    // Each chain sleeps 5.4s..6.2s; run one after the other they would
    // need at least 10.8s
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(5_400));
    assert!(elapsed <= Duration::from_millis(6_200));
}

#[tokio::test(start_paused = true)]
async fn test_research_fails_when_one_role_fails() {
    let backend = ScriptedBackend::new(|role, _request, _prior| match role {
        RoleKind::Statutes => Err(BackendError::invalid_request("malformed request")),
        _ => Ok(ModelResponse::text("case law").with_usage(usage(50))),
    });

    let ctx = context(backend.clone());
    let accumulator = UsageAccumulator::new();
    ctx.usage.subscribe(accumulator.clone());

    let err = ResearchAggregator::new(ctx)
        .research("easement by necessity")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResearchUnavailable(_)));

    // Permanent error: one primary attempt, then the lite fallback once
    assert_eq!(backend.calls_for(RoleKind::Statutes, FLASH), 1);
    assert_eq!(backend.calls_for(RoleKind::Statutes, LITE), 1);

    // Tokens spent by the successful role are still reported
    assert_eq!(accumulator.total(), 50);
}

#[tokio::test(start_paused = true)]
async fn test_research_uses_fallback_after_exhaustion() {
    let backend = ScriptedBackend::new(|role, request, _prior| match (role, request.model.as_str()) {
        (RoleKind::CaseLaw, PRO) => Err(BackendError::rate_limited("slow down")),
        (RoleKind::CaseLaw, FLASH) => Ok(ModelResponse::text("fallback answer")),
        _ => Ok(ModelResponse::text("statutes")),
    });

    let report = ResearchAggregator::new(context(backend.clone()))
        .research("quiet title")
        .await
        .unwrap();

    assert!(report.text.contains("fallback answer"));
    assert_eq!(backend.calls_for(RoleKind::CaseLaw, PRO), 5);
    assert_eq!(backend.calls_for(RoleKind::CaseLaw, FLASH), 1);
}

#[tokio::test]
async fn test_research_rejects_empty_query() {
    let backend = ScriptedBackend::new(|_, _, _| Ok(ModelResponse::text("unused")));
    let err = ResearchAggregator::new(context(backend.clone()))
        .research("   ")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(backend.calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_research_cancel_in_flight() {
    let aggregator = ResearchAggregator::new(context(Arc::new(Hanging)));
    let handle = aggregator.cancel_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel_in_flight();
    });

    let err = aggregator.research("anything").await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_chat_failure_without_fallback_apologizes() {
    let backend = ScriptedBackend::new(|_, _, _| Err(BackendError::unavailable("down")));

    let mut config = CounselConfig::new();
    config.roles.chat.fallback_model = Some(String::new());
    let ctx = AgentContext::new(backend.clone(), config);

    let mut session = ConversationSession::new(ctx);
    let before = session.history().len();

    let reply = session.send("Can my landlord keep my deposit?", &[]).await;

    assert_eq!(reply, APOLOGY);
    assert_eq!(session.history().len(), before + 2);
    assert_eq!(session.history()[0].speaker, Speaker::User);
    assert_eq!(session.history()[1].text, APOLOGY);

    // max_retries + 1 attempts, no fallback model
    assert_eq!(backend.calls_for(RoleKind::Chat, PRO), 5);
    assert_eq!(backend.calls_for(RoleKind::Chat, FLASH), 0);
}

#[tokio::test(start_paused = true)]
async fn test_chat_replays_history_as_plain_text() {
    let backend = ScriptedBackend::new(|_, request, _| {
        Ok(ModelResponse::text(format!("  reply {}  ", request.contents.len())).with_usage(usage(10)))
    });

    let ctx = context(backend.clone());
    let accumulator = UsageAccumulator::new();
    ctx.usage.subscribe(accumulator.clone());

    let mut session = ConversationSession::new(ctx);
    let docs = vec![
        ReferenceDocument::text("lease.txt", "text/plain", "Deposit: $2,000."),
        ReferenceDocument::binary("photo.png", "image/png", "iVBORw0KGgo="),
    ];

    assert_eq!(session.send("What deposit did I pay?", &docs).await, "reply 1");
    assert_eq!(session.send("Is that legal?", &[]).await, "reply 3");
    assert_eq!(session.history().len(), 4);
    assert_eq!(session.history()[0].text, "What deposit did I pay?");

    let requests = backend.requests(RoleKind::Chat);

    // First turn carries the context block and the image natively
    let first = &requests[0].contents[0];
    assert!(first.text().contains("<reference_documents>"));
    assert!(first.text().ends_with("What deposit did I pay?"));
    assert!(matches!(first.parts[1], Part::InlineData { .. }));

    // Later turns replay the original text only
    let second = &requests[1];
    assert_eq!(second.contents[0].text(), "What deposit did I pay?");
    assert_eq!(second.contents[0].parts.len(), 1);
    assert_eq!(second.contents[1].role, ContentRole::Model);
    assert_eq!(second.contents[1].text(), "reply 1");
    assert_eq!(second.contents[2].text(), "Is that legal?");

    assert_eq!(accumulator.total(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_chat_falls_back_to_fast_model() {
    let backend = ScriptedBackend::new(|_, request, _| match request.model.as_str() {
        PRO => Err(BackendError::quota_exhausted("quota exceeded")),
        _ => Ok(ModelResponse::text("from flash")),
    });

    let mut session = ConversationSession::new(context(backend.clone()));
    assert_eq!(session.send("hello", &[]).await, "from flash");
    assert_eq!(backend.calls_for(RoleKind::Chat, PRO), 5);
    assert_eq!(backend.calls_for(RoleKind::Chat, FLASH), 1);
}

#[tokio::test(start_paused = true)]
async fn test_chat_cancel_records_notice() {
    let mut session = ConversationSession::new(context(Arc::new(Hanging)));
    let handle = session.cancel_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.cancel_in_flight();
    });

    assert_eq!(session.send("hello?", &[]).await, CANCELLED_NOTICE);
    assert_eq!(session.history().len(), 2);
}

// ============================================================================
// Drafting
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_draft_success_and_failure() {
    let backend = ScriptedBackend::new(|_, request, _| {
        if request.contents[0].text().contains("fail") {
            Err(BackendError::invalid_request("rejected"))
        } else {
            Ok(ModelResponse::text("\nNOTICE OF RELOCATION\n..."))
        }
    });

    let drafter = DocumentDrafter::new(context(backend.clone()));
    let docs = vec![ReferenceDocument::text("order.txt", "text/plain", "Custody order of 2023.")];

    let draft = drafter.draft("Draft a relocation notice.", &docs).await.unwrap();
    assert_eq!(draft, "NOTICE OF RELOCATION\n...");

    let request = &backend.requests(RoleKind::Drafting)[0];
    assert_eq!(request.model, PRO);
    assert!(request.contents[0].text().contains("Custody order of 2023."));
    assert!(request.options.tools.is_empty());

    let err = drafter.draft("please fail", &[]).await.unwrap_err();
    assert!(matches!(err, Error::DraftingFailed(_)));
}

// ============================================================================
// Usage observers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unsubscribed_observer_receives_nothing() {
    let backend = ScriptedBackend::new(|_, _, _| Ok(ModelResponse::text("x").with_usage(usage(7))));
    let ctx = context(backend);

    let kept = UsageAccumulator::new();
    let dropped = UsageAccumulator::new();
    ctx.usage.subscribe(kept.clone());
    let id = ctx.usage.subscribe(dropped.clone());
    assert!(ctx.usage.unsubscribe(id));

    ResearchAggregator::new(ctx.clone()).research("trespass").await.unwrap();

    assert_eq!(kept.total(), 14);
    assert_eq!(dropped.total(), 0);
}
