//! # counsel-agent
//!
//! Counsel의 오케스트레이션 계층입니다. 모든 모델 호출은
//! `RetryingInvoker`를 거치며, 사용량은 `UsageTracker`로 흘러갑니다.
//!
//! ## 핵심 컴포넌트
//!
//! - **ResearchAggregator**: 판례/법령 역할 동시 호출, 보고서 병합 (실패 시 에러)
//! - **ConversationSession**: 대화 기록 소유, 실패 시 사과 문구로 대체
//! - **DocumentDrafter**: 지시문 + 참조 문서로 문서 생성 (실패 시 에러)
//! - **ContextFormatter**: 참조 문서를 크기 제한된 텍스트 블록으로 직렬화
//!
//! ## 사용 예
//!
//! ```ignore
//! use counsel_agent::{AgentContext, ResearchAggregator};
//!
//! let ctx = AgentContext::new(backend, CounselConfig::load()?);
//! ctx.usage.subscribe(|tokens| println!("+{} tokens", tokens));
//!
//! let aggregator = ResearchAggregator::new(ctx.clone());
//! let report = aggregator.research("Notice required to relocate with a child?").await?;
//! ```

pub mod cancel;
pub mod context;
pub mod drafting;
pub mod formatter;
pub mod prompts;
pub mod research;
pub mod session;

pub use cancel::CancelHandle;
pub use context::AgentContext;
pub use drafting::DocumentDrafter;
pub use formatter::ContextFormatter;
pub use research::{ResearchAggregator, ResearchReport};
pub use session::ConversationSession;
