//! Research aggregation
//!
//! 판례(case law) 역할과 법령/절차(statutes) 역할을 동시에 호출하고,
//! 두 결과를 하나의 보고서로 합칩니다.
//!
//! - 두 역할은 `tokio::join!`으로 동시에 대기하며 서로를 막지 않음
//! - 어느 한쪽이라도 최종 실패하면 전체가 실패 (부분 보고서 없음)
//! - 출처는 URI 기준으로 중복 제거: 위치는 처음 등장한 곳, 값은 마지막 등장한 것

use crate::cancel::CancelHandle;
use crate::context::AgentContext;
use counsel_foundation::{CitationSource, Error, RoleKind, Result};
use counsel_provider::{BackendError, BackendTool, Content, GenerationOptions, ModelResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

pub const REPORT_HEADER: &str = "# Legal Research Report";
pub const CASE_LAW_HEADING: &str = "## Case Law";
pub const STATUTES_HEADING: &str = "## Statutes & Procedure";

/// Title used when a grounding reference has none
pub const UNTITLED_SOURCE: &str = "Untitled source";

/// Role text used when a role answered with nothing
pub const NO_SUMMARY: &str = "No summary was returned.";

/// Combined research result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub text: String,
    /// Unique by URI
    pub sources: Vec<CitationSource>,
}

/// Runs the two research roles and merges their answers
#[derive(Debug)]
pub struct ResearchAggregator {
    ctx: AgentContext,
    cancel: CancelHandle,
}

impl ResearchAggregator {
    pub fn new(ctx: AgentContext) -> Self {
        Self {
            ctx,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle that can cancel research started by this aggregator
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel_in_flight(&self) {
        self.cancel.cancel_in_flight();
    }

    /// Research `query` with both roles concurrently
    pub async fn research(&self, query: &str) -> Result<ResearchReport> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Research query is empty".into()));
        }

        let invoker = self.ctx.invoker(&self.cancel);
        let case_law = self.ctx.profile(RoleKind::CaseLaw);
        let statutes = self.ctx.profile(RoleKind::Statutes);

        info!(case_law = %case_law.model, statutes = %statutes.model, "Starting research");

        let (case_law_result, statutes_result) = tokio::join!(
            self.ctx.call_role(
                &invoker,
                &case_law,
                research_contents(query),
                GenerationOptions::for_role(&case_law).with_tool(BackendTool::GoogleSearch),
            ),
            self.ctx.call_role(
                &invoker,
                &statutes,
                research_contents(query),
                GenerationOptions::for_role(&statutes).with_tool(BackendTool::GoogleSearch),
            ),
        );

        let (case_law_response, statutes_response) = match (case_law_result, statutes_result) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => return Err(research_error(e)),
        };

        let sources = merge_sources(&case_law_response, &statutes_response);
        let text = assemble_report(&case_law_response.text, &statutes_response.text, sources.len());

        info!(sources = sources.len(), "Research complete");
        Ok(ResearchReport { text, sources })
    }
}

fn research_contents(query: &str) -> Vec<Content> {
    vec![Content::user_text(format!("Legal research question:\n{}", query))]
}

fn research_error(error: BackendError) -> Error {
    if error.is_cancelled() {
        return Error::Cancelled;
    }
    warn!("Research failed: {}", error);
    Error::ResearchUnavailable(error.to_string())
}

/// Citation candidates of one response, in backend order
fn citation_candidates(response: &ModelResponse) -> impl Iterator<Item = CitationSource> + '_ {
    response
        .citations
        .iter()
        .filter(|c| !c.uri.is_empty())
        .map(|c| {
            let title = c
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(UNTITLED_SOURCE);
            CitationSource::new(title, c.uri.clone())
        })
}

/// Union of both roles' sources, unique by URI.
///
/// A repeated URI keeps the slot where it first appeared and takes the
/// value of its last appearance.
fn merge_sources(first: &ModelResponse, second: &ModelResponse) -> Vec<CitationSource> {
    let mut merged: Vec<CitationSource> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for source in citation_candidates(first).chain(citation_candidates(second)) {
        match index.get(&source.uri) {
            Some(&slot) => merged[slot] = source,
            None => {
                index.insert(source.uri.clone(), merged.len());
                merged.push(source);
            }
        }
    }

    merged
}

fn assemble_report(case_law: &str, statutes: &str, source_count: usize) -> String {
    fn or_placeholder(text: &str) -> &str {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            NO_SUMMARY
        } else {
            trimmed
        }
    }

    format!(
        "{}\n\n{}\n\n{}\n\n{}\n\n{}\n\n---\nUnique sources: {}",
        REPORT_HEADER,
        CASE_LAW_HEADING,
        or_placeholder(case_law),
        STATUTES_HEADING,
        or_placeholder(statutes),
        source_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_first_position_last_value() {
        let first = ModelResponse::text("a")
            .with_citation(Some("Smith v. Jones"), "https://law.example/smith")
            .with_citation(None, "https://law.example/untitled")
            .with_citation(Some("Dropped"), "");
        let second = ModelResponse::text("b")
            .with_citation(Some("Custody Code § 7"), "https://law.example/code")
            .with_citation(Some("Smith v. Jones (2019)"), "https://law.example/smith");

        let merged = merge_sources(&first, &second);

        assert_eq!(
            merged,
            vec![
                CitationSource::new("Smith v. Jones (2019)", "https://law.example/smith"),
                CitationSource::new(UNTITLED_SOURCE, "https://law.example/untitled"),
                CitationSource::new("Custody Code § 7", "https://law.example/code"),
            ]
        );
    }

    #[test]
    fn test_report_layout() {
        let report = assemble_report("  Holdings here.\n", "", 3);

        assert_eq!(
            report,
            "# Legal Research Report\n\n## Case Law\n\nHoldings here.\n\n\
             ## Statutes & Procedure\n\nNo summary was returned.\n\n---\nUnique sources: 3"
        );
    }

    #[test]
    fn test_cancelled_maps_to_cancelled() {
        assert!(matches!(
            research_error(BackendError::cancelled("stop")),
            Error::Cancelled
        ));
        assert!(matches!(
            research_error(BackendError::unavailable("down")),
            Error::ResearchUnavailable(_)
        ));
    }
}
