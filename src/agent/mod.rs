//! Conversation agents: the single-agent simple mode and the supervisor-led
//! multi-agent workflow.

pub mod simple;
pub mod workflow;

pub use simple::SimpleAgent;
pub use workflow::{Agent, Workflow, parse_route};

use crate::memory::MemoryManager;

/// Relevance threshold below which recalled memories are not worth injecting.
const CONTEXT_RELEVANCE_THRESHOLD: f32 = 0.5;
const CONTEXT_RESULTS: usize = 3;
const CONTEXT_SNIPPET_CHARS: usize = 300;

/// The agents that can take part in a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Supervisor,
    PromptRefiner,
    Backend,
    Frontend,
    Devops,
    Reviewer,
}

impl AgentKind {
    /// Wire name used in routing decisions and memory records.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            AgentKind::Supervisor => "supervisor",
            AgentKind::PromptRefiner => "prompt_refiner",
            AgentKind::Backend => "backend_agent",
            AgentKind::Frontend => "frontend_agent",
            AgentKind::Devops => "devops_agent",
            AgentKind::Reviewer => "reviewer",
        }
    }

    /// Human-facing label for REPL step headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AgentKind::Supervisor => "Supervisor",
            AgentKind::PromptRefiner => "Prompt Refiner",
            AgentKind::Backend => "Backend Specialist",
            AgentKind::Frontend => "Frontend Specialist",
            AgentKind::Devops => "DevOps Specialist",
            AgentKind::Reviewer => "Reviewer",
        }
    }
}

/// Progress of one workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Started,
    Finished,
}

/// A workflow step report delivered to the caller as it happens.
#[derive(Debug, Clone)]
pub struct StepUpdate {
    pub agent: AgentKind,
    pub status: StepStatus,
    pub content: String,
}

impl StepUpdate {
    #[must_use]
    pub fn started(agent: AgentKind) -> Self {
        Self {
            agent,
            status: StepStatus::Started,
            content: String::new(),
        }
    }

    #[must_use]
    pub fn finished(agent: AgentKind, content: impl Into<String>) -> Self {
        Self {
            agent,
            status: StepStatus::Finished,
            content: content.into(),
        }
    }
}

/// Char-safe prefix truncation.
#[must_use]
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Retrieves relevant memory context for a query, formatted as a system block.
/// Returns `None` when nothing clears the relevance bar.
pub(crate) async fn memory_context(memory: &MemoryManager, query: &str) -> Option<String> {
    let memories = memory.recall(query, CONTEXT_RESULTS, None).await;

    let parts: Vec<String> = memories
        .iter()
        .filter(|m| m.relevance > CONTEXT_RELEVANCE_THRESHOLD)
        .map(|m| format!("- {}", truncate_chars(&m.content, CONTEXT_SNIPPET_CHARS)))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("[Relevant past context:]\n{}", parts.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("日本語のテキスト", 3), "日本語");
    }

    #[test]
    fn wire_names_match_routing_contract() {
        assert_eq!(AgentKind::Backend.wire_name(), "backend_agent");
        assert_eq!(AgentKind::Frontend.wire_name(), "frontend_agent");
        assert_eq!(AgentKind::Devops.wire_name(), "devops_agent");
    }
}
