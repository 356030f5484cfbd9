//! Multi-agent workflow: a supervisor routes each request to a specialist,
//! optionally passing through a prompt refiner before and a reviewer after,
//! then summarizes the outcome in its own voice.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::{AgentKind, StepUpdate, memory_context, truncate_chars};
use crate::ai::{ChatMessage, LlmClient};
use crate::core::config::AppConfig;
use crate::errors::JarvisError;
use crate::memory::MemoryManager;
use crate::prompts::{
    BACKEND_AGENT_PROMPT, DEVOPS_AGENT_PROMPT, FRONTEND_AGENT_PROMPT, PROMPT_REFINER_PROMPT,
    REVIEWER_PROMPT, ROUTING_PROMPT, SUPERVISOR_PROMPT,
};

const ROUTING_MAX_TOKENS: usize = 256;
const SUMMARY_SPECIALIST_CHARS: usize = 1000;
const SUMMARY_REVIEW_CHARS: usize = 500;

/// One workflow participant: a role prompt bound to an agent kind.
pub struct Agent {
    kind: AgentKind,
    system_prompt: &'static str,
}

impl Agent {
    #[must_use]
    pub const fn new(kind: AgentKind, system_prompt: &'static str) -> Self {
        Self {
            kind,
            system_prompt,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Invokes the agent, optionally carrying context from previous steps in
    /// the system prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn invoke(
        &self,
        client: &LlmClient,
        message: &str,
        context: Option<&str>,
    ) -> Result<String, JarvisError> {
        let system = match context {
            Some(ctx) => format!(
                "{}\n\n[Context from previous steps:]\n{}",
                self.system_prompt, ctx
            ),
            None => self.system_prompt.to_string(),
        };

        client
            .generate(&[ChatMessage::system(system), ChatMessage::user(message)])
            .await
    }
}

/// Parses a routing decision from the supervisor's raw answer.
///
/// Tolerates markdown code fences (with an optional `json` tag). A valid
/// object naming an unknown agent or `"none"` yields `None` (the supervisor
/// answers directly); malformed JSON falls back to the DevOps specialist.
#[must_use]
pub fn parse_route(raw: &str) -> Option<AgentKind> {
    let mut text = raw.trim();

    if text.starts_with("```") {
        let mut inner = text.split("```").nth(1).unwrap_or("");
        if let Some(stripped) = inner.strip_prefix("json") {
            inner = stripped;
        }
        text = inner.trim();
    }

    match serde_json::from_str::<Value>(text) {
        Ok(decision) => match decision.get("agent").and_then(Value::as_str) {
            Some("backend_agent") => Some(AgentKind::Backend),
            Some("frontend_agent") => Some(AgentKind::Frontend),
            Some("devops_agent") => Some(AgentKind::Devops),
            _ => None,
        },
        // Ambiguous answers land on infrastructure
        Err(_) => Some(AgentKind::Devops),
    }
}

/// Orchestrates the multi-agent workflow:
/// User -> Prompt Refiner -> Specialist -> Reviewer -> User
pub struct Workflow {
    client: LlmClient,
    memory: Arc<MemoryManager>,
    session_id: String,
    supervisor: Agent,
    refiner: Agent,
    backend: Agent,
    frontend: Agent,
    devops: Agent,
    reviewer: Agent,
}

impl Workflow {
    /// # Errors
    ///
    /// Returns an error when no API key is configured for the active provider.
    pub fn new(
        config: &AppConfig,
        memory: Arc<MemoryManager>,
        session_id: String,
    ) -> Result<Self, JarvisError> {
        Ok(Self {
            client: LlmClient::from_config(config)?,
            memory,
            session_id,
            supervisor: Agent::new(AgentKind::Supervisor, SUPERVISOR_PROMPT),
            refiner: Agent::new(AgentKind::PromptRefiner, PROMPT_REFINER_PROMPT),
            backend: Agent::new(AgentKind::Backend, BACKEND_AGENT_PROMPT),
            frontend: Agent::new(AgentKind::Frontend, FRONTEND_AGENT_PROMPT),
            devops: Agent::new(AgentKind::Devops, DEVOPS_AGENT_PROMPT),
            reviewer: Agent::new(AgentKind::Reviewer, REVIEWER_PROMPT),
        })
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    const fn agent(&self, kind: AgentKind) -> &Agent {
        match kind {
            AgentKind::Supervisor => &self.supervisor,
            AgentKind::PromptRefiner => &self.refiner,
            AgentKind::Backend => &self.backend,
            AgentKind::Frontend => &self.frontend,
            AgentKind::Devops => &self.devops,
            AgentKind::Reviewer => &self.reviewer,
        }
    }

    /// Determines which specialist should handle the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn route(&self, query: &str) -> Result<Option<AgentKind>, JarvisError> {
        let raw = self
            .client
            .generate_with_limit(
                &[
                    ChatMessage::system(ROUTING_PROMPT),
                    ChatMessage::user(query),
                ],
                ROUTING_MAX_TOKENS,
            )
            .await?;

        Ok(parse_route(&raw))
    }

    async fn store_exchange(&self, query: &str, response: &str) {
        if let Err(e) = self
            .memory
            .store(&self.session_id, query, response, None)
            .await
        {
            warn!("Failed to store workflow exchange: {e}");
        }
    }

    /// Answers directly from the supervisor when no specialist applies.
    async fn supervisor_direct<F>(
        &self,
        query: &str,
        memory_ctx: Option<&str>,
        on_step: &mut F,
    ) -> Result<String, JarvisError>
    where
        F: FnMut(StepUpdate),
    {
        on_step(StepUpdate::started(AgentKind::Supervisor));
        let response = self
            .supervisor
            .invoke(&self.client, query, memory_ctx)
            .await?;
        on_step(StepUpdate::finished(AgentKind::Supervisor, response.clone()));

        self.store_exchange(query, &response).await;
        Ok(response)
    }

    /// Runs the full workflow, reporting each step through `on_step`, and
    /// returns the final user-facing response.
    ///
    /// # Errors
    ///
    /// Returns an error if any provider call fails.
    pub async fn run<F>(
        &self,
        query: &str,
        skip_review: bool,
        mut on_step: F,
    ) -> Result<String, JarvisError>
    where
        F: FnMut(StepUpdate),
    {
        let memory_ctx = memory_context(&self.memory, query).await;

        // Step 1: route to determine the specialist
        let Some(target) = self.route(query).await? else {
            return self
                .supervisor_direct(query, memory_ctx.as_deref(), &mut on_step)
                .await;
        };

        let mut agents_called: Vec<AgentKind> = Vec::new();

        // Step 2: refine the prompt
        on_step(StepUpdate::started(AgentKind::PromptRefiner));
        let refined = self
            .agent(AgentKind::PromptRefiner)
            .invoke(&self.client, query, memory_ctx.as_deref())
            .await?;
        agents_called.push(AgentKind::PromptRefiner);
        on_step(StepUpdate::finished(AgentKind::PromptRefiner, refined.clone()));

        // Step 3: call the specialist with the refined request
        on_step(StepUpdate::started(target));
        let specialist_response = self
            .agent(target)
            .invoke(
                &self.client,
                &refined,
                Some(&format!("Original request: {query}")),
            )
            .await?;
        agents_called.push(target);
        on_step(StepUpdate::finished(target, specialist_response.clone()));

        // Step 4: review (optional)
        let review = if skip_review {
            None
        } else {
            on_step(StepUpdate::started(AgentKind::Reviewer));
            let review = self
                .agent(AgentKind::Reviewer)
                .invoke(
                    &self.client,
                    &format!("Review this response:\n\n{specialist_response}"),
                    Some(&format!(
                        "Original request: {query}\nRefined request: {refined}"
                    )),
                )
                .await?;
            agents_called.push(AgentKind::Reviewer);
            on_step(StepUpdate::finished(AgentKind::Reviewer, review.clone()));
            Some(review)
        };

        // Step 5: final summary from the supervisor
        let review_line = review
            .as_deref()
            .map(|r| format!("Review: {}", truncate_chars(r, SUMMARY_REVIEW_CHARS)))
            .unwrap_or_default();
        let final_prompt = format!(
            "Summarize the results for the user in your Jarvis style.\n\n\
             Original request: {query}\n\
             Specialist ({}) response: {}...\n\
             {review_line}\n\n\
             Provide a brief, elegant summary. Don't repeat the full code - just confirm \
             what was done and any key points.",
            target.wire_name(),
            truncate_chars(&specialist_response, SUMMARY_SPECIALIST_CHARS),
        );

        on_step(StepUpdate::started(AgentKind::Supervisor));
        let final_response = self.supervisor.invoke(&self.client, &final_prompt, None).await?;
        on_step(StepUpdate::finished(AgentKind::Supervisor, final_response.clone()));

        let agent_names: Vec<&str> = agents_called.iter().map(|a| a.wire_name()).collect();
        let full_response = format!(
            "[Agents: {}]\n\n{specialist_response}",
            agent_names.join(", ")
        );
        self.store_exchange(query, &full_response).await;

        Ok(final_response)
    }

    /// Runs a faster workflow (skip refiner and reviewer). Good for simple
    /// questions or when rate limited.
    ///
    /// # Errors
    ///
    /// Returns an error if any provider call fails.
    pub async fn run_fast<F>(&self, query: &str, mut on_step: F) -> Result<String, JarvisError>
    where
        F: FnMut(StepUpdate),
    {
        let memory_ctx = memory_context(&self.memory, query).await;

        let Some(target) = self.route(query).await? else {
            return self
                .supervisor_direct(query, memory_ctx.as_deref(), &mut on_step)
                .await;
        };

        on_step(StepUpdate::started(target));
        let response = self
            .agent(target)
            .invoke(&self.client, query, memory_ctx.as_deref())
            .await?;
        on_step(StepUpdate::finished(target, response.clone()));

        let full_response = format!("[Agents: {}]\n\n{response}", target.wire_name());
        self.store_exchange(query, &full_response).await;

        Ok(response)
    }
}
