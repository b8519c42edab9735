// ABOUTME: Port to the generative backend and its Anthropic-backed implementation
// ABOUTME: Structured calls return raw JSON; validation against contracts happens in the planner

use async_trait::async_trait;
use seedplan_ai::{with_retry, AIService, RetryPolicy};
use seedplan_config::PlannerConfig;
use serde_json::Value;
use tracing::info;

use crate::conversation::ConversationTurn;
use crate::error::Result;
use crate::prompts;
use crate::schema::BusinessPlan;

/// Calls the planner issues against a generative backend.
///
/// Structured calls hand back the decoded JSON untouched so that shape checking
/// is done in one place (`schema::parse_contract`) whatever the backend.
#[async_trait]
pub trait PlanBackend: Send + Sync {
    async fn analyze_intent(&self, history: &[ConversationTurn], language: &str) -> Result<Value>;

    /// Free-text, retrieval-augmented research
    async fn research(&self, query: &str) -> Result<String>;

    async fn generate_plan(
        &self,
        history: &[ConversationTurn],
        research_context: &str,
        language: &str,
    ) -> Result<Value>;

    async fn refine_plan(
        &self,
        current_plan: &BusinessPlan,
        refinement_history: &[ConversationTurn],
        instruction: &str,
    ) -> Result<Value>;

    async fn generate_script(
        &self,
        context: &str,
        tone: Option<String>,
        idea_summary: &str,
        location: &str,
    ) -> Result<Value>;

    async fn find_nearby_places(&self, category: &str, location: &str) -> Result<Value>;

    async fn verify_regulatory_detail(&self, name: &str, location: &str) -> Result<Value>;
}

/// `PlanBackend` over the Anthropic Messages API
pub struct AiPlanBackend {
    service: AIService,
    retry: RetryPolicy,
}

impl AiPlanBackend {
    pub fn new(service: AIService, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let service = AIService::from_config(config)?;
        Ok(Self::new(
            service,
            RetryPolicy::with_max_retries(config.retry_attempts),
        ))
    }

    async fn structured(&self, operation: &'static str, prompt: String) -> Result<Value> {
        let system = prompts::PLANNER_SYSTEM_PROMPT.to_string();
        let response = with_retry(&self.retry, || {
            self.service
                .generate_structured::<Value>(prompt.clone(), Some(system.clone()))
        })
        .await?;

        info!(
            operation,
            tokens = response.usage.total_tokens(),
            "Structured backend call complete"
        );
        Ok(response.data)
    }
}

#[async_trait]
impl PlanBackend for AiPlanBackend {
    async fn analyze_intent(&self, history: &[ConversationTurn], language: &str) -> Result<Value> {
        self.structured("analyze_intent", prompts::intent_prompt(history, language))
            .await
    }

    async fn research(&self, query: &str) -> Result<String> {
        let prompt = prompts::research_prompt(query);
        let system = prompts::RESEARCH_SYSTEM_PROMPT.to_string();
        let response = with_retry(&self.retry, || {
            self.service
                .generate_text_with_search(prompt.clone(), Some(system.clone()))
        })
        .await?;

        info!(
            tokens = response.usage.total_tokens(),
            chars = response.data.len(),
            "Research call complete"
        );
        Ok(response.data)
    }

    async fn generate_plan(
        &self,
        history: &[ConversationTurn],
        research_context: &str,
        language: &str,
    ) -> Result<Value> {
        self.structured(
            "generate_plan",
            prompts::plan_prompt(history, research_context, language),
        )
        .await
    }

    async fn refine_plan(
        &self,
        current_plan: &BusinessPlan,
        refinement_history: &[ConversationTurn],
        instruction: &str,
    ) -> Result<Value> {
        self.structured(
            "refine_plan",
            prompts::refine_prompt(current_plan, refinement_history, instruction),
        )
        .await
    }

    async fn generate_script(
        &self,
        context: &str,
        tone: Option<String>,
        idea_summary: &str,
        location: &str,
    ) -> Result<Value> {
        self.structured(
            "generate_script",
            prompts::script_prompt(context, tone.as_deref(), idea_summary, location),
        )
        .await
    }

    async fn find_nearby_places(&self, category: &str, location: &str) -> Result<Value> {
        self.structured("find_nearby_places", prompts::places_prompt(category, location))
            .await
    }

    async fn verify_regulatory_detail(&self, name: &str, location: &str) -> Result<Value> {
        self.structured("verify_regulatory_detail", prompts::verify_prompt(name, location))
            .await
    }
}
