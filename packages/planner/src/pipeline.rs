// ABOUTME: Conversation state machine driving analysis, research and plan generation
// ABOUTME: Idle -> Analyzing -> (Idle | Researching -> Generating -> Idle), never re-entrant

use tracing::{error, info, warn};

use crate::conversation::ConversationTurn;
use crate::error::{PlannerError, Result};
use crate::language::Language;
use crate::prompts::research_query;
use crate::schema::{parse_contract, BusinessPlan, IntentAnalysis};
use crate::session::{PipelineState, SessionContext};

/// Appended to the conversation once a plan has been produced
pub const PLAN_READY_MESSAGE: &str =
    "Your business plan is ready. Ask me for any changes and I will update it.";

/// What a submission ended in
#[derive(Debug)]
pub enum SubmitOutcome {
    /// More information is needed; the question was appended to the conversation
    Clarification(String),
    /// A new plan replaced the previous one (if any)
    PlanReady(BusinessPlan),
    /// A stage failed; a failure message was appended and the previous plan kept
    Failed(PlannerError),
    /// The session was reset while the submission was in flight
    Discarded,
}

enum StageResult {
    Clarify(String),
    Plan(BusinessPlan),
}

pub(crate) struct ConversationPipeline {
    ctx: SessionContext,
}

impl ConversationPipeline {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub async fn submit(&self, utterance: &str) -> Result<SubmitOutcome> {
        let text = utterance.trim();
        if text.is_empty() {
            return Err(PlannerError::EmptyInput);
        }

        let (generation, history, language) = {
            let mut state = self.ctx.state.write().await;
            if !state.pipeline.is_idle() {
                warn!(state = %state.pipeline, "Rejecting submission while pipeline is busy");
                return Err(PlannerError::Busy("submission"));
            }
            state.turns.push_user(text);
            state.pipeline = PipelineState::Analyzing;
            (
                state.generation,
                state.turns.turns().to_vec(),
                state.language,
            )
        };
        let mut guard = self.ctx.busy_guard(generation, "submit", |state| {
            state.pipeline = PipelineState::Idle;
        });

        info!(
            session_generation = generation,
            turns = history.len(),
            state = "analyzing",
            "Submission accepted"
        );

        let result = self.run_stages(generation, &history, language).await;

        let outcome = match result {
            Err(PlannerError::Stale) => None,
            Ok(StageResult::Clarify(question)) => {
                self.ctx
                    .apply_if_current(generation, "submit", |state| {
                        state.turns.push_assistant(question.clone());
                        state.pipeline = PipelineState::Idle;
                        SubmitOutcome::Clarification(question)
                    })
                    .await
            }
            Ok(StageResult::Plan(plan)) => {
                self.ctx
                    .apply_if_current(generation, "submit", |state| {
                        state.plan = Some(plan.clone());
                        state.turns.push_assistant(PLAN_READY_MESSAGE);
                        state.pipeline = PipelineState::Idle;
                        SubmitOutcome::PlanReady(plan)
                    })
                    .await
            }
            Err(e) => {
                error!(session_generation = generation, "Plan generation failed: {}", e);
                self.ctx
                    .apply_if_current(generation, "submit", |state| {
                        state.turns.push_assistant(e.user_message());
                        state.pipeline = PipelineState::Idle;
                        SubmitOutcome::Failed(e)
                    })
                    .await
            }
        };
        guard.disarm();

        Ok(outcome.unwrap_or(SubmitOutcome::Discarded))
    }

    async fn run_stages(
        &self,
        generation: u64,
        history: &[ConversationTurn],
        language: Language,
    ) -> Result<StageResult> {
        let raw = self
            .ctx
            .call(
                "analyze_intent",
                self.ctx.backend.analyze_intent(history, language.tag()),
            )
            .await?;
        let analysis: IntentAnalysis = parse_contract(raw)?;

        if !analysis.is_sufficient {
            let question = analysis.clarification().unwrap_or_default().to_string();
            info!(session_generation = generation, "More information needed");
            return Ok(StageResult::Clarify(question));
        }

        let business = analysis.business().unwrap_or_default().to_string();
        let location = analysis.location().unwrap_or_default().to_string();
        let query = match analysis.query() {
            Some(query) => query.to_string(),
            None => research_query(&business, &location),
        };

        self.advance(
            generation,
            PipelineState::Researching {
                business: business.clone(),
                location: location.clone(),
            },
        )
        .await?;

        let research_context = self
            .ctx
            .call("research", self.ctx.backend.research(&query))
            .await?;

        self.advance(generation, PipelineState::Generating).await?;

        let target_language = language.resolve(analysis.detected_language.as_deref());
        let raw = self
            .ctx
            .call(
                "generate_plan",
                self.ctx
                    .backend
                    .generate_plan(history, &research_context, &target_language),
            )
            .await?;
        let plan: BusinessPlan = parse_contract(raw)?;

        info!(
            session_generation = generation,
            business = %business,
            location = %plan.target_location,
            legal_entries = plan.legal_requirements.len(),
            "Business plan generated"
        );
        Ok(StageResult::Plan(plan))
    }

    async fn advance(&self, generation: u64, next: PipelineState) -> Result<()> {
        info!(session_generation = generation, state = %next, "Pipeline transition");
        self.ctx
            .apply_if_current(generation, "submit", |state| state.pipeline = next)
            .await
            .ok_or(PlannerError::Stale)
    }
}
