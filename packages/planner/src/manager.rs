// ABOUTME: PlannerSession facade over one planning conversation
// ABOUTME: Wires the engines to shared session state and exposes every planner operation

use std::sync::Arc;
use std::time::Duration;

use seedplan_config::{ConfigError, PlannerConfig};
use tracing::info;

use crate::backend::{AiPlanBackend, PlanBackend};
use crate::checklist::{CompletionKeying, IndexKeying};
use crate::conversation::{ConversationTurn, Rating};
use crate::error::{PlannerError, Result};
use crate::export::{export_plan, ExportOptions, PagedDocument};
use crate::finance::{cash_flow, BreakEvenCalculator, CashFlowRow};
use crate::language::Language;
use crate::pipeline::{ConversationPipeline, SubmitOutcome};
use crate::places::PlaceFinder;
use crate::refinement::{RatingEffect, RefineOutcome, RefinementEngine};
use crate::schema::{BusinessPlan, PlaceResult, RegulatoryDetail, VendorScript};
use crate::scripts::ScriptWriter;
use crate::session::{PipelineState, SessionContext, SessionState};
use crate::verification::FieldVerifier;

/// Construction options for a session
pub struct PlannerOptions {
    pub language: Language,
    /// Upper bound for a single backend call, retries included
    pub call_timeout: Duration,
    pub keying: Box<dyn CompletionKeying>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        let config = PlannerConfig::default();
        Self {
            language: Language::Auto,
            call_timeout: call_budget(&config),
            keying: Box::new(IndexKeying),
        }
    }
}

impl PlannerOptions {
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let language = config
            .language
            .parse::<Language>()
            .map_err(|_| ConfigError::InvalidLanguage(config.language.clone()))?;
        Ok(Self {
            language,
            call_timeout: call_budget(config),
            keying: Box::new(IndexKeying),
        })
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_keying(mut self, keying: Box<dyn CompletionKeying>) -> Self {
        self.keying = keying;
        self
    }
}

/// Every attempt may take the full request timeout
fn call_budget(config: &PlannerConfig) -> Duration {
    config
        .request_timeout
        .saturating_mul(config.retry_attempts.saturating_add(1))
}

/// One planning conversation: submission pipeline, refinement, verification,
/// scripts, places, checklist and export over a single shared state.
pub struct PlannerSession {
    ctx: SessionContext,
    pipeline: ConversationPipeline,
    refinement: RefinementEngine,
    verifier: FieldVerifier,
    scripts: ScriptWriter,
    places: PlaceFinder,
}

impl PlannerSession {
    pub fn new(backend: Arc<dyn PlanBackend>, options: PlannerOptions) -> Self {
        let state = SessionState::new(options.language, options.keying);
        let ctx = SessionContext::new(state, backend, options.call_timeout);
        info!(
            language = %options.language,
            call_timeout = ?options.call_timeout,
            "Planner session created"
        );

        Self {
            pipeline: ConversationPipeline::new(ctx.clone()),
            refinement: RefinementEngine::new(ctx.clone()),
            verifier: FieldVerifier::new(ctx.clone()),
            scripts: ScriptWriter::new(ctx.clone()),
            places: PlaceFinder::new(ctx.clone()),
            ctx,
        }
    }

    /// Session backed by the Anthropic API
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let backend = AiPlanBackend::from_config(config)?;
        let options = PlannerOptions::from_config(config)?;
        Ok(Self::new(Arc::new(backend), options))
    }

    // ========================================================================
    // Conversation
    // ========================================================================

    /// Feed one user utterance through analysis, research and generation
    pub async fn submit(&self, utterance: &str) -> Result<SubmitOutcome> {
        self.pipeline.submit(utterance).await
    }

    pub async fn refine(&self, instruction: &str) -> Result<RefineOutcome> {
        self.refinement.refine(instruction).await
    }

    pub async fn rate(&self, turn_index: usize, rating: Rating) -> Result<RatingEffect> {
        self.refinement.rate(turn_index, rating).await
    }

    /// Rate the latest assistant reply of the refinement conversation
    pub async fn rate_latest(&self, rating: Rating) -> Result<RatingEffect> {
        let index = self
            .ctx
            .state
            .read()
            .await
            .refinement_turns
            .last_assistant_index()
            .ok_or_else(|| PlannerError::InvalidTarget("no reply to rate yet".to_string()))?;
        self.rate(index, rating).await
    }

    /// Drop conversation, plan and completion marks. In-flight results are discarded.
    pub async fn reset(&self) {
        let mut state = self.ctx.state.write().await;
        state.reset();
        info!(session_generation = state.generation, "Session reset");
    }

    pub async fn set_language(&self, language: Language) {
        self.ctx.state.write().await.language = language;
        info!(language = %language, "Language changed");
    }

    pub async fn language(&self) -> Language {
        self.ctx.state.read().await.language
    }

    pub async fn state(&self) -> PipelineState {
        self.ctx.state.read().await.pipeline.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.ctx.generation().await
    }

    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.ctx.state.read().await.turns.turns().to_vec()
    }

    pub async fn refinement_turns(&self) -> Vec<ConversationTurn> {
        self.ctx.state.read().await.refinement_turns.turns().to_vec()
    }

    pub async fn plan(&self) -> Option<BusinessPlan> {
        self.ctx.state.read().await.plan.clone()
    }

    pub async fn has_plan(&self) -> bool {
        self.ctx.state.read().await.plan.is_some()
    }

    // ========================================================================
    // Plan add-ons
    // ========================================================================

    pub async fn verify(&self, index: usize) -> Result<RegulatoryDetail> {
        self.verifier.verify(index).await
    }

    pub async fn generate_script(&self, context: &str, tone: Option<&str>) -> Result<VendorScript> {
        self.scripts.generate(context, tone).await
    }

    pub async fn regenerate_script(&self, index: usize, tone: Option<&str>) -> Result<VendorScript> {
        self.scripts.regenerate(index, tone).await
    }

    pub async fn find_nearby_places(&self, category: &str) -> Result<Vec<PlaceResult>> {
        self.places.find(category).await
    }

    // ========================================================================
    // Local, display-only derivations
    // ========================================================================

    /// Toggle completion of `setup_checklist[index]`; returns the new state
    pub async fn toggle_step(&self, index: usize) -> Result<bool> {
        let mut state = self.ctx.state.write().await;
        let items = state.plan()?.setup_checklist.clone();
        state.checklist.toggle(index, &items)
    }

    pub async fn is_step_complete(&self, index: usize) -> bool {
        let state = self.ctx.state.read().await;
        match state.plan.as_ref() {
            Some(plan) => state.checklist.is_complete(index, &plan.setup_checklist),
            None => false,
        }
    }

    pub async fn completed_steps(&self) -> usize {
        let state = self.ctx.state.read().await;
        match state.plan.as_ref() {
            Some(plan) => state.checklist.completed_count(&plan.setup_checklist),
            None => 0,
        }
    }

    pub async fn break_even_calculator(&self) -> Result<BreakEvenCalculator> {
        let state = self.ctx.state.read().await;
        Ok(BreakEvenCalculator::from_plan(state.plan()?))
    }

    pub async fn cash_flow(&self) -> Result<Vec<CashFlowRow>> {
        let state = self.ctx.state.read().await;
        Ok(cash_flow(
            &state.plan()?.financial_breakdown.financial_projections_year_1,
        ))
    }

    pub async fn export(&self, options: &ExportOptions) -> Result<PagedDocument> {
        let state = self.ctx.state.read().await;
        Ok(export_plan(state.plan()?, options))
    }
}
