// ABOUTME: Post-generation refinement of the plan through natural-language instructions
// ABOUTME: Full-plan replacement on success, untouched plan on failure, plus turn ratings

use tracing::{error, info, warn};

use crate::conversation::Rating;
use crate::error::{PlannerError, Result};
use crate::schema::{parse_contract, BusinessPlan};
use crate::session::SessionContext;

pub const REFINE_CONFIRMATION_MESSAGE: &str = "I've updated your plan with those changes.";
pub const RATING_REQUEST_MESSAGE: &str =
    "Did this change work for you? Rate it with a thumbs up or thumbs down.";
pub const REFINE_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't update the plan this time. Your current plan is unchanged.";

/// Pre-filled instruction offered after a thumbs-down
pub const ADJUSTMENT_PREFILL: &str = "That change didn't work for me. Please adjust it so that ";

#[derive(Debug)]
pub enum RefineOutcome {
    Updated(BusinessPlan),
    Failed(PlannerError),
    Discarded,
}

/// What the consumer should do after a rating was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingEffect {
    Recorded,
    /// Offer this text as the next instruction
    SuggestAdjustment(String),
}

pub(crate) struct RefinementEngine {
    ctx: SessionContext,
}

impl RefinementEngine {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub async fn refine(&self, instruction: &str) -> Result<RefineOutcome> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PlannerError::EmptyInput);
        }

        let (generation, current, history) = {
            let mut state = self.ctx.state.write().await;
            let current = state.plan()?.clone();
            if state.refining {
                warn!("Rejecting refinement while another is in flight");
                return Err(PlannerError::Busy("refinement"));
            }
            let history = state.refinement_turns.turns().to_vec();
            state.refinement_turns.push_user(instruction);
            state.refining = true;
            (state.generation, current, history)
        };
        let mut guard = self.ctx.busy_guard(generation, "refine", |state| state.refining = false);

        info!(
            session_generation = generation,
            prior_turns = history.len(),
            "Refinement started"
        );

        let result = async {
            let raw = self
                .ctx
                .call(
                    "refine_plan",
                    self.ctx.backend.refine_plan(&current, &history, instruction),
                )
                .await?;
            parse_contract::<BusinessPlan>(raw)
        }
        .await;

        let outcome = self
            .ctx
            .apply_if_current(generation, "refine", |state| {
                state.refining = false;
                match result {
                    Ok(mut updated) => {
                        if updated.vendor_scripts.is_empty() {
                            if let Some(existing) = state.plan.as_ref() {
                                updated.vendor_scripts = existing.vendor_scripts.clone();
                            }
                        }
                        info!(
                            session_generation = generation,
                            location = %updated.target_location,
                            "Plan replaced by refinement"
                        );
                        state.plan = Some(updated.clone());
                        state
                            .refinement_turns
                            .push_assistant(REFINE_CONFIRMATION_MESSAGE);
                        state.refinement_turns.push_assistant(RATING_REQUEST_MESSAGE);
                        RefineOutcome::Updated(updated)
                    }
                    Err(e) => {
                        error!(session_generation = generation, "Refinement failed: {}", e);
                        state.refinement_turns.push_assistant(REFINE_FAILURE_MESSAGE);
                        RefineOutcome::Failed(e)
                    }
                }
            })
            .await;
        guard.disarm();

        Ok(outcome.unwrap_or(RefineOutcome::Discarded))
    }

    /// Attach a rating to the most recent assistant turn of the refinement conversation
    pub async fn rate(&self, turn_index: usize, rating: Rating) -> Result<RatingEffect> {
        let mut state = self.ctx.state.write().await;
        let latest = state.refinement_turns.last_assistant_index();
        if latest.is_some_and(|latest| latest > turn_index) {
            return Err(PlannerError::InvalidTarget(format!(
                "only the latest reply can be rated, turn {} is older",
                turn_index
            )));
        }
        state.refinement_turns.rate(turn_index, rating)?;
        info!(index = turn_index, ?rating, "Refinement turn rated");

        Ok(match rating {
            Rating::Up => RatingEffect::Recorded,
            Rating::Down => RatingEffect::SuggestAdjustment(ADJUSTMENT_PREFILL.to_string()),
        })
    }
}
