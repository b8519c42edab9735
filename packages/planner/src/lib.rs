// ABOUTME: Conversational business-plan orchestrator
// ABOUTME: Turns a free-form idea into a validated plan and refines it through follow-up requests

pub mod backend;
pub mod checklist;
pub mod conversation;
pub mod error;
pub mod export;
pub mod finance;
pub mod language;
pub mod manager;
pub mod pipeline;
pub mod places;
pub mod prompts;
pub mod refinement;
pub mod schema;
pub mod scripts;
pub mod session;
pub mod verification;

#[cfg(test)]
mod test_support;

pub use backend::{AiPlanBackend, PlanBackend};
pub use checklist::{ChecklistTracker, CompletionKeying, ContentKeying, IndexKeying};
pub use conversation::{ConversationTurn, Rating, Role, TurnLog};
pub use error::{PlannerError, Result, GENERIC_FAILURE_MESSAGE, TIMEOUT_FAILURE_MESSAGE};
pub use export::{export_plan, ExportOptions, Page, PagedDocument, SECTION_ORDER};
pub use finance::{
    break_even_units, cash_flow, extract_leading_number, parse_amount, payback_month, Amount,
    BreakEven, BreakEvenCalculator, CashFlowRow,
};
pub use language::Language;
pub use manager::{PlannerOptions, PlannerSession};
pub use pipeline::{SubmitOutcome, PLAN_READY_MESSAGE};
pub use places::map_query;
pub use refinement::{
    RatingEffect, RefineOutcome, ADJUSTMENT_PREFILL, RATING_REQUEST_MESSAGE,
    REFINE_CONFIRMATION_MESSAGE, REFINE_FAILURE_MESSAGE,
};
pub use schema::{
    parse_contract, parse_contract_text, BudgetEstimate, BusinessPlan, Contract,
    FinancialBreakdown, IntentAnalysis, MarketInsights, MonthlyProjection, NearbyPlaces,
    PlaceResult, RegulatoryDetail, RegulatoryPatch, VendorScript, VendorScriptDraft,
};
pub use session::PipelineState;
