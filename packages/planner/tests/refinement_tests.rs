// ABOUTME: Integration tests for plan refinement and turn ratings
// ABOUTME: Full-plan replacement, failure handling, vendor script preservation and rating effects

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use pretty_assertions::assert_eq;
use seedplan_planner::{
    Contract, PlannerError, Rating, RatingEffect, RefineOutcome, Role, ADJUSTMENT_PREFILL,
    RATING_REQUEST_MESSAGE, REFINE_CONFIRMATION_MESSAGE, REFINE_FAILURE_MESSAGE,
};
use serde_json::json;
use tokio::sync::Notify;

// ============================================================================
// Replacement
// ============================================================================

#[tokio::test]
async fn test_reduce_startup_cost_lowers_budget() {
    let mut cheaper = coffee_plan();
    cheaper["budget_estimate"] = json!({"min": 240000, "max": 400000, "currency": "INR"});
    cheaper["market_insights"]["rental_costs"] = json!(["Shared kiosk near Forum Mall: ₹25,000/month"]);

    let (session, backend) = planned_session(ScriptedBackend::new().refinement(cheaper)).await;
    let before = session.plan().await.unwrap();

    let outcome = session.refine("reduce startup cost by 20%").await.unwrap();
    let after = match outcome {
        RefineOutcome::Updated(plan) => plan,
        other => panic!("expected updated plan, got {other:?}"),
    };

    assert!(after.budget_estimate.max < before.budget_estimate.max);
    assert_eq!(after.target_location, before.target_location);
    assert!(!after.market_insights.competitors.is_empty());
    assert!(!after.market_insights.local_trends.is_empty());
    assert_eq!(session.plan().await.unwrap(), after);

    let recorded = backend.recorded();
    assert_eq!(recorded.refine_instructions, vec!["reduce startup cost by 20%".to_string()]);
    assert!(recorded.refine_histories[0].is_empty());

    let turns = session.refinement_turns().await;
    let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "reduce startup cost by 20%",
            REFINE_CONFIRMATION_MESSAGE,
            RATING_REQUEST_MESSAGE
        ]
    );
    // The original conversation is untouched by refinement
    assert_eq!(session.turns().await.len(), 2);
    println!("✓ Refinement replaced the plan with a cheaper one");
}

#[tokio::test]
async fn test_no_op_refinement_still_satisfies_invariants() {
    let (session, _backend) = planned_session(ScriptedBackend::new().refinement(coffee_plan())).await;
    let before = session.plan().await.unwrap();

    let outcome = session.refine("no changes needed").await.unwrap();
    let after = match outcome {
        RefineOutcome::Updated(plan) => plan,
        other => panic!("expected updated plan, got {other:?}"),
    };

    after.check_invariants().unwrap();
    after.validate().unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_later_refinements_see_earlier_turns() {
    let (session, backend) = planned_session(
        ScriptedBackend::new()
            .refinement(coffee_plan())
            .refinement(coffee_plan()),
    )
    .await;

    session.refine("add a breakfast menu").await.unwrap();
    session.refine("move to Indiranagar").await.unwrap();

    let histories = backend.recorded().refine_histories;
    assert_eq!(histories.len(), 2);
    assert_eq!(histories[1].len(), 3);
    assert_eq!(histories[1][0].text, "add a breakfast menu");
    assert_eq!(histories[1][0].role, Role::User);
}

#[tokio::test]
async fn test_refinement_keeps_local_vendor_scripts_when_omitted() {
    let (session, _backend) = planned_session(
        ScriptedBackend::new()
            .script(json!({"context": "Milk supplier", "script": "Can we agree on ₹48 per litre?"}))
            .refinement(coffee_plan()),
    )
    .await;

    session.generate_script("Milk supplier", None).await.unwrap();
    session.refine("make the menu smaller").await.unwrap();

    let plan = session.plan().await.unwrap();
    assert_eq!(plan.vendor_scripts.len(), 1);
    assert_eq!(plan.vendor_scripts[0].context, "Milk supplier");
}

// ============================================================================
// Failures and preconditions
// ============================================================================

#[tokio::test]
async fn test_failed_refinement_leaves_plan_unchanged() {
    let (session, _backend) = planned_session(
        ScriptedBackend::new().refinement_error(PlannerError::Parse("not json".into())),
    )
    .await;
    let before = session.plan().await.unwrap();

    let outcome = session.refine("switch to tea").await.unwrap();
    assert!(matches!(outcome, RefineOutcome::Failed(PlannerError::Parse(_))));
    assert_eq!(session.plan().await.unwrap(), before);

    let turns = session.refinement_turns().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].text, REFINE_FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_refinement_with_invalid_projection_is_rejected() {
    let mut broken = coffee_plan();
    broken["financial_breakdown"]["financial_projections_year_1"] =
        json!([{"month": 13, "revenue": 1, "expense": 1, "profit": 0}]);
    let (session, _backend) = planned_session(ScriptedBackend::new().refinement(broken)).await;
    let before = session.plan().await.unwrap();

    let outcome = session.refine("extend projections").await.unwrap();
    assert!(matches!(
        outcome,
        RefineOutcome::Failed(PlannerError::SchemaViolation { .. })
    ));
    assert_eq!(session.plan().await.unwrap(), before);
}

#[tokio::test]
async fn test_refine_requires_plan_and_text() {
    let backend = std::sync::Arc::new(ScriptedBackend::new());
    let session = session_with(backend.clone());

    assert!(matches!(
        session.refine("cheaper please").await.unwrap_err(),
        PlannerError::NoPlan
    ));
    assert!(matches!(
        session.refine("  ").await.unwrap_err(),
        PlannerError::EmptyInput
    ));
    assert!(backend.recorded().calls.is_empty());
}

// ============================================================================
// Reset and cancellation
// ============================================================================

#[tokio::test]
async fn test_refinement_finishing_after_reset_is_discarded() {
    let gate = Arc::new(Notify::new());
    let (session, backend) = planned_session(
        ScriptedBackend::new()
            .refinement(coffee_plan())
            .gate("refine_plan", gate.clone()),
    )
    .await;
    let session = Arc::new(session);

    let running = {
        let session = session.clone();
        tokio::spawn(async move { session.refine("Move it to Indiranagar").await })
    };
    backend.wait_for_calls("refine_plan", 1).await;

    session.reset().await;
    gate.notify_one();

    let outcome = running.await.unwrap().unwrap();
    assert!(matches!(outcome, RefineOutcome::Discarded));
    assert!(!session.has_plan().await, "stale refinement recreated a plan");
    assert!(session.refinement_turns().await.is_empty());
}

#[tokio::test]
async fn test_cancelled_refinement_can_be_retried() {
    let gate = Arc::new(Notify::new());
    let (session, _backend) = planned_session(
        ScriptedBackend::new()
            .refinement(coffee_plan())
            .gate("refine_plan", gate.clone()),
    )
    .await;

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        session.refine("Add a cold brew menu"),
    )
    .await;
    assert!(cancelled.is_err(), "gated refinement should not finish");

    gate.notify_one();
    let outcome = session.refine("Add a cold brew menu").await.unwrap();
    assert!(matches!(outcome, RefineOutcome::Updated(_)));
}

// ============================================================================
// Ratings
// ============================================================================

#[tokio::test]
async fn test_thumbs_down_suggests_adjustment() {
    let (session, _backend) = planned_session(ScriptedBackend::new().refinement(coffee_plan())).await;
    session.refine("cheaper rent").await.unwrap();

    let effect = session.rate_latest(Rating::Down).await.unwrap();
    assert_eq!(effect, RatingEffect::SuggestAdjustment(ADJUSTMENT_PREFILL.to_string()));

    let turns = session.refinement_turns().await;
    assert_eq!(turns[2].rating, Some(Rating::Down));
    assert_eq!(turns[1].rating, None);
}

#[tokio::test]
async fn test_only_latest_assistant_turn_can_be_rated() {
    let (session, _backend) = planned_session(ScriptedBackend::new().refinement(coffee_plan())).await;
    session.refine("cheaper rent").await.unwrap();

    assert!(matches!(
        session.rate(0, Rating::Up).await.unwrap_err(),
        PlannerError::InvalidTarget(_)
    ));
    assert!(matches!(
        session.rate(1, Rating::Up).await.unwrap_err(),
        PlannerError::InvalidTarget(_)
    ));
    assert_eq!(session.rate(2, Rating::Up).await.unwrap(), RatingEffect::Recorded);
    assert!(matches!(
        session.rate(9, Rating::Up).await.unwrap_err(),
        PlannerError::IndexOutOfRange { index: 9, len: 3 }
    ));
}
