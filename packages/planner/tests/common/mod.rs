// ABOUTME: Scripted in-memory backend and plan fixtures shared by the planner integration tests
// ABOUTME: Each backend call pops the next scripted reply and records the arguments it received

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use seedplan_planner::{
    BusinessPlan, ConversationTurn, PlanBackend, PlannerError, PlannerOptions, PlannerSession,
    Result,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

type Queue<T> = Mutex<VecDeque<Result<T>>>;

fn pop<T>(queue: &Queue<T>, operation: &str) -> Result<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(PlannerError::BackendCall(format!("no scripted reply for {operation}"))))
}

/// Arguments seen by the backend, in call order
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub calls: Vec<&'static str>,
    pub intent_histories: Vec<Vec<ConversationTurn>>,
    pub intent_languages: Vec<String>,
    pub research_queries: Vec<String>,
    pub plan_languages: Vec<String>,
    pub plan_research: Vec<String>,
    pub refine_histories: Vec<Vec<ConversationTurn>>,
    pub refine_instructions: Vec<String>,
    pub script_requests: Vec<(String, Option<String>)>,
    pub place_requests: Vec<(String, String)>,
    pub verify_requests: Vec<(String, String)>,
}

#[derive(Default)]
pub struct ScriptedBackend {
    intents: Queue<Value>,
    research: Queue<String>,
    plans: Queue<Value>,
    refinements: Queue<Value>,
    scripts: Queue<Value>,
    places: Queue<Value>,
    verifications: Queue<Value>,
    recorded: Mutex<Recorded>,
    /// Operations that wait for a notification before answering
    gates: HashMap<&'static str, Arc<Notify>>,
    /// When set, `analyze_intent` sleeps this long before answering
    intent_delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent(self, reply: Value) -> Self {
        self.intents.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn intent_error(self, err: PlannerError) -> Self {
        self.intents.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn research(self, text: &str) -> Self {
        self.research.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn plan(self, reply: Value) -> Self {
        self.plans.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn plan_error(self, err: PlannerError) -> Self {
        self.plans.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn refinement(self, reply: Value) -> Self {
        self.refinements.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn refinement_error(self, err: PlannerError) -> Self {
        self.refinements.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn script(self, reply: Value) -> Self {
        self.scripts.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn places(self, reply: Value) -> Self {
        self.places.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn verification(self, reply: Value) -> Self {
        self.verifications.lock().unwrap().push_back(Ok(reply));
        self
    }

    /// Hold `operation` after it is recorded until `gate` is notified
    pub fn gate(mut self, operation: &'static str, gate: Arc<Notify>) -> Self {
        self.gates.insert(operation, gate);
        self
    }

    pub fn gate_plan(self, gate: Arc<Notify>) -> Self {
        self.gate("generate_plan", gate)
    }

    pub fn delay_intent(mut self, delay: Duration) -> Self {
        self.intent_delay = Some(delay);
        self
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }

    fn record(&self, update: impl FnOnce(&mut Recorded)) {
        update(&mut self.recorded.lock().unwrap());
    }

    async fn pass_gate(&self, operation: &str) {
        if let Some(gate) = self.gates.get(operation) {
            gate.notified().await;
        }
    }

    /// Wait until `operation` has been called `times` times
    pub async fn wait_for_calls(&self, operation: &str, times: usize) {
        for _ in 0..200 {
            let seen = self.recorded().calls.iter().filter(|c| **c == operation).count();
            if seen >= times {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{operation} was never called {times} time(s)");
    }
}

#[async_trait]
impl PlanBackend for ScriptedBackend {
    async fn analyze_intent(&self, history: &[ConversationTurn], language: &str) -> Result<Value> {
        self.record(|r| {
            r.calls.push("analyze_intent");
            r.intent_histories.push(history.to_vec());
            r.intent_languages.push(language.to_string());
        });
        if let Some(delay) = self.intent_delay {
            tokio::time::sleep(delay).await;
        }
        pop(&self.intents, "analyze_intent")
    }

    async fn research(&self, query: &str) -> Result<String> {
        self.record(|r| {
            r.calls.push("research");
            r.research_queries.push(query.to_string());
        });
        pop(&self.research, "research")
    }

    async fn generate_plan(
        &self,
        _history: &[ConversationTurn],
        research_context: &str,
        language: &str,
    ) -> Result<Value> {
        self.record(|r| {
            r.calls.push("generate_plan");
            r.plan_languages.push(language.to_string());
            r.plan_research.push(research_context.to_string());
        });
        self.pass_gate("generate_plan").await;
        pop(&self.plans, "generate_plan")
    }

    async fn refine_plan(
        &self,
        _current_plan: &BusinessPlan,
        refinement_history: &[ConversationTurn],
        instruction: &str,
    ) -> Result<Value> {
        self.record(|r| {
            r.calls.push("refine_plan");
            r.refine_histories.push(refinement_history.to_vec());
            r.refine_instructions.push(instruction.to_string());
        });
        self.pass_gate("refine_plan").await;
        pop(&self.refinements, "refine_plan")
    }

    async fn generate_script(
        &self,
        context: &str,
        tone: Option<String>,
        _idea_summary: &str,
        _location: &str,
    ) -> Result<Value> {
        self.record(|r| {
            r.calls.push("generate_script");
            r.script_requests.push((context.to_string(), tone.clone()));
        });
        self.pass_gate("generate_script").await;
        pop(&self.scripts, "generate_script")
    }

    async fn find_nearby_places(&self, category: &str, location: &str) -> Result<Value> {
        self.record(|r| {
            r.calls.push("find_nearby_places");
            r.place_requests.push((category.to_string(), location.to_string()));
        });
        pop(&self.places, "find_nearby_places")
    }

    async fn verify_regulatory_detail(&self, name: &str, location: &str) -> Result<Value> {
        self.record(|r| {
            r.calls.push("verify_regulatory_detail");
            r.verify_requests.push((name.to_string(), location.to_string()));
        });
        self.pass_gate("verify_regulatory_detail").await;
        pop(&self.verifications, "verify_regulatory_detail")
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn insufficient(question: &str) -> Value {
    json!({
        "is_sufficient": false,
        "clarification_question": question,
        "detected_language": "en"
    })
}

pub fn sufficient(business: &str, location: &str) -> Value {
    json!({
        "is_sufficient": true,
        "identified_business": business,
        "identified_location": location,
        "detected_language": "en"
    })
}

pub fn coffee_plan() -> Value {
    json!({
        "idea_summary": "Coffee kiosk for office commuters",
        "target_location": "Koramangala, Bangalore",
        "budget_estimate": {"min": 300000, "max": 500000, "currency": "INR"},
        "market_insights": {
            "competitors": ["Third Wave Coffee", "Blue Tokai"],
            "rental_costs": ["Kiosk near Sony Signal: ₹35,000/month"],
            "wholesale_suppliers": ["Coorg beans: ₹850/kg"],
            "subsidies": ["PMEGP margin money"],
            "target_customers": ["Office workers"],
            "local_trends": "Cold brew demand is rising"
        },
        "financial_breakdown": {
            "fixed_costs_monthly": ["Rent: ₹35,000", "Staff: ₹25,000"],
            "variable_costs_per_unit": "₹45 per cup",
            "profit_margin_per_unit": "₹75 per cup",
            "break_even_analysis": "800 cups a month",
            "financial_projections_year_1": [
                {"month": 1, "revenue": 70000, "expense": 90000, "profit": -20000},
                {"month": 2, "revenue": 95000, "expense": 90000, "profit": 5000},
                {"month": 3, "revenue": 130000, "expense": 95000, "profit": 35000}
            ]
        },
        "legal_requirements": [
            {
                "name": "FSSAI registration",
                "step_by_step": ["Apply on FoSCoS", "Pay fee"],
                "estimated_cost": "₹100",
                "processing_time": "7 days",
                "documents_required": ["Aadhaar"],
                "learn_more_url": "https://foscos.fssai.gov.in"
            },
            {
                "name": "BBMP trade licence",
                "step_by_step": ["Visit ward office"],
                "estimated_cost": "₹5,000",
                "processing_time": "30 days",
                "documents_required": ["Rental agreement"],
                "learn_more_url": "https://bbmp.gov.in",
                "local_authority_details": "BBMP Koramangala ward"
            },
            {
                "name": "Shop and establishment registration",
                "step_by_step": ["Apply online"],
                "estimated_cost": "₹1,000",
                "processing_time": "15 days",
                "documents_required": ["PAN"],
                "learn_more_url": "https://labour.karnataka.gov.in"
            }
        ],
        "marketing_strategy": ["Loyalty stamps"],
        "setup_checklist": ["Register FSSAI", "Sign lease", "Buy grinder"],
        "estimated_daily_profit": "₹2,000",
        "optimization_suggestions": ["Offer subscriptions"]
    })
}

pub fn session_with(backend: Arc<ScriptedBackend>) -> PlannerSession {
    PlannerSession::new(
        backend,
        PlannerOptions::default().with_call_timeout(Duration::from_secs(5)),
    )
}

/// Session that already holds the coffee plan
pub async fn planned_session(backend: ScriptedBackend) -> (PlannerSession, Arc<ScriptedBackend>) {
    let backend = Arc::new(
        backend
            .intent(sufficient("coffee", "Koramangala, Bangalore"))
            .research("Rent around ₹35,000 for a kiosk")
            .plan(coffee_plan()),
    );
    let session = session_with(backend.clone());
    session
        .submit("Coffee kiosk in Koramangala, Bangalore")
        .await
        .expect("submission accepted");
    assert!(session.has_plan().await, "fixture plan was not accepted");
    (session, backend)
}
