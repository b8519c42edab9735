// ABOUTME: Shared fixtures for unit tests
// ABOUTME: A complete, valid business plan payload and a mockall double of the backend port

use mockall::mock;
use serde_json::{json, Value};

use crate::backend::PlanBackend;
use crate::conversation::ConversationTurn;
use crate::error::Result;
use crate::schema::BusinessPlan;

mock! {
    pub Backend {}

    #[async_trait::async_trait]
    impl PlanBackend for Backend {
        async fn analyze_intent(&self, history: &[ConversationTurn], language: &str) -> Result<Value>;
        async fn research(&self, query: &str) -> Result<String>;
        async fn generate_plan(&self, history: &[ConversationTurn], research_context: &str, language: &str) -> Result<Value>;
        async fn refine_plan(&self, current_plan: &BusinessPlan, refinement_history: &[ConversationTurn], instruction: &str) -> Result<Value>;
        async fn generate_script(&self, context: &str, tone: Option<String>, idea_summary: &str, location: &str) -> Result<Value>;
        async fn find_nearby_places(&self, category: &str, location: &str) -> Result<Value>;
        async fn verify_regulatory_detail(&self, name: &str, location: &str) -> Result<Value>;
    }
}

pub(crate) fn sample_plan_json() -> Value {
    json!({
        "idea_summary": "Specialty coffee kiosk serving office workers",
        "target_location": "Koramangala, Bangalore",
        "budget_estimate": {"min": 350000, "max": 600000, "currency": "INR"},
        "market_insights": {
            "competitors": ["Third Wave Coffee - ₹220 per latte", "Local darshini - ₹30 filter coffee"],
            "rental_costs": ["10x10 kiosk on 80 Ft Road: ₹40,000/month"],
            "wholesale_suppliers": ["Chikmagalur estate beans: ₹900/kg"],
            "subsidies": ["PMEGP: 25% margin money subsidy"],
            "target_customers": ["Tech park employees", "College students"],
            "local_trends": "Strong morning and evening footfall near tech parks"
        },
        "financial_breakdown": {
            "fixed_costs_monthly": ["Rent: ₹40,000", "Salaries: ₹20,000"],
            "variable_costs_per_unit": "₹40 per cup",
            "profit_margin_per_unit": "₹60 per cup",
            "break_even_analysis": "1,000 cups per month cover fixed costs",
            "break_even_learn_more_url": "https://example.org/break-even",
            "financial_projections_year_1": [
                {"month": 1, "revenue": 80000, "expense": 100000, "profit": -20000},
                {"month": 2, "revenue": 110000, "expense": 100000, "profit": 10000},
                {"month": 3, "revenue": 150000, "expense": 105000, "profit": 45000}
            ]
        },
        "legal_requirements": [
            {
                "name": "FSSAI registration",
                "step_by_step": ["Apply on FoSCoS portal", "Upload documents", "Pay fee"],
                "estimated_cost": "₹100 per year",
                "processing_time": "7 days",
                "documents_required": ["Aadhaar", "Passport photo"],
                "learn_more_url": "https://foscos.fssai.gov.in",
                "local_authority_details": "Food Safety Officer, BBMP South Zone"
            },
            {
                "name": "Trade licence",
                "step_by_step": ["Apply at BBMP ward office"],
                "estimated_cost": "₹5,000",
                "processing_time": "30 days",
                "documents_required": ["Rental agreement"],
                "learn_more_url": "https://bbmp.gov.in"
            }
        ],
        "marketing_strategy": ["Loyalty card", "Instagram reels"],
        "setup_checklist": ["Register FSSAI", "Sign kiosk lease", "Buy espresso machine"],
        "estimated_daily_profit": "₹1,500 - ₹3,000",
        "optimization_suggestions": ["Add breakfast combos"]
    })
}
