// ABOUTME: Structural contracts exchanged with the generative backend
// ABOUTME: Intent analysis and business plan shapes with repair, validation and generated JSON schemas

use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PlannerError, Result};
use crate::finance::{parse_amount, Amount};

/// Tolerance used when checking `profit == revenue - expense`
const PROFIT_TOLERANCE: f64 = 0.5;

/// A structured response shape the backend must honour.
///
/// Parsing goes JSON value -> lenient repair -> typed struct -> semantic validation.
/// Anything that still fails after repair is a `SchemaViolation`.
pub trait Contract: DeserializeOwned + JsonSchema {
    const NAME: &'static str;

    /// Fix up well-known, harmless deviations before the typed parse
    fn repair(_value: &mut Value, _repairs: &mut Vec<String>) {}

    /// Invariants serde cannot express
    fn validate(&self) -> Result<()>;

    /// JSON schema sent to the backend alongside the prompt
    fn schema() -> Value {
        let root = SchemaGenerator::default().into_root_schema_for::<Self>();
        serde_json::to_value(root).unwrap_or(Value::Null)
    }
}

/// Parse an already-decoded JSON value against a contract
pub fn parse_contract<C: Contract>(mut value: Value) -> Result<C> {
    let mut repairs = Vec::new();
    C::repair(&mut value, &mut repairs);
    if !repairs.is_empty() {
        warn!(contract = C::NAME, ?repairs, "Repaired backend response");
    }

    let parsed: C = serde_json::from_value(value).map_err(|e| {
        warn!(contract = C::NAME, "Schema violation: {}", e);
        PlannerError::schema(C::NAME, e.to_string())
    })?;

    parsed.validate().inspect_err(|e| {
        warn!(contract = C::NAME, "Validation failed: {}", e);
    })?;

    debug!(contract = C::NAME, "Backend response accepted");
    Ok(parsed)
}

/// Parse raw response text (optionally fenced) against a contract
pub fn parse_contract_text<C: Contract>(text: &str) -> Result<C> {
    let json_text = seedplan_ai::service::strip_code_fences(text);
    let value: Value =
        serde_json::from_str(json_text).map_err(|e| PlannerError::Parse(e.to_string()))?;
    parse_contract(value)
}

// ============================================================================
// Intent analysis
// ============================================================================

/// Sufficiency judgement over the whole conversation so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntentAnalysis {
    pub is_sufficient: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identified_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identified_business: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl IntentAnalysis {
    pub fn clarification(&self) -> Option<&str> {
        non_blank(&self.clarification_question)
    }

    pub fn business(&self) -> Option<&str> {
        non_blank(&self.identified_business)
    }

    pub fn location(&self) -> Option<&str> {
        non_blank(&self.identified_location)
    }

    pub fn query(&self) -> Option<&str> {
        non_blank(&self.search_query)
    }
}

impl Contract for IntentAnalysis {
    const NAME: &'static str = "IntentAnalysis";

    fn validate(&self) -> Result<()> {
        if !self.is_sufficient {
            if self.clarification().is_none() {
                return Err(PlannerError::schema(
                    Self::NAME,
                    "is_sufficient is false but clarification_question is empty",
                ));
            }
            return Ok(());
        }

        let explicit = self.business().is_some() && self.location().is_some();
        if !explicit && self.query().is_none() {
            return Err(PlannerError::schema(
                Self::NAME,
                "is_sufficient is true but neither business+location nor search_query is present",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Business plan
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetEstimate {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

impl BudgetEstimate {
    fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PlannerError::schema(
                BusinessPlan::NAME,
                "budget_estimate values must be finite",
            ));
        }
        if self.min < 0.0 || self.max < 0.0 {
            return Err(PlannerError::schema(
                BusinessPlan::NAME,
                format!(
                    "budget_estimate must be non-negative (min {}, max {})",
                    self.min, self.max
                ),
            ));
        }
        if self.min > self.max {
            return Err(PlannerError::schema(
                BusinessPlan::NAME,
                format!("budget_estimate min {} exceeds max {}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Location-specific market research, every category required (may be empty)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarketInsights {
    pub competitors: Vec<String>,
    pub rental_costs: Vec<String>,
    pub wholesale_suppliers: Vec<String>,
    pub subsidies: Vec<String>,
    pub target_customers: Vec<String>,
    pub local_trends: String,
}

impl MarketInsights {
    const LIST_FIELDS: [&'static str; 5] = [
        "competitors",
        "rental_costs",
        "wholesale_suppliers",
        "subsidies",
        "target_customers",
    ];

    /// (category, entries) pairs in display order
    /// List-valued categories keyed by their field names
    pub fn categories(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("competitors", self.competitors.as_slice()),
            ("rental_costs", self.rental_costs.as_slice()),
            ("wholesale_suppliers", self.wholesale_suppliers.as_slice()),
            ("subsidies", self.subsidies.as_slice()),
            ("target_customers", self.target_customers.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyProjection {
    pub month: u8,
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
}

impl MonthlyProjection {
    /// `profit` disagrees with `revenue - expense`; presentation-only, never fatal
    pub fn profit_mismatch(&self) -> bool {
        (self.revenue - self.expense - self.profit).abs() > PROFIT_TOLERANCE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialBreakdown {
    pub fixed_costs_monthly: Vec<String>,
    pub variable_costs_per_unit: String,
    pub profit_margin_per_unit: String,
    pub break_even_analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_even_learn_more_url: Option<String>,
    pub financial_projections_year_1: Vec<MonthlyProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegulatoryDetail {
    pub name: String,
    pub step_by_step: Vec<String>,
    pub estimated_cost: String,
    pub processing_time: String,
    pub documents_required: Vec<String>,
    pub learn_more_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_authority_details: Option<String>,
}

impl RegulatoryDetail {
    /// Shallow override: fields present in the patch replace ours, the rest stay
    pub fn apply_patch(&mut self, patch: RegulatoryPatch) {
        if let Some(cost) = patch.estimated_cost {
            self.estimated_cost = cost;
        }
        if let Some(time) = patch.processing_time {
            self.processing_time = time;
        }
        if let Some(docs) = patch.documents_required {
            self.documents_required = docs;
        }
        if let Some(authority) = patch.local_authority_details {
            self.local_authority_details = Some(authority);
        }
    }
}

/// Partial regulatory entry returned by field verification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegulatoryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_authority_details: Option<String>,
}

impl RegulatoryPatch {
    pub fn is_empty(&self) -> bool {
        self == &RegulatoryPatch::default()
    }
}

impl Contract for RegulatoryPatch {
    const NAME: &'static str = "RegulatoryPatch";

    fn repair(value: &mut Value, repairs: &mut Vec<String>) {
        listify(value, "/documents_required", repairs);
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VendorScript {
    pub context: String,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// Small structured reply of the script generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VendorScriptDraft {
    pub context: String,
    pub script: String,
}

impl Contract for VendorScriptDraft {
    const NAME: &'static str = "VendorScript";

    fn validate(&self) -> Result<()> {
        if self.script.trim().is_empty() {
            return Err(PlannerError::schema(Self::NAME, "script is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlaceResult {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct NearbyPlaces(pub Vec<PlaceResult>);

impl Contract for NearbyPlaces {
    const NAME: &'static str = "NearbyPlaces";

    fn repair(value: &mut Value, repairs: &mut Vec<String>) {
        // Some replies wrap the list: {"places": [...]}
        if let Some(inner) = value.get_mut("places").map(Value::take) {
            *value = inner;
            repairs.push("unwrapped places object".to_string());
        }
        if value.is_null() {
            *value = Value::Array(Vec::new());
            repairs.push("null -> []".to_string());
        }
        if let Some(items) = value.as_array_mut() {
            for (idx, item) in items.iter_mut().enumerate() {
                if let Some(rating) = item.get_mut("rating") {
                    coerce_number(rating, &format!("/{}/rating", idx), repairs);
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        for place in &self.0 {
            if place.name.trim().is_empty() {
                return Err(PlannerError::schema(Self::NAME, "place without a name"));
            }
            if let Some(rating) = place.rating {
                if !rating.is_finite() {
                    return Err(PlannerError::schema(Self::NAME, "rating is not finite"));
                }
            }
        }
        Ok(())
    }
}

/// The central aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BusinessPlan {
    pub idea_summary: String,
    pub target_location: String,
    pub budget_estimate: BudgetEstimate,
    pub market_insights: MarketInsights,
    pub financial_breakdown: FinancialBreakdown,
    pub legal_requirements: Vec<RegulatoryDetail>,
    pub marketing_strategy: Vec<String>,
    pub setup_checklist: Vec<String>,
    pub estimated_daily_profit: String,
    pub optimization_suggestions: Vec<String>,
    #[serde(default)]
    pub vendor_scripts: Vec<VendorScript>,
}

impl BusinessPlan {
    const LIST_FIELDS: [&'static str; 5] = [
        "/marketing_strategy",
        "/setup_checklist",
        "/optimization_suggestions",
        "/legal_requirements",
        "/vendor_scripts",
    ];

    /// Re-check every structural invariant (used after in-place patches too)
    pub fn check_invariants(&self) -> Result<()> {
        self.validate()
    }
}

impl Contract for BusinessPlan {
    const NAME: &'static str = "BusinessPlan";

    fn repair(value: &mut Value, repairs: &mut Vec<String>) {
        for pointer in Self::LIST_FIELDS {
            listify(value, pointer, repairs);
        }
        for field in MarketInsights::LIST_FIELDS {
            listify(value, &format!("/market_insights/{}", field), repairs);
        }
        listify(value, "/financial_breakdown/fixed_costs_monthly", repairs);
        listify(
            value,
            "/financial_breakdown/financial_projections_year_1",
            repairs,
        );

        for pointer in ["/budget_estimate/min", "/budget_estimate/max"] {
            if let Some(v) = value.pointer_mut(pointer) {
                coerce_number(v, pointer, repairs);
            }
        }

        if let Some(entries) = value
            .pointer_mut("/legal_requirements")
            .and_then(Value::as_array_mut)
        {
            for (idx, entry) in entries.iter_mut().enumerate() {
                listify(entry, "/step_by_step", repairs);
                listify(entry, "/documents_required", repairs);
                if entry.get("learn_more_url").is_some_and(Value::is_null) {
                    entry["learn_more_url"] = Value::String(String::new());
                    repairs.push(format!("/legal_requirements/{}/learn_more_url: null -> \"\"", idx));
                }
            }
        }

        if let Some(months) = value
            .pointer_mut("/financial_breakdown/financial_projections_year_1")
            .and_then(Value::as_array_mut)
        {
            for (idx, row) in months.iter_mut().enumerate() {
                for field in ["month", "revenue", "expense", "profit"] {
                    if let Some(v) = row.get_mut(field) {
                        coerce_number(v, &format!("/projections/{}/{}", idx, field), repairs);
                    }
                }
                if let Some(month) = row.get_mut("month") {
                    integral_month(month, idx, repairs);
                }
            }

            let sorted = months
                .windows(2)
                .all(|w| month_key(&w[0]) <= month_key(&w[1]));
            if !sorted {
                months.sort_by_key(month_key);
                repairs.push("sorted projections by month".to_string());
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.idea_summary.trim().is_empty() {
            return Err(PlannerError::schema(Self::NAME, "idea_summary is empty"));
        }
        if self.target_location.trim().is_empty() {
            return Err(PlannerError::schema(Self::NAME, "target_location is empty"));
        }

        self.budget_estimate.validate()?;

        let mut previous: Option<u8> = None;
        for row in &self.financial_breakdown.financial_projections_year_1 {
            if !(1..=12).contains(&row.month) {
                return Err(PlannerError::schema(
                    Self::NAME,
                    format!("projection month {} outside 1..=12", row.month),
                ));
            }
            if previous.is_some_and(|p| p >= row.month) {
                return Err(PlannerError::schema(
                    Self::NAME,
                    format!("projection months not strictly ascending at month {}", row.month),
                ));
            }
            if ![row.revenue, row.expense, row.profit]
                .iter()
                .all(|v| v.is_finite())
            {
                return Err(PlannerError::schema(
                    Self::NAME,
                    format!("projection month {} has non-finite values", row.month),
                ));
            }
            previous = Some(row.month);
        }

        for (idx, entry) in self.legal_requirements.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(PlannerError::schema(
                    Self::NAME,
                    format!("legal_requirements[{}] has no name", idx),
                ));
            }
        }

        for (idx, script) in self.vendor_scripts.iter().enumerate() {
            if script.script.trim().is_empty() {
                return Err(PlannerError::schema(
                    Self::NAME,
                    format!("vendor_scripts[{}] is empty", idx),
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Repair helpers
// ============================================================================

/// `null` -> `[]`, bare string -> one-element list
fn listify(value: &mut Value, pointer: &str, repairs: &mut Vec<String>) {
    let Some(target) = value.pointer_mut(pointer) else {
        return;
    };
    match target {
        Value::Null => {
            *target = Value::Array(Vec::new());
            repairs.push(format!("{}: null -> []", pointer));
        }
        Value::String(s) => {
            let single = std::mem::take(s);
            *target = Value::Array(vec![Value::String(single)]);
            repairs.push(format!("{}: string -> [string]", pointer));
        }
        _ => {}
    }
}

/// Numeric strings such as "₹50,000" become numbers
fn coerce_number(value: &mut Value, pointer: &str, repairs: &mut Vec<String>) {
    let Value::String(raw) = value else {
        return;
    };
    if let Amount::Parsed(n) = parse_amount(raw) {
        if let Some(number) = serde_json::Number::from_f64(n) {
            *value = Value::Number(number);
            repairs.push(format!("{}: string -> number", pointer));
        }
    }
}

fn integral_month(value: &mut Value, idx: usize, repairs: &mut Vec<String>) {
    if value.is_u64() {
        return;
    }
    if let Some(m) = value.as_f64() {
        if m.fract() == 0.0 && (0.0..=255.0).contains(&m) {
            *value = Value::from(m as u64);
            repairs.push(format!("/projections/{}/month: float -> integer", idx));
        }
    }
}

fn month_key(row: &Value) -> u64 {
    row.get("month").and_then(Value::as_u64).unwrap_or(u64::MAX)
}
