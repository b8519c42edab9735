// ABOUTME: Prompts for every backend call made by the planner
// ABOUTME: Intent analysis, research, plan generation, refinement, scripts, places and legal verification

use serde::Serialize;

use crate::conversation::{render_transcript, ConversationTurn};
use crate::schema::{
    BusinessPlan, Contract, IntentAnalysis, NearbyPlaces, RegulatoryPatch, VendorScriptDraft,
};

/// System prompt for structured planning calls
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are an experienced small-business consultant who helps first-time entrepreneurs turn an idea into a practical, location-specific business plan.

Your role is to:
- Ground every figure in the named location (rent, wages, input costs, fees)
- Name real local authorities, schemes and permits where they exist
- Prefer concrete numbers with currency symbols over vague ranges
- Keep advice actionable for someone with a small budget

Always respond with a single JSON object matching the requested schema. Do not add commentary outside the JSON."#;

/// System prompt for the open-ended research call
pub const RESEARCH_SYSTEM_PROMPT: &str = r#"You are a local market researcher. Use web search to collect current, location-specific facts.
Report figures with their source and date when available. Write plain prose, no JSON."#;

/// The five topics every synthesized research query covers
pub const RESEARCH_TOPICS: [&str; 5] = [
    "business permits, licences and government fees",
    "commercial rental listings and monthly rent",
    "wholesale prices of raw materials and inputs",
    "competitor pricing",
    "government subsidy and loan schemes for small businesses",
];

/// Deterministic research query when analysis supplied none
pub fn research_query(business: &str, location: &str) -> String {
    let topics = RESEARCH_TOPICS
        .iter()
        .map(|topic| format!("{} for a {} in {}", topic, business, location))
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} {}: {}", business, location, topics)
}

fn schema_block<C: Contract>() -> String {
    serde_json::to_string_pretty(&C::schema()).unwrap_or_default()
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Language contract for content values
pub fn language_instruction(language: &str) -> String {
    format!(
        "All content values must be written in {}. JSON keys remain exactly as specified in the schema and are never translated.",
        language
    )
}

pub fn intent_prompt(history: &[ConversationTurn], language_tag: &str) -> String {
    format!(
        r#"Decide whether this conversation contains enough information to write a business plan.

Conversation so far (consider ALL turns; the location and the business idea may appear in different messages):
{}

Selected language: {}

Enough information means BOTH a business idea AND a location (neighbourhood or city) are known.

If information is missing:
- set "is_sufficient" to false
- ask ONE short, friendly "clarification_question" for the missing piece
- write the question in the selected language; if the selection is "auto", use the language the user writes in

If information is sufficient:
- set "is_sufficient" to true
- fill "identified_business" and "identified_location"
- write a web "search_query" covering permits/fees, rental listings, wholesale input costs, competitor pricing and subsidy schemes for that business in that location

Always fill "detected_language" with the language the user writes in.

Respond with JSON matching this schema:
{}"#,
        render_transcript(history),
        language_tag,
        schema_block::<IntentAnalysis>()
    )
}

pub fn research_prompt(query: &str) -> String {
    format!(
        r#"Research the following for a new small business and summarise what you find:

{}

Cover each topic separately. Include specific figures (rent per month, fee amounts, price per unit) and name the authorities or schemes involved."#,
        query
    )
}

pub fn plan_prompt(history: &[ConversationTurn], research_context: &str, language: &str) -> String {
    format!(
        r#"Write a complete business plan for the idea discussed in this conversation.

Conversation:
{}

Research findings (use these figures where relevant):
{}

{}

Mandatory requirements:
1. Break-even: explain the break-even method (fixed costs divided by margin per unit) with the numbers used.
2. Cash flow: give a month-by-month projection for months 1 to 12 of year one with revenue, expense and profit (profit = revenue - expense).
3. Legal roadmap: for each permit give step-by-step instructions and name the local authority that issues it.
4. Marketing: list concrete, low-cost local marketing tactics.
5. Rent: quote location-specific rental figures for suitable premises.

Budget "min" must not exceed "max" and both are plain numbers.

Respond with JSON matching this schema:
{}"#,
        render_transcript(history),
        research_context,
        language_instruction(language),
        schema_block::<BusinessPlan>()
    )
}

pub fn refine_prompt(
    current_plan: &BusinessPlan,
    refinement_history: &[ConversationTurn],
    instruction: &str,
) -> String {
    format!(
        r#"Here is the current business plan:
{}

Earlier refinement requests and replies:
{}

New request:
{}

Rules:
- Return the COMPLETE updated plan, not just the changed fields.
- Keep every field of the schema; do not drop sections that the request does not mention.
- If the request changes the target location, regenerate EVERY location-dependent field (rental costs, competitors, suppliers, subsidies, legal authorities and costs, projections), not only the fields the request mentions.
- Keep the budget, break-even analysis and projections consistent with each other.
- Keep writing content in the same language as the current plan.

Respond with JSON matching this schema:
{}"#,
        to_json(current_plan),
        render_transcript(refinement_history),
        instruction,
        schema_block::<BusinessPlan>()
    )
}

pub fn script_prompt(context: &str, tone: Option<&str>, idea_summary: &str, location: &str) -> String {
    format!(
        r#"Write a short negotiation script the owner of this business can use.

Business: {}
Location: {}
Situation: {}
Tone: {}

The script should be spoken lines the owner can read out, adapted to local customs.

Respond with JSON matching this schema:
{}"#,
        idea_summary,
        location,
        context,
        tone.unwrap_or("polite but firm"),
        schema_block::<VendorScriptDraft>()
    )
}

pub fn places_prompt(category: &str, location: &str) -> String {
    format!(
        r#"List up to 8 real {} near {}.

For each give the name, street address and average customer rating out of 5 if known.

Respond with a JSON array matching this schema:
{}"#,
        category,
        location,
        schema_block::<NearbyPlaces>()
    )
}

pub fn verify_prompt(name: &str, location: &str) -> String {
    format!(
        r#"Verify the current details of this permit or registration:

Permit: {}
Location: {}

Only return the fields you can confirm: "estimated_cost", "processing_time", "documents_required", "local_authority_details". Omit anything you cannot confirm.

Respond with JSON matching this schema:
{}"#,
        name,
        location,
        schema_block::<RegulatoryPatch>()
    )
}
