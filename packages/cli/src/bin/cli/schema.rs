use clap::ValueEnum;
use seedplan_planner::{BusinessPlan, Contract, IntentAnalysis};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemaKind {
    /// Sufficiency analysis of the conversation
    Intent,
    /// Full business plan
    Plan,
}

pub fn print_schema(kind: SchemaKind) -> anyhow::Result<()> {
    let schema = match kind {
        SchemaKind::Intent => IntentAnalysis::schema(),
        SchemaKind::Plan => BusinessPlan::schema(),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
