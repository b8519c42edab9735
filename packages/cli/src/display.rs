// ABOUTME: Terminal rendering of plans, cash flow, legal entries, scripts and places
// ABOUTME: Coloured text plus comfy-table grids

use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use seedplan_planner::{
    map_query, payback_month, BreakEvenCalculator, BusinessPlan, CashFlowRow, PlaceResult,
    RegulatoryDetail, VendorScript,
};

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn heading(title: &str) {
    println!();
    println!("{}", title.blue().bold());
}

fn bullets(items: &[String]) {
    if items.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for item in items {
        println!("  • {}", item);
    }
}

pub fn assistant(text: &str) {
    println!("{} {}", "seedplan:".green().bold(), text);
}

pub fn warning(text: &str) {
    println!("{} {}", "!".yellow().bold(), text.yellow());
}

/// `completed[i]` marks checklist step i as done
pub fn plan(plan: &BusinessPlan, completed: &[bool]) {
    println!();
    println!("{}", plan.idea_summary.bold());
    println!("{} {}", "📍 Location:".cyan(), plan.target_location);
    println!("{} {}", "🗺  Map:".cyan(), map_query(&plan.target_location).dimmed());
    let budget = &plan.budget_estimate;
    println!(
        "{} {} {:.0} - {:.0}",
        "💰 Budget:".cyan(),
        budget.currency,
        budget.min,
        budget.max
    );
    println!("{} {}", "📈 Daily profit:".cyan(), plan.estimated_daily_profit);

    heading("Market insights");
    for (category, items) in plan.market_insights.categories() {
        println!("  {}", category.replace('_', " ").bold());
        for item in items {
            println!("    • {}", item);
        }
    }
    println!("  {} {}", "local trends".bold(), plan.market_insights.local_trends);

    heading("Financials");
    let finance = &plan.financial_breakdown;
    bullets(&finance.fixed_costs_monthly);
    println!("  Variable cost per unit: {}", finance.variable_costs_per_unit);
    println!("  Profit margin per unit: {}", finance.profit_margin_per_unit);
    println!("  {}", finance.break_even_analysis);

    heading("Legal requirements");
    for (idx, detail) in plan.legal_requirements.iter().enumerate() {
        println!("  {}. {} ({})", idx + 1, detail.name.bold(), detail.estimated_cost);
    }

    heading("Marketing");
    bullets(&plan.marketing_strategy);

    heading("Setup checklist");
    for (idx, step) in plan.setup_checklist.iter().enumerate() {
        let done = completed.get(idx).copied().unwrap_or(false);
        let mark = if done { "[x]".green() } else { "[ ]".normal() };
        println!("  {} {}. {}", mark, idx + 1, step);
    }

    heading("Suggestions");
    bullets(&plan.optimization_suggestions);

    if !plan.vendor_scripts.is_empty() {
        heading("Negotiation scripts");
        for script in &plan.vendor_scripts {
            println!("  {}", script.context.bold());
        }
    }
    println!();
}

pub fn legal_detail(index: usize, detail: &RegulatoryDetail) {
    heading(&format!("{}. {}", index + 1, detail.name));
    for (step, text) in detail.step_by_step.iter().enumerate() {
        println!("  {}. {}", step + 1, text);
    }
    println!("  {} {}", "Cost:".cyan(), detail.estimated_cost);
    println!("  {} {}", "Processing time:".cyan(), detail.processing_time);
    println!("  {} {}", "Documents:".cyan(), detail.documents_required.join(", "));
    if let Some(authority) = &detail.local_authority_details {
        println!("  {} {}", "Authority:".cyan(), authority);
    }
    println!("  {} {}", "Learn more:".cyan(), detail.learn_more_url.dimmed());
}

pub fn script(script: &VendorScript) {
    heading(&script.context);
    if let Some(tone) = &script.tone {
        println!("  {} {}", "Tone:".cyan(), tone);
    }
    for line in script.script.lines() {
        println!("  {}", line);
    }
}

pub fn places(category: &str, places: &[PlaceResult]) {
    if places.is_empty() {
        warning(&format!("No {} found nearby", category));
        return;
    }
    let mut table = table();
    table.set_header(vec!["Name", "Address", "Rating", "Map"]);
    for place in places {
        table.add_row(vec![
            place.name.clone(),
            place.address.clone(),
            place
                .rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "—".to_string()),
            map_query(&format!("{}, {}", place.name, place.address)),
        ]);
    }
    println!("{table}");
}

pub fn break_even(calculator: &BreakEvenCalculator, rows: &[CashFlowRow]) {
    heading("Break-even calculator");
    println!("  Price per unit:         {:.2}", calculator.price_per_unit);
    println!("  Variable cost per unit: {:.2}", calculator.variable_cost_per_unit);
    println!("  Fixed cost per month:   {:.2}", calculator.fixed_cost_monthly);
    if !calculator.unparsed_fields().is_empty() {
        warning(&format!(
            "Could not read a number from: {}",
            calculator.unparsed_fields().join(", ")
        ));
    }
    println!("  {} {}", "Break-even:".cyan().bold(), calculator.break_even());

    heading("Cash flow (year 1)");
    let mut table = table();
    table.set_header(vec!["Month", "Revenue", "Expense", "Profit", "Cumulative"]);
    for row in rows {
        let profit = if row.profit_mismatch {
            format!("{:.0} (!)", row.profit)
        } else {
            format!("{:.0}", row.profit)
        };
        table.add_row(vec![
            row.month.to_string(),
            format!("{:.0}", row.revenue),
            format!("{:.0}", row.expense),
            profit,
            format!("{:.0}", row.cumulative_profit),
        ]);
    }
    println!("{table}");
    match payback_month(rows) {
        Some(month) => println!("  {} month {}", "Payback:".cyan(), month),
        None => println!("  {}", "No payback within the projection".dimmed()),
    }
}
