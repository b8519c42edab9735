// ABOUTME: Paginated text export of a finished business plan
// ABOUTME: Fixed section order, wrapped lines and page breaks at a configurable page height

use seedplan_config::PlannerConfig;
use textwrap::Options;
use tracing::debug;

use crate::finance::{cash_flow, payback_month, BreakEvenCalculator};
use crate::schema::BusinessPlan;

pub const DEFAULT_LINE_WIDTH: usize = 80;

/// Section titles in export order
pub const SECTION_ORDER: [&str; 5] = [
    "Summary",
    "Financials",
    "Setup Checklist",
    "Legal Requirements",
    "Market Insights",
];

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub title: String,
    pub line_width: usize,
    /// Lines per page
    pub page_height: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: "Business Plan".to_string(),
            line_width: DEFAULT_LINE_WIDTH,
            page_height: seedplan_config::settings::DEFAULT_PAGE_HEIGHT,
        }
    }
}

impl ExportOptions {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            page_height: config.page_height,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagedDocument {
    pub title: String,
    pub pages: Vec<Page>,
}

impl PagedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Render as markdown with a marker and page number between pages
    pub fn to_markdown(&self) -> String {
        let total = self.pages.len();
        let mut out = format!("# {}\n\n", self.title);
        for page in &self.pages {
            if page.number > 1 {
                out.push_str("\n---\n\n");
            }
            for line in &page.lines {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!("\n*Page {} of {}*\n", page.number, total));
        }
        out
    }
}

struct PageBuilder {
    width: usize,
    height: usize,
    pages: Vec<Page>,
    current: Vec<String>,
}

impl PageBuilder {
    fn new(options: &ExportOptions) -> Self {
        Self {
            width: options.line_width.max(20),
            height: options.page_height.max(1),
            pages: Vec::new(),
            current: Vec::new(),
        }
    }

    fn break_page(&mut self) {
        let lines = std::mem::take(&mut self.current);
        self.pages.push(Page {
            number: self.pages.len() + 1,
            lines,
        });
    }

    fn line(&mut self, text: String) {
        if self.current.len() >= self.height {
            self.break_page();
        }
        self.current.push(text);
    }

    fn blank(&mut self) {
        // No leading blank lines on a fresh page
        if !self.current.is_empty() && self.current.len() < self.height {
            self.current.push(String::new());
        }
    }

    /// Heading plus at least one following line stay on the same page
    fn heading(&mut self, level: usize, title: &str) {
        self.blank();
        if self.current.len() + 2 > self.height && !self.current.is_empty() {
            self.break_page();
        }
        self.line(format!("{} {}", "#".repeat(level), title));
    }

    fn paragraph(&mut self, text: &str) {
        for wrapped in textwrap::wrap(text, self.width) {
            self.line(wrapped.into_owned());
        }
    }

    fn bullet(&mut self, text: &str) {
        let options = Options::new(self.width)
            .initial_indent("- ")
            .subsequent_indent("  ");
        for wrapped in textwrap::wrap(text, options) {
            self.line(wrapped.into_owned());
        }
    }

    fn bullets(&mut self, items: &[String]) {
        if items.is_empty() {
            self.paragraph("(none)");
        }
        for item in items {
            self.bullet(item);
        }
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

fn summary(doc: &mut PageBuilder, plan: &BusinessPlan) {
    doc.heading(2, SECTION_ORDER[0]);
    doc.paragraph(&plan.idea_summary);
    doc.blank();
    doc.paragraph(&format!("Location: {}", plan.target_location));
    let budget = &plan.budget_estimate;
    doc.paragraph(&format!(
        "Startup budget: {} {:.0} - {:.0}",
        budget.currency, budget.min, budget.max
    ));
    doc.paragraph(&format!(
        "Estimated daily profit: {}",
        plan.estimated_daily_profit
    ));

    doc.heading(3, "Marketing Strategy");
    doc.bullets(&plan.marketing_strategy);
    doc.heading(3, "Optimization Suggestions");
    doc.bullets(&plan.optimization_suggestions);
}

fn financials(doc: &mut PageBuilder, plan: &BusinessPlan) {
    let finance = &plan.financial_breakdown;
    doc.heading(2, SECTION_ORDER[1]);

    doc.heading(3, "Monthly Fixed Costs");
    doc.bullets(&finance.fixed_costs_monthly);
    doc.blank();
    doc.paragraph(&format!(
        "Variable cost per unit: {}",
        finance.variable_costs_per_unit
    ));
    doc.paragraph(&format!(
        "Profit margin per unit: {}",
        finance.profit_margin_per_unit
    ));

    doc.heading(3, "Break-even");
    doc.paragraph(&finance.break_even_analysis);
    let calculator = BreakEvenCalculator::from_plan(plan);
    if calculator.unparsed_fields().is_empty() {
        doc.paragraph(&format!("Calculated break-even: {}", calculator.break_even()));
    } else {
        doc.paragraph(&format!(
            "Calculated break-even unavailable (unparseable: {})",
            calculator.unparsed_fields().join(", ")
        ));
    }
    if let Some(url) = &finance.break_even_learn_more_url {
        doc.paragraph(&format!("Learn more: {}", url));
    }

    doc.heading(3, "Cash Flow (Year 1)");
    let rows = cash_flow(&finance.financial_projections_year_1);
    if rows.is_empty() {
        doc.paragraph("(no projections)");
    }
    for row in &rows {
        let flag = if row.profit_mismatch { " (!)" } else { "" };
        doc.paragraph(&format!(
            "Month {:>2}: revenue {:.0}, expense {:.0}, profit {:.0}{}, cumulative {:.0}",
            row.month, row.revenue, row.expense, row.profit, flag, row.cumulative_profit
        ));
    }
    if let Some(month) = payback_month(&rows) {
        doc.paragraph(&format!("Payback in month {}", month));
    }
}

fn checklist(doc: &mut PageBuilder, plan: &BusinessPlan) {
    doc.heading(2, SECTION_ORDER[2]);
    for (idx, item) in plan.setup_checklist.iter().enumerate() {
        doc.paragraph(&format!("{}. {}", idx + 1, item));
    }
    if plan.setup_checklist.is_empty() {
        doc.paragraph("(none)");
    }
}

fn legal(doc: &mut PageBuilder, plan: &BusinessPlan) {
    doc.heading(2, SECTION_ORDER[3]);
    if plan.legal_requirements.is_empty() {
        doc.paragraph("(none)");
    }
    for detail in &plan.legal_requirements {
        doc.heading(3, &detail.name);
        for (idx, step) in detail.step_by_step.iter().enumerate() {
            doc.paragraph(&format!("{}. {}", idx + 1, step));
        }
        doc.paragraph(&format!("Cost: {}", detail.estimated_cost));
        doc.paragraph(&format!("Processing time: {}", detail.processing_time));
        if !detail.documents_required.is_empty() {
            doc.paragraph(&format!(
                "Documents: {}",
                detail.documents_required.join(", ")
            ));
        }
        if let Some(authority) = &detail.local_authority_details {
            doc.paragraph(&format!("Authority: {}", authority));
        }
        doc.paragraph(&format!("Learn more: {}", detail.learn_more_url));
    }
}

fn market_insights(doc: &mut PageBuilder, plan: &BusinessPlan) {
    let insights = &plan.market_insights;
    doc.heading(2, SECTION_ORDER[4]);
    for (category, items) in insights.categories() {
        doc.heading(3, &title_case(category));
        doc.bullets(items);
    }
    doc.heading(3, "Local Trends");
    doc.paragraph(&insights.local_trends);
}

fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lay the plan out into pages
pub fn export_plan(plan: &BusinessPlan, options: &ExportOptions) -> PagedDocument {
    let mut doc = PageBuilder::new(options);
    summary(&mut doc, plan);
    financials(&mut doc, plan);
    checklist(&mut doc, plan);
    legal(&mut doc, plan);
    market_insights(&mut doc, plan);

    let pages = doc.finish();
    debug!(pages = pages.len(), "Plan exported");
    PagedDocument {
        title: options.title.clone(),
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_plan_json;

    fn sample() -> BusinessPlan {
        serde_json::from_value(sample_plan_json()).unwrap()
    }

    fn all_lines(doc: &PagedDocument) -> Vec<String> {
        doc.pages.iter().flat_map(|p| p.lines.clone()).collect()
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let doc = export_plan(&sample(), &ExportOptions::default());
        let lines = all_lines(&doc);
        let positions: Vec<usize> = SECTION_ORDER
            .iter()
            .map(|title| {
                lines
                    .iter()
                    .position(|l| l == &format!("## {}", title))
                    .unwrap_or_else(|| panic!("missing section {title}"))
            })
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_pages_never_exceed_height() {
        let options = ExportOptions {
            page_height: 12,
            line_width: 30,
            ..Default::default()
        };
        let doc = export_plan(&sample(), &options);
        assert!(doc.page_count() > 1);
        for (idx, page) in doc.pages.iter().enumerate() {
            assert_eq!(page.number, idx + 1);
            assert!(page.lines.len() <= 12, "page {} too tall", page.number);
        }
    }

    #[test]
    fn test_lines_wrap_at_width() {
        let mut plan = sample();
        plan.idea_summary = "word ".repeat(60);
        let options = ExportOptions {
            line_width: 40,
            ..Default::default()
        };
        let doc = export_plan(&plan, &options);
        for line in all_lines(&doc) {
            assert!(line.chars().count() <= 40 || !line.contains(' '), "{line}");
        }
    }

    #[test]
    fn test_heading_not_stranded_at_page_bottom() {
        let options = ExportOptions {
            page_height: 10,
            line_width: 60,
            ..Default::default()
        };
        let doc = export_plan(&sample(), &options);
        for page in &doc.pages {
            if let Some(last) = page.lines.last() {
                assert!(!last.starts_with('#'), "heading at bottom of page {}", page.number);
            }
        }
    }

    #[test]
    fn test_markdown_has_page_numbers() {
        let options = ExportOptions {
            page_height: 15,
            ..Default::default()
        };
        let doc = export_plan(&sample(), &options);
        let markdown = doc.to_markdown();
        assert!(markdown.starts_with("# Business Plan"));
        assert!(markdown.contains(&format!("*Page 1 of {}*", doc.page_count())));
        assert!(markdown.contains("\n---\n"));
        assert!(markdown.contains("Calculated break-even: 1000 units"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("wholesale_suppliers"), "Wholesale Suppliers");
    }

    #[test]
    fn test_market_insight_headings_are_title_cased() {
        let doc = export_plan(&sample(), &ExportOptions::default());
        let headings: Vec<String> = all_lines(&doc)
            .into_iter()
            .filter(|line| line.starts_with("### "))
            .collect();
        for expected in [
            "### Competitors",
            "### Rental Costs",
            "### Wholesale Suppliers",
            "### Subsidies",
            "### Target Customers",
            "### Local Trends",
        ] {
            assert!(
                headings.iter().any(|h| h == expected),
                "missing {expected} in {headings:?}"
            );
        }
    }
}
