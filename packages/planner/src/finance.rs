// ABOUTME: Financial derivations computed from plan fields at display time
// ABOUTME: Leading-number extraction, break-even units, calculator seeding and cash-flow rows

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{BusinessPlan, MonthlyProjection};

lazy_static! {
    // First run of digits with thousands separators and an optional decimal part
    static ref LEADING_NUMBER: Regex = Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap();
}

/// A number read out of backend-authored free text.
///
/// `Unparseable` is kept distinct from a genuine zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Amount {
    Parsed(f64),
    Unparseable,
}

impl Amount {
    pub fn value(&self) -> Option<f64> {
        match self {
            Amount::Parsed(v) => Some(*v),
            Amount::Unparseable => None,
        }
    }

    pub fn value_or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Amount::Parsed(_))
    }
}

/// Parse the first numeric run in a currency string ("₹10,000/month" -> 10000)
pub fn parse_amount(text: &str) -> Amount {
    LEADING_NUMBER
        .find(text)
        .map(|m| m.as_str().replace(',', ""))
        .and_then(|digits| digits.parse::<f64>().ok())
        .map(Amount::Parsed)
        .unwrap_or(Amount::Unparseable)
}

/// Returns 0 when nothing numeric is found; callers must read 0 as "unparseable"
pub fn extract_leading_number(text: &str) -> f64 {
    parse_amount(text).value_or_zero()
}

/// Units needed per period for profit to reach zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakEven {
    Units(u64),
    /// Price does not cover the variable cost, so no volume breaks even
    Unbounded,
}

impl BreakEven {
    pub fn units(&self) -> Option<u64> {
        match self {
            BreakEven::Units(n) => Some(*n),
            BreakEven::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, BreakEven::Unbounded)
    }
}

impl fmt::Display for BreakEven {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakEven::Units(n) => write!(f, "{} units", n),
            BreakEven::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// `ceil(fixed / (price - variable))`, or `Unbounded` when the margin is not positive
pub fn break_even_units(price: f64, variable_cost: f64, fixed_cost: f64) -> BreakEven {
    let margin = price - variable_cost;
    if !margin.is_finite() || margin <= 0.0 || !fixed_cost.is_finite() {
        return BreakEven::Unbounded;
    }
    if fixed_cost <= 0.0 {
        return BreakEven::Units(0);
    }
    let units = (fixed_cost / margin).ceil();
    if units > u64::MAX as f64 {
        return BreakEven::Unbounded;
    }
    BreakEven::Units(units as u64)
}

/// Interactive break-even calculator seeded from plan text.
///
/// Inputs are independently editable and never write back into the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakEvenCalculator {
    pub price_per_unit: f64,
    pub variable_cost_per_unit: f64,
    pub fixed_cost_monthly: f64,
    unparsed: Vec<&'static str>,
}

impl BreakEvenCalculator {
    pub fn new(price_per_unit: f64, variable_cost_per_unit: f64, fixed_cost_monthly: f64) -> Self {
        Self {
            price_per_unit,
            variable_cost_per_unit,
            fixed_cost_monthly,
            unparsed: Vec::new(),
        }
    }

    pub fn from_plan(plan: &BusinessPlan) -> Self {
        let breakdown = &plan.financial_breakdown;
        let mut unparsed = Vec::new();

        let variable = parse_amount(&breakdown.variable_costs_per_unit);
        if !variable.is_parsed() {
            unparsed.push("variable_costs_per_unit");
        }

        let margin = parse_amount(&breakdown.profit_margin_per_unit);
        if !margin.is_parsed() {
            unparsed.push("profit_margin_per_unit");
        }

        let fixed_parts: Vec<Amount> = breakdown
            .fixed_costs_monthly
            .iter()
            .map(|line| parse_amount(line))
            .collect();
        if fixed_parts.is_empty() || fixed_parts.iter().all(|a| !a.is_parsed()) {
            unparsed.push("fixed_costs_monthly");
        }
        let fixed: f64 = fixed_parts.iter().map(Amount::value_or_zero).sum();

        Self {
            price_per_unit: variable.value_or_zero() + margin.value_or_zero(),
            variable_cost_per_unit: variable.value_or_zero(),
            fixed_cost_monthly: fixed,
            unparsed,
        }
    }

    /// Plan fields whose text held no number (their seed is a placeholder zero)
    pub fn unparsed_fields(&self) -> &[&'static str] {
        &self.unparsed
    }

    pub fn set_price(&mut self, price: f64) {
        self.price_per_unit = price;
    }

    pub fn set_variable_cost(&mut self, cost: f64) {
        self.variable_cost_per_unit = cost;
    }

    pub fn set_fixed_cost(&mut self, cost: f64) {
        self.fixed_cost_monthly = cost;
    }

    pub fn break_even(&self) -> BreakEven {
        break_even_units(
            self.price_per_unit,
            self.variable_cost_per_unit,
            self.fixed_cost_monthly,
        )
    }

    /// Monthly profit if `units` are sold
    pub fn profit_at(&self, units: u64) -> f64 {
        units as f64 * (self.price_per_unit - self.variable_cost_per_unit) - self.fixed_cost_monthly
    }
}

/// One display row of the monthly cash-flow chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub month: u8,
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
    pub cumulative_profit: f64,
    pub profit_mismatch: bool,
}

pub fn cash_flow(projections: &[MonthlyProjection]) -> Vec<CashFlowRow> {
    let mut cumulative = 0.0;
    projections
        .iter()
        .map(|p| {
            cumulative += p.profit;
            CashFlowRow {
                month: p.month,
                revenue: p.revenue,
                expense: p.expense,
                profit: p.profit,
                cumulative_profit: cumulative,
                profit_mismatch: p.profit_mismatch(),
            }
        })
        .collect()
}

/// First month where cumulative profit recovers to >= 0 after having been negative
pub fn payback_month(rows: &[CashFlowRow]) -> Option<u8> {
    let mut was_negative = false;
    for row in rows {
        if row.cumulative_profit < 0.0 {
            was_negative = true;
        } else if was_negative {
            return Some(row.month);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CashFlowTotals {
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
}

pub fn cash_flow_totals(rows: &[CashFlowRow]) -> CashFlowTotals {
    rows.iter().fold(CashFlowTotals::default(), |acc, row| CashFlowTotals {
        revenue: acc.revenue + row.revenue,
        expense: acc.expense + row.expense,
        profit: acc.profit + row.profit,
    })
}
