//! Role texts and prompt templates for the three narrative hand-offs.
//!
//! Prompts embed compact JSON digests rather than raw records to keep
//! token usage bounded.

use crate::expenses::ExpenseAnalysis;
use crate::forecast::ForecastResult;
use crate::models::{ExpenseRecord, FinancialSnapshot};
use crate::strategy::InvestmentProfile;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;

pub const EXPENSE_ANALYST_ROLE: &str = "You are a financial expert analyzing personal expenses.";
pub const INVESTMENT_ADVISOR_ROLE: &str =
    "You are a certified financial advisor providing investment guidance.";
pub const PLAN_SYNTHESIZER_ROLE: &str =
    "You are a senior financial advisor creating comprehensive financial plans.";

const DIGEST_RECORD_LIMIT: usize = 50;
const DIGEST_CATEGORY_LIMIT: usize = 10;
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpenseDigest {
    pub total_expenses: f64,
    pub expense_count: usize,
    /// Largest first
    pub top_categories: Vec<(String, f64)>,
    pub average_expense: f64,
}

/// Totals over the first 50 records, keeping the 10 largest categories.
pub fn digest_expenses(expenses: &[ExpenseRecord]) -> ExpenseDigest {
    let sample = &expenses[..expenses.len().min(DIGEST_RECORD_LIMIT)];

    let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for expense in sample {
        *by_category.entry(expense.category.as_str()).or_insert(0.0) += expense.amount_f64();
    }
    let total_expenses: f64 = by_category.values().sum();

    let mut top_categories: Vec<(String, f64)> = by_category
        .into_iter()
        .map(|(category, total)| (category.to_string(), total))
        .collect();
    top_categories.sort_by(|a, b| b.1.total_cmp(&a.1));
    top_categories.truncate(DIGEST_CATEGORY_LIMIT);

    ExpenseDigest {
        total_expenses,
        expense_count: expenses.len(),
        top_categories,
        average_expense: if sample.is_empty() {
            0.0
        } else {
            total_expenses / sample.len() as f64
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketPerformance {
    pub current_price: f64,
    pub price_change_pct: f64,
    pub sector: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioDigest {
    pub total_value: f64,
    pub risk_tolerance: String,
    pub investment_horizon: String,
    pub symbols: Vec<String>,
    pub allocations: BTreeMap<String, f64>,
    /// Only symbols whose quote was available
    pub market_performance: BTreeMap<String, MarketPerformance>,
}

pub fn digest_portfolio(snapshot: &FinancialSnapshot) -> PortfolioDigest {
    let portfolio = &snapshot.portfolio;
    let market_performance = snapshot
        .market_data
        .iter()
        .filter_map(|(symbol, quote)| {
            quote.data().map(|data| {
                (
                    symbol.clone(),
                    MarketPerformance {
                        current_price: data.current_price,
                        price_change_pct: data.price_change_pct,
                        sector: data.sector.clone().unwrap_or_else(|| "Unknown".to_string()),
                    },
                )
            })
        })
        .collect();

    PortfolioDigest {
        total_value: portfolio.total_value,
        risk_tolerance: portfolio.risk_tolerance.to_string(),
        investment_horizon: portfolio.investment_horizon.clone(),
        symbols: portfolio.symbols.clone(),
        allocations: portfolio.allocations.clone(),
        market_performance,
    }
}

pub fn expense_analysis_prompt(
    expenses: &[ExpenseRecord],
    analysis: &ExpenseAnalysis,
) -> Result<String> {
    let digest = serde_json::to_string_pretty(&digest_expenses(expenses))?;
    let patterns = serde_json::to_string_pretty(&analysis.patterns)?;
    let budget = match &analysis.budget {
        Some(advice) => serde_json::to_string_pretty(advice)?,
        None => NOT_AVAILABLE.to_string(),
    };

    Ok(format!(
        "Analyze the following expense summary and provide insights:\n\
         {}\n\n\
         Computed spending patterns:\n\
         {}\n\n\
         Budget recommendations:\n\
         {}\n\n\
         Provide:\n\
         1. Spending patterns\n\
         2. Areas for potential savings\n\
         3. Budget recommendations",
        digest, patterns, budget
    ))
}

pub fn investment_advice_prompt(
    query: &str,
    snapshot: &FinancialSnapshot,
    profile: &InvestmentProfile,
) -> Result<String> {
    let portfolio = serde_json::to_string_pretty(&digest_portfolio(snapshot))?;
    let strategy = serde_json::to_string_pretty(profile)?;

    Ok(format!(
        "Based on the user's financial data and query, provide personalized investment advice:\n\n\
         User Query: {}\n\
         Portfolio Summary: {}\n\
         Recommended Strategy: {}\n\n\
         Provide:\n\
         1. Risk assessment\n\
         2. Investment strategy recommendations\n\
         3. Portfolio allocation suggestions\n\
         4. Market timing considerations",
        query, portfolio, strategy
    ))
}

pub fn synthesis_prompt(
    expense_analysis: Option<&str>,
    investment_advice: Option<&str>,
    forecast: Option<&ForecastResult>,
) -> Result<String> {
    let forecast = match forecast {
        Some(result) => serde_json::to_string_pretty(result)?,
        None => NOT_AVAILABLE.to_string(),
    };

    Ok(format!(
        "Synthesize the following financial advice into a comprehensive, actionable response:\n\n\
         Expense Analysis: {}\n\
         Investment Advice: {}\n\
         Financial Forecast: {}\n\n\
         Provide a clear, structured response with:\n\
         1. Executive Summary\n\
         2. Key Recommendations\n\
         3. Action Items\n\
         4. Risk Warnings\n\
         5. Next Steps",
        expense_analysis.unwrap_or(NOT_AVAILABLE),
        investment_advice.unwrap_or(NOT_AVAILABLE),
        forecast
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses::ExpenseAnalyzer;
    use crate::models::FinancialProfile;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn expense(amount: i64, category: &str) -> ExpenseRecord {
        ExpenseRecord::new(
            Decimal::new(amount, 0),
            category,
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_digest_limits_records_and_categories() {
        // 60 records over 12 categories; only the first 50 are summed
        let expenses: Vec<ExpenseRecord> = (0..60)
            .map(|i| expense(10, &format!("Category {}", i % 12)))
            .collect();

        let digest = digest_expenses(&expenses);
        assert_eq!(digest.expense_count, 60);
        assert_eq!(digest.total_expenses, 500.0);
        assert_eq!(digest.top_categories.len(), 10);
        assert_eq!(digest.average_expense, 10.0);
    }

    #[test]
    fn test_digest_of_empty_history() {
        let digest = digest_expenses(&[]);
        assert_eq!(digest.total_expenses, 0.0);
        assert_eq!(digest.expense_count, 0);
        assert!(digest.top_categories.is_empty());
    }

    #[test]
    fn test_expense_prompt_includes_digest() {
        let expenses = vec![expense(1200, "Rent"), expense(80, "Food")];
        let analysis = ExpenseAnalyzer::new().analyze(&expenses, &FinancialProfile::default(), 30);

        let prompt = expense_analysis_prompt(&expenses, &analysis).unwrap();
        assert!(prompt.contains("\"total_expenses\": 1280.0"));
        assert!(prompt.contains("Areas for potential savings"));
    }

    #[test]
    fn test_synthesis_prompt_marks_missing_sections() {
        let prompt = synthesis_prompt(None, Some("Buy bonds."), None).unwrap();
        assert!(prompt.contains("Expense Analysis: N/A"));
        assert!(prompt.contains("Investment Advice: Buy bonds."));
        assert!(prompt.contains("Financial Forecast: N/A"));
    }
}
