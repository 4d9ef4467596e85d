//! Expense summary and budget recommendations

use super::{daily_spending_trend, daily_totals, mean, Trend};
use crate::models::{ExpenseRecord, FinancialProfile};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single category above this share of total spend is flagged.
const CATEGORY_SHARE_LIMIT: f64 = 30.0;
const CATEGORY_SHARE_TARGET: f64 = 25.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCompliance {
    pub monthly_budget: f64,
    pub daily_budget: f64,
    pub actual_daily_spending: f64,
    pub compliance_percentage: f64,
    pub under_budget: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub total_spent: f64,
    pub avg_daily_spending: f64,
    pub category_breakdown: BTreeMap<String, f64>,
    pub category_percentages: BTreeMap<String, f64>,
    pub spending_trend: Trend,
    pub budget_compliance: BudgetCompliance,
    pub expense_count: usize,
    pub period_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BudgetRecommendation {
    BudgetOverspending {
        current: f64,
        budget: f64,
        suggestion: String,
    },
    CategoryReduction {
        category: String,
        current_percentage: f64,
        recommended_percentage: f64,
        suggestion: String,
    },
    DailySpendingReduction {
        current: f64,
        target: f64,
        suggestion: String,
    },
}

impl BudgetRecommendation {
    pub fn priority_score(&self) -> u8 {
        match self {
            BudgetRecommendation::BudgetOverspending { .. } => 3,
            BudgetRecommendation::CategoryReduction { .. } => 2,
            BudgetRecommendation::DailySpendingReduction { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetAdvice {
    /// Highest priority first
    pub recommendations: Vec<BudgetRecommendation>,
    pub estimated_monthly_savings: f64,
}

/// Summarise spending in the trailing `period_days` before `as_of`.
/// Older records are ignored. `None` when the window is empty.
pub fn summarize(
    expenses: &[ExpenseRecord],
    profile: &FinancialProfile,
    period_days: u32,
    as_of: DateTime<Utc>,
) -> Option<ExpenseSummary> {
    let cutoff = as_of - Duration::days(i64::from(period_days));
    let windowed: Vec<ExpenseRecord> = expenses
        .iter()
        .filter(|e| e.timestamp >= cutoff)
        .cloned()
        .collect();
    if windowed.is_empty() {
        return None;
    }
    let expenses = windowed.as_slice();

    let total_spent: f64 = expenses.iter().map(ExpenseRecord::amount_f64).sum();
    let daily: Vec<f64> = daily_totals(expenses).into_iter().map(|(_, v)| v).collect();

    let mut category_breakdown: BTreeMap<String, f64> = BTreeMap::new();
    for expense in expenses {
        *category_breakdown.entry(expense.category.clone()).or_insert(0.0) += expense.amount_f64();
    }

    let category_percentages = category_breakdown
        .iter()
        .map(|(category, amount)| {
            let share = if total_spent > 0.0 {
                amount / total_spent * 100.0
            } else {
                0.0
            };
            (category.clone(), share)
        })
        .collect();

    Some(ExpenseSummary {
        total_spent,
        avg_daily_spending: mean(&daily).unwrap_or(0.0),
        category_breakdown,
        category_percentages,
        spending_trend: daily_spending_trend(&daily),
        budget_compliance: budget_compliance(profile.monthly_budget, total_spent, period_days),
        expense_count: expenses.len(),
        period_days,
    })
}

pub fn budget_compliance(monthly_budget: f64, total_spent: f64, period_days: u32) -> BudgetCompliance {
    let daily_budget = monthly_budget / 30.0;
    let actual_daily_spending = if period_days > 0 {
        total_spent / period_days as f64
    } else {
        total_spent
    };

    let compliance = if actual_daily_spending > 0.0 {
        daily_budget / actual_daily_spending * 100.0
    } else {
        100.0
    };

    BudgetCompliance {
        monthly_budget,
        daily_budget,
        actual_daily_spending,
        compliance_percentage: compliance.min(100.0),
        under_budget: compliance >= 100.0,
    }
}

/// Budget recommendations derived from a summary and the user's targets.
pub fn recommend(summary: &ExpenseSummary, profile: &FinancialProfile) -> BudgetAdvice {
    let mut recommendations = Vec::new();

    for (category, share) in &summary.category_percentages {
        if *share > CATEGORY_SHARE_LIMIT {
            recommendations.push(BudgetRecommendation::CategoryReduction {
                category: category.clone(),
                current_percentage: *share,
                recommended_percentage: CATEGORY_SHARE_TARGET,
                suggestion: format!(
                    "Consider reducing {} spending from {:.1}% to {:.0}% of total expenses",
                    category, share, CATEGORY_SHARE_TARGET
                ),
            });
        }
    }

    let target_daily = profile.target_daily_spending;
    if summary.avg_daily_spending > target_daily {
        recommendations.push(BudgetRecommendation::DailySpendingReduction {
            current: summary.avg_daily_spending,
            target: target_daily,
            suggestion: format!(
                "Reduce daily spending from ${:.2} to ${:.2}",
                summary.avg_daily_spending, target_daily
            ),
        });
    }

    if summary.total_spent > profile.monthly_budget {
        recommendations.push(BudgetRecommendation::BudgetOverspending {
            current: summary.total_spent,
            budget: profile.monthly_budget,
            suggestion: "You're overspending your monthly budget. Consider reviewing discretionary expenses."
                .to_string(),
        });
    }

    let estimated_monthly_savings = estimate_savings(&recommendations, summary);

    // stable: equal scores keep discovery order
    recommendations.sort_by(|a, b| b.priority_score().cmp(&a.priority_score()));

    BudgetAdvice {
        recommendations,
        estimated_monthly_savings,
    }
}

fn estimate_savings(recommendations: &[BudgetRecommendation], summary: &ExpenseSummary) -> f64 {
    recommendations
        .iter()
        .map(|rec| match rec {
            BudgetRecommendation::CategoryReduction {
                category,
                current_percentage,
                recommended_percentage,
                ..
            } if current_percentage > recommended_percentage => {
                let amount = summary.category_breakdown.get(category).copied().unwrap_or(0.0);
                amount * (current_percentage - recommended_percentage) / current_percentage
            }
            BudgetRecommendation::DailySpendingReduction { current, target, .. } => {
                (current - target) * 30.0
            }
            _ => 0.0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 9, 0, 0).unwrap()
    }

    fn expense(amount: i64, category: &str, days_ago: i64) -> ExpenseRecord {
        ExpenseRecord::new(Decimal::new(amount, 0), category, as_of() - Duration::days(days_ago))
    }

    #[test]
    fn test_summary_of_empty_history_is_none() {
        assert!(summarize(&[], &FinancialProfile::default(), 30, as_of()).is_none());
    }

    #[test]
    fn test_summary_totals_and_shares() {
        let expenses = vec![
            expense(600, "Rent", 0),
            expense(300, "Food", 1),
            expense(100, "Fun", 1),
        ];

        let summary = summarize(&expenses, &FinancialProfile::default(), 30, as_of()).unwrap();
        assert_eq!(summary.total_spent, 1000.0);
        assert_eq!(summary.expense_count, 3);
        // two spending days: 600 and 400
        assert_eq!(summary.avg_daily_spending, 500.0);
        assert_eq!(summary.category_percentages["Rent"], 60.0);
        assert_eq!(summary.spending_trend, Trend::InsufficientData);
    }

    #[test]
    fn test_budget_compliance() {
        let compliance = budget_compliance(3000.0, 1500.0, 30);
        assert_eq!(compliance.daily_budget, 100.0);
        assert_eq!(compliance.actual_daily_spending, 50.0);
        assert_eq!(compliance.compliance_percentage, 100.0);
        assert!(compliance.under_budget);

        let over = budget_compliance(3000.0, 6000.0, 30);
        assert_eq!(over.compliance_percentage, 50.0);
        assert!(!over.under_budget);

        let nothing = budget_compliance(3000.0, 0.0, 30);
        assert!(nothing.under_budget);
    }

    #[test]
    fn test_recommendations_are_prioritised() {
        let expenses = vec![
            expense(3000, "Rent", 0),
            expense(500, "Food", 1),
            expense(500, "Fun", 2),
        ];
        let profile = FinancialProfile::default();
        let summary = summarize(&expenses, &profile, 30, as_of()).unwrap();

        let advice = recommend(&summary, &profile);
        assert_eq!(advice.recommendations.len(), 3);
        assert!(matches!(
            advice.recommendations[0],
            BudgetRecommendation::BudgetOverspending { .. }
        ));
        assert!(matches!(
            advice.recommendations[1],
            BudgetRecommendation::CategoryReduction { .. }
        ));
        assert!(matches!(
            advice.recommendations[2],
            BudgetRecommendation::DailySpendingReduction { .. }
        ));

        // Rent: 3000 * (75 - 25) / 75 = 2000; daily: (4000/3 - 100) * 30 = 37000
        assert!((advice.estimated_monthly_savings - 39_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_recommendations_within_targets() {
        let expenses = vec![
            expense(25, "Food", 0),
            expense(25, "Fun", 1),
            expense(25, "Travel", 2),
            expense(25, "Books", 3),
        ];
        let profile = FinancialProfile::default();
        let summary = summarize(&expenses, &profile, 30, as_of()).unwrap();
        let advice = recommend(&summary, &profile);
        assert!(advice.recommendations.is_empty());
        assert_eq!(advice.estimated_monthly_savings, 0.0);
    }

    #[test]
    fn test_summary_only_counts_the_trailing_period() {
        // 90 days at $50/day: $1,500 per 30 days against a $3,000 budget
        let expenses: Vec<ExpenseRecord> = (0..90).map(|d| expense(50, "Food", d)).collect();
        let profile = FinancialProfile::default();

        let summary = summarize(&expenses, &profile, 30, as_of()).unwrap();
        // days 0..=30 fall inside the window
        assert_eq!(summary.expense_count, 31);
        assert_eq!(summary.total_spent, 1550.0);
        assert!(summary.budget_compliance.under_budget);
        assert_eq!(summary.budget_compliance.compliance_percentage, 100.0);

        let advice = recommend(&summary, &profile);
        assert!(!advice
            .recommendations
            .iter()
            .any(|r| matches!(r, BudgetRecommendation::BudgetOverspending { .. })));
    }

    #[test]
    fn test_summary_of_stale_history_is_none() {
        let expenses = vec![expense(50, "Food", 45), expense(50, "Food", 60)];
        assert!(summarize(&expenses, &FinancialProfile::default(), 30, as_of()).is_none());
    }
}
