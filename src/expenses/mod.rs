//! Expense pattern analysis
//!
//! Turns raw expense records into aggregates and trend signals.
//! Pure functions only; no I/O.

use crate::models::{ExpenseRecord, FinancialProfile};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod budget;
pub use budget::{BudgetAdvice, BudgetCompliance, BudgetRecommendation, ExpenseSummary};

/// Slope (per period) above which a weekly category series counts as moving.
const CATEGORY_TREND_THRESHOLD: f64 = 10.0;
/// Slope (per day) above which the daily spending series counts as moving.
const DAILY_TREND_THRESHOLD: f64 = 5.0;

const MIN_CATEGORY_SAMPLES: usize = 3;
const MIN_OVERALL_SAMPLES: usize = 7;

const SHORT_WINDOW_DAYS: usize = 7;
const LONG_WINDOW_DAYS: usize = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Accelerating,
    Decelerating,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdaySpending {
    pub weekday: Weekday,
    pub total: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: f64,
    pub avg_per_transaction: f64,
    pub transaction_count: usize,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallTrend {
    pub direction: Trend,
    pub momentum: Momentum,
    pub short_term_avg: Option<f64>,
    pub long_term_avg: Option<f64>,
    pub volatility: f64,
}

impl OverallTrend {
    fn insufficient() -> Self {
        Self {
            direction: Trend::InsufficientData,
            momentum: Momentum::InsufficientData,
            short_term_avg: None,
            long_term_avg: None,
            volatility: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingPatterns {
    /// Monday first; only weekdays with spending appear.
    pub weekday: Vec<WeekdaySpending>,
    /// Calendar month (1-12) -> total
    pub monthly_totals: BTreeMap<u32, f64>,
    /// Hour of day (0-23) -> total
    pub hourly_totals: BTreeMap<u32, f64>,
    /// Largest total first
    pub categories: Vec<CategoryStats>,
    pub overall: OverallTrend,
}

impl SpendingPatterns {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Everything derived from one expense history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseAnalysis {
    pub patterns: SpendingPatterns,
    /// `None` when there were no expenses
    pub summary: Option<ExpenseSummary>,
    pub budget: Option<BudgetAdvice>,
}

impl ExpenseAnalysis {
    pub fn has_data(&self) -> bool {
        self.summary.is_some()
    }
}

/// Stateless analyzer over an expense history.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpenseAnalyzer;

impl ExpenseAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Patterns, summary and budget advice in one pass, as of now.
    pub fn analyze(
        &self,
        expenses: &[ExpenseRecord],
        profile: &FinancialProfile,
        period_days: u32,
    ) -> ExpenseAnalysis {
        self.analyze_at(expenses, profile, period_days, Utc::now())
    }

    /// Patterns cover the whole history; the summary and budget advice only
    /// the trailing `period_days` before `as_of`.
    pub fn analyze_at(
        &self,
        expenses: &[ExpenseRecord],
        profile: &FinancialProfile,
        period_days: u32,
        as_of: DateTime<Utc>,
    ) -> ExpenseAnalysis {
        let patterns = self.analyze_patterns(expenses);
        let summary = budget::summarize(expenses, profile, period_days, as_of);
        let advice = summary.as_ref().map(|s| budget::recommend(s, profile));

        ExpenseAnalysis {
            patterns,
            summary,
            budget: advice,
        }
    }

    pub fn analyze_patterns(&self, expenses: &[ExpenseRecord]) -> SpendingPatterns {
        let mut weekday_sums = [(0.0_f64, 0_usize); 7];
        let mut monthly_totals = BTreeMap::new();
        let mut hourly_totals = BTreeMap::new();
        let mut by_category: BTreeMap<&str, Vec<&ExpenseRecord>> = BTreeMap::new();

        for expense in expenses {
            let amount = expense.amount_f64();
            let slot = &mut weekday_sums[expense.timestamp.weekday().num_days_from_monday() as usize];
            slot.0 += amount;
            slot.1 += 1;

            *monthly_totals.entry(expense.timestamp.month()).or_insert(0.0) += amount;
            *hourly_totals.entry(expense.timestamp.hour()).or_insert(0.0) += amount;

            by_category
                .entry(expense.category.as_str())
                .or_default()
                .push(expense);
        }

        let weekday = weekday_sums
            .iter()
            .enumerate()
            .filter(|(_, (_, count))| *count > 0)
            .map(|(idx, (total, count))| WeekdaySpending {
                weekday: weekday_from_index(idx),
                total: *total,
                average: total / *count as f64,
            })
            .collect();

        let mut categories: Vec<CategoryStats> = by_category
            .into_iter()
            .map(|(category, records)| {
                let total: f64 = records.iter().map(|r| r.amount_f64()).sum();
                CategoryStats {
                    category: category.to_string(),
                    total,
                    avg_per_transaction: total / records.len() as f64,
                    transaction_count: records.len(),
                    trend: category_trend(&records),
                }
            })
            .collect();
        categories.sort_by(|a, b| b.total.total_cmp(&a.total));

        SpendingPatterns {
            weekday,
            monthly_totals,
            hourly_totals,
            categories,
            overall: overall_trend(expenses),
        }
    }
}

/// Total spending per calendar day, oldest first. Days without spending are absent.
pub fn daily_totals(expenses: &[ExpenseRecord]) -> Vec<(NaiveDate, f64)> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.timestamp.date_naive()).or_insert(0.0) += expense.amount_f64();
    }
    totals.into_iter().collect()
}

/// Mean of the trailing `window` values, or of all values when fewer exist.
pub fn latest_moving_average(values: &[f64], window: usize) -> Option<f64> {
    if values.is_empty() || window == 0 {
        return None;
    }
    let start = values.len().saturating_sub(window);
    mean(&values[start..])
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1); zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// First-vs-last slope classification of a series.
pub fn classify_slope(series: &[f64], threshold: f64) -> Trend {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() > 1 => {
            let slope = (last - first) / series.len() as f64;
            if slope > threshold {
                Trend::Increasing
            } else if slope < -threshold {
                Trend::Decreasing
            } else {
                Trend::Stable
            }
        }
        _ => Trend::Stable,
    }
}

/// Slope rule over daily totals; needs at least a week of spending days.
pub fn daily_spending_trend(daily: &[f64]) -> Trend {
    if daily.len() < MIN_OVERALL_SAMPLES {
        return Trend::InsufficientData;
    }
    classify_slope(daily, DAILY_TREND_THRESHOLD)
}

fn category_trend(records: &[&ExpenseRecord]) -> Trend {
    if records.len() < MIN_CATEGORY_SAMPLES {
        return Trend::InsufficientData;
    }

    let mut weekly: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in records {
        let week = record.timestamp.iso_week();
        *weekly.entry((week.year(), week.week())).or_insert(0.0) += record.amount_f64();
    }

    let series: Vec<f64> = weekly.into_values().collect();
    classify_slope(&series, CATEGORY_TREND_THRESHOLD)
}

fn overall_trend(expenses: &[ExpenseRecord]) -> OverallTrend {
    let daily: Vec<f64> = daily_totals(expenses).into_iter().map(|(_, v)| v).collect();
    if daily.len() < MIN_OVERALL_SAMPLES {
        return OverallTrend::insufficient();
    }

    let short = latest_moving_average(&daily, SHORT_WINDOW_DAYS);
    let long = latest_moving_average(&daily, LONG_WINDOW_DAYS);

    let momentum = match (short, long) {
        (Some(s), Some(l)) if s > l * 1.1 => Momentum::Accelerating,
        (Some(s), Some(l)) if s < l * 0.9 => Momentum::Decelerating,
        (Some(_), Some(_)) => Momentum::Stable,
        _ => Momentum::InsufficientData,
    };

    OverallTrend {
        direction: daily_spending_trend(&daily),
        momentum,
        short_term_avg: short,
        long_term_avg: long,
        volatility: sample_std_dev(&daily),
    }
}

fn weekday_from_index(idx: usize) -> Weekday {
    match idx {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}
