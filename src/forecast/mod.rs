//! Forecast engine
//!
//! Closed-form projections over fixed horizons:
//! cash flow, net worth, expenses, investment returns, stress tests,
//! and the recommendations derived from them.
//! Deterministic; no I/O and no LLM.

use crate::error::AdvisorError;
use crate::expenses::{daily_totals, latest_moving_average, sample_std_dev};
use crate::models::{ExpenseRecord, FinancialSnapshot, Priority, RiskLevel};
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub mod scenarios;
pub mod stress;

pub use scenarios::{EconomicScenario, ScenarioKind, ScenarioProjection, ECONOMIC_SCENARIOS};
pub use stress::{StressOutcome, StressScenario};

pub const FORECAST_HORIZONS: [u32; 4] = [30, 90, 180, 365];

/// (confidence level, z-score)
pub const CONFIDENCE_LEVELS: [(f64, f64); 3] = [(0.68, 1.00), (0.95, 1.96), (0.99, 2.58)];

const INCOME_GROWTH: f64 = 0.03;
const EXPENSE_INFLATION: f64 = 0.02;
const PORTFOLIO_GROWTH: f64 = 0.08;
const OTHER_ASSET_GROWTH: f64 = 0.02;
const LIABILITY_PAYDOWN: f64 = 0.05;

const SHORT_WINDOW_DAYS: usize = 7;
const LONG_WINDOW_DAYS: usize = 30;

/// Used for the job loss test when no expense history exists.
const FALLBACK_MONTHLY_EXPENSES: f64 = 3_000.0;

const MIN_CASH_FLOW_RATIO: f64 = 0.20;
const MIN_NET_WORTH_GROWTH: f64 = 5.0;

/// Simple-interest growth of `value` at `annual_rate` over `days`.
fn grow(value: f64, annual_rate: f64, days: u32) -> f64 {
    value * (1.0 + annual_rate / 365.0 * days as f64)
}

//
// ================= Results =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub horizon_days: u32,
    pub projected_income: f64,
    pub projected_expenses: f64,
    pub monthly_cash_flow: f64,
    pub cumulative_cash_flow: f64,
    pub cash_flow_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowForecast {
    pub current_income: f64,
    /// Spending over the trailing 30 days
    pub current_expenses: f64,
    pub baseline_cash_flow: f64,
    pub projections: Vec<CashFlowProjection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetWorthProjection {
    pub horizon_days: u32,
    pub projected_assets: f64,
    pub projected_portfolio: f64,
    pub projected_liabilities: f64,
    pub projected_net_worth: f64,
    pub net_worth_change: f64,
    /// Percent change vs. current net worth
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub confidence: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseProjection {
    pub horizon_days: u32,
    pub projected_daily_expense: f64,
    pub projected_monthly_expense: f64,
    pub confidence_intervals: Vec<ConfidenceInterval>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpenseOutlook {
    InsufficientData,
    Projected {
        short_term_average: f64,
        baseline_daily_expense: f64,
        volatility: f64,
        projections: Vec<ExpenseProjection>,
    },
}

impl ExpenseOutlook {
    pub fn projection(&self, horizon_days: u32) -> Option<&ExpenseProjection> {
        match self {
            ExpenseOutlook::InsufficientData => None,
            ExpenseOutlook::Projected { projections, .. } => {
                projections.iter().find(|p| p.horizon_days == horizon_days)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    CashFlow,
    NetWorth,
    RiskManagement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRecommendation {
    pub category: RecommendationCategory,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action: String,
    pub timeline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub generated_at: DateTime<Utc>,
    pub cash_flow: CashFlowForecast,
    pub net_worth: Vec<NetWorthProjection>,
    pub expenses: ExpenseOutlook,
    pub investment_returns: Vec<ScenarioProjection>,
    /// Probability-weighted portfolio value per horizon
    pub expected_portfolio_value: BTreeMap<u32, f64>,
    pub stress_tests: Vec<StressScenario>,
    /// Highest priority first
    pub recommendations: Vec<ForecastRecommendation>,
}

//
// ================= Engine =================
//

#[derive(Debug, Clone)]
pub struct ForecastEngine {
    horizons: Vec<u32>,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self {
            horizons: FORECAST_HORIZONS.to_vec(),
        }
    }

    pub fn horizons(&self) -> &[u32] {
        &self.horizons
    }

    pub fn generate(
        &self,
        snapshot: &FinancialSnapshot,
        expenses: &[ExpenseRecord],
    ) -> Result<ForecastResult> {
        self.generate_at(snapshot, expenses, Utc::now())
    }

    /// Forecast relative to `as_of`, which anchors the trailing 30-day expense window.
    pub fn generate_at(
        &self,
        snapshot: &FinancialSnapshot,
        expenses: &[ExpenseRecord],
        as_of: DateTime<Utc>,
    ) -> Result<ForecastResult> {
        validate_inputs(snapshot)?;

        let cash_flow = self.forecast_cash_flow(snapshot, expenses, as_of);
        let net_worth = self.project_net_worth(snapshot, &cash_flow);
        let expense_outlook = self.forecast_expenses(expenses);
        let investment_returns =
            scenarios::project_returns(snapshot.portfolio.total_value, &self.horizons);
        let expected_portfolio_value = self
            .horizons
            .iter()
            .map(|h| (*h, scenarios::expected_value(&investment_returns, *h)))
            .collect();

        let monthly_expenses = expense_outlook
            .projection(30)
            .map(|p| p.projected_monthly_expense)
            .unwrap_or(FALLBACK_MONTHLY_EXPENSES);
        let stress_tests = stress::run_all(
            snapshot.portfolio.total_value,
            &snapshot.profile,
            monthly_expenses,
        );

        let recommendations = synthesize_recommendations(&cash_flow, &net_worth, &stress_tests);

        debug!(
            user_id = %snapshot.user_id,
            horizons = self.horizons.len(),
            recommendations = recommendations.len(),
            "Forecast generated"
        );

        Ok(ForecastResult {
            generated_at: as_of,
            cash_flow,
            net_worth,
            expenses: expense_outlook,
            investment_returns,
            expected_portfolio_value,
            stress_tests,
            recommendations,
        })
    }

    pub fn forecast_cash_flow(
        &self,
        snapshot: &FinancialSnapshot,
        expenses: &[ExpenseRecord],
        as_of: DateTime<Utc>,
    ) -> CashFlowForecast {
        let current_income = snapshot.profile.monthly_income;
        let window_start = as_of - Duration::days(30);
        let current_expenses = expenses
            .iter()
            .filter(|e| e.timestamp >= window_start)
            .map(|e| e.amount)
            .sum::<Decimal>()
            .to_f64()
            .unwrap_or(0.0);

        let baseline_cash_flow = current_income - current_expenses;

        let projections = self
            .horizons
            .iter()
            .map(|&h| {
                let projected_income = grow(current_income, INCOME_GROWTH, h);
                let projected_expenses = grow(current_expenses, EXPENSE_INFLATION, h).max(0.0);
                let monthly_cash_flow = projected_income - projected_expenses;

                CashFlowProjection {
                    horizon_days: h,
                    projected_income,
                    projected_expenses,
                    monthly_cash_flow,
                    cumulative_cash_flow: baseline_cash_flow + monthly_cash_flow * h as f64 / 30.0,
                    cash_flow_ratio: if projected_expenses > 0.0 {
                        monthly_cash_flow / projected_expenses
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        CashFlowForecast {
            current_income,
            current_expenses,
            baseline_cash_flow,
            projections,
        }
    }

    pub fn project_net_worth(
        &self,
        snapshot: &FinancialSnapshot,
        cash_flow: &CashFlowForecast,
    ) -> Vec<NetWorthProjection> {
        let profile = &snapshot.profile;
        let portfolio_value = snapshot.portfolio.total_value;
        let current_net_worth = profile.net_worth();
        let other_assets = profile.total_assets - portfolio_value;

        self.horizons
            .iter()
            .map(|&h| {
                let monthly_cash_flow = cash_flow
                    .projections
                    .iter()
                    .find(|p| p.horizon_days == h)
                    .map(|p| p.monthly_cash_flow)
                    .unwrap_or(0.0);
                let contributions = monthly_cash_flow / 30.0 * h as f64;

                let projected_portfolio = grow(portfolio_value, PORTFOLIO_GROWTH, h) + contributions;
                let projected_other = grow(other_assets, OTHER_ASSET_GROWTH, h);
                let projected_liabilities =
                    (profile.total_liabilities * (1.0 - LIABILITY_PAYDOWN / 365.0 * h as f64)).max(0.0);

                let projected_assets = projected_portfolio + projected_other;
                let projected_net_worth = projected_assets - projected_liabilities;

                NetWorthProjection {
                    horizon_days: h,
                    projected_assets,
                    projected_portfolio,
                    projected_liabilities,
                    projected_net_worth,
                    net_worth_change: projected_net_worth - current_net_worth,
                    growth_rate: if current_net_worth > 0.0 {
                        (projected_net_worth / current_net_worth - 1.0) * 100.0
                    } else {
                        0.0
                    },
                }
            })
            .collect()
    }

    pub fn forecast_expenses(&self, expenses: &[ExpenseRecord]) -> ExpenseOutlook {
        let daily: Vec<f64> = daily_totals(expenses).into_iter().map(|(_, v)| v).collect();

        let (Some(short_term_average), Some(baseline)) = (
            latest_moving_average(&daily, SHORT_WINDOW_DAYS),
            latest_moving_average(&daily, LONG_WINDOW_DAYS),
        ) else {
            return ExpenseOutlook::InsufficientData;
        };

        let volatility = sample_std_dev(&daily);

        let projections = self
            .horizons
            .iter()
            .map(|&h| {
                let projected_daily = grow(baseline, EXPENSE_INFLATION, h).max(0.0);
                let confidence_intervals = CONFIDENCE_LEVELS
                    .iter()
                    .map(|&(confidence, z)| {
                        let margin = if h > 0 {
                            z * volatility / (h as f64).sqrt()
                        } else {
                            0.0
                        };
                        ConfidenceInterval {
                            confidence,
                            lower: (projected_daily - margin).max(0.0),
                            upper: projected_daily + margin,
                        }
                    })
                    .collect();

                ExpenseProjection {
                    horizon_days: h,
                    projected_daily_expense: projected_daily,
                    projected_monthly_expense: projected_daily * 30.0,
                    confidence_intervals,
                }
            })
            .collect();

        ExpenseOutlook::Projected {
            short_term_average,
            baseline_daily_expense: baseline,
            volatility,
            projections,
        }
    }
}

fn validate_inputs(snapshot: &FinancialSnapshot) -> Result<()> {
    let profile = &snapshot.profile;
    let fields = [
        ("monthly_income", profile.monthly_income),
        ("total_assets", profile.total_assets),
        ("total_liabilities", profile.total_liabilities),
        ("emergency_fund", profile.emergency_fund),
        ("health_insurance_coverage", profile.health_insurance_coverage),
        ("portfolio.total_value", snapshot.portfolio.total_value),
    ];

    if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(AdvisorError::Forecast(format!("{} is not a finite number", name)));
    }

    if snapshot.portfolio.total_value < 0.0 {
        return Err(AdvisorError::Forecast(
            "portfolio.total_value must not be negative".to_string(),
        ));
    }

    Ok(())
}

/// Scan projections and stress outcomes for items worth acting on.
pub fn synthesize_recommendations(
    cash_flow: &CashFlowForecast,
    net_worth: &[NetWorthProjection],
    stress_tests: &[StressScenario],
) -> Vec<ForecastRecommendation> {
    let mut recommendations = Vec::new();

    for projection in &cash_flow.projections {
        if projection.cash_flow_ratio < MIN_CASH_FLOW_RATIO {
            recommendations.push(ForecastRecommendation {
                category: RecommendationCategory::CashFlow,
                priority: Priority::High,
                title: "Improve Cash Flow".to_string(),
                description: format!(
                    "Cash flow ratio is {:.1}% for {} days",
                    projection.cash_flow_ratio * 100.0,
                    projection.horizon_days
                ),
                action: "Review expenses and increase income sources".to_string(),
                timeline: "immediate".to_string(),
            });
        }
    }

    for projection in net_worth {
        if projection.growth_rate < MIN_NET_WORTH_GROWTH {
            recommendations.push(ForecastRecommendation {
                category: RecommendationCategory::NetWorth,
                priority: Priority::Medium,
                title: "Accelerate Net Worth Growth".to_string(),
                description: format!(
                    "Projected growth rate is {:.1}% for {} days",
                    projection.growth_rate, projection.horizon_days
                ),
                action: "Increase savings rate and optimize investments".to_string(),
                timeline: "3-6 months".to_string(),
            });
        }
    }

    for scenario in stress_tests {
        if scenario.risk_level == RiskLevel::High {
            recommendations.push(ForecastRecommendation {
                category: RecommendationCategory::RiskManagement,
                priority: Priority::High,
                title: format!("Mitigate {} Risk", scenario.outcome.label()),
                description: format!("High risk level identified for {}", scenario.outcome.key()),
                action: scenario
                    .mitigation_strategies
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Review risk exposure".to_string()),
                timeline: "immediate".to_string(),
            });
        }
    }

    // stable sort keeps scan order within a priority
    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FinancialProfile, Portfolio, RiskTolerance};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn snapshot(portfolio_value: f64, profile: FinancialProfile) -> FinancialSnapshot {
        FinancialSnapshot {
            user_id: "user-1".to_string(),
            portfolio: Portfolio {
                symbols: vec![],
                allocations: BTreeMap::new(),
                total_value: portfolio_value,
                risk_tolerance: RiskTolerance::Moderate,
                investment_horizon: "10+ years".to_string(),
            },
            profile,
            market_data: BTreeMap::new(),
            economic_indicators: None,
            risk_metrics: None,
            collected_at: as_of(),
        }
    }

    fn expense(amount: i64, days_ago: i64) -> ExpenseRecord {
        ExpenseRecord::new(
            Decimal::new(amount, 0),
            "General",
            as_of() - Duration::days(days_ago) - Duration::hours(1),
        )
    }

    #[test]
    fn test_cash_flow_example() {
        let snap = snapshot(50_000.0, FinancialProfile::default());
        // 3000 within the last 30 days, 900 outside the window
        let expenses = vec![expense(1000, 1), expense(2000, 20), expense(900, 45)];

        let forecast = ForecastEngine::new().forecast_cash_flow(&snap, &expenses, as_of());
        assert_eq!(forecast.current_expenses, 3000.0);
        assert_eq!(forecast.baseline_cash_flow, 2000.0);

        let h30 = &forecast.projections[0];
        assert_eq!(h30.horizon_days, 30);
        assert!((h30.projected_income - 5012.33).abs() < 0.01);
        assert!((h30.projected_expenses - 3004.93).abs() < 0.01);
        assert!((h30.monthly_cash_flow - 2007.40).abs() < 0.01);
        assert!((h30.cumulative_cash_flow - (2000.0 + h30.monthly_cash_flow)).abs() < 1e-9);
        assert!((h30.cash_flow_ratio - h30.monthly_cash_flow / h30.projected_expenses).abs() < 1e-12);
    }

    #[test]
    fn test_cash_flow_ratio_zero_without_expenses() {
        let snap = snapshot(50_000.0, FinancialProfile::default());
        let forecast = ForecastEngine::new().forecast_cash_flow(&snap, &[], as_of());
        assert!(forecast.projections.iter().all(|p| p.cash_flow_ratio == 0.0));
    }

    #[test]
    fn test_net_worth_projection() {
        let profile = FinancialProfile {
            total_assets: 100_000.0,
            total_liabilities: 25_000.0,
            ..FinancialProfile::default()
        };
        let snap = snapshot(50_000.0, profile);
        let engine = ForecastEngine::new();
        let cash_flow = engine.forecast_cash_flow(&snap, &[], as_of());
        let projections = engine.project_net_worth(&snap, &cash_flow);

        let year = projections.iter().find(|p| p.horizon_days == 365).unwrap();
        // portfolio 54000 + contributions, other assets 51000, liabilities 23750
        let contributions = cash_flow.projections[3].monthly_cash_flow / 30.0 * 365.0;
        assert!((year.projected_portfolio - (54_000.0 + contributions)).abs() < 1e-6);
        assert!((year.projected_liabilities - 23_750.0).abs() < 1e-6);
        assert!(
            (year.projected_net_worth - (year.projected_portfolio + 51_000.0 - 23_750.0)).abs() < 1e-6
        );
        assert!(year.growth_rate > 0.0);
    }

    #[test]
    fn test_liabilities_floor_at_zero_and_growth_rate_guard() {
        let profile = FinancialProfile {
            total_assets: 10_000.0,
            total_liabilities: 50_000.0,
            ..FinancialProfile::default()
        };
        let snap = snapshot(5_000.0, profile);
        let engine = ForecastEngine::new();
        let cash_flow = engine.forecast_cash_flow(&snap, &[], as_of());
        let projections = engine.project_net_worth(&snap, &cash_flow);
        assert!(projections.iter().all(|p| p.projected_liabilities >= 0.0));
        assert!(projections.iter().all(|p| p.growth_rate == 0.0));
    }

    #[test]
    fn test_expense_forecast_insufficient_without_history() {
        let outlook = ForecastEngine::new().forecast_expenses(&[]);
        assert!(matches!(outlook, ExpenseOutlook::InsufficientData));
    }

    #[test]
    fn test_expense_forecast_bounds_are_non_negative() {
        // very volatile history: margins exceed the mean
        let expenses: Vec<ExpenseRecord> = (0..20)
            .map(|d| expense(if d % 2 == 0 { 1 } else { 500 }, d))
            .collect();

        let outlook = ForecastEngine::new().forecast_expenses(&expenses);
        let ExpenseOutlook::Projected { projections, volatility, .. } = outlook else {
            panic!("expected projections");
        };
        assert!(volatility > 0.0);
        assert_eq!(projections.len(), 4);
        for projection in &projections {
            assert!(projection.projected_daily_expense >= 0.0);
            assert_eq!(projection.confidence_intervals.len(), 3);
            for interval in &projection.confidence_intervals {
                assert!(interval.lower >= 0.0);
                assert!(interval.upper >= interval.lower);
            }
        }
        let h30 = &projections[0];
        assert!((h30.projected_monthly_expense - h30.projected_daily_expense * 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_expense_baseline_uses_last_thirty_days() {
        // 10 old days at 100, then 30 recent days at 10
        let mut expenses: Vec<ExpenseRecord> = (30..40).map(|d| expense(100, d)).collect();
        expenses.extend((0..30).map(|d| expense(10, d)));

        let outlook = ForecastEngine::new().forecast_expenses(&expenses);
        let ExpenseOutlook::Projected { baseline_daily_expense, volatility, .. } = outlook else {
            panic!("expected projections");
        };
        assert!((baseline_daily_expense - 10.0).abs() < 1e-9);
        assert!(volatility > 0.0);
    }

    #[test]
    fn test_generate_produces_full_result() {
        let snap = snapshot(50_000.0, FinancialProfile::default());
        let expenses: Vec<ExpenseRecord> = (0..30).map(|d| expense(100, d)).collect();

        let result = ForecastEngine::new()
            .generate_at(&snap, &expenses, as_of())
            .unwrap();

        assert_eq!(result.cash_flow.projections.len(), 4);
        assert_eq!(result.net_worth.len(), 4);
        assert_eq!(result.investment_returns.len(), 3);
        assert_eq!(result.stress_tests.len(), 4);

        // 0.6 * 54000 + 0.2 * 56000 + 0.2 * 52000
        assert_eq!(result.expected_portfolio_value.len(), 4);
        assert!((result.expected_portfolio_value[&365] - 54_000.0).abs() < 1e-6);

        // job loss uses the projected 30-day monthly expense (~3004.93)
        let job_loss = result
            .stress_tests
            .iter()
            .find(|s| s.outcome.key() == "job_loss")
            .unwrap();
        match &job_loss.outcome {
            StressOutcome::JobLoss { monthly_expenses, .. } => {
                assert!((monthly_expenses - 3004.93).abs() < 0.01)
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        // priorities never increase along the list
        assert!(result
            .recommendations
            .windows(2)
            .all(|w| w[0].priority >= w[1].priority));
        // market crash is always high risk
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.title == "Mitigate Market Crash Risk"
                && r.action == "Maintain emergency fund"));
    }

    #[test]
    fn test_generate_rejects_non_finite_inputs() {
        let snap = snapshot(
            f64::NAN,
            FinancialProfile::default(),
        );
        let err = ForecastEngine::new().generate_at(&snap, &[], as_of()).unwrap_err();
        assert!(matches!(err, AdvisorError::Forecast(_)));
    }

    #[test]
    fn test_recommendation_rules() {
        let engine = ForecastEngine::new();
        let snap = snapshot(50_000.0, FinancialProfile::default());
        // 4900 of 5000 income spent: ratio well under 0.2
        let expenses = vec![expense(4900, 2)];
        let cash_flow = engine.forecast_cash_flow(&snap, &expenses, as_of());
        let net_worth = engine.project_net_worth(&snap, &cash_flow);
        let stress_tests = vec![stress::interest_rate_shock(1_000.0)];

        let recs = synthesize_recommendations(&cash_flow, &net_worth, &stress_tests);
        let cash_flow_items = recs
            .iter()
            .filter(|r| r.category == RecommendationCategory::CashFlow)
            .count();
        assert_eq!(cash_flow_items, 4);
        assert!(recs
            .iter()
            .all(|r| r.category != RecommendationCategory::RiskManagement));
        assert_eq!(recs[0].priority, Priority::High);
    }
}
