//! Deterministic stress tests
//!
//! Each scenario applies one fixed shock to the current snapshot. They are
//! independent of the economic scenario probabilities.

use crate::models::{FinancialProfile, RiskLevel};
use serde::{Deserialize, Serialize};

const MARKET_CRASH_DRAWDOWN: f64 = 0.30;
const MARKET_RECOVERY_MONTHS: u32 = 60;
const EMERGENCY_FUND_MONTHS: f64 = 6.0;
const MIN_SURVIVAL_MONTHS: f64 = 3.0;
const MEDICAL_EVENT_COST: f64 = 10_000.0;
const RATE_SHOCK: f64 = 0.02;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StressOutcome {
    MarketCrash {
        portfolio_loss: f64,
        new_portfolio_value: f64,
        recovery_months: u32,
        monthly_recovery_amount: f64,
    },
    JobLoss {
        monthly_income_loss: f64,
        current_emergency_fund: f64,
        monthly_expenses: f64,
        survival_months: f64,
        required_emergency_fund: f64,
        /// Negative means the fund already exceeds the requirement.
        funding_gap: f64,
    },
    MedicalEmergency {
        total_cost: f64,
        insurance_coverage: f64,
        out_of_pocket_cost: f64,
        emergency_fund: f64,
        can_cover: bool,
        funding_gap: f64,
    },
    InterestRateShock {
        rate_increase: f64,
        additional_annual_interest: f64,
        monthly_payment_increase: f64,
    },
}

impl StressOutcome {
    pub fn key(&self) -> &'static str {
        match self {
            StressOutcome::MarketCrash { .. } => "market_crash",
            StressOutcome::JobLoss { .. } => "job_loss",
            StressOutcome::MedicalEmergency { .. } => "medical_emergency",
            StressOutcome::InterestRateShock { .. } => "interest_rate_shock",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StressOutcome::MarketCrash { .. } => "Market Crash",
            StressOutcome::JobLoss { .. } => "Job Loss",
            StressOutcome::MedicalEmergency { .. } => "Medical Emergency",
            StressOutcome::InterestRateShock { .. } => "Interest Rate Shock",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenario {
    pub title: String,
    pub risk_level: RiskLevel,
    pub mitigation_strategies: Vec<String>,
    #[serde(flatten)]
    pub outcome: StressOutcome,
}

fn strategies(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn market_crash(portfolio_value: f64) -> StressScenario {
    let portfolio_loss = portfolio_value * MARKET_CRASH_DRAWDOWN;

    StressScenario {
        title: "30% Market Crash".to_string(),
        risk_level: RiskLevel::High,
        mitigation_strategies: strategies(&[
            "Maintain emergency fund",
            "Diversify across asset classes",
            "Consider defensive stocks",
            "Dollar-cost averaging during recovery",
        ]),
        outcome: StressOutcome::MarketCrash {
            portfolio_loss,
            new_portfolio_value: portfolio_value - portfolio_loss,
            recovery_months: MARKET_RECOVERY_MONTHS,
            monthly_recovery_amount: portfolio_loss / MARKET_RECOVERY_MONTHS as f64,
        },
    }
}

pub fn job_loss(profile: &FinancialProfile, monthly_expenses: f64) -> StressScenario {
    let survival_months = if monthly_expenses > 0.0 {
        profile.emergency_fund / monthly_expenses
    } else {
        0.0
    };
    let required_emergency_fund = monthly_expenses * EMERGENCY_FUND_MONTHS;

    StressScenario {
        title: "Job Loss".to_string(),
        risk_level: if survival_months >= MIN_SURVIVAL_MONTHS {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        },
        mitigation_strategies: strategies(&[
            "Build emergency fund to 6 months of expenses",
            "Reduce discretionary spending",
            "Consider side income sources",
            "Review insurance coverage",
        ]),
        outcome: StressOutcome::JobLoss {
            monthly_income_loss: profile.monthly_income,
            current_emergency_fund: profile.emergency_fund,
            monthly_expenses,
            survival_months,
            required_emergency_fund,
            funding_gap: required_emergency_fund - profile.emergency_fund,
        },
    }
}

pub fn medical_emergency(profile: &FinancialProfile) -> StressScenario {
    let coverage = profile.health_insurance_coverage.clamp(0.0, 1.0);
    let out_of_pocket_cost = MEDICAL_EVENT_COST * (1.0 - coverage);
    let can_cover = profile.emergency_fund >= out_of_pocket_cost;

    StressScenario {
        title: "Medical Emergency ($10,000)".to_string(),
        risk_level: if can_cover { RiskLevel::Low } else { RiskLevel::High },
        mitigation_strategies: strategies(&[
            "Ensure adequate health insurance",
            "Build emergency fund",
            "Consider health savings account",
            "Review medical expense budget",
        ]),
        outcome: StressOutcome::MedicalEmergency {
            total_cost: MEDICAL_EVENT_COST,
            insurance_coverage: coverage,
            out_of_pocket_cost,
            emergency_fund: profile.emergency_fund,
            can_cover,
            funding_gap: (out_of_pocket_cost - profile.emergency_fund).max(0.0),
        },
    }
}

pub fn interest_rate_shock(total_liabilities: f64) -> StressScenario {
    let additional_annual_interest = total_liabilities * RATE_SHOCK;

    StressScenario {
        title: "2% Interest Rate Increase".to_string(),
        risk_level: RiskLevel::Medium,
        mitigation_strategies: strategies(&[
            "Refinance high-interest debt",
            "Pay down variable-rate loans",
            "Lock in fixed rates",
            "Build emergency fund for higher payments",
        ]),
        outcome: StressOutcome::InterestRateShock {
            rate_increase: RATE_SHOCK,
            additional_annual_interest,
            monthly_payment_increase: additional_annual_interest / 12.0,
        },
    }
}

/// All four stress tests in their fixed order.
pub fn run_all(
    portfolio_value: f64,
    profile: &FinancialProfile,
    monthly_expenses: f64,
) -> Vec<StressScenario> {
    vec![
        market_crash(portfolio_value),
        job_loss(profile, monthly_expenses),
        medical_emergency(profile),
        interest_rate_shock(profile.total_liabilities),
    ]
}
