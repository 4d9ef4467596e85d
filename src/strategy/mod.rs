//! Investment strategy engine
//!
//! Picks an allocation archetype for the investor, bends it toward their
//! goals, and turns the result into instrument suggestions. All weights
//! are kept normalised so every `Allocation` leaving this module sums to 1.

use crate::models::{FinancialSnapshot, Holding, RiskTolerance};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub mod portfolio;

pub use portfolio::{PortfolioAnalysis, PortfolioRisk, RebalanceAction, TradeDirection};

/// Target weight a class needs before instruments are suggested for it.
const MIN_INSTRUMENT_WEIGHT: f64 = 0.05;
/// Gap between target and current weight that warrants a shift.
pub const REBALANCE_THRESHOLD: f64 = 0.05;

//
// ================= Asset classes =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Bonds,
    Stocks,
    Cash,
}

impl AssetClass {
    pub const ALL: [AssetClass; 3] = [AssetClass::Bonds, AssetClass::Stocks, AssetClass::Cash];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Bonds => "bonds",
            AssetClass::Stocks => "stocks",
            AssetClass::Cash => "cash",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weights per asset class.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    pub bonds: f64,
    pub stocks: f64,
    pub cash: f64,
}

impl Allocation {
    pub const fn new(bonds: f64, stocks: f64, cash: f64) -> Self {
        Self { bonds, stocks, cash }
    }

    pub fn get(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Bonds => self.bonds,
            AssetClass::Stocks => self.stocks,
            AssetClass::Cash => self.cash,
        }
    }

    pub fn get_mut(&mut self, class: AssetClass) -> &mut f64 {
        match class {
            AssetClass::Bonds => &mut self.bonds,
            AssetClass::Stocks => &mut self.stocks,
            AssetClass::Cash => &mut self.cash,
        }
    }

    pub fn sum(&self) -> f64 {
        self.bonds + self.stocks + self.cash
    }

    /// Every weight divided by the total. A zero allocation stays zero.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return *self;
        }
        Self::new(self.bonds / total, self.stocks / total, self.cash / total)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        AssetClass::ALL.into_iter().map(move |class| (class, self.get(class)))
    }
}

//
// ================= Archetypes =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Conservative,
    Moderate,
    Aggressive,
    Growth,
}

impl Archetype {
    pub fn allocation(&self) -> Allocation {
        match self {
            Archetype::Conservative => Allocation::new(0.60, 0.30, 0.10),
            Archetype::Moderate => Allocation::new(0.40, 0.50, 0.10),
            Archetype::Aggressive => Allocation::new(0.20, 0.70, 0.10),
            Archetype::Growth => Allocation::new(0.10, 0.80, 0.10),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Archetype::Conservative => {
                "Low risk, stable returns, suitable for retirees or risk-averse investors"
            }
            Archetype::Moderate => "Balanced approach, moderate risk and return potential",
            Archetype::Aggressive => {
                "Higher risk, higher return potential, suitable for long-term investors"
            }
            Archetype::Growth => {
                "Maximum growth potential, highest risk, for young investors with long time horizon"
            }
        }
    }

    /// Age and horizon override the stated tolerance.
    pub fn select(risk_tolerance: RiskTolerance, age: u32, investment_horizon: &str) -> Self {
        let horizon = investment_horizon.to_lowercase();
        if age < 30 && horizon.contains("long") {
            Archetype::Growth
        } else if age > 60 || horizon.contains("short") {
            Archetype::Conservative
        } else {
            risk_tolerance.into()
        }
    }
}

impl From<RiskTolerance> for Archetype {
    fn from(tolerance: RiskTolerance) -> Self {
        match tolerance {
            RiskTolerance::Conservative => Archetype::Conservative,
            RiskTolerance::Moderate => Archetype::Moderate,
            RiskTolerance::Aggressive => Archetype::Aggressive,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Archetype::Conservative => "conservative",
            Archetype::Moderate => "moderate",
            Archetype::Aggressive => "aggressive",
            Archetype::Growth => "growth",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Inputs =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorProfile {
    pub risk_tolerance: RiskTolerance,
    pub age: u32,
    pub investment_horizon: String,
    #[serde(default)]
    pub financial_goals: Vec<String>,
    #[serde(default)]
    pub current_holdings: Option<Vec<Holding>>,
}

impl InvestorProfile {
    pub fn from_snapshot(snapshot: &FinancialSnapshot) -> Self {
        let holdings = snapshot.portfolio.holdings();
        Self {
            risk_tolerance: snapshot.portfolio.risk_tolerance,
            age: snapshot.profile.age,
            investment_horizon: snapshot.portfolio.investment_horizon.clone(),
            financial_goals: snapshot.profile.financial_goals.clone(),
            current_holdings: if holdings.is_empty() { None } else { Some(holdings) },
        }
    }

    fn has_goal(&self, goal: &str) -> bool {
        self.financial_goals
            .iter()
            .any(|g| g.trim().eq_ignore_ascii_case(goal))
    }
}

//
// ================= Outputs =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    StockEtf,
    InternationalStock,
    DividendStock,
    BondEtf,
    TreasuryBond,
    MoneyMarket,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentRecommendation {
    pub kind: InstrumentKind,
    pub asset_class: AssetClass,
    pub symbol: String,
    pub allocation: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    IncreaseAllocation,
    DecreaseAllocation,
}

/// Holding-aware suggestion to move one class toward its target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationShift {
    pub direction: ShiftDirection,
    pub asset_class: AssetClass,
    pub current: f64,
    pub target: f64,
    pub action: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StrategyRiskMetrics {
    pub expected_volatility: f64,
    pub expected_return: f64,
    pub risk_adjusted_return: f64,
}

impl StrategyRiskMetrics {
    /// Weighted sum of per-class (volatility, return) constants.
    pub fn for_allocation(allocation: &Allocation) -> Self {
        let expected_volatility =
            allocation.stocks * 0.20 + allocation.bonds * 0.08 + allocation.cash * 0.02;
        let expected_return =
            allocation.stocks * 0.10 + allocation.bonds * 0.05 + allocation.cash * 0.03;

        Self {
            expected_volatility,
            expected_return,
            risk_adjusted_return: if expected_volatility > 0.0 {
                expected_return / expected_volatility
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub archetype: Archetype,
    pub description: String,
    pub allocation: Allocation,
    pub recommendations: Vec<InstrumentRecommendation>,
    pub allocation_shifts: Vec<AllocationShift>,
    pub risk_metrics: StrategyRiskMetrics,
    pub rebalancing_schedule: String,
    pub monitoring_frequency: String,
}

/// Strategy plus, when holdings exist, the analysis of the current portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentProfile {
    pub strategy: Strategy,
    pub portfolio_analysis: Option<PortfolioAnalysis>,
}

//
// ================= Engine =================
//

#[derive(Debug, Default, Clone, Copy)]
pub struct StrategyEngine;

impl StrategyEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, profile: &InvestorProfile) -> Strategy {
        let archetype = Archetype::select(profile.risk_tolerance, profile.age, &profile.investment_horizon);
        let allocation = customize_for_goals(archetype.allocation(), profile);

        let recommendations = instrument_recommendations(&allocation, profile.age);
        let allocation_shifts = profile
            .current_holdings
            .as_deref()
            .map(|holdings| allocation_shifts(&portfolio::current_allocation(holdings), &allocation))
            .unwrap_or_default();

        debug!(
            archetype = %archetype,
            instruments = recommendations.len(),
            shifts = allocation_shifts.len(),
            "Strategy built"
        );

        Strategy {
            archetype,
            description: archetype.description().to_string(),
            allocation,
            recommendations,
            allocation_shifts,
            risk_metrics: StrategyRiskMetrics::for_allocation(&allocation),
            rebalancing_schedule: rebalancing_schedule(profile.risk_tolerance).to_string(),
            monitoring_frequency: monitoring_frequency(profile.risk_tolerance).to_string(),
        }
    }

    /// Strategy for the snapshot's investor, with the current portfolio analysed
    /// against it when there is anything to analyse.
    pub fn investment_profile(&self, snapshot: &FinancialSnapshot) -> InvestmentProfile {
        let investor = InvestorProfile::from_snapshot(snapshot);
        let strategy = self.build(&investor);

        let portfolio_analysis = investor.current_holdings.as_deref().and_then(|holdings| {
            portfolio::analyze(holdings, &strategy.allocation, &snapshot.market_data).ok()
        });

        InvestmentProfile {
            strategy,
            portfolio_analysis,
        }
    }
}

/// Goal adjustments, applied in a fixed order, then renormalised.
pub fn customize_for_goals(base: Allocation, profile: &InvestorProfile) -> Allocation {
    let mut allocation = base;

    if profile.has_goal("retirement") {
        allocation.bonds = (allocation.bonds * 1.2).min(0.8);
        allocation.stocks = (allocation.stocks * 0.8).max(0.1);
    }

    if profile.has_goal("education") {
        allocation.bonds = (allocation.bonds * 1.1).min(0.7);
        allocation.cash = (allocation.cash * 1.5).min(0.2);
    }

    if profile.has_goal("emergency_fund") {
        allocation.cash = (allocation.cash * 1.5).min(0.25);
        allocation.stocks = (allocation.stocks * 0.9).max(0.05);
    }

    allocation.normalized()
}

pub fn instrument_recommendations(allocation: &Allocation, age: u32) -> Vec<InstrumentRecommendation> {
    let mut recommendations = Vec::new();

    for (class, weight) in allocation.iter() {
        if weight <= MIN_INSTRUMENT_WEIGHT {
            continue;
        }

        let picks: &[(InstrumentKind, &str, f64, &str)] = match class {
            AssetClass::Stocks if age < 40 => &[
                (InstrumentKind::StockEtf, "VTI", 0.6, "Broad market exposure with growth potential"),
                (InstrumentKind::InternationalStock, "VXUS", 0.4, "Geographic diversification"),
            ],
            AssetClass::Stocks => &[
                (InstrumentKind::StockEtf, "SPY", 0.8, "Large-cap stability with dividend income"),
                (InstrumentKind::DividendStock, "VYM", 0.2, "Income generation"),
            ],
            AssetClass::Bonds => &[
                (InstrumentKind::BondEtf, "BND", 0.7, "Core bond exposure for stability"),
                (InstrumentKind::TreasuryBond, "TLT", 0.3, "Government-backed safety"),
            ],
            AssetClass::Cash => &[(InstrumentKind::MoneyMarket, "SPRXX", 1.0, "Liquidity and safety")],
        };

        recommendations.extend(picks.iter().map(|(kind, symbol, share, reason)| {
            InstrumentRecommendation {
                kind: *kind,
                asset_class: class,
                symbol: symbol.to_string(),
                allocation: weight * share,
                reason: reason.to_string(),
            }
        }));
    }

    recommendations
}

pub fn allocation_shifts(current: &Allocation, target: &Allocation) -> Vec<AllocationShift> {
    target
        .iter()
        .filter_map(|(class, target_weight)| {
            let current_weight = current.get(class);
            let difference = target_weight - current_weight;
            if difference.abs() <= REBALANCE_THRESHOLD {
                return None;
            }

            let (direction, verb) = if difference > 0.0 {
                (ShiftDirection::IncreaseAllocation, "Increase")
            } else {
                (ShiftDirection::DecreaseAllocation, "Decrease")
            };

            Some(AllocationShift {
                direction,
                asset_class: class,
                current: current_weight,
                target: target_weight,
                action: format!(
                    "{} {} allocation from {:.1}% to {:.1}%",
                    verb,
                    class,
                    current_weight * 100.0,
                    target_weight * 100.0
                ),
            })
        })
        .collect()
}

pub fn rebalancing_schedule(tolerance: RiskTolerance) -> &'static str {
    match tolerance {
        RiskTolerance::Conservative => "Quarterly",
        RiskTolerance::Moderate => "Semi-annually",
        RiskTolerance::Aggressive => "Annually",
    }
}

pub fn monitoring_frequency(tolerance: RiskTolerance) -> &'static str {
    match tolerance {
        RiskTolerance::Conservative => "Weekly",
        RiskTolerance::Moderate => "Bi-weekly",
        RiskTolerance::Aggressive => "Monthly",
    }
}
