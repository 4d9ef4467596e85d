//! Core data models shared by the engines and the pipeline

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// Deserializes leniently through [`RiskTolerance::parse`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    /// Lenient parse; anything unrecognised is treated as moderate.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "conservative" | "low" => RiskTolerance::Conservative,
            "aggressive" | "high" => RiskTolerance::Aggressive,
            _ => RiskTolerance::Moderate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        }
    }
}

impl From<String> for RiskTolerance {
    fn from(raw: String) -> Self {
        RiskTolerance::parse(&raw)
    }
}

/// Ordering is by urgency: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Severity tag attached to stress scenarios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Graded exposure used by portfolio risk assessments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ExposureLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    Cash,
    BankTransfer,
    DigitalWallet,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

//
// ================= Expenses =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: Uuid,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub merchant: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_frequency: Option<RecurringFrequency>,
}

impl ExpenseRecord {
    pub fn new(amount: Decimal, category: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            category: category.into(),
            description: String::new(),
            merchant: String::new(),
            payment_method: PaymentMethod::default(),
            timestamp,
            tags: BTreeSet::new(),
            is_recurring: false,
            recurring_frequency: None,
        }
    }

    /// Amount as a float for the statistical models.
    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(0.0)
    }
}

//
// ================= Snapshot =================
//

/// Household figures that sit next to the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialProfile {
    pub monthly_income: f64,
    pub monthly_budget: f64,
    pub target_daily_spending: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub emergency_fund: f64,
    /// Share of a medical bill paid by insurance, 0.0..=1.0
    pub health_insurance_coverage: f64,
    pub age: u32,
    pub financial_goals: Vec<String>,
}

impl Default for FinancialProfile {
    fn default() -> Self {
        Self {
            monthly_income: 5000.0,
            monthly_budget: 3000.0,
            target_daily_spending: 100.0,
            total_assets: 100_000.0,
            total_liabilities: 25_000.0,
            emergency_fund: 15_000.0,
            health_insurance_coverage: 0.8,
            age: 35,
            financial_goals: Vec::new(),
        }
    }
}

impl FinancialProfile {
    pub fn net_worth(&self) -> f64 {
        self.total_assets - self.total_liabilities
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub symbols: Vec<String>,
    /// symbol -> portfolio weight
    pub allocations: BTreeMap<String, f64>,
    pub total_value: f64,
    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
    #[serde(default = "default_investment_horizon")]
    pub investment_horizon: String,
}

fn default_investment_horizon() -> String {
    "10+ years".to_string()
}

impl Default for Portfolio {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            allocations: BTreeMap::new(),
            total_value: 0.0,
            risk_tolerance: RiskTolerance::default(),
            investment_horizon: default_investment_horizon(),
        }
    }
}

impl Portfolio {
    /// Dollar value per symbol, derived from the weights.
    pub fn holdings(&self) -> Vec<Holding> {
        self.symbols
            .iter()
            .map(|symbol| Holding {
                symbol: symbol.clone(),
                value: self.allocations.get(symbol).copied().unwrap_or(0.0) * self.total_value,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub current_price: f64,
    #[serde(default)]
    pub price_change: f64,
    #[serde(default)]
    pub price_change_pct: f64,
    #[serde(default)]
    pub volume: Option<u64>,
    #[serde(default)]
    pub volatility: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
}

/// Outcome of one per-symbol market data fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolQuote {
    Available(MarketData),
    Unavailable { error: String },
}

impl SymbolQuote {
    pub fn data(&self) -> Option<&MarketData> {
        match self {
            SymbolQuote::Available(data) => Some(data),
            SymbolQuote::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SymbolQuote::Available(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicIndicators {
    pub inflation_rate: f64,
    pub unemployment_rate: f64,
    pub gdp_growth: f64,
    pub federal_funds_rate: f64,
    pub market_sentiment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub portfolio_volatility: f64,
    pub var_95: f64,
    pub risk_level: ExposureLevel,
    pub diversification_score: f64,
}

impl RiskMetrics {
    /// Equal-weight risk figures over the quotes that carry a volatility.
    /// Returns `None` when no quote does.
    pub fn from_market_data(market_data: &BTreeMap<String, SymbolQuote>) -> Option<Self> {
        if market_data.is_empty() {
            return None;
        }

        let weight = 1.0 / market_data.len() as f64;
        let volatilities: Vec<f64> = market_data
            .values()
            .filter_map(SymbolQuote::data)
            .filter_map(|d| d.volatility)
            .collect();

        if volatilities.is_empty() {
            return None;
        }

        let portfolio_volatility: f64 = volatilities.iter().map(|v| v * weight).sum();

        let sectors: BTreeSet<&str> = market_data
            .values()
            .filter_map(SymbolQuote::data)
            .filter_map(|d| d.sector.as_deref())
            .collect();
        let diversification_score =
            (sectors.len() as f64 / market_data.len() as f64 * 100.0).min(100.0);

        Some(Self {
            portfolio_volatility,
            var_95: portfolio_volatility * 1.65,
            risk_level: volatility_band(portfolio_volatility),
            diversification_score,
        })
    }
}

fn volatility_band(volatility: f64) -> ExposureLevel {
    if volatility < 0.15 {
        ExposureLevel::Low
    } else if volatility < 0.25 {
        ExposureLevel::Moderate
    } else if volatility < 0.35 {
        ExposureLevel::High
    } else {
        ExposureLevel::VeryHigh
    }
}

/// Point-in-time financial picture for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub user_id: String,
    pub portfolio: Portfolio,
    pub profile: FinancialProfile,
    #[serde(default)]
    pub market_data: BTreeMap<String, SymbolQuote>,
    #[serde(default)]
    pub economic_indicators: Option<EconomicIndicators>,
    #[serde(default)]
    pub risk_metrics: Option<RiskMetrics>,
    pub collected_at: DateTime<Utc>,
}

impl FinancialSnapshot {
    /// No holdings and default profile values, used when collection produced nothing.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            portfolio: Portfolio::default(),
            profile: FinancialProfile::default(),
            market_data: BTreeMap::new(),
            economic_indicators: None,
            risk_metrics: None,
            collected_at: Utc::now(),
        }
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.market_data
            .iter()
            .filter(|(_, quote)| !quote.is_available())
            .map(|(symbol, _)| symbol.as_str())
            .collect()
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(volatility: f64, sector: &str) -> SymbolQuote {
        SymbolQuote::Available(MarketData {
            current_price: 100.0,
            volatility: Some(volatility),
            sector: Some(sector.to_string()),
            ..MarketData::default()
        })
    }

    #[test]
    fn test_risk_tolerance_parse_falls_back_to_moderate() {
        assert_eq!(RiskTolerance::parse("Conservative"), RiskTolerance::Conservative);
        assert_eq!(RiskTolerance::parse("aggressive"), RiskTolerance::Aggressive);
        assert_eq!(RiskTolerance::parse("yolo"), RiskTolerance::Moderate);
    }

    #[test]
    fn test_portfolio_with_unknown_risk_tolerance_deserializes() {
        let json = r#"{
            "symbols": ["SPY"],
            "allocations": {"SPY": 1.0},
            "total_value": 10000.0,
            "risk_tolerance": "growth"
        }"#;
        let portfolio: Portfolio = serde_json::from_str(json).unwrap();
        assert_eq!(portfolio.risk_tolerance, RiskTolerance::Moderate);

        let conservative: RiskTolerance = serde_json::from_str("\"Conservative\"").unwrap();
        assert_eq!(conservative, RiskTolerance::Conservative);
        assert_eq!(
            serde_json::to_string(&RiskTolerance::Aggressive).unwrap(),
            "\"aggressive\""
        );
    }

    #[test]
    fn test_priority_orders_by_urgency() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_portfolio_holdings_use_weights() {
        let portfolio = Portfolio {
            symbols: vec!["AAPL".into(), "BND".into()],
            allocations: BTreeMap::from([("AAPL".into(), 0.75), ("BND".into(), 0.25)]),
            total_value: 40_000.0,
            risk_tolerance: RiskTolerance::Moderate,
            investment_horizon: "10+ years".into(),
        };

        let holdings = portfolio.holdings();
        assert_eq!(holdings[0].value, 30_000.0);
        assert_eq!(holdings[1].value, 10_000.0);
    }

    #[test]
    fn test_risk_metrics_ignore_unavailable_quotes() {
        let market_data = BTreeMap::from([
            ("AAPL".to_string(), quote(0.2, "Technology")),
            ("XOM".to_string(), quote(0.2, "Energy")),
            (
                "TSLA".to_string(),
                SymbolQuote::Unavailable {
                    error: "timeout".into(),
                },
            ),
            ("MSFT".to_string(), quote(0.2, "Technology")),
        ]);

        let metrics = RiskMetrics::from_market_data(&market_data).unwrap();
        assert!((metrics.portfolio_volatility - 0.15).abs() < 1e-9);
        assert!((metrics.var_95 - 0.2475).abs() < 1e-9);
        assert_eq!(metrics.risk_level, ExposureLevel::Moderate);
        assert!((metrics.diversification_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_symbol_quote_serializes_with_status_tag() {
        let json = serde_json::to_value(SymbolQuote::Unavailable {
            error: "not found".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["error"], "not found");
    }
}
