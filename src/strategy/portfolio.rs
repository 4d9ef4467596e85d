//! Current-portfolio analysis: classification, concentration, rebalancing

use super::{AssetClass, Allocation, REBALANCE_THRESHOLD};
use crate::error::AdvisorError;
use crate::models::{ExposureLevel, Holding, Priority, SymbolQuote};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BOND_TICKERS: [&str; 6] = ["BND", "AGG", "LQD", "MUB", "TLT", "SHY"];
const CASH_TICKERS: [&str; 3] = ["SPRXX", "SPAXX", "FDRXX"];

/// Holdings needed for a full diversification score.
const FULL_DIVERSIFICATION_HOLDINGS: f64 = 20.0;
const HIGH_PRIORITY_GAP: f64 = 0.10;
const UNKNOWN_SECTOR: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRisk {
    pub concentration_risk: f64,
    pub diversification_score: f64,
    pub num_holdings: usize,
    pub risk_level: ExposureLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebalanceAction {
    pub asset_class: AssetClass,
    pub current: f64,
    pub target: f64,
    pub difference: f64,
    pub action: TradeDirection,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub total_value: f64,
    pub asset_allocation: Allocation,
    /// Sector -> share of total value
    pub sector_exposure: BTreeMap<String, f64>,
    pub risk: PortfolioRisk,
    pub rebalancing: Vec<RebalanceAction>,
    pub health_score: f64,
}

/// Substring match against known bond and cash tickers; bonds win ties.
pub fn classify(symbol: &str) -> AssetClass {
    let symbol = symbol.to_uppercase();
    if BOND_TICKERS.iter().any(|t| symbol.contains(t)) {
        AssetClass::Bonds
    } else if CASH_TICKERS.iter().any(|t| symbol.contains(t)) {
        AssetClass::Cash
    } else {
        AssetClass::Stocks
    }
}

fn total_value(holdings: &[Holding]) -> f64 {
    holdings.iter().map(|h| h.value).sum()
}

/// Value share per asset class; all zero when the portfolio has no value.
pub fn current_allocation(holdings: &[Holding]) -> Allocation {
    let total = total_value(holdings);
    let mut allocation = Allocation::default();
    if total <= 0.0 {
        return allocation;
    }

    for holding in holdings {
        *allocation.get_mut(classify(&holding.symbol)) += holding.value / total;
    }
    allocation
}

pub fn assess_risk(holdings: &[Holding]) -> PortfolioRisk {
    let total = total_value(holdings);
    let largest = holdings.iter().map(|h| h.value).fold(0.0_f64, f64::max);

    let concentration_risk = if total > 0.0 { largest / total } else { 0.0 };
    let diversification_score =
        (holdings.len() as f64 / FULL_DIVERSIFICATION_HOLDINGS * 100.0).min(100.0);

    PortfolioRisk {
        concentration_risk,
        diversification_score,
        num_holdings: holdings.len(),
        risk_level: risk_level(concentration_risk, diversification_score),
    }
}

pub fn risk_level(concentration_risk: f64, diversification_score: f64) -> ExposureLevel {
    if concentration_risk > 0.25 || diversification_score < 30.0 {
        ExposureLevel::High
    } else if concentration_risk > 0.15 || diversification_score < 60.0 {
        ExposureLevel::Moderate
    } else {
        ExposureLevel::Low
    }
}

pub fn rebalancing_actions(current: &Allocation, target: &Allocation) -> Vec<RebalanceAction> {
    target
        .iter()
        .filter_map(|(class, target_weight)| {
            let current_weight = current.get(class);
            let difference = target_weight - current_weight;
            if difference.abs() <= REBALANCE_THRESHOLD {
                return None;
            }

            Some(RebalanceAction {
                asset_class: class,
                current: current_weight,
                target: target_weight,
                difference,
                action: if difference > 0.0 {
                    TradeDirection::Buy
                } else {
                    TradeDirection::Sell
                },
                priority: if difference.abs() > HIGH_PRIORITY_GAP {
                    Priority::High
                } else {
                    Priority::Medium
                },
            })
        })
        .collect()
}

/// Value-weighted sector shares, from whichever quotes carry a sector.
pub fn sector_exposure(
    holdings: &[Holding],
    market_data: &BTreeMap<String, SymbolQuote>,
) -> BTreeMap<String, f64> {
    let total = total_value(holdings);
    let mut exposure = BTreeMap::new();
    if total <= 0.0 {
        return exposure;
    }

    for holding in holdings {
        let sector = market_data
            .get(&holding.symbol)
            .and_then(SymbolQuote::data)
            .and_then(|d| d.sector.clone())
            .unwrap_or_else(|| UNKNOWN_SECTOR.to_string());
        *exposure.entry(sector).or_insert(0.0) += holding.value / total;
    }
    exposure
}

/// 0-100: up to 40 for diversification, 30/20/10 for low/moderate/high risk.
pub fn health_score(risk: &PortfolioRisk) -> f64 {
    let diversification = (risk.diversification_score * 0.4).min(40.0);
    let risk_points = match risk.risk_level {
        ExposureLevel::Low => 30.0,
        ExposureLevel::Moderate => 20.0,
        ExposureLevel::High | ExposureLevel::VeryHigh => 10.0,
    };
    (diversification + risk_points).min(100.0)
}

pub fn analyze(
    holdings: &[Holding],
    target: &Allocation,
    market_data: &BTreeMap<String, SymbolQuote>,
) -> Result<PortfolioAnalysis> {
    let total = total_value(holdings);
    if holdings.is_empty() || total <= 0.0 {
        return Err(AdvisorError::InsufficientData(
            "No portfolio holdings with value".to_string(),
        ));
    }

    let asset_allocation = current_allocation(holdings);
    let risk = assess_risk(holdings);

    Ok(PortfolioAnalysis {
        total_value: total,
        asset_allocation,
        sector_exposure: sector_exposure(holdings, market_data),
        rebalancing: rebalancing_actions(&asset_allocation, target),
        health_score: health_score(&risk),
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketData;

    fn holding(symbol: &str, value: f64) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            value,
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify("BND"), AssetClass::Bonds);
        assert_eq!(classify("SPRXX"), AssetClass::Cash);
        assert_eq!(classify("AAPL"), AssetClass::Stocks);
        assert_eq!(classify("vbmfx-bnd"), AssetClass::Bonds);
        assert_eq!(classify("spaxx"), AssetClass::Cash);
    }

    #[test]
    fn test_current_allocation_sums_to_one() {
        let holdings = vec![
            holding("AAPL", 3_000.0),
            holding("MSFT", 2_000.0),
            holding("BND", 4_000.0),
            holding("SPRXX", 1_000.0),
        ];
        let allocation = current_allocation(&holdings);
        assert!((allocation.sum() - 1.0).abs() < 1e-6);
        assert!((allocation.stocks - 0.5).abs() < 1e-9);
        assert!((allocation.bonds - 0.4).abs() < 1e-9);
        assert!((allocation.cash - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_risk_assessment() {
        let concentrated = assess_risk(&[holding("AAPL", 9_000.0), holding("MSFT", 1_000.0)]);
        assert!((concentrated.concentration_risk - 0.9).abs() < 1e-9);
        assert!((concentrated.diversification_score - 10.0).abs() < 1e-9);
        assert_eq!(concentrated.risk_level, ExposureLevel::High);

        assert_eq!(risk_level(0.10, 100.0), ExposureLevel::Low);
        assert_eq!(risk_level(0.20, 100.0), ExposureLevel::Moderate);
        assert_eq!(risk_level(0.10, 50.0), ExposureLevel::Moderate);
        assert_eq!(risk_level(0.30, 100.0), ExposureLevel::High);
    }

    #[test]
    fn test_rebalancing_actions() {
        let current = Allocation::new(0.10, 0.82, 0.08);
        let target = Allocation::new(0.40, 0.50, 0.10);

        let actions = rebalancing_actions(&current, &target);
        assert_eq!(actions.len(), 2);

        let bonds = &actions[0];
        assert_eq!(bonds.asset_class, AssetClass::Bonds);
        assert_eq!(bonds.action, TradeDirection::Buy);
        assert_eq!(bonds.priority, Priority::High);

        let stocks = &actions[1];
        assert_eq!(stocks.action, TradeDirection::Sell);
        assert!((stocks.difference + 0.32).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_reports_sectors_and_health() {
        let holdings = vec![holding("AAPL", 6_000.0), holding("BND", 4_000.0)];
        let market_data = BTreeMap::from([(
            "AAPL".to_string(),
            SymbolQuote::Available(MarketData {
                current_price: 190.0,
                sector: Some("Technology".to_string()),
                ..MarketData::default()
            }),
        )]);

        let analysis = analyze(&holdings, &Allocation::new(0.4, 0.5, 0.1), &market_data).unwrap();
        assert_eq!(analysis.total_value, 10_000.0);
        assert!((analysis.sector_exposure["Technology"] - 0.6).abs() < 1e-9);
        assert!((analysis.sector_exposure["Unknown"] - 0.4).abs() < 1e-9);
        // 2 holdings: diversification 10 -> 4 points, high risk -> 10 points
        assert!((analysis.health_score - 14.0).abs() < 1e-9);
        assert_eq!(analysis.rebalancing.len(), 2);
    }

    #[test]
    fn test_analyze_empty_holdings_is_insufficient_data() {
        let err = analyze(&[], &Allocation::new(0.4, 0.5, 0.1), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, AdvisorError::InsufficientData(_)));
    }
}
