//! Economic scenarios and scenario-weighted investment return projections

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Baseline,
    Optimistic,
    Pessimistic,
}

/// Fixed macro assumptions, annual rates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EconomicScenario {
    pub kind: ScenarioKind,
    pub inflation_rate: f64,
    pub interest_rate: f64,
    pub market_return: f64,
    pub probability: f64,
}

pub const ECONOMIC_SCENARIOS: [EconomicScenario; 3] = [
    EconomicScenario {
        kind: ScenarioKind::Baseline,
        inflation_rate: 0.025,
        interest_rate: 0.05,
        market_return: 0.08,
        probability: 0.6,
    },
    EconomicScenario {
        kind: ScenarioKind::Optimistic,
        inflation_rate: 0.02,
        interest_rate: 0.04,
        market_return: 0.12,
        probability: 0.2,
    },
    EconomicScenario {
        kind: ScenarioKind::Pessimistic,
        inflation_rate: 0.04,
        interest_rate: 0.07,
        market_return: 0.04,
        probability: 0.2,
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnProjection {
    pub horizon_days: u32,
    pub projected_value: f64,
    pub total_return: f64,
    /// Fraction, e.g. 0.08 for 8%
    pub annualized_return: f64,
    pub real_return: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub scenario: ScenarioKind,
    pub probability: f64,
    pub inflation_rate: f64,
    pub projections: Vec<ReturnProjection>,
}

impl EconomicScenario {
    pub fn project(&self, current_value: f64, horizon_days: u32) -> ReturnProjection {
        let h = horizon_days as f64;
        let projected_value = current_value * (1.0 + self.market_return / 365.0 * h);
        let total_return = projected_value - current_value;

        let annualized_return = if horizon_days == 0 || current_value <= 0.0 {
            0.0
        } else {
            (projected_value / current_value).powf(365.0 / h) - 1.0
        };

        ReturnProjection {
            horizon_days,
            projected_value,
            total_return,
            annualized_return,
            real_return: total_return - current_value * self.inflation_rate / 365.0 * h,
        }
    }
}

pub fn project_returns(current_value: f64, horizons: &[u32]) -> Vec<ScenarioProjection> {
    ECONOMIC_SCENARIOS
        .iter()
        .map(|scenario| ScenarioProjection {
            scenario: scenario.kind,
            probability: scenario.probability,
            inflation_rate: scenario.inflation_rate,
            projections: horizons
                .iter()
                .map(|h| scenario.project(current_value, *h))
                .collect(),
        })
        .collect()
}

/// Probability-weighted projected value across all scenarios.
pub fn expected_value(projections: &[ScenarioProjection], horizon_days: u32) -> f64 {
    projections
        .iter()
        .filter_map(|sp| {
            sp.projections
                .iter()
                .find(|p| p.horizon_days == horizon_days)
                .map(|p| p.projected_value * sp.probability)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probabilities_sum_to_one() {
        let total: f64 = ECONOMIC_SCENARIOS.iter().map(|s| s.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_one_year_projection() {
        let projection = ECONOMIC_SCENARIOS[0].project(50_000.0, 365);
        assert!((projection.projected_value - 54_000.0).abs() < 1e-6);
        assert!((projection.total_return - 4_000.0).abs() < 1e-6);
        assert!((projection.annualized_return - 0.08).abs() < 1e-9);
        // 4000 - 50000 * 0.025
        assert!((projection.real_return - 2_750.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_horizon_has_zero_annualized_return() {
        let projection = ECONOMIC_SCENARIOS[1].project(10_000.0, 0);
        assert_eq!(projection.annualized_return, 0.0);
        assert_eq!(projection.total_return, 0.0);
    }

    #[test]
    fn test_project_returns_covers_every_scenario_and_horizon() {
        let projections = project_returns(100_000.0, &[30, 90, 180, 365]);
        assert_eq!(projections.len(), 3);
        assert!(projections.iter().all(|p| p.projections.len() == 4));

        // 0.6 * 108000 + 0.2 * 112000 + 0.2 * 104000
        let expected = expected_value(&projections, 365);
        assert!((expected - 108_000.0).abs() < 1e-6);
    }
}
