//! Data collaborators
//!
//! Traits for everything the pipeline reads from the outside world, plus the
//! per-symbol market data fan-out used to assemble a snapshot.

use crate::models::{
    EconomicIndicators, ExpenseRecord, FinancialProfile, FinancialSnapshot, MarketData, Portfolio,
    RiskMetrics, SymbolQuote,
};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod http;
pub mod memory;

pub use http::HttpMarketDataSource;
pub use memory::{InMemoryAccountStore, InMemoryExpenseStore, StaticMarketData};

/// Source of a user's expense history. An empty history is a valid answer.
#[async_trait]
pub trait ExpenseHistoryProvider: Send + Sync {
    async fn fetch(&self, user_id: &str, days: u32) -> Result<Vec<ExpenseRecord>>;
}

/// Source of a point-in-time financial snapshot.
/// Unavailable symbols are reported inside the snapshot, not as an error.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<FinancialSnapshot>;
}

/// Portfolio and household figures for a user.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn portfolio(&self, user_id: &str) -> Result<Portfolio>;
    async fn profile(&self, user_id: &str) -> Result<FinancialProfile>;
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<MarketData>;

    async fn economic_indicators(&self) -> Result<Option<EconomicIndicators>> {
        Ok(None)
    }
}

/// One concurrent fetch per symbol, joined before returning.
/// A failed symbol becomes `SymbolQuote::Unavailable` and leaves its siblings alone.
pub async fn collect_market_data(
    source: &dyn MarketDataSource,
    symbols: &[String],
) -> BTreeMap<String, SymbolQuote> {
    let fetches = symbols.iter().map(|symbol| async move {
        let quote = match source.fetch_quote(symbol).await {
            Ok(data) => SymbolQuote::Available(data),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Market data fetch failed");
                SymbolQuote::Unavailable {
                    error: e.to_string(),
                }
            }
        };
        (symbol.clone(), quote)
    });

    join_all(fetches).await.into_iter().collect()
}

/// Builds snapshots from an account source and a market data source.
pub struct AssembledSnapshotProvider {
    accounts: Arc<dyn AccountSource>,
    market: Arc<dyn MarketDataSource>,
}

impl AssembledSnapshotProvider {
    pub fn new(accounts: Arc<dyn AccountSource>, market: Arc<dyn MarketDataSource>) -> Self {
        Self { accounts, market }
    }
}

#[async_trait]
impl SnapshotProvider for AssembledSnapshotProvider {
    async fn fetch(&self, user_id: &str) -> Result<FinancialSnapshot> {
        let portfolio = self.accounts.portfolio(user_id).await?;
        let profile = self.accounts.profile(user_id).await?;

        let market_data = if portfolio.symbols.is_empty() {
            BTreeMap::new()
        } else {
            collect_market_data(self.market.as_ref(), &portfolio.symbols).await
        };

        let economic_indicators = match self.market.economic_indicators().await {
            Ok(indicators) => indicators,
            Err(e) => {
                warn!(error = %e, "Economic indicators unavailable");
                None
            }
        };

        let risk_metrics = RiskMetrics::from_market_data(&market_data);

        let snapshot = FinancialSnapshot {
            user_id: user_id.to_string(),
            portfolio,
            profile,
            market_data,
            economic_indicators,
            risk_metrics,
            collected_at: Utc::now(),
        };

        let failed = snapshot.failed_symbols();
        if failed.is_empty() {
            debug!(user_id = %user_id, symbols = snapshot.market_data.len(), "Snapshot assembled");
        } else {
            info!(
                user_id = %user_id,
                symbols = snapshot.market_data.len(),
                failed = ?failed,
                "Snapshot assembled with partial market data"
            );
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::models::RiskTolerance;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataSource for CountingSource {
        async fn fetch_quote(&self, symbol: &str) -> Result<MarketData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol == "FAIL" {
                return Err(AdvisorError::DataCollection("upstream timeout".to_string()));
            }
            tokio::task::yield_now().await;
            Ok(MarketData {
                current_price: 10.0,
                volatility: Some(0.1),
                sector: Some("Technology".to_string()),
                ..MarketData::default()
            })
        }

        async fn economic_indicators(&self) -> Result<Option<EconomicIndicators>> {
            Err(AdvisorError::DataCollection("indicators offline".to_string()))
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fan_out_tolerates_individual_failures() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };

        let quotes = collect_market_data(&source, &symbols(&["AAPL", "FAIL", "MSFT"])).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(quotes.len(), 3);
        assert!(quotes["AAPL"].is_available());
        assert!(quotes["MSFT"].is_available());
        match &quotes["FAIL"] {
            SymbolQuote::Unavailable { error } => assert!(error.contains("upstream timeout")),
            other => panic!("expected unavailable quote, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_assembled_snapshot_reports_partial_data() {
        let accounts = InMemoryAccountStore::new();
        accounts
            .insert(
                "user-1",
                Portfolio {
                    symbols: symbols(&["AAPL", "FAIL"]),
                    allocations: BTreeMap::from([("AAPL".into(), 0.5), ("FAIL".into(), 0.5)]),
                    total_value: 20_000.0,
                    risk_tolerance: RiskTolerance::Moderate,
                    investment_horizon: "10+ years".into(),
                },
                FinancialProfile::default(),
            )
            .await;

        let provider = AssembledSnapshotProvider::new(
            Arc::new(accounts),
            Arc::new(CountingSource {
                calls: AtomicUsize::new(0),
            }),
        );

        let snapshot = provider.fetch("user-1").await.unwrap();
        assert_eq!(snapshot.failed_symbols(), vec!["FAIL"]);
        assert!(snapshot.economic_indicators.is_none());
        // one of two quotes has volatility 0.1, equal weight 0.5
        let metrics = snapshot.risk_metrics.unwrap();
        assert!((metrics.portfolio_volatility - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_assembled_snapshot_unknown_user_fails() {
        let provider = AssembledSnapshotProvider::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(StaticMarketData::new(HashMap::new())),
        );
        let err = provider.fetch("ghost").await.unwrap_err();
        assert!(matches!(err, AdvisorError::DataCollection(_)));
    }
}
