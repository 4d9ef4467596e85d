//! In-memory collaborators for development and tests.

use super::{AccountSource, ExpenseHistoryProvider, MarketDataSource};
use crate::error::AdvisorError;
use crate::models::{EconomicIndicators, ExpenseRecord, FinancialProfile, MarketData, Portfolio};
use crate::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Expense history keyed by user id
pub struct InMemoryExpenseStore {
    expenses_by_user: Arc<RwLock<HashMap<String, Vec<ExpenseRecord>>>>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self {
            expenses_by_user: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn add_expense(&self, user_id: &str, expense: ExpenseRecord) {
        let mut expenses = self.expenses_by_user.write().await;
        expenses
            .entry(user_id.to_string())
            .or_insert_with(Vec::new)
            .push(expense);
    }

    pub async fn extend(&self, user_id: &str, records: impl IntoIterator<Item = ExpenseRecord>) {
        let mut expenses = self.expenses_by_user.write().await;
        expenses
            .entry(user_id.to_string())
            .or_insert_with(Vec::new)
            .extend(records);
    }
}

impl Default for InMemoryExpenseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExpenseHistoryProvider for InMemoryExpenseStore {
    /// Records from the last `days` days, oldest first.
    async fn fetch(&self, user_id: &str, days: u32) -> Result<Vec<ExpenseRecord>> {
        let cutoff = Utc::now() - Duration::days(days as i64);
        let expenses = self.expenses_by_user.read().await;

        let mut records: Vec<ExpenseRecord> = expenses
            .get(user_id)
            .map(|all| {
                all.iter()
                    .filter(|e| e.timestamp >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by_key(|e| e.timestamp);

        Ok(records)
    }
}

/// Portfolio + profile per user
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, (Portfolio, FinancialProfile)>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, user_id: &str, portfolio: Portfolio, profile: FinancialProfile) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(user_id.to_string(), (portfolio, profile));
    }

    async fn account(&self, user_id: &str) -> Result<(Portfolio, FinancialProfile)> {
        let accounts = self.accounts.read().await;
        accounts.get(user_id).cloned().ok_or_else(|| {
            AdvisorError::DataCollection(format!("No account found for user {}", user_id))
        })
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountSource for InMemoryAccountStore {
    async fn portfolio(&self, user_id: &str) -> Result<Portfolio> {
        Ok(self.account(user_id).await?.0)
    }

    async fn profile(&self, user_id: &str) -> Result<FinancialProfile> {
        Ok(self.account(user_id).await?.1)
    }
}

/// Fixed quotes; unknown symbols fail.
pub struct StaticMarketData {
    quotes: HashMap<String, MarketData>,
    indicators: Option<EconomicIndicators>,
}

impl StaticMarketData {
    pub fn new(quotes: HashMap<String, MarketData>) -> Self {
        Self {
            quotes,
            indicators: None,
        }
    }

    pub fn with_indicators(mut self, indicators: EconomicIndicators) -> Self {
        self.indicators = Some(indicators);
        self
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketData {
    async fn fetch_quote(&self, symbol: &str) -> Result<MarketData> {
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| AdvisorError::DataCollection(format!("No market data for {}", symbol)))
    }

    async fn economic_indicators(&self) -> Result<Option<EconomicIndicators>> {
        Ok(self.indicators.clone())
    }
}
