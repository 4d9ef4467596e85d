//! HTTP market data source
//!
//! Talks to a JSON quote service at `FINANCIAL_API_BASE_URL`:
//! `GET {base}/quotes/{symbol}` and `GET {base}/economic-indicators`.

use super::MarketDataSource;
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::models::{EconomicIndicators, MarketData};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct HttpMarketDataSource {
    client: Client,
    base_url: String,
}

impl HttpMarketDataSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `None` when no base URL is configured.
    pub fn from_config(config: &AdvisorConfig) -> Result<Option<Self>> {
        config
            .financial_api_base_url
            .as_deref()
            .map(|url| Self::new(url, config.http_timeout_secs))
            .transpose()
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!("{}/quotes/{}", self.base_url, symbol.trim().to_uppercase())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            AdvisorError::DataCollection(format!("Financial API request failed for {}: {}", url, e))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::DataCollection(format!(
                "Financial API returned {} for {}: {}",
                status, url, body
            )));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| AdvisorError::DataCollection(format!("Invalid JSON response: {}", e)))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn fetch_quote(&self, symbol: &str) -> Result<MarketData> {
        let url = self.quote_url(symbol);
        debug!(symbol = %symbol, "Fetching quote");

        self.get_json::<MarketData>(&url)
            .await?
            .ok_or_else(|| AdvisorError::DataCollection(format!("Unknown symbol {}", symbol)))
    }

    async fn economic_indicators(&self) -> Result<Option<EconomicIndicators>> {
        let url = format!("{}/economic-indicators", self.base_url);
        self.get_json::<EconomicIndicators>(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_without_base_url() {
        let source = HttpMarketDataSource::from_config(&AdvisorConfig::default()).unwrap();
        assert!(source.is_none());
    }

    #[test]
    fn test_quote_url_normalisation() {
        let config = AdvisorConfig {
            financial_api_base_url: Some("http://localhost:9000/api/".to_string()),
            ..AdvisorConfig::default()
        };
        let source = HttpMarketDataSource::from_config(&config).unwrap().unwrap();
        assert_eq!(source.quote_url(" spy "), "http://localhost:9000/api/quotes/SPY");
    }
}
