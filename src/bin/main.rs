use chrono::{Duration, Utc};
use financial_planning_advisor::{
    collectors::{
        AssembledSnapshotProvider, HttpMarketDataSource, InMemoryAccountStore,
        InMemoryExpenseStore, MarketDataSource, StaticMarketData,
    },
    narrative::{GeminiNarrator, NarrativeGenerator, TemplateNarrator},
    AdvisorConfig, EconomicIndicators, ExpenseRecord, FinancialProfile, MarketData, Orchestrator,
    PaymentMethod, Portfolio, RiskTolerance,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_USER: &str = "demo-user";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AdvisorConfig::from_env()?;

    let query = env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let query = if query.trim().is_empty() {
        "How can I improve my savings and investment strategy?".to_string()
    } else {
        query
    };

    info!("Financial Planning Advisor starting");

    let narrator: Arc<dyn NarrativeGenerator> = if config.has_llm_credentials() {
        info!(model = %config.gemini_model, "Using Gemini narrator");
        Arc::new(GeminiNarrator::new(&config)?)
    } else {
        info!("GEMINI_API_KEY not set, using offline narrator");
        Arc::new(TemplateNarrator)
    };

    let market: Arc<dyn MarketDataSource> = match HttpMarketDataSource::from_config(&config)? {
        Some(source) => Arc::new(source),
        None => Arc::new(demo_market_data()),
    };

    let expenses = InMemoryExpenseStore::new();
    expenses.extend(DEMO_USER, demo_expenses()).await;

    let accounts = InMemoryAccountStore::new();
    let (portfolio, profile) = demo_account();
    accounts.insert(DEMO_USER, portfolio, profile).await;

    let orchestrator = Orchestrator::standard(
        Arc::new(expenses),
        Arc::new(AssembledSnapshotProvider::new(Arc::new(accounts), market)),
        narrator,
        &config,
    );

    info!(query = %query, user_id = DEMO_USER, "Running planner");
    let result = orchestrator.produce_plan(&query, DEMO_USER).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn demo_account() -> (Portfolio, FinancialProfile) {
    let allocations = BTreeMap::from([
        ("AAPL".to_string(), 0.25),
        ("GOOGL".to_string(), 0.20),
        ("MSFT".to_string(), 0.20),
        ("TSLA".to_string(), 0.15),
        ("SPY".to_string(), 0.20),
    ]);

    let portfolio = Portfolio {
        symbols: allocations.keys().cloned().collect(),
        allocations,
        total_value: 100_000.0,
        risk_tolerance: RiskTolerance::Moderate,
        investment_horizon: "10+ years".to_string(),
    };

    let profile = FinancialProfile {
        financial_goals: vec!["retirement".to_string(), "emergency_fund".to_string()],
        ..FinancialProfile::default()
    };

    (portfolio, profile)
}

fn demo_market_data() -> StaticMarketData {
    let quote = |price: f64, change_pct: f64, volatility: f64, sector: &str| MarketData {
        current_price: price,
        price_change: price * change_pct / 100.0,
        price_change_pct: change_pct,
        volume: Some(25_000_000),
        volatility: Some(volatility),
        sector: Some(sector.to_string()),
    };

    // TSLA deliberately absent: shows a partial snapshot
    StaticMarketData::new(HashMap::from([
        ("AAPL".to_string(), quote(189.5, 0.8, 0.24, "Technology")),
        ("GOOGL".to_string(), quote(141.2, -0.4, 0.27, "Communication Services")),
        ("MSFT".to_string(), quote(415.1, 0.3, 0.22, "Technology")),
        ("SPY".to_string(), quote(512.7, 0.1, 0.15, "Broad Market")),
    ]))
    .with_indicators(EconomicIndicators {
        inflation_rate: 3.2,
        unemployment_rate: 3.8,
        gdp_growth: 2.1,
        federal_funds_rate: 5.25,
        market_sentiment: "neutral".to_string(),
    })
}

/// Sixty days of plausible spending.
fn demo_expenses() -> Vec<ExpenseRecord> {
    let categories = [
        ("Groceries", 62_i64, "Whole Foods", PaymentMethod::DebitCard),
        ("Dining", 38, "Local Bistro", PaymentMethod::CreditCard),
        ("Transport", 24, "Metro Transit", PaymentMethod::DigitalWallet),
        ("Entertainment", 45, "Cinema", PaymentMethod::CreditCard),
        ("Utilities", 18, "City Power", PaymentMethod::BankTransfer),
    ];
    let now = Utc::now();

    (1..=60_i64)
        .flat_map(|day| {
            categories
                .iter()
                .enumerate()
                .filter(move |(i, _)| (day + *i as i64) % 3 != 0)
                .map(move |(i, (category, base, merchant, method))| {
                    let cents = (base * 100) + ((day * 37 + i as i64 * 11) % 900);
                    let mut record = ExpenseRecord::new(
                        Decimal::new(cents, 2),
                        *category,
                        now - Duration::days(day) - Duration::hours(i as i64 * 3),
                    );
                    record.merchant = merchant.to_string();
                    record.payment_method = *method;
                    record
                })
        })
        .collect()
}
