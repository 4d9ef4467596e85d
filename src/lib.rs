//! Financial Planning Advisor
//!
//! Personal finance advice built from expense history and a notional
//! investment portfolio:
//! - Deterministic forecasting (cash flow, net worth, expenses, returns, stress tests)
//! - Allocation strategies and portfolio analysis
//! - Expense pattern and budget analysis
//! - A fail-soft planning pipeline with pluggable collaborators
//!
//! PIPELINE:
//! COLLECT → ANALYZE EXPENSES → INVESTMENT ADVICE → FORECAST → SYNTHESIZE → DONE

pub mod collectors;
pub mod config;
pub mod error;
pub mod expenses;
pub mod forecast;
pub mod models;
pub mod narrative;
pub mod pipeline;
pub mod strategy;

pub use error::{AdvisorError, Result};

// Re-export common types
pub use config::AdvisorConfig;
pub use models::*;
pub use pipeline::{ErrorPolicy, Orchestrator, PlanResult, PlanningState};
