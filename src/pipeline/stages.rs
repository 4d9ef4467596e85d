//! The five planning stages
//!
//! Each stage reads the state it is given and returns what it produced.
//! Failures are returned as the stage's own error category; the driver
//! decides what to do with them.

use super::state::{PlanningState, StageKind, StageOutput};
use crate::collectors::{ExpenseHistoryProvider, SnapshotProvider};
use crate::error::AdvisorError;
use crate::expenses::ExpenseAnalyzer;
use crate::forecast::ForecastEngine;
use crate::narrative::{prompts, NarrativeGenerator};
use crate::strategy::StrategyEngine;
use crate::models::FinancialSnapshot;
use crate::Result;
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, state: &PlanningState) -> Result<StageOutput>;
}

/// Keep errors already in the stage's category, wrap everything else.
pub(crate) fn categorize(kind: StageKind, err: AdvisorError) -> AdvisorError {
    match (kind, err) {
        (StageKind::CollectData, e @ AdvisorError::DataCollection(_))
        | (StageKind::AnalyzeExpenses, e @ AdvisorError::Analysis(_))
        | (StageKind::GenerateInvestmentAdvice, e @ AdvisorError::AdviceGeneration(_))
        | (StageKind::ForecastHealth, e @ AdvisorError::Forecast(_))
        | (StageKind::SynthesizeAdvice, e @ AdvisorError::Synthesis(_)) => e,
        (StageKind::CollectData, e) => AdvisorError::DataCollection(e.to_string()),
        (StageKind::AnalyzeExpenses, e) => AdvisorError::Analysis(e.to_string()),
        (StageKind::GenerateInvestmentAdvice, e) => AdvisorError::AdviceGeneration(e.to_string()),
        (StageKind::ForecastHealth, e) => AdvisorError::Forecast(e.to_string()),
        (StageKind::SynthesizeAdvice, e) => AdvisorError::Synthesis(e.to_string()),
    }
}

/// The collected snapshot, or an empty one with default profile values.
fn snapshot_or_empty(state: &PlanningState) -> Cow<'_, FinancialSnapshot> {
    match state.snapshot.as_ref() {
        Some(snapshot) => Cow::Borrowed(snapshot),
        None => {
            warn!(user_id = %state.user_id, "No snapshot collected, using defaults");
            Cow::Owned(FinancialSnapshot::empty(state.user_id.clone()))
        }
    }
}

//
// ================= CollectData =================
//

pub struct CollectDataStage {
    expenses: Arc<dyn ExpenseHistoryProvider>,
    snapshots: Arc<dyn SnapshotProvider>,
    history_days: u32,
}

impl CollectDataStage {
    pub fn new(
        expenses: Arc<dyn ExpenseHistoryProvider>,
        snapshots: Arc<dyn SnapshotProvider>,
        history_days: u32,
    ) -> Self {
        Self {
            expenses,
            snapshots,
            history_days,
        }
    }
}

#[async_trait]
impl Stage for CollectDataStage {
    fn kind(&self) -> StageKind {
        StageKind::CollectData
    }

    async fn run(&self, state: &PlanningState) -> Result<StageOutput> {
        let snapshot = self.snapshots.fetch(&state.user_id).await?;
        let expenses = self.expenses.fetch(&state.user_id, self.history_days).await?;

        debug!(
            user_id = %state.user_id,
            expenses = expenses.len(),
            symbols = snapshot.market_data.len(),
            "Financial data collected"
        );

        Ok(StageOutput::Collected { snapshot, expenses })
    }
}

//
// ================= AnalyzeExpenses =================
//

pub struct AnalyzeExpensesStage {
    narrator: Arc<dyn NarrativeGenerator>,
    analyzer: ExpenseAnalyzer,
    period_days: u32,
}

impl AnalyzeExpensesStage {
    pub fn new(narrator: Arc<dyn NarrativeGenerator>, period_days: u32) -> Self {
        Self {
            narrator,
            analyzer: ExpenseAnalyzer::new(),
            period_days,
        }
    }
}

#[async_trait]
impl Stage for AnalyzeExpensesStage {
    fn kind(&self) -> StageKind {
        StageKind::AnalyzeExpenses
    }

    async fn run(&self, state: &PlanningState) -> Result<StageOutput> {
        let profile = state
            .snapshot
            .as_ref()
            .map(|s| s.profile.clone())
            .unwrap_or_default();

        let analysis = self.analyzer.analyze(&state.expenses, &profile, self.period_days);
        let prompt = prompts::expense_analysis_prompt(&state.expenses, &analysis)?;
        let narrative = self
            .narrator
            .generate(prompts::EXPENSE_ANALYST_ROLE, &prompt)
            .await?;

        Ok(StageOutput::ExpensesAnalyzed {
            analysis,
            narrative,
        })
    }
}

//
// ================= GenerateInvestmentAdvice =================
//

pub struct InvestmentAdviceStage {
    narrator: Arc<dyn NarrativeGenerator>,
    engine: StrategyEngine,
}

impl InvestmentAdviceStage {
    pub fn new(narrator: Arc<dyn NarrativeGenerator>) -> Self {
        Self {
            narrator,
            engine: StrategyEngine::new(),
        }
    }
}

#[async_trait]
impl Stage for InvestmentAdviceStage {
    fn kind(&self) -> StageKind {
        StageKind::GenerateInvestmentAdvice
    }

    async fn run(&self, state: &PlanningState) -> Result<StageOutput> {
        let snapshot = snapshot_or_empty(state);

        let profile = self.engine.investment_profile(&snapshot);
        let prompt = prompts::investment_advice_prompt(&state.query, &snapshot, &profile)?;
        let narrative = self
            .narrator
            .generate(prompts::INVESTMENT_ADVISOR_ROLE, &prompt)
            .await?;

        Ok(StageOutput::InvestmentAdvised { profile, narrative })
    }
}

//
// ================= ForecastHealth =================
//

#[derive(Default)]
pub struct ForecastHealthStage {
    engine: ForecastEngine,
}

impl ForecastHealthStage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Stage for ForecastHealthStage {
    fn kind(&self) -> StageKind {
        StageKind::ForecastHealth
    }

    async fn run(&self, state: &PlanningState) -> Result<StageOutput> {
        let snapshot = snapshot_or_empty(state);
        let forecast = self.engine.generate(&snapshot, &state.expenses)?;
        Ok(StageOutput::Forecasted(forecast))
    }
}

//
// ================= SynthesizeAdvice =================
//

pub struct SynthesizeAdviceStage {
    narrator: Arc<dyn NarrativeGenerator>,
}

impl SynthesizeAdviceStage {
    pub fn new(narrator: Arc<dyn NarrativeGenerator>) -> Self {
        Self { narrator }
    }
}

#[async_trait]
impl Stage for SynthesizeAdviceStage {
    fn kind(&self) -> StageKind {
        StageKind::SynthesizeAdvice
    }

    async fn run(&self, state: &PlanningState) -> Result<StageOutput> {
        let prompt = prompts::synthesis_prompt(
            state.expense_analysis_text.as_deref(),
            state.investment_advice_text.as_deref(),
            state.forecast.as_ref(),
        )?;
        let advice = self
            .narrator
            .generate(prompts::PLAN_SYNTHESIZER_ROLE, &prompt)
            .await?;

        Ok(StageOutput::Synthesized(advice))
    }
}
