//! Planning state threaded through the pipeline stages

use crate::expenses::ExpenseAnalysis;
use crate::forecast::ForecastResult;
use crate::models::{ExpenseRecord, FinancialSnapshot};
use crate::strategy::InvestmentProfile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    NotStarted,
    CollectingData,
    AnalyzingExpenses,
    GeneratingInvestmentAdvice,
    ForecastingHealth,
    SynthesizingAdvice,
    Done,
}

impl PipelinePhase {
    /// Next phase in declaration order. `Done` is terminal.
    pub fn next(self) -> Self {
        match self {
            PipelinePhase::NotStarted => PipelinePhase::CollectingData,
            PipelinePhase::CollectingData => PipelinePhase::AnalyzingExpenses,
            PipelinePhase::AnalyzingExpenses => PipelinePhase::GeneratingInvestmentAdvice,
            PipelinePhase::GeneratingInvestmentAdvice => PipelinePhase::ForecastingHealth,
            PipelinePhase::ForecastingHealth => PipelinePhase::SynthesizingAdvice,
            PipelinePhase::SynthesizingAdvice | PipelinePhase::Done => PipelinePhase::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PipelinePhase::Done
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    CollectData,
    AnalyzeExpenses,
    GenerateInvestmentAdvice,
    ForecastHealth,
    SynthesizeAdvice,
}

impl StageKind {
    pub fn phase(self) -> PipelinePhase {
        match self {
            StageKind::CollectData => PipelinePhase::CollectingData,
            StageKind::AnalyzeExpenses => PipelinePhase::AnalyzingExpenses,
            StageKind::GenerateInvestmentAdvice => PipelinePhase::GeneratingInvestmentAdvice,
            StageKind::ForecastHealth => PipelinePhase::ForecastingHealth,
            StageKind::SynthesizeAdvice => PipelinePhase::SynthesizingAdvice,
        }
    }

    /// Lead-in for the message stored on `PlanningState::error`.
    pub fn failure_prefix(self) -> &'static str {
        match self {
            StageKind::CollectData => "Error collecting financial data",
            StageKind::AnalyzeExpenses => "Error analyzing expenses",
            StageKind::GenerateInvestmentAdvice => "Error generating investment advice",
            StageKind::ForecastHealth => "Error forecasting financial health",
            StageKind::SynthesizeAdvice => "Error synthesizing advice",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::CollectData => "collect_data",
            StageKind::AnalyzeExpenses => "analyze_expenses",
            StageKind::GenerateInvestmentAdvice => "generate_investment_advice",
            StageKind::ForecastHealth => "forecast_health",
            StageKind::SynthesizeAdvice => "synthesize_advice",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageError {
    pub stage: StageKind,
    pub message: String,
}

/// What a successful stage contributes to the state.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Collected {
        snapshot: FinancialSnapshot,
        expenses: Vec<ExpenseRecord>,
    },
    ExpensesAnalyzed {
        analysis: ExpenseAnalysis,
        narrative: String,
    },
    InvestmentAdvised {
        profile: InvestmentProfile,
        narrative: String,
    },
    Forecasted(ForecastResult),
    Synthesized(String),
}

/// Per-request record. Owned by exactly one pipeline run and moved
/// from stage to stage.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningState {
    pub request_id: Uuid,
    pub query: String,
    pub user_id: String,
    pub phase: PipelinePhase,
    pub snapshot: Option<FinancialSnapshot>,
    pub expenses: Vec<ExpenseRecord>,
    pub expense_analysis: Option<ExpenseAnalysis>,
    pub investment_profile: Option<InvestmentProfile>,
    pub forecast: Option<ForecastResult>,
    pub expense_analysis_text: Option<String>,
    pub investment_advice_text: Option<String>,
    pub advice: Option<String>,
    /// Last stage failure only; earlier failures are overwritten.
    pub error: Option<String>,
    /// Every stage failure, in order.
    pub stage_errors: Vec<StageError>,
}

impl PlanningState {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            query: query.into(),
            user_id: user_id.into(),
            phase: PipelinePhase::NotStarted,
            snapshot: None,
            expenses: Vec::new(),
            expense_analysis: None,
            investment_profile: None,
            forecast: None,
            expense_analysis_text: None,
            investment_advice_text: None,
            advice: None,
            error: None,
            stage_errors: Vec::new(),
        }
    }

    pub fn apply(&mut self, output: StageOutput) {
        match output {
            StageOutput::Collected { snapshot, expenses } => {
                self.snapshot = Some(snapshot);
                self.expenses = expenses;
            }
            StageOutput::ExpensesAnalyzed { analysis, narrative } => {
                self.expense_analysis = Some(analysis);
                self.expense_analysis_text = Some(narrative);
            }
            StageOutput::InvestmentAdvised { profile, narrative } => {
                self.investment_profile = Some(profile);
                self.investment_advice_text = Some(narrative);
            }
            StageOutput::Forecasted(forecast) => self.forecast = Some(forecast),
            StageOutput::Synthesized(advice) => self.advice = Some(advice),
        }
    }

    /// Overwrites `error` and appends to the diagnostic list.
    pub fn record_failure(&mut self, stage: StageKind, detail: &str) {
        let message = format!("{}: {}", stage.failure_prefix(), detail);
        self.stage_errors.push(StageError {
            stage,
            message: message.clone(),
        });
        self.error = Some(message);
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_advance_in_order_and_stop_at_done() {
        let mut phase = PipelinePhase::NotStarted;
        let mut visited = vec![phase];
        while !phase.is_terminal() {
            phase = phase.next();
            visited.push(phase);
        }
        assert_eq!(visited.len(), 7);
        assert_eq!(PipelinePhase::Done.next(), PipelinePhase::Done);
    }

    #[test]
    fn test_record_failure_is_last_write_wins() {
        let mut state = PlanningState::new("q", "u");
        assert!(!state.has_error());

        state.record_failure(StageKind::AnalyzeExpenses, "model offline");
        state.record_failure(StageKind::SynthesizeAdvice, "model offline");

        assert_eq!(
            state.error.as_deref(),
            Some("Error synthesizing advice: model offline")
        );
        assert_eq!(state.stage_errors.len(), 2);
        assert_eq!(state.stage_errors[0].stage, StageKind::AnalyzeExpenses);
    }

    #[test]
    fn test_empty_error_string_is_not_an_error() {
        let mut state = PlanningState::new("q", "u");
        state.error = Some(String::new());
        assert!(!state.has_error());
    }
}
