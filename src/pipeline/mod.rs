//! Planning pipeline
//!
//! One driver loop runs an ordered list of stages over a single
//! `PlanningState`. A failing stage records its error on the state and the
//! loop moves on; whether later stages still run is decided by `ErrorPolicy`.

use crate::collectors::{ExpenseHistoryProvider, SnapshotProvider};
use crate::config::AdvisorConfig;
use crate::forecast::ForecastResult;
use crate::narrative::NarrativeGenerator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub mod stages;
pub mod state;

pub use stages::{
    AnalyzeExpensesStage, CollectDataStage, ForecastHealthStage, InvestmentAdviceStage, Stage,
    SynthesizeAdviceStage,
};
pub use state::{PipelinePhase, PlanningState, StageError, StageKind, StageOutput};

/// Days of spending the expense summary is measured against.
const SUMMARY_PERIOD_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Every stage runs; only the last recorded error reaches the caller.
    #[default]
    ContinueOnError,
    StopOnFirstError,
}

/// Outcome handed back to the caller of `produce_plan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    pub success: bool,
    /// Always present in the output; null on failure.
    pub advice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_advice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            advice: None,
            forecast: None,
            expense_analysis: None,
            investment_advice: None,
            error: Some(error.into()),
        }
    }
}

impl From<PlanningState> for PlanResult {
    fn from(state: PlanningState) -> Self {
        if state.has_error() {
            return PlanResult::failure(state.error.unwrap_or_default());
        }

        PlanResult {
            success: true,
            advice: state.advice,
            forecast: state.forecast,
            expense_analysis: state.expense_analysis_text,
            investment_advice: state.investment_advice_text,
            error: None,
        }
    }
}

pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
    policy: ErrorPolicy,
}

impl Orchestrator {
    /// Stages run in the order given.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            policy: ErrorPolicy::default(),
        }
    }

    /// The standard five-stage plan.
    pub fn standard(
        expenses: Arc<dyn ExpenseHistoryProvider>,
        snapshots: Arc<dyn SnapshotProvider>,
        narrator: Arc<dyn NarrativeGenerator>,
        config: &AdvisorConfig,
    ) -> Self {
        Self::new(vec![
            Box::new(CollectDataStage::new(
                expenses,
                snapshots,
                config.expense_history_days,
            )),
            Box::new(AnalyzeExpensesStage::new(narrator.clone(), SUMMARY_PERIOD_DAYS)),
            Box::new(InvestmentAdviceStage::new(narrator.clone())),
            Box::new(ForecastHealthStage::new()),
            Box::new(SynthesizeAdviceStage::new(narrator)),
        ])
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Drive `state` through every stage and hand it back at `Done`.
    pub async fn execute(&self, mut state: PlanningState) -> PlanningState {
        for stage in &self.stages {
            let kind = stage.kind();
            state.phase = kind.phase();

            match stage.run(&state).await {
                Ok(output) => state.apply(output),
                Err(e) => {
                    let e = stages::categorize(kind, e);
                    warn!(
                        request_id = %state.request_id,
                        stage = kind.as_str(),
                        error = %e,
                        "Stage failed"
                    );
                    state.record_failure(kind, &e.detail());

                    if self.policy == ErrorPolicy::StopOnFirstError {
                        break;
                    }
                }
            }
        }

        state.phase = PipelinePhase::Done;
        state
    }

    pub async fn run(&self, query: &str, user_id: &str) -> PlanningState {
        let state = PlanningState::new(query, user_id);
        info!(request_id = %state.request_id, user_id = %user_id, "Planning started");

        let state = self.execute(state).await;

        info!(
            request_id = %state.request_id,
            failures = state.stage_errors.len(),
            "Planning finished"
        );
        state
    }

    pub async fn produce_plan(&self, query: &str, user_id: &str) -> PlanResult {
        self.run(query, user_id).await.into()
    }
}
