//! Chat Response contract and the assembler that produces it.

use crate::agents::executor::ExecutionOutcome;
use crate::agents::planner::{Plan, Visualization};
use crate::error::{DataRoomError, Result};
use crate::session::{SessionStore, Turn};
use serde::{Deserialize, Serialize};

/// Named parallel series for multi-series charts. `data` is aligned
/// index-for-index with the chart's labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<f64>,
}

/// Label/value payload consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_series: Option<Vec<Series>>,
}

/// The externally visible response for one chat turn. `chart_type` is
/// `"none"` exactly when `chart_data` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartData>,
    pub chart_type: Visualization,
    pub insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fallback answer when planning or execution fails.
pub const FALLBACK_ANSWER: &str =
    "I couldn't complete that analysis. Please try rephrasing your question.";

/// Merges planner and executor outputs into the response contract and records
/// the turn in session history.
pub struct ResponseAssembler;

impl ResponseAssembler {
    /// Successful turn: append the question/answer pair atomically, then
    /// return the merged contract.
    pub async fn assemble_success(
        &self,
        store: &SessionStore,
        session_id: &str,
        question: &str,
        plan: Plan,
        outcome: ExecutionOutcome,
    ) -> Result<ChatResponse> {
        // chart_type must track chart_data, whatever the executor reported.
        let chart_type = if outcome.chart_data.is_some() {
            outcome.chart_type
        } else {
            Visualization::None
        };

        store
            .append_turns(
                session_id,
                vec![Turn::user(question), Turn::assistant(&outcome.answer)],
            )
            .await?;

        Ok(ChatResponse {
            success: true,
            answer: outcome.answer,
            plan: Some(plan),
            chart_data: outcome.chart_data,
            chart_type,
            insights: outcome.insights,
            error: None,
        })
    }

    /// Failed turn: still append the user turn so context is not silently
    /// lost, but record no synthetic assistant turn - a failed answer must
    /// not feed future planning context.
    pub async fn assemble_failure(
        &self,
        store: &SessionStore,
        session_id: &str,
        question: &str,
        plan: Option<Plan>,
        error: DataRoomError,
    ) -> ChatResponse {
        if let Err(append_err) = store.append_turn(session_id, Turn::user(question)).await {
            tracing::warn!(error = %append_err, "Could not record user turn for failed request");
        }

        ChatResponse {
            success: false,
            answer: FALLBACK_ANSWER.to_string(),
            plan,
            chart_data: None,
            chart_type: Visualization::None,
            insights: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
