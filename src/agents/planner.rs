//! Planner agent - turns a question plus schema and history into a Plan.

use crate::agents::prompts;
use crate::error::{DataRoomError, Result};
use crate::llm::{extract_json, TextGenerator};
use crate::schema::SchemaProfile;
use crate::session::Turn;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Chart type chosen by the planner. Doubles as the `chart_type` value in the
/// response contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visualization {
    Bar,
    Line,
    Pie,
    Scatter,
    None,
}

impl Visualization {
    pub fn is_none(&self) -> bool {
        matches!(self, Visualization::None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default)]
    pub x_axis: Option<String>,
    /// One column or several; several drive a multi-series chart.
    #[serde(default, deserialize_with = "string_or_list")]
    pub y_axis: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Structured execution plan. Produced fresh per request, never persisted
/// beyond the turn that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub analysis: String,
    #[serde(default)]
    pub steps: Vec<String>,
    pub visualization: Visualization,
    #[serde(default)]
    pub visualization_config: Option<VisualizationConfig>,
}

/// Accept `"y_axis": "sales"` as well as `"y_axis": ["sales", "profit"]`.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::One(s)) if !s.is_empty() => vec![s],
        Some(StringOrList::Many(v)) => v.into_iter().filter(|s| !s.is_empty()).collect(),
        _ => Vec::new(),
    })
}

/// Agent 1 of the pipeline. Stateless: reads schema and history, writes
/// nothing back.
pub struct PlannerAgent {
    llm: Arc<dyn TextGenerator>,
}

impl PlannerAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Create an execution plan for the question. Retries the generation once
    /// with a corrective instruction if the first response does not parse.
    pub async fn create_plan(
        &self,
        profile: &SchemaProfile,
        history: &[Turn],
        question: &str,
    ) -> Result<Plan> {
        if question.trim().is_empty() {
            return Err(DataRoomError::Validation(
                "Question must not be empty".to_string(),
            ));
        }

        let prompt = prompts::build_planner_prompt(&profile.describe(), history, question);

        let raw = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| DataRoomError::PlanParse(format!("generation failed: {}", e)))?;

        match parse_plan(&raw) {
            Ok(plan) => Ok(plan),
            Err(first_err) => {
                warn!(error = %first_err, "Planner output unparsable, retrying once");
                let retry_prompt = prompts::build_retry_prompt(&prompt, &raw);
                let raw = self
                    .llm
                    .generate(&retry_prompt)
                    .await
                    .map_err(|e| DataRoomError::PlanParse(format!("retry failed: {}", e)))?;
                parse_plan(&raw)
            }
        }
    }
}

fn parse_plan(raw: &str) -> Result<Plan> {
    let value = extract_json(raw)
        .ok_or_else(|| DataRoomError::PlanParse("no JSON object in planner output".to_string()))?;
    let plan: Plan = serde_json::from_value(value)
        .map_err(|e| DataRoomError::PlanParse(format!("plan shape invalid: {}", e)))?;
    debug!(visualization = ?plan.visualization, steps = plan.steps.len(), "Parsed plan");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use async_trait::async_trait;
    use polars::prelude::*;
    use std::sync::Mutex;

    /// Generator that replays a fixed script of responses.
    struct ScriptedGenerator {
        responses: Mutex<Vec<String>>,
        calls: Mutex<usize>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| DataRoomError::Llm("script exhausted".to_string()))
        }
    }

    fn sales_profile() -> SchemaProfile {
        let df = df![
            "category" => ["A", "B"],
            "sales" => [1.0, 2.0]
        ]
        .unwrap();
        schema::profile(&df).unwrap()
    }

    const BAR_PLAN: &str = r#"```json
{
  "analysis": "Sum sales per category",
  "steps": ["Group by category", "Sum sales"],
  "visualization": "bar",
  "visualization_config": {"x_axis": "category", "y_axis": "sales", "title": "Sales by category"}
}
```"#;

    #[tokio::test]
    async fn parses_a_fenced_bar_plan() {
        let llm = Arc::new(ScriptedGenerator::new(vec![BAR_PLAN]));
        let planner = PlannerAgent::new(llm.clone());

        let plan = planner
            .create_plan(&sales_profile(), &[], "What are total sales by category?")
            .await
            .unwrap();

        assert_eq!(plan.visualization, Visualization::Bar);
        let config = plan.visualization_config.unwrap();
        assert_eq!(config.x_axis.as_deref(), Some("category"));
        assert_eq!(config.y_axis, vec!["sales"]);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn descriptive_question_plans_no_visualization() {
        let response = r#"{"analysis": "List the columns", "steps": ["Read schema"], "visualization": "none"}"#;
        let planner = PlannerAgent::new(Arc::new(ScriptedGenerator::new(vec![response])));

        let plan = planner
            .create_plan(&sales_profile(), &[], "What columns do I have?")
            .await
            .unwrap();

        assert!(plan.visualization.is_none());
        assert!(plan.visualization_config.is_none());
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let llm = Arc::new(ScriptedGenerator::new(vec!["not json at all", BAR_PLAN]));
        let planner = PlannerAgent::new(llm.clone());

        let plan = planner
            .create_plan(&sales_profile(), &[], "sales by category")
            .await
            .unwrap();

        assert_eq!(plan.visualization, Visualization::Bar);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn fails_with_plan_parse_error_after_retry() {
        let llm = Arc::new(ScriptedGenerator::new(vec!["garbage", "still garbage"]));
        let planner = PlannerAgent::new(llm.clone());

        let err = planner
            .create_plan(&sales_profile(), &[], "sales by category")
            .await
            .unwrap_err();

        assert!(matches!(err, DataRoomError::PlanParse(_)));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn invalid_visualization_value_is_a_parse_failure() {
        let bad = r#"{"analysis": "x", "steps": [], "visualization": "heatmap"}"#;
        let llm = Arc::new(ScriptedGenerator::new(vec![bad, bad]));
        let planner = PlannerAgent::new(llm.clone());

        let err = planner
            .create_plan(&sales_profile(), &[], "q")
            .await
            .unwrap_err();
        assert!(matches!(err, DataRoomError::PlanParse(_)));
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_generation() {
        let llm = Arc::new(ScriptedGenerator::new(vec![]));
        let planner = PlannerAgent::new(llm.clone());

        let err = planner
            .create_plan(&sales_profile(), &[], "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, DataRoomError::Validation(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn y_axis_accepts_string_or_list() {
        let one: VisualizationConfig =
            serde_json::from_str(r#"{"x_axis": "a", "y_axis": "b"}"#).unwrap();
        assert_eq!(one.y_axis, vec!["b"]);

        let many: VisualizationConfig =
            serde_json::from_str(r#"{"x_axis": "a", "y_axis": ["b", "c"]}"#).unwrap();
        assert_eq!(many.y_axis, vec!["b", "c"]);
    }
}
