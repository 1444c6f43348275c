//! Executor agent - runs the plan against the query engine and shapes the
//! raw result into an answer, insights, and optional chart data.

use crate::agents::planner::{Plan, Visualization};
use crate::dataset::DatasetHandle;
use crate::engine::{EngineResult, QueryEngine};
use crate::error::{DataRoomError, Result};
use crate::response::{ChartData, Series};
use crate::schema::any_value_to_string;
use polars::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What the executor hands to the response assembler.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub answer: String,
    pub insights: Vec<String>,
    pub chart_data: Option<ChartData>,
    pub chart_type: Visualization,
}

/// Agent 2 of the pipeline. Owns no session state; computation is delegated
/// to the query engine, bounded by a timeout.
pub struct ExecutorAgent {
    engine: Arc<dyn QueryEngine>,
    timeout: Duration,
}

impl ExecutorAgent {
    pub fn new(engine: Arc<dyn QueryEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub async fn execute(
        &self,
        dataset: &Arc<DatasetHandle>,
        plan: &Plan,
    ) -> Result<ExecutionOutcome> {
        let engine = Arc::clone(&self.engine);
        let handle = Arc::clone(dataset);
        let plan_for_engine = plan.clone();
        let task =
            tokio::task::spawn_blocking(move || engine.execute(handle.frame(), &plan_for_engine));

        let joined = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| DataRoomError::execution(first_step(plan), "query engine timed out"))?;
        let result = joined.map_err(|e| {
            DataRoomError::execution(first_step(plan), format!("engine task failed: {}", e))
        })??;

        Ok(self.shape(result, plan))
    }

    fn shape(&self, result: EngineResult, plan: &Plan) -> ExecutionOutcome {
        match result {
            EngineResult::Table(table) if !plan.visualization.is_none() => {
                match shape_chart(&table, plan) {
                    Ok(chart) => {
                        let (answer, insights) = describe_chart(&chart, plan);
                        ExecutionOutcome {
                            answer,
                            insights,
                            chart_data: Some(chart),
                            chart_type: plan.visualization,
                        }
                    }
                    // A computed answer with no chart is success, not error.
                    Err(e) => {
                        warn!(error = %e, "Result not chart-shaped, downgrading to text");
                        ExecutionOutcome {
                            answer: describe_table(&table, plan),
                            insights: Vec::new(),
                            chart_data: None,
                            chart_type: Visualization::None,
                        }
                    }
                }
            }
            EngineResult::Table(table) => ExecutionOutcome {
                answer: describe_table(&table, plan),
                insights: Vec::new(),
                chart_data: None,
                chart_type: Visualization::None,
            },
            EngineResult::Scalar { name, value } => {
                if !plan.visualization.is_none() {
                    debug!("Scalar result for a chart plan, downgrading to text");
                }
                ExecutionOutcome {
                    answer: format!("{} Total {} = {}.", plan.analysis, name, value),
                    insights: Vec::new(),
                    chart_data: None,
                    chart_type: Visualization::None,
                }
            }
            EngineResult::Profile { row_count, columns } => ExecutionOutcome {
                answer: format!(
                    "The dataset has {} rows and {} columns: {}.",
                    row_count,
                    columns.len(),
                    columns.join(", ")
                ),
                insights: vec![
                    format!("{} rows", row_count),
                    format!("{} columns", columns.len()),
                ],
                chart_data: None,
                chart_type: Visualization::None,
            },
        }
    }
}

/// Shape an aggregated table into `{labels, values, additional_series}`.
///
/// The label column is the plan's x-axis binding when present, else the first
/// column. The first remaining numeric column becomes `values`; every further
/// numeric column becomes one additional series named by its column.
fn shape_chart(table: &DataFrame, plan: &Plan) -> Result<ChartData> {
    let bound_x = plan
        .visualization_config
        .as_ref()
        .and_then(|c| c.x_axis.as_deref());
    let label_col = bound_x
        .filter(|x| table.get_column_names().contains(x))
        .map(String::from)
        .or_else(|| table.get_column_names().first().map(|s| s.to_string()))
        .ok_or_else(|| {
            DataRoomError::execution(first_step(plan), "result table has no columns")
        })?;

    let labels: Vec<String> = table
        .column(&label_col)?
        .iter()
        .map(|v| any_value_to_string(&v))
        .collect();

    let mut numeric = Vec::new();
    for series in table.get_columns() {
        if series.name() != label_col && series.dtype().is_numeric() {
            let values: Vec<f64> = series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            numeric.push((series.name().to_string(), values));
        }
    }

    if numeric.is_empty() {
        return Err(DataRoomError::execution(
            first_step(plan),
            "result has no numeric column to plot",
        ));
    }

    let (_, values) = numeric.remove(0);
    let additional_series = if numeric.is_empty() {
        None
    } else {
        Some(
            numeric
                .into_iter()
                .map(|(name, data)| Series { name, data })
                .collect(),
        )
    };

    Ok(ChartData {
        labels,
        values,
        additional_series,
    })
}

fn describe_chart(chart: &ChartData, plan: &Plan) -> (String, Vec<String>) {
    let total: f64 = chart.values.iter().sum();
    let top = chart
        .values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut insights = Vec::new();
    let answer = match top {
        Some((idx, top_value)) => {
            let top_label = &chart.labels[idx];
            insights.push(format!("'{}' has the highest value ({})", top_label, top_value));
            insights.push(format!(
                "Total across {} groups: {}",
                chart.labels.len(),
                total
            ));
            format!(
                "{} '{}' leads with {}; total across {} groups is {}.",
                plan.analysis,
                top_label,
                top_value,
                chart.labels.len(),
                total
            )
        }
        None => plan.analysis.clone(),
    };

    if let Some(extra) = &chart.additional_series {
        let names: Vec<&str> = extra.iter().map(|s| s.name.as_str()).collect();
        insights.push(format!("Additional series: {}", names.join(", ")));
    }

    (answer, insights)
}

fn describe_table(table: &DataFrame, plan: &Plan) -> String {
    format!(
        "{} The result has {} rows across columns: {}.",
        plan.analysis,
        table.height(),
        table.get_column_names().join(", ")
    )
}

fn first_step(plan: &Plan) -> String {
    plan.steps
        .first()
        .cloned()
        .unwrap_or_else(|| "execute plan".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::planner::VisualizationConfig;
    use crate::engine::PolarsEngine;

    fn handle() -> Arc<DatasetHandle> {
        let csv = "category,sales,profit\nA,10.0,1.0\nB,20.0,2.0\nA,5.0,0.5\nC,7.0,0.7\n";
        Arc::new(DatasetHandle::from_bytes("sales.csv", csv.as_bytes()).unwrap())
    }

    fn executor() -> ExecutorAgent {
        ExecutorAgent::new(Arc::new(PolarsEngine), Duration::from_secs(5))
    }

    fn bar_plan(x: Option<&str>, ys: &[&str]) -> Plan {
        Plan {
            analysis: "Sum sales per category.".to_string(),
            steps: vec!["Group by category and sum sales".to_string()],
            visualization: Visualization::Bar,
            visualization_config: Some(VisualizationConfig {
                x_axis: x.map(String::from),
                y_axis: ys.iter().map(|s| s.to_string()).collect(),
                title: Some("Sales".to_string()),
            }),
        }
    }

    #[tokio::test]
    async fn chart_labels_and_values_stay_aligned() {
        let outcome = executor()
            .execute(&handle(), &bar_plan(Some("category"), &["sales"]))
            .await
            .unwrap();

        let chart = outcome.chart_data.unwrap();
        assert_eq!(chart.labels, vec!["A", "B", "C"]);
        assert_eq!(chart.values, vec![15.0, 20.0, 7.0]);
        assert_eq!(chart.labels.len(), chart.values.len());
        assert_eq!(outcome.chart_type, Visualization::Bar);
        assert!(!outcome.insights.is_empty());
    }

    #[tokio::test]
    async fn extra_numeric_columns_become_additional_series() {
        let outcome = executor()
            .execute(&handle(), &bar_plan(Some("category"), &["sales", "profit"]))
            .await
            .unwrap();

        let chart = outcome.chart_data.unwrap();
        let extra = chart.additional_series.unwrap();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].name, "profit");
        assert_eq!(extra[0].data.len(), chart.labels.len());
    }

    #[tokio::test]
    async fn scalar_result_downgrades_instead_of_failing() {
        // Chart requested but the engine produces a single number.
        let outcome = executor()
            .execute(&handle(), &bar_plan(None, &["sales"]))
            .await
            .unwrap();

        assert!(outcome.chart_data.is_none());
        assert_eq!(outcome.chart_type, Visualization::None);
        assert!(outcome.answer.contains("42"));
    }

    #[tokio::test]
    async fn descriptive_plan_produces_text_only() {
        let plan = Plan {
            analysis: "List the columns.".to_string(),
            steps: vec![],
            visualization: Visualization::None,
            visualization_config: None,
        };

        let outcome = executor().execute(&handle(), &plan).await.unwrap();
        assert!(outcome.chart_data.is_none());
        assert_eq!(outcome.chart_type, Visualization::None);
        assert!(outcome.answer.contains("category"));
        assert!(outcome.answer.contains("4 rows"));
    }

    #[tokio::test]
    async fn engine_failure_surfaces_as_execution_error() {
        let err = executor()
            .execute(&handle(), &bar_plan(Some("category"), &["missing_col"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DataRoomError::Execution { .. }));
    }
}
