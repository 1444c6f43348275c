//! Tabular query engine - the executor's external collaborator.
//!
//! The pipeline only depends on the [`QueryEngine`] contract: plan in,
//! table/scalar result out. [`PolarsEngine`] is the in-process default.

use crate::agents::planner::Plan;
use crate::error::{DataRoomError, Result};
use polars::prelude::*;

/// Raw result of a query-engine invocation.
#[derive(Debug)]
pub enum EngineResult {
    /// Grouped/aggregated table; first column is the category axis.
    Table(DataFrame),
    /// Single aggregate value.
    Scalar { name: String, value: f64 },
    /// Dataset shape summary, for questions that need no computation.
    Profile {
        row_count: usize,
        columns: Vec<String>,
    },
}

pub trait QueryEngine: Send + Sync {
    fn execute(&self, df: &DataFrame, plan: &Plan) -> Result<EngineResult>;
}

/// Executes plans directly against the in-memory polars frame, guided by the
/// plan's axis bindings: group by `x_axis`, sum each `y_axis` column.
pub struct PolarsEngine;

impl QueryEngine for PolarsEngine {
    fn execute(&self, df: &DataFrame, plan: &Plan) -> Result<EngineResult> {
        let config = plan.visualization_config.as_ref();
        let x_axis = config
            .and_then(|c| c.x_axis.clone())
            .filter(|x| !x.is_empty());
        let y_axis: Vec<String> = config.map(|c| c.y_axis.clone()).unwrap_or_default();

        match (x_axis, y_axis.as_slice()) {
            (Some(x), ys) if !ys.is_empty() => {
                self.grouped_aggregate(df, plan, &x, ys).map(EngineResult::Table)
            }
            (None, [y, ..]) => self.total(df, plan, y),
            _ => Ok(EngineResult::Profile {
                row_count: df.height(),
                columns: df
                    .get_column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

impl PolarsEngine {
    fn grouped_aggregate(
        &self,
        df: &DataFrame,
        plan: &Plan,
        x: &str,
        ys: &[String],
    ) -> Result<DataFrame> {
        self.check_columns(df, plan, std::iter::once(x).chain(ys.iter().map(|s| s.as_str())))?;

        let aggs: Vec<Expr> = ys.iter().map(|y| col(y).sum().alias(y)).collect();
        df.clone()
            .lazy()
            .group_by_stable([col(x)])
            .agg(aggs)
            .collect()
            .map_err(|e| {
                DataRoomError::execution(step_for(plan, x), format!("aggregation failed: {}", e))
            })
    }

    fn total(&self, df: &DataFrame, plan: &Plan, y: &str) -> Result<EngineResult> {
        self.check_columns(df, plan, std::iter::once(y))?;

        let value = df
            .column(y)
            .and_then(|s| s.cast(&DataType::Float64))
            .map_err(|e| DataRoomError::execution(step_for(plan, y), e.to_string()))?
            .f64()
            .map_err(|e| DataRoomError::execution(step_for(plan, y), e.to_string()))?
            .sum()
            .unwrap_or(0.0);

        Ok(EngineResult::Scalar {
            name: y.to_string(),
            value,
        })
    }

    fn check_columns<'a>(
        &self,
        df: &DataFrame,
        plan: &Plan,
        referenced: impl Iterator<Item = &'a str>,
    ) -> Result<()> {
        let available = df.get_column_names();
        for name in referenced {
            if !available.contains(&name) {
                return Err(DataRoomError::execution(
                    step_for(plan, name),
                    format!("column '{}' not found in dataset", name),
                ));
            }
        }
        Ok(())
    }
}

/// The plan step that triggered a failure: the first step mentioning the
/// offending column, or a synthesized description when none does.
fn step_for(plan: &Plan, column: &str) -> String {
    plan.steps
        .iter()
        .find(|s| s.to_lowercase().contains(&column.to_lowercase()))
        .cloned()
        .unwrap_or_else(|| format!("aggregate '{}'", column))
}
