//! Schema profiling - derives a compact dataset description for the agents.

use crate::error::{DataRoomError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Non-null sample values kept per column.
pub const SAMPLES_PER_COLUMN: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: String,
    pub sample_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaProfile {
    pub columns: Vec<ColumnProfile>,
    pub row_count: usize,
}

/// Profile a dataframe: column names, dtypes, and a few sample values.
///
/// Pure function of the frame's content. Fails only when the dataset has
/// zero columns.
pub fn profile(df: &DataFrame) -> Result<SchemaProfile> {
    if df.width() == 0 {
        return Err(DataRoomError::EmptyDataset);
    }

    let columns = df
        .get_columns()
        .iter()
        .map(|series| {
            let sample_values = series
                .iter()
                .filter(|v| !matches!(v, AnyValue::Null))
                .take(SAMPLES_PER_COLUMN)
                .map(|v| any_value_to_string(&v))
                .collect();
            ColumnProfile {
                name: series.name().to_string(),
                inferred_type: series.dtype().to_string(),
                sample_values,
            }
        })
        .collect();

    Ok(SchemaProfile {
        columns,
        row_count: df.height(),
    })
}

impl SchemaProfile {
    /// Render the profile as prompt text for the planner.
    pub fn describe(&self) -> String {
        let mut lines = vec!["Available columns:".to_string()];
        for col in &self.columns {
            lines.push(format!(
                "  - {} ({}): examples [{}]",
                col.name,
                col.inferred_type,
                col.sample_values.join(", ")
            ));
        }
        lines.push(format!("\nTotal rows: {}", self.row_count));
        lines.join("\n")
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Stringify a cell value without the quotes polars adds to string display.
pub(crate) fn any_value_to_string(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string().trim_matches('"').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_columns_and_samples() {
        let df = df![
            "category" => ["Books", "Games", "Books", "Toys"],
            "sales" => [10.0, 20.0, 30.0, 40.0]
        ]
        .unwrap();

        let profile = profile(&df).unwrap();
        assert_eq!(profile.row_count, 4);
        assert_eq!(profile.columns.len(), 2);
        assert_eq!(profile.columns[0].name, "category");
        assert_eq!(profile.columns[0].sample_values.len(), SAMPLES_PER_COLUMN);
        assert_eq!(profile.columns[0].sample_values[0], "Books");
        assert!(profile.columns[1].sample_values[1].starts_with("20"));
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let df = DataFrame::empty();
        assert!(matches!(
            profile(&df),
            Err(DataRoomError::EmptyDataset)
        ));
    }

    #[test]
    fn describe_lists_every_column() {
        let df = df![
            "region" => ["north", "south"],
            "revenue" => [1.5, 2.5]
        ]
        .unwrap();

        let text = profile(&df).unwrap().describe();
        assert!(text.contains("region"));
        assert!(text.contains("revenue"));
        assert!(text.contains("Total rows: 2"));
    }
}
