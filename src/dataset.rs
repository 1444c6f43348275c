//! Dataset handles - parsed tabular data plus a cached schema profile.

use crate::config::ALLOWED_EXTENSIONS;
use crate::error::{DataRoomError, Result};
use crate::schema::{self, SchemaProfile};
use calamine::{Data, Reader, Xls, Xlsx};
use once_cell::sync::OnceCell;
use polars::prelude::*;
use std::io::Cursor;

/// Reference to one uploaded dataset. Immutable after creation; the schema
/// profile is computed once and cached on the handle.
pub struct DatasetHandle {
    filename: String,
    file_size: usize,
    frame: DataFrame,
    profile: OnceCell<SchemaProfile>,
}

impl DatasetHandle {
    /// Parse uploaded bytes according to the filename's extension.
    pub fn from_bytes(filename: &str, bytes: &[u8]) -> Result<Self> {
        let frame = match extension_of(filename).as_str() {
            ".csv" => read_csv(bytes)?,
            ".xlsx" => read_xlsx(bytes)?,
            ".xls" => read_xls(bytes)?,
            other => {
                return Err(DataRoomError::Validation(format!(
                    "Unsupported file type: {}",
                    other
                )))
            }
        };

        Ok(Self {
            filename: filename.to_string(),
            file_size: bytes.len(),
            frame,
            profile: OnceCell::new(),
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn file_size(&self) -> usize {
        self.file_size
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Schema profile, computed on first access and cached. The `OnceCell`
    /// guard guarantees the computation runs at most once per handle.
    pub fn profile(&self) -> Result<&SchemaProfile> {
        self.profile.get_or_try_init(|| schema::profile(&self.frame))
    }
}

/// Validate an upload before any parsing happens. Rejections here must not
/// create a session.
pub fn validate_upload(filename: &str, file_size: usize, max_file_size: usize) -> Result<()> {
    let ext = extension_of(filename);
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(DataRoomError::Validation(format!(
            "Invalid file type '{}'. Allowed: {}",
            ext,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    if file_size > max_file_size {
        return Err(DataRoomError::Validation(format!(
            "File too large. Maximum size: {}MB",
            max_file_size / (1024 * 1024)
        )));
    }
    Ok(())
}

fn extension_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

fn read_csv(bytes: &[u8]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    Ok(df)
}

fn read_xlsx(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| DataRoomError::Validation(format!("Error reading Excel file: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataRoomError::Validation("Workbook has no sheets".to_string()))?
        .map_err(|e| DataRoomError::Validation(format!("Error reading sheet: {}", e)))?;
    sheet_to_frame(&range)
}

fn read_xls(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook = Xls::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| DataRoomError::Validation(format!("Error reading Excel file: {}", e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataRoomError::Validation("Workbook has no sheets".to_string()))?
        .map_err(|e| DataRoomError::Validation(format!("Error reading sheet: {}", e)))?;
    sheet_to_frame(&range)
}

/// Convert a worksheet into a dataframe. Header row gives column names; a
/// column is numeric if every non-empty cell is numeric.
fn sheet_to_frame(range: &calamine::Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| DataRoomError::EmptyDataset)?
        .iter()
        .map(|c| c.to_string())
        .collect();

    let body: Vec<&[Data]> = rows.collect();
    let mut series = Vec::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(idx).unwrap_or(&Data::Empty))
            .collect();
        let numeric = cells
            .iter()
            .all(|c| matches!(c, Data::Int(_) | Data::Float(_) | Data::Empty));
        if numeric {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v as f64),
                    Data::Float(v) => Some(*v),
                    _ => None,
                })
                .collect();
            series.push(Series::new(name, values));
        } else {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| match c {
                    Data::Empty => None,
                    other => Some(other.to_string()),
                })
                .collect();
            series.push(Series::new(name, values));
        }
    }

    Ok(DataFrame::new(series)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "category,sales\nBooks,10.5\nGames,20.0\n";

    #[test]
    fn loads_csv_bytes() {
        let handle = DatasetHandle::from_bytes("sales.csv", CSV.as_bytes()).unwrap();
        assert_eq!(handle.row_count(), 2);
        assert_eq!(handle.column_names(), vec!["category", "sales"]);
        assert_eq!(handle.file_size(), CSV.len());
    }

    #[test]
    fn profile_is_cached() {
        let handle = DatasetHandle::from_bytes("sales.csv", CSV.as_bytes()).unwrap();
        let first = handle.profile().unwrap() as *const _;
        let second = handle.profile().unwrap() as *const _;
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_disallowed_extension() {
        let err = validate_upload("report.pdf", 100, 1024).unwrap_err();
        assert!(matches!(err, DataRoomError::Validation(_)));
    }

    #[test]
    fn rejects_oversize_upload() {
        let err = validate_upload("big.csv", 2048, 1024).unwrap_err();
        assert!(matches!(err, DataRoomError::Validation(_)));
    }

    #[test]
    fn accepts_allowed_extensions() {
        for name in ["a.csv", "b.xlsx", "c.XLS"] {
            assert!(validate_upload(name, 10, 1024).is_ok());
        }
    }
}
