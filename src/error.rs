use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataRoomError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Dataset has no columns")]
    EmptyDataset,

    #[error("Plan parse error: {0}")]
    PlanParse(String),

    #[error("Execution error in step '{step}': {message}")]
    Execution { step: String, message: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl DataRoomError {
    pub fn execution(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            step: step.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataRoomError>;
