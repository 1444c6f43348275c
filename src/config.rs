//! Application settings loaded from environment variables.

/// Upload extensions accepted by the API.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".csv", ".xlsx", ".xls"];

#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenAI-compatible API key for the planner backend.
    pub api_key: String,
    pub model: String,
    pub base_url: String,

    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Maximum accepted upload size in bytes.
    pub max_file_size: usize,

    /// Number of recent turns included as planner context.
    pub context_window: usize,

    /// Timeout for a single text-generation call, in seconds.
    pub llm_timeout_secs: u64,

    /// Timeout for a single query-engine invocation, in seconds.
    pub engine_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            max_file_size: std::env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            context_window: std::env::var("MAX_CONTEXT_TURNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            engine_timeout_secs: std::env::var("ENGINE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}
