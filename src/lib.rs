//! Conversational data room - multi-agent query pipeline over tabular data.
//!
//! Upload a CSV/XLSX dataset, then ask questions in natural language. A
//! planner agent turns each question into a structured plan, an executor
//! agent runs the plan through a tabular query engine, and the response
//! assembler merges both into the chat contract.

pub mod agents;
pub mod api;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod response;
pub mod schema;
pub mod session;
