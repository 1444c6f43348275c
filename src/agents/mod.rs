pub mod executor;
pub mod planner;
pub mod prompts;
