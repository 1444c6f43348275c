//! Prompt construction for the planner agent.
//!
//! The visualization policy (when to chart, which chart type) lives in this
//! prompt text, not in structural code: trends get "line", category
//! comparisons get "bar", parts of a whole get "pie", numeric relationships
//! get "scatter", and purely informational questions get "none".

use crate::session::{Role, Turn};

/// Answers longer than this are truncated in the context block.
const CONTEXT_ANSWER_LIMIT: usize = 200;

pub fn build_planner_prompt(schema: &str, history: &[Turn], question: &str) -> String {
    format!(
        r#"You are the Planner Agent, a strategic thinker in a multi-agent data analysis system.

Your role is to:
1. Analyze the user's natural language question about their data
2. Examine the available data schema (columns, types, and sample values)
3. Create a step-by-step execution plan that the Executor agent will follow

Data Schema:
{}

Recent Context (previous conversation, for follow-up questions):
{}

User Question: {}

Output a JSON object with this exact structure:
{{
  "analysis": "Brief understanding of what the user is asking for",
  "steps": [
    "Step 1: Filter data to...",
    "Step 2: Group by...",
    "Step 3: Calculate..."
  ],
  "visualization": "bar|line|pie|scatter|none",
  "visualization_config": {{
    "x_axis": "column name for x-axis",
    "y_axis": "column name(s) for y-axis, a string or a list of strings",
    "title": "Suggested chart title"
  }}
}}

Important guidelines:
- If the user asks for trends over time, use "line" visualization
- If comparing categories, use "bar" visualization
- If showing parts of a whole, use "pie" visualization
- If looking for relationships between two numeric values, use "scatter" visualization
- If the question is purely informational (no aggregation or comparison implied), use "none" and omit visualization_config
- Consider context for follow-up questions (e.g., "show their locations" refers to previous results)
- Only reference columns that exist in the schema
- Return ONLY the JSON object, no other text"#,
        schema,
        format_history(history),
        question
    )
}

/// Corrective instruction used for the single retry after an unparsable
/// planner response.
pub fn build_retry_prompt(original_prompt: &str, bad_output: &str) -> String {
    format!(
        r#"{}

Your previous response could not be parsed:
{}

That response was not a valid plan. Return ONLY a single JSON object with the
exact structure requested above, with "visualization" set to one of
bar, line, pie, scatter, none. No markdown, no commentary."#,
        original_prompt, bad_output
    )
}

fn format_history(history: &[Turn]) -> String {
    if history.is_empty() {
        return "No previous conversation.".to_string();
    }

    let mut lines = vec!["Previous conversation:".to_string()];
    for turn in history {
        let label = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        let content: String = if turn.content.len() > CONTEXT_ANSWER_LIMIT {
            let truncated: String = turn.content.chars().take(CONTEXT_ANSWER_LIMIT).collect();
            format!("{}...", truncated)
        } else {
            turn.content.clone()
        };
        lines.push(format!("  {}: {}", label, content));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_schema_history_and_question() {
        let history = vec![Turn::user("what columns?"), Turn::assistant("a, b")];
        let prompt = build_planner_prompt("cols: a, b", &history, "total a by b?");
        assert!(prompt.contains("cols: a, b"));
        assert!(prompt.contains("User: what columns?"));
        assert!(prompt.contains("total a by b?"));
    }

    #[test]
    fn long_answers_are_truncated_in_context() {
        let history = vec![Turn::assistant("x".repeat(500))];
        let prompt = build_planner_prompt("s", &history, "q");
        assert!(prompt.contains(&format!("{}...", "x".repeat(200))));
        assert!(!prompt.contains(&"x".repeat(300)));
    }

    #[test]
    fn empty_history_is_stated_explicitly() {
        let prompt = build_planner_prompt("s", &[], "q");
        assert!(prompt.contains("No previous conversation."));
    }
}
