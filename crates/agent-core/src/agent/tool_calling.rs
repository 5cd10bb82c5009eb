//! Tool-calling variant: one tool per turn, history as name/result pairs.

use crate::dispatch::ExecutionResult;
use crate::prompt::{self, TOOL_CALLING};
use crate::registry::{SchemaStyle, ToolRegistry};

use super::transcript::{clip, Transcript, TranscriptEntry};
use super::BasePrompt;

pub(super) fn base_prompt(
    introduction: Option<&str>,
    registry: &ToolRegistry,
    query: &str,
    memory: Option<String>,
) -> BasePrompt {
    let template = TOOL_CALLING.compose(introduction);
    let tools = registry.render_schema_with(SchemaStyle::Indented(4));
    let context = memory
        .map(|context| format!("\n\nConversation History:\n{context}"))
        .unwrap_or_default();

    BasePrompt {
        head: prompt::render(
            &template,
            &[
                ("tool_list", &tools),
                ("previous_context", &context),
                ("user_input", query),
            ],
        ),
        tail: String::new(),
    }
}

pub(super) fn render_history(transcript: &Transcript, limit: Option<usize>) -> String {
    let items: Vec<String> = transcript
        .entries()
        .iter()
        .flat_map(|entry| match entry {
            TranscriptEntry::Acted { calls, results, .. } => calls
                .iter()
                .zip(results)
                .map(|(call, result)| {
                    format!(
                        "Previous Tool: {}\nResult: {}",
                        call.tool,
                        ExecutionResult::observation(result)
                    )
                })
                .collect::<Vec<_>>(),
            TranscriptEntry::ParseFailure { error, .. } => vec![format!(
                "Previous Response Error: {}\nRespond with a single ```json block using the keys \"Tool call\", \"Tool Parameters\", \"Final Response\".",
                clip(error, 200)
            )],
            TranscriptEntry::LlmTimeout { timeout_secs, .. } => vec![format!(
                "Previous Response Error: no response within {timeout_secs}s"
            )],
            TranscriptEntry::Thought { .. } => Vec::new(),
        })
        .collect();

    let start = limit.map_or(0, |limit| items.len().saturating_sub(limit));
    let recent = &items[start..];
    if recent.is_empty() {
        return String::new();
    }

    format!(
        "\n\n--- Tool Execution History ---\n{}\n---",
        recent.join("\n\n")
    )
}
