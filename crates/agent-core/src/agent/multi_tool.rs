//! Multi-tool variant: several calls per round, history as numbered rounds.

use crate::prompt::{self, MULTI_TOOL_HISTORY, MULTI_TOOL_REQUEST, MULTI_TOOL_SYSTEM};
use crate::registry::{SchemaStyle, ToolRegistry};

use super::transcript::{Transcript, TranscriptEntry};
use super::BasePrompt;

pub(super) fn base_prompt(
    introduction: Option<&str>,
    registry: &ToolRegistry,
    query: &str,
    memory: Option<String>,
) -> BasePrompt {
    let tools = registry.render_schema_with(SchemaStyle::Bulleted);
    let mut head = prompt::render(
        MULTI_TOOL_SYSTEM,
        &[
            ("agent_introduction", introduction.unwrap_or_default()),
            ("tools_description", &tools),
        ],
    );

    if let Some(context) = memory {
        head.push_str(&format!("\nCONVERSATION HISTORY:\n{context}\n"));
    }

    BasePrompt {
        head,
        tail: prompt::render(MULTI_TOOL_REQUEST, &[("user_input", query)]),
    }
}

pub(super) fn render_history(transcript: &Transcript) -> String {
    transcript
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let round = (index + 1).to_string();
            let (thought, mode, actions, results) = match entry {
                TranscriptEntry::Acted {
                    rationale,
                    execution_mode,
                    calls,
                    results,
                    ..
                } => (
                    rationale.clone().unwrap_or_default(),
                    execution_mode.map_or_else(|| "parallel".to_string(), |mode| mode.to_string()),
                    serde_json::to_string_pretty(calls).unwrap_or_default(),
                    serde_json::to_string_pretty(results).unwrap_or_default(),
                ),
                TranscriptEntry::Thought { rationale, .. } => (
                    rationale.clone().unwrap_or_default(),
                    "unknown".to_string(),
                    "[]".to_string(),
                    "[]".to_string(),
                ),
                TranscriptEntry::ParseFailure { error, .. } => (
                    format!("Response could not be parsed: {error}"),
                    "unknown".to_string(),
                    "[]".to_string(),
                    "[]".to_string(),
                ),
                TranscriptEntry::LlmTimeout { timeout_secs, .. } => (
                    format!("No response within {timeout_secs}s"),
                    "unknown".to_string(),
                    "[]".to_string(),
                    "[]".to_string(),
                ),
            };

            prompt::render(
                MULTI_TOOL_HISTORY,
                &[
                    ("round_number", &round),
                    ("thought", &thought),
                    ("execution_mode", &mode),
                    ("actions", &actions),
                    ("results", &results),
                ],
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_helpers::constant_tool;

    #[test]
    fn test_base_prompt_sections() {
        let mut registry = ToolRegistry::new();
        registry.register(constant_tool("clock", "noon")).unwrap();

        let base = base_prompt(Some("Be brief."), &registry, "time?", None);
        assert!(base.head.starts_with("Be brief.\n\nYou are a Multi Reasoning Tool Agent"));
        assert!(base.head.contains("AVAILABLE TOOLS:\n• clock: Returns noon\n  No parameters\n"));
        assert_eq!(
            base.tail,
            "\nQuery: time?\n\nThink strategically and execute tools efficiently. Respond in JSON format:"
        );
    }

    #[test]
    fn test_thought_round_has_no_actions() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::Thought {
            iteration: 1,
            rationale: Some("plan".into()),
            reasoning_steps: Vec::new(),
        });

        assert_eq!(
            render_history(&transcript),
            "\nRound 1:\nThought: plan\nMode: unknown\nActions: []\nResults: []\n"
        );
        assert_eq!(render_history(&Transcript::new()), "");
    }
}
