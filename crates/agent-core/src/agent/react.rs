//! ReAct variant: Thought / Action / Observation scratchpad.

use std::collections::HashMap;

use crate::dispatch::{ExecutionResult, FailureKind, ToolCall, ToolDispatcher};
use crate::prompt::{self, REACT};
use crate::registry::{SchemaStyle, ToolRegistry};

use super::transcript::{clip, Transcript, TranscriptEntry};
use super::BasePrompt;

/// Identical failures allowed before a call is no longer attempted
const REPEAT_LIMIT: u32 = 3;

pub(super) fn base_prompt(
    introduction: Option<&str>,
    registry: &ToolRegistry,
    query: &str,
    memory: Option<String>,
) -> BasePrompt {
    let template = REACT.compose(introduction);
    let tools = registry.render_schema_with(SchemaStyle::Indented(8));
    let mut head = prompt::render(&template, &[("tool_list", &tools), ("user_input", query)]);

    if let Some(context) = memory {
        head.push_str(&format!(
            "\n\n--- Conversation History ---\n{context}\n--- End History ---\n"
        ));
    }

    BasePrompt {
        head,
        tail: String::new(),
    }
}

pub(super) fn render_scratchpad(transcript: &Transcript) -> String {
    let mut pad = String::new();

    for entry in transcript.entries() {
        match entry {
            TranscriptEntry::Acted {
                iteration,
                rationale,
                calls,
                results,
                repeated_failure,
                ..
            } => {
                let action = calls.first().map_or("None", |call| call.tool.as_str());
                let observation = results
                    .first()
                    .map(ExecutionResult::observation)
                    .unwrap_or_default();

                if *repeated_failure {
                    pad.push_str(&format!("\n\n--- Step {iteration} (Repeated Failure) ---"));
                } else {
                    pad.push_str(&format!("\n\n--- Step {iteration} ---"));
                }
                pad.push_str(&format!(
                    "\nThought: {}\nAction: {action}\nObservation: {observation}",
                    rationale.as_deref().unwrap_or("None")
                ));
                if *repeated_failure {
                    pad.push_str("\n\nTry different parameters or a different tool.");
                }
            }
            TranscriptEntry::Thought {
                iteration,
                rationale,
                ..
            } => {
                pad.push_str(&format!(
                    "\n\n--- Thought {iteration} ---\n{}",
                    rationale.as_deref().unwrap_or("None")
                ));
            }
            TranscriptEntry::ParseFailure { error, .. } => {
                pad.push_str(&format!(
                    "\n\n--- Error ---\nResponse parsing failed. Provide valid JSON with: Thought, Action, Action Input, Final Answer.\nError: {}",
                    clip(error, 100)
                ));
            }
            TranscriptEntry::LlmTimeout { timeout_secs, .. } => {
                pad.push_str(&format!(
                    "\n\n--- Error ---\nNo response within {timeout_secs}s. Provide valid JSON with: Thought, Action, Action Input, Final Answer."
                ));
            }
        }
    }

    if pad.is_empty() { pad } else { format!("\n{pad}") }
}

/// Consecutive failures per exact `tool:parameters` call
#[derive(Debug, Default)]
pub(super) struct FailureTracker {
    counts: HashMap<String, u32>,
}

impl FailureTracker {
    fn key(call: &ToolCall) -> String {
        format!("{}:{}", call.tool, call.parameters)
    }

    /// Failure count when the call should no longer be attempted
    fn suppressed(&self, key: &str) -> Option<u32> {
        self.counts
            .get(key)
            .copied()
            .filter(|count| *count >= REPEAT_LIMIT)
    }

    fn record(&mut self, key: String, success: bool) {
        if success {
            self.counts.remove(&key);
        } else {
            *self.counts.entry(key).or_default() += 1;
        }
    }
}

pub(super) async fn act(
    dispatcher: &ToolDispatcher,
    failures: &mut FailureTracker,
    iteration: usize,
    rationale: Option<String>,
    calls: Vec<ToolCall>,
) -> TranscriptEntry {
    // One action per turn
    let Some(call) = calls.into_iter().next() else {
        return TranscriptEntry::Thought {
            iteration,
            rationale,
            reasoning_steps: Vec::new(),
        };
    };

    let key = FailureTracker::key(&call);
    if let Some(count) = failures.suppressed(&key) {
        tracing::warn!(tool = %call.tool, count, "Suppressing repeated failing tool call");
        let result = ExecutionResult::suppressed(
            &call,
            format!(
                "Error: This exact tool call has failed {count} times. Please try a different approach or different parameters."
            ),
        );
        return TranscriptEntry::Acted {
            iteration,
            rationale,
            execution_mode: None,
            calls: vec![call],
            results: vec![result],
            repeated_failure: true,
        };
    }

    let mut result = dispatcher.invoke_one(&call.tool, &call.parameters).await;
    failures.record(key, result.is_success());

    if result.failure_kind() == Some(FailureKind::ParameterMismatch) {
        if let Some(schema) = dispatcher.registry().schema(&call.tool) {
            if !schema.parameters.is_empty() {
                result.append_hint(&format!(
                    "\n\nAvailable parameters: {}",
                    schema.parameter_hint()
                ));
            }
        }
        result.append_hint("\n\nPlease check the parameter names and try again.");
    }

    TranscriptEntry::Acted {
        iteration,
        rationale,
        execution_mode: None,
        calls: vec![call],
        results: vec![result],
        repeated_failure: false,
    }
}
