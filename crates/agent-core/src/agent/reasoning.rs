//! Reasoning-only variant: no tools, steps accumulate until an answer.

use serde::Serialize;

use crate::prompt::{self, REASONING};

use super::transcript::{clip, Transcript, TranscriptEntry};
use super::{BasePrompt, LoopOutcome, LoopStatus};

pub(super) fn base_prompt(
    introduction: Option<&str>,
    query: &str,
    memory: Option<String>,
) -> BasePrompt {
    let template = REASONING.compose(introduction);
    let mut head = prompt::render(&template, &[("user_input", query)]);

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
    let mut completed = 0;

    for entry in transcript.entries() {
        match entry {
            TranscriptEntry::Thought {
                reasoning_steps, ..
            } if !reasoning_steps.is_empty() => {
                completed += reasoning_steps.len();
                pad.push_str(&format!(
                    "\n\n--- Previous Reasoning ---\nSteps completed: {completed}\nContinue reasoning and provide the final answer when ready."
                ));
            }
            TranscriptEntry::ParseFailure { error, .. } => {
                pad.push_str(&format!(
                    "\n\n--- Error ---\nResponse parsing failed. Provide valid JSON with: Reasoning Steps, Final Answer.\nError: {}",
                    clip(error, 100)
                ));
            }
            TranscriptEntry::LlmTimeout { timeout_secs, .. } => {
                pad.push_str(&format!(
                    "\n\n--- Error ---\nNo response within {timeout_secs}s. Provide valid JSON with: Reasoning Steps, Final Answer."
                ));
            }
            TranscriptEntry::Thought { .. } | TranscriptEntry::Acted { .. } => {}
        }
    }

    if pad.is_empty() { pad } else { format!("\n{pad}") }
}

/// Steps plus answer, returned when `show_reasoning` is set
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReasoningBundle {
    pub reasoning_steps: Vec<String>,
    pub final_answer: String,
    pub iterations: usize,
    /// `"incomplete"` when the iteration cap was reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Result shape of the reasoning agent
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReasoningOutcome {
    Answer(String),
    Bundle(ReasoningBundle),
}

impl ReasoningOutcome {
    pub fn from_outcome(outcome: LoopOutcome, show_reasoning: bool) -> Self {
        // An aborted run reports its error text, never a bundle
        if !show_reasoning || outcome.status == LoopStatus::Aborted {
            return Self::Answer(outcome.answer);
        }

        Self::Bundle(ReasoningBundle {
            reasoning_steps: outcome.reasoning_steps,
            final_answer: outcome.answer,
            iterations: outcome.iterations,
            status: (outcome.status == LoopStatus::Exhausted).then(|| "incomplete".to_string()),
        })
    }

    pub fn final_answer(&self) -> &str {
        match self {
            Self::Answer(answer) => answer,
            Self::Bundle(bundle) => &bundle.final_answer,
        }
    }
}
