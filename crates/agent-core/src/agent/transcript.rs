//! Per-invocation scratchpad
//!
//! Append-only, ordered by iteration. Owned by one `invoke()` call and
//! dropped when it returns.

use serde::Serialize;

use crate::dispatch::{ExecutionResult, ToolCall};
use crate::parser::ExecutionMode;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    /// Tools were dispatched (or a repeated failing call was suppressed)
    Acted {
        iteration: usize,
        rationale: Option<String>,
        execution_mode: Option<ExecutionMode>,
        calls: Vec<ToolCall>,
        results: Vec<ExecutionResult>,
        repeated_failure: bool,
    },
    /// No action and no answer
    Thought {
        iteration: usize,
        rationale: Option<String>,
        reasoning_steps: Vec<String>,
    },
    /// The response held no JSON object
    ParseFailure { iteration: usize, error: String },
    /// The model did not answer within the configured limit
    LlmTimeout { iteration: usize, timeout_secs: f64 },
}

impl TranscriptEntry {
    pub fn iteration(&self) -> usize {
        match self {
            Self::Acted { iteration, .. }
            | Self::Thought { iteration, .. }
            | Self::ParseFailure { iteration, .. }
            | Self::LlmTimeout { iteration, .. } => *iteration,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        debug_assert!(
            self.entries
                .last()
                .is_none_or(|last| last.iteration() <= entry.iteration()),
            "transcript entries must be appended in iteration order"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<TranscriptEntry> {
        self.entries
    }
}

/// First `limit` characters, for echoing errors back to the model
pub(super) fn clip(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_order() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::ParseFailure {
            iteration: 1,
            error: "no json".into(),
        });
        transcript.push(TranscriptEntry::Thought {
            iteration: 2,
            rationale: Some("hmm".into()),
            reasoning_steps: Vec::new(),
        });

        let iterations: Vec<_> = transcript.entries().iter().map(TranscriptEntry::iteration).collect();
        assert_eq!(iterations, vec![1, 2]);
    }

    #[test]
    fn test_entry_serializes_with_kind_tag() {
        let entry = TranscriptEntry::LlmTimeout {
            iteration: 3,
            timeout_secs: 1.5,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "llm_timeout");
        assert_eq!(value["iteration"], 3);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("abcdef", 3), "abc");
        assert_eq!(clip("ab", 3), "ab");
    }
}
