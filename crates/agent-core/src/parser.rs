//! Response Parser
//!
//! Turns raw model output into a [`DecisionRecord`]. The JSON object is
//! located first (a fenced `json` block, then any fenced block, then the whole
//! text) and its keys are then read according to the [`ResponseFormat`] the
//! agent prompted for.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::ToolCall;
use crate::error::{AgentError, Result};

/// Characters of raw output kept when a response has to be taken verbatim
pub const SYNTHESIZED_ANSWER_LIMIT: usize = 1000;

static JSON_FENCES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)```json\s*(\{.*?\})\s*```",
        r"(?s)'''json\s*(\{.*?\})\s*'''",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static ANY_FENCE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?s)```[A-Za-z0-9_-]*\s*(\{.*?\})\s*```"]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Key set the model was asked to answer with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    /// `Tool call` / `Tool Parameters` / `Final Response`
    ToolCalling,
    /// `Thought` / `Action` / `Action Input` / `Final Answer`
    ReAct,
    /// `Reasoning Steps` / `Final Answer`
    Reasoning,
    /// `thought` / `execution_mode` / `actions` / `final_answer` / `finish`
    MultiTool,
}

/// Advisory scheduling hint supplied by the model; dispatch ignores it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Parallel,
    Batch,
    Sequential,
}

impl ExecutionMode {
    fn from_value(value: &Value) -> Option<Self> {
        match value.as_str()?.trim().to_lowercase().as_str() {
            "parallel" => Some(Self::Parallel),
            "batch" => Some(Self::Batch),
            "sequential" => Some(Self::Sequential),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parallel => "parallel",
            Self::Batch => "batch",
            Self::Sequential => "sequential",
        })
    }
}

/// What one model turn asks the loop to do
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    /// Stop and return this (already unescaped) answer
    FinalAnswer(String),
    /// Run these tool calls and observe the results
    Act(Vec<ToolCall>),
    /// Neither: keep thinking
    Think,
}

/// Parsed form of one model turn
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionRecord {
    pub rationale: Option<String>,
    pub intent: Intent,
    pub reasoning_steps: Vec<String>,
    pub execution_mode: Option<ExecutionMode>,
}

impl DecisionRecord {
    /// Terminal record built from output that held no JSON at all
    pub fn synthesized(raw: &str) -> Self {
        let raw = raw.trim();
        let answer = if raw.is_empty() {
            "Unable to parse response".to_string()
        } else {
            raw.chars().take(SYNTHESIZED_ANSWER_LIMIT).collect()
        };

        Self {
            rationale: Some("Response parsing failed".into()),
            intent: Intent::FinalAnswer(unescape(&answer)),
            reasoning_steps: Vec::new(),
            execution_mode: None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self.intent, Intent::FinalAnswer(_))
    }

    pub fn final_answer(&self) -> Option<&str> {
        match &self.intent {
            Intent::FinalAnswer(answer) => Some(answer),
            _ => None,
        }
    }

    pub fn actions(&self) -> &[ToolCall] {
        match &self.intent {
            Intent::Act(calls) => calls,
            _ => &[],
        }
    }
}

/// Parser for one response format
#[derive(Clone, Copy, Debug)]
pub struct ResponseParser {
    format: ResponseFormat,
}

impl ResponseParser {
    pub const fn new(format: ResponseFormat) -> Self {
        Self { format }
    }

    pub const fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Parse a raw model response.
    ///
    /// Fails only when no JSON object can be located; missing keys are read
    /// as absent.
    pub fn parse(&self, raw: &str) -> Result<DecisionRecord> {
        let object = extract_json(raw)?;
        Ok(match self.format {
            ResponseFormat::ToolCalling => read_tool_calling(&object),
            ResponseFormat::ReAct => read_react(&object),
            ResponseFormat::Reasoning => read_reasoning(&object),
            ResponseFormat::MultiTool => read_multi_tool(&object),
        })
    }
}

/// Locate the JSON object in a model response
pub fn extract_json(raw: &str) -> Result<Map<String, Value>> {
    let fenced = JSON_FENCES
        .iter()
        .chain(ANY_FENCE.iter())
        .flat_map(|re| re.captures_iter(raw))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));

    for candidate in fenced.chain(std::iter::once(raw.trim())) {
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(candidate) {
            return Ok(object);
        }
    }

    let preview: String = raw.chars().take(200).collect();
    Err(AgentError::Parse(format!(
        "No JSON object found in response: {preview}"
    )))
}

/// Turn literal `\n`, `\t` and `\r` sequences into the characters they name
pub fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}

/// Read a key, folding the "no value" placeholders into `None`
fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(text) if matches!(text.trim(), "" | "None" | "null") => None,
        value => Some(value),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn present_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    present(object, key).map(text)
}

fn final_answer(answer: &str) -> Intent {
    Intent::FinalAnswer(unescape(answer))
}

fn read_react(object: &Map<String, Value>) -> DecisionRecord {
    let intent = if let Some(answer) = present_text(object, "Final Answer") {
        final_answer(&answer)
    } else if let Some(action) = present_text(object, "Action") {
        let parameters = present(object, "Action Input").cloned().unwrap_or(Value::Null);
        Intent::Act(vec![ToolCall::new(action, parameters)])
    } else {
        Intent::Think
    };

    DecisionRecord {
        rationale: present_text(object, "Thought"),
        intent,
        reasoning_steps: Vec::new(),
        execution_mode: None,
    }
}

fn read_tool_calling(object: &Map<String, Value>) -> DecisionRecord {
    let intent = match present_text(object, "Tool call") {
        Some(tool) => {
            let parameters = present(object, "Tool Parameters").cloned().unwrap_or(Value::Null);
            Intent::Act(vec![ToolCall::new(tool, parameters)])
        }
        None => {
            let answer = present_text(object, "Final Response")
                .unwrap_or_else(|| "No final response provided.".into());
            final_answer(&answer)
        }
    };

    DecisionRecord {
        rationale: None,
        intent,
        reasoning_steps: Vec::new(),
        execution_mode: None,
    }
}

fn read_reasoning(object: &Map<String, Value>) -> DecisionRecord {
    let reasoning_steps = match present(object, "Reasoning Steps") {
        Some(Value::Array(steps)) => steps.iter().map(text).collect(),
        Some(step) => vec![text(step)],
        None => Vec::new(),
    };

    let intent = match present_text(object, "Final Answer") {
        Some(answer) => final_answer(&answer),
        None => Intent::Think,
    };

    DecisionRecord {
        rationale: None,
        intent,
        reasoning_steps,
        execution_mode: None,
    }
}

fn read_multi_tool(object: &Map<String, Value>) -> DecisionRecord {
    let rationale = present_text(object, "thought");
    let finished = present(object, "finish").and_then(Value::as_bool).unwrap_or(false);
    let answer = present_text(object, "final_answer");

    let actions: Vec<ToolCall> = match present(object, "actions") {
        Some(Value::Array(items)) => items.iter().map(read_action).collect(),
        _ => Vec::new(),
    };

    let intent = if finished {
        let answer = answer
            .or_else(|| rationale.clone())
            .unwrap_or_else(|| "Task completed".into());
        final_answer(&answer)
    } else if !actions.is_empty() {
        Intent::Act(actions)
    } else if let Some(answer) = answer {
        final_answer(&answer)
    } else {
        Intent::Think
    };

    DecisionRecord {
        rationale,
        intent,
        reasoning_steps: Vec::new(),
        execution_mode: present(object, "execution_mode").and_then(ExecutionMode::from_value),
    }
}

fn read_action(item: &Value) -> ToolCall {
    let tool = item.get("tool").map(text).unwrap_or_default();
    let parameters = item.get("parameters").cloned().unwrap_or(Value::Null);
    ToolCall::new(tool, parameters)
}
