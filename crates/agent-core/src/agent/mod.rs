//! Agent Loops
//!
//! One think → parse → act → observe state machine shared by four variants.
//! Each iteration builds the prompt, awaits the model, parses the reply into a
//! [`DecisionRecord`] and then either finishes, keeps thinking, or dispatches
//! tools and records what they returned. Only the prompt text, the response
//! key set and a few policies differ per [`AgentKind`].
//!
//! ```text
//!   THINKING ──final answer──▶ DONE
//!      │  ▲
//!  actions│  │observations
//!      ▼  │
//!    ACTING          (cap reached) ──▶ EXHAUSTED
//! ```

mod multi_tool;
mod react;
mod reasoning;
#[cfg(test)]
mod test_helpers;
mod tool_calling;
pub mod transcript;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::dispatch::{log_preview, DispatchConfig, ToolCall, ToolDispatcher};
use crate::error::{AgentError, Result};
use crate::memory::{ConversationMemory, Message};
use crate::parser::{DecisionRecord, ExecutionMode, Intent, ResponseFormat, ResponseParser};
use crate::provider::LlmProvider;
use crate::registry::{ToolRegistry, ToolSource};

pub use reasoning::{ReasoningBundle, ReasoningOutcome};
pub use transcript::{Transcript, TranscriptEntry};

/// Model answer limit used when nothing else is configured
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// Loop variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    /// One tool per turn, history limited to tool name/result pairs
    ToolCalling,
    /// Thought / Action / Observation with repeated-failure suppression
    React,
    /// No tools; accumulates reasoning steps until an answer appears
    Reasoning,
    /// Several tools per turn, dispatched concurrently
    MultiTool,
}

impl AgentKind {
    pub const ALL: [Self; 4] = [Self::ToolCalling, Self::React, Self::Reasoning, Self::MultiTool];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToolCalling => "tool-calling",
            Self::React => "react",
            Self::Reasoning => "reasoning",
            Self::MultiTool => "multi-tool",
        }
    }

    pub const fn response_format(self) -> ResponseFormat {
        match self {
            Self::ToolCalling => ResponseFormat::ToolCalling,
            Self::React => ResponseFormat::ReAct,
            Self::Reasoning => ResponseFormat::Reasoning,
            Self::MultiTool => ResponseFormat::MultiTool,
        }
    }

    pub const fn default_max_iterations(self) -> usize {
        match self {
            Self::React => 15,
            Self::ToolCalling | Self::Reasoning | Self::MultiTool => 10,
        }
    }

    pub const fn default_parse_failure(self) -> ParseFailurePolicy {
        match self {
            Self::ToolCalling | Self::React => ParseFailurePolicy::Retry,
            Self::Reasoning => ParseFailurePolicy::Abort,
            Self::MultiTool => ParseFailurePolicy::Synthesize,
        }
    }

    /// Whether `invoke()` refuses to start with an empty registry
    pub const fn requires_tools(self) -> bool {
        !matches!(self, Self::Reasoning)
    }

    /// Fixed answer returned when the iteration cap is reached
    pub fn exhaustion_message(self, max_iterations: usize) -> String {
        match self {
            Self::ToolCalling => "Error: Maximum reasoning iterations reached.".into(),
            Self::React => format!("Error: Maximum iterations ({max_iterations}) reached"),
            Self::Reasoning => "Unable to reach conclusion within iteration limit".into(),
            Self::MultiTool => "Maximum iterations reached without completion".into(),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AgentError::Config(format!("Unknown agent kind '{s}'")))
    }
}

/// What to do with a response that holds no JSON object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseFailurePolicy {
    /// Record the error as an observation and ask again
    Retry,
    /// Stop and return `Error parsing response: ...`
    Abort,
    /// Treat the raw text as the final answer
    Synthesize,
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum think/act cycles before giving up
    pub max_iterations: usize,

    /// Custom persona replacing the default preamble prefix
    pub introduction: Option<String>,

    /// Deadline for one model call; `None` waits forever
    pub llm_timeout: Option<Duration>,

    pub parse_failure: ParseFailurePolicy,

    /// Reasoning variant: return the step bundle instead of the bare answer
    pub show_reasoning: bool,

    /// Tool-calling variant: keep only the most recent history entries
    pub tool_history_limit: Option<usize>,

    pub dispatch: DispatchConfig,
}

impl AgentConfig {
    /// Defaults for one loop variant
    pub fn for_kind(kind: AgentKind) -> Self {
        Self {
            max_iterations: kind.default_max_iterations(),
            introduction: None,
            llm_timeout: Some(DEFAULT_LLM_TIMEOUT),
            parse_failure: kind.default_parse_failure(),
            show_reasoning: true,
            tool_history_limit: None,
            dispatch: DispatchConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.dispatch.max_workers == 0 {
            return Err(AgentError::Config("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// How an invocation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStatus {
    /// The model produced a final answer (possibly synthesized from raw text)
    Completed,
    /// The iteration cap was reached
    Exhausted,
    /// A parse failure ended the run under [`ParseFailurePolicy::Abort`]
    Aborted,
}

/// Full result of one `invoke()`
#[derive(Clone, Debug, Serialize)]
pub struct LoopOutcome {
    pub answer: String,
    pub status: LoopStatus,
    pub iterations: usize,
    pub reasoning_steps: Vec<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub run_id: Uuid,
}

impl LoopOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == LoopStatus::Completed
    }
}

/// Fixed head and tail of a prompt; the rendered transcript goes between
pub(crate) struct BasePrompt {
    head: String,
    tail: String,
}

/// An agent: a loop variant bound to a model, tools and optional memory
pub struct Agent {
    kind: AgentKind,
    provider: Option<Arc<dyn LlmProvider>>,
    registry: Arc<ToolRegistry>,
    memory: Option<Arc<dyn ConversationMemory>>,
    config: AgentConfig,
}

impl Agent {
    pub fn builder(kind: AgentKind) -> AgentBuilder {
        AgentBuilder::new(kind)
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Set or replace the model
    pub fn set_provider(&mut self, provider: Arc<dyn LlmProvider>) {
        self.provider = Some(provider);
    }

    pub fn set_memory(&mut self, memory: Arc<dyn ConversationMemory>) {
        self.memory = Some(memory);
    }

    pub fn clear_memory(&self) {
        if let Some(memory) = &self.memory {
            memory.clear();
            tracing::debug!("Memory cleared");
        }
    }

    pub fn memory_history(&self) -> Vec<Message> {
        self.memory
            .as_ref()
            .map(|memory| memory.history())
            .unwrap_or_default()
    }

    /// Register more tools. Registries shared with other agents are copied
    /// first, so the others are unaffected.
    pub fn register(&mut self, source: impl Into<ToolSource>) -> Result<usize> {
        Arc::make_mut(&mut self.registry).register(source)
    }

    /// Run the loop and return the answer text.
    ///
    /// Iteration exhaustion is not an error: the fixed exhaustion message is
    /// returned instead. Use [`Agent::invoke_detailed`] to tell them apart.
    pub async fn invoke(&self, query: &str) -> Result<String> {
        Ok(self.invoke_detailed(query).await?.answer)
    }

    /// Run the loop and return the answer with status and transcript
    pub async fn invoke_detailed(&self, query: &str) -> Result<LoopOutcome> {
        let provider = self.check_ready()?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("agent", kind = %self.kind, %run_id);
        self.run(provider, query, run_id).instrument(span).await
    }

    /// Reasoning-shaped result: the bundle when `show_reasoning` is set,
    /// otherwise the bare answer
    pub async fn reason(&self, query: &str) -> Result<ReasoningOutcome> {
        let outcome = self.invoke_detailed(query).await?;
        Ok(ReasoningOutcome::from_outcome(
            outcome,
            self.config.show_reasoning,
        ))
    }

    fn check_ready(&self) -> Result<&Arc<dyn LlmProvider>> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            AgentError::Config("LLM not set. Call set_provider() first".into())
        })?;

        if self.kind.requires_tools() && self.registry.is_empty() {
            return Err(AgentError::Config(
                "No tools added. Register at least one tool before invoking".into(),
            ));
        }

        self.config.validate()?;
        Ok(provider)
    }

    async fn run(
        &self,
        provider: &Arc<dyn LlmProvider>,
        query: &str,
        run_id: Uuid,
    ) -> Result<LoopOutcome> {
        tracing::info!(provider = provider.name(), query = %log_preview(query), "Agent started");

        if let Some(memory) = &self.memory {
            memory.add_user_message(query);
        }

        let base = self.base_prompt(query);
        let parser = ResponseParser::new(self.kind.response_format());
        let dispatcher =
            ToolDispatcher::with_config(Arc::clone(&self.registry), self.config.dispatch.clone());

        let mut transcript = Transcript::new();
        let mut failures = react::FailureTracker::default();
        let mut reasoning_steps: Vec<String> = Vec::new();
        let max_iterations = self.config.max_iterations;

        for iteration in 1..=max_iterations {
            tracing::debug!(iteration, "Iteration");

            let prompt = self.render_prompt(&base, &transcript);
            let Some(response) = self.call_llm(provider, &prompt).await? else {
                transcript.push(TranscriptEntry::LlmTimeout {
                    iteration,
                    timeout_secs: self.config.llm_timeout.unwrap_or_default().as_secs_f64(),
                });
                continue;
            };

            let record = match parser.parse(&response) {
                Ok(record) => record,
                Err(err) => {
                    let error = parse_error_text(&err);
                    tracing::warn!(iteration, policy = ?self.config.parse_failure, error = %error, "Response parsing failed");

                    match self.config.parse_failure {
                        ParseFailurePolicy::Retry => {
                            transcript.push(TranscriptEntry::ParseFailure { iteration, error });
                            continue;
                        }
                        ParseFailurePolicy::Abort => {
                            return Ok(self.finish(
                                LoopStatus::Aborted,
                                format!("Error parsing response: {error}"),
                                iteration,
                                reasoning_steps,
                                transcript,
                                run_id,
                            ));
                        }
                        ParseFailurePolicy::Synthesize => DecisionRecord::synthesized(&response),
                    }
                }
            };

            if let Some(thought) = &record.rationale {
                tracing::debug!(iteration, thought = %log_preview(thought), "Thought");
            }
            for step in &record.reasoning_steps {
                tracing::debug!(step = reasoning_steps.len() + 1, text = %log_preview(step), "Reasoning step");
                reasoning_steps.push(step.clone());
            }

            match record.intent {
                Intent::FinalAnswer(answer) => {
                    if let Some(memory) = &self.memory {
                        memory.add_ai_message(&answer);
                    }
                    return Ok(self.finish(
                        LoopStatus::Completed,
                        answer,
                        iteration,
                        reasoning_steps,
                        transcript,
                        run_id,
                    ));
                }
                Intent::Think => {
                    tracing::debug!(iteration, "No action taken, continuing to think");
                    transcript.push(TranscriptEntry::Thought {
                        iteration,
                        rationale: record.rationale,
                        reasoning_steps: record.reasoning_steps,
                    });
                }
                Intent::Act(calls) => {
                    let entry = self
                        .act(
                            &dispatcher,
                            &mut failures,
                            iteration,
                            record.rationale,
                            record.execution_mode,
                            calls,
                        )
                        .await;
                    transcript.push(entry);
                }
            }
        }

        let message = self.kind.exhaustion_message(max_iterations);
        tracing::warn!(max_iterations, "{message}");
        Ok(self.finish(
            LoopStatus::Exhausted,
            message,
            max_iterations,
            reasoning_steps,
            transcript,
            run_id,
        ))
    }

    /// `Ok(None)` when the model did not answer in time
    async fn call_llm(
        &self,
        provider: &Arc<dyn LlmProvider>,
        prompt: &str,
    ) -> Result<Option<String>> {
        let call = provider.generate_response(prompt);
        let Some(limit) = self.config.llm_timeout else {
            return call.await.map(Some);
        };

        match tokio::time::timeout(limit, call).await {
            Ok(response) => response.map(Some),
            Err(_) => {
                tracing::warn!(
                    provider = provider.name(),
                    timeout_secs = limit.as_secs_f64(),
                    "LLM call timed out"
                );
                Ok(None)
            }
        }
    }

    async fn act(
        &self,
        dispatcher: &ToolDispatcher,
        failures: &mut react::FailureTracker,
        iteration: usize,
        rationale: Option<String>,
        execution_mode: Option<ExecutionMode>,
        calls: Vec<ToolCall>,
    ) -> TranscriptEntry {
        let tools: Vec<&str> = calls.iter().map(|call| call.tool.as_str()).collect();
        tracing::debug!(iteration, ?tools, mode = ?execution_mode, "Dispatching tools");

        if self.kind == AgentKind::React {
            return react::act(dispatcher, failures, iteration, rationale, calls).await;
        }

        let results = dispatcher.invoke_many(&calls).await;
        TranscriptEntry::Acted {
            iteration,
            rationale,
            execution_mode,
            calls,
            results,
            repeated_failure: false,
        }
    }

    fn memory_context(&self) -> Option<String> {
        let context = self.memory.as_ref()?.context();
        (!context.is_empty()).then_some(context)
    }

    fn base_prompt(&self, query: &str) -> BasePrompt {
        let introduction = self.config.introduction.as_deref();
        let memory = self.memory_context();
        match self.kind {
            AgentKind::ToolCalling => {
                tool_calling::base_prompt(introduction, &self.registry, query, memory)
            }
            AgentKind::React => react::base_prompt(introduction, &self.registry, query, memory),
            AgentKind::Reasoning => reasoning::base_prompt(introduction, query, memory),
            AgentKind::MultiTool => {
                multi_tool::base_prompt(introduction, &self.registry, query, memory)
            }
        }
    }

    fn render_prompt(&self, base: &BasePrompt, transcript: &Transcript) -> String {
        let middle = match self.kind {
            AgentKind::ToolCalling => {
                tool_calling::render_history(transcript, self.config.tool_history_limit)
            }
            AgentKind::React => react::render_scratchpad(transcript),
            AgentKind::Reasoning => reasoning::render_scratchpad(transcript),
            AgentKind::MultiTool => multi_tool::render_history(transcript),
        };
        format!("{}{}{}", base.head, middle, base.tail)
    }

    fn finish(
        &self,
        status: LoopStatus,
        answer: String,
        iterations: usize,
        reasoning_steps: Vec<String>,
        transcript: Transcript,
        run_id: Uuid,
    ) -> LoopOutcome {
        tracing::info!(?status, iterations, answer = %log_preview(&answer), "Agent finished");
        LoopOutcome {
            answer,
            status,
            iterations,
            reasoning_steps,
            transcript: transcript.into_entries(),
            run_id,
        }
    }
}

fn parse_error_text(err: &AgentError) -> String {
    match err {
        AgentError::Parse(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Builder for [`Agent`]
pub struct AgentBuilder {
    kind: AgentKind,
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    pending: Vec<ToolSource>,
    memory: Option<Arc<dyn ConversationMemory>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            provider: None,
            tools: ToolRegistry::new(),
            pending: Vec::new(),
            memory: None,
            config: AgentConfig::for_kind(kind),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Add a tool, a `Vec` of tools or a toolkit (registered on `build()`)
    #[must_use]
    pub fn tool(mut self, source: impl Into<ToolSource>) -> Self {
        self.pending.push(source.into());
        self
    }

    /// Start from an existing registry (clones share tool statistics)
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn memory(mut self, memory: Arc<dyn ConversationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub fn introduction(mut self, introduction: impl Into<String>) -> Self {
        self.config.introduction = Some(introduction.into());
        self
    }

    #[must_use]
    pub fn llm_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.llm_timeout = timeout;
        self
    }

    #[must_use]
    pub fn parse_failure(mut self, policy: ParseFailurePolicy) -> Self {
        self.config.parse_failure = policy;
        self
    }

    #[must_use]
    pub fn show_reasoning(mut self, show: bool) -> Self {
        self.config.show_reasoning = show;
        self
    }

    #[must_use]
    pub fn tool_history_limit(mut self, limit: Option<usize>) -> Self {
        self.config.tool_history_limit = limit;
        self
    }

    #[must_use]
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.dispatch.max_workers = workers;
        self
    }

    #[must_use]
    pub fn tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.dispatch.call_timeout = timeout;
        self
    }

    /// Register pending tools. A missing provider or empty registry is
    /// reported by `invoke()`, not here.
    pub fn build(self) -> Result<Agent> {
        let mut tools = self.tools;
        for source in self.pending {
            tools.register(source)?;
        }

        Ok(Agent {
            kind: self.kind,
            provider: self.provider,
            registry: Arc::new(tools),
            memory: self.memory,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::{constant_tool, failing_tool, ScriptedProvider, SlowProvider};
    use super::*;
    use crate::memory::BufferMemory;

    fn react_reply(action: &str, input: &str, answer: &str) -> String {
        format!(
            "```json\n{{\"Thought\": \"thinking\", \"Action\": \"{action}\", \"Action Input\": {input}, \"Final Answer\": \"{answer}\"}}\n```"
        )
    }

    #[tokio::test]
    async fn test_missing_provider_is_config_error() {
        let agent = Agent::builder(AgentKind::React)
            .tool(constant_tool("a", "A"))
            .build()
            .unwrap();

        let err = agent.invoke("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Config(ref msg) if msg.contains("LLM not set")));
    }

    #[tokio::test]
    async fn test_empty_registry_is_config_error_for_tool_variants() {
        for kind in [AgentKind::ToolCalling, AgentKind::React, AgentKind::MultiTool] {
            let provider = Arc::new(ScriptedProvider::repeating("unused"));
            let agent = Agent::builder(kind).provider(provider.clone()).build().unwrap();

            let err = agent.invoke("hi").await.unwrap_err();
            assert!(err.is_config(), "{kind}");
            assert_eq!(provider.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_reasoning_needs_no_tools() {
        let provider = Arc::new(ScriptedProvider::new([
            "```json\n{\"Reasoning Steps\": [\"2 + 2 = 4\"], \"Final Answer\": \"4\"}\n```",
        ]));
        let agent = Agent::builder(AgentKind::Reasoning)
            .provider(provider)
            .show_reasoning(false)
            .build()
            .unwrap();

        assert_eq!(agent.invoke("2+2?").await.unwrap(), "4");
    }

    #[tokio::test]
    async fn test_exhaustion_after_exactly_k_iterations() {
        let thinking = [
            (AgentKind::ToolCalling, "```json\n{\"Tool call\": \"a\", \"Tool Parameters\": null, \"Final Response\": null}\n```"),
            (AgentKind::React, "```json\n{\"Thought\": \"hmm\", \"Action\": \"None\", \"Action Input\": \"None\", \"Final Answer\": \"None\"}\n```"),
            (AgentKind::Reasoning, "```json\n{\"Reasoning Steps\": [\"step\"], \"Final Answer\": \"None\"}\n```"),
            (AgentKind::MultiTool, "{\"thought\": \"hmm\", \"actions\": [], \"final_answer\": null, \"finish\": false}"),
        ];

        for (kind, reply) in thinking {
            let provider = Arc::new(ScriptedProvider::repeating(reply));
            let agent = Agent::builder(kind)
                .provider(provider.clone())
                .tool(constant_tool("a", "A"))
                .max_iterations(3)
                .build()
                .unwrap();

            let outcome = agent.invoke_detailed("go").await.unwrap();
            assert_eq!(outcome.status, LoopStatus::Exhausted, "{kind}");
            assert_eq!(outcome.answer, kind.exhaustion_message(3));
            assert_eq!(outcome.iterations, 3);
            assert_eq!(provider.call_count(), 3, "{kind}");
        }
    }

    #[tokio::test]
    async fn test_final_answer_is_unescaped() {
        let provider = Arc::new(ScriptedProvider::new([react_reply(
            "None",
            "\"None\"",
            "first\\\\nsecond",
        )]));
        let agent = Agent::builder(AgentKind::React)
            .provider(provider)
            .tool(constant_tool("a", "A"))
            .build()
            .unwrap();

        assert_eq!(agent.invoke("q").await.unwrap(), "first\nsecond");
    }

    #[tokio::test]
    async fn test_react_suppresses_fourth_identical_failure() {
        let (tool, calls) = failing_tool("flaky");
        let failing = react_reply("flaky", "{\"x\": 1}", "None");
        let provider = Arc::new(ScriptedProvider::new([
            failing.clone(),
            failing.clone(),
            failing.clone(),
            failing,
            react_reply("None", "\"None\"", "gave up"),
        ]));
        let agent = Agent::builder(AgentKind::React)
            .provider(provider)
            .tool(tool)
            .build()
            .unwrap();

        let outcome = agent.invoke_detailed("q").await.unwrap();
        assert_eq!(outcome.answer, "gave up");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);

        let TranscriptEntry::Acted {
            results,
            repeated_failure,
            ..
        } = &outcome.transcript[3]
        else {
            panic!("expected an action entry");
        };
        assert!(*repeated_failure);
        assert_eq!(
            results[0].observation(),
            "Error: This exact tool call has failed 3 times. Please try a different approach or different parameters."
        );
    }

    #[tokio::test]
    async fn test_react_parse_error_is_fed_back() {
        let provider = Arc::new(ScriptedProvider::new([
            "I will not use JSON".to_string(),
            react_reply("None", "\"None\"", "ok"),
        ]));
        let agent = Agent::builder(AgentKind::React)
            .provider(provider.clone())
            .tool(constant_tool("a", "A"))
            .build()
            .unwrap();

        let outcome = agent.invoke_detailed("q").await.unwrap();
        assert_eq!(outcome.answer, "ok");
        assert_eq!(outcome.iterations, 2);

        let second_prompt = &provider.prompts()[1];
        assert!(second_prompt.contains("--- Error ---"));
        assert!(second_prompt.contains("Response parsing failed."));
    }

    #[tokio::test]
    async fn test_reasoning_aborts_on_parse_error() {
        let provider = Arc::new(ScriptedProvider::repeating("no json here"));
        let agent = Agent::builder(AgentKind::Reasoning)
            .provider(provider.clone())
            .build()
            .unwrap();

        let outcome = agent.invoke_detailed("q").await.unwrap();
        assert_eq!(outcome.status, LoopStatus::Aborted);
        assert!(outcome.answer.starts_with("Error parsing response: "));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_multi_tool_synthesizes_from_raw_text() {
        let provider = Arc::new(ScriptedProvider::repeating("The answer is plainly 42."));
        let agent = Agent::builder(AgentKind::MultiTool)
            .provider(provider)
            .tool(constant_tool("a", "A"))
            .build()
            .unwrap();

        let outcome = agent.invoke_detailed("q").await.unwrap();
        assert_eq!(outcome.status, LoopStatus::Completed);
        assert_eq!(outcome.answer, "The answer is plainly 42.");
    }

    #[tokio::test]
    async fn test_multi_tool_parallel_round_reaches_prompt() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"thought": "both", "execution_mode": "parallel", "actions": [{"tool": "a", "parameters": {}}, {"tool": "b", "parameters": {}}], "final_answer": null, "finish": false}"#,
            r#"{"thought": "done", "actions": [], "final_answer": "A and B", "finish": true}"#,
        ]));
        let agent = Agent::builder(AgentKind::MultiTool)
            .provider(provider.clone())
            .tool(vec![constant_tool("a", "A-done"), constant_tool("b", "B-done")])
            .build()
            .unwrap();

        let outcome = agent.invoke_detailed("q").await.unwrap();
        assert_eq!(outcome.answer, "A and B");

        let second_prompt = &provider.prompts()[1];
        assert!(second_prompt.contains("Round 1:\nThought: both\nMode: parallel"));
        assert!(second_prompt.contains("\"A-done\""));
        assert!(second_prompt.contains("\"B-done\""));
    }

    #[tokio::test]
    async fn test_tool_calling_history_and_memory() {
        let memory = Arc::new(BufferMemory::new());
        let provider = Arc::new(ScriptedProvider::new([
            "```json\n{\"Tool call\": \"clock\", \"Tool Parameters\": null, \"Final Response\": null}\n```",
            "```json\n{\"Tool call\": null, \"Tool Parameters\": null, \"Final Response\": \"It is noon\"}\n```",
        ]));
        let agent = Agent::builder(AgentKind::ToolCalling)
            .provider(provider.clone())
            .tool(constant_tool("clock", "noon"))
            .memory(memory.clone())
            .build()
            .unwrap();

        assert_eq!(agent.invoke("time?").await.unwrap(), "It is noon");

        let second_prompt = &provider.prompts()[1];
        assert!(second_prompt.contains(
            "\n\n--- Tool Execution History ---\nPrevious Tool: clock\nResult: noon\n---"
        ));
        assert!(second_prompt.contains("\n\nConversation History:\nUser: time?"));
        assert_eq!(memory.context(), "User: time?\nAI: It is noon");
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_timeout_counts_as_iteration() {
        let provider = Arc::new(SlowProvider::new(Duration::from_secs(60)));
        let agent = Agent::builder(AgentKind::React)
            .provider(provider)
            .tool(constant_tool("a", "A"))
            .max_iterations(2)
            .llm_timeout(Some(Duration::from_secs(1)))
            .build()
            .unwrap();

        let outcome = agent.invoke_detailed("q").await.unwrap();
        assert_eq!(outcome.status, LoopStatus::Exhausted);
        assert_eq!(outcome.transcript.len(), 2);
        assert!(matches!(
            outcome.transcript[0],
            TranscriptEntry::LlmTimeout { iteration: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::failing("connection refused"));
        let agent = Agent::builder(AgentKind::React)
            .provider(provider)
            .tool(constant_tool("a", "A"))
            .build()
            .unwrap();

        let err = agent.invoke("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[test]
    fn test_agent_kind_round_trip() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.as_str().parse::<AgentKind>().unwrap(), kind);
        }
        assert!("planner".parse::<AgentKind>().is_err());
    }
}
