//! # agent-core
//!
//! Agent control loops, tool registry and tool dispatch, independent of any
//! particular LLM backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Agent                              │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  AgentLoop  │──│ResponseParser│  │    LlmProvider      │  │
//! │  │ (4 variants)│  └──────────────┘  │    (Strategy)       │  │
//! │  └──────┬──────┘                    └─────────────────────┘  │
//! │         │        ┌──────────────┐   ┌─────────────────────┐  │
//! │         └────────│ToolDispatcher│───│    ToolRegistry     │  │
//! │                  └──────────────┘   └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each loop variant (tool-calling, ReAct, reasoning-only, multi-tool)
//! renders a prompt, asks the provider, parses the reply into a
//! [`DecisionRecord`], dispatches any tool calls and feeds the results back
//! until a final answer or the iteration cap.

pub mod agent;
pub mod dispatch;
pub mod error;
pub mod memory;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentConfig, AgentKind, LoopOutcome, LoopStatus, ParseFailurePolicy,
    ReasoningBundle, ReasoningOutcome, Transcript, TranscriptEntry,
};
pub use dispatch::{
    DispatchConfig, ExecutionResult, ExecutionStatus, FailureKind, ToolCall, ToolDispatcher,
};
pub use error::{AgentError, Result};
pub use memory::{BufferMemory, ConversationMemory, Message, Role, WindowMemory};
pub use parser::{DecisionRecord, ExecutionMode, Intent, ResponseFormat, ResponseParser};
pub use provider::{GenerationOptions, LlmProvider};
pub use registry::{SchemaStyle, ToolRegistry, ToolSource, ToolStatsSnapshot, Toolkit};
pub use tool::{FunctionTool, ParameterSchema, Tool, ToolArgs, ToolError, ToolSchema};
