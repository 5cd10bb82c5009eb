//! Conversation Memory
//!
//! Optional collaborator that carries dialogue across `invoke()` calls. The
//! loop records the user query before prompting and the final answer when it
//! finishes; `context()` is rendered into the prompt.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "AI"),
        }
    }
}

/// A single remembered message
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> usize {
        // ~4 characters per token, +4 for role overhead
        self.content.len() / 4 + 4
    }
}

/// Conversation memory shared by reference with an agent
pub trait ConversationMemory: Send + Sync {
    fn add_user_message(&self, content: &str);

    fn add_ai_message(&self, content: &str);

    /// Rendered history for the prompt; empty when there is nothing to show
    fn context(&self) -> String;

    fn history(&self) -> Vec<Message>;

    fn clear(&self);
}

fn render(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn lock(messages: &Mutex<Vec<Message>>) -> MutexGuard<'_, Vec<Message>> {
    messages
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Keeps every message, optionally trimmed to an estimated token budget
#[derive(Debug, Default)]
pub struct BufferMemory {
    messages: Mutex<Vec<Message>>,
    max_tokens: Option<usize>,
}

impl BufferMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the oldest messages once the estimate exceeds `max_tokens`
    pub fn with_token_limit(max_tokens: usize) -> Self {
        Self {
            messages: Mutex::default(),
            max_tokens: Some(max_tokens),
        }
    }

    fn push(&self, message: Message) {
        let mut messages = lock(&self.messages);
        messages.push(message);

        let Some(limit) = self.max_tokens else {
            return;
        };
        // Always keep the newest message
        while messages.len() > 1
            && messages.iter().map(Message::estimate_tokens).sum::<usize>() > limit
        {
            messages.remove(0);
        }
    }
}

impl ConversationMemory for BufferMemory {
    fn add_user_message(&self, content: &str) {
        self.push(Message::user(content));
    }

    fn add_ai_message(&self, content: &str) {
        self.push(Message::assistant(content));
    }

    fn context(&self) -> String {
        render(&lock(&self.messages))
    }

    fn history(&self) -> Vec<Message> {
        lock(&self.messages).clone()
    }

    fn clear(&self) {
        lock(&self.messages).clear();
    }
}

/// Keeps only the last `window` messages
#[derive(Debug)]
pub struct WindowMemory {
    messages: Mutex<Vec<Message>>,
    window: usize,
}

impl WindowMemory {
    pub fn new(window: usize) -> Self {
        Self {
            messages: Mutex::default(),
            window,
        }
    }

    fn push(&self, message: Message) {
        let mut messages = lock(&self.messages);
        messages.push(message);
        let excess = messages.len().saturating_sub(self.window);
        messages.drain(..excess);
    }
}

impl ConversationMemory for WindowMemory {
    fn add_user_message(&self, content: &str) {
        self.push(Message::user(content));
    }

    fn add_ai_message(&self, content: &str) {
        self.push(Message::assistant(content));
    }

    fn context(&self) -> String {
        render(&lock(&self.messages))
    }

    fn history(&self) -> Vec<Message> {
        lock(&self.messages).clone()
    }

    fn clear(&self) {
        lock(&self.messages).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_memory_context() {
        let memory = BufferMemory::new();
        assert_eq!(memory.context(), "");

        memory.add_user_message("Hi");
        memory.add_ai_message("Hello!");
        assert_eq!(memory.context(), "User: Hi\nAI: Hello!");
        assert_eq!(memory.history()[1].role, Role::Assistant);

        memory.clear();
        assert!(memory.history().is_empty());
    }

    #[test]
    fn test_buffer_memory_token_limit_keeps_recent() {
        // Each 8-char message estimates to 6 tokens
        let memory = BufferMemory::with_token_limit(12);
        memory.add_user_message("aaaaaaaa");
        memory.add_ai_message("bbbbbbbb");
        memory.add_user_message("cccccccc");

        let history = memory.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "bbbbbbbb");
    }

    #[test]
    fn test_window_memory() {
        let memory = WindowMemory::new(2);
        memory.add_user_message("one");
        memory.add_ai_message("two");
        memory.add_user_message("three");

        assert_eq!(memory.context(), "AI: two\nUser: three");
    }
}
