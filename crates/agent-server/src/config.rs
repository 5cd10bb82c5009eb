//! Server configuration from the environment.

use std::str::FromStr;
use std::time::Duration;

use agent_core::agent::DEFAULT_LLM_TIMEOUT;
use agent_core::dispatch::{DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_WORKERS};
use agent_core::DispatchConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// `BIND_ADDR`
    pub bind_addr: String,

    /// `AGENT_MAX_ITERATIONS`; unset keeps each agent's own default
    pub max_iterations: Option<usize>,

    /// `AGENT_MAX_WORKERS`
    pub max_workers: usize,

    /// `AGENT_TOOL_TIMEOUT_SECS`; `0` disables the limit
    pub tool_timeout: Option<Duration>,

    /// `AGENT_LLM_TIMEOUT_SECS`; `0` disables the limit
    pub llm_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            max_iterations: None,
            max_workers: DEFAULT_MAX_WORKERS,
            tool_timeout: Some(DEFAULT_CALL_TIMEOUT),
            llm_timeout: Some(DEFAULT_LLM_TIMEOUT),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout = |key: &str, default: Option<Duration>| match parse::<u64>(&lookup, key) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => default,
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_iterations: parse(&lookup, "AGENT_MAX_ITERATIONS").or(defaults.max_iterations),
            max_workers: parse(&lookup, "AGENT_MAX_WORKERS").unwrap_or(defaults.max_workers),
            tool_timeout: timeout("AGENT_TOOL_TIMEOUT_SECS", defaults.tool_timeout),
            llm_timeout: timeout("AGENT_LLM_TIMEOUT_SECS", defaults.llm_timeout),
        }
    }

    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            max_workers: self.max_workers,
            call_timeout: self.tool_timeout,
        }
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(ServerConfig::from_lookup(lookup(&[])), ServerConfig::default());
    }

    #[test]
    fn test_overrides_and_disabled_timeouts() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("AGENT_MAX_ITERATIONS", "4"),
            ("AGENT_MAX_WORKERS", "8"),
            ("AGENT_TOOL_TIMEOUT_SECS", "0"),
            ("AGENT_LLM_TIMEOUT_SECS", "30"),
        ]));

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.max_iterations, Some(4));
        assert_eq!(config.dispatch().max_workers, 8);
        assert_eq!(config.tool_timeout, None);
        assert_eq!(config.llm_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_garbage_falls_back() {
        let config = ServerConfig::from_lookup(lookup(&[("AGENT_MAX_WORKERS", "lots")]));
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
    }
}
