//! Run settings read from the environment.
//!
//! Callers typically load `.env` and the XDG config first (see the `skein-config` crate),
//! then call [`RunSettings::from_env`]. No variable is required.

use std::time::Duration;

use async_openai::config::OpenAIConfig;

use crate::llm::ChatOpenAI;

/// Default chat model when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Settings shared by the CLI and the workflows.
#[derive(Clone, Debug)]
pub struct RunSettings {
    /// OpenAI API key. When None, async-openai falls back to `OPENAI_API_KEY` itself.
    pub openai_api_key: Option<String>,
    /// OpenAI API base URL. When None, the default API base is used.
    pub openai_base_url: Option<String>,
    pub model: String,
    /// Tavily API key for the search tool.
    pub tavily_api_key: Option<String>,
    /// Tool loop iteration bound (`SKEIN_MAX_ITERATIONS`).
    pub max_iterations: Option<usize>,
    /// Graph superstep bound (`SKEIN_RECURSION_LIMIT`).
    pub recursion_limit: Option<usize>,
    /// Per-call timeout in seconds (`SKEIN_CALL_TIMEOUT_SECS`).
    pub call_timeout: Option<Duration>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: None,
            model: DEFAULT_MODEL.to_string(),
            tavily_api_key: None,
            max_iterations: None,
            recursion_limit: None,
            call_timeout: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl RunSettings {
    /// Reads: `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL` (default `gpt-4o-mini`),
    /// `TAVILY_API_KEY`, `SKEIN_MAX_ITERATIONS`, `SKEIN_RECURSION_LIMIT`,
    /// `SKEIN_CALL_TIMEOUT_SECS`. Unparseable numbers are ignored.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_base_url: std::env::var("OPENAI_BASE_URL").ok(),
            model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tavily_api_key: std::env::var("TAVILY_API_KEY").ok(),
            max_iterations: parse_var("SKEIN_MAX_ITERATIONS"),
            recursion_limit: parse_var("SKEIN_RECURSION_LIMIT"),
            call_timeout: parse_var::<u64>("SKEIN_CALL_TIMEOUT_SECS").map(Duration::from_secs),
        }
    }

    /// async-openai config carrying the key and base URL, when set.
    pub fn openai_config(&self) -> OpenAIConfig {
        let mut config = OpenAIConfig::new();
        if let Some(key) = &self.openai_api_key {
            config = config.with_api_key(key);
        }
        if let Some(base) = &self.openai_base_url {
            config = config.with_api_base(base);
        }
        config
    }
}

impl ChatOpenAI {
    /// Builds a client for `settings.model` with the configured key and base URL.
    pub fn from_settings(settings: &RunSettings) -> Self {
        ChatOpenAI::with_config(settings.openai_config(), settings.model.clone())
    }
}
