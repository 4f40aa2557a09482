//! CLI error type: everything a subcommand can fail with.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Agent(#[from] skein::AgentError),

    #[error("invalid agent graph: {0}")]
    Graph(#[from] skein::CompilationError),

    #[error("config: {0}")]
    Config(#[from] skein_config::LoadError),

    #[error("tool listing failed: {0}")]
    Tools(#[from] skein::ToolSourceError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not set; add it to the environment, .env or ~/.config/skein/config.toml")]
    MissingKey(&'static str),

    #[error("invalid {flag}: {reason}")]
    InvalidArg { flag: &'static str, reason: String },
}
