//! Reads `$XDG_CONFIG_HOME/<app>/config.toml`: the `[env]` table and the `[run]` table.
//!
//! ```toml
//! [env]
//! OPENAI_API_KEY = "sk-..."
//!
//! [run]
//! model = "gpt-4o"
//! max_iterations = 8
//! recursion_limit = 40
//! call_timeout_secs = 60
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::LoadError;

/// Typed `[run]` section. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFileConfig {
    pub model: Option<String>,
    pub max_iterations: Option<usize>,
    pub recursion_limit: Option<usize>,
    pub call_timeout_secs: Option<u64>,
}

impl RunFileConfig {
    /// The section as the environment variables the library reads.
    pub fn to_env_map(&self) -> HashMap<String, String> {
        let mut out = HashMap::new();
        if let Some(model) = &self.model {
            out.insert("OPENAI_MODEL".to_string(), model.clone());
        }
        if let Some(n) = self.max_iterations {
            out.insert("SKEIN_MAX_ITERATIONS".to_string(), n.to_string());
        }
        if let Some(n) = self.recursion_limit {
            out.insert("SKEIN_RECURSION_LIMIT".to_string(), n.to_string());
        }
        if let Some(n) = self.call_timeout_secs {
            out.insert("SKEIN_CALL_TIMEOUT_SECS".to_string(), n.to_string());
        }
        out
    }
}

#[derive(Deserialize, Default)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub run: RunFileConfig,
}

/// `$XDG_CONFIG_HOME`, else `~/.config`.
fn config_home() -> Result<PathBuf, LoadError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .ok_or_else(|| LoadError::ConfigPath("cannot determine home directory".to_string()))
}

pub fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    Ok(config_home()?.join(app_name).join("config.toml"))
}

/// Missing file yields an empty config.
pub(crate) fn load(app_name: &str) -> Result<ConfigFile, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(ConfigFile::default());
    }
    let content = std::fs::read_to_string(&path).map_err(LoadError::ConfigRead)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_and_run_tables() {
        let file: ConfigFile = toml::from_str(
            r#"
[env]
TAVILY_API_KEY = "tvly-x"

[run]
model = "gpt-4o"
max_iterations = 8
"#,
        )
        .unwrap();
        assert_eq!(file.env.get("TAVILY_API_KEY").map(String::as_str), Some("tvly-x"));
        assert_eq!(file.run.model.as_deref(), Some("gpt-4o"));
        assert_eq!(file.run.max_iterations, Some(8));
        assert_eq!(file.run.recursion_limit, None);
    }

    #[test]
    fn run_table_maps_to_env_names() {
        let run = RunFileConfig {
            model: Some("gpt-4o".into()),
            call_timeout_secs: Some(30),
            ..RunFileConfig::default()
        };
        let env = run.to_env_map();
        assert_eq!(env.get("OPENAI_MODEL").map(String::as_str), Some("gpt-4o"));
        assert_eq!(env.get("SKEIN_CALL_TIMEOUT_SECS").map(String::as_str), Some("30"));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn unknown_run_key_is_rejected() {
        let parsed: Result<ConfigFile, _> = toml::from_str("[run]\nmodle = \"typo\"\n");
        assert!(parsed.is_err());
    }
}
