//! Loads configuration from the XDG `config.toml` and a project `.env`, then applies it to
//! the process environment with priority: **existing env > .env > XDG `[env]` > XDG `[run]`**.
//!
//! The library crate reads everything back through `skein::RunSettings::from_env`, so this
//! crate only has to put values into the environment.

mod dotenv_file;
mod xdg_toml;

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

pub use xdg_toml::{config_path, RunFileConfig};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("config path: {0}")]
    ConfigPath(String),
    #[error("read config: {0}")]
    ConfigRead(std::io::Error),
    #[error("parse config toml: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(#[from] dotenv::Error),
}

/// Loads `.env` and `$XDG_CONFIG_HOME/<app_name>/config.toml` and sets every key that is
/// **not** already set in the process environment.
///
/// * `app_name`: e.g. `"skein"`, giving `~/.config/skein/config.toml`.
/// * `override_dir`: directory holding `.env`; defaults to the current directory.
///
/// Returns the names of the variables that were set.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<Vec<String>, LoadError> {
    let file = xdg_toml::load(app_name)?;
    let dotenv_map = dotenv_file::load_env_map(override_dir)?;

    let mut merged: HashMap<String, String> = file.run.to_env_map();
    merged.extend(file.env);
    merged.extend(dotenv_map);

    let mut applied = Vec::new();
    for (key, value) in merged {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(&key, value);
        applied.push(key);
    }
    applied.sort();
    Ok(applied)
}

/// Reads only the typed `[run]` section.
pub fn load_run_config(app_name: &str) -> Result<RunFileConfig, LoadError> {
    Ok(xdg_toml::load(app_name)?.run)
}
