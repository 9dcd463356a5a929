use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use crate::fold::SessionDefaults;
use crate::replay::{DEFAULT_ID_PREFIX, ReplayOptions};

/// Project config, read from `.waymark/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl ProjectConfig {
    /// Defaults for sessions created by live folding.
    #[must_use]
    pub const fn live_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            is_expanded: self.sessions.live_expanded,
        }
    }

    /// Options for replaying persisted history.
    #[must_use]
    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            id_prefix: self.history.id_prefix.clone(),
            is_expanded: self.sessions.history_expanded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Shown in place of the user query when no request was recorded.
    #[serde(default = "default_placeholder_query")]
    pub placeholder_query: String,
    #[serde(default = "default_true")]
    pub live_expanded: bool,
    #[serde(default)]
    pub history_expanded: bool,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            placeholder_query: default_placeholder_query(),
            live_expanded: default_true(),
            history_expanded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".waymark/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    read_toml(&path)
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("waymark/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }
    read_toml(&path)
}

/// Merge project config, user config and environment.
///
/// `cli_format` is the output mode given on the command line, if any.
pub fn resolve_config(project_root: &Path, cli_format: Option<&str>) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_format, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Normalize an output mode name, accepting legacy aliases.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// Output precedence: CLI flag, then `FORMAT`, then user config, then TTY.
fn resolve_output(
    cli_format: Option<&str>,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    [cli_format, env_format, user_output]
        .into_iter()
        .flatten()
        .find_map(normalize_output_mode)
        .map_or_else(
            || {
                if std::io::stdout().is_terminal() {
                    "pretty".to_string()
                } else {
                    "text".to_string()
                }
            },
            ToString::to_string,
        )
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<T>(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_true() -> bool {
    true
}

fn default_placeholder_query() -> String {
    "(no request recorded)".to_string()
}

fn default_id_prefix() -> String {
    DEFAULT_ID_PREFIX.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_project_config(root: &Path, content: &str) {
        let dir = root.join(".waymark");
        std::fs::create_dir_all(&dir).expect("create .waymark");
        std::fs::write(dir.join("config.toml"), content).expect("write config");
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.sessions.placeholder_query, "(no request recorded)");
        assert!(cfg.sessions.live_expanded);
        assert!(!cfg.sessions.history_expanded);
        assert_eq!(cfg.history.id_prefix, "history");
        assert_eq!(cfg.replay_options(), ReplayOptions::default());
        assert!(cfg.live_defaults().is_expanded);
    }

    #[test]
    fn partial_project_config_keeps_other_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        write_project_config(
            root.path(),
            r#"
[sessions]
history_expanded = true

[history]
id_prefix = "past"
"#,
        );
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert!(cfg.sessions.history_expanded);
        assert!(cfg.sessions.live_expanded);
        let options = cfg.replay_options();
        assert_eq!(options.id_prefix, "past");
        assert!(options.is_expanded);
    }

    #[test]
    fn invalid_project_config_names_the_file() {
        let root = tempfile::tempdir().expect("tempdir");
        write_project_config(root.path(), "[sessions\nlive_expanded = yes");
        let err = load_project_config(root.path()).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse"));
        assert!(format!("{err}").contains("config.toml"));
    }

    #[test]
    fn cli_flag_overrides_env_and_config() {
        let output = resolve_output(Some("json"), Some("pretty"), Some("text"));
        assert_eq!(output, "json");
    }

    #[test]
    fn env_overrides_user_config() {
        assert_eq!(resolve_output(None, Some("json"), Some("text")), "text");
        assert_eq!(resolve_output(None, Some("json"), Some("bogus")), "json");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        assert_eq!(resolve_output(None, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(None, Some("human"), Some("table")), "text");
        assert_eq!(normalize_output_mode(" JSON "), Some("json"));
        assert_eq!(normalize_output_mode("yaml"), None);
    }

    #[test]
    fn user_config_parses_output() {
        let cfg: UserConfig = toml::from_str("output = \"json\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        let empty: UserConfig = toml::from_str("").expect("parse");
        assert!(empty.output.is_none());
    }
}
