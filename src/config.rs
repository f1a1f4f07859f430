use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::feature_flags::{FeatureFlags, FileFeatureFlags};
use crate::utils::debug_log;

/// Notes namespace reserved for authorship records (`refs/notes/ai-authorship`)
pub const DEFAULT_NOTES_REF: &str = "ai-authorship";

/// Branch label assumed for tracking events written before branches were recorded
pub const DEFAULT_BRANCH: &str = "main";

pub const DEFAULT_OLDER_MODEL: &str = "claude-3-opus";
pub const DEFAULT_NEWER_MODEL: &str = "claude-3-5-sonnet";

/// Author name fragments that identify an AI tool in commit metadata
pub const DEFAULT_AI_ALIASES: &[&str] = &[
    "claude",
    "anthropic",
    "copilot",
    "cursor",
    "chatgpt",
    "openai",
    "codex",
    "gemini",
];

/// Configuration for the attribution engine.
///
/// Built once by the caller and passed to constructors; nothing in the crate
/// reads configuration from process-wide state.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    git_path: String,
    notes_ref: String,
    ai_aliases: Vec<String>,
    model_cutover: NaiveDate,
    older_model: String,
    newer_model: String,
    default_branch: String,
    feature_flags: FeatureFlags,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    git_path: Option<String>,
    #[serde(default)]
    notes_ref: Option<String>,
    #[serde(default)]
    ai_aliases: Option<Vec<String>>,
    #[serde(default)]
    model_cutover: Option<String>,
    #[serde(default)]
    older_model: Option<String>,
    #[serde(default)]
    newer_model: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    feature_flags: Option<serde_json::Value>,
}

/// Environment overrides, read with the `GIT_AUTHORSHIP_` prefix
#[derive(Deserialize, Default, Debug)]
struct EnvConfig {
    git_path: Option<String>,
    notes_ref: Option<String>,
    default_branch: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            git_path: "git".to_string(),
            notes_ref: DEFAULT_NOTES_REF.to_string(),
            ai_aliases: DEFAULT_AI_ALIASES.iter().map(|s| s.to_string()).collect(),
            model_cutover: default_model_cutover(),
            older_model: DEFAULT_OLDER_MODEL.to_string(),
            newer_model: DEFAULT_NEWER_MODEL.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            feature_flags: FeatureFlags::default(),
        }
    }
}

fn default_model_cutover() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default()
}

impl Config {
    /// Build configuration from defaults, the user config file and the environment.
    pub fn load() -> Config {
        let file_cfg = config_file_path().and_then(|p| load_file_config(&p));
        let env_cfg = load_env_config();
        build_config(file_cfg, env_cfg)
    }

    /// Build configuration from an explicit config file, ignoring the environment.
    pub fn load_from_file(path: &Path) -> Config {
        build_config(load_file_config(path), EnvConfig::default())
    }

    /// Returns the command to invoke git.
    pub fn git_cmd(&self) -> &str {
        &self.git_path
    }

    pub fn notes_ref(&self) -> &str {
        &self.notes_ref
    }

    pub fn ai_aliases(&self) -> &[String] {
        &self.ai_aliases
    }

    pub fn model_cutover(&self) -> NaiveDate {
        self.model_cutover
    }

    pub fn older_model(&self) -> &str {
        &self.older_model
    }

    pub fn newer_model(&self) -> &str {
        &self.newer_model
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    pub fn feature_flags(&self) -> &FeatureFlags {
        &self.feature_flags
    }

    pub fn with_notes_ref(mut self, notes_ref: &str) -> Self {
        self.notes_ref = notes_ref.to_string();
        self
    }

    pub fn with_git_path(mut self, git_path: &str) -> Self {
        self.git_path = git_path.to_string();
        self
    }

    pub fn with_feature_flags(mut self, flags: FeatureFlags) -> Self {
        self.feature_flags = flags;
        self
    }
}

fn build_config(file_cfg: Option<FileConfig>, env_cfg: EnvConfig) -> Config {
    let defaults = Config::default();
    let file_cfg = file_cfg.unwrap_or_default();

    let git_path = env_cfg
        .git_path
        .or(file_cfg.git_path)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or(defaults.git_path);

    let notes_ref = env_cfg
        .notes_ref
        .or(file_cfg.notes_ref)
        .map(|r| normalize_notes_ref(&r))
        .filter(|r| !r.is_empty())
        .unwrap_or(defaults.notes_ref);

    let ai_aliases = file_cfg
        .ai_aliases
        .map(|aliases| {
            aliases
                .into_iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|aliases| !aliases.is_empty())
        .unwrap_or(defaults.ai_aliases);

    let model_cutover = file_cfg
        .model_cutover
        .and_then(|raw| match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                debug_log(&format!("Ignoring invalid model_cutover '{}': {}", raw, e));
                None
            }
        })
        .unwrap_or(defaults.model_cutover);

    let default_branch = env_cfg
        .default_branch
        .or(file_cfg.default_branch)
        .filter(|b| !b.trim().is_empty())
        .unwrap_or(defaults.default_branch);

    let file_flags = file_cfg
        .feature_flags
        .and_then(|value| serde_json::from_value::<FileFeatureFlags>(value).ok());

    Config {
        git_path,
        notes_ref,
        ai_aliases,
        model_cutover,
        older_model: file_cfg.older_model.unwrap_or(defaults.older_model),
        newer_model: file_cfg.newer_model.unwrap_or(defaults.newer_model),
        default_branch,
        feature_flags: FeatureFlags::from_file_config(file_flags),
    }
}

/// Accept both `ai-authorship` and `refs/notes/ai-authorship`
fn normalize_notes_ref(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("refs/notes/")
        .trim_matches('/')
        .to_string()
}

fn load_env_config() -> EnvConfig {
    match envy::prefixed("GIT_AUTHORSHIP_").from_env::<EnvConfig>() {
        Ok(cfg) => cfg,
        Err(e) => {
            debug_log(&format!("Ignoring environment config: {}", e));
            EnvConfig::default()
        }
    }
}

fn load_file_config(path: &Path) -> Option<FileConfig> {
    let data = fs::read(path).ok()?;
    match serde_json::from_slice::<FileConfig>(&data) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            debug_log(&format!(
                "Ignoring unreadable config {}: {}",
                path.display(),
                e
            ));
            None
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("GIT_AUTHORSHIP_CONFIG") {
        return Some(PathBuf::from(explicit));
    }
    let home = dirs::home_dir()?;
    Some(home.join(".git-authorship").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.git_cmd(), "git");
        assert_eq!(config.notes_ref(), "ai-authorship");
        assert_eq!(config.default_branch(), "main");
        assert_eq!(
            config.model_cutover(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(config.ai_aliases().iter().any(|a| a == "claude"));
    }

    #[test]
    fn test_file_config_overrides_defaults() {
        let file = write_config(
            r#"{
                "notes_ref": "refs/notes/provenance",
                "ai_aliases": ["  RoboCoder ", ""],
                "model_cutover": "2025-01-15",
                "newer_model": "robo-2",
                "feature_flags": {"resolve.heuristic_fallback": false},
                "some_future_field": 42
            }"#,
        );
        let config = Config::load_from_file(file.path());
        assert_eq!(config.notes_ref(), "provenance");
        assert_eq!(config.ai_aliases(), &["robocoder".to_string()]);
        assert_eq!(
            config.model_cutover(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert_eq!(config.newer_model(), "robo-2");
        assert_eq!(config.older_model(), DEFAULT_OLDER_MODEL);
        assert!(!config.feature_flags().heuristic_fallback);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let file = write_config("{not json");
        assert_eq!(Config::load_from_file(file.path()), Config::default());
    }

    #[test]
    fn test_invalid_cutover_is_ignored() {
        let file = write_config(r#"{"model_cutover": "June 1st"}"#);
        let config = Config::load_from_file(file.path());
        assert_eq!(config.model_cutover(), default_model_cutover());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config(r#"{"notes_ref": "from-file", "git_path": "/opt/git"}"#);
        unsafe {
            std::env::set_var("GIT_AUTHORSHIP_CONFIG", file.path());
            std::env::set_var("GIT_AUTHORSHIP_NOTES_REF", "from-env");
        }
        let config = Config::load();
        unsafe {
            std::env::remove_var("GIT_AUTHORSHIP_CONFIG");
            std::env::remove_var("GIT_AUTHORSHIP_NOTES_REF");
        }
        assert_eq!(config.notes_ref(), "from-env");
        assert_eq!(config.git_cmd(), "/opt/git");
    }

    #[test]
    fn test_normalize_notes_ref() {
        assert_eq!(normalize_notes_ref("refs/notes/ai-authorship"), "ai-authorship");
        assert_eq!(normalize_notes_ref(" custom "), "custom");
    }
}
