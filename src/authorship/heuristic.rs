//! Name-based AI detection for commits that have no authorship record.
//!
//! This only exists for history written before records were kept. It is
//! lower confidence than a record and can be turned off with the
//! `resolve.heuristic_fallback` feature flag.

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicClassifier {
    aliases: Vec<String>,
    cutover: NaiveDate,
    older_model: String,
    newer_model: String,
}

/// Result of a heuristic match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicMatch {
    pub alias: String,
    pub model: String,
}

impl HeuristicClassifier {
    pub fn new(aliases: &[String], cutover: NaiveDate, older_model: &str, newer_model: &str) -> Self {
        HeuristicClassifier {
            aliases: aliases.iter().map(|a| a.to_lowercase()).collect(),
            cutover,
            older_model: older_model.to_string(),
            newer_model: newer_model.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ai_aliases(),
            config.model_cutover(),
            config.older_model(),
            config.newer_model(),
        )
    }

    /// Classify a blame author. `None` means the author looks human.
    pub fn classify_author(&self, author: &str, authored_at: DateTime<Utc>) -> Option<HeuristicMatch> {
        let lowered = author.to_lowercase();
        let alias = self
            .aliases
            .iter()
            .find(|alias| !alias.is_empty() && lowered.contains(alias.as_str()))?;

        Some(HeuristicMatch {
            alias: alias.clone(),
            model: self.guess_model(authored_at).to_string(),
        })
    }

    /// Commits on the cutover day still get the older model; only later
    /// calendar days (UTC) get the newer one.
    pub fn guess_model(&self, authored_at: DateTime<Utc>) -> &str {
        if authored_at.date_naive() > self.cutover {
            &self.newer_model
        } else {
            &self.older_model
        }
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
