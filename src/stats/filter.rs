use glob::{MatchOptions, Pattern};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::error::AttributionError;
use crate::stats::events::{EventKind, TrackingEvent};
use crate::stats::summary::percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Glob,
    Regex,
}

/// Branch selector for reports. An empty pattern selects every branch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BranchFilter {
    pub pattern: String,
    pub mode: MatchMode,
    pub case_insensitive: bool,
}

enum Matcher {
    All,
    Exact(String),
    Glob(Pattern),
    Regex(Regex),
}

/// A `BranchFilter` whose pattern has been checked and compiled
pub struct CompiledBranchFilter {
    matcher: Matcher,
    case_insensitive: bool,
}

impl BranchFilter {
    pub fn new(pattern: &str, mode: MatchMode) -> Self {
        BranchFilter {
            pattern: pattern.to_string(),
            mode,
            case_insensitive: false,
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Compile the pattern. A malformed glob or regex fails here, before any
    /// branch is matched.
    pub fn validate(&self) -> Result<CompiledBranchFilter, AttributionError> {
        let invalid = |reason: String| AttributionError::InvalidFilterPattern {
            pattern: self.pattern.clone(),
            reason,
        };

        let matcher = if self.pattern.is_empty() {
            Matcher::All
        } else {
            match self.mode {
                MatchMode::Exact => Matcher::Exact(self.pattern.clone()),
                MatchMode::Glob => {
                    Matcher::Glob(Pattern::new(&self.pattern).map_err(|e| invalid(e.to_string()))?)
                }
                MatchMode::Regex => Matcher::Regex(
                    RegexBuilder::new(&self.pattern)
                        .case_insensitive(self.case_insensitive)
                        .build()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
            }
        };

        Ok(CompiledBranchFilter {
            matcher,
            case_insensitive: self.case_insensitive,
        })
    }
}

impl CompiledBranchFilter {
    /// Regex patterns are unanchored; exact and glob patterns match the
    /// whole branch name.
    pub fn matches(&self, branch: &str) -> bool {
        match &self.matcher {
            Matcher::All => true,
            Matcher::Exact(expected) => {
                if self.case_insensitive {
                    expected.to_lowercase() == branch.to_lowercase()
                } else {
                    expected == branch
                }
            }
            Matcher::Glob(pattern) => pattern.matches_with(
                branch,
                MatchOptions {
                    case_sensitive: !self.case_insensitive,
                    require_literal_separator: false,
                    require_literal_leading_dot: false,
                },
            ),
            Matcher::Regex(regex) => regex.is_match(branch),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchStats {
    pub branch: String,
    pub ai_events: usize,
    pub human_events: usize,
    pub lines_added: u64,
    pub lines_modified: u64,
    pub lines_deleted: u64,
    pub ai_percentage: f64,
    pub contributors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchReport {
    pub total_events: usize,
    /// Sorted by branch name
    pub branches: Vec<BranchStats>,
}

impl BranchReport {
    pub fn branch(&self, name: &str) -> Option<&BranchStats> {
        self.branches.iter().find(|b| b.branch == name)
    }
}

/// Group events on matching branches. Events without a branch count
/// towards the default branch.
pub fn branch_report(
    events: &[TrackingEvent],
    filter: &BranchFilter,
) -> Result<BranchReport, AttributionError> {
    let compiled = filter.validate()?;

    let mut by_branch: BTreeMap<&str, (BranchStats, u64, u64, HashSet<&str>)> = BTreeMap::new();
    let mut total_events = 0;

    for event in events {
        let branch = event.branch_or_default();
        if !compiled.matches(branch) {
            continue;
        }
        total_events += 1;

        let (stats, ai_lines, human_lines, authors) =
            by_branch.entry(branch).or_insert_with(|| {
                (
                    BranchStats {
                        branch: branch.to_string(),
                        ai_events: 0,
                        human_events: 0,
                        lines_added: 0,
                        lines_modified: 0,
                        lines_deleted: 0,
                        ai_percentage: 0.0,
                        contributors: 0,
                    },
                    0,
                    0,
                    HashSet::new(),
                )
            });

        let touched = event.lines_added() + event.lines_modified();
        match event.kind {
            EventKind::Ai => {
                stats.ai_events += 1;
                *ai_lines += touched;
            }
            EventKind::Human => {
                stats.human_events += 1;
                *human_lines += touched;
            }
        }
        stats.lines_added += event.lines_added();
        stats.lines_modified += event.lines_modified();
        stats.lines_deleted += event.lines_deleted();
        authors.insert(event.author.as_str());
    }

    let branches = by_branch
        .into_values()
        .map(|(mut stats, ai_lines, human_lines, authors)| {
            stats.ai_percentage = percentage(ai_lines, ai_lines + human_lines);
            stats.contributors = authors.len();
            stats
        })
        .collect();

    Ok(BranchReport {
        total_events,
        branches,
    })
}
