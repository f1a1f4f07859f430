use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::authorship::resolver::ResolvedLine;
use crate::stats::events::{EventKind, TrackingEvent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub total_lines: usize,
    pub ai_lines: usize,
    pub human_lines: usize,
    pub ai_percentage: f64,
    pub human_percentage: f64,
    pub top_model: Option<String>,
    pub top_human_author: Option<String>,
}

impl FileSummary {
    pub fn from_lines(path: &str, lines: &[ResolvedLine]) -> Self {
        let total_lines = lines.len();
        let ai_lines = lines.iter().filter(|l| l.is_ai).count();
        let human_lines = total_lines - ai_lines;

        let top_model = most_frequent(
            lines
                .iter()
                .filter(|l| l.is_ai)
                .filter_map(|l| l.model.as_deref()),
        );
        let top_human_author = most_frequent(
            lines
                .iter()
                .filter(|l| !l.is_ai)
                .map(|l| l.author.as_str()),
        );

        FileSummary {
            path: path.to_string(),
            total_lines,
            ai_lines,
            human_lines,
            ai_percentage: percentage(ai_lines as u64, total_lines as u64),
            human_percentage: percentage(human_lines as u64, total_lines as u64),
            top_model,
            top_human_author,
        }
    }
}

/// `part / whole` as a percentage, 0.0 when `whole` is zero
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Most frequent item; on a tie the one that reached the max count first in
/// iteration order wins.
pub(crate) fn most_frequent<'a>(items: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        let count = counts.entry(item).or_insert(0);
        if *count == 0 {
            order.push(item);
        }
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for item in order {
        let count = counts[item];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((item, count));
        }
    }
    best.map(|(item, _)| item.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorSummary {
    pub author: String,
    pub ai_events: usize,
    pub human_events: usize,
    pub lines_added: u64,
    pub lines_modified: u64,
    pub lines_deleted: u64,
    pub files_touched: usize,
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ContributorSummary {
    pub fn total_events(&self) -> usize {
        self.ai_events + self.human_events
    }

    pub fn total_lines(&self) -> u64 {
        self.lines_added + self.lines_modified + self.lines_deleted
    }
}

/// Per-author totals, sorted by total lines (descending) then author name
pub fn contributor_summaries(events: &[TrackingEvent]) -> Vec<ContributorSummary> {
    let mut by_author: HashMap<&str, (ContributorSummary, HashSet<&str>)> = HashMap::new();

    for event in events {
        let (summary, files) = by_author.entry(event.author.as_str()).or_insert_with(|| {
            (
                ContributorSummary {
                    author: event.author.clone(),
                    ai_events: 0,
                    human_events: 0,
                    lines_added: 0,
                    lines_modified: 0,
                    lines_deleted: 0,
                    files_touched: 0,
                    first_activity: event.timestamp,
                    last_activity: event.timestamp,
                },
                HashSet::new(),
            )
        });

        match event.kind {
            EventKind::Ai => summary.ai_events += 1,
            EventKind::Human => summary.human_events += 1,
        }
        summary.lines_added += event.lines_added();
        summary.lines_modified += event.lines_modified();
        summary.lines_deleted += event.lines_deleted();
        summary.first_activity = summary.first_activity.min(event.timestamp);
        summary.last_activity = summary.last_activity.max(event.timestamp);
        files.extend(event.files.iter().map(|f| f.path.as_str()));
    }

    let mut summaries: Vec<ContributorSummary> = by_author
        .into_values()
        .map(|(mut summary, files)| {
            summary.files_touched = files.len();
            summary
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.total_lines()
            .cmp(&a.total_lines())
            .then_with(|| a.author.cmp(&b.author))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorship::resolver::AttributionSource;
    use crate::stats::events::FileChange;
    use chrono::TimeZone;

    fn line(n: u32, author: &str, is_ai: bool, model: Option<&str>) -> ResolvedLine {
        ResolvedLine {
            line_number: n,
            author: author.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
            is_ai,
            model: model.map(|m| m.to_string()),
            commit_sha: "c".repeat(40),
            content: String::new(),
            source: if is_ai {
                AttributionSource::Record
            } else {
                AttributionSource::Blame
            },
        }
    }

    #[test]
    fn test_half_ai_half_human() {
        let lines = vec![
            line(1, "Alice", false, None),
            line(2, "Claude", true, Some("claude-3-5-sonnet")),
            line(3, "Alice", false, None),
            line(4, "Claude", true, Some("claude-3-5-sonnet")),
        ];
        let summary = FileSummary::from_lines("src/main.rs", &lines);
        assert_eq!(summary.total_lines, 4);
        assert_eq!(summary.ai_lines, 2);
        assert_eq!(summary.human_lines, 2);
        assert_eq!(summary.ai_percentage, 50.0);
        assert_eq!(summary.human_percentage, 50.0);
        assert_eq!(summary.top_model.as_deref(), Some("claude-3-5-sonnet"));
        assert_eq!(summary.top_human_author.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_empty_file_summary() {
        let summary = FileSummary::from_lines("empty.txt", &[]);
        assert_eq!(summary.total_lines, 0);
        assert_eq!(summary.ai_percentage, 0.0);
        assert_eq!(summary.human_percentage, 0.0);
        assert_eq!(summary.top_model, None);
        assert_eq!(summary.top_human_author, None);
    }

    #[test]
    fn test_ties_go_to_first_encountered() {
        let lines = vec![
            line(1, "Zed", false, None),
            line(2, "Amy", false, None),
            line(3, "Amy", false, None),
            line(4, "Zed", false, None),
            line(5, "x", true, Some("model-b")),
            line(6, "x", true, Some("model-a")),
        ];
        let summary = FileSummary::from_lines("f", &lines);
        assert_eq!(summary.top_human_author.as_deref(), Some("Zed"));
        assert_eq!(summary.top_model.as_deref(), Some("model-b"));
    }

    #[test]
    fn test_ai_lines_without_model() {
        let lines = vec![line(1, "Copilot", true, None)];
        let summary = FileSummary::from_lines("f", &lines);
        assert_eq!(summary.ai_percentage, 100.0);
        assert_eq!(summary.top_model, None);
    }

    #[test]
    fn test_contributor_summaries() {
        let t = |d: u32| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap();
        let events = vec![
            TrackingEvent::new(EventKind::Human, "Alice")
                .with_timestamp(t(3))
                .with_file(FileChange::new("a.rs", 5, 0, 0)),
            TrackingEvent::new(EventKind::Ai, "Claude")
                .with_timestamp(t(2))
                .with_file(FileChange::new("a.rs", 20, 5, 1))
                .with_file(FileChange::new("b.rs", 3, 0, 0)),
            TrackingEvent::new(EventKind::Human, "Alice")
                .with_timestamp(t(1))
                .with_file(FileChange::new("a.rs", 1, 1, 1)),
            TrackingEvent::new(EventKind::Human, "Bob").with_timestamp(t(4)),
            TrackingEvent::new(EventKind::Human, "Aaron").with_timestamp(t(5)),
        ];

        let summaries = contributor_summaries(&events);
        let names: Vec<&str> = summaries.iter().map(|s| s.author.as_str()).collect();
        assert_eq!(names, vec!["Claude", "Alice", "Aaron", "Bob"]);

        let claude = &summaries[0];
        assert_eq!(claude.ai_events, 1);
        assert_eq!(claude.total_lines(), 29);
        assert_eq!(claude.files_touched, 2);

        let alice = &summaries[1];
        assert_eq!(alice.human_events, 2);
        assert_eq!(alice.lines_added, 6);
        assert_eq!(alice.files_touched, 1);
        assert_eq!(alice.first_activity, t(1));
        assert_eq!(alice.last_activity, t(3));
    }

    #[test]
    fn test_contributor_summaries_empty() {
        assert!(contributor_summaries(&[]).is_empty());
    }
}
