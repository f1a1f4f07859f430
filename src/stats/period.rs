use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::error::AttributionError;
use crate::stats::events::{EventKind, TrackingEvent};
use crate::stats::summary::{ContributorSummary, contributor_summaries, percentage};

/// Activity for one UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub ai_events: usize,
    pub human_events: usize,
    pub lines_added: u64,
    pub lines_modified: u64,
    pub lines_deleted: u64,
    /// Added plus modified lines from AI events
    pub ai_lines: u64,
    /// Added plus modified lines from human events
    pub human_lines: u64,
    pub ai_percentage: f64,
    pub contributors: usize,
}

impl DailyStats {
    fn empty(date: NaiveDate) -> Self {
        DailyStats {
            date,
            ai_events: 0,
            human_events: 0,
            lines_added: 0,
            lines_modified: 0,
            lines_deleted: 0,
            ai_lines: 0,
            human_lines: 0,
            ai_percentage: 0.0,
            contributors: 0,
        }
    }

    pub fn total_events(&self) -> usize {
        self.ai_events + self.human_events
    }
}

/// Bucket events by UTC day, oldest first. Days without events are absent.
pub fn daily_stats(events: &[TrackingEvent]) -> Vec<DailyStats> {
    let mut days: BTreeMap<NaiveDate, (DailyStats, HashSet<&str>)> = BTreeMap::new();

    for event in events {
        let date = event.timestamp.date_naive();
        let (day, authors) = days
            .entry(date)
            .or_insert_with(|| (DailyStats::empty(date), HashSet::new()));

        let touched = event.lines_added() + event.lines_modified();
        match event.kind {
            EventKind::Ai => {
                day.ai_events += 1;
                day.ai_lines += touched;
            }
            EventKind::Human => {
                day.human_events += 1;
                day.human_lines += touched;
            }
        }
        day.lines_added += event.lines_added();
        day.lines_modified += event.lines_modified();
        day.lines_deleted += event.lines_deleted();
        authors.insert(event.author.as_str());
    }

    days.into_values()
        .map(|(mut day, authors)| {
            day.contributors = authors.len();
            day.ai_percentage = percentage(day.ai_lines, day.ai_lines + day.human_lines);
            day
        })
        .collect()
}

/// Calendar-day window, inclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        PeriodWindow { start, end }
    }

    /// Window ending today (UTC) and reaching back by a humantime duration
    /// such as `"7days"` or `"2w"`.
    pub fn last(duration: &str) -> Result<Self, AttributionError> {
        Self::last_from(duration, Utc::now())
    }

    pub fn last_from(duration: &str, now: DateTime<Utc>) -> Result<Self, AttributionError> {
        let parsed = humantime::parse_duration(duration).map_err(|e| {
            AttributionError::Generic(format!("Invalid duration '{}': {}", duration, e))
        })?;
        let delta = chrono::Duration::from_std(parsed).map_err(|e| {
            AttributionError::Generic(format!("Duration '{}' out of range: {}", duration, e))
        })?;
        let start = now.checked_sub_signed(delta).ok_or_else(|| {
            AttributionError::Generic(format!("Duration '{}' out of range", duration))
        })?;
        Ok(PeriodWindow {
            start: start.date_naive(),
            end: now.date_naive(),
        })
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.contains_date(timestamp.date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub window: PeriodWindow,
    pub total_events: usize,
    pub ai_events: usize,
    pub human_events: usize,
    pub lines_added: u64,
    pub lines_modified: u64,
    pub lines_deleted: u64,
    pub ai_percentage: f64,
    pub active_days: usize,
    pub top_contributor: Option<String>,
    pub contributors: Vec<ContributorSummary>,
    pub daily: Vec<DailyStats>,
}

pub fn period_summary(events: &[TrackingEvent], window: &PeriodWindow) -> PeriodSummary {
    let in_window: Vec<TrackingEvent> = events
        .iter()
        .filter(|e| window.contains(e.timestamp))
        .cloned()
        .collect();

    let daily = daily_stats(&in_window);
    let contributors = contributor_summaries(&in_window);

    let ai_lines: u64 = daily.iter().map(|d| d.ai_lines).sum();
    let human_lines: u64 = daily.iter().map(|d| d.human_lines).sum();

    PeriodSummary {
        window: *window,
        total_events: in_window.len(),
        ai_events: daily.iter().map(|d| d.ai_events).sum(),
        human_events: daily.iter().map(|d| d.human_events).sum(),
        lines_added: daily.iter().map(|d| d.lines_added).sum(),
        lines_modified: daily.iter().map(|d| d.lines_modified).sum(),
        lines_deleted: daily.iter().map(|d| d.lines_deleted).sum(),
        ai_percentage: percentage(ai_lines, ai_lines + human_lines),
        active_days: daily.len(),
        top_contributor: contributors.first().map(|c| c.author.clone()),
        contributors,
        daily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::events::FileChange;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn sample_events() -> Vec<TrackingEvent> {
        vec![
            TrackingEvent::new(EventKind::Ai, "Claude")
                .with_timestamp(at(1, 9))
                .with_file(FileChange::new("a.rs", 30, 0, 5)),
            TrackingEvent::new(EventKind::Human, "Alice")
                .with_timestamp(at(1, 23))
                .with_file(FileChange::new("a.rs", 5, 5, 0)),
            TrackingEvent::new(EventKind::Human, "Alice")
                .with_timestamp(at(3, 0))
                .with_file(FileChange::new("b.rs", 4, 0, 0)),
            TrackingEvent::new(EventKind::Ai, "Copilot").with_timestamp(at(5, 12)),
        ]
    }

    #[test]
    fn test_daily_buckets_by_utc_day() {
        let daily = daily_stats(&sample_events());
        assert_eq!(
            daily.iter().map(|d| d.date).collect::<Vec<_>>(),
            vec![date(1), date(3), date(5)]
        );

        let first = &daily[0];
        assert_eq!(first.ai_events, 1);
        assert_eq!(first.human_events, 1);
        assert_eq!(first.ai_lines, 30);
        assert_eq!(first.human_lines, 10);
        assert_eq!(first.lines_deleted, 5);
        assert_eq!(first.ai_percentage, 75.0);
        assert_eq!(first.contributors, 2);

        assert_eq!(daily[1].ai_percentage, 0.0);
        // no lines at all on the last day
        assert_eq!(daily[2].ai_percentage, 0.0);
        assert_eq!(daily[2].total_events(), 1);
    }

    #[test]
    fn test_window_is_inclusive() {
        let window = PeriodWindow::new(date(1), date(3));
        assert!(window.contains(at(1, 0)));
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 5, 3, 23, 59, 59).unwrap()));
        assert!(!window.contains(at(4, 0)));

        let summary = period_summary(&sample_events(), &window);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.active_days, 2);
        assert_eq!(summary.ai_events, 1);
        assert_eq!(summary.human_events, 2);
        assert_eq!(summary.lines_added, 39);
        assert_eq!(summary.top_contributor.as_deref(), Some("Claude"));
        assert_eq!(summary.contributors.len(), 2);
    }

    #[test]
    fn test_empty_period() {
        let window = PeriodWindow::new(date(20), date(25));
        let summary = period_summary(&sample_events(), &window);
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.ai_percentage, 0.0);
        assert_eq!(summary.top_contributor, None);
        assert!(summary.daily.is_empty());
    }

    #[test]
    fn test_last_from_humantime() {
        let now = at(10, 8);
        let window = PeriodWindow::last_from("7days", now).unwrap();
        assert_eq!(window, PeriodWindow::new(date(3), date(10)));

        let window = PeriodWindow::last_from("1h", now).unwrap();
        assert_eq!(window, PeriodWindow::new(date(10), date(10)));
    }

    #[test]
    fn test_last_rejects_bad_duration() {
        assert!(matches!(
            PeriodWindow::last("soon"),
            Err(AttributionError::Generic(_))
        ));
    }
}
