use serde_json::json;

use crate::config::Config;
use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::stats::events::{EventLog, TrackingEvent};
use crate::stats::filter::{BranchFilter, BranchReport, MatchMode, branch_report};
use crate::stats::period::{PeriodSummary, PeriodWindow, period_summary};
use crate::stats::trend::{TrendAnalysis, TrendDirection};

#[derive(Debug, Clone, Default)]
pub struct EventsArgs {
    /// humantime duration, e.g. "30days"
    pub since: Option<String>,
    pub branch: Option<String>,
    pub mode: MatchMode,
    pub case_insensitive: bool,
    pub json: bool,
}

pub fn handle_events(
    repo: &Repository,
    config: &Config,
    args: &EventsArgs,
) -> Result<(), AttributionError> {
    let filter = BranchFilter {
        pattern: args.branch.clone().unwrap_or_default(),
        mode: args.mode,
        case_insensitive: args.case_insensitive,
    };
    let compiled = filter.validate()?;

    let events: Vec<TrackingEvent> = EventLog::for_repo(repo)
        .read_all()?
        .into_iter()
        .map(|mut e| {
            if e.branch.is_none() {
                e.branch = Some(config.default_branch().to_string());
            }
            e
        })
        .filter(|e| compiled.matches(e.branch_or_default()))
        .collect();

    let window = match args.since.as_deref() {
        Some(since) => PeriodWindow::last(since)?,
        None => window_covering(&events),
    };
    let summary = period_summary(&events, &window);
    let in_window: Vec<TrackingEvent> = events
        .into_iter()
        .filter(|e| window.contains(e.timestamp))
        .collect();
    let branches = branch_report(&in_window, &filter)?;
    let trend = TrendAnalysis::from_daily(&summary.daily);

    if args.json {
        let output = json!({
            "period": summary,
            "branches": branches,
            "trend": trend,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_report(&summary, &branches, &trend));
    }
    Ok(())
}

/// Smallest window holding every event; today when there are none
fn window_covering(events: &[TrackingEvent]) -> PeriodWindow {
    let dates = events.iter().map(|e| e.timestamp.date_naive());
    match (dates.clone().min(), dates.max()) {
        (Some(start), Some(end)) => PeriodWindow::new(start, end),
        _ => {
            let today = chrono::Utc::now().date_naive();
            PeriodWindow::new(today, today)
        }
    }
}

pub fn format_report(summary: &PeriodSummary, branches: &BranchReport, trend: &TrendAnalysis) -> String {
    let mut out = format!(
        "Period {} .. {}: {} events ({} AI, {} human) over {} active days, {:.1}% AI\n",
        summary.window.start,
        summary.window.end,
        summary.total_events,
        summary.ai_events,
        summary.human_events,
        summary.active_days,
        summary.ai_percentage
    );
    out.push_str(&format!(
        "Lines: +{} ~{} -{}\n",
        summary.lines_added, summary.lines_modified, summary.lines_deleted
    ));

    if !summary.contributors.is_empty() {
        out.push_str("\nContributors\n");
        for c in &summary.contributors {
            out.push_str(&format!(
                "  {:<24} {:>4} ai {:>4} human {:>7} lines {:>4} files\n",
                c.author,
                c.ai_events,
                c.human_events,
                c.total_lines(),
                c.files_touched
            ));
        }
    }

    if !branches.branches.is_empty() {
        out.push_str("\nBranches\n");
        for b in &branches.branches {
            out.push_str(&format!(
                "  {:<24} {:>4} events {:>6.1}% AI\n",
                b.branch,
                b.ai_events + b.human_events,
                b.ai_percentage
            ));
        }
    }

    let direction = match trend.direction {
        TrendDirection::Increasing => "increasing",
        TrendDirection::Decreasing => "decreasing",
        TrendDirection::Stable => "stable",
    };
    out.push_str(&format!(
        "\nTrend: {} ({:+.1} points), stability {:.1}",
        direction, trend.delta, trend.stability
    ));
    if let Some(weekday) = trend.most_active_weekday {
        out.push_str(&format!(", busiest day {}", weekday));
    }
    out.push('\n');
    out
}
