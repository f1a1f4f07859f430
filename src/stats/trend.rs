use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::stats::period::DailyStats;

/// Calendar days compared at each end of the series
pub const TREND_WINDOW_DAYS: u64 = 7;
/// Minimum change in AI percentage points to call a direction
pub const TREND_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub first_week_ai_percentage: f64,
    pub last_week_ai_percentage: f64,
    pub delta: f64,
    pub direction: TrendDirection,
    pub most_active_weekday: Option<Weekday>,
    /// Population variance of the daily AI percentage
    pub variance: f64,
    /// `100 - variance`; not clamped, so very erratic series go negative
    pub stability: f64,
}

impl TrendAnalysis {
    /// Compares the first and last 7 calendar days of the series; spans
    /// shorter than two weeks compare overlapping windows.
    pub fn from_daily(daily: &[DailyStats]) -> Self {
        let mut days: Vec<&DailyStats> = daily.iter().collect();
        days.sort_by_key(|d| d.date);

        let (first_week, last_week) = match (days.first(), days.last()) {
            (Some(first), Some(last)) => {
                let window = Days::new(TREND_WINDOW_DAYS);
                let first_end = first.date.checked_add_days(window).unwrap_or(NaiveDate::MAX);
                let last_start = last.date.checked_sub_days(window).unwrap_or(NaiveDate::MIN);
                (
                    mean(days.iter().filter(|d| d.date < first_end).map(|d| d.ai_percentage)),
                    mean(days.iter().filter(|d| d.date > last_start).map(|d| d.ai_percentage)),
                )
            }
            _ => (0.0, 0.0),
        };
        let delta = last_week - first_week;

        let direction = if delta > TREND_THRESHOLD {
            TrendDirection::Increasing
        } else if delta < -TREND_THRESHOLD {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        let variance = population_variance(days.iter().map(|d| d.ai_percentage));

        TrendAnalysis {
            first_week_ai_percentage: first_week,
            last_week_ai_percentage: last_week,
            delta,
            direction,
            most_active_weekday: most_active_weekday(&days),
            variance,
            stability: 100.0 - variance,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn population_variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let m = mean(values.clone());
    mean(values.map(|v| (v - m) * (v - m)))
}

/// Weekday with the most events; ties go to the weekday seen first
fn most_active_weekday(days: &[&DailyStats]) -> Option<Weekday> {
    let mut totals: Vec<(Weekday, usize)> = Vec::new();
    for day in days {
        let weekday = day.date.weekday();
        match totals.iter_mut().find(|(w, _)| *w == weekday) {
            Some((_, total)) => *total += day.total_events(),
            None => totals.push((weekday, day.total_events())),
        }
    }

    let mut best: Option<(Weekday, usize)> = None;
    for (weekday, total) in totals {
        if best.is_none_or(|(_, best_total)| total > best_total) {
            best = Some((weekday, total));
        }
    }
    best.map(|(weekday, _)| weekday)
}
