//! Aggregations over resolved lines and tracking events.
//!
//! Everything here is derived data, recomputed on demand from blame-backed
//! `ResolvedLine`s or from the repository's `EventLog`.

pub mod events;
pub mod filter;
pub mod period;
pub mod summary;
pub mod trend;

pub use events::{EventKind, EventLog, FileChange, TrackingEvent};
pub use filter::{BranchFilter, BranchReport, BranchStats, MatchMode, branch_report};
pub use period::{DailyStats, PeriodSummary, PeriodWindow, daily_stats, period_summary};
pub use summary::{ContributorSummary, FileSummary, contributor_summaries};
pub use trend::{TrendAnalysis, TrendDirection};
