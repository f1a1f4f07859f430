use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use crate::git::repository::Repository;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct ErrorEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    timestamp: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct MessageEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    timestamp: String,
    message: String,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct PerformanceEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    timestamp: String,
    operation: String,
    duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
enum LogEnvelope {
    Error(ErrorEnvelope),
    Performance(PerformanceEnvelope),
    Message(MessageEnvelope),
}

impl LogEnvelope {
    fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            LogEnvelope::Error(e) => serde_json::to_value(e).ok(),
            LogEnvelope::Performance(p) => serde_json::to_value(p).ok(),
            LogEnvelope::Message(m) => serde_json::to_value(m).ok(),
        }
    }
}

/// Events are held in memory until a repository is known, then written
/// to `<git-dir>/ai-authorship/logs/<pid>.log` as JSON lines.
enum LogMode {
    Buffered(Vec<LogEnvelope>),
    Disk(PathBuf),
}

/// Cap on buffered envelopes when no repository context is ever set
const MAX_BUFFERED: usize = 1000;

struct ObservabilityInner {
    mode: LogMode,
}

static OBSERVABILITY: OnceLock<Mutex<ObservabilityInner>> = OnceLock::new();

fn lock_observability() -> MutexGuard<'static, ObservabilityInner> {
    OBSERVABILITY
        .get_or_init(|| {
            Mutex::new(ObservabilityInner {
                mode: LogMode::Buffered(Vec::new()),
            })
        })
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Set the repository context and flush buffered events to disk
pub fn set_repo_context(repo: &Repository) {
    let logs_dir = repo.storage_dir().join("logs");
    let log_path = logs_dir.join(format!("{}.log", std::process::id()));

    let mut obs = lock_observability();
    let buffered_events = match &mut obs.mode {
        LogMode::Buffered(events) => std::mem::take(events),
        LogMode::Disk(_) => return, // Already set, ignore
    };
    obs.mode = LogMode::Disk(log_path.clone());
    drop(obs); // Release lock before writing

    if fs::create_dir_all(&logs_dir).is_err() {
        return;
    }
    if !buffered_events.is_empty()
        && let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path)
    {
        for envelope in buffered_events {
            if let Some(json) = envelope.to_json() {
                let _ = writeln!(file, "{}", json);
            }
        }
    }
}

/// Append an envelope (buffer if no repo context, write to disk if context set)
fn append_envelope(envelope: LogEnvelope) {
    let mut obs = lock_observability();

    match &mut obs.mode {
        LogMode::Buffered(buffer) => {
            if buffer.len() < MAX_BUFFERED {
                buffer.push(envelope);
            }
        }
        LogMode::Disk(log_path) => {
            let log_path = log_path.clone();
            drop(obs); // Release lock before file I/O

            if let Some(json) = envelope.to_json()
                && let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path)
            {
                let _ = writeln!(file, "{}", json);
            }
        }
    }
}

pub fn log_error(error: &dyn std::error::Error, context: Option<serde_json::Value>) {
    append_envelope(LogEnvelope::Error(ErrorEnvelope {
        event_type: "error".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        message: error.to_string(),
        context,
    }));
}

pub fn log_performance(operation: &str, duration: Duration, context: Option<serde_json::Value>) {
    append_envelope(LogEnvelope::Performance(PerformanceEnvelope {
        event_type: "performance".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        operation: operation.to_string(),
        duration_ms: duration.as_millis(),
        context,
    }));
}

/// Log a message (info, warning, etc.)
pub fn log_message(message: &str, level: &str, context: Option<serde_json::Value>) {
    append_envelope(LogEnvelope::Message(MessageEnvelope {
        event_type: "message".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        message: message.to_string(),
        level: level.to_string(),
        context,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_json_shape() {
        let envelope = LogEnvelope::Performance(PerformanceEnvelope {
            event_type: "performance".to_string(),
            timestamp: "2024-08-01T00:00:00+00:00".to_string(),
            operation: "resolve.file".to_string(),
            duration_ms: 12,
            context: None,
        });
        let json = envelope.to_json().unwrap();
        assert_eq!(json["type"], "performance");
        assert_eq!(json["operation"], "resolve.file");
        assert_eq!(json["duration_ms"], 12);
        assert!(json.get("context").is_none());
    }

    #[test]
    fn test_message_envelope_keeps_level() {
        let envelope = LogEnvelope::Message(MessageEnvelope {
            event_type: "message".to_string(),
            timestamp: "t".to_string(),
            message: "hello".to_string(),
            level: "warning".to_string(),
            context: Some(serde_json::json!({"k": 1})),
        });
        let json = envelope.to_json().unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["context"]["k"], 1);
    }
}
