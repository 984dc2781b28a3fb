use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::time::parse_timestamp;

mod load;

pub use load::{build_client, fetch_bytes, load, parse_snapshot, SnapshotError, SnapshotSource};

pub const LEADS_WON_7D: &str = "leads_won_7d";
pub const LEADS_WON_30D: &str = "leads_won_30d";
pub const CHILDREN_ENROLLED: &str = "children_enrolled";
pub const CHILDREN_ENROLLED_TERM_START: &str = "children_enrolled_term_start";
pub const CHILDREN_ENROLLED_PREV_TERM_END: &str = "children_enrolled_prev_term_end";
pub const CLASSES_RUNNING: &str = "classes_running";
pub const LF_MEMBERS: &str = "lf_members";
pub const LF_TRIALS: &str = "lf_trials";
pub const ACTIVE_STUDENTS: &str = "active_students";
pub const ACTIVE_STUDENTS_PREV: &str = "active_students_prev";
pub const RETURNING_STUDENTS: &str = "returning_students";

/// One refresh cycle of the metrics document. Replaced wholesale on every load.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsSnapshot {
    /// Kept as raw JSON: a malformed stamp makes the snapshot stale, never unreadable.
    #[serde(default)]
    pub generated_at: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: Metrics,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: SnapshotMeta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
}

impl MetricsSnapshot {
    /// `None` when the field is missing or unparsable; callers must treat that as stale.
    /// Accepts a timestamp string or epoch milliseconds.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        match self.generated_at.as_ref()? {
            Value::String(raw) => parse_timestamp(raw),
            Value::Number(n) => n
                .as_f64()
                .filter(|ms| ms.is_finite())
                .and_then(|ms| DateTime::from_timestamp_millis(ms.trunc() as i64)),
            _ => None,
        }
    }
}

/// Flat name -> value mapping. Values may be numbers or strings; only numbers
/// feed derivations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Metrics(pub BTreeMap<String, Value>);

impl Metrics {
    pub fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64).filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SnapshotMeta {
    #[serde(default, deserialize_with = "loose_text")]
    pub term: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub dsp_last_sync: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub prev_term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Task {
    pub text: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due: Option<String>,
}

impl Task {
    /// Due date for ordering; absent sorts as the empty string.
    pub fn due_key(&self) -> &str {
        self.due.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Blocked,
    Pending,
    Done,
    Other(String),
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Other(String::new())
    }
}

impl TaskStatus {
    pub fn priority(&self) -> u8 {
        match self {
            TaskStatus::Blocked => 0,
            TaskStatus::Pending => 1,
            TaskStatus::Done => 2,
            // unknown values rank with pending
            TaskStatus::Other(_) => 1,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TaskStatus::Blocked => "blocked",
            TaskStatus::Pending => "pending",
            TaskStatus::Done => "done",
            TaskStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "blocked" => TaskStatus::Blocked,
            "pending" => TaskStatus::Pending,
            "done" => TaskStatus::Done,
            _ => TaskStatus::Other(raw),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.label().to_string()
    }
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// Display labels: numbers and booleans are shown as written, anything else is absent.
fn loose_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_json_numbers_are_numeric() {
        let metrics: Metrics = serde_json::from_value(json!({
            "leads_won_7d": 4,
            "lf_members": "12",
            "lf_trials": null,
            "ratio": 0.5
        }))
        .unwrap();
        assert_eq!(metrics.number(LEADS_WON_7D), Some(4.0));
        assert_eq!(metrics.number(LF_MEMBERS), None);
        assert_eq!(metrics.number(LF_TRIALS), None);
        assert_eq!(metrics.number("ratio"), Some(0.5));
        assert_eq!(metrics.number("missing"), None);
    }

    #[test]
    fn unknown_status_is_kept_and_ranked_as_pending() {
        let task: Task = serde_json::from_value(json!({"text": "x", "status": "waiting"})).unwrap();
        assert_eq!(task.status, TaskStatus::Other("waiting".into()));
        assert_eq!(task.status.priority(), TaskStatus::Pending.priority());
        assert_eq!(task.status.label(), "waiting");
    }

    #[test]
    fn null_tasks_and_missing_sections_default() {
        let snap: MetricsSnapshot = serde_json::from_value(json!({"tasks": null, "meta": null})).unwrap();
        assert!(snap.tasks.is_empty());
        assert!(snap.generated_at().is_none());
        assert!(snap.meta.term.is_none());
    }

    #[test]
    fn odd_generated_at_values_never_fail_the_document() {
        let snap: MetricsSnapshot = serde_json::from_value(json!({"generated_at": 1760860800000_i64})).unwrap();
        assert_eq!(snap.generated_at(), DateTime::from_timestamp(1_760_860_800, 0));

        for odd in [json!(true), json!({"at": "today"}), json!(["2026-10-19"]), json!("soon")] {
            let snap: MetricsSnapshot = serde_json::from_value(json!({"generated_at": odd})).unwrap();
            assert!(snap.generated_at().is_none());
        }
    }

    #[test]
    fn meta_labels_tolerate_non_strings() {
        let snap: MetricsSnapshot = serde_json::from_value(json!({
            "meta": {"term": 2026, "dsp_last_sync": {"when": 1}, "prev_term": false}
        }))
        .unwrap();
        assert_eq!(snap.meta.term.as_deref(), Some("2026"));
        assert!(snap.meta.dsp_last_sync.is_none());
        assert_eq!(snap.meta.prev_term.as_deref(), Some("false"));
    }
}
