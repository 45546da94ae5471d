//! Google Tasks API data types.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// A task list. Owned by exactly one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTaskList {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    NeedsAction,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLink {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<TaskLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl GoogleTask {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Calendar date the task is due on.
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due.map(|due| due.date_naive())
    }
}

/// Encode a calendar date the way the Tasks API stores due dates: midnight UTC.
///
/// The API ignores the time part, so decoding with [`GoogleTask::due_date`]
/// gives back the same date whatever the viewer's offset.
pub fn due_from_date(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// RFC 3339 with milliseconds and a `Z` suffix, e.g. `2025-03-10T00:00:00.000Z`.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_instant<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(instant) => serializer.serialize_str(&format_instant(instant)),
        None => serializer.serialize_none(),
    }
}

fn serialize_patch_instant<S: Serializer>(
    value: &Option<Option<DateTime<Utc>>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(inner) => serialize_instant(inner, serializer),
        None => serializer.serialize_none(),
    }
}

/// Body for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: TaskStatus,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_instant"
    )]
    pub due: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notes: None,
            status: TaskStatus::NeedsAction,
            due: None,
        }
    }
}

/// Partial update of a task.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears it, which is
/// sent as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_patch_instant"
    )]
    pub due: Option<Option<DateTime<Utc>>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_patch_instant"
    )]
    pub completed: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn complete(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            completed: Some(Some(at)),
            ..Self::default()
        }
    }

    pub fn reopen() -> Self {
        Self {
            status: Some(TaskStatus::NeedsAction),
            completed: Some(None),
            ..Self::default()
        }
    }

    /// Title, notes and due date from the edit form. Empty notes clear them.
    pub fn edit(title: &str, notes: &str, due: Option<NaiveDate>) -> Self {
        let notes = notes.trim();
        Self {
            title: Some(title.trim().to_string()),
            notes: Some((!notes.is_empty()).then(|| notes.to_string())),
            due: Some(due.map(due_from_date)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch locally, as the server would.
    pub fn apply_to(&self, task: &mut GoogleTask) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due) = self.due {
            task.due = due;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
