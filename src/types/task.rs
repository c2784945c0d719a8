//! Task wire types.
//!
//! [`Task`] is the server's record; the client only ever holds a transient
//! copy that is re-fetched after every mutation. [`TaskFilter`] selects a
//! server-side listing, [`NewTask`] and [`TaskUpdate`] are request bodies, and
//! [`StatsSnapshot`] is the independently fetched summary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Task completion status.
///
/// The client never computes a status beyond flipping between the two
/// values; see [`toggled`](Self::toggled).
///
/// # Examples
///
/// ```
/// use taskdeck::TaskStatus;
///
/// assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Completed);
/// assert_eq!(TaskStatus::Completed.to_string(), "completed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not done yet. New tasks start here.
    Pending,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// Wire spelling of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// The other status.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(Error::validation(format!("unknown task status: {other}"))),
        }
    }
}

/// Server-side listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskFilter {
    /// Every task; no `status` parameter is sent.
    #[default]
    All,
    /// Only pending tasks.
    Pending,
    /// Only completed tasks.
    Completed,
}

impl TaskFilter {
    /// Status to send as the `status` query parameter, `None` for `All`.
    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            Self::All => None,
            Self::Pending => Some(TaskStatus::Pending),
            Self::Completed => Some(TaskStatus::Completed),
        }
    }

    /// Returns `true` if a task with `status` belongs in this listing.
    pub fn matches(&self, status: TaskStatus) -> bool {
        self.status().map_or(true, |wanted| wanted == status)
    }
}

impl From<TaskStatus> for TaskFilter {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => Self::Pending,
            TaskStatus::Completed => Self::Completed,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A task record owned by the server.
///
/// # Examples
///
/// ```
/// use taskdeck::{Task, TaskStatus};
///
/// let task: Task = serde_json::from_str(
///     r#"{"id":"t1","title":"Buy milk","description":null,"status":"pending","created_at":"2024-01-01"}"#,
/// ).unwrap();
/// assert_eq!(task.status, TaskStatus::Pending);
/// assert_eq!(task.description, "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable server-assigned identifier.
    pub id: String,
    /// Non-empty title.
    pub title: String,
    /// Free-form description; `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Completion status.
    pub status: TaskStatus,
    /// Creation timestamp as sent by the server.
    #[serde(alias = "createdAt")]
    pub created_at: String,
    /// Last modification timestamp, when the server reports one.
    #[serde(default, alias = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Owning account, when the server reports it.
    #[serde(default, alias = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Task {
    /// Returns `true` when the task is completed.
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Creation time, if the server timestamp is parseable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        super::parse_timestamp(&self.created_at)
    }
}

/// Body of `POST /api/todos`.
///
/// Construction validates the title, so a `NewTask` always carries a
/// non-blank one.
///
/// # Examples
///
/// ```
/// use taskdeck::NewTask;
///
/// assert!(NewTask::new("Buy milk", "").is_ok());
/// assert!(NewTask::new("   ", "desc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    title: String,
    description: String,
}

impl NewTask {
    /// Creates a request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `title` is empty or whitespace.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Result<Self, Error> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::validation("Please enter a title"));
        }
        Ok(Self {
            title,
            description: description.into(),
        })
    }

    /// The task title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The task description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Body of `PUT /api/todos/{id}`: any subset of the mutable fields.
///
/// Unset fields are omitted from the JSON entirely.
///
/// # Examples
///
/// ```
/// use taskdeck::{TaskStatus, TaskUpdate};
///
/// let update = TaskUpdate::new().status(TaskStatus::Completed);
/// assert_eq!(
///     serde_json::to_string(&update).unwrap(),
///     r#"{"status":"completed"}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    /// An update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the status.
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }

    /// Checks caller-side preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a title is set but blank.
    pub fn validate(&self) -> Result<(), Error> {
        match &self.title {
            Some(title) if title.trim().is_empty() => {
                Err(Error::validation("Please enter a title"))
            },
            _ => Ok(()),
        }
    }
}

/// Summary counts from `GET /api/todos/stats/summary`.
///
/// The counts are the server's; no relationship between them is checked
/// locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Number of tasks.
    pub total: u64,
    /// Number of completed tasks.
    pub completed: u64,
    /// Number of pending tasks.
    pub pending: u64,
    /// Percentage of completed tasks, rounded to one decimal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_rate: Option<f64>,
}
