//! Task data structure and related functionality.
//!
//! This module defines the `Task` record exactly as it is stored in the shared
//! document, the editable `TaskFields` subset, and the due-soon predicate.

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::TaskError;
use crate::fields::{lenient_urgency, Urgency};

/// Storage format for `by_when`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for `created_at`.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";
/// A task is due soon when its date is no later than this many days from today.
pub const DUE_SOON_DAYS: i64 = 2;

/// A unit of assigned work.
///
/// Field names are the document's wire format. `by_when` is kept as the raw
/// string so that a malformed stored date survives a read-modify-write cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_urgency")]
    pub urgency: Urgency,
    #[serde(default)]
    pub by_when: String,
    #[serde(default = "unknown_identity")]
    pub assigned_by: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: String,
}

fn unknown_identity() -> String {
    "Unknown".to_string()
}

impl Task {
    /// Parsed due date, or `None` when `by_when` is not a valid calendar date.
    pub fn due_date(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.by_when)
    }

    /// Incomplete and due on or before `today + 2 days`. Overdue counts.
    pub fn is_due_soon(&self, today: NaiveDate) -> bool {
        !self.completed && is_due_soon(&self.by_when, today)
    }

    /// Date used to prefill an edit form; a malformed stored date falls back to today.
    pub fn due_or_today(&self, today: NaiveDate) -> NaiveDate {
        self.due_date().unwrap_or(today)
    }

    /// Overwrite the four user-editable fields, leaving identity and history alone.
    pub fn apply(&mut self, fields: &TaskFields) {
        self.task_name = fields.task_name.trim().to_string();
        self.description = fields.description.trim().to_string();
        self.urgency = fields.urgency;
        self.by_when = fields.by_when.format(DATE_FORMAT).to_string();
    }
}

/// The user-editable part of a task, as collected by the assign and edit forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub task_name: String,
    pub description: String,
    pub urgency: Urgency,
    pub by_when: NaiveDate,
}

impl TaskFields {
    pub fn new(task_name: impl Into<String>, urgency: Urgency, by_when: NaiveDate) -> Self {
        Self {
            task_name: task_name.into(),
            description: String::new(),
            urgency,
            by_when,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Fields currently held by `task`, with a malformed date replaced by `today`.
    pub fn from_task(task: &Task, today: NaiveDate) -> Self {
        Self {
            task_name: task.task_name.clone(),
            description: task.description.clone(),
            urgency: task.urgency,
            by_when: task.due_or_today(today),
        }
    }

    /// The task name must be non-empty after trimming.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.task_name.trim().is_empty() {
            return Err(TaskError::Validation("Task name is required!".to_string()));
        }
        Ok(())
    }
}

/// Parse a stored `YYYY-MM-DD` date.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Whether a stored date string is within the due-soon window. Unparsable dates never are.
pub fn is_due_soon(by_when: &str, today: NaiveDate) -> bool {
    match parse_iso_date(by_when) {
        Some(due) => due <= today + Duration::days(DUE_SOON_DAYS),
        None => false,
    }
}

/// Short task identifier: the first eight characters of a random v4 UUID.
pub fn new_task_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Creation timestamp in local time, minute precision.
pub fn created_at_now() -> String {
    Local::now().format(CREATED_AT_FORMAT).to_string()
}
