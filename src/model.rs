//! Stored records: users, lists and tasks.
//!
//! Set-valued fields are `BTreeSet`s, so inserting an id that is already
//! present and removing one that is absent are both no-ops.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Highest priority level a task may carry (levels are 1..=3).
pub const MAX_PRIORITY: u8 = 3;

/// Generate a new record id.
pub fn new_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub friends: BTreeSet<String>,
    #[serde(default)]
    pub outgoing_req: BTreeSet<String>,
    #[serde(default)]
    pub incoming_req: BTreeSet<String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            username: username.into(),
            friends: BTreeSet::new(),
            outgoing_req: BTreeSet::new(),
            incoming_req: BTreeSet::new(),
        }
    }

    /// Copy of this user with the relationship sets emptied.
    pub fn public_view(&self) -> Self {
        Self {
            id: self.id.clone(),
            username: self.username.clone(),
            friends: BTreeSet::new(),
            outgoing_req: BTreeSet::new(),
            incoming_req: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub private: bool,
    #[serde(default)]
    pub members: BTreeSet<String>,
}

impl TaskList {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, private: bool) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            owner: owner.into(),
            private,
            members: BTreeSet::new(),
        }
    }
}

/// Row shape returned when listing a user's lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSummary {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub private: bool,
}

impl From<&TaskList> for ListSummary {
    fn from(list: &TaskList) -> Self {
        Self {
            id: list.id.clone(),
            name: list.name.clone(),
            owner: list.owner.clone(),
            private: list.private,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub list_id: String,
    pub list_order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

/// Input for creating a task. The position is not part of the draft.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDraft {
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub list_id: String,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub planned_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub planned_end: Option<DateTime<Utc>>,
}

impl TaskDraft {
    /// Validate the draft and build the task row at `list_order`.
    pub fn into_task(self, list_order: usize) -> Result<Task> {
        let title = normalize_title(&self.title)?;
        validate_priority(self.priority)?;
        validate_plan(self.planned_start, self.planned_end)?;
        Ok(Task {
            id: new_id(),
            owner: self.owner,
            title,
            tags: normalize_tags(&self.tags),
            list_id: self.list_id,
            list_order,
            priority: self.priority,
            due: self.due,
            planned_start: self.planned_start,
            planned_end: self.planned_end,
            completed: false,
        })
    }
}

/// Field changes for an existing task.
///
/// For the optional fields, `None` keeps the current value and `Some(None)`
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Option<u8>>,
    pub due: Option<Option<DateTime<Utc>>>,
    pub planned_start: Option<Option<DateTime<Utc>>>,
    pub planned_end: Option<Option<DateTime<Utc>>>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.tags.is_none()
            && self.priority.is_none()
            && self.due.is_none()
            && self.planned_start.is_none()
            && self.planned_end.is_none()
    }

    /// Apply the edit to `task`, leaving it untouched on validation failure.
    pub fn apply(&self, task: &mut Task) -> Result<()> {
        let title = match &self.title {
            Some(title) => normalize_title(title)?,
            None => task.title.clone(),
        };
        let priority = self.priority.unwrap_or(task.priority);
        validate_priority(priority)?;
        let planned_start = self.planned_start.unwrap_or(task.planned_start);
        let planned_end = self.planned_end.unwrap_or(task.planned_end);
        validate_plan(planned_start, planned_end)?;

        task.title = title;
        if let Some(tags) = &self.tags {
            task.tags = normalize_tags(tags);
        }
        task.priority = priority;
        task.due = self.due.unwrap_or(task.due);
        task.planned_start = planned_start;
        task.planned_end = planned_end;
        Ok(())
    }
}

pub fn normalize_username(username: &str) -> Result<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("username cannot be empty".to_string()));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!(
            "username cannot contain whitespace: '{trimmed}'"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn normalize_list_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("list name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_priority(priority: Option<u8>) -> Result<()> {
    match priority {
        Some(level) if level == 0 || level > MAX_PRIORITY => Err(Error::InvalidArgument(
            format!("priority must be between 1 and {MAX_PRIORITY}, got {level}"),
        )),
        _ => Ok(()),
    }
}

fn validate_plan(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(Error::InvalidArgument(format!(
                "planned start {start} is after planned end {end}"
            )));
        }
    }
    Ok(())
}
