use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One user's tasks in display order. Ids are always `1..=len`.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl UserTaskList {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a pending task with the next dense id.
    pub fn push(&mut self, text: String, now: DateTime<Utc>) -> &Task {
        let id = self.tasks.len() as u64 + 1;
        self.tasks.push(Task {
            id,
            text,
            done: false,
            created_at: now,
        });
        &self.tasks[self.tasks.len() - 1]
    }

    pub fn find_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Remove the task with `id` and renumber the survivors.
    pub fn remove(&mut self, id: u64) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        let removed = self.tasks.remove(pos);
        self.renumber();
        Some(removed)
    }

    /// Reassign ids so the Nth task has id N, keeping order.
    pub fn renumber(&mut self) {
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.id = index as u64 + 1;
        }
    }

    /// Drop every task, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }
}

/// Every user's task list, keyed by the string form of the user id.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Store {
    users: BTreeMap<String, UserTaskList>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self, user_id: &str) -> &[Task] {
        self.users
            .get(user_id)
            .map(|list| list.tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn list(&self, user_id: &str) -> Option<&UserTaskList> {
        self.users.get(user_id)
    }

    pub fn list_mut(&mut self, user_id: &str) -> Option<&mut UserTaskList> {
        self.users.get_mut(user_id)
    }

    /// Get the user's list, creating an empty one if needed.
    pub fn list_or_insert(&mut self, user_id: &str) -> &mut UserTaskList {
        self.users.entry(user_id.to_string()).or_default()
    }

    /// Renumber every list; repairs gaps or duplicates from hand-edited files.
    pub fn renumber(&mut self) {
        for list in self.users.values_mut() {
            list.renumber();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// RFC 3339 on write. Reads also accept the naive `YYYY-MM-DD HH:MM:SS[.ffffff]`
/// form found in older data files, interpreted as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
