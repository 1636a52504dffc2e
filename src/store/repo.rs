use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, TodoError};
use crate::model::Task;
use crate::store::files::{Mutation, TaskStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Added {
    pub task: Task,
    /// The user's task count after the add.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneOutcome {
    Marked,
    AlreadyDone,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "task", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted(Task),
    NotFound,
}

/// Parse a user-supplied task id. Only positive integers are accepted.
pub fn parse_task_id(arg: Option<&str>) -> Result<u64> {
    let raw = arg.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(TodoError::MissingArgument("task id"));
    }
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(TodoError::InvalidTaskId(raw.to_string())),
    }
}

/// Per-user task operations, each one a single locked cycle on the store.
pub struct TaskRepository {
    store: TaskStore,
}

impl TaskRepository {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn add_task(&self, user_id: &str, text: &str) -> Result<Added> {
        if text.trim().is_empty() {
            return Err(TodoError::EmptyTaskText);
        }

        let added = self.store.with_lock(|store| {
            let list = store.list_or_insert(user_id);
            let task = list.push(text.to_string(), Utc::now()).clone();
            Ok(Mutation::Commit(Added {
                task,
                total: list.len(),
            }))
        })?;
        info!(user = user_id, id = added.task.id, total = added.total, "task added");
        Ok(added)
    }

    pub fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        self.store.read(|store| store.tasks(user_id).to_vec())
    }

    pub fn mark_done(&self, user_id: &str, id: u64) -> Result<DoneOutcome> {
        let outcome = self.store.with_lock(|store| {
            let Some(task) = store.list_mut(user_id).and_then(|l| l.find_mut(id)) else {
                return Ok(Mutation::Skip(DoneOutcome::NotFound));
            };
            if task.done {
                return Ok(Mutation::Skip(DoneOutcome::AlreadyDone));
            }
            task.done = true;
            Ok(Mutation::Commit(DoneOutcome::Marked))
        })?;
        if outcome == DoneOutcome::Marked {
            info!(user = user_id, id, "task marked done");
        }
        Ok(outcome)
    }

    /// Remove a task and renumber the rest so ids stay `1..=n`. The ids of
    /// tasks after the deleted one shift down by one.
    pub fn delete_task(&self, user_id: &str, id: u64) -> Result<DeleteOutcome> {
        let outcome = self.store.with_lock(|store| {
            match store.list_mut(user_id).and_then(|l| l.remove(id)) {
                Some(task) => Ok(Mutation::Commit(DeleteOutcome::Deleted(task))),
                None => Ok(Mutation::Skip(DeleteOutcome::NotFound)),
            }
        })?;
        if matches!(outcome, DeleteOutcome::Deleted(_)) {
            info!(user = user_id, id, "task deleted");
        }
        Ok(outcome)
    }

    /// Empty the user's list, returning how many tasks it held.
    pub fn clear_tasks(&self, user_id: &str) -> Result<usize> {
        let cleared = self.store.with_lock(|store| match store.list_mut(user_id) {
            Some(list) if !list.is_empty() => Ok(Mutation::Commit(list.clear())),
            _ => Ok(Mutation::Skip(0)),
        })?;
        if cleared > 0 {
            info!(user = user_id, cleared, "tasks cleared");
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn setup() -> (TempDir, TaskRepository) {
        let dir = tempdir().unwrap();
        let repo = TaskRepository::new(TaskStore::new(dir.path().join("user_data.json")));
        (dir, repo)
    }

    fn mtime(repo: &TaskRepository) -> std::time::SystemTime {
        fs::metadata(repo.store().path()).unwrap().modified().unwrap()
    }

    #[test]
    fn add_assigns_next_id_and_reports_total() {
        let (_dir, repo) = setup();
        let first = repo.add_task("u1", "Buy milk").unwrap();
        assert_eq!(first.task.id, 1);
        assert_eq!(first.task.text, "Buy milk");
        assert!(!first.task.done);
        assert_eq!(first.total, 1);

        let second = repo.add_task("u1", "Call mom").unwrap();
        assert_eq!(second.task.id, 2);
        assert_eq!(second.total, 2);

        assert_eq!(repo.list_tasks("u1").unwrap(), vec![first.task, second.task]);
    }

    #[test]
    fn add_rejects_empty_text_without_touching_store() {
        let (_dir, repo) = setup();
        for text in ["", "   ", "\t\n"] {
            let err = repo.add_task("u1", text).unwrap_err();
            assert!(matches!(err, TodoError::EmptyTaskText));
        }
        assert!(!repo.store().path().exists());
        assert!(repo.list_tasks("u1").unwrap().is_empty());
    }

    #[test]
    fn list_for_unknown_user_is_empty_and_does_not_write() {
        let (_dir, repo) = setup();
        assert!(repo.list_tasks("ghost").unwrap().is_empty());
        assert!(!repo.store().path().exists());
    }

    #[test]
    fn mark_done_is_idempotent() {
        let (_dir, repo) = setup();
        repo.add_task("u1", "a").unwrap();

        assert_eq!(repo.mark_done("u1", 1).unwrap(), DoneOutcome::Marked);
        let before = mtime(&repo);
        assert_eq!(repo.mark_done("u1", 1).unwrap(), DoneOutcome::AlreadyDone);
        assert_eq!(mtime(&repo), before);
        assert!(repo.list_tasks("u1").unwrap()[0].done);
    }

    #[test]
    fn mark_done_missing_task_is_not_found() {
        let (_dir, repo) = setup();
        repo.add_task("u1", "a").unwrap();
        repo.add_task("u1", "b").unwrap();
        assert_eq!(repo.mark_done("u1", 5).unwrap(), DoneOutcome::NotFound);
        assert_eq!(repo.mark_done("nobody", 1).unwrap(), DoneOutcome::NotFound);
    }

    #[test]
    fn delete_renumbers_remaining_tasks() {
        let (_dir, repo) = setup();
        for text in ["a", "b", "c"] {
            repo.add_task("u1", text).unwrap();
        }
        repo.mark_done("u1", 3).unwrap();

        let outcome = repo.delete_task("u1", 2).unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted(ref t) if t.text == "b"));

        let tasks = repo.list_tasks("u1").unwrap();
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(tasks[1].text, "c");
        assert!(tasks[1].done);
    }

    #[test]
    fn deleted_id_now_refers_to_the_next_task() {
        let (_dir, repo) = setup();
        for text in ["a", "b", "c"] {
            repo.add_task("u1", text).unwrap();
        }
        repo.delete_task("u1", 1).unwrap();
        // id 1 is "b" now; stale references hit a different task
        let outcome = repo.delete_task("u1", 1).unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted(ref t) if t.text == "b"));
        assert_eq!(repo.list_tasks("u1").unwrap()[0].text, "c");
    }

    #[test]
    fn delete_missing_task_does_not_write() {
        let (_dir, repo) = setup();
        repo.add_task("u1", "a").unwrap();
        let before = mtime(&repo);
        assert_eq!(repo.delete_task("u1", 9).unwrap(), DeleteOutcome::NotFound);
        assert_eq!(repo.delete_task("nobody", 1).unwrap(), DeleteOutcome::NotFound);
        assert_eq!(mtime(&repo), before);
    }

    #[test]
    fn new_task_after_delete_takes_next_dense_id() {
        let (_dir, repo) = setup();
        for text in ["a", "b", "c"] {
            repo.add_task("u1", text).unwrap();
        }
        repo.delete_task("u1", 1).unwrap();
        let added = repo.add_task("u1", "d").unwrap();
        assert_eq!(added.task.id, 3);
        assert_eq!(added.total, 3);
    }

    #[test]
    fn hand_edited_gaps_stay_dense_after_add() {
        let (_dir, repo) = setup();
        fs::write(
            repo.store().path(),
            r#"{"1": {"tasks": [
                {"id": 1, "text": "a", "done": false, "created_at": "2024-01-01T00:00:00+00:00"},
                {"id": 3, "text": "b", "done": false, "created_at": "2024-01-01T00:00:00+00:00"}
            ]}}"#,
        )
        .unwrap();

        let added = repo.add_task("1", "new").unwrap();
        assert_eq!(added.task.id, 3);

        let ids: Vec<u64> = repo.list_tasks("1").unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(repo.mark_done("1", 3).unwrap(), DoneOutcome::Marked);
        let tasks = repo.list_tasks("1").unwrap();
        assert!(!tasks[1].done);
        assert!(tasks[2].done && tasks[2].text == "new");
    }

    #[test]
    fn clear_returns_count_and_keeps_empty_list() {
        let (_dir, repo) = setup();
        for text in ["a", "b", "c"] {
            repo.add_task("u1", text).unwrap();
        }
        assert_eq!(repo.clear_tasks("u1").unwrap(), 3);
        assert!(repo.list_tasks("u1").unwrap().is_empty());
        assert!(repo.store().load().unwrap().list("u1").is_some());

        let before = mtime(&repo);
        assert_eq!(repo.clear_tasks("u1").unwrap(), 0);
        assert_eq!(mtime(&repo), before);
    }

    #[test]
    fn clear_unknown_user_is_zero_and_does_not_write() {
        let (_dir, repo) = setup();
        assert_eq!(repo.clear_tasks("ghost").unwrap(), 0);
        assert!(!repo.store().path().exists());
    }

    #[test]
    fn users_are_isolated() {
        let (_dir, repo) = setup();
        repo.add_task("alice", "a1").unwrap();
        repo.add_task("alice", "a2").unwrap();
        repo.add_task("bob", "b1").unwrap();

        repo.mark_done("bob", 1).unwrap();
        repo.delete_task("bob", 1).unwrap();
        repo.clear_tasks("bob").unwrap();

        let alice = repo.list_tasks("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|t| !t.done));
    }

    #[test]
    fn parse_task_id_accepts_positive_integers() {
        assert_eq!(parse_task_id(Some("1")).unwrap(), 1);
        assert_eq!(parse_task_id(Some(" 42 ")).unwrap(), 42);
    }

    #[test]
    fn parse_task_id_rejects_bad_input() {
        assert!(matches!(
            parse_task_id(None),
            Err(TodoError::MissingArgument(_))
        ));
        assert!(matches!(
            parse_task_id(Some("  ")),
            Err(TodoError::MissingArgument(_))
        ));
        for bad in ["abc", "0", "-1", "1.5", "2x"] {
            assert!(
                matches!(parse_task_id(Some(bad)), Err(TodoError::InvalidTaskId(_))),
                "{bad} should be invalid"
            );
        }
    }
}
