//! Task operations over the shared collection.
//!
//! `TaskBoard` pairs a `TaskStore` with the in-memory copy of the collection.
//! Every mutation changes the copy first and then writes the whole collection
//! back. A failed write is reported as a warning next to the result: the
//! in-memory copy keeps the change and is ahead of the store until the next
//! successful write.

use chrono::NaiveDate;
use log::{info, warn};
use thiserror::Error;

use crate::fields::ListFilter;
use crate::store::{StoreError, TaskStore};
use crate::task::{created_at_now, new_task_id, Task, TaskFields, DATE_FORMAT};

#[derive(Debug, Error)]
pub enum TaskError {
    /// Rejected input; nothing was changed or written.
    #[error("{0}")]
    Validation(String),
    #[error("no task with id '{0}'")]
    NotFound(String),
}

/// Result of a mutation plus the store write failure, if any.
#[derive(Debug)]
pub struct Saved<T> {
    pub value: T,
    pub warning: Option<StoreError>,
}

/// Counts shown above the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub due_soon: usize,
}

/// Tasks matching `filter`, in collection order.
pub fn filter_tasks(tasks: &[Task], filter: ListFilter, today: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| match filter {
            ListFilter::All => true,
            ListFilter::Pending => !t.completed,
            ListFilter::Completed => t.completed,
            ListFilter::DueSoon => t.is_due_soon(today),
        })
        .collect()
}

/// Count tasks by completion and due-soon state.
pub fn list_with_stats(tasks: &[Task], today: NaiveDate) -> TaskStats {
    let completed = tasks.iter().filter(|t| t.completed).count();
    TaskStats {
        total: tasks.len(),
        pending: tasks.len() - completed,
        completed,
        due_soon: tasks.iter().filter(|t| t.is_due_soon(today)).count(),
    }
}

pub struct TaskBoard<S: TaskStore> {
    store: S,
    tasks: Vec<Task>,
}

impl<S: TaskStore> TaskBoard<S> {
    /// Load the current collection; an unreachable store reads as empty.
    pub fn open(store: S) -> Self {
        let tasks = store.load();
        Self { store, tasks }
    }

    pub fn reload(&mut self) {
        self.tasks = self.store.load();
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn stats(&self, today: NaiveDate) -> TaskStats {
        list_with_stats(&self.tasks, today)
    }

    /// Validate, then append a new task to a freshly loaded collection and save.
    pub fn create(
        &mut self,
        fields: &TaskFields,
        assigned_by: &str,
        assigned_to: &str,
        today: NaiveDate,
    ) -> Result<Saved<Task>, TaskError> {
        fields.validate()?;
        if fields.by_when < today {
            return Err(TaskError::Validation(format!(
                "Due date {} is in the past",
                fields.by_when.format(DATE_FORMAT)
            )));
        }

        self.refresh_before_append();
        let mut id = new_task_id();
        while self.get(&id).is_some() {
            id = new_task_id();
        }
        let mut task = Task {
            id,
            task_name: String::new(),
            description: String::new(),
            urgency: fields.urgency,
            by_when: String::new(),
            assigned_by: assigned_by.to_string(),
            assigned_to: assigned_to.to_string(),
            completed: false,
            created_at: created_at_now(),
        };
        task.apply(fields);
        self.tasks.push(task.clone());
        info!(
            "event=task_create id={} urgency={} by_when={}",
            task.id, task.urgency, task.by_when
        );

        let warning = self.persist();
        Ok(Saved { value: task, warning })
    }

    /// Set the completion flag of one task and save.
    pub fn set_completed(&mut self, id: &str, value: bool) -> Result<Saved<()>, TaskError> {
        let task = self.find_mut(id)?;
        task.completed = value;
        info!("event=task_complete id={id} completed={value}");
        Ok(Saved {
            value: (),
            warning: self.persist(),
        })
    }

    /// Flip the completion flag; returns the new value.
    pub fn toggle_completed(&mut self, id: &str) -> Result<Saved<bool>, TaskError> {
        let value = !self.find_mut(id)?.completed;
        let saved = self.set_completed(id, value)?;
        Ok(Saved {
            value,
            warning: saved.warning,
        })
    }

    /// Overwrite name, description, urgency and due date of one task and save.
    pub fn update_fields(&mut self, id: &str, fields: &TaskFields) -> Result<Saved<()>, TaskError> {
        fields.validate()?;
        let task = self.find_mut(id)?;
        task.apply(fields);
        info!("event=task_update id={id} urgency={} by_when={}", task.urgency, task.by_when);
        Ok(Saved {
            value: (),
            warning: self.persist(),
        })
    }

    /// Pick up tasks written elsewhere. An unreadable store keeps the copy we
    /// hold, so the following save cannot replace the document with a shorter one.
    fn refresh_before_append(&mut self) {
        match self.store.try_load() {
            Ok(tasks) => self.tasks = tasks,
            Err(e) => warn!(
                "event=store_load status=stale kept={} error={e}",
                self.tasks.len()
            ),
        }
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Task, TaskError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn persist(&self) -> Option<StoreError> {
        match self.store.save(&self.tasks) {
            Ok(()) => None,
            Err(e) => {
                warn!("event=store_save status=failed error={e}");
                Some(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Duration;

    use super::*;
    use crate::fields::Urgency;
    use crate::store::memory::MemoryStore;

    const RECIPIENT: &str = "vivek.joon@mathco.com";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn fields(name: &str, offset: i64) -> TaskFields {
        TaskFields::new(name, Urgency::High, today() + Duration::days(offset))
    }

    fn board_with(names: &[(&str, i64)]) -> TaskBoard<MemoryStore> {
        let mut board = TaskBoard::open(MemoryStore::default());
        for (name, offset) in names {
            board.create(&fields(name, *offset), "a@mathco.com", RECIPIENT, today()).unwrap();
        }
        board
    }

    #[test]
    fn review_q4_scenario() {
        let mut board = TaskBoard::open(MemoryStore::default());
        let saved = board
            .create(&fields("Review Q4", 1), "a@mathco.com", RECIPIENT, today())
            .unwrap();
        assert!(saved.warning.is_none());
        assert_eq!(
            board.stats(today()),
            TaskStats { total: 1, pending: 1, completed: 0, due_soon: 1 }
        );
    }

    #[test]
    fn create_appends_one_task_with_unique_id() {
        let mut board = board_with(&[("one", 3), ("two", 4), ("three", 5)]);
        let before = board.tasks().len();
        let saved = board.create(&fields("four", 6), "b@mathco.com", RECIPIENT, today()).unwrap();

        assert_eq!(board.tasks().len(), before + 1);
        let ids: HashSet<_> = board.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), board.tasks().len());
        assert_eq!(saved.value.assigned_by, "b@mathco.com");
        assert_eq!(saved.value.assigned_to, RECIPIENT);
        assert!(!saved.value.completed);
    }

    #[test]
    fn create_trims_and_persists() {
        let mut board = TaskBoard::open(MemoryStore::default());
        let f = fields("  Prepare slides ", 2).with_description("  for Monday  ");
        board.create(&f, RECIPIENT, RECIPIENT, today()).unwrap();

        let stored = board.store.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].task_name, "Prepare slides");
        assert_eq!(stored[0].description, "for Monday");
        assert_eq!(stored[0].by_when, "2026-10-18");
    }

    #[test]
    fn blank_name_changes_nothing() {
        let mut board = board_with(&[("one", 1)]);
        let saves = board.store.saves.get();
        let err = board.create(&fields("   ", 1), "a@mathco.com", RECIPIENT, today()).unwrap_err();

        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(board.tasks().len(), 1);
        assert_eq!(board.store.saves.get(), saves);
    }

    #[test]
    fn past_due_date_is_rejected_on_create() {
        let mut board = TaskBoard::open(MemoryStore::default());
        let err = board.create(&fields("late", -1), "a@mathco.com", RECIPIENT, today()).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn create_reloads_before_appending() {
        let mut board = board_with(&[("mine", 1)]);
        let mut remote = board.store.snapshot();
        let mut other = remote[0].clone();
        other.id = "feedbeef".into();
        other.task_name = "written elsewhere".into();
        remote.push(other);
        *board.store.tasks.borrow_mut() = remote;

        board.create(&fields("next", 1), "a@mathco.com", RECIPIENT, today()).unwrap();
        assert_eq!(board.tasks().len(), 3);
        assert!(board.get("feedbeef").is_some());
    }

    #[test]
    fn failed_reload_before_create_keeps_known_tasks() {
        let mut board = board_with(&[("one", 1), ("two", 2), ("three", 3)]);
        board.store.fail_load.set(true);

        let saved = board.create(&fields("four", 4), "a@mathco.com", RECIPIENT, today()).unwrap();
        assert!(saved.warning.is_none());
        assert_eq!(board.tasks().len(), 4);
        let stored: Vec<_> = board.store.snapshot().into_iter().map(|t| t.task_name).collect();
        assert_eq!(stored, ["one", "two", "three", "four"]);
    }

    #[test]
    fn failed_save_keeps_change_and_warns() {
        let mut board = TaskBoard::open(MemoryStore::default());
        board.store.fail_save.set(true);
        let saved = board.create(&fields("offline", 1), "a@mathco.com", RECIPIENT, today()).unwrap();

        assert!(matches!(saved.warning, Some(StoreError::Status(500))));
        assert_eq!(board.tasks().len(), 1);
        assert!(board.store.snapshot().is_empty());
    }

    #[test]
    fn unreachable_store_opens_empty() {
        let store = MemoryStore::with_tasks(board_with(&[("one", 1)]).tasks().to_vec());
        store.fail_load.set(true);
        let board = TaskBoard::open(store);
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn toggling_flips_only_that_task_and_twice_restores() {
        let mut board = board_with(&[("one", 1), ("two", 2), ("three", 9)]);
        let original = board.tasks().to_vec();
        let id = original[1].id.clone();

        let saved = board.toggle_completed(&id).unwrap();
        assert!(saved.value);
        for (before, after) in original.iter().zip(board.tasks()) {
            if before.id == id {
                assert!(after.completed);
                assert_eq!(after.task_name, before.task_name);
            } else {
                assert_eq!(after, before);
            }
        }

        board.toggle_completed(&id).unwrap();
        assert_eq!(board.tasks(), original.as_slice());
        assert_eq!(board.store.snapshot(), original);
    }

    #[test]
    fn set_completed_is_idempotent() {
        let mut board = board_with(&[("one", 1)]);
        let id = board.tasks()[0].id.clone();
        board.set_completed(&id, true).unwrap();
        board.set_completed(&id, true).unwrap();
        assert!(board.get(&id).unwrap().completed);
        assert_eq!(
            board.stats(today()),
            TaskStats { total: 1, pending: 0, completed: 1, due_soon: 0 }
        );
    }

    #[test]
    fn unknown_id_is_not_found_and_writes_nothing() {
        let mut board = board_with(&[("one", 1)]);
        let saves = board.store.saves.get();
        let before = board.tasks().to_vec();

        assert!(matches!(board.set_completed("nope", true), Err(TaskError::NotFound(id)) if id == "nope"));
        assert!(matches!(board.update_fields("nope", &fields("x", 1)), Err(TaskError::NotFound(_))));
        assert_eq!(board.tasks(), before.as_slice());
        assert_eq!(board.store.saves.get(), saves);
    }

    #[test]
    fn update_overwrites_exactly_the_editable_fields() {
        let mut board = board_with(&[("one", 1), ("two", 2)]);
        let id = board.tasks()[0].id.clone();
        board.set_completed(&id, true).unwrap();
        let before = board.get(&id).unwrap().clone();

        let edit = TaskFields::new("renamed", Urgency::Critical, today() - Duration::days(3))
            .with_description("new notes");
        board.update_fields(&id, &edit).unwrap();
        let after = board.get(&id).unwrap();

        assert_eq!(after.task_name, "renamed");
        assert_eq!(after.description, "new notes");
        assert_eq!(after.urgency, Urgency::Critical);
        assert_eq!(after.by_when, "2026-10-13");
        assert_eq!(after.id, before.id);
        assert_eq!(after.assigned_by, before.assigned_by);
        assert_eq!(after.assigned_to, before.assigned_to);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.completed, before.completed);
    }

    #[test]
    fn update_rejects_blank_name() {
        let mut board = board_with(&[("one", 1)]);
        let id = board.tasks()[0].id.clone();
        assert!(matches!(board.update_fields(&id, &fields(" ", 1)), Err(TaskError::Validation(_))));
        assert_eq!(board.get(&id).unwrap().task_name, "one");
    }

    fn mk(id: &str, by_when: &str, completed: bool) -> Task {
        Task {
            id: id.into(),
            task_name: id.into(),
            description: String::new(),
            urgency: Urgency::Low,
            by_when: by_when.into(),
            assigned_by: "a@mathco.com".into(),
            assigned_to: RECIPIENT.into(),
            completed,
            created_at: String::new(),
        }
    }

    fn mixed_tasks() -> Vec<Task> {
        vec![
            mk("overdue", "2026-09-01", false),
            mk("today", "2026-10-16", false),
            mk("edge", "2026-10-18", false),
            mk("later", "2026-10-19", false),
            mk("done", "2026-10-16", true),
            mk("garbled", "someday", false),
        ]
    }

    #[test]
    fn filters_select_matching_rows_in_order() {
        let tasks = mixed_tasks();
        let ids = |filter: ListFilter| {
            filter_tasks(&tasks, filter, today())
                .into_iter()
                .map(|t| t.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(ListFilter::All).len(), 6);
        assert_eq!(ids(ListFilter::Pending), ["overdue", "today", "edge", "later", "garbled"]);
        assert_eq!(ids(ListFilter::Completed), ["done"]);
        assert_eq!(ids(ListFilter::DueSoon), ["overdue", "today", "edge"]);
        assert!(filter_tasks(&[], ListFilter::DueSoon, today()).is_empty());
    }

    #[test]
    fn due_soon_counts_incomplete_tasks_up_to_two_days_out_including_overdue() {
        let tasks = mixed_tasks();
        assert_eq!(
            list_with_stats(&tasks, today()),
            TaskStats { total: 6, pending: 5, completed: 1, due_soon: 3 }
        );
        assert_eq!(list_with_stats(&[], today()), TaskStats::default());
    }
}
