//! Ordinal position engine
//!
//! Keeps the `list_order` values of every list dense: after each operation
//! a list of `n` tasks holds exactly the positions `0..n`.
//!
//! The computation is split from persistence. [`reorder_plan`] and
//! [`compaction_plan`] are pure functions over a list's rows (sorted by
//! position) that return only the rows whose position must change;
//! [`OrderEngine`] loads rows under the list's scope lock, plans, and
//! writes the plan back one row at a time.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Task, TaskDraft};
use crate::storage::{lock_scopes, ScopeKey, Storage};

/// A new position for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub task_id: String,
    pub list_order: usize,
}

/// Plan moving `task_id` to index `target` within `tasks`.
///
/// `tasks` must be sorted by `list_order`. Tasks between the old and new
/// index shift by one toward the vacated slot; everything else keeps its
/// index. Stored positions that already disagree with their index (a gap
/// left by an interrupted operation) are included as well, so applying
/// the plan always leaves the list dense.
pub fn reorder_plan(tasks: &[Task], task_id: &str, target: usize) -> Result<Vec<Placement>> {
    let current = tasks
        .iter()
        .position(|task| task.id == task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

    if target >= tasks.len() {
        return Err(Error::InvalidArgument(format!(
            "position {target} is out of range for a list of {} tasks",
            tasks.len()
        )));
    }

    let mut order: Vec<usize> = (0..tasks.len()).collect();
    order[current] = target;
    if current > target {
        for slot in &mut order[target..current] {
            *slot += 1;
        }
    } else if target > current {
        for slot in &mut order[current + 1..=target] {
            *slot -= 1;
        }
    }

    Ok(diff(tasks, &order))
}

/// Plan closing every gap in `tasks` (sorted by `list_order`), keeping
/// their relative order.
pub fn compaction_plan(tasks: &[Task]) -> Vec<Placement> {
    let order: Vec<usize> = (0..tasks.len()).collect();
    diff(tasks, &order)
}

/// Whether the positions in `tasks` are exactly `0..tasks.len()`
pub fn is_dense(tasks: &[Task]) -> bool {
    let mut orders: Vec<usize> = tasks.iter().map(|task| task.list_order).collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(index, order)| index == *order)
}

fn diff(tasks: &[Task], order: &[usize]) -> Vec<Placement> {
    tasks
        .iter()
        .zip(order)
        .filter(|(task, order)| task.list_order != **order)
        .map(|(task, order)| Placement {
            task_id: task.id.clone(),
            list_order: *order,
        })
        .collect()
}

/// Applies ordering plans through a [`Storage`]
pub struct OrderEngine<'a> {
    store: &'a dyn Storage,
}

impl<'a> OrderEngine<'a> {
    pub fn new(store: &'a dyn Storage) -> Self {
        Self { store }
    }

    /// Position a new task appended to `list_id` would get.
    pub fn insert_position(&self, list_id: &str) -> Result<usize> {
        self.store.get_list(list_id)?;
        Ok(self.store.get_tasks_by_list(list_id)?.len())
    }

    /// Create a task at the end of its list.
    pub fn insert(&self, draft: TaskDraft) -> Result<Task> {
        let list_id = draft.list_id.clone();
        let _guard = self.store.lock_scope(&ScopeKey::list(&list_id))?;

        let position = self.insert_position(&list_id)?;
        let task = draft.into_task(position)?;
        self.store.insert_task(&task)?;

        info!(task = %task.id, list = %list_id, position, "inserted task");
        Ok(task)
    }

    /// Move a task to `target` within its list and return the list's tasks
    /// in their new order.
    pub fn reorder(&self, task_id: &str, list_id: &str, target: usize) -> Result<Vec<Task>> {
        let _guard = self.store.lock_scope(&ScopeKey::list(list_id))?;
        self.store.get_list(list_id)?;

        self.reorder_locked(task_id, list_id, target)?;
        self.store.get_tasks_by_list(list_id)
    }

    /// Move a task to the end of another list.
    ///
    /// Runs as two steps: the task is first reordered to the last slot of
    /// its current list, then reassigned. If the second step fails, the
    /// task stays in `from_list_id` at the last position and both lists
    /// remain dense.
    pub fn move_across_lists(
        &self,
        task_id: &str,
        from_list_id: &str,
        to_list_id: &str,
    ) -> Result<Task> {
        if from_list_id == to_list_id {
            return Err(Error::InvalidArgument(format!(
                "task {task_id} is already in list {to_list_id}"
            )));
        }

        let _guards = lock_scopes(
            self.store,
            &[ScopeKey::list(from_list_id), ScopeKey::list(to_list_id)],
        )?;
        self.store.get_list(from_list_id)?;
        self.store.get_list(to_list_id)?;

        let from_len = self.store.get_tasks_by_list(from_list_id)?.len();
        self.reorder_locked(task_id, from_list_id, from_len.saturating_sub(1))?;

        let position = self.store.get_tasks_by_list(to_list_id)?.len();
        if let Err(err) = self.store.update_task_list(task_id, to_list_id, position) {
            warn!(
                task = %task_id,
                from = %from_list_id,
                to = %to_list_id,
                error = %err,
                "move interrupted; task left at the end of its source list"
            );
            return Err(err);
        }

        info!(task = %task_id, from = %from_list_id, to = %to_list_id, position, "moved task");
        self.store.get_task(task_id)
    }

    /// Delete a task and close the gap it leaves.
    pub fn remove(&self, task_id: &str, list_id: &str) -> Result<Task> {
        let _guard = self.store.lock_scope(&ScopeKey::list(list_id))?;

        let tasks = self.store.get_tasks_by_list(list_id)?;
        let removed = tasks
            .iter()
            .find(|task| task.id == task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        self.store.delete_task(task_id)?;

        let remaining: Vec<Task> = tasks.into_iter().filter(|task| task.id != task_id).collect();
        self.apply(&compaction_plan(&remaining))?;

        info!(task = %task_id, list = %list_id, remaining = remaining.len(), "removed task");
        Ok(removed)
    }

    /// Re-densify a list, returning how many rows were rewritten.
    pub fn compact(&self, list_id: &str) -> Result<usize> {
        let _guard = self.store.lock_scope(&ScopeKey::list(list_id))?;
        self.store.get_list(list_id)?;

        let plan = compaction_plan(&self.store.get_tasks_by_list(list_id)?);
        self.apply(&plan)?;
        Ok(plan.len())
    }

    fn reorder_locked(&self, task_id: &str, list_id: &str, target: usize) -> Result<()> {
        let tasks = self.store.get_tasks_by_list(list_id)?;
        let plan = reorder_plan(&tasks, task_id, target)?;
        if plan.is_empty() {
            debug!(task = %task_id, list = %list_id, target, "reorder is a no-op");
            return Ok(());
        }
        self.apply(&plan)?;
        info!(task = %task_id, list = %list_id, target, changed = plan.len(), "reordered task");
        Ok(())
    }

    fn apply(&self, plan: &[Placement]) -> Result<()> {
        for placement in plan {
            debug!(task = %placement.task_id, list_order = placement.list_order, "writing position");
            self.store
                .update_task_order(&placement.task_id, placement.list_order)?;
        }
        Ok(())
    }
}
