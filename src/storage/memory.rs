//! In-memory store
//!
//! All rows live in one `Mutex`; each trait call holds it for exactly one
//! row operation, which gives the same row-level atomicity as the file
//! store. Scopes are named keys in a [`KeyedLocks`] table.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{ScopeGuard, ScopeKey, Storage};
use crate::error::{Error, Result};
use crate::lock::{KeyedLocks, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{Task, TaskList, User};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, User>,
    lists: BTreeMap<String, TaskList>,
    tasks: BTreeMap<String, Task>,
    /// Writes left before the next one fails; `None` disables injection.
    writes_until_failure: Option<usize>,
}

impl Tables {
    /// Count down the injected failure budget for one write
    fn admit_write(&mut self) -> Result<()> {
        match self.writes_until_failure {
            Some(0) => {
                self.writes_until_failure = None;
                Err(Error::StorageFailed("injected write failure".to_string()))
            }
            Some(n) => {
                self.writes_until_failure = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    locks: KeyedLocks,
    lock_timeout_ms: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT_MS)
    }

    pub fn with_lock_timeout(lock_timeout_ms: u64) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            locks: KeyedLocks::new(),
            lock_timeout_ms,
        }
    }

    /// Let `successful` more writes through, then fail the next one.
    ///
    /// Used to exercise the documented partial-failure states.
    pub fn fail_after_writes(&self, successful: usize) {
        self.tables().writes_until_failure = Some(successful);
    }

    /// Total number of stored tasks
    pub fn task_count(&self) -> usize {
        self.tables().tasks.len()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStore {
    fn get_user(&self, id: &str) -> Result<User> {
        self.tables()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables();
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(Error::Conflict(format!(
                "username already taken: {}",
                user.username
            )));
        }
        tables.admit_write()?;
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn update_user_request_sets(
        &self,
        id: &str,
        outgoing: &BTreeSet<String>,
        incoming: &BTreeSet<String>,
    ) -> Result<()> {
        let mut tables = self.tables();
        if !tables.users.contains_key(id) {
            return Err(Error::UserNotFound(id.to_string()));
        }
        tables.admit_write()?;
        if let Some(user) = tables.users.get_mut(id) {
            user.outgoing_req = outgoing.clone();
            user.incoming_req = incoming.clone();
        }
        Ok(())
    }

    fn update_user_friends(&self, id: &str, friends: &BTreeSet<String>) -> Result<()> {
        let mut tables = self.tables();
        if !tables.users.contains_key(id) {
            return Err(Error::UserNotFound(id.to_string()));
        }
        tables.admit_write()?;
        if let Some(user) = tables.users.get_mut(id) {
            user.friends = friends.clone();
        }
        Ok(())
    }

    fn get_list(&self, id: &str) -> Result<TaskList> {
        self.tables()
            .lists
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ListNotFound(id.to_string()))
    }

    fn insert_list(&self, list: &TaskList) -> Result<()> {
        let mut tables = self.tables();
        tables.admit_write()?;
        tables.lists.insert(list.id.clone(), list.clone());
        Ok(())
    }

    fn update_list(&self, list: &TaskList) -> Result<()> {
        let mut tables = self.tables();
        if !tables.lists.contains_key(&list.id) {
            return Err(Error::ListNotFound(list.id.clone()));
        }
        tables.admit_write()?;
        if let Some(stored) = tables.lists.get_mut(&list.id) {
            stored.name = list.name.clone();
            stored.private = list.private;
            stored.members = list.members.clone();
        }
        Ok(())
    }

    fn delete_list(&self, id: &str) -> Result<()> {
        let mut tables = self.tables();
        if !tables.lists.contains_key(id) {
            return Err(Error::ListNotFound(id.to_string()));
        }
        tables.admit_write()?;
        tables.lists.remove(id);
        Ok(())
    }

    fn lists_for_user(&self, user_id: &str) -> Result<Vec<TaskList>> {
        Ok(self
            .tables()
            .lists
            .values()
            .filter(|list| list.owner == user_id || list.members.contains(user_id))
            .cloned()
            .collect())
    }

    fn get_task(&self, id: &str) -> Result<Task> {
        self.tables()
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    fn get_tasks_by_list(&self, list_id: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tables()
            .tasks
            .values()
            .filter(|task| task.list_id == list_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.list_order.cmp(&b.list_order).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    fn insert_task(&self, task: &Task) -> Result<()> {
        let mut tables = self.tables();
        tables.admit_write()?;
        tables.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let mut tables = self.tables();
        if !tables.tasks.contains_key(&task.id) {
            return Err(Error::TaskNotFound(task.id.clone()));
        }
        tables.admit_write()?;
        if let Some(stored) = tables.tasks.get_mut(&task.id) {
            let (list_id, list_order) = (stored.list_id.clone(), stored.list_order);
            *stored = task.clone();
            stored.list_id = list_id;
            stored.list_order = list_order;
        }
        Ok(())
    }

    fn update_task_order(&self, id: &str, list_order: usize) -> Result<()> {
        let mut tables = self.tables();
        if !tables.tasks.contains_key(id) {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        tables.admit_write()?;
        if let Some(task) = tables.tasks.get_mut(id) {
            task.list_order = list_order;
        }
        Ok(())
    }

    fn update_task_list(&self, id: &str, list_id: &str, list_order: usize) -> Result<()> {
        let mut tables = self.tables();
        if !tables.tasks.contains_key(id) {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        tables.admit_write()?;
        if let Some(task) = tables.tasks.get_mut(id) {
            task.list_id = list_id.to_string();
            task.list_order = list_order;
        }
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        let mut tables = self.tables();
        if !tables.tasks.contains_key(id) {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        tables.admit_write()?;
        tables.tasks.remove(id);
        Ok(())
    }

    fn delete_tasks_by_list(&self, list_id: &str) -> Result<usize> {
        let mut tables = self.tables();
        tables.admit_write()?;
        let before = tables.tasks.len();
        tables.tasks.retain(|_, task| task.list_id != list_id);
        Ok(before - tables.tasks.len())
    }

    fn lock_scope(&self, scope: &ScopeKey) -> Result<ScopeGuard> {
        let name = scope.name();
        debug!(scope = %name, "acquiring scope");
        let guard = self.locks.acquire(&name, self.lock_timeout_ms)?;
        Ok(ScopeGuard::InProcess(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskDraft;

    fn task(list: &str, order: usize, title: &str) -> Task {
        TaskDraft {
            owner: "u".to_string(),
            title: title.to_string(),
            list_id: list.to_string(),
            ..TaskDraft::default()
        }
        .into_task(order)
        .unwrap()
    }

    #[test]
    fn tasks_come_back_sorted_by_order() {
        let store = MemoryStore::new();
        store.insert_task(&task("l", 2, "c")).unwrap();
        store.insert_task(&task("l", 0, "a")).unwrap();
        store.insert_task(&task("l", 1, "b")).unwrap();
        store.insert_task(&task("other", 0, "x")).unwrap();

        let titles: Vec<_> = store
            .get_tasks_by_list("l")
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_task_keeps_position() {
        let store = MemoryStore::new();
        let original = task("l", 3, "a");
        store.insert_task(&original).unwrap();

        let mut edited = original.clone();
        edited.title = "renamed".to_string();
        edited.list_order = 0;
        edited.list_id = "elsewhere".to_string();
        store.update_task(&edited).unwrap();

        let stored = store.get_task(&original.id).unwrap();
        assert_eq!(stored.title, "renamed");
        assert_eq!(stored.list_order, 3);
        assert_eq!(stored.list_id, "l");
    }

    #[test]
    fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(&User::new("alice")).unwrap();
        let err = store.insert_user(&User::new("alice")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn missing_rows_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_user("x"), Err(Error::UserNotFound(_))));
        assert!(matches!(store.get_list("x"), Err(Error::ListNotFound(_))));
        assert!(matches!(
            store.update_task_order("x", 0),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn injected_failure_hits_the_right_write() {
        let store = MemoryStore::new();
        store.fail_after_writes(1);
        store.insert_task(&task("l", 0, "a")).unwrap();
        let err = store.insert_task(&task("l", 1, "b")).unwrap_err();
        assert!(matches!(err, Error::StorageFailed(_)));
        // One-shot
        store.insert_task(&task("l", 1, "c")).unwrap();
        assert_eq!(store.task_count(), 2);
    }
}
