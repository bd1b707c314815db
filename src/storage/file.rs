//! JSON-file store
//!
//! Each table is one JSON object keyed by row id. Every row operation is a
//! locked read-modify-write: take `<table>.json.lock`, read, mutate, write a
//! temp file and rename it over the table. Readers never see partial
//! writes, and separate processes sharing a data directory stay consistent
//! row by row.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::{ScopeGuard, ScopeKey, Storage};
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::model::{Task, TaskList, User};

type Table<T> = BTreeMap<String, T>;

#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock_timeout_ms,
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn lists_file(&self) -> PathBuf {
        self.data_dir.join("lists.json")
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.data_dir.join("locks")
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    /// Create the data directory and empty tables that do not exist yet
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.locks_dir())?;

        for path in [self.users_file(), self.lists_file(), self.tasks_file()] {
            if !path.exists() {
                write_json(&path, &Table::<serde_json::Value>::new())?;
            }
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.users_file().exists() && self.lists_file().exists() && self.tasks_file().exists()
    }

    // =========================================================================
    // Table access
    // =========================================================================

    fn read_table<T: DeserializeOwned>(&self, path: &Path) -> Result<Table<T>> {
        if !path.exists() {
            return Ok(Table::new());
        }
        read_json(path)
    }

    fn update_table<T, R, F>(&self, path: &Path, f: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut Table<T>) -> Result<R>,
    {
        let _lock = FileLock::acquire(lock::lock_path_for(path), self.lock_timeout_ms)?;

        let mut table = self.read_table(path)?;
        let result = f(&mut table)?;
        write_json(path, &table)?;

        Ok(result)
    }

    fn update_user<F>(&self, id: &str, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut User),
    {
        self.update_table(&self.users_file(), |users: &mut Table<User>| {
            let user = users
                .get_mut(id)
                .ok_or_else(|| Error::UserNotFound(id.to_string()))?;
            mutator(user);
            Ok(())
        })
    }

    fn update_task_row<F>(&self, id: &str, mutator: F) -> Result<()>
    where
        F: FnOnce(&mut Task),
    {
        self.update_table(&self.tasks_file(), |tasks: &mut Table<Task>| {
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            mutator(task);
            Ok(())
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    lock::write_atomic(path, json.as_bytes())
}

impl Storage for FileStore {
    fn get_user(&self, id: &str) -> Result<User> {
        self.read_table::<User>(&self.users_file())?
            .remove(id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .read_table::<User>(&self.users_file())?
            .into_values()
            .find(|user| user.username == username))
    }

    fn insert_user(&self, user: &User) -> Result<()> {
        self.update_table(&self.users_file(), |users: &mut Table<User>| {
            if users.values().any(|u| u.username == user.username) {
                return Err(Error::Conflict(format!(
                    "username already taken: {}",
                    user.username
                )));
            }
            users.insert(user.id.clone(), user.clone());
            Ok(())
        })
    }

    fn update_user_request_sets(
        &self,
        id: &str,
        outgoing: &BTreeSet<String>,
        incoming: &BTreeSet<String>,
    ) -> Result<()> {
        self.update_user(id, |user| {
            user.outgoing_req = outgoing.clone();
            user.incoming_req = incoming.clone();
        })
    }

    fn update_user_friends(&self, id: &str, friends: &BTreeSet<String>) -> Result<()> {
        self.update_user(id, |user| user.friends = friends.clone())
    }

    fn get_list(&self, id: &str) -> Result<TaskList> {
        self.read_table::<TaskList>(&self.lists_file())?
            .remove(id)
            .ok_or_else(|| Error::ListNotFound(id.to_string()))
    }

    fn insert_list(&self, list: &TaskList) -> Result<()> {
        self.update_table(&self.lists_file(), |lists: &mut Table<TaskList>| {
            lists.insert(list.id.clone(), list.clone());
            Ok(())
        })
    }

    fn update_list(&self, list: &TaskList) -> Result<()> {
        self.update_table(&self.lists_file(), |lists: &mut Table<TaskList>| {
            let stored = lists
                .get_mut(&list.id)
                .ok_or_else(|| Error::ListNotFound(list.id.clone()))?;
            stored.name = list.name.clone();
            stored.private = list.private;
            stored.members = list.members.clone();
            Ok(())
        })
    }

    fn delete_list(&self, id: &str) -> Result<()> {
        self.update_table(&self.lists_file(), |lists: &mut Table<TaskList>| {
            lists
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| Error::ListNotFound(id.to_string()))
        })
    }

    fn lists_for_user(&self, user_id: &str) -> Result<Vec<TaskList>> {
        Ok(self
            .read_table::<TaskList>(&self.lists_file())?
            .into_values()
            .filter(|list| list.owner == user_id || list.members.contains(user_id))
            .collect())
    }

    fn get_task(&self, id: &str) -> Result<Task> {
        self.read_table::<Task>(&self.tasks_file())?
            .remove(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    fn get_tasks_by_list(&self, list_id: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .read_table::<Task>(&self.tasks_file())?
            .into_values()
            .filter(|task| task.list_id == list_id)
            .collect();
        tasks.sort_by(|a, b| a.list_order.cmp(&b.list_order).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    fn insert_task(&self, task: &Task) -> Result<()> {
        self.update_table(&self.tasks_file(), |tasks: &mut Table<Task>| {
            tasks.insert(task.id.clone(), task.clone());
            Ok(())
        })
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        self.update_task_row(&task.id, |stored| {
            let (list_id, list_order) = (stored.list_id.clone(), stored.list_order);
            *stored = task.clone();
            stored.list_id = list_id;
            stored.list_order = list_order;
        })
    }

    fn update_task_order(&self, id: &str, list_order: usize) -> Result<()> {
        self.update_task_row(id, |task| task.list_order = list_order)
    }

    fn update_task_list(&self, id: &str, list_id: &str, list_order: usize) -> Result<()> {
        self.update_task_row(id, |task| {
            task.list_id = list_id.to_string();
            task.list_order = list_order;
        })
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.update_table(&self.tasks_file(), |tasks: &mut Table<Task>| {
            tasks
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))
        })
    }

    fn delete_tasks_by_list(&self, list_id: &str) -> Result<usize> {
        self.update_table(&self.tasks_file(), |tasks: &mut Table<Task>| {
            let before = tasks.len();
            tasks.retain(|_, task| task.list_id != list_id);
            Ok(before - tasks.len())
        })
    }

    fn lock_scope(&self, scope: &ScopeKey) -> Result<ScopeGuard> {
        let path = self.locks_dir().join(format!("{}.lock", scope.name()));
        debug!(path = %path.display(), "acquiring scope");
        let lock = FileLock::acquire(&path, self.lock_timeout_ms)?;
        Ok(ScopeGuard::File(lock))
    }
}
