//! Storage collaborator for dogether
//!
//! The [`Storage`] trait is the row-level interface every component reads
//! and writes through. Two implementations ship with the crate:
//!
//! - [`memory::MemoryStore`]: process-local maps, used by tests and the
//!   `memory` backend
//! - [`file::FileStore`]: JSON tables under a data directory
//!
//! ```text
//! <data_dir>/
//!   users.json          # id -> User
//!   lists.json          # id -> TaskList
//!   tasks.json          # id -> Task
//!   locks/              # one lock file per serialization scope
//!   user                # acting user persisted by `dogether login`
//! ```
//!
//! Missing rows surface as the matching not-found error
//! (`UserNotFound`, `ListNotFound`, `TaskNotFound`); everything else the
//! store cannot do is a storage-kind error.

pub mod file;
pub mod memory;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::error::Result;
use crate::lock::{FileLock, KeyGuard};
use crate::model::{Task, TaskList, User};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Which store to open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Memory,
}

/// A serialization scope: all mutations of one list's ordering or
/// membership, or all writes to one user's relationship sets.
///
/// A relationship transition holds the scopes of both users, so two
/// transitions sharing a user never interleave their set writes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKey {
    List(String),
    User(String),
}

impl ScopeKey {
    pub fn list(id: impl Into<String>) -> Self {
        ScopeKey::List(id.into())
    }

    pub fn user(id: impl Into<String>) -> Self {
        ScopeKey::User(id.into())
    }

    /// Stable name, usable as a lock key or file stem
    pub fn name(&self) -> String {
        match self {
            ScopeKey::List(id) => format!("list-{id}"),
            ScopeKey::User(id) => format!("user-{id}"),
        }
    }
}

/// Held scope; released on drop
#[derive(Debug)]
pub enum ScopeGuard {
    InProcess(KeyGuard),
    File(FileLock),
}

/// Row-level storage operations
///
/// No operation spans more than one row except the bulk reads and
/// [`Storage::delete_tasks_by_list`]. Callers that need several writes to
/// appear ordered against each other hold the relevant [`ScopeKey`].
pub trait Storage: Send + Sync {
    // Users

    fn get_user(&self, id: &str) -> Result<User>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a new user. Fails with `Conflict` if the username is taken.
    fn insert_user(&self, user: &User) -> Result<()>;

    /// Replace both request sets. Callers hold the user's scope.
    fn update_user_request_sets(
        &self,
        id: &str,
        outgoing: &BTreeSet<String>,
        incoming: &BTreeSet<String>,
    ) -> Result<()>;

    /// Replace the friends set. Callers hold the user's scope.
    fn update_user_friends(&self, id: &str, friends: &BTreeSet<String>) -> Result<()>;

    // Lists

    fn get_list(&self, id: &str) -> Result<TaskList>;

    fn insert_list(&self, list: &TaskList) -> Result<()>;

    /// Overwrite name, visibility and members of an existing list. Callers
    /// hold the list's scope from the read this row came from.
    fn update_list(&self, list: &TaskList) -> Result<()>;

    fn delete_list(&self, id: &str) -> Result<()>;

    /// Lists the user owns or is a member of
    fn lists_for_user(&self, user_id: &str) -> Result<Vec<TaskList>>;

    // Tasks

    fn get_task(&self, id: &str) -> Result<Task>;

    /// All tasks of a list, sorted by `list_order` (ties by id).
    fn get_tasks_by_list(&self, list_id: &str) -> Result<Vec<Task>>;

    fn insert_task(&self, task: &Task) -> Result<()>;

    /// Overwrite the content fields of a task. `list_id` and `list_order`
    /// are kept as stored; only the order engine moves tasks.
    fn update_task(&self, task: &Task) -> Result<()>;

    fn update_task_order(&self, id: &str, list_order: usize) -> Result<()>;

    fn update_task_list(&self, id: &str, list_id: &str, list_order: usize) -> Result<()>;

    fn delete_task(&self, id: &str) -> Result<()>;

    /// Delete every task of a list, returning how many were removed.
    fn delete_tasks_by_list(&self, list_id: &str) -> Result<usize>;

    // Serialization

    /// Block until `scope` is exclusively held by the caller.
    fn lock_scope(&self, scope: &ScopeKey) -> Result<ScopeGuard>;
}

/// Acquire several scopes in a canonical order so two callers locking the
/// same set never deadlock. Duplicates are taken once.
pub fn lock_scopes(store: &dyn Storage, scopes: &[ScopeKey]) -> Result<Vec<ScopeGuard>> {
    let ordered: BTreeSet<&ScopeKey> = scopes.iter().collect();
    ordered
        .into_iter()
        .map(|scope| store.lock_scope(scope))
        .collect()
}

/// Open the store described by `config`
pub fn open(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    match config.backend {
        Backend::Memory => Ok(Arc::new(MemoryStore::with_lock_timeout(
            config.lock_timeout_ms,
        ))),
        Backend::File => {
            let store = FileStore::new(config.resolved_data_dir(), config.lock_timeout_ms);
            store.init()?;
            Ok(Arc::new(store))
        }
    }
}

/// Path of the file holding the acting user for a data directory
pub fn session_file(data_dir: &Path) -> PathBuf {
    data_dir.join("user")
}
