#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dogether::model::{Task, TaskDraft, TaskList, User};
use dogether::ordering::is_dense;
use dogether::storage::{MemoryStore, ScopeGuard, ScopeKey, Storage};
use dogether::Planner;

/// A planner over a fresh in-memory store, with seeding helpers.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub planner: Planner,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let planner = Planner::new(store.clone());
        Self { store, planner }
    }

    /// Like [`Fixture::new`], but every user read through the planner
    /// sleeps for `delay` first, widening any read-then-write window.
    pub fn with_slow_user_reads(delay: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let slow = SlowUserReads {
            inner: store.clone(),
            delay,
        };
        let planner = Planner::new(Arc::new(slow));
        Self { store, planner }
    }

    /// Register `count` users named `{prefix}0`, `{prefix}1`, ...
    pub fn users(&self, prefix: &str, count: usize) -> Vec<User> {
        (0..count)
            .map(|i| self.user(&format!("{prefix}{i}")))
            .collect()
    }

    pub fn user(&self, username: &str) -> User {
        self.planner.register(username).expect("register user")
    }

    pub fn list(&self, owner: &User, name: &str, private: bool) -> TaskList {
        self.planner
            .create_list(&owner.id, &owner.id, name, private)
            .expect("create list")
    }

    pub fn task(&self, owner: &User, list: &TaskList, title: &str) -> Task {
        self.planner
            .create_task(&owner.id, draft(owner, list, title))
            .expect("create task")
    }

    /// Seed `count` tasks titled `T0`, `T1`, ...
    pub fn tasks(&self, owner: &User, list: &TaskList, count: usize) -> Vec<Task> {
        (0..count)
            .map(|i| self.task(owner, list, &format!("T{i}")))
            .collect()
    }

    /// Titles of a list's tasks in position order
    pub fn titles(&self, list: &TaskList) -> Vec<String> {
        self.rows(list).into_iter().map(|task| task.title).collect()
    }

    pub fn rows(&self, list: &TaskList) -> Vec<Task> {
        self.store.get_tasks_by_list(&list.id).expect("read tasks")
    }

    pub fn assert_dense(&self, list: &TaskList) {
        let rows = self.rows(list);
        assert!(is_dense(&rows), "list {} not dense: {:?}", list.name, orders(&rows));
    }

    pub fn fresh(&self, user: &User) -> User {
        self.store.get_user(&user.id).expect("read user")
    }
}

/// Assert `a` and `b` are friends on both sides with no request left
/// between them.
pub fn assert_friends(a: &User, b: &User) {
    assert!(a.friends.contains(&b.id), "{} lost friend {}", a.username, b.username);
    assert!(b.friends.contains(&a.id), "{} lost friend {}", b.username, a.username);
    for (x, y) in [(a, b), (b, a)] {
        assert!(!x.outgoing_req.contains(&y.id), "{} kept outgoing {}", x.username, y.username);
        assert!(!x.incoming_req.contains(&y.id), "{} kept incoming {}", x.username, y.username);
    }
}

/// Assert a request from `sender` to `recipient` is stored on both sides.
pub fn assert_pending(sender: &User, recipient: &User) {
    assert!(
        sender.outgoing_req.contains(&recipient.id),
        "{} lost outgoing {}",
        sender.username,
        recipient.username
    );
    assert!(
        recipient.incoming_req.contains(&sender.id),
        "{} lost incoming {}",
        recipient.username,
        sender.username
    );
}

/// A store whose user reads are slow; everything else goes straight through.
pub struct SlowUserReads {
    inner: Arc<MemoryStore>,
    delay: Duration,
}

impl Storage for SlowUserReads {
    fn get_user(&self, id: &str) -> dogether::Result<User> {
        let user = self.inner.get_user(id);
        thread::sleep(self.delay);
        user
    }

    fn find_user_by_username(&self, username: &str) -> dogether::Result<Option<User>> {
        self.inner.find_user_by_username(username)
    }

    fn insert_user(&self, user: &User) -> dogether::Result<()> {
        self.inner.insert_user(user)
    }

    fn update_user_request_sets(
        &self,
        id: &str,
        outgoing: &BTreeSet<String>,
        incoming: &BTreeSet<String>,
    ) -> dogether::Result<()> {
        self.inner.update_user_request_sets(id, outgoing, incoming)
    }

    fn update_user_friends(&self, id: &str, friends: &BTreeSet<String>) -> dogether::Result<()> {
        self.inner.update_user_friends(id, friends)
    }

    fn get_list(&self, id: &str) -> dogether::Result<TaskList> {
        self.inner.get_list(id)
    }

    fn insert_list(&self, list: &TaskList) -> dogether::Result<()> {
        self.inner.insert_list(list)
    }

    fn update_list(&self, list: &TaskList) -> dogether::Result<()> {
        self.inner.update_list(list)
    }

    fn delete_list(&self, id: &str) -> dogether::Result<()> {
        self.inner.delete_list(id)
    }

    fn lists_for_user(&self, user_id: &str) -> dogether::Result<Vec<TaskList>> {
        self.inner.lists_for_user(user_id)
    }

    fn get_task(&self, id: &str) -> dogether::Result<Task> {
        self.inner.get_task(id)
    }

    fn get_tasks_by_list(&self, list_id: &str) -> dogether::Result<Vec<Task>> {
        self.inner.get_tasks_by_list(list_id)
    }

    fn insert_task(&self, task: &Task) -> dogether::Result<()> {
        self.inner.insert_task(task)
    }

    fn update_task(&self, task: &Task) -> dogether::Result<()> {
        self.inner.update_task(task)
    }

    fn update_task_order(&self, id: &str, list_order: usize) -> dogether::Result<()> {
        self.inner.update_task_order(id, list_order)
    }

    fn update_task_list(&self, id: &str, list_id: &str, list_order: usize) -> dogether::Result<()> {
        self.inner.update_task_list(id, list_id, list_order)
    }

    fn delete_task(&self, id: &str) -> dogether::Result<()> {
        self.inner.delete_task(id)
    }

    fn delete_tasks_by_list(&self, list_id: &str) -> dogether::Result<usize> {
        self.inner.delete_tasks_by_list(list_id)
    }

    fn lock_scope(&self, scope: &ScopeKey) -> dogether::Result<ScopeGuard> {
        self.inner.lock_scope(scope)
    }
}

pub fn draft(owner: &User, list: &TaskList, title: &str) -> TaskDraft {
    TaskDraft {
        owner: owner.id.clone(),
        title: title.to_string(),
        list_id: list.id.clone(),
        ..TaskDraft::default()
    }
}

pub fn orders(tasks: &[Task]) -> Vec<(String, usize)> {
    tasks
        .iter()
        .map(|task| (task.title.clone(), task.list_order))
        .collect()
}
