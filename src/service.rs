//! Application facade
//!
//! [`Planner`] is what the command line (or any other front end) calls. Each
//! operation loads the rows it needs, checks the acting user against the
//! authorization policy, then hands off to the order engine or the
//! relationship state machine. Nothing here assigns `list_order` or touches
//! request sets directly.

use std::collections::BTreeSet;
use std::sync::Arc;

use glob::Pattern;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    normalize_list_name, normalize_username, ListSummary, Task, TaskDraft, TaskEdit, TaskList,
    User,
};
use crate::ordering::OrderEngine;
use crate::policy::{self, Access};
use crate::relationship::{RelationshipState, Relationships};
use crate::storage::{ScopeKey, Storage};

/// Changes to a list's own fields; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ListEdit {
    pub name: Option<String>,
    pub private: Option<bool>,
}

/// A user's friends and open requests, as public profiles
#[derive(Debug, Clone, Serialize)]
pub struct FriendOverview {
    pub friends: Vec<User>,
    pub incoming: Vec<User>,
    pub outgoing: Vec<User>,
}

#[derive(Clone)]
pub struct Planner {
    store: Arc<dyn Storage>,
}

impl Planner {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn Storage {
        self.store.as_ref()
    }

    fn engine(&self) -> OrderEngine<'_> {
        OrderEngine::new(self.store.as_ref())
    }

    fn relationships(&self) -> Relationships<'_> {
        Relationships::new(self.store.as_ref())
    }

    /// Load a list and check `user_id` may access it at `access`.
    fn authorized_list(&self, list_id: &str, user_id: &str, access: Access) -> Result<TaskList> {
        let list = self.store.get_list(list_id)?;
        policy::authorize(&list, user_id, access)?;
        debug!(list = %list_id, user = %user_id, ?access, "authorized");
        Ok(list)
    }

    /// Load a task and check `user_id` may access its list at `access`.
    fn authorized_task(&self, task_id: &str, user_id: &str, access: Access) -> Result<Task> {
        let task = self.store.get_task(task_id)?;
        self.authorized_list(&task.list_id, user_id, access)?;
        Ok(task)
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn register(&self, username: &str) -> Result<User> {
        let user = User::new(normalize_username(username)?);
        self.store.insert_user(&user)?;
        info!(user = %user.id, username = %user.username, "registered user");
        Ok(user)
    }

    pub fn user(&self, id: &str) -> Result<User> {
        self.store.get_user(id)
    }

    /// Look a user up by name.
    ///
    /// Relationship sets are only shown to the user themselves and to
    /// their friends.
    pub fn find_by_username(&self, viewer_id: &str, username: &str) -> Result<User> {
        let user = self
            .store
            .find_user_by_username(username.trim())?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))?;
        Ok(visible_to(viewer_id, user))
    }

    /// Look a user up by id, masked the same way as [`Self::find_by_username`].
    pub fn profile(&self, viewer_id: &str, user_id: &str) -> Result<User> {
        let user = self.store.get_user(user_id)?;
        Ok(visible_to(viewer_id, user))
    }

    pub fn friends(&self, user_id: &str) -> Result<Vec<User>> {
        let user = self.store.get_user(user_id)?;
        self.profiles(&user.friends)
    }

    pub fn friend_overview(&self, user_id: &str) -> Result<FriendOverview> {
        let user = self.store.get_user(user_id)?;
        Ok(FriendOverview {
            friends: self.profiles(&user.friends)?,
            incoming: self.profiles(&user.incoming_req)?,
            outgoing: self.profiles(&user.outgoing_req)?,
        })
    }

    fn profiles(&self, ids: &BTreeSet<String>) -> Result<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_user(id) {
                Ok(user) => users.push(user.public_view()),
                Err(Error::UserNotFound(_)) => {
                    warn!(user = %id, "dangling user reference");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(users)
    }

    // =========================================================================
    // Friend transitions
    // =========================================================================

    pub fn relationship(&self, viewer_id: &str, other_id: &str) -> Result<RelationshipState> {
        self.relationships().state(viewer_id, other_id)
    }

    /// Returns the sender's updated row.
    pub fn send_request(&self, sender_id: &str, recipient_id: &str) -> Result<User> {
        let (sender, _) = self.relationships().send_request(sender_id, recipient_id)?;
        Ok(sender)
    }

    /// `recipient_id` accepts the request `sender_id` sent them. Returns
    /// the recipient's updated row.
    pub fn accept_request(&self, recipient_id: &str, sender_id: &str) -> Result<User> {
        let (_, recipient) = self.relationships().accept_request(sender_id, recipient_id)?;
        Ok(recipient)
    }

    /// Withdraw or decline whatever request links the pair.
    pub fn cancel_request(&self, user_id: &str, other_id: &str) -> Result<User> {
        let (user, _) = self.relationships().cancel_request(user_id, other_id)?;
        Ok(user)
    }

    pub fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<User> {
        let (user, _) = self.relationships().remove_friend(user_id, friend_id)?;
        Ok(user)
    }

    // =========================================================================
    // Lists
    // =========================================================================

    pub fn create_list(
        &self,
        actor_id: &str,
        owner_id: &str,
        name: &str,
        private: bool,
    ) -> Result<TaskList> {
        if actor_id != owner_id {
            return Err(Error::AccessDenied(format!(
                "user {actor_id} may not create lists for {owner_id}"
            )));
        }
        self.store.get_user(owner_id)?;

        let list = TaskList::new(normalize_list_name(name)?, owner_id, private);
        self.store.insert_list(&list)?;
        info!(list = %list.id, owner = %owner_id, private, "created list");
        Ok(list)
    }

    pub fn list(&self, viewer_id: &str, list_id: &str) -> Result<TaskList> {
        self.authorized_list(list_id, viewer_id, Access::Read)
    }

    /// Lists owned or joined by `owner_id`. Other viewers only see the
    /// ones they may read.
    pub fn lists_for(&self, viewer_id: &str, owner_id: &str) -> Result<Vec<ListSummary>> {
        self.store.get_user(owner_id)?;

        let mut lists: Vec<TaskList> = self.store.lists_for_user(owner_id)?;
        if viewer_id != owner_id {
            lists.retain(|list| policy::has_read_permission(list, viewer_id));
        }
        lists.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        Ok(lists.iter().map(ListSummary::from).collect())
    }

    pub fn edit_list(&self, actor_id: &str, list_id: &str, edit: &ListEdit) -> Result<TaskList> {
        if edit.name.is_none() && edit.private.is_none() {
            return Err(Error::InvalidArgument("nothing to change".to_string()));
        }

        // `update_list` rewrites the whole row; hold the list across the
        // read and the write.
        let _guard = self.store.lock_scope(&ScopeKey::list(list_id))?;
        let mut list = self.authorized_list(list_id, actor_id, Access::Own)?;

        if let Some(name) = &edit.name {
            list.name = normalize_list_name(name)?;
        }
        if let Some(private) = edit.private {
            list.private = private;
        }
        self.store.update_list(&list)?;
        info!(list = %list_id, "edited list");
        Ok(list)
    }

    /// Replace the member set. Duplicates collapse, the owner is never a
    /// member of their own list, and every id must name an existing user.
    pub fn edit_members(
        &self,
        actor_id: &str,
        list_id: &str,
        members: &[String],
    ) -> Result<TaskList> {
        let _guard = self.store.lock_scope(&ScopeKey::list(list_id))?;
        let mut list = self.authorized_list(list_id, actor_id, Access::Own)?;

        let members: BTreeSet<String> = members
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && *id != list.owner)
            .map(str::to_string)
            .collect();
        for id in &members {
            self.store.get_user(id)?;
        }

        list.members = members;
        self.store.update_list(&list)?;
        info!(list = %list_id, members = list.members.len(), "edited members");
        Ok(list)
    }

    pub fn list_members(&self, viewer_id: &str, list_id: &str) -> Result<Vec<User>> {
        let list = self.authorized_list(list_id, viewer_id, Access::Read)?;
        self.profiles(&list.members)
    }

    /// Delete a list and all of its tasks. Returns the number of tasks
    /// removed.
    pub fn delete_list(&self, actor_id: &str, list_id: &str) -> Result<usize> {
        self.authorized_list(list_id, actor_id, Access::Own)?;

        let _guard = self.store.lock_scope(&ScopeKey::list(list_id))?;
        let removed = self.store.delete_tasks_by_list(list_id)?;
        self.store.delete_list(list_id)?;

        info!(list = %list_id, tasks = removed, "deleted list");
        Ok(removed)
    }

    /// Close any gaps in a list's positions. Returns the rows rewritten.
    pub fn repair_list(&self, actor_id: &str, list_id: &str) -> Result<usize> {
        self.authorized_list(list_id, actor_id, Access::Write)?;
        self.engine().compact(list_id)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn create_task(&self, actor_id: &str, draft: TaskDraft) -> Result<Task> {
        if actor_id != draft.owner {
            return Err(Error::AccessDenied(format!(
                "user {actor_id} may not create tasks for {}",
                draft.owner
            )));
        }
        self.authorized_list(&draft.list_id, actor_id, Access::Write)?;
        self.engine().insert(draft)
    }

    pub fn task(&self, viewer_id: &str, task_id: &str) -> Result<Task> {
        self.authorized_task(task_id, viewer_id, Access::Read)
    }

    /// Tasks of a list in position order, optionally only those with a tag
    /// matching `tag_pattern` (a glob such as `work*`).
    pub fn tasks(
        &self,
        viewer_id: &str,
        list_id: &str,
        tag_pattern: Option<&str>,
    ) -> Result<Vec<Task>> {
        self.authorized_list(list_id, viewer_id, Access::Read)?;
        let tasks = self.store.get_tasks_by_list(list_id)?;

        let Some(raw) = tag_pattern else {
            return Ok(tasks);
        };
        let pattern = Pattern::new(raw)
            .map_err(|err| Error::InvalidArgument(format!("invalid tag pattern '{raw}': {err}")))?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.tags.iter().any(|tag| pattern.matches(tag)))
            .collect())
    }

    pub fn edit_task(&self, actor_id: &str, task_id: &str, edit: &TaskEdit) -> Result<Task> {
        if edit.is_empty() {
            return Err(Error::InvalidArgument("nothing to change".to_string()));
        }
        let mut task = self.authorized_task(task_id, actor_id, Access::Write)?;
        edit.apply(&mut task)?;
        self.store.update_task(&task)?;
        info!(task = %task_id, "edited task");
        Ok(task)
    }

    pub fn set_completed(&self, actor_id: &str, task_id: &str, completed: bool) -> Result<Task> {
        let mut task = self.authorized_task(task_id, actor_id, Access::Write)?;
        if task.completed != completed {
            task.completed = completed;
            self.store.update_task(&task)?;
            info!(task = %task_id, completed, "updated completion");
        }
        Ok(task)
    }

    pub fn delete_task(&self, actor_id: &str, task_id: &str) -> Result<Task> {
        let task = self.authorized_task(task_id, actor_id, Access::Write)?;
        self.engine().remove(task_id, &task.list_id)
    }

    /// Move a task to `position` within its list; returns the list in its
    /// new order.
    pub fn reorder_task(&self, actor_id: &str, task_id: &str, position: usize) -> Result<Vec<Task>> {
        let task = self.authorized_task(task_id, actor_id, Access::Write)?;
        self.engine().reorder(task_id, &task.list_id, position)
    }

    /// Move a task to the end of another list. Needs write access to both.
    pub fn move_task(&self, actor_id: &str, task_id: &str, to_list_id: &str) -> Result<Task> {
        let task = self.authorized_task(task_id, actor_id, Access::Write)?;
        self.authorized_list(to_list_id, actor_id, Access::Write)?;
        self.engine()
            .move_across_lists(task_id, &task.list_id, to_list_id)
    }

    /// Distinct tags used in a list, sorted
    pub fn tag_suggestions(&self, viewer_id: &str, list_id: &str) -> Result<Vec<String>> {
        self.authorized_list(list_id, viewer_id, Access::Read)?;
        let tags: BTreeSet<String> = self
            .store
            .get_tasks_by_list(list_id)?
            .into_iter()
            .flat_map(|task| task.tags)
            .collect();
        Ok(tags.into_iter().collect())
    }
}

fn visible_to(viewer_id: &str, user: User) -> User {
    if user.id == viewer_id || user.friends.contains(viewer_id) {
        user
    } else {
        user.public_view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn planner() -> Planner {
        Planner::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn list_creation_requires_matching_owner() {
        let planner = planner();
        let alice = planner.register("alice").unwrap();
        let bob = planner.register("bob").unwrap();

        let err = planner
            .create_list(&bob.id, &alice.id, "chores", false)
            .unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));

        let list = planner
            .create_list(&alice.id, &alice.id, " chores ", false)
            .unwrap();
        assert_eq!(list.name, "chores");
    }

    #[test]
    fn find_by_username_masks_strangers() {
        let planner = planner();
        let alice = planner.register("alice").unwrap();
        let bob = planner.register("bob").unwrap();
        let carol = planner.register("carol").unwrap();

        planner.send_request(&alice.id, &bob.id).unwrap();
        planner.accept_request(&bob.id, &alice.id).unwrap();

        let seen_by_bob = planner.find_by_username(&bob.id, "alice").unwrap();
        assert!(seen_by_bob.friends.contains(&bob.id));

        let seen_by_carol = planner.find_by_username(&carol.id, "alice").unwrap();
        assert!(seen_by_carol.friends.is_empty());
    }

    #[test]
    fn members_are_deduplicated_and_exclude_owner() {
        let planner = planner();
        let alice = planner.register("alice").unwrap();
        let bob = planner.register("bob").unwrap();
        let list = planner.create_list(&alice.id, &alice.id, "trip", true).unwrap();

        let edited = planner
            .edit_members(
                &alice.id,
                &list.id,
                &[bob.id.clone(), bob.id.clone(), alice.id.clone()],
            )
            .unwrap();
        assert_eq!(edited.members.len(), 1);
        assert!(edited.members.contains(&bob.id));

        let err = planner
            .edit_members(&alice.id, &list.id, &["ghost".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[test]
    fn tag_filter_uses_globs() {
        let planner = planner();
        let alice = planner.register("alice").unwrap();
        let list = planner.create_list(&alice.id, &alice.id, "l", false).unwrap();
        for (title, tag) in [("a", "work-email"), ("b", "home"), ("c", "workout")] {
            planner
                .create_task(
                    &alice.id,
                    TaskDraft {
                        owner: alice.id.clone(),
                        title: title.to_string(),
                        tags: vec![tag.to_string()],
                        list_id: list.id.clone(),
                        ..TaskDraft::default()
                    },
                )
                .unwrap();
        }

        let work: Vec<_> = planner
            .tasks(&alice.id, &list.id, Some("work*"))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(work, vec!["a", "c"]);

        assert!(matches!(
            planner.tasks(&alice.id, &list.id, Some("[")),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(
            planner.tag_suggestions(&alice.id, &list.id).unwrap(),
            vec!["home", "work-email", "workout"]
        );
    }
}
