//! Friend requests and friendships between two users
//!
//! A pending request from A to B is stored twice: `B ∈ A.outgoing_req` and
//! `A ∈ B.incoming_req`. A friendship is stored as `B ∈ A.friends` and
//! `A ∈ B.friends`. Only a fully mirrored entry counts; a half mirror is
//! what an interrupted transition leaves behind.
//!
//! Transitions are split in two parts. The `check_*` functions validate a
//! transition against freshly read rows; the `apply_*` functions mutate
//! in-memory copies using only insert-if-absent and remove-if-present, so
//! applying the same transition twice gives the same rows.
//! [`Relationships`] wraps both with the scope locks of both users and
//! persists the changed sets. Each store write replaces a whole set, so
//! every writer of a user's sets holds that user's scope; two transitions
//! that share a user (A→B and A→C) run one after the other.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::User;
use crate::storage::{lock_scopes, ScopeKey, Storage};

/// Relationship of `other` as seen from `viewer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipState {
    None,
    OutgoingPending,
    IncomingPending,
    Friends,
}

impl RelationshipState {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipState::None => "none",
            RelationshipState::OutgoingPending => "outgoing_pending",
            RelationshipState::IncomingPending => "incoming_pending",
            RelationshipState::Friends => "friends",
        }
    }
}

/// Whether a fully mirrored request from `sender` to `recipient` exists
pub fn is_pending(sender: &User, recipient: &User) -> bool {
    sender.outgoing_req.contains(&recipient.id) && recipient.incoming_req.contains(&sender.id)
}

/// Whether the friendship is recorded on both sides
pub fn are_friends(a: &User, b: &User) -> bool {
    a.friends.contains(&b.id) && b.friends.contains(&a.id)
}

/// Whether any request entry, mirrored or not, links the pair
fn has_request_residue(a: &User, b: &User) -> bool {
    a.outgoing_req.contains(&b.id)
        || a.incoming_req.contains(&b.id)
        || b.outgoing_req.contains(&a.id)
        || b.incoming_req.contains(&a.id)
}

pub fn state_between(viewer: &User, other: &User) -> RelationshipState {
    if are_friends(viewer, other) {
        RelationshipState::Friends
    } else if is_pending(viewer, other) {
        RelationshipState::OutgoingPending
    } else if is_pending(other, viewer) {
        RelationshipState::IncomingPending
    } else {
        RelationshipState::None
    }
}

fn ensure_distinct(a: &User, b: &User) -> Result<()> {
    if a.id == b.id {
        return Err(Error::InvalidArgument(
            "a user cannot have a relationship with themselves".to_string(),
        ));
    }
    Ok(())
}

pub fn check_send(sender: &User, recipient: &User) -> Result<()> {
    ensure_distinct(sender, recipient)?;
    if are_friends(sender, recipient) {
        return Err(Error::Conflict(format!(
            "{} and {} are already friends",
            sender.username, recipient.username
        )));
    }
    if is_pending(sender, recipient) || is_pending(recipient, sender) {
        return Err(Error::Conflict(format!(
            "a friend request between {} and {} is already pending",
            sender.username, recipient.username
        )));
    }
    Ok(())
}

pub fn check_accept(sender: &User, recipient: &User) -> Result<()> {
    ensure_distinct(sender, recipient)?;
    if !is_pending(sender, recipient) {
        return Err(Error::Conflict(format!(
            "no pending friend request from {} to {}",
            sender.username, recipient.username
        )));
    }
    Ok(())
}

pub fn check_cancel(a: &User, b: &User) -> Result<()> {
    ensure_distinct(a, b)?;
    if !has_request_residue(a, b) {
        return Err(Error::Conflict(format!(
            "no friend request between {} and {}",
            a.username, b.username
        )));
    }
    Ok(())
}

pub fn check_unfriend(a: &User, b: &User) -> Result<()> {
    ensure_distinct(a, b)?;
    if !a.friends.contains(&b.id) {
        return Err(Error::Conflict(format!(
            "{} and {} are not friends",
            a.username, b.username
        )));
    }
    Ok(())
}

pub fn apply_send(sender: &mut User, recipient: &mut User) {
    sender.outgoing_req.insert(recipient.id.clone());
    recipient.incoming_req.insert(sender.id.clone());
}

pub fn apply_accept(sender: &mut User, recipient: &mut User) {
    sender.outgoing_req.remove(&recipient.id);
    recipient.incoming_req.remove(&sender.id);
    sender.friends.insert(recipient.id.clone());
    recipient.friends.insert(sender.id.clone());
}

/// Clear every request entry between the pair, in both directions.
pub fn apply_cancel(a: &mut User, b: &mut User) {
    a.outgoing_req.remove(&b.id);
    a.incoming_req.remove(&b.id);
    b.outgoing_req.remove(&a.id);
    b.incoming_req.remove(&a.id);
}

pub fn apply_unfriend(a: &mut User, b: &mut User) {
    a.friends.remove(&b.id);
    b.friends.remove(&a.id);
}

/// Runs relationship transitions against a [`Storage`]
pub struct Relationships<'a> {
    store: &'a dyn Storage,
}

/// Which sets a persisted transition rewrites, in write order
#[derive(Clone, Copy)]
enum Write {
    Requests,
    Friends,
}

impl<'a> Relationships<'a> {
    pub fn new(store: &'a dyn Storage) -> Self {
        Self { store }
    }

    /// Current state of `other_id` from `viewer_id`'s side
    pub fn state(&self, viewer_id: &str, other_id: &str) -> Result<RelationshipState> {
        let viewer = self.store.get_user(viewer_id)?;
        let other = self.store.get_user(other_id)?;
        Ok(state_between(&viewer, &other))
    }

    /// Returns the updated `(sender, recipient)` rows.
    pub fn send_request(&self, sender_id: &str, recipient_id: &str) -> Result<(User, User)> {
        self.transition(
            "send",
            sender_id,
            recipient_id,
            check_send,
            apply_send,
            // Recipient first: a request is only visible once the sender's
            // outgoing entry completes the mirror.
            &[(1, Write::Requests), (0, Write::Requests)],
        )
    }

    /// Returns the updated `(sender, recipient)` rows.
    pub fn accept_request(&self, sender_id: &str, recipient_id: &str) -> Result<(User, User)> {
        self.transition(
            "accept",
            sender_id,
            recipient_id,
            check_accept,
            apply_accept,
            // Friends before requests: while the request is still fully
            // mirrored, a replay passes its check and completes the rest.
            &[
                (0, Write::Friends),
                (1, Write::Friends),
                (1, Write::Requests),
                (0, Write::Requests),
            ],
        )
    }

    pub fn cancel_request(&self, a_id: &str, b_id: &str) -> Result<(User, User)> {
        self.transition(
            "cancel",
            a_id,
            b_id,
            check_cancel,
            apply_cancel,
            &[(0, Write::Requests), (1, Write::Requests)],
        )
    }

    pub fn remove_friend(&self, a_id: &str, b_id: &str) -> Result<(User, User)> {
        self.transition(
            "unfriend",
            a_id,
            b_id,
            check_unfriend,
            apply_unfriend,
            &[(0, Write::Friends), (1, Write::Friends)],
        )
    }

    fn transition(
        &self,
        name: &str,
        first_id: &str,
        second_id: &str,
        check: fn(&User, &User) -> Result<()>,
        apply: fn(&mut User, &mut User),
        writes: &[(usize, Write)],
    ) -> Result<(User, User)> {
        if first_id == second_id {
            return Err(Error::InvalidArgument(
                "a user cannot have a relationship with themselves".to_string(),
            ));
        }

        let _guards = lock_scopes(
            self.store,
            &[ScopeKey::user(first_id), ScopeKey::user(second_id)],
        )?;

        let before = [self.store.get_user(first_id)?, self.store.get_user(second_id)?];
        check(&before[0], &before[1])?;

        let mut after = before.clone();
        {
            let [first, second] = &mut after;
            apply(first, second);
        }

        for (done, (side, write)) in writes.iter().enumerate() {
            let (old, new) = (&before[*side], &after[*side]);
            let result = match write {
                Write::Requests
                    if old.outgoing_req != new.outgoing_req
                        || old.incoming_req != new.incoming_req =>
                {
                    debug!(transition = name, user = %new.id, "writing request sets");
                    self.store
                        .update_user_request_sets(&new.id, &new.outgoing_req, &new.incoming_req)
                }
                Write::Friends if old.friends != new.friends => {
                    debug!(transition = name, user = %new.id, "writing friends");
                    self.store.update_user_friends(&new.id, &new.friends)
                }
                _ => Ok(()),
            };
            if let Err(err) = result {
                if done > 0 {
                    warn!(
                        transition = name,
                        first = %first_id,
                        second = %second_id,
                        completed_writes = done,
                        error = %err,
                        "transition interrupted; pair is partially updated"
                    );
                }
                return Err(err);
            }
        }

        info!(transition = name, first = %first_id, second = %second_id, "relationship updated");
        let [first, second] = after;
        Ok((first, second))
    }
}
