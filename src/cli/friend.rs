//! dogether friend command implementation

use crate::error::Result;
use crate::model::User;
use crate::output::{emit_success, Report};

use super::Context;

#[derive(Debug, Clone, Copy)]
pub enum Transition {
    Send,
    Accept,
    Cancel,
    Remove,
}

impl Transition {
    fn command(self) -> &'static str {
        match self {
            Transition::Send => "friend send",
            Transition::Accept => "friend accept",
            Transition::Cancel => "friend cancel",
            Transition::Remove => "friend remove",
        }
    }
}

#[derive(serde::Serialize)]
struct TransitionReport {
    other: String,
    relationship: &'static str,
    user: User,
}

pub fn run_transition(ctx: &Context, transition: Transition, other_id: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let planner = ctx.planner()?;
    let other_id = other_id.trim();

    let user = match transition {
        Transition::Send => planner.send_request(&actor, other_id)?,
        Transition::Accept => planner.accept_request(&actor, other_id)?,
        Transition::Cancel => planner.cancel_request(&actor, other_id)?,
        Transition::Remove => planner.remove_friend(&actor, other_id)?,
    };
    let state = planner.relationship(&actor, other_id)?;

    let mut view = Report::new(format!("dogether {}: {other_id}", transition.command()));
    view.field("relationship", state.as_str());
    if let Transition::Send = transition {
        view.hint(format!("ask {other_id} to run: dogether friend accept {actor}"));
    }

    let report = TransitionReport {
        other: other_id.to_string(),
        relationship: state.as_str(),
        user,
    };
    emit_success(ctx.output, transition.command(), &report, Some(&view))
}

pub fn run_ls(ctx: &Context) -> Result<()> {
    let actor = ctx.acting_user()?;
    let overview = ctx.planner()?.friend_overview(&actor)?;

    let mut view = Report::new(format!(
        "dogether friend ls: {} friends",
        overview.friends.len()
    ));
    view.field("incoming", overview.incoming.len().to_string());
    view.field("outgoing", overview.outgoing.len().to_string());
    for friend in &overview.friends {
        view.line(format!("{} ({})", friend.username, friend.id));
    }
    for user in &overview.incoming {
        view.line(format!("{} ({}) wants to be friends", user.username, user.id));
        view.hint(format!("dogether friend accept {}", user.id));
    }
    for user in &overview.outgoing {
        view.line(format!("waiting on {} ({})", user.username, user.id));
    }

    emit_success(ctx.output, "friend ls", &overview, Some(&view))
}
