//! dogether user command implementation

use crate::error::Result;
use crate::model::User;
use crate::output::{emit_success, Report};

use super::Context;

fn profile(view: &mut Report, user: &User) {
    view.field("id", user.id.clone());
    view.field("username", user.username.clone());
    if !user.friends.is_empty() {
        view.field("friends", user.friends.len().to_string());
    }
    for id in &user.incoming_req {
        view.line(format!("request from {id}"));
    }
    for id in &user.outgoing_req {
        view.line(format!("request to {id}"));
    }
}

pub fn run_register(ctx: &Context, username: &str) -> Result<()> {
    let user = ctx.planner()?.register(username)?;

    let mut view = Report::new(format!("dogether user register: {}", user.username));
    profile(&mut view, &user);
    view.hint(format!("dogether login {}", user.id));

    emit_success(ctx.output, "user register", &user, Some(&view))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let viewer = ctx.acting_user()?;
    let user = ctx.planner()?.profile(&viewer, id)?;

    let mut view = Report::new(format!("dogether user: {}", user.username));
    profile(&mut view, &user);

    emit_success(ctx.output, "user show", &user, Some(&view))
}

pub fn run_find(ctx: &Context, username: &str) -> Result<()> {
    let viewer = ctx.acting_user()?;
    let user = ctx.planner()?.find_by_username(&viewer, username)?;

    let mut view = Report::new(format!("dogether user: {}", user.username));
    profile(&mut view, &user);
    if user.id != viewer && !user.friends.contains(&viewer) {
        view.hint(format!("dogether friend send {}", user.id));
    }

    emit_success(ctx.output, "user find", &user, Some(&view))
}
