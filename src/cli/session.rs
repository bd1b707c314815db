//! dogether whoami / login command implementation

use std::path::PathBuf;

use crate::actor;
use crate::error::{Error, Result};
use crate::output::{emit_success, Report};
use crate::storage;

use super::Context;

#[derive(serde::Serialize)]
struct WhoamiReport {
    user_id: Option<String>,
    username: Option<String>,
}

#[derive(serde::Serialize)]
struct LoginReport {
    user_id: String,
    username: String,
    path: PathBuf,
}

pub fn run_whoami(ctx: &Context) -> Result<()> {
    let user_id = ctx.current_user()?;

    let mut view;
    let username = match &user_id {
        Some(id) => match ctx.planner()?.user(id) {
            Ok(user) => {
                view = Report::new(format!("dogether whoami: {}", user.username));
                view.field("id", id.clone());
                Some(user.username)
            }
            Err(Error::UserNotFound(_)) => {
                view = Report::new(format!("dogether whoami: {id}"));
                view.warn(format!("user {id} does not exist in this data dir"));
                view.hint("dogether user register <username>");
                None
            }
            Err(err) => return Err(err),
        },
        None => {
            view = Report::new("dogether whoami: not signed in");
            view.hint("dogether login <user-id>");
            None
        }
    };

    let report = WhoamiReport { user_id, username };
    emit_success(ctx.output, "whoami", &report, Some(&view))
}

pub fn run_login(ctx: &Context, user_id: &str) -> Result<()> {
    let user = ctx.planner()?.user(user_id.trim())?;
    actor::persist_user(&ctx.data_dir, &user.id)?;

    let report = LoginReport {
        user_id: user.id.clone(),
        username: user.username.clone(),
        path: storage::session_file(&ctx.data_dir),
    };

    let mut view = Report::new(format!("dogether login: {}", user.username));
    view.field("id", user.id);
    view.hint("dogether list ls");

    emit_success(ctx.output, "login", &report, Some(&view))
}
