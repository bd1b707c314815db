//! dogether list command implementation

use crate::error::Result;
use crate::model::{TaskList, User};
use crate::output::{emit_success, Report};
use crate::service::ListEdit;

use super::Context;

#[derive(serde::Serialize)]
struct MembersReport {
    list: String,
    owner: String,
    members: Vec<User>,
}

#[derive(serde::Serialize)]
struct DeleteReport {
    list: String,
    tasks_deleted: usize,
}

#[derive(serde::Serialize)]
struct RepairReport {
    list: String,
    rewritten: usize,
}

fn describe(view: &mut Report, list: &TaskList) {
    view.field("id", list.id.clone());
    view.field("owner", list.owner.clone());
    view.field("visibility", if list.private { "private" } else { "public" });
    if !list.members.is_empty() {
        view.field("members", list.members.len().to_string());
    }
}

pub fn run_new(ctx: &Context, name: &str, private: bool) -> Result<()> {
    let actor = ctx.acting_user()?;
    let list = ctx.planner()?.create_list(&actor, &actor, name, private)?;

    let mut view = Report::new(format!("dogether list new: {}", list.name));
    describe(&mut view, &list);
    view.hint(format!("dogether task new {} \"<title>\"", list.id));

    emit_success(ctx.output, "list new", &list, Some(&view))
}

pub fn run_ls(ctx: &Context, owner: Option<&str>) -> Result<()> {
    let actor = ctx.acting_user()?;
    let owner = owner.map(str::trim).unwrap_or(&actor);
    let lists = ctx.planner()?.lists_for(&actor, owner)?;

    let mut view = Report::new(format!("dogether list ls: {} lists", lists.len()));
    for list in &lists {
        let marker = if list.private { " (private)" } else { "" };
        view.line(format!("{}{marker} [{}]", list.name, list.id));
    }
    if lists.is_empty() && owner == actor {
        view.hint("dogether list new <name>");
    }

    emit_success(ctx.output, "list ls", &lists, Some(&view))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let list = ctx.planner()?.list(&actor, id)?;

    let mut view = Report::new(format!("dogether list: {}", list.name));
    describe(&mut view, &list);
    view.hint(format!("dogether task ls {}", list.id));

    emit_success(ctx.output, "list show", &list, Some(&view))
}

pub fn run_edit(ctx: &Context, id: &str, edit: ListEdit) -> Result<()> {
    let actor = ctx.acting_user()?;
    let list = ctx.planner()?.edit_list(&actor, id, &edit)?;

    let mut view = Report::new(format!("dogether list edit: {}", list.name));
    describe(&mut view, &list);

    emit_success(ctx.output, "list edit", &list, Some(&view))
}

pub fn run_members(ctx: &Context, id: &str, set: Option<Vec<String>>) -> Result<()> {
    let actor = ctx.acting_user()?;
    let planner = ctx.planner()?;

    let (command, list) = match set {
        Some(members) => ("list members set", planner.edit_members(&actor, id, &members)?),
        None => ("list members", planner.list(&actor, id)?),
    };
    let members = planner.list_members(&actor, &list.id)?;

    let mut view = Report::new(format!(
        "dogether {command}: {} ({} members)",
        list.name,
        members.len()
    ));
    view.field("owner", list.owner.clone());
    for member in &members {
        view.line(format!("{} ({})", member.username, member.id));
    }

    let report = MembersReport {
        list: list.id,
        owner: list.owner,
        members,
    };
    emit_success(ctx.output, command, &report, Some(&view))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let tasks_deleted = ctx.planner()?.delete_list(&actor, id)?;

    let mut view = Report::new(format!("dogether list rm: {id}"));
    view.field("tasks deleted", tasks_deleted.to_string());

    let report = DeleteReport {
        list: id.to_string(),
        tasks_deleted,
    };
    emit_success(ctx.output, "list rm", &report, Some(&view))
}

pub fn run_repair(ctx: &Context, id: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let rewritten = ctx.planner()?.repair_list(&actor, id)?;

    let header = if rewritten == 0 {
        format!("dogether list repair: {id} already dense")
    } else {
        format!("dogether list repair: {id}")
    };
    let mut view = Report::new(header);
    view.field("positions rewritten", rewritten.to_string());

    let report = RepairReport {
        list: id.to_string(),
        rewritten,
    };
    emit_success(ctx.output, "list repair", &report, Some(&view))
}
