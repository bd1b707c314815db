//! dogether task command implementation

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Task, TaskDraft, TaskEdit};
use crate::output::{emit_success, Report};

use super::Context;

/// Options for `dogether task new`
pub struct NewOptions {
    pub list: String,
    pub title: String,
    pub tags: Vec<String>,
    pub priority: Option<u8>,
    pub due: Option<DateTime<Utc>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Options for `dogether task edit`
pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub clear_tags: bool,
    pub priority: Option<u8>,
    pub clear_priority: bool,
    pub due: Option<DateTime<Utc>>,
    pub clear_due: bool,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub clear_plan: bool,
}

impl EditOptions {
    fn into_edit(self) -> TaskEdit {
        TaskEdit {
            title: self.title,
            tags: if self.clear_tags {
                Some(Vec::new())
            } else if self.tags.is_empty() {
                None
            } else {
                Some(self.tags)
            },
            priority: clearable(self.priority, self.clear_priority),
            due: clearable(self.due, self.clear_due),
            planned_start: clearable(self.start, self.clear_plan),
            planned_end: clearable(self.end, self.clear_plan),
        }
    }
}

fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

#[derive(serde::Serialize)]
struct TasksReport<'a> {
    list: &'a str,
    tasks: &'a [Task],
}

#[derive(serde::Serialize)]
struct TagsReport {
    list: String,
    tags: Vec<String>,
}

fn task_line(task: &Task) -> String {
    let check = if task.completed { "x" } else { " " };
    let mut line = format!("{}. [{check}] {} {}", task.list_order, task.id, task.title);
    if let Some(priority) = task.priority {
        line.push_str(&format!(" (p{priority})"));
    }
    if let Some(due) = task.due {
        line.push_str(&format!(" (due: {})", due.format("%Y-%m-%d")));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{tag}"));
    }
    line
}

fn describe(view: &mut Report, task: &Task) {
    view.field("id", task.id.clone());
    view.field("list", task.list_id.clone());
    view.field("position", task.list_order.to_string());
    view.field("completed", task.completed.to_string());
    if let Some(priority) = task.priority {
        view.field("priority", priority.to_string());
    }
    if !task.tags.is_empty() {
        let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();
        view.field("tags", tags.join(", "));
    }
    if let Some(due) = task.due {
        view.field("due", due.to_rfc3339());
    }
    if let Some(start) = task.planned_start {
        view.field("planned start", start.to_rfc3339());
    }
    if let Some(end) = task.planned_end {
        view.field("planned end", end.to_rfc3339());
    }
}

pub fn run_new(ctx: &Context, options: NewOptions) -> Result<()> {
    let actor = ctx.acting_user()?;
    let draft = TaskDraft {
        owner: actor.clone(),
        title: options.title,
        tags: options.tags,
        list_id: options.list,
        priority: options.priority,
        due: options.due,
        planned_start: options.start,
        planned_end: options.end,
    };
    let task = ctx.planner()?.create_task(&actor, draft)?;

    let mut view = Report::new(format!("dogether task new: {}", task.title));
    describe(&mut view, &task);
    view.hint(format!("dogether task ls {}", task.list_id));

    emit_success(ctx.output, "task new", &task, Some(&view))
}

pub fn run_ls(ctx: &Context, list_id: &str, tag: Option<&str>) -> Result<()> {
    let actor = ctx.acting_user()?;
    let tasks = ctx.planner()?.tasks(&actor, list_id, tag)?;

    let mut view = Report::new("Tasks");
    view.field("Total", tasks.len().to_string());
    if let Some(tag) = tag {
        view.field("Tag", tag);
    }
    for task in &tasks {
        view.line(task_line(task));
    }

    let report = TasksReport {
        list: list_id,
        tasks: &tasks,
    };
    emit_success(ctx.output, "task ls", &report, Some(&view))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let task = ctx.planner()?.task(&actor, id)?;

    let mut view = Report::new(format!("Task {}", task.title));
    describe(&mut view, &task);

    emit_success(ctx.output, "task show", &task, Some(&view))
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    let actor = ctx.acting_user()?;
    let id = options.id.clone();
    let task = ctx.planner()?.edit_task(&actor, &id, &options.into_edit())?;

    let mut view = Report::new(format!("dogether task edit: {}", task.title));
    describe(&mut view, &task);

    emit_success(ctx.output, "task edit", &task, Some(&view))
}

pub fn run_done(ctx: &Context, id: &str, completed: bool) -> Result<()> {
    let actor = ctx.acting_user()?;
    let task = ctx.planner()?.set_completed(&actor, id, completed)?;

    let state = if task.completed { "done" } else { "not done" };
    let mut view = Report::new(format!("dogether task done: {} is {state}", task.title));
    view.field("id", task.id.clone());

    emit_success(ctx.output, "task done", &task, Some(&view))
}

pub fn run_mv(ctx: &Context, id: &str, to: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let task = ctx.planner()?.move_task(&actor, id, to)?;

    let mut view = Report::new(format!("dogether task mv: {}", task.title));
    describe(&mut view, &task);
    view.hint(format!("dogether task ls {}", task.list_id));

    emit_success(ctx.output, "task mv", &task, Some(&view))
}

pub fn run_reorder(ctx: &Context, id: &str, position: usize) -> Result<()> {
    let actor = ctx.acting_user()?;
    let tasks = ctx.planner()?.reorder_task(&actor, id, position)?;
    let list_id = tasks
        .first()
        .map(|task| task.list_id.clone())
        .unwrap_or_default();

    let mut view = Report::new(format!("dogether task reorder: {id} -> {position}"));
    for task in &tasks {
        view.line(task_line(task));
    }

    let report = TasksReport {
        list: &list_id,
        tasks: &tasks,
    };
    emit_success(ctx.output, "task reorder", &report, Some(&view))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let task = ctx.planner()?.delete_task(&actor, id)?;

    let mut view = Report::new(format!("dogether task rm: {}", task.title));
    view.field("id", task.id.clone());
    view.field("list", task.list_id.clone());

    emit_success(ctx.output, "task rm", &task, Some(&view))
}

pub fn run_tags(ctx: &Context, list_id: &str) -> Result<()> {
    let actor = ctx.acting_user()?;
    let tags = ctx.planner()?.tag_suggestions(&actor, list_id)?;

    let mut view = Report::new(format!("dogether task tags: {} tags", tags.len()));
    for tag in &tags {
        view.line(tag.clone());
    }

    let report = TagsReport {
        list: list_id.to_string(),
        tags,
    };
    emit_success(ctx.output, "task tags", &report, Some(&view))
}
