//! Rendering command results for people and for scripts.
//!
//! Every command builds a [`Report`] for the terminal and hands its payload
//! to [`emit_success`]. With `--json` the payload goes out inside an
//! envelope tagged by `status`; the report contributes only its warnings
//! and hints.

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

const SCHEMA_VERSION: &str = "dogether.v1";

/// Global flags that take a value and must be skipped when guessing the
/// command name.
const VALUE_FLAGS: &[&str] = &["--config", "--as", "--data-dir"];

/// Commands that have subcommands
const GROUPS: &[&str] = &["user", "friend", "list", "task"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Terminal rendering of one command's result.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hints: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// A `key: value` line under the title. An empty value prints the key
    /// alone.
    pub fn field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// One row of a listing (a task, a friend, a list).
    pub fn line(&mut self, value: impl Into<String>) {
        self.lines.push(value.into());
    }

    pub fn warn(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    /// A command worth running next.
    pub fn hint(&mut self, value: impl Into<String>) {
        self.hints.push(value.into());
    }

    fn render(&self) -> String {
        let width = self
            .fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, _)| key.len())
            .max()
            .unwrap_or(0);
        let mut out = self.title.clone();

        for (key, value) in &self.fields {
            out.push('\n');
            if value.is_empty() {
                out.push_str(&format!("  {key}"));
            } else {
                out.push_str(&format!("  {key:<width$}  {value}"));
            }
        }
        if !self.lines.is_empty() {
            out.push('\n');
            for line in &self.lines {
                out.push_str(&format!("\n  {line}"));
            }
        }
        for warning in &self.warnings {
            out.push_str(&format!("\nwarning: {warning}"));
        }
        for hint in &self.hints {
            out.push_str(&format!("\nnext: {hint}"));
        }
        out
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "is_blank")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome<'a, T: Serialize> {
    Success {
        data: &'a T,
        #[serde(skip_serializing_if = "is_blank")]
        warnings: &'a [String],
    },
    Error {
        error: JsonError,
    },
}

fn is_blank(items: &&[String]) -> bool {
    items.is_empty()
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: Option<&Report>,
) -> Result<()> {
    if options.json {
        let (warnings, hints) = match report {
            Some(report) => (report.warnings.as_slice(), report.hints.as_slice()),
            None => (&[][..], &[][..]),
        };
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success { data, warnings },
            next_steps: hints,
        });
    }

    if let (false, Some(report)) = (options.quiet, report) {
        println!("{}", report.render());
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = recovery_hint(err);
    if json {
        let hints: Vec<String> = hint.into_iter().map(str::to_string).collect();
        return print_envelope::<()>(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Error {
                error: JsonError::from(err),
            },
            next_steps: &hints,
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Best-effort command label for error envelopes, taken from the raw
/// arguments because clap may have rejected them.
pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut positional = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        positional.push(arg);
        let wanted = if GROUPS.contains(&positional[0].as_str()) { 2 } else { 1 };
        if positional.len() == wanted {
            break;
        }
    }

    if positional.is_empty() {
        "dogether".to_string()
    } else {
        positional.join(" ")
    }
}

fn recovery_hint(err: &Error) -> Option<&'static str> {
    let hint = match err {
        Error::UserNotFound(_) => "dogether user find <username>",
        Error::ListNotFound(_) => "dogether list ls",
        Error::TaskNotFound(_) => "dogether task ls <list-id>",
        Error::AccessDenied(_) => "ask the list owner to add you as a member",
        Error::InvalidConfig(_) => "fix .dogether.toml then retry",
        Error::LockFailed(_) => "retry; another command is updating the same data",
        _ => return None,
    };
    Some(hint)
}
