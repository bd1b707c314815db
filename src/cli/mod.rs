//! Command-line interface for dogether
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::actor;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::service::Planner;
use crate::storage;

mod friend;
mod init;
mod list;
mod session;
mod task;
mod user;

/// dogether - shared task lists with friends
///
/// Keep ordered task lists, share them with friends, and track who may
/// read or edit each list.
#[derive(Parser, Debug)]
#[command(name = "dogether")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./.dogether.toml)
    #[arg(long, global = true, env = "DOGETHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory, overriding storage.data_dir
    #[arg(long, global = true, env = "DOGETHER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Act as this user id
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    pub as_user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory
    Init,

    /// Show the acting user
    Whoami,

    /// Remember a user id as the acting user
    Login {
        /// User id to act as
        user_id: String,
    },

    /// User accounts
    #[command(subcommand)]
    User(UserCommands),

    /// Friend requests and friendships
    #[command(subcommand)]
    Friend(FriendCommands),

    /// Task lists
    #[command(subcommand)]
    List(ListCommands),

    /// Tasks
    #[command(subcommand)]
    Task(TaskCommands),
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user
    Register {
        /// Unique username (no whitespace)
        username: String,
    },

    /// Show a user by id
    Show {
        /// User id
        id: String,
    },

    /// Look a user up by username
    Find {
        /// Username
        username: String,
    },
}

/// Friend subcommands
#[derive(Subcommand, Debug)]
pub enum FriendCommands {
    /// Send a friend request
    Send {
        /// Recipient user id
        user_id: String,
    },

    /// Accept a friend request someone sent you
    Accept {
        /// Sender user id
        user_id: String,
    },

    /// Withdraw or decline a friend request
    Cancel {
        /// The other user's id
        user_id: String,
    },

    /// End a friendship
    Remove {
        /// Friend's user id
        user_id: String,
    },

    /// Show friends and pending requests
    #[command(alias = "list")]
    Ls,
}

/// List subcommands
#[derive(Subcommand, Debug)]
pub enum ListCommands {
    /// Create a list owned by the acting user
    New {
        /// List name
        name: String,

        /// Only the owner and members can see the list
        #[arg(long)]
        private: bool,
    },

    /// Show lists owned or joined by a user
    Ls {
        /// Whose lists to show (defaults to the acting user)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show one list
    Show {
        /// List id
        id: String,
    },

    /// Rename a list or change its visibility
    Edit {
        /// List id
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// Set visibility
        #[arg(long, value_name = "BOOL")]
        private: Option<bool>,
    },

    /// Show or replace the members of a list
    Members {
        /// List id
        id: String,

        /// Replace the members with these user ids (empty clears them)
        #[arg(long, num_args = 0.., value_name = "USER_ID")]
        set: Option<Vec<String>>,
    },

    /// Delete a list and its tasks
    Rm {
        /// List id
        id: String,
    },

    /// Close gaps in a list's task positions
    Repair {
        /// List id
        id: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task to the end of a list
    New {
        /// List id
        list: String,

        /// Task title
        title: String,

        /// Tag (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Priority 1-3
        #[arg(long)]
        priority: Option<u8>,

        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_when)]
        due: Option<DateTime<Utc>>,

        /// Planned start (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_when)]
        start: Option<DateTime<Utc>>,

        /// Planned end (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_when)]
        end: Option<DateTime<Utc>>,
    },

    /// Show the tasks of a list in order
    Ls {
        /// List id
        list: String,

        /// Only tasks with a tag matching this glob
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one task
    Show {
        /// Task id
        id: String,
    },

    /// Change a task's fields
    Edit {
        /// Task id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// Replace the tags (repeatable)
        #[arg(long = "tag", value_name = "TAG", conflicts_with = "clear_tags")]
        tags: Vec<String>,

        /// Remove all tags
        #[arg(long)]
        clear_tags: bool,

        /// Priority 1-3
        #[arg(long, conflicts_with = "clear_priority")]
        priority: Option<u8>,

        /// Unset the priority
        #[arg(long)]
        clear_priority: bool,

        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_when, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,

        /// Unset the due date
        #[arg(long)]
        clear_due: bool,

        /// Planned start (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_when, conflicts_with = "clear_plan")]
        start: Option<DateTime<Utc>>,

        /// Planned end (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_when, conflicts_with = "clear_plan")]
        end: Option<DateTime<Utc>>,

        /// Unset planned start and end
        #[arg(long)]
        clear_plan: bool,
    },

    /// Mark a task completed
    Done {
        /// Task id
        id: String,

        /// Mark it not completed instead
        #[arg(long)]
        undo: bool,
    },

    /// Move a task to the end of another list
    Mv {
        /// Task id
        id: String,

        /// Destination list id
        #[arg(long)]
        to: String,
    },

    /// Move a task to a zero-based position within its list
    Reorder {
        /// Task id
        id: String,

        /// New position
        position: usize,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },

    /// Tags used in a list
    Tags {
        /// List id
        list: String,
    },
}

/// Parse a timestamp given as RFC 3339 or as a bare date (midnight UTC).
pub fn parse_when(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got '{raw}'"))
}

/// Global state shared by every command
pub struct Context {
    pub config: Config,
    pub data_dir: PathBuf,
    pub as_user: Option<String>,
    pub output: OutputOptions,
}

impl Context {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Config::load(path)?,
            None => {
                let cwd = std::env::current_dir()?;
                Config::load_from_dir(&cwd)
            }
        };
        if let Some(dir) = &cli.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
        let data_dir = config.storage.resolved_data_dir();

        Ok(Self {
            config,
            data_dir,
            as_user: cli.as_user.clone(),
            output: OutputOptions {
                json: cli.json,
                quiet: cli.quiet,
            },
        })
    }

    pub fn planner(&self) -> Result<Planner> {
        Ok(Planner::new(storage::open(&self.config.storage)?))
    }

    /// The acting user, if one is selected
    pub fn current_user(&self) -> Result<Option<String>> {
        actor::resolve_user(&self.data_dir, &self.config, self.as_user.as_deref())
    }

    /// The acting user, or `InvalidArgument` when nobody is signed in
    pub fn acting_user(&self) -> Result<String> {
        actor::require_user(&self.data_dir, &self.config, self.as_user.as_deref())
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::from_cli(&self)?;
        match self.command {
            Commands::Init => init::run(&ctx),
            Commands::Whoami => session::run_whoami(&ctx),
            Commands::Login { user_id } => session::run_login(&ctx, &user_id),
            Commands::User(cmd) => match cmd {
                UserCommands::Register { username } => user::run_register(&ctx, &username),
                UserCommands::Show { id } => user::run_show(&ctx, &id),
                UserCommands::Find { username } => user::run_find(&ctx, &username),
            },
            Commands::Friend(cmd) => match cmd {
                FriendCommands::Send { user_id } => {
                    friend::run_transition(&ctx, friend::Transition::Send, &user_id)
                }
                FriendCommands::Accept { user_id } => {
                    friend::run_transition(&ctx, friend::Transition::Accept, &user_id)
                }
                FriendCommands::Cancel { user_id } => {
                    friend::run_transition(&ctx, friend::Transition::Cancel, &user_id)
                }
                FriendCommands::Remove { user_id } => {
                    friend::run_transition(&ctx, friend::Transition::Remove, &user_id)
                }
                FriendCommands::Ls => friend::run_ls(&ctx),
            },
            Commands::List(cmd) => match cmd {
                ListCommands::New { name, private } => list::run_new(&ctx, &name, private),
                ListCommands::Ls { owner } => list::run_ls(&ctx, owner.as_deref()),
                ListCommands::Show { id } => list::run_show(&ctx, &id),
                ListCommands::Edit { id, name, private } => {
                    list::run_edit(&ctx, &id, crate::service::ListEdit { name, private })
                }
                ListCommands::Members { id, set } => list::run_members(&ctx, &id, set),
                ListCommands::Rm { id } => list::run_rm(&ctx, &id),
                ListCommands::Repair { id } => list::run_repair(&ctx, &id),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    list,
                    title,
                    tags,
                    priority,
                    due,
                    start,
                    end,
                } => task::run_new(
                    &ctx,
                    task::NewOptions {
                        list,
                        title,
                        tags,
                        priority,
                        due,
                        start,
                        end,
                    },
                ),
                TaskCommands::Ls { list, tag } => task::run_ls(&ctx, &list, tag.as_deref()),
                TaskCommands::Show { id } => task::run_show(&ctx, &id),
                TaskCommands::Edit {
                    id,
                    title,
                    tags,
                    clear_tags,
                    priority,
                    clear_priority,
                    due,
                    clear_due,
                    start,
                    end,
                    clear_plan,
                } => task::run_edit(
                    &ctx,
                    task::EditOptions {
                        id,
                        title,
                        tags,
                        clear_tags,
                        priority,
                        clear_priority,
                        due,
                        clear_due,
                        start,
                        end,
                        clear_plan,
                    },
                ),
                TaskCommands::Done { id, undo } => task::run_done(&ctx, &id, !undo),
                TaskCommands::Mv { id, to } => task::run_mv(&ctx, &id, &to),
                TaskCommands::Reorder { id, position } => task::run_reorder(&ctx, &id, position),
                TaskCommands::Rm { id } => task::run_rm(&ctx, &id),
                TaskCommands::Tags { list } => task::run_tags(&ctx, &list),
            },
        }
    }
}
