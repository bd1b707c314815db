//! dogether - shared task lists with friends
//!
//! This library provides the core functionality for the dogether CLI.
//!
//! # Core Concepts
//!
//! - **Dense ordering**: the tasks of a list always occupy positions
//!   `0..n`, across insert, reorder, move and delete
//! - **Mirrored relationships**: a friend request lives on both users, and
//!   accepting it turns both sides into a symmetric friendship
//! - **List access**: public lists are readable by anyone, private lists
//!   only by their owner and members; only members and the owner edit
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.dogether.toml`
//! - `error`: Error types, kinds and exit codes
//! - `model`: Users, lists, tasks and their field rules
//! - `storage`: Row-level storage trait with memory and JSON-file stores
//! - `lock`: File locking, atomic writes and in-process keyed locks
//! - `ordering`: Position engine for a list's tasks
//! - `relationship`: Friend request / friendship state machine
//! - `policy`: Read, write and owner checks on lists
//! - `service`: The `Planner` facade used by front ends
//! - `actor`: Acting user resolution
//! - `output`: Human and JSON output envelopes

pub mod actor;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod model;
pub mod ordering;
pub mod output;
pub mod policy;
pub mod relationship;
pub mod service;
pub mod storage;

pub use error::{Error, Result};
pub use service::Planner;
