//! Acting user resolution.
//!
//! Resolution order:
//! 1) CLI --as (explicit)
//! 2) DOGETHER_USER environment variable
//! 3) Persisted session in `<data_dir>/user`
//! 4) Config default (user.default)
//!
//! An empty result means nobody is signed in.

use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock;
use crate::storage;

/// Environment variable naming the acting user
pub const USER_ENV: &str = "DOGETHER_USER";

/// Resolve the acting user id, if any.
pub fn resolve_user(
    data_dir: &Path,
    config: &Config,
    cli_user: Option<&str>,
) -> Result<Option<String>> {
    if let Some(user) = non_empty(cli_user) {
        return Ok(Some(user.to_string()));
    }

    if let Ok(env_user) = std::env::var(USER_ENV) {
        if let Some(user) = non_empty(Some(env_user.as_str())) {
            return Ok(Some(user.to_string()));
        }
    }

    if let Some(user) = load_persisted_user(data_dir)? {
        return Ok(Some(user));
    }

    Ok(non_empty(Some(config.user.default.as_str())).map(str::to_string))
}

/// Resolve the acting user or fail with a hint to sign in.
pub fn require_user(
    data_dir: &Path,
    config: &Config,
    cli_user: Option<&str>,
) -> Result<String> {
    resolve_user(data_dir, config, cli_user)?.ok_or_else(|| {
        Error::InvalidArgument(format!(
            "no acting user; pass --as <user-id>, set {USER_ENV}, or run `dogether login <user-id>`"
        ))
    })
}

/// Persist the acting user in `<data_dir>/user`.
pub fn persist_user(data_dir: &Path, user_id: &str) -> Result<()> {
    let user_id = non_empty(Some(user_id))
        .ok_or_else(|| Error::InvalidArgument("user id cannot be empty".to_string()))?;

    lock::write_atomic(storage::session_file(data_dir), format!("{user_id}\n").as_bytes())
}

/// Load the persisted acting user, if present.
pub fn load_persisted_user(data_dir: &Path) -> Result<Option<String>> {
    let path = storage::session_file(data_dir);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    Ok(non_empty(Some(raw.as_str())).map(str::to_string))
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
