//! dogether init command implementation
//!
//! Creates the data directory and, if missing, a `.dogether.toml` in the
//! working directory recording the resolved settings.

use std::path::PathBuf;

use crate::config::CONFIG_FILE;
use crate::error::Result;
use crate::output::{emit_success, Report};
use crate::storage::{Backend, FileStore};

use super::Context;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    backend: Backend,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    data_dir: bool,
}

pub fn run(ctx: &Context) -> Result<()> {
    let store = FileStore::new(&ctx.data_dir, ctx.config.storage.lock_timeout_ms);
    let created_data_dir = ctx.config.storage.backend == Backend::File && !store.is_initialized();
    if ctx.config.storage.backend == Backend::File {
        store.init()?;
    } else {
        std::fs::create_dir_all(&ctx.data_dir)?;
    }

    let config_path = std::env::current_dir()?.join(CONFIG_FILE);
    let created_config = !config_path.exists();
    if created_config {
        ctx.config.save(&config_path)?;
    }

    let report = InitReport {
        data_dir: ctx.data_dir.clone(),
        backend: ctx.config.storage.backend,
        created: InitCreated {
            config: created_config,
            data_dir: created_data_dir,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_data_dir {
        created_items.push(ctx.data_dir.display().to_string());
    }

    let header = if created_items.is_empty() {
        "dogether init: already initialized".to_string()
    } else {
        "dogether init: initialized".to_string()
    };

    let mut view = Report::new(header);
    view.field("data dir", ctx.data_dir.display().to_string());
    if !created_items.is_empty() {
        view.field("created", created_items.join(", "));
    }
    if ctx.config.storage.backend == Backend::Memory {
        view.warn("memory backend keeps nothing between commands".to_string());
    }
    view.hint("dogether user register <username>");

    emit_success(ctx.output, "init", &report, Some(&view))
}
