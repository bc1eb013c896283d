//! Rewrite - grammar fix and tone rewrite for selected text
//!
//! Run with `rewrite` or `rewrite run` to listen for hotkeys.
//! Use `rewrite fix <text>` or `rewrite rewrite --mode <name> <text>` for one-shot rewrites.
//! Use `rewrite config` and `rewrite modes` to manage settings.

mod cli;
mod commands;
mod daemon;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use rw_core::domain::settings::{KeyValueStore, Settings};
use rw_core::infra::hotkey::{HotkeyRegistrar, NoopHotkeyRegistrar};
use rw_core::infra::os_integration::ClipboardBridge;
use rw_core::infra::output::OutputRouter;
use rw_core::infra::storage::Storage;
use rw_core::usecase::app_service::{ollama_factory, AppService};
use rw_core::usecase::request_queue::Completion;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("rewrite={log_level},rw_core={log_level},warn"))
        }))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let db_path = resolve_db_path(cli.db)?;
    tracing::debug!("Settings database: {:?}", db_path);
    let storage = Storage::open(&db_path.to_string_lossy())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let (completions_tx, completions_rx) = mpsc::unbounded_channel();
            let service = build_service(&storage, hotkey_registrar(), completions_tx);
            daemon::run(service, completions_rx).await?;
        }

        Commands::Fix { text, copy } => {
            let service = one_shot_service(&storage);
            commands::rewrite(&service, None, text, copy).await?;
        }

        Commands::Rewrite { mode, text, copy } => {
            let service = one_shot_service(&storage);
            commands::rewrite(&service, Some(&mode), text, copy).await?;
        }

        Commands::Prompt { mode, text } => {
            let service = one_shot_service(&storage);
            commands::prompt(&service, mode.as_deref(), text)?;
        }

        Commands::Models => {
            let service = one_shot_service(&storage);
            commands::models(&service).await;
        }

        Commands::Config { action } => {
            let mut settings = Settings::load(&storage);
            commands::config(&mut settings, action, &db_path)?;
        }

        Commands::Modes { action } => {
            let mut settings = Settings::load(&storage);
            commands::modes(&mut settings, action)?;
        }
    }

    Ok(())
}

/// --db / REWRITE_DB_PATH、なければデータディレクトリ配下
fn resolve_db_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let dir = dirs::data_local_dir()
        .context("Could not determine data directory; pass --db")?
        .join("rewrite");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    Ok(dir.join("settings.db"))
}

fn build_service<S: KeyValueStore>(
    store: S,
    hotkeys: Box<dyn HotkeyRegistrar>,
    completions: mpsc::UnboundedSender<Completion>,
) -> AppService<S> {
    let bridge = Arc::new(ClipboardBridge::new());
    AppService::new(
        Settings::load(store),
        bridge.clone(),
        OutputRouter::new(bridge),
        hotkeys,
        ollama_factory(),
        completions,
    )
}

/// ワンショット用（完了チャネルは使わない）
fn one_shot_service<S: KeyValueStore>(store: S) -> AppService<S> {
    let (tx, _rx) = mpsc::unbounded_channel();
    build_service(store, Box::new(NoopHotkeyRegistrar::new()), tx)
}

#[cfg(feature = "global-hotkeys")]
fn hotkey_registrar() -> Box<dyn HotkeyRegistrar> {
    Box::new(rw_core::infra::hotkey::RdevHotkeyRegistrar::new())
}

#[cfg(not(feature = "global-hotkeys"))]
fn hotkey_registrar() -> Box<dyn HotkeyRegistrar> {
    Box::new(NoopHotkeyRegistrar::new())
}
