//! `owlculus` command-line front end.
//!
//! # Responsibility
//! - Parse arguments and route them to `owlculus_core`.
//! - Own process concerns: logging init, output rendering, exit status.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use log::info;

mod cli;
mod commands;
mod output;

fn main() {
    if let Err(error) = run() {
        eprintln!("owlculus error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => owlculus_core::default_config_path()
            .context("cannot determine the configuration directory; pass --config")?,
    };

    init_logging(cli.log_level.as_deref(), &config_path);
    info!(
        "event=cli_start module=cli status=ok version={}",
        owlculus_core::core_version()
    );

    let ctx = commands::Context {
        config_path,
        format: cli.format,
    };
    commands::dispatch(cli.command, &ctx)
}

/// Starts file logging next to the config file. Failures are reported and
/// otherwise ignored.
fn init_logging(cli_level: Option<&str>, config_path: &Path) {
    let file_settings = owlculus_core::load_config(config_path)
        .ok()
        .map(|config| config.logging);

    let level = cli_level
        .map(str::to_string)
        .or_else(|| file_settings.as_ref().and_then(|l| l.level.clone()))
        .unwrap_or_else(|| owlculus_core::default_log_level().to_string());
    let log_dir = file_settings
        .and_then(|l| l.dir)
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            config_path
                .parent()
                .map_or_else(|| PathBuf::from("logs"), |parent| parent.join("logs"))
        });
    let log_dir = if log_dir.is_absolute() {
        log_dir
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&log_dir))
            .unwrap_or(log_dir)
    };

    if let Err(err) = owlculus_core::init_logging(&level, &log_dir) {
        eprintln!("owlculus warning: logging disabled: {err}");
    }
}
