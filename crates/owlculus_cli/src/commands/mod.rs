use std::path::PathBuf;

use anyhow::Context as _;
use owlculus_core::{AppConfig, ConfigError, Workspace};

use crate::cli::{Commands, OutputFormat};

pub mod case;
pub mod client;
pub mod config;
pub mod evidence;
pub mod tool;

/// Values every command handler needs.
pub struct Context {
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        match owlculus_core::load_config(&self.config_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Missing(path)) => anyhow::bail!(
                "configuration file not found: {}; run `owlculus config init` first",
                path.display()
            ),
            Err(err) => Err(err).with_context(|| {
                format!("failed to load {}", self.config_path.display())
            }),
        }
    }

    pub fn open_workspace(&self) -> anyhow::Result<Workspace> {
        let config = self.load_config()?;
        Workspace::open(&config).context("failed to open the case workspace")
    }
}

pub fn dispatch(command: Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => config::handle(action, ctx),
        Commands::Case { action } => case::handle(action, ctx),
        Commands::Client { action } => client::handle(action, ctx),
        Commands::Evidence { action } => evidence::handle(action, ctx),
        Commands::Tool { action } => tool::handle(action, ctx),
    }
}
