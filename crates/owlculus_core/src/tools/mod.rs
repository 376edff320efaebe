//! External OSINT tool integration.
//!
//! # Responsibility
//! - Resolve tool definitions from the configuration.
//! - Build the command line for a run.
//! - Execute runs on a background worker ([`runner`]).

pub mod runner;

use crate::config::{AppConfig, ToolConfig};
use std::collections::BTreeMap;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub use runner::{spawn_tool, ToolEvent, ToolRunHandle, SHUTDOWN_TIMEOUT};

/// Tools the application knows about without extra configuration.
pub const BUILTIN_TOOLS: [&str; 1] = ["maigret"];

pub type ToolResult<T> = Result<T, ToolError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    UnknownTool(String),
    /// A positional argument named in `positional_args` was not supplied.
    MissingArgument { tool: String, argument: String },
    /// The tool entry exists but its `path` is blank.
    NotConfigured(String),
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::MissingArgument { tool, argument } => {
                write!(f, "tool `{tool}` requires argument `{argument}`")
            }
            Self::NotConfigured(name) => {
                write!(f, "tool `{name}` has no executable path configured")
            }
        }
    }
}

impl Error for ToolError {}

/// Fully resolved process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    /// Command line as a single display string.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().map(|arg| arg.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Built-in tool names plus every configured tool, sorted and deduplicated.
pub fn known_tools(config: &AppConfig) -> Vec<String> {
    let mut names: Vec<String> = BUILTIN_TOOLS.iter().map(|name| name.to_string()).collect();
    names.extend(config.tools.keys().map(|name| name.to_lowercase()));
    names.sort();
    names.dedup();
    names
}

/// Looks up `tool` in `config` and builds its invocation.
pub fn resolve_invocation(
    config: &AppConfig,
    tool: &str,
    output_folder: &Path,
    args: &BTreeMap<String, String>,
) -> ToolResult<ToolInvocation> {
    let name = tool.trim().to_lowercase();
    match config.tool(&name) {
        Some(tool_config) => build_invocation(&name, tool_config, output_folder, args),
        None if BUILTIN_TOOLS.contains(&name.as_str()) => Err(ToolError::NotConfigured(name)),
        None => Err(ToolError::UnknownTool(tool.trim().to_string())),
    }
}

/// `path flag_args… output_folder positional… --name value…`
///
/// Positional values follow `positional_args` order; the remaining
/// arguments are emitted as `--name value` pairs sorted by name.
pub fn build_invocation(
    tool: &str,
    tool_config: &ToolConfig,
    output_folder: &Path,
    args: &BTreeMap<String, String>,
) -> ToolResult<ToolInvocation> {
    if tool_config.path.trim().is_empty() {
        return Err(ToolError::NotConfigured(tool.to_string()));
    }

    let mut argv: Vec<OsString> = tool_config.flag_args.iter().map(OsString::from).collect();
    argv.push(output_folder.as_os_str().to_os_string());

    for name in &tool_config.positional_args {
        let value = args.get(name).ok_or_else(|| ToolError::MissingArgument {
            tool: tool.to_string(),
            argument: name.clone(),
        })?;
        argv.push(OsString::from(value));
    }
    for (name, value) in args {
        if tool_config.positional_args.contains(name) {
            continue;
        }
        argv.push(OsString::from(format!("--{name}")));
        argv.push(OsString::from(value));
    }

    Ok(ToolInvocation {
        tool: tool.to_string(),
        program: PathBuf::from(tool_config.path.trim()),
        args: argv,
    })
}
