use clap::{Args, Parser, Subcommand, ValueEnum};
use owlculus_core::CaseType;
use std::path::PathBuf;

/// Shared output mode across all commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Top-level CLI parser for the `owlculus` binary.
#[derive(Debug, Parser)]
#[command(name = "owlculus", version, about = "OSINT case management")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to $OWLCULUS_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format: table, json
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and edit the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Create and manage cases
    Case {
        #[command(subcommand)]
        action: CaseCommand,
    },
    /// Manage clients
    Client {
        #[command(subcommand)]
        action: ClientCommand,
    },
    /// Browse and edit files inside a case folder
    Evidence {
        #[command(subcommand)]
        action: EvidenceCommand,
    },
    /// Run external OSINT tools against a case
    Tool {
        #[command(subcommand)]
        action: ToolCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write the example configuration if none exists
    Init,
    /// Print the configuration
    Show,
    /// Fail unless every storage path is set
    Check,
    /// Print one value by dotted key, e.g. `paths.base_path`
    Get { key: String },
    /// Set one value by dotted key; VALUE is parsed as YAML
    Set { key: String, value: String },
}

#[derive(Debug, Subcommand)]
pub enum CaseCommand {
    /// Create a case with the next free number of this month
    Create {
        /// Person, Company, "Threat Intel" or Event
        #[arg(long = "type", value_name = "TYPE")]
        case_type: CaseType,
        #[arg(long)]
        client: Option<String>,
        /// Custom folder name instead of the case number
        #[arg(long)]
        name: Option<String>,
    },
    List,
    Show { case_number: String },
    /// Case-insensitive search over all columns
    Search { text: String },
    Rename { old: String, new: String },
    /// Delete a case and its whole folder
    Delete {
        case_number: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Attach a client; omit CLIENT to detach
    AssignClient {
        case_number: String,
        client: Option<String>,
    },
    /// Print the case folder path
    Path { case_number: String },
    /// Open the case folder in the file manager
    Open { case_number: String },
}

#[derive(Debug, Args)]
pub struct ClientFields {
    /// Point of contact
    #[arg(long)]
    pub poc: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    Add {
        name: String,
        #[command(flatten)]
        fields: ClientFields,
    },
    List,
    /// Show a client and its cases
    Show { name: String },
    Update {
        name: String,
        /// New client name
        #[arg(long = "name", value_name = "NEW_NAME")]
        new_name: Option<String>,
        #[command(flatten)]
        fields: ClientFields,
    },
    /// Delete a client and detach it from its cases
    Delete { name: String },
}

#[derive(Debug, Subcommand)]
pub enum EvidenceCommand {
    /// List the case folder tree
    List { case_number: String },
    /// Copy a file into the case
    Add {
        case_number: String,
        file: PathBuf,
        /// Subfolder inside the case, e.g. Social_Media/Reddit
        #[arg(long, value_name = "SUBFOLDER")]
        into: Option<String>,
    },
    /// Delete a file or folder inside the case
    Remove {
        case_number: String,
        relative_path: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// List known tools and their executables
    List,
    /// Run a tool with the case folder as its output folder
    Run {
        tool: String,
        #[arg(long = "case", value_name = "CASE_NUMBER")]
        case_number: String,
        /// Tool argument, repeatable
        #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
