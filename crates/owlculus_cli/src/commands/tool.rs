use std::collections::BTreeMap;

use log::info;
use owlculus_core::tools::known_tools;
use owlculus_core::ToolEvent;
use serde::Serialize;

use crate::cli::{OutputFormat, ToolCommand};
use crate::commands::Context;
use crate::output::{self, Table};

#[derive(Debug, Serialize)]
struct ToolRow {
    name: String,
    path: Option<String>,
    flag_args: Vec<String>,
    positional_args: Vec<String>,
}

pub fn handle(action: ToolCommand, ctx: &Context) -> anyhow::Result<()> {
    match action {
        ToolCommand::List => {
            let config = ctx.load_config()?;
            let tools: Vec<ToolRow> = known_tools(&config)
                .into_iter()
                .map(|name| {
                    let tool = config.tool(&name);
                    ToolRow {
                        path: tool.map(|t| t.path.clone()).filter(|p| !p.trim().is_empty()),
                        flag_args: tool.map(|t| t.flag_args.clone()).unwrap_or_default(),
                        positional_args: tool
                            .map(|t| t.positional_args.clone())
                            .unwrap_or_default(),
                        name,
                    }
                })
                .collect();
            output::emit(ctx.format, &tools, || Table {
                headers: &["TOOL", "PATH", "ARGUMENTS"],
                rows: tools
                    .iter()
                    .map(|tool| {
                        vec![
                            tool.name.clone(),
                            tool.path.clone().unwrap_or_else(|| "(not configured)".to_string()),
                            tool.positional_args.join(", "),
                        ]
                    })
                    .collect(),
            })
        }
        ToolCommand::Run {
            tool,
            case_number,
            args,
        } => {
            let workspace = ctx.open_workspace()?;
            let args: BTreeMap<String, String> = args.into_iter().collect();
            let mut handle = workspace.run_tool(&tool, &case_number, &args)?;
            info!(
                "event=cli_tool_run module=cli status=started run_id={}",
                handle.run_id()
            );

            let mut outcome = None;
            for event in handle.events().iter() {
                print_event(ctx.format, &event)?;
                if event.is_terminal() {
                    outcome = Some(event);
                    break;
                }
            }
            handle.shutdown();

            match outcome {
                Some(ToolEvent::Completed { exit_code: Some(0) }) => Ok(()),
                Some(ToolEvent::Completed { exit_code: Some(code) }) => {
                    anyhow::bail!("{tool} exited with status {code}")
                }
                Some(ToolEvent::Completed { exit_code: None }) => {
                    anyhow::bail!("{tool} was terminated by a signal")
                }
                Some(ToolEvent::Failed(message)) => anyhow::bail!(message),
                Some(ToolEvent::Cancelled) => anyhow::bail!("{tool} was cancelled"),
                _ => anyhow::bail!("{tool} ended without reporting a result"),
            }
        }
    }
}

fn print_event(format: OutputFormat, event: &ToolEvent) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
        OutputFormat::Table => match event {
            ToolEvent::Started { command } => println!("$ {command}"),
            ToolEvent::Output(line) => println!("{line}"),
            ToolEvent::Completed { exit_code } => match exit_code {
                Some(code) => println!("[exit {code}]"),
                None => println!("[terminated]"),
            },
            ToolEvent::Cancelled => println!("[cancelled]"),
            ToolEvent::Failed(message) => eprintln!("[failed] {message}"),
        },
    }
    Ok(())
}
