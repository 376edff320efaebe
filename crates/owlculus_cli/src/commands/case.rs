use std::io::{self, BufRead, Write};

use anyhow::Context as _;
use owlculus_core::model::case::CREATED_AT_FORMAT;
use owlculus_core::{Case, NewCaseRequest};
use serde_json::json;

use crate::cli::CaseCommand;
use crate::commands::Context;
use crate::output::{self, or_dash, Table};

const CASE_HEADERS: &[&str] = &["CASE", "TYPE", "CLIENT", "FOLDER", "CREATED"];

pub fn handle(action: CaseCommand, ctx: &Context) -> anyhow::Result<()> {
    let workspace = ctx.open_workspace()?;
    match action {
        CaseCommand::Create {
            case_type,
            client,
            name,
        } => {
            let case = workspace.create_case(&NewCaseRequest {
                case_type,
                client_name: client,
                case_name: name,
            })?;
            let folder = workspace.base_path().join(&case.folder_name);
            output::message(
                ctx.format,
                &case,
                &format!("Created case {} at {}", case.case_number, folder.display()),
            )
        }
        CaseCommand::List => {
            let cases = workspace.cases().list_cases()?;
            print_cases(ctx, &cases)
        }
        CaseCommand::Show { case_number } => {
            let case = workspace.cases().require_case(&case_number)?;
            let folder = workspace.base_path().join(&case.folder_name);
            output::emit(
                ctx.format,
                &json!({ "case": case, "folder": folder, "folder_exists": folder.is_dir() }),
                || Table {
                    headers: &["FIELD", "VALUE"],
                    rows: vec![
                        vec!["case_number".to_string(), case.case_number.clone()],
                        vec!["case_type".to_string(), case.case_type.to_string()],
                        vec!["client".to_string(), or_dash(case.client_name.as_deref())],
                        vec!["folder".to_string(), folder.display().to_string()],
                        vec![
                            "created_at".to_string(),
                            case.created_at.format(CREATED_AT_FORMAT).to_string(),
                        ],
                    ],
                },
            )
        }
        CaseCommand::Search { text } => {
            let cases = workspace.cases().search_cases(&text)?;
            print_cases(ctx, &cases)
        }
        CaseCommand::Rename { old, new } => {
            let case = workspace.cases().rename_case(&old, &new)?;
            output::message(
                ctx.format,
                &case,
                &format!("Renamed case {old} to {}", case.case_number),
            )
        }
        CaseCommand::Delete { case_number, yes } => {
            let folder = workspace.case_folder(&case_number)?;
            if !yes
                && !confirm(&format!(
                    "Delete case {case_number} and everything in {}?",
                    folder.display()
                ))?
            {
                println!("Aborted.");
                return Ok(());
            }
            workspace.cases().delete_case(&case_number)?;
            output::message(
                ctx.format,
                &json!({ "deleted": case_number, "folder": folder }),
                &format!("Deleted case {case_number}"),
            )
        }
        CaseCommand::AssignClient {
            case_number,
            client,
        } => {
            let case = workspace.assign_client(&case_number, client.as_deref())?;
            let text = match case.client_name.as_deref() {
                Some(name) => format!("Assigned {name} to case {}", case.case_number),
                None => format!("Detached client from case {}", case.case_number),
            };
            output::message(ctx.format, &case, &text)
        }
        CaseCommand::Path { case_number } => {
            let folder = workspace.case_folder(&case_number)?;
            output::message(ctx.format, &json!({ "folder": folder }), &folder.display().to_string())
        }
        CaseCommand::Open { case_number } => {
            let folder = workspace.case_folder(&case_number)?;
            open::that(&folder)
                .with_context(|| format!("failed to open {}", folder.display()))?;
            Ok(())
        }
    }
}

fn print_cases(ctx: &Context, cases: &[Case]) -> anyhow::Result<()> {
    output::emit(ctx.format, &cases, || Table {
        headers: CASE_HEADERS,
        rows: cases.iter().map(case_row).collect(),
    })
}

fn case_row(case: &Case) -> Vec<String> {
    vec![
        case.case_number.clone(),
        case.case_type.to_string(),
        or_dash(case.client_name.as_deref()),
        case.folder_name.clone(),
        case.created_at.format(CREATED_AT_FORMAT).to_string(),
    ]
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
