use owlculus_core::EvidenceKind;
use serde_json::json;

use crate::cli::EvidenceCommand;
use crate::commands::Context;
use crate::output::{self, Table};

pub fn handle(action: EvidenceCommand, ctx: &Context) -> anyhow::Result<()> {
    let workspace = ctx.open_workspace()?;
    match action {
        EvidenceCommand::List { case_number } => {
            let entries = workspace.list_evidence(&case_number)?;
            output::emit(ctx.format, &entries, || Table {
                headers: &["PATH", "KIND", "SIZE"],
                rows: entries
                    .iter()
                    .map(|entry| {
                        let (kind, size) = match entry.kind {
                            EvidenceKind::Directory => ("dir", "-".to_string()),
                            EvidenceKind::File => ("file", entry.size.to_string()),
                        };
                        vec![entry.relative_path.clone(), kind.to_string(), size]
                    })
                    .collect(),
            })
        }
        EvidenceCommand::Add {
            case_number,
            file,
            into,
        } => {
            let entry = workspace.add_evidence(&case_number, &file, into.as_deref())?;
            output::message(
                ctx.format,
                &entry,
                &format!("Added {} to case {case_number}", entry.relative_path),
            )
        }
        EvidenceCommand::Remove {
            case_number,
            relative_path,
        } => {
            workspace.remove_evidence(&case_number, &relative_path)?;
            output::message(
                ctx.format,
                &json!({ "case_number": case_number, "removed": relative_path }),
                &format!("Removed {relative_path} from case {case_number}"),
            )
        }
    }
}
