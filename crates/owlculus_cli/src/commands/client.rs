use owlculus_core::{Client, ClientPatch, NewClient};
use serde_json::json;

use crate::cli::{ClientCommand, ClientFields};
use crate::commands::Context;
use crate::output::{self, dash, Table};

pub fn handle(action: ClientCommand, ctx: &Context) -> anyhow::Result<()> {
    let workspace = ctx.open_workspace()?;
    match action {
        ClientCommand::Add { name, fields } => {
            let client = workspace.add_client(&NewClient {
                name,
                point_of_contact: fields.poc.unwrap_or_default(),
                phone_number: fields.phone.unwrap_or_default(),
                email: fields.email.unwrap_or_default(),
            })?;
            output::message(ctx.format, &client, &format!("Added client {}", client.name))
        }
        ClientCommand::List => {
            let clients = workspace.clients().list_clients()?;
            output::emit(ctx.format, &clients, || Table {
                headers: &["NAME", "CONTACT", "PHONE", "EMAIL"],
                rows: clients.iter().map(client_row).collect(),
            })
        }
        ClientCommand::Show { name } => {
            let client = workspace.clients().require_client(&name)?;
            let cases: Vec<String> = workspace
                .cases_for_client(&client.name)?
                .into_iter()
                .map(|case| case.case_number)
                .collect();
            output::emit(
                ctx.format,
                &json!({ "client": client, "cases": cases }),
                || Table {
                    headers: &["FIELD", "VALUE"],
                    rows: vec![
                        vec!["name".to_string(), client.name.clone()],
                        vec!["point_of_contact".to_string(), dash(&client.point_of_contact)],
                        vec!["phone_number".to_string(), dash(&client.phone_number)],
                        vec!["email".to_string(), dash(&client.email)],
                        vec!["cases".to_string(), dash(&cases.join(", "))],
                    ],
                },
            )
        }
        ClientCommand::Update {
            name,
            new_name,
            fields,
        } => {
            let patch = patch_from(new_name, fields);
            if patch.is_empty() {
                anyhow::bail!("nothing to update; pass --name, --poc, --phone or --email");
            }
            let client = workspace.update_client(&name, &patch)?;
            output::message(ctx.format, &client, &format!("Updated client {}", client.name))
        }
        ClientCommand::Delete { name } => {
            let (client, detached) = workspace.delete_client(&name)?;
            output::message(
                ctx.format,
                &json!({ "deleted": client, "cases_detached": detached }),
                &format!("Deleted client {} ({detached} case(s) detached)", client.name),
            )
        }
    }
}

fn patch_from(new_name: Option<String>, fields: ClientFields) -> ClientPatch {
    ClientPatch {
        name: new_name,
        point_of_contact: fields.poc,
        phone_number: fields.phone,
        email: fields.email,
    }
}

fn client_row(client: &Client) -> Vec<String> {
    vec![
        client.name.clone(),
        dash(&client.point_of_contact),
        dash(&client.phone_number),
        dash(&client.email),
    ]
}
