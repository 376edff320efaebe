use anyhow::Context as _;
use serde_json::json;

use crate::cli::{ConfigCommand, OutputFormat};
use crate::commands::Context;
use crate::output::{self, Table};

pub fn handle(action: ConfigCommand, ctx: &Context) -> anyhow::Result<()> {
    match action {
        ConfigCommand::Init => {
            let (config, created) = owlculus_core::load_or_init(&ctx.config_path)
                .with_context(|| format!("failed to initialize {}", ctx.config_path.display()))?;
            let missing = config.missing_paths();
            let text = if created {
                format!("Created {}", ctx.config_path.display())
            } else {
                format!("Configuration already exists at {}", ctx.config_path.display())
            };
            output::message(
                ctx.format,
                &json!({
                    "path": ctx.config_path,
                    "created": created,
                    "missing": missing,
                }),
                &text,
            )?;
            if ctx.format == OutputFormat::Table && !missing.is_empty() {
                println!("Set {} with `owlculus config set`.", missing.join(", "));
            }
            Ok(())
        }
        ConfigCommand::Show => {
            let config = ctx.load_config()?;
            match ctx.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                OutputFormat::Table => print!("{}", config.to_yaml()?),
            }
            Ok(())
        }
        ConfigCommand::Check => {
            let config = ctx.load_config()?;
            config.check()?;
            let tools = owlculus_core::tools::known_tools(&config);
            output::emit(
                ctx.format,
                &json!({
                    "path": ctx.config_path,
                    "base_path": config.base_path(),
                    "cases_db": config.cases_db_file(),
                    "clients_db": config.clients_db_file(),
                    "tools": tools,
                }),
                || Table {
                    headers: &["SETTING", "VALUE"],
                    rows: vec![
                        vec!["config".to_string(), ctx.config_path.display().to_string()],
                        vec!["base_path".to_string(), config.base_path().display().to_string()],
                        vec!["cases_db".to_string(), config.cases_db_file().display().to_string()],
                        vec![
                            "clients_db".to_string(),
                            config.clients_db_file().display().to_string(),
                        ],
                        vec!["tools".to_string(), tools.join(", ")],
                    ],
                },
            )
        }
        ConfigCommand::Get { key } => {
            let config = ctx.load_config()?;
            let value = config.get_value(&key)?;
            match (ctx.format, value.as_str()) {
                (OutputFormat::Table, Some(text)) => println!("{text}"),
                (OutputFormat::Table, None) if value.is_null() => println!("-"),
                _ => println!("{}", serde_json::to_string_pretty(&value)?),
            }
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            let mut config = ctx.load_config()?;
            config.set_value(&key, &value)?;
            owlculus_core::save_config(&ctx.config_path, &config)?;
            output::message(
                ctx.format,
                &json!({ "key": key, "value": config.get_value(&key)? }),
                &format!("Updated {key}"),
            )
        }
    }
}
