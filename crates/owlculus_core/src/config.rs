//! YAML configuration file.
//!
//! # Responsibility
//! - Load, save and initialize the `config.yaml` file.
//! - Resolve storage paths and tool definitions for the rest of the core.
//! - Provide dotted-key access (`paths.base_path`) for the settings screen.
//!
//! # Invariants
//! - A blank path means "not configured"; nothing is created from it.
//! - Tool names are matched in lowercase.

use crate::db::Schema;
use crate::layout::TemplateSource;
use log::info;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "OWLCULUS_CONFIG";

const CONFIG_DIR_NAME: &str = "owlculus";
const CONFIG_FILE_NAME: &str = "config.yaml";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Missing(PathBuf),
    Io { path: PathBuf, source: io::Error },
    Parse(serde_yaml::Error),
    UnknownKey(String),
    InvalidValue { key: String, message: String },
    /// Settings still in their initial state.
    NotConfigured(Vec<&'static str>),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "configuration file not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse(err) => write!(f, "invalid configuration: {err}"),
            Self::UnknownKey(key) => write!(f, "unknown configuration key `{key}`"),
            Self::InvalidValue { key, message } => {
                write!(f, "invalid value for `{key}`: {message}")
            }
            Self::NotConfigured(keys) => write!(
                f,
                "settings are not configured yet; set {} first",
                keys.join(", ")
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Parse(value)
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory where case folders and evidence are stored.
    #[serde(default)]
    pub base_path: String,
    /// Directory holding `cases.db`.
    #[serde(default)]
    pub cases_db_path: String,
    /// Directory holding `clients.db`.
    #[serde(default)]
    pub clients_db_path: String,
    /// Directory of markdown templates; built-in templates when unset.
    #[serde(default)]
    pub templates_path: Option<String>,
}

/// How to invoke one external tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable path or name resolved through `PATH`.
    pub path: String,
    /// Arguments placed before the output folder.
    #[serde(default)]
    pub flag_args: Vec<String>,
    /// Argument names passed by position after the output folder.
    #[serde(default)]
    pub positional_args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
}

impl AppConfig {
    /// Configuration written when no file exists yet.
    pub fn example() -> Self {
        let mut tools = BTreeMap::new();
        tools.insert(
            "maigret".to_string(),
            ToolConfig {
                path: "maigret".to_string(),
                flag_args: vec!["--folderoutput".to_string()],
                positional_args: vec!["username".to_string()],
            },
        );
        Self {
            paths: PathsConfig::default(),
            tools,
            logging: LoggingConfig::default(),
        }
    }

    /// Parses YAML text.
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Path keys that are still blank.
    pub fn missing_paths(&self) -> Vec<&'static str> {
        [
            ("paths.base_path", &self.paths.base_path),
            ("paths.cases_db_path", &self.paths.cases_db_path),
            ("paths.clients_db_path", &self.paths.clients_db_path),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect()
    }

    /// Fails with `NotConfigured` while any required path is blank.
    pub fn check(&self) -> ConfigResult<()> {
        let missing = self.missing_paths();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::NotConfigured(missing))
        }
    }

    pub fn base_path(&self) -> PathBuf {
        expand_home(&self.paths.base_path)
    }

    pub fn cases_db_file(&self) -> PathBuf {
        expand_home(&self.paths.cases_db_path).join(Schema::Cases.file_name())
    }

    pub fn clients_db_file(&self) -> PathBuf {
        expand_home(&self.paths.clients_db_path).join(Schema::Clients.file_name())
    }

    pub fn template_source(&self) -> TemplateSource {
        match self.paths.templates_path.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => TemplateSource::Directory(expand_home(dir)),
            _ => TemplateSource::BuiltIn,
        }
    }

    /// Looks up a tool by case-insensitive name.
    pub fn tool(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(&name.trim().to_lowercase())
    }

    /// Value at a dotted key such as `paths.base_path` or `tools.maigret`.
    pub fn get_value(&self, key: &str) -> ConfigResult<Value> {
        let mut current = serde_yaml::to_value(self)?;
        for part in split_key(key)? {
            current = match current {
                Value::Mapping(mut map) => map
                    .remove(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?,
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            };
        }
        Ok(current)
    }

    /// Sets a dotted key from YAML text (`/cases`, `null`, `[-a, -b]`).
    ///
    /// Intermediate mappings are created as needed, so new tools can be
    /// declared with `tools.<name>.path`. The result must still describe a
    /// valid configuration.
    pub fn set_value(&mut self, key: &str, raw: &str) -> ConfigResult<()> {
        let mut parts: Vec<String> = split_key(key)?.into_iter().map(str::to_string).collect();
        if parts.len() > 1 && parts[0] == "tools" {
            parts[1] = parts[1].to_lowercase();
        }
        let parsed: Value = serde_yaml::from_str(raw).map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        // Bare words like `on`/`yes` stay strings for path-typed fields.
        let parsed = match parsed {
            Value::Bool(_) | Value::Number(_) => Value::String(raw.trim().to_string()),
            other => other,
        };

        let mut root = serde_yaml::to_value(&*self)?;
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let mut cursor = &mut root;
        for part in parents {
            let Value::Mapping(map) = cursor else {
                return Err(ConfigError::UnknownKey(key.to_string()));
            };
            cursor = map
                .entry(Value::String((*part).to_string()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
        }
        let Value::Mapping(map) = cursor else {
            return Err(ConfigError::UnknownKey(key.to_string()));
        };
        map.insert(Value::String((*last).to_string()), parsed);

        *self = serde_yaml::from_value(root).map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        Ok(())
    }
}

/// Default config location: `$OWLCULUS_CONFIG`, else the platform config dir.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(value));
    }
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn load_config(path: &Path) -> ConfigResult<AppConfig> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    AppConfig::from_yaml(&text)
}

/// Writes `config` as YAML, creating parent directories.
pub fn save_config(path: &Path, config: &AppConfig) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, config.to_yaml()?).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("event=config_save module=config status=ok");
    Ok(())
}

/// Loads the config, writing [`AppConfig::example`] first when the file is
/// missing. The flag reports whether the file was created.
pub fn load_or_init(path: &Path) -> ConfigResult<(AppConfig, bool)> {
    match load_config(path) {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::Missing(_)) => {
            let config = AppConfig::example();
            save_config(path, &config)?;
            info!("event=config_init module=config status=ok");
            Ok((config, true))
        }
        Err(err) => Err(err),
    }
}

fn split_key(key: &str) -> ConfigResult<Vec<&str>> {
    let parts: Vec<&str> = key.trim().split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    Ok(parts)
}

/// Expands a leading `~` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    let trimmed = value.trim();
    if trimmed == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(trimmed));
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}
