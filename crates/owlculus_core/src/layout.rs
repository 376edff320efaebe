//! Case folder layout and markdown template scaffolding.
//!
//! # Responsibility
//! - Decide which subfolders a case gets for its type.
//! - Load markdown templates and place them into a new case folder.
//!
//! # Invariants
//! - Scaffolding never writes into a pre-existing case folder.
//! - Only `Notes` receives placeholder substitution; other templates are
//!   copied byte-for-byte.

use crate::model::case::CaseType;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const SOCIAL_MEDIA_FOLDER: &str = "Social_Media";

pub const COMMON_FOLDERS: [&str; 5] = ["Associates", "Audio", "Documents", "Other", SOCIAL_MEDIA_FOLDER];

pub const COMPANY_FOLDERS: [&str; 3] = ["Domains", "Executives", "Network"];

pub const SOCIAL_MEDIA_FOLDERS: [&str; 12] = [
    "Discord", "Facebook", "Instagram", "LinkedIn", "Reddit", "Signal", "Snapchat", "Telegram",
    "TikTok", "Twitter", "WhatsApp", "YouTube",
];

const NOTES_TEMPLATE: &str = "Notes";

const BUILTIN_TEMPLATES: [(&str, &str); 3] = [
    ("Associates.md", include_str!("../templates/Associates.md")),
    ("Notes.md", include_str!("../templates/Notes.md")),
    ("SOCMINT.md", include_str!("../templates/SOCMINT.md")),
];

pub type LayoutResult<T> = Result<T, LayoutError>;

#[derive(Debug)]
pub enum LayoutError {
    FolderExists(PathBuf),
    TemplateDirMissing(PathBuf),
    Io { path: PathBuf, source: io::Error },
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FolderExists(path) => write!(f, "case folder already exists: {}", path.display()),
            Self::TemplateDirMissing(path) => {
                write!(f, "template directory not found: {}", path.display())
            }
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for LayoutError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> LayoutError + '_ {
    move |source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Where case templates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Templates compiled into the binary.
    BuiltIn,
    /// Every `*.md` file directly inside this directory.
    Directory(PathBuf),
}

/// One markdown template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub file_name: String,
    pub contents: String,
}

impl Template {
    /// File name up to the first `.`.
    pub fn stem(&self) -> &str {
        self.file_name.split('.').next().unwrap_or_default()
    }
}

/// Values substituted into the notes template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldContext<'a> {
    pub case_number: &'a str,
    pub case_type: CaseType,
    pub date: NaiveDate,
}

/// Top-level folders for `case_type`, sorted.
pub fn case_folders(case_type: CaseType) -> Vec<&'static str> {
    let mut folders = COMMON_FOLDERS.to_vec();
    if case_type == CaseType::Company {
        folders.extend(COMPANY_FOLDERS);
    }
    folders.sort_unstable();
    folders
}

/// Relative folder a template lands in; empty means the case root.
pub fn template_target_folder(stem: &str) -> &'static str {
    match stem {
        "SOCMINT" => SOCIAL_MEDIA_FOLDER,
        "Associates" => "Associates",
        _ => "",
    }
}

/// Loads templates sorted by file name.
pub fn load_templates(source: &TemplateSource) -> LayoutResult<Vec<Template>> {
    let mut templates = match source {
        TemplateSource::BuiltIn => BUILTIN_TEMPLATES
            .iter()
            .map(|(file_name, contents)| Template {
                file_name: (*file_name).to_string(),
                contents: (*contents).to_string(),
            })
            .collect::<Vec<_>>(),
        TemplateSource::Directory(dir) => {
            if !dir.is_dir() {
                return Err(LayoutError::TemplateDirMissing(dir.clone()));
            }
            let mut templates = Vec::new();
            for entry in fs::read_dir(dir).map_err(io_err(dir))? {
                let path = entry.map_err(io_err(dir))?.path();
                if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                    continue;
                }
                let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                templates.push(Template {
                    file_name: file_name.to_string(),
                    contents: fs::read_to_string(&path).map_err(io_err(&path))?,
                });
            }
            templates
        }
    };
    templates.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(templates)
}

/// Appends case values after the notes template labels.
pub fn render_notes(contents: &str, ctx: &ScaffoldContext<'_>) -> String {
    contents
        .replace(
            "**Case Number:**",
            &format!("**Case Number:** {}", ctx.case_number),
        )
        .replace("**Case Type:**", &format!("**Case Type:** {}", ctx.case_type))
        .replace(
            "**Date:**",
            &format!("**Date:** {}", ctx.date.format("%Y-%m-%d")),
        )
}

/// Creates `case_root`, its subfolders and templates.
///
/// The parent of `case_root` is created if missing; `case_root` itself must
/// not exist yet.
pub fn scaffold_case_folder(
    case_root: &Path,
    ctx: &ScaffoldContext<'_>,
    templates: &[Template],
) -> LayoutResult<()> {
    if let Some(parent) = case_root.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    match fs::create_dir(case_root) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(LayoutError::FolderExists(case_root.to_path_buf()));
        }
        Err(err) => return Err(io_err(case_root)(err)),
    }

    for folder in case_folders(ctx.case_type) {
        let path = case_root.join(folder);
        fs::create_dir(&path).map_err(io_err(&path))?;
    }
    for platform in SOCIAL_MEDIA_FOLDERS {
        let path = case_root.join(SOCIAL_MEDIA_FOLDER).join(platform);
        fs::create_dir(&path).map_err(io_err(&path))?;
    }

    for template in templates {
        let stem = template.stem();
        if stem == NOTES_TEMPLATE {
            let path = case_root.join(&template.file_name);
            fs::write(&path, render_notes(&template.contents, ctx)).map_err(io_err(&path))?;
        } else {
            let folder = case_root.join(template_target_folder(stem));
            fs::create_dir_all(&folder).map_err(io_err(&folder))?;
            let path = folder.join(&template.file_name);
            fs::write(&path, &template.contents).map_err(io_err(&path))?;
        }
    }

    Ok(())
}
