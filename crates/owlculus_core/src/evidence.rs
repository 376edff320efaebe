//! Evidence files stored inside a case folder.
//!
//! # Invariants
//! - Every path handled here stays inside the case root.
//! - Existing evidence is never overwritten.

use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

pub type EvidenceResult<T> = Result<T, EvidenceError>;

#[derive(Debug)]
pub enum EvidenceError {
    CaseFolderMissing(PathBuf),
    /// Relative path leaves the case root or is absolute.
    PathEscapesCase(String),
    /// The case root itself cannot be removed through this module.
    RootNotRemovable,
    SourceNotFile(PathBuf),
    AlreadyExists(PathBuf),
    NotFound(String),
    Io { path: PathBuf, source: io::Error },
}

impl Display for EvidenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CaseFolderMissing(path) => {
                write!(f, "case folder not found: {}", path.display())
            }
            Self::PathEscapesCase(path) => {
                write!(f, "path `{path}` is outside the case folder")
            }
            Self::RootNotRemovable => write!(f, "refusing to remove the case folder itself"),
            Self::SourceNotFile(path) => write!(f, "not a regular file: {}", path.display()),
            Self::AlreadyExists(path) => write!(f, "evidence already exists: {}", path.display()),
            Self::NotFound(path) => write!(f, "evidence not found: {path}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for EvidenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> EvidenceError + '_ {
    move |source| EvidenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Directory,
    File,
}

/// One node of a case's evidence tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceEntry {
    /// Path relative to the case root, `/`-separated.
    pub relative_path: String,
    pub kind: EvidenceKind,
    /// Byte size for files, `0` for directories.
    pub size: u64,
}

impl EvidenceEntry {
    /// Nesting level below the case root, starting at 0.
    pub fn depth(&self) -> usize {
        self.relative_path.matches('/').count()
    }
}

/// Lists the case tree depth-first: directories before files at each level,
/// each group ordered by name.
pub fn list_evidence(case_root: &Path) -> EvidenceResult<Vec<EvidenceEntry>> {
    if !case_root.is_dir() {
        return Err(EvidenceError::CaseFolderMissing(case_root.to_path_buf()));
    }
    let mut entries = Vec::new();
    walk(case_root, "", &mut entries)?;
    Ok(entries)
}

fn walk(dir: &Path, prefix: &str, out: &mut Vec<EvidenceEntry>) -> EvidenceResult<()> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let metadata = entry.metadata().map_err(io_err(&path))?;
        // Display name only; `path` keeps the exact on-disk bytes.
        let name = entry.file_name().to_string_lossy().into_owned();
        children.push((!metadata.is_dir(), name, path, metadata));
    }
    children.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

    for (is_file, name, path, metadata) in children {
        let relative_path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if is_file {
            out.push(EvidenceEntry {
                relative_path,
                kind: EvidenceKind::File,
                size: metadata.len(),
            });
        } else {
            out.push(EvidenceEntry {
                relative_path: relative_path.clone(),
                kind: EvidenceKind::Directory,
                size: 0,
            });
            walk(&path, &relative_path, out)?;
        }
    }
    Ok(())
}

/// Copies `source` into `subfolder` of the case (created if absent) and
/// returns the new entry.
pub fn add_evidence(
    case_root: &Path,
    source: &Path,
    subfolder: Option<&str>,
) -> EvidenceResult<EvidenceEntry> {
    if !case_root.is_dir() {
        return Err(EvidenceError::CaseFolderMissing(case_root.to_path_buf()));
    }
    if !source.is_file() {
        return Err(EvidenceError::SourceNotFile(source.to_path_buf()));
    }
    let file_name = source
        .file_name()
        .ok_or_else(|| EvidenceError::SourceNotFile(source.to_path_buf()))?;

    let relative_dir = match subfolder {
        Some(sub) => contained_relative(sub)?,
        None => PathBuf::new(),
    };
    let target_dir = case_root.join(&relative_dir);
    fs::create_dir_all(&target_dir).map_err(io_err(&target_dir))?;

    let target = target_dir.join(file_name);
    if target.exists() {
        return Err(EvidenceError::AlreadyExists(target));
    }
    let size = fs::copy(source, &target).map_err(io_err(&target))?;

    let relative_path = to_slash(&relative_dir.join(file_name));
    info!(
        "event=evidence_add module=evidence status=ok bytes={}",
        size
    );
    Ok(EvidenceEntry {
        relative_path,
        kind: EvidenceKind::File,
        size,
    })
}

/// Deletes a file or directory tree inside the case.
pub fn remove_evidence(case_root: &Path, relative_path: &str) -> EvidenceResult<()> {
    let relative = contained_relative(relative_path)?;
    if relative.as_os_str().is_empty() {
        return Err(EvidenceError::RootNotRemovable);
    }
    let target = case_root.join(&relative);
    let metadata = match fs::symlink_metadata(&target) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(EvidenceError::NotFound(relative_path.to_string()));
        }
        Err(err) => return Err(io_err(&target)(err)),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(&target).map_err(io_err(&target))?;
    } else {
        fs::remove_file(&target).map_err(io_err(&target))?;
    }
    info!(
        "event=evidence_remove module=evidence status=ok directory={}",
        metadata.is_dir()
    );
    Ok(())
}

/// Normalizes a user-supplied relative path, rejecting anything that could
/// point outside the case root. `.` components are dropped.
fn contained_relative(raw: &str) -> EvidenceResult<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(raw.trim()).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(EvidenceError::PathEscapesCase(raw.to_string()));
            }
        }
    }
    Ok(clean)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
