use crate::error::ConfigError;
use serde_json::Value;
use std::{
    fs, io,
    path::{MAIN_SEPARATOR, Path, PathBuf},
};

/// What a path points at, as far as the path types care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileKind {
    File,
    Dir,
    Other,
}

/// Filesystem access used by the `path:*` types
pub trait FileSystem: Send + Sync {
    /// Kind of the entry at `path`; `io::ErrorKind::NotFound` when absent
    fn stat(&self, path: &Path) -> io::Result<FileKind>;

    /// Base for resolving relative paths
    fn current_dir(&self) -> io::Result<PathBuf>;
}

/// Filesystem backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileKind> {
        let meta = fs::metadata(path)?;
        Ok(if meta.is_file() {
            FileKind::File
        } else if meta.is_dir() {
            FileKind::Dir
        } else {
            FileKind::Other
        })
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}

/// Existence requirement of a path type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    Any,
    Dir,
    File,
    Exist,
    NotExist,
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn is_absolute(raw: &str) -> bool {
    raw.starts_with('/') || raw.starts_with('\\') || raw.get(..2).is_some_and(is_drive)
}

/// Normalizes separators and resolves `raw` against `cwd`
///
/// Both `/` and `\` are accepted as separators, repeated separators collapse,
/// `.` is dropped and `..` pops a segment but never climbs above the root.
/// A leading drive letter (`C:`) is kept and marks the path as absolute.
pub fn normalize(raw: &str, cwd: &Path) -> String {
    let joined;
    let input = if is_absolute(raw) {
        raw
    } else {
        joined = format!("{}/{}", cwd.display(), raw);
        joined.as_str()
    };

    let rooted = input.starts_with('/') || input.starts_with('\\');
    let mut drive = None;
    let mut segments: Vec<&str> = Vec::new();
    for (index, part) in input
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .enumerate()
    {
        if index == 0 && !rooted && is_drive(part) {
            drive = Some(part);
        } else if part == ".." {
            segments.pop();
        } else {
            segments.push(part);
        }
    }

    let sep = MAIN_SEPARATOR.to_string();
    let mut out = drive.unwrap_or_default().to_string();
    out.push_str(&sep);
    out.push_str(&segments.join(&sep));
    out
}

/// Runs a path type against a raw value
///
/// Only strings are paths. A missing entry is "no match" for the types that
/// need one and a match for `NotExist`; any other stat failure is fatal.
pub fn check_path(
    value: &Value,
    mode: PathMode,
    fs: &dyn FileSystem,
) -> Result<Option<Value>, ConfigError> {
    let raw = match value {
        Value::String(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };
    let cwd = fs
        .current_dir()
        .map_err(|e| ConfigError::from_io(PathBuf::from("."), &e))?;
    let normalized = normalize(raw, &cwd);
    if mode == PathMode::Any {
        return Ok(Some(Value::String(normalized)));
    }

    let kind = match fs.stat(Path::new(&normalized)) {
        Ok(kind) => Some(kind),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(ConfigError::from_io(PathBuf::from(&normalized), &e)),
    };

    let matched = match (mode, kind) {
        (PathMode::Dir, Some(FileKind::Dir)) => true,
        (PathMode::File, Some(FileKind::File)) => true,
        (PathMode::Exist, Some(FileKind::File | FileKind::Dir)) => true,
        (PathMode::NotExist, None) => true,
        _ => false,
    };
    log::debug!("path {normalized} ({kind:?}) checked as {mode:?}: {matched}");
    Ok(matched.then(|| Value::String(normalized)))
}
