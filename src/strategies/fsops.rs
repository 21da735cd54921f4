//! Filesystem primitives shared by the execute side of the strategies.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::ExecuteError;

/// Characters not allowed in a single path component.
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace characters that are unsafe in a file or directory name.
pub(crate) fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), ExecuteError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| ExecuteError::io("create directory", parent, e))
        }
        _ => Ok(()),
    }
}

fn require_source(src: &Path) -> Result<(), ExecuteError> {
    if src.exists() {
        Ok(())
    } else {
        Err(ExecuteError::MissingSource(src.to_path_buf()))
    }
}

/// Whether `dst` is occupied by something other than `src` itself. A
/// case-only rename on a case-insensitive filesystem reports the same file.
fn occupied(src: &Path, dst: &Path) -> bool {
    if !dst.exists() {
        return false;
    }
    match (fs::canonicalize(src), fs::canonicalize(dst)) {
        (Ok(a), Ok(b)) => a != b,
        _ => true,
    }
}

/// Move a file or directory, creating the target's parent. Falls back to
/// copy and delete across filesystems.
pub(crate) fn move_path(src: &Path, dst: &Path, overwrite: bool) -> Result<(), ExecuteError> {
    if src == dst {
        return Ok(());
    }
    require_source(src)?;
    if occupied(src, dst) {
        if !overwrite {
            return Err(ExecuteError::TargetExists(dst.to_path_buf()));
        }
        remove_path(dst)?;
    }
    ensure_parent(dst)?;

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(src = %src.display(), dst = %dst.display(), "cross-device move, copying");
            copy_path(src, dst)?;
            remove_path(src)
        }
        Err(e) => Err(ExecuteError::io("move", src, e)),
    }
}

/// Copy a file, or a directory tree.
pub(crate) fn copy_path(src: &Path, dst: &Path) -> Result<(), ExecuteError> {
    require_source(src)?;
    ensure_parent(dst)?;
    if !src.is_dir() {
        return fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| ExecuteError::io("copy", src, e));
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf());
            ExecuteError::io("walk", path, io::Error::other(e))
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let out: PathBuf = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).map_err(|e| ExecuteError::io("create directory", &out, e))?;
        } else {
            fs::copy(entry.path(), &out).map_err(|e| ExecuteError::io("copy", entry.path(), e))?;
        }
    }
    Ok(())
}

pub(crate) fn remove_path(path: &Path) -> Result<(), ExecuteError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| ExecuteError::io("remove", path, e))
}

/// Remove `dir` if it is an empty directory. Failure is not an error.
pub(crate) fn remove_if_empty(dir: &Path) -> bool {
    let empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty && fs::remove_dir(dir).is_ok() {
        debug!(dir = %dir.display(), "removed empty directory");
        return true;
    }
    false
}
