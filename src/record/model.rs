use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::lineage::Lineage;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId(pub usize);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum OpKind {
    #[default]
    None,
    Rename,
    Move,
    Copy,
    Convert,
    Split,
    Delete,
    AlbumRename,
    CueRename,
    Extract,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::None => "NONE",
            OpKind::Rename => "RENAME",
            OpKind::Move => "MOVE",
            OpKind::Copy => "COPY",
            OpKind::Convert => "CONVERT",
            OpKind::Split => "SPLIT",
            OpKind::Delete => "DELETE",
            OpKind::AlbumRename => "ALBUM_RENAME",
            OpKind::CueRename => "CUE_RENAME",
            OpKind::Extract => "EXTRACT",
        }
    }

    /// Whether the source path stops existing once the operation runs.
    pub fn consumes_source(self) -> bool {
        matches!(
            self,
            OpKind::Rename | OpKind::Move | OpKind::Delete | OpKind::AlbumRename | OpKind::CueRename
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ExecStatus {
    #[default]
    Pending,
    Running,
    Skipped,
    Success,
    Failed,
}

impl ExecStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecStatus::Pending => "PENDING",
            ExecStatus::Running => "RUNNING",
            ExecStatus::Skipped => "SKIPPED",
            ExecStatus::Success => "SUCCESS",
            ExecStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned operation on one item.
///
/// Created by exactly one stage's analysis; its status is only touched by
/// the matching execute call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub id: RecordId,
    /// Planned record whose result this record reads, if any.
    pub upstream: Option<RecordId>,
    pub original_name: String,
    pub new_name: String,
    pub changed: bool,
    pub planned_path: PathBuf,
    pub op: OpKind,
    pub params: BTreeMap<String, String>,
    pub status: ExecStatus,
    pub fail_reason: Option<String>,
    /// Index of the stage that planned this record.
    pub stage: Option<usize>,
    lineage: Lineage,
    derived_from: Option<RecordId>,
}

impl ChangeRecord {
    /// Unchanged record for a file handed in by the enumerator.
    pub fn identity(id: RecordId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        Self {
            id,
            upstream: None,
            original_name: name.clone(),
            new_name: name,
            changed: false,
            planned_path: path.clone(),
            op: OpKind::None,
            params: BTreeMap::new(),
            status: ExecStatus::Pending,
            fail_reason: None,
            stage: None,
            lineage: Lineage::new(path),
            derived_from: None,
        }
    }

    /// Plan `op` on this record's current version, targeting `planned`.
    pub fn derive(&self, op: OpKind, planned: impl Into<PathBuf>) -> Self {
        let planned_path = planned.into();
        Self {
            id: self.id,
            upstream: self.upstream,
            original_name: self.original_name.clone(),
            new_name: file_name_of(&planned_path),
            changed: op != OpKind::None,
            planned_path,
            op,
            params: BTreeMap::new(),
            status: ExecStatus::Pending,
            fail_reason: None,
            stage: None,
            lineage: self.lineage.clone(),
            derived_from: Some(self.id),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// The file the enumerator handed in.
    pub fn source(&self) -> &Path {
        self.lineage.original()
    }

    /// The version this record operates on: the previous stage's result when
    /// one changed it, else the original.
    pub fn current_source(&self) -> &Path {
        self.lineage.current()
    }

    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    pub fn derived_from(&self) -> Option<RecordId> {
        self.derived_from
    }

    /// Whether the item is a directory. Judged on the original because later
    /// versions may not exist until execution.
    pub fn is_dir(&self) -> bool {
        self.source().is_dir()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Carry a planned record into the next stage as an unchanged item that
    /// reads the planned result.
    pub(crate) fn carry_forward(&self, id: RecordId) -> Self {
        let mut lineage = self.lineage.clone();
        if self.changed {
            lineage.advance(self.planned_path.clone());
        }
        let name = file_name_of(lineage.current());
        Self {
            id,
            upstream: if self.changed { Some(self.id) } else { self.upstream },
            original_name: self.original_name.clone(),
            new_name: name,
            changed: false,
            planned_path: lineage.current().to_path_buf(),
            op: OpKind::None,
            params: BTreeMap::new(),
            status: ExecStatus::Pending,
            fail_reason: None,
            stage: None,
            lineage,
            derived_from: None,
        }
    }

    /// Follow a directory move: when the current version lies under `from`,
    /// advance to the same relative path under `to` and read the move's
    /// result. Returns whether the item was moved.
    pub(crate) fn rebase(&mut self, from: &Path, to: &Path, by: RecordId) -> bool {
        let moved = match self.lineage.current().strip_prefix(from) {
            Ok(rest) if !rest.as_os_str().is_empty() => to.join(rest),
            _ => return false,
        };
        self.lineage.advance(moved.clone());
        self.new_name = file_name_of(&moved);
        self.planned_path = moved;
        self.upstream = Some(by);
        true
    }

    pub(crate) fn set_failed(&mut self, reason: impl Into<String>) {
        self.status = ExecStatus::Failed;
        self.fail_reason = Some(reason.into());
    }

    pub(crate) fn set_skipped(&mut self, reason: impl Into<String>) {
        self.status = ExecStatus::Skipped;
        self.fail_reason = Some(reason.into());
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
