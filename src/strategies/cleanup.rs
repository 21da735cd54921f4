use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use super::fsops::{move_path, remove_path};
use super::keys::Keys;
use crate::condition::StageGate;
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};

const KEY_PREFIX: &str = "fcs_";
const DEFAULT_RECYCLE_DIR: &str = ".reshelf-trash";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CleanupMode {
    Permanent,
    /// Move into the recycle directory instead of deleting.
    #[default]
    Recycle,
}

impl fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CleanupMode::Permanent => "PERMANENT",
            CleanupMode::Recycle => "RECYCLE",
        })
    }
}

impl FromStr for CleanupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERMANENT" | "DIRECT_DELETE" => Ok(CleanupMode::Permanent),
            "RECYCLE" | "PSEUDO_DELETE" => Ok(CleanupMode::Recycle),
            other => Err(format!("unknown cleanup mode: {other}")),
        }
    }
}

/// Deletes whatever passes its gate.
///
/// An empty gate would match every item, so it plans nothing instead.
#[derive(Debug, Clone, Default)]
pub struct CleanupStrategy {
    pub gate: StageGate,
    pub mode: CleanupMode,
    /// Relative paths resolve against the root holding each item.
    pub recycle_dir: Option<PathBuf>,
}

impl CleanupStrategy {
    pub fn new(gate: StageGate, mode: CleanupMode) -> Self {
        Self {
            gate,
            mode,
            recycle_dir: None,
        }
    }

    /// Where a recycled item goes. The layout below its root is mirrored.
    pub fn recycle_target(&self, path: &Path, roots: &[PathBuf]) -> PathBuf {
        let root = roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count());
        let dir = self
            .recycle_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECYCLE_DIR));

        match root {
            Some(root) => {
                let bin = if dir.is_absolute() { dir } else { root.join(dir) };
                let rel = path.strip_prefix(root).unwrap_or(path);
                bin.join(rel)
            }
            None => {
                let parent = path.parent().unwrap_or_else(|| Path::new(""));
                let bin = if dir.is_absolute() { dir } else { parent.join(dir) };
                bin.join(file_name_of(path))
            }
        }
    }

    fn plan(&self, rec: &ChangeRecord, roots: &[PathBuf]) -> ChangeRecord {
        let current = rec.current_source();
        let target = match self.mode {
            CleanupMode::Permanent => current.to_path_buf(),
            CleanupMode::Recycle => self.recycle_target(current, roots),
        };
        rec.derive(OpKind::Delete, target)
            .with_param("mode", self.mode)
    }
}

impl Strategy for CleanupStrategy {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::FilesOnly
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        if self.gate.is_empty() {
            debug!("cleanup has no conditions, planning nothing");
            return Vec::new();
        }
        ctx.map_records(inputs, |rec| vec![self.plan(rec, ctx.roots)])
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        if rec.op != OpKind::Delete {
            return Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: rec.op.to_string(),
            });
        }
        let source = rec.current_source();
        let mode = match rec.param("mode") {
            Some(v) => v.parse().map_err(|_| ExecuteError::InvalidParam {
                key: "mode",
                value: v.to_string(),
            })?,
            None => self.mode,
        };
        match mode {
            CleanupMode::Permanent => {
                if !source.exists() {
                    return Err(ExecuteError::MissingSource(source.to_path_buf()));
                }
                remove_path(source)
            }
            CleanupMode::Recycle => move_path(source, &rec.planned_path, true),
        }
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        keys.load_parsed(store, "mode", &mut self.mode);
        if let Some(dir) = store.get(&keys.key("trash")) {
            let dir = dir.trim();
            self.recycle_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        store.set(keys.key("mode"), self.mode);
        store.set(
            keys.key("trash"),
            self.recycle_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        );
    }
}
