use std::fmt;
use std::path::{MAIN_SEPARATOR, Path};
use std::str::FromStr;

use tracing::warn;

use super::fsops::{copy_path, move_path};
use super::keys::Keys;
use crate::condition::{StageGate, Subject};
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};
use crate::transform::TransformRule;

const KEY_PREFIX: &str = "arn_";

/// What a rewritten name containing a path separator does to the source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Move,
    Copy,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferMode::Move => "MOVE",
            TransferMode::Copy => "COPY",
        })
    }
}

impl FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MOVE" | "0" => Ok(TransferMode::Move),
            "COPY" | "1" => Ok(TransferMode::Copy),
            other => Err(format!("unknown transfer mode: {other}")),
        }
    }
}

/// Rewrites names with an ordered list of rules. Each rule sees the output
/// of the one before it.
#[derive(Debug, Clone, Default)]
pub struct RenameStrategy {
    pub gate: StageGate,
    pub rules: Vec<TransformRule>,
    pub transfer: TransferMode,
    pub scope: TargetScope,
}

impl RenameStrategy {
    pub fn new(rules: Vec<TransformRule>) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    fn plan(&self, rec: &ChangeRecord) -> Option<ChangeRecord> {
        let current = rec.current_source();
        let parent = current.parent().unwrap_or_else(|| Path::new(""));
        let is_dir = rec.is_dir();

        let original = file_name_of(current);
        let mut name = original.clone();
        for rule in &self.rules {
            let candidate = parent.join(&name);
            if rule.matches(&Subject::planned(&candidate, rec.source())) {
                name = rule.apply(&name, is_dir);
            }
        }
        if name == original || name.trim().is_empty() {
            return None;
        }

        let (target, op) = if name.contains('/') || name.contains(MAIN_SEPARATOR) {
            let path = Path::new(&name);
            let target = if path.is_absolute() {
                path.to_path_buf()
            } else {
                parent.join(path)
            };
            let op = match self.transfer {
                TransferMode::Move => OpKind::Move,
                TransferMode::Copy => OpKind::Copy,
            };
            (target, op)
        } else {
            (parent.join(&name), OpKind::Rename)
        };
        Some(rec.derive(op, target))
    }
}

impl Strategy for RenameStrategy {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn target_scope(&self) -> TargetScope {
        self.scope
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        if self.rules.is_empty() {
            return Vec::new();
        }
        ctx.map_records(inputs, |rec| self.plan(rec).into_iter().collect())
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        let src = rec.current_source();
        match rec.op {
            OpKind::Rename | OpKind::Move => move_path(src, &rec.planned_path, false),
            OpKind::Copy => copy_path(src, &rec.planned_path),
            op => Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: op.to_string(),
            }),
        }
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        keys.load_parsed(store, "cross_drive", &mut self.transfer);
        if let Some(v) = store.get(&keys.key("scope")) {
            self.scope = match v.trim() {
                "1" | "FOLDERS" => TargetScope::DirectoriesOnly,
                "2" | "ALL" => TargetScope::All,
                _ => TargetScope::FilesOnly,
            };
        }

        let Some(count) = store.get_parsed::<usize>(&keys.key("rule_count")) else {
            return;
        };
        self.rules = (0..count)
            .filter_map(|i| {
                let prefix = keys.key(&format!("rule_{i}_"));
                match TransformRule::load_config(store, &prefix) {
                    Ok(rule) => Some(rule),
                    Err(err) => {
                        warn!(rule = i, error = %err, "ignoring unreadable rename rule");
                        None
                    }
                }
            })
            .collect();
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        store.set(keys.key("cross_drive"), self.transfer);
        store.set(
            keys.key("scope"),
            match self.scope {
                TargetScope::FilesOnly => "FILES",
                TargetScope::DirectoriesOnly => "FOLDERS",
                TargetScope::All => "ALL",
            },
        );
        store.remove_prefix(&keys.key("rule_"));
        store.set(keys.key("rule_count"), self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            rule.save_config(store, &keys.key(&format!("rule_{i}_")));
        }
    }
}
