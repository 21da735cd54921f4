use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::fsops::move_path;
use super::keys::Keys;
use crate::condition::{StageGate, is_audio_name};
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, ProgressCounter, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};
use crate::transform::split_extension;

const KEY_PREFIX: &str = "tns_";

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.\s_-]*").expect("leading number pattern is valid"));

/// Numbers the audio files of each directory in name order.
#[derive(Debug, Clone)]
pub struct TrackNumberStrategy {
    pub gate: StageGate,
    /// Zero-pad to at least two digits.
    pub pad: bool,
    pub separator: String,
}

impl Default for TrackNumberStrategy {
    fn default() -> Self {
        Self {
            gate: StageGate::default(),
            pad: true,
            separator: ". ".to_string(),
        }
    }
}

impl TrackNumberStrategy {
    /// `"{number}{separator}{stem}{ext}"` with any existing leading number
    /// removed from the stem.
    pub fn numbered_name(&self, name: &str, number: usize, width: usize) -> String {
        let (stem, ext) = split_extension(name);
        let stripped = LEADING_NUMBER.replace(stem, "");
        let stripped = stripped.trim();
        if stripped.is_empty() {
            format!("{number:0width$}{ext}")
        } else {
            format!("{number:0width$}{}{stripped}{ext}", self.separator)
        }
    }

    fn plan_dir(&self, dir: &Path, mut files: Vec<&ChangeRecord>) -> Vec<ChangeRecord> {
        if files.len() < 2 {
            return Vec::new();
        }
        files.sort_by_cached_key(|rec| file_name_of(rec.current_source()).to_lowercase());
        let width = if self.pad {
            files.len().to_string().len().max(2)
        } else {
            0
        };

        files
            .into_iter()
            .enumerate()
            .filter_map(|(i, rec)| {
                let name = file_name_of(rec.current_source());
                let renamed = self.numbered_name(&name, i + 1, width);
                (renamed != name).then(|| rec.derive(OpKind::Rename, dir.join(renamed)))
            })
            .collect()
    }
}

impl Strategy for TrackNumberStrategy {
    fn name(&self) -> &'static str {
        "track-number"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::FilesOnly
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        let mut groups: BTreeMap<PathBuf, Vec<&ChangeRecord>> = BTreeMap::new();
        for rec in inputs {
            let current = rec.current_source();
            if is_audio_name(&file_name_of(current)) {
                let dir = current.parent().unwrap_or_else(|| Path::new(""));
                groups.entry(dir.to_path_buf()).or_default().push(rec);
            }
        }

        let counter = ProgressCounter::new(groups.len(), ctx.progress);
        groups
            .into_iter()
            .flat_map(|(dir, files)| {
                counter.step(&dir.display().to_string());
                self.plan_dir(&dir, files)
            })
            .collect()
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        match rec.op {
            OpKind::Rename => move_path(rec.current_source(), &rec.planned_path, false),
            op => Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: op.to_string(),
            }),
        }
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        keys.load_parsed(store, "pad", &mut self.pad);
        if let Some(sep) = store.get(&keys.key("sep")) {
            self.separator = sep.to_string();
        }
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        store.set(keys.key("pad"), self.pad);
        store.set(keys.key("sep"), &self.separator);
    }
}
