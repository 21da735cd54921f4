use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::progress::{ProgressCounter, ProgressReporter};
use crate::condition::StageGate;
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::record::ChangeRecord;

/// Which items a stage looks at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TargetScope {
    #[default]
    FilesOnly,
    DirectoriesOnly,
    All,
}

impl TargetScope {
    pub fn admits(self, is_dir: bool) -> bool {
        match self {
            TargetScope::FilesOnly => !is_dir,
            TargetScope::DirectoriesOnly => is_dir,
            TargetScope::All => true,
        }
    }
}

/// Shared inputs for one stage's analysis.
pub struct AnalyzeContext<'a> {
    pub roots: &'a [PathBuf],
    /// Every item at this stage, eligible or not. Group strategies read
    /// siblings from here.
    pub items: &'a [ChangeRecord],
    pub progress: &'a dyn ProgressReporter,
    pub parallel: bool,
}

impl AnalyzeContext<'_> {
    /// Map every record independently, in parallel when enabled. Output
    /// order follows input order.
    pub fn map_records<F>(&self, inputs: &[ChangeRecord], f: F) -> Vec<ChangeRecord>
    where
        F: Fn(&ChangeRecord) -> Vec<ChangeRecord> + Send + Sync,
    {
        let counter = ProgressCounter::new(inputs.len(), self.progress);
        let step = |rec: &ChangeRecord| {
            let out = f(rec);
            counter.step(&rec.new_name);
            out
        };
        if self.parallel {
            inputs.par_iter().flat_map_iter(step).collect()
        } else {
            inputs.iter().flat_map(step).collect()
        }
    }

    /// The item whose original is `path`.
    pub fn item_for_source(&self, path: &Path) -> Option<&ChangeRecord> {
        self.items.iter().find(|item| item.source() == path)
    }

    /// Items currently located directly inside `dir`.
    pub fn children_of<'b>(&'b self, dir: &'b Path) -> impl Iterator<Item = &'b ChangeRecord> + 'b {
        self.items
            .iter()
            .filter(move |item| item.current_source().parent() == Some(dir))
    }
}

/// One stage of the pipeline.
///
/// `analyze` must not modify the filesystem. It receives only records that
/// passed the stage gate and target scope, and returns the records it plans;
/// inputs it does not return pass through unchanged. `execute` performs the
/// I/O for one record planned by this stage.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn target_scope(&self) -> TargetScope;

    /// Worker bound for execute; `None` uses the pipeline default.
    fn preferred_threads(&self) -> Option<usize> {
        None
    }

    fn gate(&self) -> &StageGate;

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord>;

    fn execute(&self, record: &ChangeRecord) -> Result<(), ExecuteError>;

    /// Read parameters from `{scope}{key_prefix}*` keys. Missing keys keep
    /// the current value.
    fn load_config(&mut self, store: &ConfigStore, scope: &str);

    fn save_config(&self, store: &mut ConfigStore, scope: &str);
}
