use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use super::fsops::move_path;
use super::keys::Keys;
use crate::condition::{StageGate, extension_of, is_audio_name};
use crate::config::ConfigStore;
use crate::cue::{has_file_reference, locate_audio_file, parse_file, rewrite_file_reference};
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};
use crate::transform::split_extension;

const KEY_PREFIX: &str = "crn_";
const CUE_TARGET_PARAM: &str = "cue_target_name";

/// Renames each cue sheet in a directory together with its audio image to a
/// common base name, then points the sheet at the renamed image.
#[derive(Debug, Clone)]
pub struct CueRenameStrategy {
    pub gate: StageGate,
    pub base_name: String,
}

impl Default for CueRenameStrategy {
    fn default() -> Self {
        Self {
            gate: StageGate::default(),
            base_name: "album".to_string(),
        }
    }
}

impl CueRenameStrategy {
    /// Base name of the `index`-th pair (zero based) out of `count`.
    pub fn rank_name(&self, index: usize, count: usize) -> String {
        if count > 1 {
            format!("{}disk({})", self.base_name, index + 1)
        } else {
            self.base_name.clone()
        }
    }

    /// Cue sheets directly inside `dir` that reference audio, each paired
    /// with the audio item it plays.
    fn pairs<'a>(
        &self,
        dir: &Path,
        ctx: &'a AnalyzeContext<'_>,
    ) -> Vec<(&'a ChangeRecord, &'a ChangeRecord)> {
        let children: Vec<&ChangeRecord> =
            ctx.items.iter().filter(|item| item.source().parent() == Some(dir)).collect();

        let mut pairs: Vec<(&ChangeRecord, &ChangeRecord)> = children
            .iter()
            .filter(|c| extension_of(&file_name_of(c.source())) == "cue")
            .filter(|c| has_file_reference(c.source()))
            .filter_map(|cue| {
                let audio = same_stem_audio(cue, &children).or_else(|| declared_audio(cue, ctx))?;
                Some((*cue, audio))
            })
            .collect();
        pairs.sort_by_cached_key(|(cue, _)| file_name_of(cue.current_source()).to_lowercase());
        let mut taken = HashSet::new();
        pairs.retain(|(_, audio)| taken.insert(audio.id));
        pairs
    }

    fn plan(&self, rec: &ChangeRecord, ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        let pairs = self.pairs(rec.source(), ctx);
        let count = pairs.len();
        let mut out = Vec::new();
        for (index, (cue, audio)) in pairs.into_iter().enumerate() {
            let rank = self.rank_name(index, count);

            let audio_current = audio.current_source();
            let audio_name = file_name_of(audio_current);
            let (_, ext) = split_extension(&audio_name);
            let audio_target = format!("{rank}{ext}");
            let audio_dir = audio_current.parent().unwrap_or_else(|| Path::new(""));
            let audio_renamed = audio_target != audio_name;
            if audio_renamed {
                out.push(audio.derive(OpKind::CueRename, audio_dir.join(&audio_target)));
            }

            let cue_current = cue.current_source();
            let cue_target = format!("{rank}.cue");
            if audio_renamed || cue_target != file_name_of(cue_current) {
                let cue_dir = cue_current.parent().unwrap_or_else(|| Path::new(""));
                out.push(
                    cue.derive(OpKind::CueRename, cue_dir.join(&cue_target))
                        .with_param(CUE_TARGET_PARAM, &audio_target),
                );
            }
            debug!(cue = %cue_current.display(), rank = %rank, "paired cue sheet");
        }
        out
    }
}

fn same_stem_audio<'a>(cue: &ChangeRecord, children: &[&'a ChangeRecord]) -> Option<&'a ChangeRecord> {
    let cue_name = file_name_of(cue.source());
    let (cue_stem, _) = split_extension(&cue_name);
    children.iter().copied().find(|c| {
        let name = file_name_of(c.source());
        let (stem, _) = split_extension(&name);
        is_audio_name(&name) && stem.eq_ignore_ascii_case(cue_stem)
    })
}

fn declared_audio<'a>(cue: &ChangeRecord, ctx: &'a AnalyzeContext<'_>) -> Option<&'a ChangeRecord> {
    let sheet = parse_file(cue.source()).ok()?;
    let image = locate_audio_file(cue.source(), sheet.album_file_name.as_deref())?;
    ctx.item_for_source(&image)
}

impl Strategy for CueRenameStrategy {
    fn name(&self) -> &'static str {
        "cue-rename"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::DirectoriesOnly
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        ctx.map_records(inputs, |rec| self.plan(rec, ctx))
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        if rec.op != OpKind::CueRename {
            return Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: rec.op.to_string(),
            });
        }
        move_path(rec.current_source(), &rec.planned_path, false)?;
        if let Some(audio) = rec.param(CUE_TARGET_PARAM) {
            rewrite_file_reference(&rec.planned_path, audio)?;
        }
        Ok(())
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        if let Some(base) = store.get(&keys.key("base")).filter(|b| !b.trim().is_empty()) {
            self.base_name = base.trim().to_string();
        }
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        store.set(keys.key("base"), &self.base_name);
    }
}
