use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::fsops::{move_path, sanitize_component};
use super::keys::Keys;
use crate::condition::{StageGate, is_audio_name};
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::metadata::{AudioMeta, MetadataResolver, format};
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};

const KEY_PREFIX: &str = "adn_";
const DEFAULT_TEMPLATE: &str = "%artist% - %year% - %album%";
const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Renames album directories after the metadata of the audio files directly
/// inside them.
#[derive(Debug, Clone)]
pub struct AlbumDirNormalizeStrategy {
    pub gate: StageGate,
    pub template: String,
    pub force_file_name_meta: bool,
    resolver: MetadataResolver,
}

impl Default for AlbumDirNormalizeStrategy {
    fn default() -> Self {
        Self {
            gate: StageGate::default(),
            template: DEFAULT_TEMPLATE.to_string(),
            force_file_name_meta: false,
            resolver: MetadataResolver::default(),
        }
    }
}

/// Most frequent non-blank value; ties go to the lexically smallest.
fn majority<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values.map(str::trim).filter(|v| !v.is_empty()) {
        *counts.entry(v).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(v, _)| v.to_string())
}

/// Drop the empty pieces a blank field leaves between `" - "` separators.
fn collapse_separators(name: &str) -> String {
    name.split(" - ")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" - ")
}

impl AlbumDirNormalizeStrategy {
    pub fn with_resolver(mut self, resolver: MetadataResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Directory name for an album whose tracks carry `tracks`.
    pub fn album_name(&self, dir_name: &str, tracks: &[AudioMeta]) -> String {
        let pick = |field: fn(&AudioMeta) -> &str| majority(tracks.iter().map(field));
        let summary = AudioMeta {
            artist: pick(|m| m.artist.as_str()).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: pick(|m| m.album.as_str()).unwrap_or_else(|| dir_name.to_string()),
            year: pick(|m| m.year.as_str()).unwrap_or_default(),
            ..AudioMeta::default()
        };
        collapse_separators(&sanitize_component(&format(&self.template, &summary)))
    }

    fn plan(&self, rec: &ChangeRecord, ctx: &AnalyzeContext<'_>) -> Option<ChangeRecord> {
        let tracks: Vec<AudioMeta> = ctx
            .children_of(rec.current_source())
            .filter(|child| !child.is_dir() && is_audio_name(&file_name_of(child.current_source())))
            .map(|child| {
                self.resolver.resolve_with_names(
                    child.source(),
                    child.current_source(),
                    self.force_file_name_meta,
                )
            })
            .collect();
        if tracks.is_empty() {
            return None;
        }

        let current = rec.current_source();
        let dir_name = file_name_of(current);
        let renamed = self.album_name(&dir_name, &tracks);
        if renamed.is_empty() || renamed == dir_name {
            return None;
        }
        debug!(dir = %current.display(), renamed = %renamed, "album directory renamed");
        let parent = current.parent().unwrap_or_else(|| Path::new(""));
        Some(rec.derive(OpKind::AlbumRename, parent.join(renamed)))
    }
}

impl Strategy for AlbumDirNormalizeStrategy {
    fn name(&self) -> &'static str {
        "album-dir"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::DirectoriesOnly
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        ctx.map_records(inputs, |rec| self.plan(rec, ctx).into_iter().collect())
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        match rec.op {
            OpKind::AlbumRename => move_path(rec.current_source(), &rec.planned_path, false),
            op => Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: op.to_string(),
            }),
        }
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        if let Some(template) = store.get(&keys.key("template")).filter(|t| !t.trim().is_empty()) {
            self.template = template.to_string();
        }
        keys.load_parsed(store, "force_meta", &mut self.force_file_name_meta);
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        store.set(keys.key("template"), &self.template);
        store.set(keys.key("force_meta"), self.force_file_name_meta);
    }
}
