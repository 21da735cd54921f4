use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::fsops::{ensure_parent, move_path, remove_path};
use super::keys::Keys;
use super::output::OutputOptions;
use crate::condition::{StageGate, is_audio_name};
use crate::config::ConfigStore;
use crate::encoder::{EncodeJob, Encoder, FfmpegEncoder};
use crate::error::ExecuteError;
use crate::metadata::MetadataResolver;
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};
use crate::transform::split_extension;

const KEY_PREFIX: &str = "ac_";

/// Re-encodes audio files into the configured format.
#[derive(Clone)]
pub struct ConvertStrategy {
    pub gate: StageGate,
    pub options: OutputOptions,
    encoder: Arc<dyn Encoder>,
    resolver: MetadataResolver,
}

impl std::fmt::Debug for ConvertStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertStrategy")
            .field("gate", &self.gate)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for ConvertStrategy {
    fn default() -> Self {
        Self::new(Arc::new(FfmpegEncoder::default()))
    }
}

impl ConvertStrategy {
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self {
            gate: StageGate::default(),
            options: OutputOptions::new("Convert"),
            encoder,
            resolver: MetadataResolver::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: MetadataResolver) -> Self {
        self.resolver = resolver;
        self
    }

    fn plan(&self, rec: &ChangeRecord) -> Option<ChangeRecord> {
        let current = rec.current_source();
        let name = file_name_of(current);
        let (stem, ext) = split_extension(&name);
        if ext.is_empty() || !is_audio_name(&name) {
            return None;
        }

        let dir = current.parent().unwrap_or_else(|| Path::new(""));
        let target = self
            .options
            .output_dir(dir)
            .join(format!("{}.{}", stem.trim(), self.options.format.extension()));
        if target == current {
            return None;
        }
        if target.exists() && !self.options.overwrite {
            debug!(target = %target.display(), "conversion target exists, skipping");
            return None;
        }

        let meta = self.resolver.resolve_with_names(
            rec.source(),
            current,
            self.options.force_file_name_meta,
        );
        let mut out = rec
            .derive(OpKind::Convert, target)
            .with_param("format", self.options.format);
        for (key, value) in meta.fields() {
            if !value.trim().is_empty() {
                let key = if key == "year" { "date" } else { key };
                out = out.with_param(format!("meta_{key}"), value);
            }
        }
        Some(out)
    }
}

/// Encode `source` into the record's planned path, through a staging file
/// when the options ask for one. `adjust` sees the job before it runs.
pub(super) fn encode_record(
    encoder: &dyn Encoder,
    options: &OutputOptions,
    source: &Path,
    rec: &ChangeRecord,
    adjust: impl FnOnce(&mut EncodeJob),
) -> Result<(), ExecuteError> {
    if !source.exists() {
        return Err(ExecuteError::MissingSource(source.to_path_buf()));
    }
    let target = &rec.planned_path;
    if target.exists() && !options.overwrite {
        return Err(ExecuteError::TargetExists(target.clone()));
    }

    let staging = options.staging_path(target, rec.id);
    let write_to = staging.as_deref().unwrap_or(target);
    ensure_parent(write_to)?;
    // A target that existed before and is written in place is never removed.
    let disposable = staging.is_some() || !target.exists();
    let mut job = options.job(source, write_to, rec);
    adjust(&mut job);
    if let Err(err) = encoder.encode(&job) {
        if disposable {
            discard_partial(write_to);
        }
        return Err(err);
    }

    if let Some(staged) = &staging {
        if let Err(err) = move_path(staged, target, options.overwrite) {
            discard_partial(staged);
            return Err(err);
        }
    }
    Ok(())
}

/// Remove whatever a failed encode left at `path`.
fn discard_partial(path: &Path) {
    if path.exists() {
        match remove_path(path) {
            Ok(()) => debug!(path = %path.display(), "removed partial output"),
            Err(err) => warn!(path = %path.display(), error = %err, "could not remove partial output"),
        }
    }
}

impl Strategy for ConvertStrategy {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::FilesOnly
    }

    fn preferred_threads(&self) -> Option<usize> {
        Some(self.options.workers.max(1))
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        ctx.map_records(inputs, |rec| self.plan(rec).into_iter().collect())
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        if rec.op != OpKind::Convert {
            return Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: rec.op.to_string(),
            });
        }
        encode_record(
            self.encoder.as_ref(),
            &self.options,
            rec.current_source(),
            rec,
            |_| {},
        )
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        self.options.load(store, &keys);
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        self.options.save(store, &keys);
    }
}
