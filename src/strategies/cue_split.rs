use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::convert::encode_record;
use super::keys::Keys;
use super::output::OutputOptions;
use crate::condition::{StageGate, extension_of};
use crate::config::ConfigStore;
use crate::cue::{CueSheet, CueTrack, locate_audio_file, parse_file};
use crate::encoder::{Encoder, FfmpegEncoder};
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};

const KEY_PREFIX: &str = "cue_";

/// Cuts the audio image behind a cue sheet into one file per track.
#[derive(Clone)]
pub struct CueSplitStrategy {
    pub gate: StageGate,
    pub options: OutputOptions,
    encoder: Arc<dyn Encoder>,
}

impl std::fmt::Debug for CueSplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CueSplitStrategy")
            .field("gate", &self.gate)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for CueSplitStrategy {
    fn default() -> Self {
        Self::new(Arc::new(FfmpegEncoder::default()))
    }
}

impl CueSplitStrategy {
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self {
            gate: StageGate::default(),
            options: OutputOptions::new("Split"),
            encoder,
        }
    }

    fn plan(&self, rec: &ChangeRecord, ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        let cue = rec.source();
        if extension_of(&file_name_of(cue)) != "cue" {
            return Vec::new();
        }
        let sheet = match parse_file(cue) {
            Ok(sheet) => sheet,
            Err(err) => {
                warn!(path = %cue.display(), error = %err, "unreadable cue sheet");
                return Vec::new();
            }
        };
        if sheet.tracks.is_empty() || sheet.file_count() == sheet.tracks.len() {
            debug!(path = %cue.display(), "cue sheet needs no splitting");
            return Vec::new();
        }

        sheet
            .tracks
            .iter()
            .filter_map(|track| self.plan_track(rec, &sheet, track, ctx))
            .collect()
    }

    fn plan_track(
        &self,
        rec: &ChangeRecord,
        sheet: &CueSheet,
        track: &CueTrack,
        ctx: &AnalyzeContext<'_>,
    ) -> Option<ChangeRecord> {
        let Some(image) = locate_audio_file(rec.source(), track.effective_file_name(sheet)) else {
            debug!(cue = %rec.source().display(), track = track.number, "audio image not found");
            return None;
        };

        // The image may already have a planned new name.
        let image_item = ctx.item_for_source(&image);
        let current: PathBuf = image_item
            .map(|item| item.current_source().to_path_buf())
            .unwrap_or_else(|| image.clone());

        let dir = current.parent().unwrap_or_else(|| Path::new(""));
        let target = self
            .options
            .output_dir(dir)
            .join(track.target_file_name(self.options.format.extension()));
        if target.exists() && !self.options.overwrite {
            debug!(target = %target.display(), "split target exists, skipping");
            return None;
        }

        let mut out = rec
            .derive(OpKind::Split, target)
            .with_param("source", current.display())
            .with_param("start", track.start_ms.unwrap_or(0))
            .with_param("display", &track.display_info)
            .with_param("meta_title", &track.title)
            .with_param("meta_artist", &track.performer)
            .with_param("meta_album", &sheet.album_title)
            .with_param("meta_track", track.number);
        if let Some(duration) = track.duration_ms {
            out = out.with_param("duration", duration);
        }
        if let Some(genre) = sheet.genre() {
            out = out.with_param("meta_genre", genre);
        }
        if let Some(date) = sheet.date() {
            out = out.with_param("meta_date", date);
        }
        if let Some(up) = image_item.and_then(|item| item.upstream) {
            out.upstream = Some(up);
        }
        Some(out)
    }
}

fn parse_ms(rec: &ChangeRecord, key: &'static str) -> Result<Option<u64>, ExecuteError> {
    rec.param(key)
        .map(|v| {
            v.trim().parse().map_err(|_| ExecuteError::InvalidParam {
                key,
                value: v.to_string(),
            })
        })
        .transpose()
}

impl Strategy for CueSplitStrategy {
    fn name(&self) -> &'static str {
        "cue-split"
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
        ctx.map_records(inputs, |rec| self.plan(rec, ctx))
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        if rec.op != OpKind::Split {
            return Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: rec.op.to_string(),
            });
        }
        let source = rec
            .param("source")
            .map(PathBuf::from)
            .ok_or(ExecuteError::MissingParam("source"))?;
        let start = parse_ms(rec, "start")?;
        let duration = parse_ms(rec, "duration")?;

        // Tracks carry their own tags.
        encode_record(self.encoder.as_ref(), &self.options, &source, rec, |job| {
            job.start_ms = start.filter(|&ms| ms > 0);
            job.duration_ms = duration;
            job.map_metadata = false;
        })
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
