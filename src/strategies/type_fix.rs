use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use lofty::file::FileType;
use lofty::probe::Probe;
use tracing::debug;

use super::fsops::move_path;
use super::keys::Keys;
use crate::condition::{StageGate, extension_of, is_audio_name};
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};
use crate::transform::split_extension;

const KEY_PREFIX: &str = "tfx_";

/// Extensions accepted as already matching a detected container.
const EQUIVALENT: &[(&str, &[&str])] = &[
    ("m4a", &["mp4", "m4b", "alac"]),
    ("aiff", &["aif", "aifc"]),
    ("ogg", &["oga"]),
];

/// Extension for the container found in the file's leading bytes. The
/// file name plays no part.
pub fn detect_extension(path: &Path) -> Option<&'static str> {
    let file = File::open(path).ok()?;
    let guessed = Probe::new(BufReader::new(file)).guess_file_type().ok()?;
    Some(match guessed.file_type()? {
        FileType::Aac => "aac",
        FileType::Aiff => "aiff",
        FileType::Ape => "ape",
        FileType::Flac => "flac",
        FileType::Mpeg => "mp3",
        FileType::Mp4 => "m4a",
        FileType::Mpc => "mpc",
        FileType::Opus => "opus",
        FileType::Vorbis => "ogg",
        FileType::Speex => "spx",
        FileType::Wav => "wav",
        FileType::WavPack => "wv",
        _ => return None,
    })
}

fn matches_detected(current: &str, detected: &str) -> bool {
    current == detected
        || EQUIVALENT
            .iter()
            .any(|(ext, aliases)| *ext == detected && aliases.contains(&current))
}

/// Renames files whose extension disagrees with their content.
#[derive(Debug, Clone)]
pub struct TypeFixStrategy {
    pub gate: StageGate,
    /// Only look at names that already carry an audio extension.
    pub audio_only: bool,
}

impl Default for TypeFixStrategy {
    fn default() -> Self {
        Self {
            gate: StageGate::default(),
            audio_only: true,
        }
    }
}

impl TypeFixStrategy {
    fn plan(&self, rec: &ChangeRecord) -> Option<ChangeRecord> {
        let current = rec.current_source();
        let name = file_name_of(current);
        if self.audio_only && !is_audio_name(&name) {
            return None;
        }
        // The current version may not exist yet; its content is the original's.
        let backing = if current.exists() { current } else { rec.source() };
        let detected = detect_extension(backing)?;
        let ext = extension_of(&name);
        if matches_detected(&ext, detected) {
            return None;
        }

        let stem = split_extension(&name).0;
        let target = current.with_file_name(format!("{stem}.{detected}"));
        if target.exists() {
            debug!(target = %target.display(), "corrected name is taken, skipping");
            return None;
        }
        Some(
            rec.derive(OpKind::Rename, target)
                .with_param("detected", detected)
                .with_param("was", ext),
        )
    }
}

impl Strategy for TypeFixStrategy {
    fn name(&self) -> &'static str {
        "type-fix"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::FilesOnly
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        ctx.map_records(inputs, |rec| self.plan(rec).into_iter().collect())
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
        keys.load_parsed(store, "audio_only", &mut self.audio_only);
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        store.set(keys.key("audio_only"), self.audio_only);
    }
}
