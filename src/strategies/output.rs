use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::fsops::sanitize_component;
use super::keys::Keys;
use crate::config::ConfigStore;
use crate::encoder::{EncodeJob, TargetFormat};
use crate::record::{ChangeRecord, RecordId};

/// Where encoded files are written, relative to the source's directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OutputDirMode {
    /// Next to the source.
    SameDir,
    /// In a named sub-directory of the source's directory.
    #[default]
    SubDir,
    /// At a path resolved against the source's directory; may be absolute.
    Relative,
}

impl OutputDirMode {
    pub fn machine_name(self) -> &'static str {
        match self {
            OutputDirMode::SameDir => "SOURCE",
            OutputDirMode::SubDir => "SUB_DIR",
            OutputDirMode::Relative => "RELATIVE",
        }
    }
}

impl fmt::Display for OutputDirMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.machine_name())
    }
}

impl FromStr for OutputDirMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOURCE" | "SAME_DIR" => Ok(OutputDirMode::SameDir),
            "SUB_DIR" | "SUBDIR" => Ok(OutputDirMode::SubDir),
            "RELATIVE" => Ok(OutputDirMode::Relative),
            other => Err(format!("unknown output mode: {other}")),
        }
    }
}

/// Encoding and placement options shared by conversion and splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    pub format: TargetFormat,
    pub dir_mode: OutputDirMode,
    /// Sub-directory or relative path; blank means `"<label> - <FORMAT>"`.
    pub relative_path: String,
    /// `None` keeps the source's rate.
    pub sample_rate: Option<u32>,
    /// `None` keeps the source's layout.
    pub channels: Option<u32>,
    pub encoder_threads: usize,
    pub workers: usize,
    pub overwrite: bool,
    /// Ignore source tags and rebuild them from names.
    pub force_file_name_meta: bool,
    /// Encode into this directory first, then move into place.
    pub staging_dir: Option<PathBuf>,
    /// Without a staging directory, encode to `<target>.temp` first.
    pub temp_suffix: bool,
    label: &'static str,
}

impl OutputOptions {
    pub fn new(label: &'static str) -> Self {
        Self {
            format: TargetFormat::default(),
            dir_mode: OutputDirMode::default(),
            relative_path: String::new(),
            sample_rate: Some(44_100),
            channels: Some(2),
            encoder_threads: 4,
            workers: 2,
            overwrite: false,
            force_file_name_meta: false,
            staging_dir: None,
            temp_suffix: true,
            label,
        }
    }

    /// Output directory for a source located in `source_dir`.
    pub fn output_dir(&self, source_dir: &Path) -> PathBuf {
        let rel = self.relative_path.trim();
        let rel = if rel.is_empty() {
            format!("{} - {}", self.label, self.format.extension().to_ascii_uppercase())
        } else {
            rel.to_string()
        };
        match self.dir_mode {
            OutputDirMode::SameDir => source_dir.to_path_buf(),
            OutputDirMode::SubDir => source_dir.join(sanitize_component(&rel)),
            OutputDirMode::Relative => source_dir.join(rel),
        }
    }

    /// Intermediate path the encoder writes to, if any.
    pub fn staging_path(&self, target: &Path, id: RecordId) -> Option<PathBuf> {
        let name = target.file_name()?.to_string_lossy();
        match &self.staging_dir {
            Some(dir) if dir.is_dir() => Some(dir.join(format!("reshelf-{}-{name}", id.0))),
            _ if self.temp_suffix => Some(target.with_file_name(format!("{name}.temp"))),
            _ => None,
        }
    }

    /// Job writing `write_to`, carrying the record's explicit tags.
    pub fn job(&self, source: &Path, write_to: &Path, rec: &ChangeRecord) -> EncodeJob {
        let mut job = EncodeJob::new(source, write_to, self.format);
        if self.format.fixed_layout().is_none() {
            job.sample_rate = self.sample_rate;
            job.channels = self.channels;
        }
        job.threads = Some(self.encoder_threads.max(1));
        job.map_metadata = !self.force_file_name_meta;
        for key in ["title", "artist", "album", "date", "track", "genre"] {
            if let Some(value) = rec.param(&format!("meta_{key}")) {
                job = job.tag(key, value);
            }
        }
        job
    }

    pub(super) fn load(&mut self, store: &ConfigStore, keys: &Keys) {
        keys.load_parsed(store, "format", &mut self.format);
        keys.load_parsed(store, "out_mode", &mut self.dir_mode);
        if let Some(rel) = store.get(&keys.key("rel_path")) {
            self.relative_path = rel.to_string();
        }
        if let Some(v) = store.get(&keys.key("sample_rate")) {
            self.sample_rate = v.trim().parse().ok();
        }
        if let Some(v) = store.get(&keys.key("channels")) {
            self.channels = v.trim().parse().ok();
        }
        keys.load_parsed(store, "inner_threads", &mut self.encoder_threads);
        keys.load_parsed(store, "workers", &mut self.workers);
        keys.load_parsed(store, "overwrite", &mut self.overwrite);
        keys.load_parsed(store, "force_meta", &mut self.force_file_name_meta);
        keys.load_parsed(store, "temp_suffix", &mut self.temp_suffix);
        if let Some(dir) = store.get(&keys.key("cache_dir")) {
            let dir = dir.trim();
            self.staging_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
    }

    pub(super) fn save(&self, store: &mut ConfigStore, keys: &Keys) {
        let original = |v: Option<u32>| v.map_or_else(|| "ORIGINAL".to_string(), |n| n.to_string());
        store.set(keys.key("format"), self.format);
        store.set(keys.key("out_mode"), self.dir_mode);
        store.set(keys.key("rel_path"), &self.relative_path);
        store.set(keys.key("sample_rate"), original(self.sample_rate));
        store.set(keys.key("channels"), original(self.channels));
        store.set(keys.key("inner_threads"), self.encoder_threads);
        store.set(keys.key("workers"), self.workers);
        store.set(keys.key("overwrite"), self.overwrite);
        store.set(keys.key("force_meta"), self.force_file_name_meta);
        store.set(keys.key("temp_suffix"), self.temp_suffix);
        store.set(
            keys.key("cache_dir"),
            self.staging_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        );
    }
}
