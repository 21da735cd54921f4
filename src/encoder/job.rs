use std::path::PathBuf;

use super::format::TargetFormat;

/// Parameters of one encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub source: PathBuf,
    pub target: PathBuf,
    pub format: TargetFormat,
    /// Offset into the source, for cutting one track out of an image.
    pub start_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    /// Encoder-internal threads.
    pub threads: Option<usize>,
    /// Copy tags from the source. When false, only `tags` are written.
    pub map_metadata: bool,
    /// Explicit tags, written when metadata is not mapped or when the
    /// mapped attempt fails.
    pub tags: Vec<(String, String)>,
}

impl EncodeJob {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>, format: TargetFormat) -> Self {
        let (sample_rate, channels) = match format.fixed_layout() {
            Some((rate, ch)) => (Some(rate), Some(ch)),
            None => (None, None),
        };
        Self {
            source: source.into(),
            target: target.into(),
            format,
            start_ms: None,
            duration_ms: None,
            sample_rate,
            channels,
            threads: None,
            map_metadata: true,
            tags: Vec::new(),
        }
    }

    /// Add a tag, ignoring blank values.
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() {
            self.tags.push((key.to_string(), value.to_string()));
        }
        self
    }
}
