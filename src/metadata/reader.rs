use std::borrow::Cow;
use std::path::Path;

use lofty::error::Result as LoftyResult;
use lofty::file::TaggedFile;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use tracing::debug;

use super::model::AudioMeta;
use crate::condition::extension_of;
use crate::error::MetadataError;

/// Audio container, judged by extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContainerKind {
    Mp3,
    Flac,
    Wav,
    Aiff,
    Ape,
    Asf,
    Dff,
    Dsf,
    Other,
}

impl ContainerKind {
    pub fn of(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        match extension_of(&name).as_str() {
            "mp3" => ContainerKind::Mp3,
            "flac" => ContainerKind::Flac,
            "wav" => ContainerKind::Wav,
            "aif" | "aiff" | "aifc" => ContainerKind::Aiff,
            "ape" => ContainerKind::Ape,
            "wma" | "asf" => ContainerKind::Asf,
            "dff" => ContainerKind::Dff,
            "dsf" => ContainerKind::Dsf,
            _ => ContainerKind::Other,
        }
    }

    /// Containers read by the dedicated path. The rest go through content
    /// sniffing.
    pub fn is_native(self) -> bool {
        !matches!(
            self,
            ContainerKind::Dff | ContainerKind::Dsf | ContainerKind::Other
        )
    }
}

/// Reads embedded tags from one file.
pub trait TagReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<AudioMeta, MetadataError>;
}

/// Tag reader backed by `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<AudioMeta, MetadataError> {
        let kind = ContainerKind::of(path);
        let tagged = if kind.is_native() {
            lofty::read_from_path(path).map_err(|e| MetadataError::Decode(e.to_string()))?
        } else {
            debug!(path = %path.display(), ?kind, "reading container by content");
            read_by_content(path)
                .map_err(|_| MetadataError::UnsupportedContainer(format!("{kind:?}")))?
        };

        let tag = tagged
            .primary_tag()
            .or_else(|| tagged.first_tag())
            .ok_or(MetadataError::NoTag)?;
        Ok(meta_from_tag(tag))
    }
}

fn read_by_content(path: &Path) -> LoftyResult<TaggedFile> {
    Ok(Probe::open(path)?.guess_file_type()?.read()?)
}

fn text(value: Option<Cow<'_, str>>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn meta_from_tag(tag: &Tag) -> AudioMeta {
    AudioMeta {
        artist: text(tag.artist()),
        album: text(tag.album()),
        title: text(tag.title()),
        year: year_of(tag),
        track: tag.track().map(|n| n.to_string()).unwrap_or_default(),
        is_guessed: false,
    }
}

/// Year from the year or recording date item, cut to four digits when the
/// value is a full date.
fn year_of(tag: &Tag) -> String {
    tag.items()
        .filter(|item| matches!(item.key(), ItemKey::Year | ItemKey::RecordingDate))
        .filter_map(|item| item.value().text())
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(|v| match v.get(..4) {
            Some(y) if y.chars().all(|c| c.is_ascii_digit()) => y.to_string(),
            _ => v.to_string(),
        })
        .unwrap_or_default()
}
