use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::infer::{extract_from_file_system, strip_extension};
use super::model::AudioMeta;
use super::reader::{LoftyTagReader, TagReader};

/// Tag-first metadata lookup with file name fallback.
#[derive(Clone)]
pub struct MetadataResolver {
    reader: Arc<dyn TagReader>,
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new(Arc::new(LoftyTagReader))
    }
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver").finish_non_exhaustive()
    }
}

impl MetadataResolver {
    pub fn new(reader: Arc<dyn TagReader>) -> Self {
        Self { reader }
    }

    pub fn resolve(&self, file: &Path, force_file_name: bool) -> AudioMeta {
        self.resolve_with_names(file, file, force_file_name)
    }

    /// Read tags from `tags_from` and infer from the names in `names_from`.
    /// The two differ when an earlier stage has planned a new name that does
    /// not exist on disk yet.
    ///
    /// A tag is used only when it has a title or an artist and none of
    /// title, artist and album look garbled. Otherwise, or when
    /// `force_file_name` is set, the result is entirely inferred and marked
    /// guessed. A usable tag without a track number borrows only the track
    /// from inference.
    pub fn resolve_with_names(
        &self,
        tags_from: &Path,
        names_from: &Path,
        force_file_name: bool,
    ) -> AudioMeta {
        let tagged = if force_file_name {
            None
        } else {
            match self.reader.read(tags_from) {
                Ok(meta) => Some(meta),
                Err(err) => {
                    debug!(path = %tags_from.display(), error = %err, "tag read failed");
                    None
                }
            }
        };

        let mut meta = match tagged.filter(is_trustworthy) {
            Some(mut meta) => {
                meta.is_guessed = false;
                if meta.track.trim().is_empty() {
                    let guessed = extract_from_file_system(names_from);
                    if !guessed.track.trim().is_empty() {
                        meta.track = guessed.track;
                    }
                }
                meta
            }
            None => extract_from_file_system(names_from),
        };

        if meta.title.trim().is_empty() {
            let name = names_from
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            meta.title = strip_extension(&name).to_string();
        }
        meta
    }
}

/// Text that went through a broken charset conversion.
pub fn is_garbled(s: &str) -> bool {
    s.contains('\u{FFFD}') || s.contains("????")
}

fn is_trustworthy(meta: &AudioMeta) -> bool {
    let has_identity = !meta.title.trim().is_empty() || !meta.artist.trim().is_empty();
    has_identity && ![&meta.title, &meta.artist, &meta.album].into_iter().any(|s| is_garbled(s))
}
