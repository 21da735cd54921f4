use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::model::AudioMeta;

/// `01. Title`, `01 - Title`, `01_Title`.
static LEADING_TRACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)[\s._-]+(.+)$").expect("leading track pattern is valid")
});

/// `2003 - Album`.
static YEAR_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})\s+-\s+(.+)$").expect("year directory pattern is valid")
});

const SEGMENT_SEPARATOR: &str = " - ";

/// Guess metadata from the file name, then its parent and grandparent
/// directory names. Directory layers only fill fields that are still empty.
pub fn extract_from_file_system(path: &Path) -> AudioMeta {
    let mut meta = AudioMeta {
        is_guessed: true,
        ..AudioMeta::default()
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(caps) = LEADING_TRACK.captures(&name) {
        meta.track = caps[1].to_string();
        meta.title = strip_extension(caps[2].trim()).to_string();
    } else if name.contains(SEGMENT_SEPARATOR) {
        // `Artist - Title` or `Artist - Album - Title`; later segments stay
        // in the title.
        let parts: Vec<&str> = name.split(SEGMENT_SEPARATOR).map(str::trim).collect();
        meta.artist = parts[0].to_string();
        let title = if parts.len() >= 3 {
            meta.album = parts[1].to_string();
            parts[2..].join(SEGMENT_SEPARATOR)
        } else {
            parts[1].to_string()
        };
        meta.title = strip_extension(&title).to_string();
    } else {
        meta.title = strip_extension(&name).to_string();
    }

    let Some(parent) = path.parent() else {
        return meta;
    };
    if let Some(dir) = dir_name(parent) {
        if let Some(caps) = YEAR_DIR.captures(&dir) {
            fill(&mut meta.year, &caps[1]);
            fill(&mut meta.album, caps[2].trim());
        } else if let Some((artist, album)) = dir.split_once(SEGMENT_SEPARATOR) {
            fill(&mut meta.artist, artist.trim());
            fill(&mut meta.album, album.trim());
        } else {
            fill(&mut meta.album, &dir);
        }
    }
    if let Some(grand) = parent.parent().and_then(dir_name) {
        fill(&mut meta.artist, &grand);
    }
    meta
}

/// Name without its last extension. A leading dot is not an extension.
pub(crate) fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
}

fn fill(field: &mut String, value: &str) {
    if field.trim().is_empty() {
        *field = value.to_string();
    }
}
