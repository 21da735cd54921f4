use std::path::{Path, PathBuf};

/// Tried in order when the declared audio file is missing.
pub const LOSSLESS_EXTENSIONS: &[&str] = &[
    ".flac", ".wav", ".ape", ".m4a", ".dsf", ".dff", ".tak", ".tta", ".wv",
];

/// Find the audio image a cue sheet refers to.
///
/// The declared name is tried first, relative to the cue's directory. Then
/// for each lossless extension the cue's own base name and the declared
/// name's base are tried. `None` means dependent operations must be skipped.
pub fn locate_audio_file(cue: &Path, declared: Option<&str>) -> Option<PathBuf> {
    let dir = cue.parent().unwrap_or_else(|| Path::new(""));
    let declared = declared.map(str::trim).filter(|d| !d.is_empty());

    if let Some(name) = declared {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let cue_stem = cue.file_stem().map(|s| s.to_string_lossy().into_owned());
    let declared_stem = declared.and_then(|d| match d.rfind('.') {
        Some(i) if i > 0 => Some(d[..i].to_string()),
        _ => None,
    });

    for ext in LOSSLESS_EXTENSIONS {
        for stem in [&cue_stem, &declared_stem].into_iter().flatten() {
            let candidate = dir.join(format!("{stem}{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
