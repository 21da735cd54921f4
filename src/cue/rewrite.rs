use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::encoding::read_text;
use crate::error::CueParseError;

fn is_file_line(line: &str) -> bool {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    parts.next().is_some_and(|cmd| cmd.eq_ignore_ascii_case("FILE")) && parts.next().is_some()
}

/// Whether the sheet has at least one `FILE` line.
pub fn has_file_reference(path: &Path) -> bool {
    match read_text(path) {
        Ok((text, _)) => text.lines().any(is_file_line),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "cannot read cue sheet");
            false
        }
    }
}

/// Point every `FILE` line at `new_name` and write the sheet back as UTF-8.
///
/// Returns whether anything was replaced; an unmatched sheet is left
/// untouched on disk.
pub fn rewrite_file_reference(path: &Path, new_name: &str) -> Result<bool, CueParseError> {
    let io_err = |source| CueParseError::Io {
        path: path.to_path_buf(),
        source,
    };
    let (text, encoding) = read_text(path).map_err(io_err)?;

    let replacement = format!("FILE \"{new_name}\" WAVE");
    let mut replaced = false;
    let mut out = String::with_capacity(text.len() + replacement.len());
    for line in text.lines() {
        if is_file_line(line) {
            out.push_str(&replacement);
            replaced = true;
        } else {
            out.push_str(line.trim_start_matches('\u{feff}'));
        }
        out.push('\n');
    }

    if replaced {
        fs::write(path, out).map_err(io_err)?;
        info!(
            path = %path.display(),
            from = encoding.name(),
            file = new_name,
            "rewrote cue file reference"
        );
    }
    Ok(replaced)
}
