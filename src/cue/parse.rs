use std::path::Path;

use super::encoding::read_text;
use super::model::{CueSheet, CueTrack};
use crate::error::CueParseError;

const FILE_TYPES: &[&str] = &["WAVE", "MP3", "FLAC", "AIFF", "BINARY", "MOTOROLA"];

/// Read and parse a cue sheet in its detected encoding.
pub fn parse_file(path: &Path) -> Result<CueSheet, CueParseError> {
    let (text, _) = read_text(path).map_err(|source| CueParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text)
}

/// Parse cue text. Unknown lines are skipped; a malformed `TRACK` or
/// `INDEX` rejects the whole sheet.
pub fn parse_str(text: &str) -> Result<CueSheet, CueParseError> {
    let mut sheet = CueSheet::default();
    let mut current_file: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim().trim_start_matches('\u{feff}');
        let Some((command, rest)) = split_command(line) else {
            continue;
        };
        let in_track = !sheet.tracks.is_empty();

        match command.to_ascii_uppercase().as_str() {
            "TITLE" => {
                let value = unquote(rest);
                match sheet.tracks.last_mut() {
                    Some(track) => track.title = value,
                    None => sheet.album_title = value,
                }
            }
            "PERFORMER" => {
                let value = unquote(rest);
                match sheet.tracks.last_mut() {
                    Some(track) => track.performer = value,
                    None => sheet.album_performer = value,
                }
            }
            "FILE" => {
                let name = file_payload(rest);
                if !name.is_empty() {
                    sheet.add_file(&name);
                    current_file = Some(name);
                }
            }
            "TRACK" => {
                let token = rest.split_whitespace().next().unwrap_or("");
                let number = token.parse().map_err(|_| CueParseError::TrackNumber {
                    line: line_no,
                    value: rest.to_string(),
                })?;
                sheet.tracks.push(CueTrack {
                    number,
                    file_name: current_file.clone(),
                    ..CueTrack::default()
                });
            }
            "INDEX" => {
                let Some(track) = sheet.tracks.last_mut() else {
                    return Err(CueParseError::IndexOutsideTrack { line: line_no });
                };
                let mut parts = rest.split_whitespace();
                let (Some(number), Some(time)) = (parts.next(), parts.next()) else {
                    return Err(CueParseError::Index {
                        line: line_no,
                        value: rest.to_string(),
                    });
                };
                let number: u32 = number.parse().map_err(|_| CueParseError::Index {
                    line: line_no,
                    value: rest.to_string(),
                })?;
                let ms = cue_time_to_ms(time).map_err(|_| CueParseError::Index {
                    line: line_no,
                    value: rest.to_string(),
                })?;
                match number {
                    0 => {
                        track.raw_last_end = Some(time.to_string());
                        track.last_end_ms = Some(ms);
                    }
                    1 => {
                        track.raw_start = Some(time.to_string());
                        track.start_ms = Some(ms);
                    }
                    2 => {
                        track.raw_end = Some(time.to_string());
                        track.end_ms = Some(ms);
                    }
                    _ => {}
                }
            }
            "REM" if !in_track => {
                if let Some((key, value)) = split_command(rest) {
                    sheet
                        .remarks
                        .push((key.to_ascii_uppercase(), unquote(value)));
                }
            }
            _ => {}
        }
    }

    sheet.infer();
    Ok(sheet)
}

/// `MM:SS:FF` at 75 frames per second. The frame part is optional.
pub fn cue_time_to_ms(time: &str) -> Result<u64, CueParseError> {
    let bad = || CueParseError::Time(time.to_string());
    let mut parts = time.trim().split(':');
    let min: u64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let sec: u64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
    let frames: u64 = match parts.next() {
        Some(p) => p.parse().map_err(|_| bad())?,
        None => 0,
    };
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(min * 60_000 + sec * 1000 + frames * 1000 / 75)
}

fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.find(char::is_whitespace) {
        Some(i) => Some((&line[..i], line[i..].trim())),
        None => Some((line, "")),
    }
}

/// Strip surrounding quotes; unquoted payloads are taken whole.
fn unquote(value: &str) -> String {
    let value = value.trim();
    match value.strip_prefix('"') {
        Some(rest) => match rest.rfind('"') {
            Some(end) => rest[..end].to_string(),
            None => rest.to_string(),
        },
        None => value.to_string(),
    }
}

/// File name from a `FILE` payload. A quoted name is taken as is; otherwise
/// the name ends at the first whitespace-separated file-type token.
fn file_payload(rest: &str) -> String {
    let rest = rest.trim();
    if rest.starts_with('"') {
        return unquote_first(rest);
    }
    let mut end = rest.len();
    let mut offset = 0;
    for token in rest.split(' ') {
        if offset > 0 && FILE_TYPES.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            end = offset - 1;
            break;
        }
        offset += token.len() + 1;
    }
    rest[..end.min(rest.len())].trim().to_string()
}

fn unquote_first(value: &str) -> String {
    let inner = &value[1..];
    match inner.find('"') {
        Some(end) => inner[..end].to_string(),
        None => inner.to_string(),
    }
}
