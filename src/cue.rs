//! CUE sheet parsing, timing inference and audio image lookup.

mod encoding;
mod locate;
mod model;
mod parse;
mod rewrite;

pub use encoding::{decode_text, read_text};
pub use locate::{LOSSLESS_EXTENSIONS, locate_audio_file};
pub use model::{CueSheet, CueTrack, UNKNOWN_DURATION, UNKNOWN_PERFORMER};
pub use parse::{cue_time_to_ms, parse_file, parse_str};
pub use rewrite::{has_file_reference, rewrite_file_reference};

#[cfg(test)]
mod tests;
