use std::fs;
use std::io;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

/// Bytes inspected by the charset detector.
const SNIFF_LEN: usize = 8192;

/// Decode `bytes`, detecting the charset from a BOM or from a bounded
/// prefix. Low-confidence guesses fall back to UTF-8.
pub fn decode_text(bytes: &[u8]) -> (String, &'static Encoding) {
    let encoding = detect(bytes);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "replacement characters while decoding");
    }
    (text.into_owned(), encoding)
}

/// Read a text file in its detected encoding.
pub fn read_text(path: &Path) -> io::Result<(String, &'static Encoding)> {
    let bytes = fs::read(path)?;
    Ok(decode_text(&bytes))
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let prefix = &bytes[..bytes.len().min(SNIFF_LEN)];
    let mut detector = EncodingDetector::new();
    detector.feed(prefix, prefix.len() == bytes.len());
    let (encoding, confident) = detector.guess_assess(None, true);
    if confident { encoding } else { UTF_8 }
}
