pub const UNKNOWN_DURATION: &str = "??:??";
pub const UNKNOWN_PERFORMER: &str = "Unknown";

/// A parsed cue sheet. Immutable once parsing and inference finish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CueSheet {
    pub album_title: String,
    pub album_performer: String,
    /// First `FILE` reference; the default image for every track.
    pub album_file_name: Option<String>,
    /// Every referenced file, in first-seen order, without duplicates.
    pub all_files: Vec<String>,
    pub tracks: Vec<CueTrack>,
    /// `REM KEY value` lines seen before the first track, in order.
    pub remarks: Vec<(String, String)>,
}

/// One track. Times are milliseconds into the referenced file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CueTrack {
    pub number: u32,
    pub title: String,
    pub file_name: Option<String>,
    /// Resolved performer: the track's own, else the album's, else
    /// [`UNKNOWN_PERFORMER`].
    pub performer: String,
    pub raw_start: Option<String>,
    pub raw_end: Option<String>,
    pub raw_last_end: Option<String>,
    pub start_ms: Option<u64>,
    pub end_ms: Option<u64>,
    pub last_end_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub duration_display: String,
    pub display_info: String,
}

impl CueSheet {
    /// Number of distinct audio files referenced.
    pub fn file_count(&self) -> usize {
        self.all_files.len()
    }

    pub fn remark(&self, key: &str) -> Option<&str> {
        self.remarks
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn genre(&self) -> Option<&str> {
        self.remark("GENRE")
    }

    pub fn date(&self) -> Option<&str> {
        self.remark("DATE")
    }

    pub(super) fn add_file(&mut self, name: &str) {
        if !self.all_files.iter().any(|f| f == name) {
            self.all_files.push(name.to_string());
        }
        if self.album_file_name.is_none() {
            self.album_file_name = Some(name.to_string());
        }
    }

    /// Fill durations, performers and preview strings. Raw indices are
    /// often incomplete, so the next track's start bounds this one when no
    /// end is given. A first track without `INDEX 01` starts at zero.
    pub(super) fn infer(&mut self) {
        if let Some(first) = self.tracks.first_mut() {
            first.start_ms.get_or_insert(0);
        }
        let starts: Vec<Option<u64>> = self.tracks.iter().map(|t| t.start_ms).collect();
        let album_performer = self.album_performer.trim().to_string();

        for (i, track) in self.tracks.iter_mut().enumerate() {
            let duration = match (track.start_ms, track.end_ms) {
                (Some(start), Some(end)) if i > 0 && end > start => Some(end - start),
                (Some(0), Some(end)) if i == 0 && end > 0 => Some(end),
                _ => match (starts.get(i + 1).copied().flatten(), track.start_ms) {
                    (Some(next), Some(start)) if next > start => Some(next - start),
                    _ => None,
                },
            };
            track.duration_ms = duration;

            if track.performer.trim().is_empty() {
                track.performer = if album_performer.is_empty() {
                    UNKNOWN_PERFORMER.to_string()
                } else {
                    album_performer.clone()
                };
            }

            track.duration_display = match duration {
                Some(ms) => {
                    let secs = ms / 1000;
                    format!("{:02}:{:02}", secs / 60, secs % 60)
                }
                None => UNKNOWN_DURATION.to_string(),
            };
            track.display_info = format!(
                "[{:02}] {} - {} [{}]",
                track.number, track.title, track.performer, track.duration_display
            );
        }
    }
}

impl CueTrack {
    /// The audio file holding this track: its own `FILE`, else the album's.
    pub fn effective_file_name<'a>(&'a self, sheet: &'a CueSheet) -> Option<&'a str> {
        self.file_name
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .or(sheet.album_file_name.as_deref())
    }

    /// `NN - Title.ext`, with characters unsafe in file names replaced by `_`.
    pub fn target_file_name(&self, ext: &str) -> String {
        let title = if self.title.trim().is_empty() {
            format!("Track {:02}", self.number)
        } else {
            self.title.trim().to_string()
        };
        let safe: String = title
            .chars()
            .map(|c| match c {
                '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect();
        let ext = ext.trim_start_matches('.');
        format!("{:02} - {}.{}", self.number, safe, ext)
    }
}
