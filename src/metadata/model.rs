/// Inferred audio metadata. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioMeta {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub year: String,
    pub track: String,
    /// Set when the fields came from file and directory names rather than
    /// from a tag.
    pub is_guessed: bool,
}

impl AudioMeta {
    /// No field carries any text.
    pub fn is_blank(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.trim().is_empty())
    }

    /// Fields in template order: artist, album, title, year, track.
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("artist", self.artist.as_str()),
            ("album", self.album.as_str()),
            ("title", self.title.as_str()),
            ("year", self.year.as_str()),
            ("track", self.track.as_str()),
        ]
    }
}
