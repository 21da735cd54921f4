use std::fmt;
use std::str::FromStr;

/// Output format of a conversion or split.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TargetFormat {
    /// 16-bit 44.1 kHz stereo WAV, for burning CDs.
    #[default]
    CdWav,
    Wav,
    Flac,
    Mp3,
    Alac,
    Aac,
    Ogg,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 7] = [
        TargetFormat::CdWav,
        TargetFormat::Wav,
        TargetFormat::Flac,
        TargetFormat::Mp3,
        TargetFormat::Alac,
        TargetFormat::Aac,
        TargetFormat::Ogg,
    ];

    pub fn machine_name(self) -> &'static str {
        match self {
            TargetFormat::CdWav => "WAV_CD",
            TargetFormat::Wav => "WAV",
            TargetFormat::Flac => "FLAC",
            TargetFormat::Mp3 => "MP3",
            TargetFormat::Alac => "ALAC",
            TargetFormat::Aac => "AAC",
            TargetFormat::Ogg => "OGG",
        }
    }

    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::CdWav | TargetFormat::Wav => "wav",
            TargetFormat::Flac => "flac",
            TargetFormat::Mp3 => "mp3",
            TargetFormat::Alac | TargetFormat::Aac => "m4a",
            TargetFormat::Ogg => "ogg",
        }
    }

    pub fn codec(self) -> &'static str {
        match self {
            TargetFormat::CdWav => "pcm_s16le",
            TargetFormat::Wav => "pcm_s24le",
            TargetFormat::Flac => "flac",
            TargetFormat::Mp3 => "libmp3lame",
            TargetFormat::Alac => "alac",
            TargetFormat::Aac => "aac",
            TargetFormat::Ogg => "libvorbis",
        }
    }

    /// Container muxer name.
    pub fn muxer(self) -> &'static str {
        match self {
            TargetFormat::CdWav | TargetFormat::Wav => "wav",
            TargetFormat::Flac => "flac",
            TargetFormat::Mp3 => "mp3",
            TargetFormat::Alac | TargetFormat::Aac => "ipod",
            TargetFormat::Ogg => "ogg",
        }
    }

    /// Sample rate and channel count this format forces, if any.
    pub fn fixed_layout(self) -> Option<(u32, u32)> {
        match self {
            TargetFormat::CdWav => Some((44_100, 2)),
            _ => None,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.machine_name())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match upper.as_str() {
            "CD" | "CD_WAV" => Ok(TargetFormat::CdWav),
            other => TargetFormat::ALL
                .into_iter()
                .find(|f| f.machine_name() == other)
                .ok_or_else(|| format!("unknown target format: {s}")),
        }
    }
}
