use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/reshelf/config.toml` or `~/.config/reshelf/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `RESHELF__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scan: ScanSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
    /// Strategy parameters merged over the strategy store, keyed like the
    /// store itself (`s0_arn_rule_count`, ...).
    pub strategies: BTreeMap<String, String>,
    /// Config file the settings were read from, when one existed.
    #[serde(skip)]
    pub(crate) origin: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Whether to follow symlinks while enumerating roots.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Whether directories themselves are handed to the pipeline.
    ///
    /// Folder strategies (album directory naming, track numbering, cue
    /// renaming) only see directories when this is on.
    pub include_directories: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            follow_links: false,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            include_directories: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Stages to run, in order.
    ///
    /// Example: ["cue-split", "convert", "rename"]
    pub stages: Vec<StageName>,
    /// Worker bound for stages that do not declare their own.
    pub default_threads: usize,
    /// Run analysis as a parallel map over records.
    pub parallel_analyze: bool,
    /// Where strategy parameters are persisted. Relative paths are taken
    /// from the config file's directory; defaults to `strategies.toml` in
    /// the config home.
    pub store_path: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stages: vec![StageName::Rename],
            default_threads: 4,
            parallel_analyze: true,
            store_path: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    #[serde(alias = "advanced-rename")]
    Rename,
    #[serde(alias = "move", alias = "file-migrate")]
    Migrate,
    #[serde(alias = "audio-convert")]
    Convert,
    #[serde(alias = "cue_split", alias = "cue-splitter")]
    CueSplit,
    #[serde(alias = "track_number", alias = "track-numbers")]
    TrackNumber,
    #[serde(alias = "album_dir_normalize", alias = "album-dir")]
    AlbumDirNormalize,
    #[serde(alias = "cue_rename")]
    CueRename,
    #[serde(alias = "delete")]
    Cleanup,
    #[serde(alias = "archive", alias = "unzip", alias = "file-unzip")]
    ArchiveNormalize,
    #[serde(alias = "type_fix", alias = "file-type-fix", alias = "fix-extension")]
    TypeFix,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Full `EnvFilter` directive; overrides `level` when set.
    pub filter: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            filter: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}
