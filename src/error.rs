//! Error types, one enum per concern.
//!
//! Most of these never reach the caller of the engine: condition failures
//! evaluate to `false`, rule failures revert to the input string and metadata
//! failures fall back to filename inference. They exist so the failure is
//! typed and logged at the point where it is swallowed.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("unknown condition kind: {0}")]
    UnknownKind(String),

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid size threshold {0:?} (expected decimal megabytes)")]
    InvalidSize(String),

    #[error("condition {0} requires a value")]
    MissingValue(&'static str),

    #[error("cannot stat {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("unknown rename action: {0}")]
    UnknownAction(String),

    #[error("unknown rename scope: {0}")]
    UnknownScope(String),

    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid character count {0:?}")]
    InvalidCount(String),

    #[error("script conversion failed")]
    ScriptConversion,
}

#[derive(Error, Debug)]
pub enum CueParseError {
    #[error("failed to read cue sheet {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: malformed TRACK number {value:?}")]
    TrackNumber { line: usize, value: String },

    #[error("line {line}: malformed INDEX {value:?}")]
    Index { line: usize, value: String },

    #[error("line {line}: INDEX before any TRACK")]
    IndexOutsideTrack { line: usize },

    #[error("malformed cue time {0:?}")]
    Time(String),
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported container: {0}")]
    UnsupportedContainer(String),

    #[error("failed to decode tags: {0}")]
    Decode(String),

    #[error("file has no tag")]
    NoTag,
}

#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("target already exists: {0}")]
    TargetExists(PathBuf),

    #[error("missing parameter {0:?}")]
    MissingParam(&'static str),

    #[error("invalid parameter {key:?}: {value:?}")]
    InvalidParam { key: &'static str, value: String },

    #[error("encoder failed: {0}")]
    Encoder(String),

    #[error("extraction failed: {0}")]
    Extract(String),

    #[error("{stage} cannot execute {op}")]
    Unsupported { stage: &'static str, op: String },

    #[error("cue rewrite failed: {0}")]
    Cue(#[from] CueParseError),
}

impl ExecuteError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("pipeline.default_threads must be >= 1")]
    ZeroThreads,

    #[error("pipeline.stages must name at least one stage")]
    NoStages,

    #[error("scan.max_depth must be >= 1 when set")]
    ZeroDepth,

    #[error("pipeline.store_path {0} is a directory")]
    StoreIsDirectory(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConfigStoreError {
    #[error("failed to access store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse store: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] toml::ser::Error),
}
