use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use super::kind::ConditionKind;
use crate::error::ConditionError;

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "m4a", "ape", "dsf", "dff", "dts", "ogg", "wma", "aac", "alac", "opus",
    "tak", "tta", "wv",
];

pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "7z", "rar", "tar", "gz", "jar", "xz", "bz2", "iso"];

/// What a condition is evaluated against.
///
/// `name` supplies the name, path, parent directory and extension. It is the
/// planned path and may not exist yet. `backing` is the file actually on disk
/// and supplies size and file/directory type.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub name: &'a Path,
    pub backing: &'a Path,
}

impl<'a> Subject<'a> {
    pub fn of(path: &'a Path) -> Self {
        Self {
            name: path,
            backing: path,
        }
    }

    pub fn planned(name: &'a Path, backing: &'a Path) -> Self {
        Self { name, backing }
    }

    fn file_name(&self) -> Cow<'a, str> {
        self.name
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or(Cow::Borrowed(""))
    }
}

/// Whether the name carries an audio extension.
pub fn is_audio_name(name: &str) -> bool {
    AUDIO_EXTENSIONS.contains(&extension_of(name).as_str())
}

/// Lowercased extension after the last dot. Names starting with their only
/// dot (`.hidden`) have none.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(i) if i > 0 => name[i + 1..].to_lowercase(),
        _ => String::new(),
    }
}

/// A single predicate over one file.
#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    value: String,
    regex: Option<Regex>,
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl Condition {
    /// Build a condition without validating it. An invalid regex or size
    /// makes [`test`](Self::test) return `false`.
    pub fn new(kind: ConditionKind, value: impl Into<String>) -> Self {
        let value = value.into();
        let regex = match kind {
            ConditionKind::RegexMatch => full_match_regex(&value).ok(),
            _ => None,
        };
        Self { kind, value, regex }
    }

    /// Build a condition, rejecting values that could never match.
    pub fn parse(kind: &str, value: &str) -> Result<Self, ConditionError> {
        let kind: ConditionKind = kind.parse()?;
        let cond = Self::new(kind, value);
        cond.validate()?;
        Ok(cond)
    }

    pub fn validate(&self) -> Result<(), ConditionError> {
        match self.kind {
            ConditionKind::RegexMatch => full_match_regex(&self.value).map(|_| ()),
            ConditionKind::SizeGreaterThan | ConditionKind::SizeLessThan => {
                size_threshold(&self.value).map(|_| ())
            }
            ConditionKind::ExtIn | ConditionKind::ExtNotIn if self.value.trim().is_empty() => {
                Err(ConditionError::MissingValue(self.kind.machine_name()))
            }
            _ => Ok(()),
        }
    }

    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Evaluate against a path used both for naming and for on-disk checks.
    pub fn test_path(&self, path: &Path) -> bool {
        self.test(&Subject::of(path))
    }

    pub fn test(&self, subject: &Subject<'_>) -> bool {
        match self.evaluate(subject) {
            Ok(hit) => hit,
            Err(err) => {
                debug!(condition = %self, error = %err, "condition failed closed");
                false
            }
        }
    }

    fn evaluate(&self, subject: &Subject<'_>) -> Result<bool, ConditionError> {
        let name = subject.file_name();
        let value = self.value.as_str();
        let hit = match self.kind {
            ConditionKind::Contains => name.contains(value),
            ConditionKind::NotContains => !name.contains(value),
            ConditionKind::StartsWith => name.starts_with(value),
            ConditionKind::EndsWith => name.ends_with(value),
            ConditionKind::RegexMatch => match &self.regex {
                Some(re) => re.is_match(&name),
                None => {
                    full_match_regex(value)?;
                    false
                }
            },
            ConditionKind::SizeGreaterThan => {
                let threshold = size_threshold(value)?;
                file_len(subject.backing)? as f64 > threshold
            }
            ConditionKind::SizeLessThan => {
                let threshold = size_threshold(value)?;
                (file_len(subject.backing)? as f64) < threshold
            }
            ConditionKind::ParentDirIs => subject
                .name
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|p| p.to_string_lossy() == value),
            ConditionKind::PathContains => full_path(subject.name).contains(value),
            ConditionKind::PathNotContains => !full_path(subject.name).contains(value),
            ConditionKind::ExtIn => ext_listed(&name, value)?,
            ConditionKind::ExtNotIn => !ext_listed(&name, value)?,
            ConditionKind::IsAudio => AUDIO_EXTENSIONS.contains(&extension_of(&name).as_str()),
            ConditionKind::IsNotAudio => !AUDIO_EXTENSIONS.contains(&extension_of(&name).as_str()),
            ConditionKind::IsArchive => ARCHIVE_EXTENSIONS.contains(&extension_of(&name).as_str()),
            ConditionKind::IsNotArchive => {
                !ARCHIVE_EXTENSIONS.contains(&extension_of(&name).as_str())
            }
            ConditionKind::IsDirectory => subject.backing.is_dir(),
            ConditionKind::IsFile => subject.backing.is_file(),
        };
        Ok(hit)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.needs_value() {
            write!(f, "{} [{}]", self.kind, self.value)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

fn full_match_regex(pattern: &str) -> Result<Regex, ConditionError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConditionError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Decimal megabytes to bytes.
fn size_threshold(value: &str) -> Result<f64, ConditionError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|mb| mb.is_finite())
        .map(|mb| mb * 1024.0 * 1024.0)
        .ok_or_else(|| ConditionError::InvalidSize(value.to_string()))
}

fn file_len(path: &Path) -> Result<u64, ConditionError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ConditionError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn full_path(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn ext_listed(name: &str, list: &str) -> Result<bool, ConditionError> {
    if list.trim().is_empty() {
        return Err(ConditionError::MissingValue("EXT_IN"));
    }
    let ext = extension_of(name);
    Ok(list
        .split([',', '，', '|'])
        .map(|t| t.trim().trim_start_matches('.').to_lowercase())
        .any(|t| !t.is_empty() && t == ext))
}
