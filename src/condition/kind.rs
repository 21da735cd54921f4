use std::fmt;
use std::str::FromStr;

use crate::error::ConditionError;

/// Every predicate a [`Condition`](super::Condition) can express.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    RegexMatch,
    SizeGreaterThan,
    SizeLessThan,
    ParentDirIs,
    PathContains,
    PathNotContains,
    ExtIn,
    ExtNotIn,
    IsAudio,
    IsNotAudio,
    IsArchive,
    IsNotArchive,
    IsDirectory,
    IsFile,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 18] = [
        ConditionKind::Contains,
        ConditionKind::NotContains,
        ConditionKind::StartsWith,
        ConditionKind::EndsWith,
        ConditionKind::RegexMatch,
        ConditionKind::SizeGreaterThan,
        ConditionKind::SizeLessThan,
        ConditionKind::ParentDirIs,
        ConditionKind::PathContains,
        ConditionKind::PathNotContains,
        ConditionKind::ExtIn,
        ConditionKind::ExtNotIn,
        ConditionKind::IsAudio,
        ConditionKind::IsNotAudio,
        ConditionKind::IsArchive,
        ConditionKind::IsNotArchive,
        ConditionKind::IsDirectory,
        ConditionKind::IsFile,
    ];

    /// Stable name used in the config store.
    pub fn machine_name(self) -> &'static str {
        match self {
            ConditionKind::Contains => "CONTAINS",
            ConditionKind::NotContains => "NOT_CONTAINS",
            ConditionKind::StartsWith => "STARTS_WITH",
            ConditionKind::EndsWith => "ENDS_WITH",
            ConditionKind::RegexMatch => "REGEX_MATCH",
            ConditionKind::SizeGreaterThan => "FILE_SIZE_GT",
            ConditionKind::SizeLessThan => "FILE_SIZE_LT",
            ConditionKind::ParentDirIs => "PARENT_DIR_IS",
            ConditionKind::PathContains => "PATH_CONTAINS",
            ConditionKind::PathNotContains => "PATH_NOT_CONTAINS",
            ConditionKind::ExtIn => "EXT_IN",
            ConditionKind::ExtNotIn => "EXT_NOT_IN",
            ConditionKind::IsAudio => "IS_AUDIO",
            ConditionKind::IsNotAudio => "IS_NOT_AUDIO",
            ConditionKind::IsArchive => "IS_ARCHIVE",
            ConditionKind::IsNotArchive => "IS_NOT_ARCHIVE",
            ConditionKind::IsDirectory => "IS_DIRECTORY",
            ConditionKind::IsFile => "IS_FILE",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ConditionKind::Contains => "name contains",
            ConditionKind::NotContains => "name does not contain",
            ConditionKind::StartsWith => "name starts with",
            ConditionKind::EndsWith => "name ends with",
            ConditionKind::RegexMatch => "name matches regex",
            ConditionKind::SizeGreaterThan => "size > (MB)",
            ConditionKind::SizeLessThan => "size < (MB)",
            ConditionKind::ParentDirIs => "parent directory is",
            ConditionKind::PathContains => "path contains",
            ConditionKind::PathNotContains => "path does not contain",
            ConditionKind::ExtIn => "extension in",
            ConditionKind::ExtNotIn => "extension not in",
            ConditionKind::IsAudio => "is audio",
            ConditionKind::IsNotAudio => "is not audio",
            ConditionKind::IsArchive => "is archive",
            ConditionKind::IsNotArchive => "is not archive",
            ConditionKind::IsDirectory => "is directory",
            ConditionKind::IsFile => "is file",
        }
    }

    /// Preset kinds ignore their value.
    pub fn needs_value(self) -> bool {
        !matches!(
            self,
            ConditionKind::IsAudio
                | ConditionKind::IsNotAudio
                | ConditionKind::IsArchive
                | ConditionKind::IsNotArchive
                | ConditionKind::IsDirectory
                | ConditionKind::IsFile
        )
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl FromStr for ConditionKind {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Older stores wrote single-extension checks as FILE_EXT_IS.
        if s.eq_ignore_ascii_case("FILE_EXT_IS") {
            return Ok(ConditionKind::ExtIn);
        }
        ConditionKind::ALL
            .into_iter()
            .find(|k| k.machine_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConditionError::UnknownKind(s.to_string()))
    }
}
