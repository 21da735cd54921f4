use std::fmt;
use std::str::FromStr;

use crate::error::RuleError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenameAction {
    ReplaceText,
    ReplaceRegex,
    Prepend,
    Append,
    ToLower,
    ToUpper,
    Trim,
    BatchRemove,
    CleanNoise,
    AddLetterPrefix,
    CutPrefix,
    CutSuffix,
    KeepPrefix,
    KeepSuffix,
    RemovePrefix,
    RemoveSuffix,
    ScriptConvert,
}

impl RenameAction {
    pub const ALL: [RenameAction; 17] = [
        RenameAction::ReplaceText,
        RenameAction::ReplaceRegex,
        RenameAction::Prepend,
        RenameAction::Append,
        RenameAction::ToLower,
        RenameAction::ToUpper,
        RenameAction::Trim,
        RenameAction::BatchRemove,
        RenameAction::CleanNoise,
        RenameAction::AddLetterPrefix,
        RenameAction::CutPrefix,
        RenameAction::CutSuffix,
        RenameAction::KeepPrefix,
        RenameAction::KeepSuffix,
        RenameAction::RemovePrefix,
        RenameAction::RemoveSuffix,
        RenameAction::ScriptConvert,
    ];

    pub fn machine_name(self) -> &'static str {
        match self {
            RenameAction::ReplaceText => "REPLACE_TEXT",
            RenameAction::ReplaceRegex => "REPLACE_REGEX",
            RenameAction::Prepend => "PREPEND",
            RenameAction::Append => "APPEND",
            RenameAction::ToLower => "TO_LOWER",
            RenameAction::ToUpper => "TO_UPPER",
            RenameAction::Trim => "TRIM",
            RenameAction::BatchRemove => "BATCH_REMOVE",
            RenameAction::CleanNoise => "CLEAN_NOISE",
            RenameAction::AddLetterPrefix => "ADD_LETTER_PREFIX",
            RenameAction::CutPrefix => "CUT_PREFIX",
            RenameAction::CutSuffix => "CUT_SUFFIX",
            RenameAction::KeepPrefix => "KEEP_PREFIX",
            RenameAction::KeepSuffix => "KEEP_SUFFIX",
            RenameAction::RemovePrefix => "REMOVE_PREFIX",
            RenameAction::RemoveSuffix => "REMOVE_SUFFIX",
            RenameAction::ScriptConvert => "SCRIPT_CONVERT",
        }
    }
}

impl fmt::Display for RenameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.machine_name())
    }
}

impl FromStr for RenameAction {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("TRADITIONAL_TO_SIMPLIFIED") {
            return Ok(RenameAction::ScriptConvert);
        }
        RenameAction::ALL
            .into_iter()
            .find(|a| a.machine_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RuleError::UnknownAction(s.to_string()))
    }
}

/// Which part of a name a rule rewrites.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum RenameScope {
    /// Name without its extension.
    #[default]
    NameOnly,
    /// Extension including its leading dot.
    ExtensionOnly,
    Whole,
}

impl RenameScope {
    pub fn machine_name(self) -> &'static str {
        match self {
            RenameScope::NameOnly => "ONLY_FILENAME",
            RenameScope::ExtensionOnly => "ONLY_EXTENSION",
            RenameScope::Whole => "ALL",
        }
    }
}

impl FromStr for RenameScope {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [RenameScope::NameOnly, RenameScope::ExtensionOnly, RenameScope::Whole]
            .into_iter()
            .find(|m| m.machine_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RuleError::UnknownScope(s.to_string()))
    }
}
