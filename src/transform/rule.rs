use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use super::action::{RenameAction, RenameScope};
use super::initial::{first_valid_char, initial_of};
use super::script::{PassThrough, ScriptConverter};
use crate::condition::{ConditionGroup, Subject};
use crate::config::ConfigStore;
use crate::error::RuleError;

static FORMAT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(mqms|flac|mp3|wav|cue|log|iso|ape|dsf|dff).*?\]")
        .expect("format tag pattern is valid")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

const DEFAULT_LETTER_SEPARATOR: &str = " - ";

/// One rewrite step: a condition group gating a single action on one part of
/// a name.
#[derive(Clone)]
pub struct TransformRule {
    pub conditions: ConditionGroup,
    pub action: RenameAction,
    pub find: String,
    pub replace: String,
    pub scope: RenameScope,
    converter: Arc<dyn ScriptConverter>,
}

impl fmt::Debug for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRule")
            .field("conditions", &self.conditions)
            .field("action", &self.action)
            .field("find", &self.find)
            .field("replace", &self.replace)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl PartialEq for TransformRule {
    fn eq(&self, other: &Self) -> bool {
        self.conditions == other.conditions
            && self.action == other.action
            && self.find == other.find
            && self.replace == other.replace
            && self.scope == other.scope
    }
}

impl TransformRule {
    pub fn new(action: RenameAction, find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            conditions: ConditionGroup::new(),
            action,
            find: find.into(),
            replace: replace.into(),
            scope: RenameScope::NameOnly,
            converter: Arc::new(PassThrough),
        }
    }

    pub fn with_scope(mut self, scope: RenameScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_conditions(mut self, conditions: ConditionGroup) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn ScriptConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Whether this rule applies to the name currently being rewritten.
    pub fn matches(&self, subject: &Subject<'_>) -> bool {
        self.conditions.test(subject)
    }

    /// Convenience for matching a bare name with no file behind it.
    pub fn matches_name(&self, name: &str) -> bool {
        self.matches(&Subject::of(Path::new(name)))
    }

    /// Rewrite `s`. Directory names are never split into stem and
    /// extension. Any failure returns `s` unchanged.
    pub fn apply(&self, s: &str, is_dir: bool) -> String {
        let (stem, ext) = if is_dir { (s, "") } else { split_extension(s) };
        let target = match self.scope {
            RenameScope::NameOnly => stem,
            RenameScope::ExtensionOnly => ext,
            RenameScope::Whole => s,
        };

        let rewritten = match self.rewrite(target) {
            Ok(r) => r,
            Err(err) => {
                debug!(rule = %self.describe(), input = s, error = %err, "rule reverted");
                return s.to_string();
            }
        };

        match self.scope {
            RenameScope::NameOnly => format!("{rewritten}{ext}"),
            RenameScope::ExtensionOnly => format!("{stem}{rewritten}"),
            RenameScope::Whole => rewritten,
        }
    }

    /// `ACTION find -> replace`, for listings.
    pub fn describe(&self) -> String {
        let mut out = format!("{} {}", self.action, self.find);
        if !self.replace.is_empty() {
            out.push_str(" -> ");
            out.push_str(&self.replace);
        }
        out
    }

    fn rewrite(&self, target: &str) -> Result<String, RuleError> {
        let find = self.find.as_str();
        let replace = self.replace.as_str();
        let out = match self.action {
            RenameAction::ReplaceText => {
                if find.is_empty() {
                    target.to_string()
                } else {
                    target.replace(find, replace)
                }
            }
            RenameAction::ReplaceRegex => {
                if find.is_empty() {
                    target.to_string()
                } else {
                    let re = Regex::new(find).map_err(|source| RuleError::InvalidRegex {
                        pattern: find.to_string(),
                        source,
                    })?;
                    re.replace_all(target, normalize_replacement(replace).as_str())
                        .into_owned()
                }
            }
            RenameAction::Prepend => format!("{replace}{target}"),
            RenameAction::Append => format!("{target}{replace}"),
            RenameAction::ToLower => target.to_lowercase(),
            RenameAction::ToUpper => target.to_uppercase(),
            RenameAction::Trim => target.trim().to_string(),
            RenameAction::BatchRemove => {
                let mut out = target.to_string();
                for token in find.split(' ').filter(|t| !t.is_empty()) {
                    out = out.replace(token, "");
                }
                out.trim().to_string()
            }
            RenameAction::CleanNoise => clean_noise(target, find),
            RenameAction::AddLetterPrefix => {
                if self.scope == RenameScope::ExtensionOnly {
                    target.to_string()
                } else {
                    add_letter_prefix(target, find, replace)
                }
            }
            RenameAction::CutPrefix => {
                let n = parse_count(find)?;
                if char_len_exceeds(target, n) {
                    target.chars().skip(n).collect()
                } else {
                    target.to_string()
                }
            }
            RenameAction::CutSuffix => {
                let n = parse_count(find)?;
                let len = target.chars().count();
                if char_len_exceeds(target, n) {
                    target.chars().take(len - n).collect()
                } else {
                    target.to_string()
                }
            }
            RenameAction::KeepPrefix => {
                let n = parse_count(find)?;
                if char_len_exceeds(target, n) {
                    target.chars().take(n).collect()
                } else {
                    target.to_string()
                }
            }
            RenameAction::KeepSuffix => {
                let n = parse_count(find)?;
                let len = target.chars().count();
                if char_len_exceeds(target, n) {
                    target.chars().skip(len - n).collect()
                } else {
                    target.to_string()
                }
            }
            RenameAction::RemovePrefix => match target.strip_prefix(find) {
                Some(rest) if !find.is_empty() => rest.to_string(),
                _ => target.to_string(),
            },
            RenameAction::RemoveSuffix => match target.strip_suffix(find) {
                Some(rest) if !find.is_empty() => rest.to_string(),
                _ => target.to_string(),
            },
            RenameAction::ScriptConvert => self
                .converter
                .to_simplified(target)
                .unwrap_or_else(|| target.to_string()),
        };
        Ok(out)
    }

    /// Load a rule from `{prefix}*` keys.
    pub fn load_config(store: &ConfigStore, prefix: &str) -> Result<Self, RuleError> {
        let action: RenameAction = store.get_or(&format!("{prefix}action"), "").parse()?;
        let scope = match store.get(&format!("{prefix}scope")) {
            Some(s) => s.parse()?,
            None => RenameScope::default(),
        };
        Ok(Self::new(
            action,
            store.get_or(&format!("{prefix}find"), ""),
            store.get_or(&format!("{prefix}replace"), ""),
        )
        .with_scope(scope)
        .with_conditions(ConditionGroup::load_config(store, &format!("{prefix}cond_"))))
    }

    pub fn save_config(&self, store: &mut ConfigStore, prefix: &str) {
        store.set(format!("{prefix}action"), self.action.machine_name());
        store.set(format!("{prefix}find"), &self.find);
        store.set(format!("{prefix}replace"), &self.replace);
        store.set(format!("{prefix}scope"), self.scope.machine_name());
        self.conditions.save_config(store, &format!("{prefix}cond_"));
    }
}

impl fmt::Display for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Split at the last dot; the extension keeps its dot. A leading dot does
/// not start an extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}

fn parse_count(find: &str) -> Result<usize, RuleError> {
    let trimmed = find.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(RuleError::InvalidCount(find.to_string()));
    }
    trimmed
        .parse()
        .map_err(|_| RuleError::InvalidCount(find.to_string()))
}

fn char_len_exceeds(s: &str, n: usize) -> bool {
    n > 0 && s.chars().count() > n
}

/// `$1abc` means group 1 followed by `abc` in the stored rule format; the
/// regex crate would read it as a group named `1abc`.
fn normalize_replacement(replace: &str) -> String {
    let mut out = String::with_capacity(replace.len() + 4);
    let mut chars = replace.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '$' if chars.peek().is_some_and(char::is_ascii_digit) => {
                out.push_str("${");
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    out.push(d);
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }
    out
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '.' | ',' | '，' | '、' | '|' | '~')
}

fn clean_noise(target: &str, find: &str) -> String {
    let words: Vec<&str> = find
        .split([',', '，', '、'])
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect();

    // Removing one token can expose another; iterate to a fixed point so the
    // result is stable under a second pass.
    let mut current = target.to_string();
    loop {
        let mut next = FORMAT_TAG.replace_all(&current, "").into_owned();
        next.retain(|c| c != '《' && c != '》');
        for w in &words {
            next = next.replace(w, "");
        }
        let next = WHITESPACE_RUN
            .replace_all(&next, " ")
            .trim_matches(is_separator)
            .to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = s.char_indices();
    for p in prefix.chars() {
        let (_, c) = rest.next()?;
        if !c.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    Some(rest.as_str())
}

fn add_letter_prefix(target: &str, find: &str, replace: &str) -> String {
    let core = if find.is_empty() {
        target
    } else {
        strip_prefix_ignore_case(target, find)
            .map(str::trim)
            .unwrap_or(target)
    };
    let Some(initial) = first_valid_char(core).and_then(initial_of) else {
        return target.to_string();
    };
    let sep = if replace.is_empty() {
        DEFAULT_LETTER_SEPARATOR
    } else {
        replace
    };
    let prefix = format!("{initial}{sep}");
    if target.starts_with(&prefix) {
        target.to_string()
    } else {
        format!("{prefix}{target}")
    }
}
