use std::fmt;

use tracing::warn;

use super::model::{Condition, Subject};
use crate::config::ConfigStore;

/// Conditions combined with AND. An empty group matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionGroup {
    conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Short-circuits on the first failing condition.
    pub fn test(&self, subject: &Subject<'_>) -> bool {
        self.conditions.iter().all(|c| c.test(subject))
    }

    /// Read `{prefix}count` plus indexed `{prefix}{j}_type` / `{prefix}{j}_val`
    /// keys. Entries with an unknown kind are dropped.
    pub fn load_config(store: &ConfigStore, prefix: &str) -> Self {
        let count: usize = store.get_parsed(&format!("{prefix}count")).unwrap_or(0);
        let mut group = Self::new();
        for j in 0..count {
            let Some(kind) = store.get(&format!("{prefix}{j}_type")) else {
                continue;
            };
            let value = store.get_or(&format!("{prefix}{j}_val"), "");
            match kind.parse() {
                Ok(kind) => group.push(Condition::new(kind, value)),
                Err(err) => warn!(key = %prefix, error = %err, "dropping stored condition"),
            }
        }
        group
    }

    pub fn save_config(&self, store: &mut ConfigStore, prefix: &str) {
        store.set(format!("{prefix}count"), self.conditions.len());
        for (j, c) in self.conditions.iter().enumerate() {
            store.set(format!("{prefix}{j}_type"), c.kind().machine_name());
            store.set(format!("{prefix}{j}_val"), c.value());
        }
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return f.write_str("no restriction");
        }
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Groups combined with OR; the filter every strategy applies before
/// touching a record. An empty gate passes everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageGate {
    groups: Vec<ConditionGroup>,
}

impl StageGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: ConditionGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn push(&mut self, group: ConditionGroup) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[ConditionGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn test(&self, subject: &Subject<'_>) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| g.test(subject))
    }

    pub fn load_config(store: &ConfigStore, prefix: &str) -> Self {
        let count: usize = store
            .get_parsed(&format!("{prefix}cond_group_count"))
            .unwrap_or(0);
        let groups = (0..count)
            .map(|i| ConditionGroup::load_config(store, &format!("{prefix}cond_group_{i}_")))
            .collect();
        Self { groups }
    }

    pub fn save_config(&self, store: &mut ConfigStore, prefix: &str) {
        store.remove_prefix(&format!("{prefix}cond_group_"));
        store.set(format!("{prefix}cond_group_count"), self.groups.len());
        for (i, g) in self.groups.iter().enumerate() {
            g.save_config(store, &format!("{prefix}cond_group_{i}_"));
        }
    }
}

impl fmt::Display for StageGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.groups.is_empty() {
            return f.write_str("no restriction");
        }
        for (i, g) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(" OR ")?;
            }
            write!(f, "({g})")?;
        }
        Ok(())
    }
}
