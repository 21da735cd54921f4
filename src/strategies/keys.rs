use crate::condition::StageGate;
use crate::config::ConfigStore;

/// Key namespace of one strategy inside one pipeline position.
pub(super) struct Keys {
    base: String,
}

impl Keys {
    pub(super) fn new(scope: &str, prefix: &str) -> Self {
        Self {
            base: format!("{scope}{prefix}"),
        }
    }

    pub(super) fn key(&self, name: &str) -> String {
        format!("{}{}", self.base, name)
    }

    pub(super) fn base(&self) -> &str {
        &self.base
    }

    pub(super) fn load_gate(&self, store: &ConfigStore, gate: &mut StageGate) {
        if store.contains(&format!("{}cond_group_count", self.base)) {
            *gate = StageGate::load_config(store, &self.base);
        }
    }

    /// Overwrite `target` with a parsed value when the key is present and
    /// parses.
    pub(super) fn load_parsed<T: std::str::FromStr>(
        &self,
        store: &ConfigStore,
        name: &str,
        target: &mut T,
    ) {
        if let Some(v) = store.get_parsed(&self.key(name)) {
            *target = v;
        }
    }
}
