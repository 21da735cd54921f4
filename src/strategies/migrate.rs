use std::path::PathBuf;

use tracing::debug;

use super::fsops::{move_path, remove_if_empty, sanitize_component};
use super::keys::Keys;
use crate::condition::{StageGate, extension_of};
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::metadata::{MetadataResolver, format};
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};

const KEY_PREFIX: &str = "fms_";
const DEFAULT_PATTERN: &str = "%artist%/%year% %album%/%track% - %title%";

/// Files items under a destination root using a metadata path template.
#[derive(Debug, Clone)]
pub struct MigrateStrategy {
    pub gate: StageGate,
    /// Nothing is planned without a destination.
    pub destination: Option<PathBuf>,
    pub pattern: String,
    /// Remove the source directory once it is empty.
    pub clean_source: bool,
    pub force_file_name_meta: bool,
    resolver: MetadataResolver,
}

impl Default for MigrateStrategy {
    fn default() -> Self {
        Self {
            gate: StageGate::default(),
            destination: None,
            pattern: DEFAULT_PATTERN.to_string(),
            clean_source: true,
            force_file_name_meta: false,
            resolver: MetadataResolver::default(),
        }
    }
}

impl MigrateStrategy {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: Some(destination.into()),
            ..Self::default()
        }
    }

    pub fn with_resolver(mut self, resolver: MetadataResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Destination-relative path for one item. Template separators split
    /// directories; every component is sanitized and blank ones dropped.
    fn relative_target(&self, rec: &ChangeRecord) -> PathBuf {
        let meta = self.resolver.resolve_with_names(
            rec.source(),
            rec.current_source(),
            self.force_file_name_meta,
        );
        let rendered = format(&self.pattern, &meta);
        let mut rel: PathBuf = rendered
            .split(['/', '\\'])
            .map(|c| sanitize_component(c).trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if rel.as_os_str().is_empty() {
            return rel;
        }

        let name = file_name_of(rec.current_source());
        let ext = extension_of(&name);
        if !ext.is_empty() && extension_of(&file_name_of(&rel)) != ext {
            let leaf = format!("{}.{ext}", file_name_of(&rel));
            rel.set_file_name(leaf);
        }
        rel
    }
}

impl Strategy for MigrateStrategy {
    fn name(&self) -> &'static str {
        "migrate"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::FilesOnly
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        let Some(dest) = self.destination.as_deref() else {
            debug!("no destination configured, nothing to migrate");
            return Vec::new();
        };
        ctx.map_records(inputs, |rec| {
            let rel = self.relative_target(rec);
            if rel.as_os_str().is_empty() {
                return Vec::new();
            }
            let target = dest.join(rel);
            if target == rec.current_source() {
                return Vec::new();
            }
            vec![
                rec.derive(OpKind::Move, target)
                    .with_param("clean_source", self.clean_source),
            ]
        })
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        if rec.op != OpKind::Move {
            return Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: rec.op.to_string(),
            });
        }
        let src = rec.current_source();
        move_path(src, &rec.planned_path, false)?;
        if rec.param("clean_source") == Some("true") {
            if let Some(parent) = src.parent() {
                remove_if_empty(parent);
            }
        }
        Ok(())
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        if let Some(dest) = store.get(&keys.key("dest")) {
            let dest = dest.trim();
            self.destination = (!dest.is_empty()).then(|| PathBuf::from(dest));
        }
        if let Some(pattern) = store.get(&keys.key("pattern")) {
            self.pattern = pattern.to_string();
        }
        keys.load_parsed(store, "clean", &mut self.clean_source);
        keys.load_parsed(store, "force_meta", &mut self.force_file_name_meta);
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        if let Some(dest) = &self.destination {
            store.set(keys.key("dest"), dest.display());
        }
        store.set(keys.key("pattern"), &self.pattern);
        store.set(keys.key("clean"), self.clean_source);
        store.set(keys.key("force_meta"), self.force_file_name_meta);
    }
}
