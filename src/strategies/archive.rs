use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use tracing::{debug, warn};

use super::fsops::{move_path, remove_if_empty, remove_path};
use super::keys::Keys;
use crate::condition::{ARCHIVE_EXTENSIONS, StageGate, extension_of};
use crate::config::ConfigStore;
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, Strategy, TargetScope};
use crate::record::{ChangeRecord, OpKind, file_name_of};
use crate::transform::split_extension;

const KEY_PREFIX: &str = "una_";
const SIBLING_PREFIX: &str = "Extracted_";
/// Entries a desktop leaves behind that do not count as content.
const SYSTEM_LITTER: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ArchiveEngine {
    /// In-process; handles zip containers only.
    #[default]
    Builtin,
    /// A `7z`-compatible command line tool.
    External,
}

impl fmt::Display for ArchiveEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArchiveEngine::Builtin => "BUILTIN",
            ArchiveEngine::External => "EXTERNAL",
        })
    }
}

impl FromStr for ArchiveEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUILTIN" | "INTERNAL" => Ok(ArchiveEngine::Builtin),
            "EXTERNAL" | "7Z" | "7ZIP" => Ok(ArchiveEngine::External),
            other => Err(format!("unknown archive engine: {other}")),
        }
    }
}

/// Where an archive is unpacked, relative to the archive's directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ExtractDirMode {
    #[default]
    SameDir,
    /// A configured directory; relative paths resolve against the archive's
    /// directory.
    Custom,
    /// `Extracted_<archive name>` next to the archive.
    Sibling,
}

impl fmt::Display for ExtractDirMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtractDirMode::SameDir => "SAME_DIR",
            ExtractDirMode::Custom => "CUSTOM",
            ExtractDirMode::Sibling => "SIBLING",
        })
    }
}

impl FromStr for ExtractDirMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAME_DIR" | "CURRENT" | "SOURCE" => Ok(ExtractDirMode::SameDir),
            "CUSTOM" => Ok(ExtractDirMode::Custom),
            "SIBLING" => Ok(ExtractDirMode::Sibling),
            other => Err(format!("unknown extract mode: {other}")),
        }
    }
}

/// Unpacks archives and collapses a lone top-level folder so the result
/// is a single album directory.
#[derive(Debug, Clone)]
pub struct ArchiveNormalizeStrategy {
    pub gate: StageGate,
    pub engine: ArchiveEngine,
    /// Binary used by the external engine.
    pub tool: PathBuf,
    pub dir_mode: ExtractDirMode,
    pub custom_dir: PathBuf,
    /// Unpack into a folder named after the archive, then flatten it.
    pub wrap: bool,
    pub overwrite: bool,
    pub delete_on_success: bool,
    pub delete_on_failure: bool,
    /// Tried in order after an attempt without a password.
    pub passwords: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for ArchiveNormalizeStrategy {
    fn default() -> Self {
        Self {
            gate: StageGate::default(),
            engine: ArchiveEngine::default(),
            tool: PathBuf::from("7z"),
            dir_mode: ExtractDirMode::default(),
            custom_dir: PathBuf::from("Unzipped"),
            wrap: true,
            overwrite: false,
            delete_on_success: false,
            delete_on_failure: false,
            passwords: Vec::new(),
            extensions: ARCHIVE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ArchiveNormalizeStrategy {
    /// Directory the archive's contents land in, before any wrapping.
    pub fn base_dir(&self, archive: &Path) -> PathBuf {
        let parent = archive.parent().unwrap_or_else(|| Path::new(""));
        match self.dir_mode {
            ExtractDirMode::SameDir => parent.to_path_buf(),
            ExtractDirMode::Custom if self.custom_dir.is_absolute() => self.custom_dir.clone(),
            ExtractDirMode::Custom => parent.join(&self.custom_dir),
            ExtractDirMode::Sibling => {
                parent.join(format!("{SIBLING_PREFIX}{}", file_name_of(archive)))
            }
        }
    }

    fn plan(&self, rec: &ChangeRecord) -> Option<ChangeRecord> {
        let current = rec.current_source();
        let name = file_name_of(current);
        let ext = extension_of(&name);
        if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            return None;
        }
        let base = self.base_dir(current);
        let target = if self.wrap {
            base.join(split_extension(&name).0.trim())
        } else {
            base.clone()
        };
        Some(
            rec.derive(OpKind::Extract, target)
                .with_param("base", base.display())
                .with_param("engine", self.engine)
                .with_param("wrap", self.wrap),
        )
    }

    fn extract_once(
        &self,
        engine: ArchiveEngine,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
    ) -> Result<(), ExecuteError> {
        match engine {
            ArchiveEngine::Builtin => {
                if password.is_some() {
                    return Err(ExecuteError::Extract(
                        "built-in engine cannot decrypt, use the external engine".into(),
                    ));
                }
                extract_zip(archive, dest, self.overwrite)
            }
            ArchiveEngine::External => {
                extract_with_tool(&self.tool, archive, dest, self.overwrite, password)
            }
        }
    }
}

/// Unpack a zip container into `dest`. Entries escaping `dest` are skipped.
pub(crate) fn extract_zip(archive: &Path, dest: &Path, overwrite: bool) -> Result<(), ExecuteError> {
    let file = File::open(archive).map_err(|e| ExecuteError::io("open", archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ExecuteError::Extract(e.to_string()))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ExecuteError::Extract(e.to_string()))?;
        let Some(rel) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "archive entry escapes the destination, skipping");
            continue;
        };
        let out = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| ExecuteError::io("create directory", &out, e))?;
            continue;
        }
        if out.exists() && !overwrite {
            debug!(path = %out.display(), "extracted file exists, keeping it");
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ExecuteError::io("create directory", parent, e))?;
        }
        let mut writer = File::create(&out).map_err(|e| ExecuteError::io("create", &out, e))?;
        io::copy(&mut entry, &mut writer).map_err(|e| ExecuteError::io("write", &out, e))?;
    }
    Ok(())
}

/// Run `tool x <archive> -o<dest>`. Exit code 1 is a warning for 7-Zip.
fn extract_with_tool(
    tool: &Path,
    archive: &Path,
    dest: &Path,
    overwrite: bool,
    password: Option<&str>,
) -> Result<(), ExecuteError> {
    let mut cmd = Command::new(tool);
    cmd.arg("x")
        .arg(archive)
        .arg(format!("-o{}", dest.display()))
        .arg(if overwrite { "-aoa" } else { "-aos" })
        .arg("-y");
    // An empty password stops 7-Zip from prompting on encrypted archives.
    cmd.arg(format!("-p{}", password.unwrap_or_default()));
    debug!(tool = %tool.display(), archive = %archive.display(), "running extractor");

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ExecuteError::io("spawn", tool, e))?;
    match output.status.code() {
        Some(0 | 1) => Ok(()),
        _ => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no diagnostic output")
                .trim()
                .to_string();
            Err(ExecuteError::Extract(format!("{}: {reason}", output.status)))
        }
    }
}

/// Entries of `dir` that are not desktop litter.
fn content_of(dir: &Path) -> Result<Vec<PathBuf>, ExecuteError> {
    let entries = fs::read_dir(dir).map_err(|e| ExecuteError::io("list", dir, e))?;
    Ok(entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| !SYSTEM_LITTER.iter().any(|l| file_name_of(p).eq_ignore_ascii_case(l)))
        .collect())
}

/// Collapse `wrapper` when its only content is one directory. The inner
/// directory takes the wrapper's place under `base`; when it shares the
/// wrapper's name its children are lifted up instead. Returns where the
/// album ended up.
pub(crate) fn flatten_single_folder(wrapper: &Path, base: &Path) -> Result<PathBuf, ExecuteError> {
    let content = content_of(wrapper)?;
    let [inner] = content.as_slice() else {
        return Ok(wrapper.to_path_buf());
    };
    if !inner.is_dir() {
        return Ok(wrapper.to_path_buf());
    }

    let target = base.join(file_name_of(inner));
    if target == wrapper {
        for child in content_of(inner)? {
            move_path(&child, &wrapper.join(file_name_of(&child)), true)?;
        }
        remove_path(inner)?;
        return Ok(wrapper.to_path_buf());
    }
    if target.exists() {
        debug!(target = %target.display(), "flatten target exists, keeping wrapper");
        return Ok(wrapper.to_path_buf());
    }
    move_path(inner, &target, false)?;
    remove_path(wrapper)?;
    Ok(target)
}

impl Strategy for ArchiveNormalizeStrategy {
    fn name(&self) -> &'static str {
        "archive-normalize"
    }

    fn target_scope(&self) -> TargetScope {
        TargetScope::FilesOnly
    }

    fn gate(&self) -> &StageGate {
        &self.gate
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        ctx.map_records(inputs, |rec| self.plan(rec).into_iter().collect())
    }

    fn execute(&self, rec: &ChangeRecord) -> Result<(), ExecuteError> {
        if rec.op != OpKind::Extract {
            return Err(ExecuteError::Unsupported {
                stage: self.name(),
                op: rec.op.to_string(),
            });
        }
        let archive = rec.current_source();
        if !archive.exists() {
            return Err(ExecuteError::MissingSource(archive.to_path_buf()));
        }
        let base = rec
            .param("base")
            .map(PathBuf::from)
            .ok_or(ExecuteError::MissingParam("base"))?;
        let engine = match rec.param("engine") {
            Some(v) => v.parse().map_err(|_| ExecuteError::InvalidParam {
                key: "engine",
                value: v.to_string(),
            })?,
            None => self.engine,
        };
        let wrap = rec.param("wrap").map_or(self.wrap, |v| v == "true");
        let dest = &rec.planned_path;
        fs::create_dir_all(dest).map_err(|e| ExecuteError::io("create directory", dest, e))?;

        let attempts = std::iter::once(None).chain(self.passwords.iter().map(|p| Some(p.as_str())));
        let mut last_err = None;
        for password in attempts {
            let attempt = self
                .extract_once(engine, archive, dest, password)
                .and_then(|()| {
                    if content_of(dest)?.is_empty() {
                        return Err(ExecuteError::Extract("archive produced no files".into()));
                    }
                    Ok(())
                });
            match attempt {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(err) => {
                    debug!(archive = %archive.display(), error = %err, "extraction attempt failed");
                    last_err = Some(err);
                }
            }
        }

        if let Some(err) = last_err {
            remove_if_empty(dest);
            if self.delete_on_failure {
                warn!(archive = %archive.display(), "removing archive that failed to extract");
                remove_path(archive)?;
            }
            return Err(err);
        }

        if wrap {
            let album = flatten_single_folder(dest, &base)?;
            debug!(album = %album.display(), "archive extracted");
        }
        if self.delete_on_success {
            if let Err(err) = remove_path(archive) {
                warn!(archive = %archive.display(), error = %err, "extracted archive not removed");
            }
        }
        Ok(())
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        keys.load_gate(store, &mut self.gate);
        keys.load_parsed(store, "engine", &mut self.engine);
        keys.load_parsed(store, "mode", &mut self.dir_mode);
        keys.load_parsed(store, "smart", &mut self.wrap);
        keys.load_parsed(store, "over", &mut self.overwrite);
        keys.load_parsed(store, "del_ok", &mut self.delete_on_success);
        keys.load_parsed(store, "del_fail", &mut self.delete_on_failure);
        if let Some(tool) = store.get(&keys.key("exe")).filter(|t| !t.trim().is_empty()) {
            self.tool = PathBuf::from(tool.trim());
        }
        if let Some(dir) = store.get(&keys.key("path")).filter(|d| !d.trim().is_empty()) {
            self.custom_dir = PathBuf::from(dir.trim());
        }
        if store.contains(&keys.key("pwd")) {
            self.passwords = store.get_list(&keys.key("pwd"));
        }
        let exts = store.get_list(&keys.key("exts"));
        if !exts.is_empty() {
            self.extensions = exts
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect();
        }
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        let keys = Keys::new(scope, KEY_PREFIX);
        self.gate.save_config(store, keys.base());
        store.set(keys.key("engine"), self.engine);
        store.set(keys.key("exe"), self.tool.display());
        store.set(keys.key("mode"), self.dir_mode);
        store.set(keys.key("path"), self.custom_dir.display());
        store.set(keys.key("smart"), self.wrap);
        store.set(keys.key("over"), self.overwrite);
        store.set(keys.key("del_ok"), self.delete_on_success);
        store.set(keys.key("del_fail"), self.delete_on_failure);
        store.set_list(keys.key("pwd"), &self.passwords);
        store.set_list(keys.key("exts"), &self.extensions);
    }
}
