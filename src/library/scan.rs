use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ScanSettings;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Every file (and, when enabled, directory) below the roots, in walk order
/// with siblings sorted by name. Roots themselves are not listed. A path
/// reachable from two roots is listed once.
pub fn scan(roots: &[PathBuf], settings: &ScanSettings) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for root in roots {
        let mut walker = WalkDir::new(root)
            .follow_links(settings.follow_links)
            .min_depth(1)
            .sort_by_file_name();

        // Non-recursive = only the root directory.
        let depth_cap = if settings.recursive {
            settings.max_depth
        } else {
            Some(1)
        };
        if let Some(d) = depth_cap {
            walker = walker.max_depth(d);
        }

        let before = out.len();
        for entry in walker
            .into_iter()
            .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() && !settings.include_directories {
                continue;
            }
            let path = entry.into_path();
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
        debug!(root = %root.display(), items = out.len() - before, "scanned root");
    }
    out
}
