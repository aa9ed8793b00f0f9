//! Static asset copy.
//!
//! Files under the assets directory (`static/` by default) are copied into
//! the output root unchanged, keeping their relative paths:
//!
//! ```text
//! static/img/logo.svg  →  dist/img/logo.svg
//! static/robots.txt    →  dist/robots.txt
//! ```
//!
//! Only files whose path relative to the assets directory matches the
//! `paths.assets_pattern` glob (`**/*` by default) are copied. The assets
//! directory is optional. Hidden files and directories are skipped.

use glob::{MatchOptions, Pattern};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Copy files under `src` into `dest`.
///
/// Only files whose path relative to `src` matches `pattern` are copied.
/// Returns the copied paths, relative to `dest`, in file-name order.
/// A missing `src` copies nothing.
pub fn copy_assets(
    src: &Path,
    pattern: &Pattern,
    dest: &Path,
) -> io::Result<Vec<PathBuf>> {
    if !src.is_dir() {
        return Ok(Vec::new());
    }
    let mut copied = Vec::new();
    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        if !pattern.matches_path_with(relative, MATCH_OPTIONS) {
            continue;
        }
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied.push(relative.to_path_buf());
    }
    Ok(copied)
}
