//! Sample discovery.
//!
//! Stage 1 of the build. Walks the source tree and yields one [`Sample`] per
//! markup file matching the configured glob, paired with its metadata sidecar.
//!
//! ## Directory Structure
//!
//! ```text
//! src/                             # Source root
//! ├── 10_Introduction/             # Category (ordering prefix optional)
//! │   ├── Hello_World.html         # Sample
//! │   └── Hello_World.json         # Metadata sidecar (optional)
//! └── ads/
//!     ├── basic.html
//!     └── basic.json
//! ```
//!
//! ## Laziness
//!
//! [`scan`] returns an iterator; files are read one at a time as the caller
//! pulls. Each call to [`scan`] walks the tree again, so a finished iterator
//! is never restarted. Entries are visited in file-name order, which makes
//! discovery order (and therefore error reporting) stable across runs.
//!
//! ## Errors
//!
//! A missing source root or an invalid glob stops the scan before it starts
//! ([`ScanError`]). Problems with one file (unreadable, malformed sidecar,
//! no usable name) are yielded as [`SampleLoadError`] items and the walk
//! continues with the next file.

use crate::metadata::{self, Metadata, MetadataError};
use crate::naming::{FileName, NamingError, parse_entry_name};
use crate::types::Sample;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("source directory not found: {0}")]
    MissingRoot(PathBuf),
    #[error("invalid sample pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Why a single sample could not be loaded.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("cannot derive output name: {0}")]
    Naming(#[from] NamingError),
}

/// A per-file load failure, tagged with the offending path.
#[derive(Error, Debug)]
#[error("{}: {error}", relative.display())]
pub struct SampleLoadError {
    pub relative: PathBuf,
    #[source]
    pub error: LoadError,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Lazy sequence of samples under a source root.
pub struct Samples {
    root: PathBuf,
    pattern: Pattern,
    walker: walkdir::IntoIter,
}

impl std::fmt::Debug for Samples {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Samples")
            .field("root", &self.root)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Start scanning `root` for files whose root-relative path matches `pattern`.
pub fn scan(root: &Path, pattern: &str) -> Result<Samples, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    let pattern = Pattern::new(pattern).map_err(|source| ScanError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter();
    Ok(Samples {
        root: root.to_path_buf(),
        pattern,
        walker,
    })
}

impl Iterator for Samples {
    type Item = Result<Sample, SampleLoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let relative = err
                        .path()
                        .and_then(|p| p.strip_prefix(&self.root).ok())
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    return Some(Err(SampleLoadError {
                        relative,
                        error: LoadError::Io(err.into()),
                    }));
                }
            };

            if entry.depth() > 0 && is_hidden(entry.file_name()) {
                if entry.file_type().is_dir() {
                    self.walker.skip_current_dir();
                }
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if !self.pattern.matches_path_with(relative, MATCH_OPTIONS) {
                continue;
            }

            let relative = relative.to_path_buf();
            return Some(
                load_sample(entry.path(), &relative)
                    .map_err(|error| SampleLoadError { relative, error }),
            );
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Read one sample and its sidecar.
pub fn load_sample(path: &Path, relative: &Path) -> Result<Sample, LoadError> {
    let file_name = FileName::from_relative_path(relative)?;
    let body = fs::read_to_string(path)?;
    let sidecar = metadata::load_sidecar(path)?;
    let has_sidecar = sidecar.is_some();
    let metadata = with_defaults(sidecar.unwrap_or_default(), relative);

    Ok(Sample {
        relative: relative.to_path_buf(),
        file_name,
        body,
        metadata,
        has_sidecar,
    })
}

/// Fill `title` and `category` from the file path when the sidecar omits them.
///
/// - `10_Ads/Basic_Banner.html` → title "Basic Banner", category "Ads"
/// - `ads/formats/sticky.html` → title "sticky", category "ads / formats"
/// - `hello.html` → title "hello", no category
pub fn with_defaults(mut metadata: Metadata, relative: &Path) -> Metadata {
    if metadata::resolve(&[metadata.title.as_deref()]).is_none() {
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        metadata.title = Some(parse_entry_name(&stem).display_title);
    }
    if metadata::resolve(&[metadata.category.as_deref()]).is_none() {
        let parts: Vec<String> = relative
            .parent()
            .map(|p| {
                p.components()
                    .map(|c| parse_entry_name(&c.as_os_str().to_string_lossy()).display_title)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        metadata.category = (!parts.is_empty()).then(|| parts.join(" / "));
    }
    metadata
}
