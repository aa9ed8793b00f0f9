//! Shared types passed between pipeline stages.
//!
//! Samples come out of [`scan`](crate::scan), go into
//! [`compile`](crate::compile), and the resulting [`CompiledDocument`]s feed
//! the writer, the validator and the snapshot differ.

use crate::metadata::Metadata;
use crate::naming::FileName;
use std::path::{Component, Path, PathBuf};

/// One source example: a markup document plus its (possibly default) metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Path relative to the source root, as found on disk (`10_Ads/basic.html`).
    pub relative: PathBuf,
    /// Normalized identity; determines every output path of the sample.
    pub file_name: FileName,
    /// Raw markup.
    pub body: String,
    pub metadata: Metadata,
    /// Whether `metadata` came from a sidecar or is all defaults.
    pub has_sidecar: bool,
}

impl Sample {
    /// Output file of the main example page.
    pub fn example_file(&self) -> ExampleFile {
        ExampleFile::new(self.file_name.path())
    }

    /// Output file of the ad preview page.
    pub fn preview_file(&self) -> ExampleFile {
        ExampleFile::new(self.file_name.preview_path())
    }
}

/// A resolved output path together with its public URL.
///
/// URL derivation is a pure function of the path and the configured host:
///
/// - `ads/basic.html` → `{host}/ads/basic.html`
/// - `index.html` → `{host}/`
/// - `ads/index.html` → `{host}/ads/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExampleFile {
    path: PathBuf,
}

impl ExampleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path relative to the output root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Site-absolute URL path, always `/`-separated.
    pub fn url_path(&self) -> String {
        let segments: Vec<String> = self
            .path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        match segments.split_last() {
            Some((last, dirs)) if last == "index.html" => {
                if dirs.is_empty() {
                    "/".to_string()
                } else {
                    format!("/{}/", dirs.join("/"))
                }
            }
            _ => format!("/{}", segments.join("/")),
        }
    }

    /// Absolute public URL under `host`.
    pub fn url(&self, host: &str) -> String {
        format!("{}{}", host.trim_end_matches('/'), self.url_path())
    }
}

/// Role of a compiled document in the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Index,
    Example,
    Preview,
}

/// Final HTML plus where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    pub file: ExampleFile,
    pub html: String,
    pub kind: DocumentKind,
    /// Sample this document was compiled from (relative to the source root);
    /// `None` for the index page.
    pub source: Option<PathBuf>,
    /// Drafts are compiled but kept out of the index and sitemap.
    pub draft: bool,
}

impl CompiledDocument {
    /// Output path relative to the output root.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Label used when reporting problems: source sample if any, else output path.
    pub fn label(&self) -> String {
        self.source
            .as_deref()
            .unwrap_or_else(|| self.file.path())
            .display()
            .to_string()
    }
}
