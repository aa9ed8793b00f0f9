//! Sample metadata sidecars.
//!
//! Every sample `ads/basic.html` may sit next to a `ads/basic.json` sidecar
//! describing how the example is presented:
//!
//! ```json
//! {
//!   "title": "Basic Ad",
//!   "category": "Ads",
//!   "description": "Shows a **fixed size** ad slot.",
//!   "tags": ["ads", "amp-ad"],
//!   "template": "example.html",
//!   "preview": true,
//!   "previewTemplate": "preview-a4a.html",
//!   "ad": { "width": 320, "height": 50, "labelHeight": 20 },
//!   "draft": false
//! }
//! ```
//!
//! ## Defaults
//!
//! Every field is optional and a missing sidecar is not an error:
//!
//! | Field | Default |
//! |-------|---------|
//! | `title` | file stem, ordering prefix stripped, `_`/`-` → spaces |
//! | `category` | parent directory, same treatment |
//! | `description` | leading `<!-- ... -->` comment of the sample |
//! | `tags` | empty |
//! | `template` | `templates.example` from the project config |
//! | `preview` | `false` |
//! | `previewTemplate` | `templates.preview` from the project config |
//! | `ad.*` | `a4a.*` defaults from the project config, per field |
//! | `draft` | `false` (drafts stay out of the index and sitemap) |
//!
//! ## Validation
//!
//! Sidecars are parsed strictly: invalid JSON, wrong value types and unknown
//! keys are all errors for that one sample.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of metadata sidecar files.
pub const SIDECAR_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("cannot read metadata {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed metadata {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Parsed sidecar document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Metadata {
    pub title: Option<String>,
    pub category: Option<String>,
    /// Markdown.
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Template override, by file name in the template directory.
    pub template: Option<String>,
    /// Also render the ad preview page.
    pub preview: bool,
    pub preview_template: Option<String>,
    pub ad: Option<AdOverrides>,
    pub draft: bool,
}

/// Per-example ad container overrides; unset fields fall back to config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct AdOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub label_height: Option<u32>,
}

/// Path of the sidecar belonging to a sample markup file.
pub fn sidecar_path(sample_path: &Path) -> PathBuf {
    sample_path.with_extension(SIDECAR_EXTENSION)
}

/// Load the sidecar for a sample.
///
/// Returns `Ok(None)` when no sidecar exists.
pub fn load_sidecar(sample_path: &Path) -> Result<Option<Metadata>, MetadataError> {
    let path = sidecar_path(sample_path);
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|source| MetadataError::Io {
        path: path.clone(),
        source,
    })?;
    parse(&content)
        .map(Some)
        .map_err(|source| MetadataError::Malformed { path, source })
}

/// Parse a sidecar document.
pub fn parse(content: &str) -> Result<Metadata, serde_json::Error> {
    serde_json::from_str(content)
}

/// Resolve a field from multiple sources.
///
/// Takes optional values in priority order and returns the first non-empty
/// one, trimmed.
///
/// ```text
/// title:       resolve(&[metadata.title, filename_title])
/// description: resolve(&[metadata.description, leading_comment])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}
