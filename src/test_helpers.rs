//! Shared test utilities.
//!
//! Provides an isolated copy of the fixture project plus lookup helpers that
//! panic with the available keys on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! write_source(tmp.path(), "ads/extra.html", "<p>x</p>", None);
//! let project = Project::load(tmp.path()).unwrap();
//! let site = compile_site(&project, None).unwrap();
//!
//! let basic = find_document(&site, "ads/basic.html");
//! assert!(basic.html.contains("rel=\"canonical\""));
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::metadata::sidecar_path;
use crate::pipeline::Site;
use crate::types::{CompiledDocument, Sample};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write a sample (and optionally its sidecar JSON) under `root/src/`.
pub fn write_source(root: &Path, relative: &str, body: &str, sidecar: Option<&str>) {
    let path = root.join("src").join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    if let Some(json) = sidecar {
        fs::write(sidecar_path(&path), json).unwrap();
    }
}

// =========================================================================
// Lookups
// =========================================================================

/// Find a sample by its path relative to the source root. Panics if not found.
pub fn find_sample<'a>(samples: &'a [Sample], relative: &str) -> &'a Sample {
    samples
        .iter()
        .find(|s| s.relative == Path::new(relative))
        .unwrap_or_else(|| {
            let paths: Vec<String> = samples
                .iter()
                .map(|s| s.relative.display().to_string())
                .collect();
            panic!("sample '{relative}' not found. Available: {paths:?}")
        })
}

/// Find a compiled document by output path. Panics if not found.
pub fn find_document<'a>(site: &'a Site, path: &str) -> &'a CompiledDocument {
    let documents = site.documents();
    documents
        .iter()
        .find(|d| d.path() == Path::new(path))
        .copied()
        .unwrap_or_else(|| {
            let paths: Vec<String> = documents
                .iter()
                .map(|d| d.path().display().to_string())
                .collect();
            panic!("document '{path}' not found. Available: {paths:?}")
        })
}
