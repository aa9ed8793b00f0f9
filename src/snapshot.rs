//! Snapshot baselines for regression checks.
//!
//! A snapshot is the accepted compiled output of every document, stored under
//! the snapshot directory with the same relative paths as the build output:
//!
//! ```text
//! snapshots/
//! ├── .snapshot-manifest.json   # version + SHA-256 per snapshot path
//! ├── index.html
//! └── ads/
//!     ├── basic.html
//!     └── basic/preview.html
//! ```
//!
//! # Taking snapshots
//!
//! [`take_all`] writes every compiled document unconditionally and records its
//! SHA-256 in the manifest. Files listed in the previous manifest that are no
//! longer produced are deleted so the baseline always mirrors one build. The
//! exception is a retained path: a sample that failed this run keeps its
//! accepted baseline and manifest entry until it compiles again.
//!
//! Manifest keys are only ever resolved inside the snapshot directory. A key
//! that is absolute or climbs out with `..` is ignored.
//!
//! # Diffing
//!
//! [`diff`] compares one compiled document with its snapshot byte for byte:
//! [`DiffOutcome::Equal`], [`DiffOutcome::Missing`] (no snapshot yet), or
//! [`DiffOutcome::Changed`] carrying a line diff. [`removed_entries`] lists
//! manifest entries with no compiled counterpart, i.e. examples deleted since
//! the snapshot was taken.
//!
//! The manifest is advisory: a missing or unreadable manifest loads as empty,
//! which only affects removed-entry detection and stale-file cleanup.

use crate::types::CompiledDocument;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the manifest file within the snapshot directory.
pub const MANIFEST_FILENAME: &str = ".snapshot-manifest.json";

/// Bump when the manifest format changes; older manifests load as empty.
const MANIFEST_VERSION: u32 = 1;

/// Unchanged lines shown around each change in a diff.
const CONTEXT_LINES: usize = 2;

/// Above this many line pairs the diff falls back to whole-file replacement.
const MAX_DIFF_CELLS: usize = 4_000_000;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Result of comparing a compiled document against its snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Equal,
    /// Line diff, snapshot (`-`) to compiled (`+`).
    Changed(String),
    Missing,
}

/// On-disk manifest mapping snapshot paths to content hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub version: u32,
    pub entries: BTreeMap<String, String>,
}

impl SnapshotManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the snapshot directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(snapshot_dir: &Path) -> Self {
        let path = snapshot_dir.join(MANIFEST_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, snapshot_dir: &Path) -> Result<(), SnapshotError> {
        let path = snapshot_dir.join(MANIFEST_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(io_err(&path))
    }
}

/// SHA-256 of some bytes, as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Manifest key of an output path: its components joined with `/`.
fn path_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn manifest_key(doc: &CompiledDocument) -> String {
    path_key(doc.path())
}

/// The relative path a manifest key names, or `None` if it would resolve
/// outside the snapshot directory.
fn key_path(key: &str) -> Option<&Path> {
    let path = Path::new(key);
    let contained = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    contained.then_some(path)
}

/// Write one document into the snapshot directory.
pub fn take(doc: &CompiledDocument, snapshot_dir: &Path) -> Result<(), SnapshotError> {
    let path = snapshot_dir.join(doc.path());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(&path, &doc.html).map_err(io_err(&path))
}

/// Replace the baseline with `docs` and save the manifest.
///
/// Previous entries for `retained` output paths are carried over untouched
/// instead of being pruned.
pub fn take_all(
    docs: &[CompiledDocument],
    retained: &[PathBuf],
    snapshot_dir: &Path,
) -> Result<SnapshotManifest, SnapshotError> {
    fs::create_dir_all(snapshot_dir).map_err(io_err(snapshot_dir))?;
    let previous = SnapshotManifest::load(snapshot_dir);

    let mut manifest = SnapshotManifest::empty();
    for doc in docs {
        take(doc, snapshot_dir)?;
        manifest
            .entries
            .insert(manifest_key(doc), hash_bytes(doc.html.as_bytes()));
    }
    for key in retained.iter().map(|p| path_key(p)) {
        if let Some(hash) = previous.entries.get(&key)
            && key_path(&key).is_some()
        {
            manifest.entries.entry(key).or_insert_with(|| hash.clone());
        }
    }

    for stale in previous.entries.keys() {
        if manifest.entries.contains_key(stale) {
            continue;
        }
        let Some(relative) = key_path(stale) else {
            continue;
        };
        let path = snapshot_dir.join(relative);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&path)(e)),
        }
    }

    manifest.save(snapshot_dir)?;
    Ok(manifest)
}

/// Compare one compiled document with its snapshot.
pub fn diff(doc: &CompiledDocument, snapshot_dir: &Path) -> Result<DiffOutcome, SnapshotError> {
    let path = snapshot_dir.join(doc.path());
    let snapshot = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DiffOutcome::Missing),
        Err(e) => return Err(io_err(&path)(e)),
    };
    if snapshot == doc.html.as_bytes() {
        return Ok(DiffOutcome::Equal);
    }
    let old = String::from_utf8_lossy(&snapshot);
    Ok(DiffOutcome::Changed(line_diff(&old, &doc.html)))
}

/// Snapshot entries whose document is no longer produced.
pub fn removed_entries(docs: &[CompiledDocument], snapshot_dir: &Path) -> Vec<PathBuf> {
    let produced: BTreeSet<String> = docs.iter().map(manifest_key).collect();
    SnapshotManifest::load(snapshot_dir)
        .entries
        .keys()
        .filter(|key| !produced.contains(*key))
        .filter_map(|key| key_path(key).map(Path::to_path_buf))
        .collect()
}

/// Tally of a whole-run diff.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffStats {
    pub equal: u32,
    pub changed: u32,
    pub missing: u32,
    pub removed: u32,
}

impl DiffStats {
    pub fn record(&mut self, outcome: &DiffOutcome) {
        match outcome {
            DiffOutcome::Equal => self.equal += 1,
            DiffOutcome::Changed(_) => self.changed += 1,
            DiffOutcome::Missing => self.missing += 1,
        }
    }

    /// Whether the build output matches the baseline exactly.
    pub fn is_clean(&self) -> bool {
        self.changed == 0 && self.missing == 0 && self.removed == 0
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} equal, {} changed, {} missing, {} removed",
            self.equal, self.changed, self.missing, self.removed
        )
    }
}

// ============================================================================
// Line diff
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op<'a> {
    Keep(&'a str),
    Remove(&'a str),
    Add(&'a str),
}

/// Longest-common-subsequence edit script between two line slices.
fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Op<'a>> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    let mut ops: Vec<Op> = old[..prefix].iter().map(|&l| Op::Keep(l)).collect();

    if a.len().saturating_mul(b.len()) > MAX_DIFF_CELLS {
        ops.extend(a.iter().map(|&l| Op::Remove(l)));
        ops.extend(b.iter().map(|&l| Op::Add(l)));
    } else {
        // lcs[i][j] = LCS length of a[i..] and b[j..]
        let mut lcs = vec![vec![0u32; b.len() + 1]; a.len() + 1];
        for i in (0..a.len()).rev() {
            for j in (0..b.len()).rev() {
                lcs[i][j] = if a[i] == b[j] {
                    lcs[i + 1][j + 1] + 1
                } else {
                    lcs[i + 1][j].max(lcs[i][j + 1])
                };
            }
        }
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if a[i] == b[j] {
                ops.push(Op::Keep(a[i]));
                i += 1;
                j += 1;
            } else if lcs[i + 1][j] >= lcs[i][j + 1] {
                ops.push(Op::Remove(a[i]));
                i += 1;
            } else {
                ops.push(Op::Add(b[j]));
                j += 1;
            }
        }
        ops.extend(a[i..].iter().map(|&l| Op::Remove(l)));
        ops.extend(b[j..].iter().map(|&l| Op::Add(l)));
    }

    ops.extend(old[old.len() - suffix..].iter().map(|&l| Op::Keep(l)));
    ops
}

/// Render a compact line diff with `@@ -old +new @@` hunk headers.
///
/// ```text
/// @@ -3 +3 @@
///   <head>
/// - <title>Old</title>
/// + <title>New</title>
///   </head>
/// ```
pub fn line_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ops = edit_script(&old_lines, &new_lines);

    let changed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Keep(_)))
        .map(|(i, _)| i)
        .collect();
    if changed.is_empty() {
        // Only line endings or a trailing newline differ.
        return "@@ whitespace-only change @@\n".to_string();
    }

    let visible = |i: usize| {
        changed
            .iter()
            .any(|&c| i + CONTEXT_LINES >= c && i <= c + CONTEXT_LINES)
    };

    let mut out = String::new();
    let (mut old_no, mut new_no) = (1usize, 1usize);
    let mut in_hunk = false;
    for (i, op) in ops.iter().enumerate() {
        if visible(i) {
            if !in_hunk {
                out.push_str(&format!("@@ -{old_no} +{new_no} @@\n"));
                in_hunk = true;
            }
            let (mark, line) = match op {
                Op::Keep(l) => (' ', l),
                Op::Remove(l) => ('-', l),
                Op::Add(l) => ('+', l),
            };
            out.push(mark);
            out.push(' ');
            out.push_str(line);
            out.push('\n');
        } else {
            in_hunk = false;
        }
        match op {
            Op::Keep(_) => {
                old_no += 1;
                new_no += 1;
            }
            Op::Remove(_) => old_no += 1,
            Op::Add(_) => new_no += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentKind, ExampleFile};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn doc(path: &str, html: &str) -> CompiledDocument {
        CompiledDocument {
            file: ExampleFile::new(path),
            html: html.to_string(),
            kind: DocumentKind::Example,
            source: None,
            draft: false,
        }
    }

    // =========================================================================
    // diff / take tests
    // =========================================================================

    #[test]
    fn missing_snapshot() {
        let tmp = TempDir::new().unwrap();
        let outcome = diff(&doc("ads/basic.html", "<p>x</p>"), tmp.path()).unwrap();
        assert_eq!(outcome, DiffOutcome::Missing);
    }

    #[test]
    fn snapshot_round_trip_is_equal() {
        let tmp = TempDir::new().unwrap();
        let d = doc("ads/basic.html", "<html>\n<p>x</p>\n</html>\n");
        take(&d, tmp.path()).unwrap();
        assert_eq!(diff(&d, tmp.path()).unwrap(), DiffOutcome::Equal);
    }

    #[test]
    fn changed_snapshot_reports_diff() {
        let tmp = TempDir::new().unwrap();
        take(&doc("a.html", "<head>\n<title>Old</title>\n</head>\n"), tmp.path()).unwrap();
        let outcome = diff(&doc("a.html", "<head>\n<title>New</title>\n</head>\n"), tmp.path()).unwrap();
        assert_eq!(
            outcome,
            DiffOutcome::Changed(
                "@@ -1 +1 @@\n  <head>\n- <title>Old</title>\n+ <title>New</title>\n  </head>\n"
                    .to_string()
            )
        );
    }

    #[test]
    fn take_overwrites_unconditionally() {
        let tmp = TempDir::new().unwrap();
        take(&doc("a.html", "one"), tmp.path()).unwrap();
        take(&doc("a.html", "two"), tmp.path()).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("a.html")).unwrap(), "two");
    }

    #[test]
    fn take_all_writes_manifest_and_prunes() {
        let tmp = TempDir::new().unwrap();
        take_all(
            &[doc("ads/basic.html", "a"), doc("ads/old.html", "b")],
            &[],
            tmp.path(),
        )
        .unwrap();
        assert!(tmp.path().join("ads/old.html").exists());

        let manifest = take_all(&[doc("ads/basic.html", "a2")], &[], tmp.path()).unwrap();
        assert!(!tmp.path().join("ads/old.html").exists());
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.entries["ads/basic.html"], hash_bytes(b"a2"));
        assert_eq!(SnapshotManifest::load(tmp.path()), manifest);
    }

    #[test]
    fn removed_entries_lists_unproduced_paths() {
        let tmp = TempDir::new().unwrap();
        take_all(
            &[doc("ads/basic.html", "a"), doc("ads/gone.html", "b")],
            &[],
            tmp.path(),
        )
        .unwrap();
        let removed = removed_entries(&[doc("ads/basic.html", "a")], tmp.path());
        assert_eq!(removed, vec![PathBuf::from("ads/gone.html")]);
    }

    #[test]
    fn take_all_keeps_retained_baselines() {
        let tmp = TempDir::new().unwrap();
        take_all(
            &[doc("ads/basic.html", "a"), doc("ads/broken.html", "b")],
            &[],
            tmp.path(),
        )
        .unwrap();

        let manifest = take_all(
            &[doc("ads/basic.html", "a")],
            &[PathBuf::from("ads/broken.html"), PathBuf::from("ads/never.html")],
            tmp.path(),
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("ads/broken.html")).unwrap(),
            "b"
        );
        assert_eq!(manifest.entries["ads/broken.html"], hash_bytes(b"b"));
        assert!(!manifest.entries.contains_key("ads/never.html"));
        assert!(removed_entries(&[doc("ads/basic.html", "a")], tmp.path())
            .contains(&PathBuf::from("ads/broken.html")));
    }

    #[test]
    fn escaping_manifest_keys_are_never_touched() {
        let outside = TempDir::new().unwrap();
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, "keep me").unwrap();

        let snapshots = TempDir::new().unwrap();
        let manifest = SnapshotManifest {
            version: MANIFEST_VERSION,
            entries: BTreeMap::from([
                (victim.to_string_lossy().into_owned(), "x".to_string()),
                ("../victim.txt".to_string(), "x".to_string()),
                ("ads/../../victim.txt".to_string(), "x".to_string()),
                ("ads/gone.html".to_string(), "x".to_string()),
            ]),
        };
        manifest.save(snapshots.path()).unwrap();

        assert_eq!(
            removed_entries(&[], snapshots.path()),
            vec![PathBuf::from("ads/gone.html")]
        );
        take_all(&[], &[], snapshots.path()).unwrap();
        assert_eq!(fs::read_to_string(&victim).unwrap(), "keep me");
        assert!(SnapshotManifest::load(snapshots.path()).entries.is_empty());
    }

    #[test]
    fn removed_entries_empty_without_manifest() {
        let tmp = TempDir::new().unwrap();
        assert!(removed_entries(&[], tmp.path()).is_empty());
    }

    // =========================================================================
    // Manifest tests
    // =========================================================================

    #[test]
    fn corrupt_manifest_loads_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "{ nope").unwrap();
        assert_eq!(SnapshotManifest::load(tmp.path()), SnapshotManifest::empty());
    }

    #[test]
    fn wrong_version_manifest_loads_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(MANIFEST_FILENAME),
            r#"{"version": 999, "entries": {"a.html": "x"}}"#,
        )
        .unwrap();
        assert!(SnapshotManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn hash_bytes_is_sha256_hex() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    // =========================================================================
    // line_diff tests
    // =========================================================================

    #[test]
    fn line_diff_limits_context() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let new = "1\n2\n3\n4\nfive\n6\n7\n8\n9\n";
        assert_eq!(
            line_diff(old, new),
            "@@ -3 +3 @@\n  3\n  4\n- 5\n+ five\n  6\n  7\n"
        );
    }

    #[test]
    fn line_diff_separate_hunks() {
        let old = "a\nb\nc\nd\ne\nf\ng\nh\ni\n";
        let new = "A\nb\nc\nd\ne\nf\ng\nh\nI\n";
        assert_eq!(
            line_diff(old, new),
            "@@ -1 +1 @@\n- a\n+ A\n  b\n  c\n@@ -7 +7 @@\n  g\n  h\n- i\n+ I\n"
        );
    }

    #[test]
    fn line_diff_insertion() {
        assert_eq!(line_diff("a\nc\n", "a\nb\nc\n"), "@@ -1 +1 @@\n  a\n+ b\n  c\n");
    }

    #[test]
    fn line_diff_trailing_newline_only() {
        assert_eq!(line_diff("a\n", "a"), "@@ whitespace-only change @@\n");
    }

    #[test]
    fn diff_stats_display_and_clean() {
        let mut stats = DiffStats::default();
        stats.record(&DiffOutcome::Equal);
        assert!(stats.is_clean());
        stats.record(&DiffOutcome::Missing);
        assert!(!stats.is_clean());
        assert_eq!(stats.to_string(), "1 equal, 0 changed, 1 missing, 0 removed");
    }
}
