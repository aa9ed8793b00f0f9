//! Run orchestration.
//!
//! ```text
//! scan ──► compile (parallel) ──► collision check ──► index
//!                                                      │
//!                     ┌────────────────┬───────────────┼────────────────┐
//!                     ▼                ▼               ▼                ▼
//!                write_site      validate_site     diff_site     snapshot_site
//!            (dist/ + sitemap)    (in memory)    (vs snapshots)  (overwrite)
//! ```
//!
//! # Errors
//!
//! Two tiers:
//!
//! - [`SampleFailure`]: one sample could not be loaded, compiled, validated or
//!   matched against its snapshot. Failures are collected in discovery order
//!   and the run carries on with the other samples.
//! - [`RunError`]: the run as a whole cannot continue (bad configuration,
//!   missing directories, two samples claiming one output path, write
//!   failures).
//!
//! # Parallelism
//!
//! Samples are compiled on the rayon pool. Results are collected back into
//! discovery order before collisions are checked, so both the collision
//! reported and the failure list are identical from run to run. Progress
//! events are sent as each sample finishes and may arrive in any order.

use crate::assets;
use crate::command::{self, CommandError, CommandOutput, CommandRunner};
use crate::compile::{self, IndexEntry};
use crate::config::{self, ConfigError, SiteConfig};
use crate::naming::{FileName, NamingError};
use crate::scan::{self, LoadError, ScanError};
use crate::sitemap;
use crate::snapshot::{self, DiffOutcome, DiffStats, SnapshotError, SnapshotManifest};
use crate::template::{TemplateError, TemplateSet};
use crate::types::{CompiledDocument, Sample};
use crate::validate::{self, Violation};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Why one sample failed.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("{} AMP violation(s): {}", .0.len(), join_violations(.0))]
    Validation(Vec<Violation>),
    #[error("differs from snapshot")]
    SnapshotMismatch { diff: String },
    #[error("no snapshot")]
    SnapshotMissing,
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A per-sample failure, reported as `file: reason`.
#[derive(Debug)]
pub struct SampleFailure {
    /// Sample path relative to the source root, or an output path for
    /// documents without a sample (the index).
    pub source: PathBuf,
    pub error: SampleError,
}

impl fmt::Display for SampleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source.display(), self.error)
    }
}

/// Errors that abort the whole run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{what} directory not found: {path}")]
    MissingDirectory { what: &'static str, path: PathBuf },
    #[error("output path collision: {path} is produced by both {first} and {second}")]
    OutputCollision {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[error("invalid sample pattern: {0}")]
    Scan(ScanError),
    #[error(transparent)]
    Template(TemplateError),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("unknown deploy target {0:?}")]
    UnknownTarget(String),
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> RunError + '_ {
    move |source| RunError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Progress of one sample, sent as soon as it is compiled.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileEvent {
    Compiled { source: PathBuf, outputs: Vec<PathBuf> },
    Failed { source: PathBuf, reason: String },
}

// ============================================================================
// Project
// ============================================================================

/// A project root plus its resolved configuration.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: SiteConfig,
}

impl Project {
    /// Load `config.toml` from `root` (stock defaults if absent).
    pub fn load(root: &Path) -> Result<Self, RunError> {
        Ok(Self {
            root: root.to_path_buf(),
            config: config::load_config(root)?,
        })
    }

    pub fn new(root: &Path, config: SiteConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.source)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.templates)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.output)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.snapshots)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.assets)
    }

    /// Load the template set, mapping a missing directory to a run error.
    pub fn templates(&self) -> Result<TemplateSet, RunError> {
        TemplateSet::load(&self.templates_dir()).map_err(|e| match e {
            TemplateError::MissingDirectory(path) => RunError::MissingDirectory {
                what: "templates",
                path,
            },
            other => RunError::Template(other),
        })
    }
}

// ============================================================================
// Compile
// ============================================================================

/// One successfully compiled sample.
#[derive(Debug, Clone)]
pub struct CompiledSample {
    pub sample: Sample,
    pub documents: Vec<CompiledDocument>,
}

/// Everything one run compiled.
#[derive(Debug)]
pub struct Site {
    /// Compiled samples in discovery order.
    pub samples: Vec<CompiledSample>,
    pub index: CompiledDocument,
    /// Samples that failed to load or compile, in discovery order.
    pub failures: Vec<SampleFailure>,
}

impl Site {
    /// All documents: the index first, then samples in discovery order.
    pub fn documents(&self) -> Vec<&CompiledDocument> {
        std::iter::once(&self.index)
            .chain(self.samples.iter().flat_map(|s| s.documents.iter()))
            .collect()
    }

    /// Owned copy of [`documents`](Self::documents).
    pub fn to_documents(&self) -> Vec<CompiledDocument> {
        self.documents().into_iter().cloned().collect()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len() + self.failures.len()
    }
}

fn event_for(outcome: &Result<CompiledSample, SampleFailure>) -> CompileEvent {
    match outcome {
        Ok(compiled) => CompileEvent::Compiled {
            source: compiled.sample.relative.clone(),
            outputs: compiled
                .documents
                .iter()
                .map(|d| d.path().to_path_buf())
                .collect(),
        },
        Err(failure) => CompileEvent::Failed {
            source: failure.source.clone(),
            reason: failure.error.to_string(),
        },
    }
}

/// Scan, compile every sample in parallel, check collisions, build the index.
pub fn compile_site(
    project: &Project,
    events: Option<Sender<CompileEvent>>,
) -> Result<Site, RunError> {
    let config = &project.config;
    let templates = project.templates()?;
    let source_dir = project.source_dir();
    let loaded: Vec<_> = scan::scan(&source_dir, &config.paths.pattern)
        .map_err(|e| match e {
            ScanError::MissingRoot(path) => RunError::MissingDirectory {
                what: "source",
                path,
            },
            other => RunError::Scan(other),
        })?
        .collect();

    let outcomes: Vec<Result<CompiledSample, SampleFailure>> = loaded
        .into_par_iter()
        .map(|item| {
            let outcome = match item {
                Err(e) => Err(SampleFailure {
                    source: e.relative,
                    error: SampleError::Load(e.error),
                }),
                Ok(sample) => match compile::compile(&sample, config, &templates) {
                    Ok(documents) => Ok(CompiledSample { sample, documents }),
                    Err(e) => Err(SampleFailure {
                        source: sample.relative.clone(),
                        error: e.into(),
                    }),
                },
            };
            if let Some(tx) = &events {
                // A dropped receiver only means nobody is listening.
                let _ = tx.send(event_for(&outcome));
            }
            outcome
        })
        .collect();

    let mut samples = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(compiled) => samples.push(compiled),
            Err(failure) => failures.push(failure),
        }
    }

    let entries: Vec<IndexEntry> = samples
        .iter()
        .filter(|c| !c.sample.metadata.draft)
        .map(|c| IndexEntry::from_sample(&c.sample, config))
        .collect();
    let index = compile::compile_index(entries, config, &templates).map_err(RunError::Template)?;

    check_collisions(&index, &samples)?;

    Ok(Site {
        samples,
        index,
        failures,
    })
}

/// Fail on the first output path claimed twice, in discovery order.
pub fn check_collisions(
    index: &CompiledDocument,
    samples: &[CompiledSample],
) -> Result<(), RunError> {
    let mut owners: HashMap<PathBuf, String> = HashMap::new();
    owners.insert(index.path().to_path_buf(), "the index page".to_string());
    for doc in samples.iter().flat_map(|s| s.documents.iter()) {
        let label = doc.label();
        if let Some(first) = owners.get(doc.path()) {
            return Err(RunError::OutputCollision {
                path: doc.path().to_path_buf(),
                first: first.clone(),
                second: label,
            });
        }
        owners.insert(doc.path().to_path_buf(), label);
    }
    Ok(())
}

// ============================================================================
// Write
// ============================================================================

/// What [`write_site`] put into the output directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub pages: usize,
    pub assets: usize,
    pub sitemap: Option<PathBuf>,
}

/// Copy assets, write every compiled document and the sitemap.
///
/// Assets are copied first so a compiled page always wins over an asset with
/// the same path.
pub fn write_site(project: &Project, site: &Site) -> Result<WriteSummary, RunError> {
    let output_dir = project.output_dir();
    fs::create_dir_all(&output_dir).map_err(write_err(&output_dir))?;

    let pattern = glob::Pattern::new(&project.config.paths.assets_pattern).map_err(|e| {
        ConfigError::Validation(format!("paths.assets_pattern is not a valid glob: {e}"))
    })?;
    let copied = assets::copy_assets(&project.assets_dir(), &pattern, &output_dir)
        .map_err(write_err(&output_dir))?;

    let documents = site.documents();
    for doc in &documents {
        let path = output_dir.join(doc.path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err(parent))?;
        }
        fs::write(&path, &doc.html).map_err(write_err(&path))?;
    }

    let sitemap = sitemap::write(documents.iter().copied(), &project.config, &output_dir)
        .map_err(write_err(&output_dir))?;

    Ok(WriteSummary {
        pages: documents.len(),
        assets: copied.len(),
        sitemap,
    })
}

// ============================================================================
// Validate
// ============================================================================

#[derive(Debug)]
pub struct ValidationReport {
    pub checked: usize,
    pub failures: Vec<SampleFailure>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate every compiled document; one failure never stops the others.
pub fn validate_site(site: &Site) -> ValidationReport {
    let documents = site.documents();
    let failures = documents
        .par_iter()
        .filter_map(|doc| {
            validate::validate(doc).err().map(|violations| SampleFailure {
                source: doc.source.clone().unwrap_or_else(|| doc.path().to_path_buf()),
                error: SampleError::Validation(violations),
            })
        })
        .collect();
    ValidationReport {
        checked: documents.len(),
        failures,
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Diff result for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: PathBuf,
    pub source: Option<PathBuf>,
    pub outcome: DiffOutcome,
}

#[derive(Debug)]
pub struct DiffReport {
    pub entries: Vec<DiffEntry>,
    /// Snapshot paths with no compiled counterpart.
    pub removed: Vec<PathBuf>,
    pub stats: DiffStats,
    /// Documents whose snapshot could not be read.
    pub errors: Vec<SampleFailure>,
}

impl DiffReport {
    pub fn is_clean(&self) -> bool {
        self.stats.is_clean() && self.errors.is_empty()
    }

    /// Mismatches and missing snapshots as per-sample failures.
    pub fn failures(&self) -> Vec<SampleFailure> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let error = match &entry.outcome {
                    DiffOutcome::Equal => return None,
                    DiffOutcome::Changed(diff) => SampleError::SnapshotMismatch { diff: diff.clone() },
                    DiffOutcome::Missing => SampleError::SnapshotMissing,
                };
                Some(SampleFailure {
                    source: entry.source.clone().unwrap_or_else(|| entry.path.clone()),
                    error,
                })
            })
            .collect()
    }
}

/// Compare every compiled document against the snapshot directory.
pub fn diff_site(project: &Project, site: &Site) -> DiffReport {
    let snapshot_dir = project.snapshot_dir();
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    let mut stats = DiffStats::default();

    let documents = site.to_documents();
    for doc in &documents {
        match snapshot::diff(doc, &snapshot_dir) {
            Ok(outcome) => {
                stats.record(&outcome);
                entries.push(DiffEntry {
                    path: doc.path().to_path_buf(),
                    source: doc.source.clone(),
                    outcome,
                });
            }
            Err(e) => errors.push(SampleFailure {
                source: doc.source.clone().unwrap_or_else(|| doc.path().to_path_buf()),
                error: e.into(),
            }),
        }
    }

    let removed = snapshot::removed_entries(&documents, &snapshot_dir);
    stats.removed = removed.len() as u32;

    DiffReport {
        entries,
        removed,
        stats,
        errors,
    }
}

/// Overwrite the snapshot directory with this run's output.
///
/// Samples that failed this run keep their previous baselines, so a broken
/// sidecar shows up as a change on the next diff rather than a lost snapshot.
pub fn snapshot_site(project: &Project, site: &Site) -> Result<SnapshotManifest, RunError> {
    let retained: Vec<PathBuf> = site
        .failures
        .iter()
        .filter_map(|failure| FileName::from_relative_path(&failure.source).ok())
        .flat_map(|name| [name.path(), name.preview_path()])
        .collect();
    Ok(snapshot::take_all(
        &site.to_documents(),
        &retained,
        &project.snapshot_dir(),
    )?)
}

// ============================================================================
// Scaffolding and commands
// ============================================================================

#[derive(Serialize)]
struct NewExampleContext<'a> {
    title: &'a str,
    category: Option<&'a str>,
    path: String,
    host: &'a str,
}

/// Create a new sample (and its sidecar) from the `new_example` template.
///
/// Refuses to overwrite an existing sample, or to add one whose output path
/// an existing sample already claims (`10_Ads/Basic.html` owns
/// `ads/basic.html`). Returns the sample path.
pub fn new_example(
    project: &Project,
    title: &str,
    category: Option<&str>,
) -> Result<PathBuf, RunError> {
    let file_name = FileName::new(title, category)?;
    let relative = file_name.path();
    let source_dir = project.source_dir();
    let path = source_dir.join(&relative);
    if path.exists() {
        return Err(RunError::AlreadyExists(path));
    }
    if let Some(existing) = sample_claiming(project, &relative)? {
        return Err(RunError::AlreadyExists(source_dir.join(existing)));
    }

    let templates = project.templates()?;
    let context = NewExampleContext {
        title,
        category,
        path: relative.to_string_lossy().into_owned(),
        host: project.config.host_base(),
    };
    let body = templates
        .render(&project.config.templates.new_example, &context)
        .map_err(RunError::Template)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err(parent))?;
    }
    fs::write(&path, body).map_err(write_err(&path))?;

    let sidecar = crate::metadata::sidecar_path(&path);
    if !sidecar.exists() {
        let mut meta = serde_json::Map::new();
        meta.insert("title".into(), title.into());
        if let Some(category) = category {
            meta.insert("category".into(), category.into());
        }
        let json = serde_json::to_string_pretty(&meta).map_err(|e| RunError::Write {
            path: sidecar.clone(),
            source: e.into(),
        })?;
        fs::write(&sidecar, json + "\n").map_err(write_err(&sidecar))?;
    }
    Ok(path)
}

/// The existing sample whose output path is `output`, if any.
fn sample_claiming(project: &Project, output: &Path) -> Result<Option<PathBuf>, RunError> {
    let source_dir = project.source_dir();
    if !source_dir.is_dir() {
        return Ok(None);
    }
    let samples = scan::scan(&source_dir, &project.config.paths.pattern).map_err(RunError::Scan)?;
    Ok(samples
        .map(|item| match item {
            Ok(sample) => sample.relative,
            Err(e) => e.relative,
        })
        .find(|relative| {
            FileName::from_relative_path(relative).is_ok_and(|name| name.path() == output)
        }))
}

/// Run the named deploy target's commands from the project root.
pub fn deploy(
    project: &Project,
    target: &str,
    runner: &dyn CommandRunner,
    on_step: impl FnMut(&CommandOutput),
) -> Result<Vec<CommandOutput>, RunError> {
    let commands = project
        .config
        .deploy
        .get(target)
        .ok_or_else(|| RunError::UnknownTarget(target.to_string()))?;
    Ok(command::run_sequence(runner, &commands.commands, &project.root, on_step)?)
}

/// Run the lint commands from the project root.
pub fn lint(
    project: &Project,
    runner: &dyn CommandRunner,
    on_step: impl FnMut(&CommandOutput),
) -> Result<Vec<CommandOutput>, RunError> {
    Ok(command::run_sequence(
        runner,
        &project.config.lint.commands,
        &project.root,
        on_step,
    )?)
}
