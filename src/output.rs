//! CLI output formatting for every command.
//!
//! # Source-First Display
//!
//! Every line about a sample leads with its path relative to the source root,
//! the same path that appears in `file: reason` failure lines, so output from
//! different commands can be grepped for one sample. Produced files and
//! details are shown as indented context below it.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! ads/basic.html
//!     → ads/basic.html
//!     → ads/basic/preview.html
//! ads/broken.html
//!     FAILED: malformed metadata in ads/broken.json: ...
//!
//! Failures
//! ads/broken.html: malformed metadata in ads/broken.json: ...
//!
//! Built 4 pages from 3 samples (1 failed), copied 2 assets
//! Sitemap: dist/sitemap.xml
//! ```
//!
//! ## Validate
//!
//! ```text
//! ads/bad.html
//!     [disallowed-tag] <img> is not allowed, use the AMP component instead
//!
//! Validated 5 documents: 1 failed
//! ```
//!
//! ## Diff
//!
//! ```text
//! CHANGED ads/basic.html
//!     @@ -3 +3 @@
//!     -<p>old</p>
//!     +<p>new</p>
//! MISSING ads/fresh.html
//! REMOVED ads/sticky.html
//!
//! 3 equal, 1 changed, 1 missing, 1 removed
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::command::CommandOutput;
use crate::pipeline::{
    CompileEvent, DiffReport, SampleError, SampleFailure, Site, ValidationReport, WriteSummary,
};
use crate::snapshot::{DiffOutcome, SnapshotManifest};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Indent every line of a multi-line block.
fn indent_block(text: &str, depth: usize) -> Vec<String> {
    text.lines().map(|l| format!("{}{}", indent(depth), l)).collect()
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format a single compile progress event.
pub fn format_compile_event(event: &CompileEvent) -> Vec<String> {
    match event {
        CompileEvent::Compiled { source, outputs } => {
            let mut lines = vec![source.display().to_string()];
            for output in outputs {
                lines.push(format!("{}→ {}", indent(1), output.display()));
            }
            lines
        }
        CompileEvent::Failed { source, reason } => vec![
            source.display().to_string(),
            format!("{}FAILED: {}", indent(1), reason),
        ],
    }
}

/// Format per-sample failures as `file: reason` lines under a header.
///
/// Returns nothing when there are no failures.
pub fn format_failures(failures: &[SampleFailure]) -> Vec<String> {
    if failures.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![String::new(), "Failures".to_string()];
    lines.extend(failures.iter().map(ToString::to_string));
    lines
}

pub fn print_failures(failures: &[SampleFailure]) {
    for line in format_failures(failures) {
        eprintln!("{}", line);
    }
}

/// Format the closing summary of a build.
pub fn format_build_summary(site: &Site, summary: &WriteSummary) -> Vec<String> {
    let mut headline = format!(
        "Built {} from {}",
        plural(summary.pages, "page", "pages"),
        plural(site.sample_count(), "sample", "samples")
    );
    if !site.failures.is_empty() {
        headline.push_str(&format!(" ({} failed)", site.failures.len()));
    }
    if summary.assets > 0 {
        headline.push_str(&format!(
            ", copied {}",
            plural(summary.assets, "asset", "assets")
        ));
    }

    let mut lines = vec![String::new(), headline];
    if let Some(sitemap) = &summary.sitemap {
        lines.push(format!("Sitemap: {}", sitemap.display()));
    }
    lines
}

pub fn print_build_summary(site: &Site, summary: &WriteSummary) {
    for line in format_build_summary(site, summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Validate
// ============================================================================

/// Format a validation report: each failing document with its violations.
pub fn format_validation_report(report: &ValidationReport) -> Vec<String> {
    let mut lines = Vec::new();
    for failure in &report.failures {
        lines.push(failure.source.display().to_string());
        match &failure.error {
            SampleError::Validation(violations) => {
                for violation in violations {
                    lines.push(format!("{}{}", indent(1), violation));
                }
            }
            other => lines.push(format!("{}{}", indent(1), other)),
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    let checked = plural(report.checked, "document", "documents");
    if report.passed() {
        lines.push(format!("Validated {checked}: all passed"));
    } else {
        lines.push(format!("Validated {checked}: {} failed", report.failures.len()));
    }
    lines
}

pub fn print_validation_report(report: &ValidationReport) {
    for line in format_validation_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Format a diff report. Equal documents are not listed.
pub fn format_diff_report(report: &DiffReport) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in &report.entries {
        match &entry.outcome {
            DiffOutcome::Equal => {}
            DiffOutcome::Changed(diff) => {
                lines.push(format!("CHANGED {}", entry.path.display()));
                lines.extend(indent_block(diff, 1));
            }
            DiffOutcome::Missing => lines.push(format!("MISSING {}", entry.path.display())),
        }
    }
    for path in &report.removed {
        lines.push(format!("REMOVED {}", path.display()));
    }
    for error in &report.errors {
        lines.push(format!("ERROR {}", error));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(report.stats.to_string());
    lines
}

pub fn print_diff_report(report: &DiffReport) {
    for line in format_diff_report(report) {
        println!("{}", line);
    }
}

/// Format the result of overwriting the snapshot directory.
pub fn format_snapshot_saved(manifest: &SnapshotManifest, dir: &Path) -> Vec<String> {
    vec![format!(
        "Saved {} to {}",
        plural(manifest.entries.len(), "document", "documents"),
        dir.display()
    )]
}

// ============================================================================
// Scaffolding and commands
// ============================================================================

pub fn format_new_example(path: &Path) -> Vec<String> {
    vec![format!("Created {}", path.display())]
}

/// Format one finished shell step: the command, its stdout, and the exit
/// status when it failed.
pub fn format_command_step(output: &CommandOutput) -> Vec<String> {
    let mut lines = vec![format!("$ {}", output.command)];
    lines.extend(indent_block(&output.stdout, 1));
    if !output.status.success() {
        lines.push(format!("{}FAILED: {}", indent(1), output.status));
    }
    lines
}

pub fn print_command_step(output: &CommandOutput) {
    for line in format_command_step(output) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
