//! # abe-build
//!
//! The build pipeline of an AMP example site. Every sample is one HTML
//! snippet (plus optional JSON metadata) in the source tree; the pipeline
//! turns it into complete, canonical AMP pages, checks them and guards the
//! output against unintended change.
//!
//! # Architecture: One Pipeline, Several Consumers
//!
//! ```text
//! 1. Load      src/**/*.html (+ .json)  →  Sample stream
//! 2. Compile   Sample + template + config  →  CompiledDocument(s)
//! 3. Consume   write dist/ + sitemap | validate | diff / snapshot
//! ```
//!
//! Loading and compiling are shared. Each command differs only in what it
//! does with the compiled documents, so `validate` and `diff` never touch the
//! output directory and a build never reads the snapshots.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: discovers samples and loads their sidecar metadata |
//! | [`compile`] | Stage 2: merges a sample with its template, injects the canonical link |
//! | [`validate`] | Structural AMP checks on compiled HTML |
//! | [`snapshot`] | Snapshot directory: take, diff, prune, manifest |
//! | [`sitemap`] | `sitemap.xml` for the published pages |
//! | [`assets`] | Static files copied into the output root |
//! | [`pipeline`] | Run orchestration, per-sample vs run-fatal errors, scaffolding, deploy |
//! | [`config`] | `config.toml` loading, defaults and validation |
//! | [`template`] | Handlebars template set loaded from the template directory |
//! | [`naming`] | Title and category → URL-safe output path |
//! | [`metadata`] | Sidecar JSON schema and precedence resolution |
//! | [`types`] | Shared types (`Sample`, `ExampleFile`, `CompiledDocument`) |
//! | [`command`] | Shell step runner for deploy and lint |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Paths Come From Files, Titles From Metadata
//!
//! A sample's output path is derived from where it sits in the source tree
//! (`src/10_Ads/Basic.html` → `ads/basic.html`). Sidecar titles and categories
//! only change what is displayed. Renaming an example's title never moves its
//! URL.
//!
//! ## Failures Are Per Sample
//!
//! A broken sidecar, a missing template or an invalid page fails that sample
//! and nothing else; the run reports every failure as `file: reason` and exits
//! non-zero at the end. Only problems that make the whole output untrustworthy
//! (bad config, missing directories, two samples claiming one path) stop the
//! run.
//!
//! ## Snapshots Are Plain Files
//!
//! The snapshot directory mirrors the output tree byte for byte, so a changed
//! example shows up as an ordinary diff in version control.

pub mod assets;
pub mod command;
pub mod compile;
pub mod config;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod sitemap;
pub mod snapshot;
pub mod template;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
