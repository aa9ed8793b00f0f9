//! Named page templates.
//!
//! Every `.html` file directly inside the template directory is registered
//! under its file name (`example.html`, `preview-a4a.html`, ...), which is
//! how configuration and sidecars refer to templates. Templates use
//! Handlebars syntax; the sample markup is inserted unescaped with
//! `{{{body}}}`, every other value is HTML-escaped by `{{...}}`.
//!
//! Besides the Handlebars built-ins, one helper is registered:
//!
//! - `slugify`: `{{slugify category}}` → the URL slug used for output paths

use crate::naming::{HTML_EXTENSION, slugify};
use handlebars::Handlebars;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("template {name:?} not found in {dir}")]
    Missing { name: String, dir: PathBuf },
    #[error("template {name:?} does not parse: {source}")]
    Parse {
        name: String,
        source: Box<handlebars::TemplateError>,
    },
    #[error("rendering {name:?} failed: {source}")]
    Render {
        name: String,
        source: Box<handlebars::RenderError>,
    },
}

/// The templates of one project, loaded once per run.
pub struct TemplateSet {
    registry: Handlebars<'static>,
    dir: PathBuf,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("dir", &self.dir)
            .field("names", &self.names())
            .finish()
    }
}

impl TemplateSet {
    fn empty(dir: PathBuf) -> Self {
        let mut registry = Handlebars::new();
        registry.register_helper("slugify", Box::new(slugify_helper));
        Self { registry, dir }
    }

    /// Register every `.html` file in `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        if !dir.is_dir() {
            return Err(TemplateError::MissingDirectory(dir.to_path_buf()));
        }
        let mut set = Self::empty(dir.to_path_buf());

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|e| e.eq_ignore_ascii_case(HTML_EXTENSION))
            })
            .collect();
        files.sort();

        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let source = fs::read_to_string(&path)?;
            set.register(&name, &source)?;
        }
        Ok(set)
    }

    /// Build a set from in-memory sources; names are used verbatim.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, TemplateError> {
        let mut set = Self::empty(PathBuf::from("<memory>"));
        for (name, source) in sources {
            set.register(name, source)?;
        }
        Ok(set)
    }

    fn register(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| TemplateError::Parse {
                name: name.to_string(),
                source: Box::new(e),
            })
    }

    /// Directory the templates were loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Registered template names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.get_templates().keys().cloned().collect();
        names.sort();
        names
    }

    /// Render the named template against `context`.
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, TemplateError> {
        if !self.contains(name) {
            return Err(TemplateError::Missing {
                name: name.to_string(),
                dir: self.dir.clone(),
            });
        }
        self.registry
            .render(name, context)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                source: Box::new(e),
            })
    }
}

fn slugify_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&slugify(param))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn load_registers_html_files_by_file_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("example.html"), "<p>{{title}}</p>").unwrap();
        fs::write(tmp.path().join("preview-a4a.html"), "<p>{{ad.width}}</p>").unwrap();
        fs::write(tmp.path().join("README.md"), "not a template").unwrap();

        let set = TemplateSet::load(tmp.path()).unwrap();
        assert_eq!(set.names(), vec!["example.html", "preview-a4a.html"]);
        assert!(set.contains("example.html"));
        assert!(!set.contains("README.md"));
    }

    #[test]
    fn load_missing_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = TemplateSet::load(&tmp.path().join("templates")).unwrap_err();
        assert!(matches!(err, TemplateError::MissingDirectory(_)));
    }

    #[test]
    fn load_reports_unparseable_template() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("broken.html"), "{{#if title}}unclosed").unwrap();

        let err = TemplateSet::load(tmp.path()).unwrap_err();
        assert!(matches!(err, TemplateError::Parse { ref name, .. } if name == "broken.html"));
    }

    #[test]
    fn render_escapes_values_but_not_triple_stash() {
        let set = TemplateSet::from_sources([("t.html", "{{title}}|{{{body}}}")]).unwrap();
        let html = set
            .render("t.html", &json!({"title": "a < b", "body": "<p>hi</p>"}))
            .unwrap();
        assert_eq!(html, "a &lt; b|<p>hi</p>");
    }

    #[test]
    fn render_unknown_template_is_missing() {
        let set = TemplateSet::from_sources([("example.html", "x")]).unwrap();
        let err = set.render("nope.html", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::Missing { ref name, .. } if name == "nope.html"));
        assert!(err.to_string().contains("nope.html"));
    }

    #[test]
    fn slugify_helper_matches_output_paths() {
        let set =
            TemplateSet::from_sources([("t.html", "<a href=\"#{{slugify category}}\">")]).unwrap();
        let html = set.render("t.html", &json!({"category": "10_Ads Formats"})).unwrap();
        assert_eq!(html, "<a href=\"#ads-formats\">");
    }
}
