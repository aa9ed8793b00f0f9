//! Example compilation.
//!
//! Stage 2 of the build. Merges one [`Sample`] with its template and the
//! project configuration into finished HTML documents:
//!
//! ```text
//! src/ads/basic.html + basic.json
//!     │  template: metadata.template ?? templates.example
//!     ├──────────────► dist/ads/basic.html
//!     │  preview: true, template: metadata.previewTemplate ?? templates.preview
//!     └──────────────► dist/ads/basic/preview.html
//! ```
//!
//! ## Template Context
//!
//! | Key | Value |
//! |-----|-------|
//! | `body` | sample markup, leading doc comment removed (use `{{{body}}}`) |
//! | `title`, `category`, `tags` | resolved metadata |
//! | `description_html` | markdown description rendered to HTML |
//! | `canonical_url`, `url_path` | public URL of the main example page |
//! | `preview_url` | public URL of the preview page, when one is built |
//! | `host`, `api_host` | from configuration |
//! | `ad.width`, `ad.height`, `ad.label_height` | ad container size (ad examples only) |
//! | `is_preview` | `true` while rendering the preview document |
//!
//! ## Doc Comments
//!
//! A sample may open with an HTML comment holding markdown documentation:
//!
//! ```html
//! <!--
//!   Shows a **fixed size** ad slot.
//! -->
//! <amp-ad width="300" height="250" type="doubleclick"></amp-ad>
//! ```
//!
//! The comment is stripped from `body` and rendered into `description_html`
//! unless the sidecar sets `description`, which takes precedence.
//!
//! ## Canonical Links
//!
//! After rendering, [`inject_canonical`] adds
//! `<link rel="canonical" href="...">` right after `<head>` unless the
//! document already carries one. Running it twice changes nothing.

use crate::config::{AdConfig, SiteConfig};
use crate::metadata::{self, AdOverrides};
use crate::template::{TemplateError, TemplateSet};
use crate::types::{CompiledDocument, DocumentKind, ExampleFile, Sample};
use crate::validate;
use pulldown_cmark::{Parser, html as md_html};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Category slug that marks a sample as an ad example.
const ADS_CATEGORY: &str = "ads";

static CANONICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*\brel\s*=\s*["']?canonical\b"#).unwrap()
});
static HEAD_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head\b[^>]*>").unwrap());
static HTML_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<html\b[^>]*>").unwrap());

/// Ad container dimensions handed to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdSettings {
    pub width: u32,
    pub height: u32,
    pub label_height: u32,
}

/// Apply per-field sidecar overrides on top of the configured defaults.
pub fn resolve_ad_settings(defaults: &AdConfig, overrides: Option<&AdOverrides>) -> AdSettings {
    let o = overrides.copied().unwrap_or_default();
    AdSettings {
        width: o.width.unwrap_or(defaults.default_width),
        height: o.height.unwrap_or(defaults.default_height),
        label_height: o.label_height.unwrap_or(defaults.ad_container_label_height),
    }
}

/// Whether a sample gets ad container settings in its context.
///
/// True for samples in the `ads` category, samples with an `ad` block in
/// their sidecar, and samples that build a preview.
pub fn is_ad_example(sample: &Sample) -> bool {
    sample.file_name.category().first().map(String::as_str) == Some(ADS_CATEGORY)
        || sample.metadata.ad.is_some()
        || sample.metadata.preview
}

/// Split a leading `<!-- ... -->` comment off a sample body.
///
/// Returns the trimmed comment text (if any) and the remaining body.
pub fn split_doc_comment(body: &str) -> (Option<&str>, &str) {
    let trimmed = body.trim_start();
    let Some(rest) = trimmed.strip_prefix("<!--") else {
        return (None, body);
    };
    match rest.find("-->") {
        Some(end) => {
            let comment = rest[..end].trim();
            let remainder = rest[end + 3..].trim_start_matches(['\r', '\n']);
            ((!comment.is_empty()).then_some(comment), remainder)
        }
        None => (None, body),
    }
}

/// Render markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

/// Whether a document already declares a canonical link. Commented-out
/// links don't count.
pub fn has_canonical(html: &str) -> bool {
    CANONICAL_RE.is_match(&validate::strip_comments(html))
}

/// Insert `<link rel="canonical">` unless one is present.
///
/// The link goes right after the opening `<head>` tag, else after `<html>`,
/// else at the very start of the document.
pub fn inject_canonical(html: &str, url: &str) -> String {
    if has_canonical(html) {
        return html.to_string();
    }
    let link = format!("<link rel=\"canonical\" href=\"{}\">", escape_attr(url));
    let at = HEAD_OPEN_RE
        .find(html)
        .or_else(|| HTML_OPEN_RE.find(html))
        .map(|m| m.end())
        .unwrap_or(0);
    let mut out = String::with_capacity(html.len() + link.len());
    out.push_str(&html[..at]);
    out.push_str(&link);
    out.push_str(&html[at..]);
    out
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug, Serialize)]
struct ExampleContext<'a> {
    body: &'a str,
    title: String,
    category: Option<String>,
    tags: &'a [String],
    description_html: Option<String>,
    canonical_url: String,
    url_path: String,
    preview_url: Option<String>,
    host: &'a str,
    api_host: &'a str,
    ad: Option<AdSettings>,
    is_preview: bool,
}

/// Compile one sample into its example page and, if flagged, its preview.
///
/// Fails when a named template is missing or rendering errors.
pub fn compile(
    sample: &Sample,
    config: &SiteConfig,
    templates: &TemplateSet,
) -> Result<Vec<CompiledDocument>, TemplateError> {
    let meta = &sample.metadata;
    let (doc_comment, body) = split_doc_comment(&sample.body);
    let description_html =
        metadata::resolve(&[meta.description.as_deref(), doc_comment]).map(|md| markdown_to_html(&md));

    let example_file = sample.example_file();
    let canonical_url = example_file.url(config.host_base());
    let preview_file = meta.preview.then(|| sample.preview_file());

    let mut context = ExampleContext {
        body,
        title: metadata::resolve(&[meta.title.as_deref()])
            .unwrap_or_else(|| sample.file_name.name().to_string()),
        category: metadata::resolve(&[meta.category.as_deref()]),
        tags: &meta.tags,
        description_html,
        canonical_url: canonical_url.clone(),
        url_path: example_file.url_path(),
        preview_url: preview_file.as_ref().map(|f| f.url(config.host_base())),
        host: config.host_base(),
        api_host: config.api_host.trim_end_matches('/'),
        ad: is_ad_example(sample).then(|| resolve_ad_settings(&config.a4a, meta.ad.as_ref())),
        is_preview: false,
    };

    let template = meta.template.as_deref().unwrap_or(config.templates.example.as_str());
    let html = templates.render(template, &context)?;
    let mut documents = vec![CompiledDocument {
        file: example_file,
        html: inject_canonical(&html, &canonical_url),
        kind: DocumentKind::Example,
        source: Some(sample.relative.clone()),
        draft: meta.draft,
    }];

    if let Some(preview_file) = preview_file {
        context.is_preview = true;
        context.ad = Some(resolve_ad_settings(&config.a4a, meta.ad.as_ref()));
        let template = meta
            .preview_template
            .as_deref()
            .unwrap_or(config.templates.preview.as_str());
        let html = templates.render(template, &context)?;
        documents.push(CompiledDocument {
            file: preview_file,
            html: inject_canonical(&html, &canonical_url),
            kind: DocumentKind::Preview,
            source: Some(sample.relative.clone()),
            draft: meta.draft,
        });
    }

    Ok(documents)
}

// ============================================================================
// Index page
// ============================================================================

/// One example as listed on the index page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub title: String,
    pub category: String,
    pub url: String,
    pub url_path: String,
    pub tags: Vec<String>,
}

impl IndexEntry {
    pub fn from_sample(sample: &Sample, config: &SiteConfig) -> Self {
        let file = sample.example_file();
        Self {
            title: metadata::resolve(&[sample.metadata.title.as_deref()])
                .unwrap_or_else(|| sample.file_name.name().to_string()),
            category: metadata::resolve(&[sample.metadata.category.as_deref()]).unwrap_or_default(),
            url: file.url(config.host_base()),
            url_path: file.url_path(),
            tags: sample.metadata.tags.clone(),
        }
    }
}

/// Examples of one category, in title order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexCategory {
    pub name: String,
    pub examples: Vec<IndexEntry>,
}

/// Group entries by category name; categories and their examples are sorted.
pub fn group_by_category(entries: Vec<IndexEntry>) -> Vec<IndexCategory> {
    let mut groups: BTreeMap<String, Vec<IndexEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.category.clone()).or_default().push(entry);
    }
    groups
        .into_iter()
        .map(|(name, mut examples)| {
            examples.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.url.cmp(&b.url)));
            IndexCategory { name, examples }
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct IndexContext<'a> {
    categories: Vec<IndexCategory>,
    example_count: usize,
    canonical_url: String,
    url_path: String,
    host: &'a str,
    api_host: &'a str,
}

/// Compile the site index from the listed (non-draft) examples.
pub fn compile_index(
    entries: Vec<IndexEntry>,
    config: &SiteConfig,
    templates: &TemplateSet,
) -> Result<CompiledDocument, TemplateError> {
    let file = ExampleFile::new("index.html");
    let canonical_url = file.url(config.host_base());
    let example_count = entries.len();
    let context = IndexContext {
        categories: group_by_category(entries),
        example_count,
        canonical_url: canonical_url.clone(),
        url_path: file.url_path(),
        host: config.host_base(),
        api_host: config.api_host.trim_end_matches('/'),
    };
    let html = templates.render(&config.templates.index, &context)?;
    Ok(CompiledDocument {
        file,
        html: inject_canonical(&html, &canonical_url),
        kind: DocumentKind::Index,
        source: None,
        draft: false,
    })
}
