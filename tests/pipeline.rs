//! End-to-end runs of the build pipeline against throwaway projects.
//!
//! Each test writes a small project (config, templates, samples) into a temp
//! directory and drives it through the public library API, the same way the
//! `abe` binary does.

use abe_build::config::SiteConfig;
use abe_build::pipeline::{self, Project, RunError, Site};
use abe_build::types::{CompiledDocument, DocumentKind};
use abe_build::validate;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEAD: &str = r#"<meta charset="utf-8">
  <meta name="viewport" content="width=device-width,minimum-scale=1,initial-scale=1">
  <script async src="https://cdn.ampproject.org/v0.js"></script>
  <style amp-boilerplate>body{visibility:hidden}</style><noscript><style amp-boilerplate>body{visibility:visible}</style></noscript>"#;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html ⚡ lang=\"en\">\n<head>\n  {HEAD}\n  <title>{title}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

/// A project with the stock layout and minimal valid templates.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let templates = tmp.path().join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::create_dir_all(tmp.path().join("src")).unwrap();

    fs::write(
        templates.join("example.html"),
        page("{{title}}", "<h1>{{title}}</h1>\n{{{body}}}"),
    )
    .unwrap();
    fs::write(
        templates.join("preview-a4a.html"),
        page(
            "{{title}} preview",
            r#"<div class="ad" data-width="{{ad.width}}" data-height="{{ad.height}}" data-label="{{ad.label_height}}">{{{body}}}</div>"#,
        ),
    )
    .unwrap();
    fs::write(
        templates.join("index.html"),
        page(
            "Index",
            "{{#each categories}}<h2>{{name}}</h2>{{#each examples}}<a href=\"{{url_path}}\">{{title}}</a>{{/each}}{{/each}}",
        ),
    )
    .unwrap();
    fs::write(templates.join("new-example.html"), "<p>{{title}}</p>\n").unwrap();
    tmp
}

fn add_sample(root: &Path, relative: &str, body: &str, sidecar: Option<&str>) {
    let path = root.join("src").join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    if let Some(json) = sidecar {
        fs::write(path.with_extension("json"), json).unwrap();
    }
}

fn compile(root: &Path) -> (Project, Site) {
    let project = Project::load(root).unwrap();
    let site = pipeline::compile_site(&project, None).unwrap();
    (project, site)
}

fn documents_from<'a>(site: &'a Site, source: &str) -> Vec<&'a CompiledDocument> {
    site.documents()
        .into_iter()
        .filter(|d| d.source.as_deref() == Some(Path::new(source)))
        .collect()
}

fn canonical_links(html: &str) -> usize {
    html.matches(r#"rel="canonical""#).count()
}

#[test]
fn basic_ad_compiles_to_one_canonical_page() {
    let tmp = project();
    add_sample(
        tmp.path(),
        "ads/basic.html",
        r#"<amp-ad width="300" height="250" type="a9"></amp-ad>"#,
        Some(r#"{"title": "Basic Ad", "category": "ads"}"#),
    );
    let (project, site) = compile(tmp.path());
    pipeline::write_site(&project, &site).unwrap();

    let docs = documents_from(&site, "ads/basic.html");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].path(), Path::new("ads/basic.html"));
    assert_eq!(docs[0].kind, DocumentKind::Example);

    let written = fs::read_to_string(tmp.path().join("dist/ads/basic.html")).unwrap();
    assert!(written.contains(
        r#"<link rel="canonical" href="https://ampbyexample.com/ads/basic.html">"#
    ));
    assert!(written.contains("<h1>Basic Ad</h1>"));
}

#[test]
fn preview_flag_adds_preview_page_with_default_ad_size() {
    let tmp = project();
    add_sample(
        tmp.path(),
        "ads/basic.html",
        r#"<amp-ad width="300" height="250" type="a9"></amp-ad>"#,
        Some(r#"{"title": "Basic Ad", "category": "ads", "preview": true}"#),
    );
    let (_, site) = compile(tmp.path());

    let docs = documents_from(&site, "ads/basic.html");
    let paths: Vec<&Path> = docs.iter().map(|d| d.path()).collect();
    assert_eq!(
        paths,
        vec![Path::new("ads/basic.html"), Path::new("ads/basic/preview.html")]
    );
    let preview = docs[1];
    assert_eq!(preview.kind, DocumentKind::Preview);
    assert!(preview.html.contains(r#"data-width="300" data-height="250" data-label="22""#));
    assert!(preview.html.contains("<title>Basic Ad preview</title>"));
}

#[test]
fn sample_without_sidecar_uses_defaults() {
    let tmp = project();
    add_sample(tmp.path(), "20_Layout/Full_Bleed.html", "<p>wide</p>", None);
    let (_, site) = compile(tmp.path());

    assert!(site.failures.is_empty());
    let docs = documents_from(&site, "20_Layout/Full_Bleed.html");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].path(), Path::new("layout/full-bleed.html"));
    assert!(docs[0].html.contains(
        r#"href="https://ampbyexample.com/layout/full-bleed.html""#
    ));
}

#[test]
fn existing_canonical_is_not_duplicated() {
    let tmp = project();
    fs::write(
        tmp.path().join("templates/fixed.html"),
        page(
            "{{title}}",
            "{{{body}}}",
        )
        .replace(
            "<head>\n",
            "<head>\n  <link rel=\"canonical\" href=\"https://elsewhere.example/\">\n",
        ),
    )
    .unwrap();
    add_sample(
        tmp.path(),
        "misc/pinned.html",
        "<p>x</p>",
        Some(r#"{"template": "fixed.html"}"#),
    );
    let (_, site) = compile(tmp.path());

    let doc = documents_from(&site, "misc/pinned.html")[0];
    assert_eq!(canonical_links(&doc.html), 1);
    assert!(doc.html.contains("https://elsewhere.example/"));
}

#[test]
fn commented_out_canonical_still_gets_a_real_one() {
    let tmp = project();
    add_sample(
        tmp.path(),
        "misc/legacy.html",
        "<!--\n  A sample that used to pin its own URL.\n-->\n<!-- <link rel=\"canonical\" href=\"https://old.example/\"> -->\n<p>x</p>",
        None,
    );
    let (_, site) = compile(tmp.path());

    let doc = documents_from(&site, "misc/legacy.html")[0];
    assert!(doc.html.contains(
        r#"<link rel="canonical" href="https://ampbyexample.com/misc/legacy.html">"#
    ));
    assert!(validate::validate(doc).is_ok());
}

#[test]
fn compiled_pages_validate_and_broken_boilerplate_is_rejected() {
    let tmp = project();
    add_sample(tmp.path(), "ads/basic.html", "<p>ok</p>", None);
    let (_, site) = compile(tmp.path());

    let report = pipeline::validate_site(&site);
    assert!(report.passed(), "{:?}", report.failures);

    let mut doc = documents_from(&site, "ads/basic.html")[0].clone();
    doc.html = doc.html.replace("<noscript>", "").replace("</noscript>", "");
    let violations = validate::validate(&doc).unwrap_err();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule, validate::Rule::Boilerplate);
}

#[test]
fn snapshot_round_trip_is_equal() {
    let tmp = project();
    add_sample(tmp.path(), "ads/basic.html", "<p>one</p>", None);
    add_sample(tmp.path(), "components/carousel.html", "<p>two</p>", None);
    let (project, site) = compile(tmp.path());

    pipeline::snapshot_site(&project, &site).unwrap();
    let report = pipeline::diff_site(&project, &site);
    assert!(report.is_clean(), "{}", report.stats);
    assert_eq!(report.stats.equal as usize, site.documents().len());

    // Recompiling unchanged sources is still clean.
    let (_, again) = compile(tmp.path());
    assert!(pipeline::diff_site(&project, &again).is_clean());
}

#[test]
fn changed_sample_shows_line_diff() {
    let tmp = project();
    add_sample(tmp.path(), "ads/basic.html", "<p>before</p>", None);
    let (project, site) = compile(tmp.path());
    pipeline::snapshot_site(&project, &site).unwrap();

    add_sample(tmp.path(), "ads/basic.html", "<p>after</p>", None);
    let (_, site) = compile(tmp.path());
    let report = pipeline::diff_site(&project, &site);

    assert_eq!(report.stats.changed, 1);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].source, PathBuf::from("ads/basic.html"));
    assert_eq!(failures[0].to_string(), "ads/basic.html: differs from snapshot");
}

#[test]
fn colliding_samples_abort_the_run() {
    let tmp = project();
    add_sample(tmp.path(), "ads/basic.html", "<p>a</p>", None);
    add_sample(tmp.path(), "10_Ads/Basic.html", "<p>b</p>", None);
    let project = Project::load(tmp.path()).unwrap();

    let err = pipeline::compile_site(&project, None).unwrap_err();
    assert!(matches!(err, RunError::OutputCollision { .. }));
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn unreadable_config_is_run_fatal() {
    let tmp = project();
    fs::write(tmp.path().join("config.toml"), "host = [").unwrap();
    assert!(matches!(
        Project::load(tmp.path()),
        Err(RunError::Config(_))
    ));
}

#[test]
fn config_overrides_ad_defaults() {
    let tmp = project();
    fs::write(
        tmp.path().join("config.toml"),
        "[a4a]\ndefault_width = 320\ndefault_height = 50\n",
    )
    .unwrap();
    add_sample(
        tmp.path(),
        "ads/sticky.html",
        "<p>x</p>",
        Some(r#"{"preview": true, "ad": {"labelHeight": 10}}"#),
    );
    let (project, site) = compile(tmp.path());
    assert_eq!(project.config.a4a.default_width, 320);

    let preview = documents_from(&site, "ads/sticky.html")[1];
    assert!(preview.html.contains(r#"data-width="320" data-height="50" data-label="10""#));
}

#[test]
fn camel_case_ad_keys_are_accepted() {
    let tmp = project();
    fs::write(
        tmp.path().join("config.toml"),
        "[a4a]\ndefaultWidth = 728\ndefaultHeight = 90\nadContainerLabelHeight = 16\n",
    )
    .unwrap();
    add_sample(
        tmp.path(),
        "ads/leaderboard.html",
        "<p>x</p>",
        Some(r#"{"preview": true}"#),
    );
    let (project, site) = compile(tmp.path());
    assert_eq!(project.config.a4a.default_width, 728);

    let preview = documents_from(&site, "ads/leaderboard.html")[1];
    assert!(preview.html.contains(r#"data-width="728" data-height="90" data-label="16""#));
}

#[test]
fn default_config_matches_stock_file() {
    let tmp = project();
    fs::write(
        tmp.path().join("config.toml"),
        abe_build::config::stock_config_toml(),
    )
    .unwrap();
    let project = Project::load(tmp.path()).unwrap();
    assert_eq!(project.config, SiteConfig::default());
}
