//! Structural AMP validation of compiled documents.
//!
//! This is a lightweight, in-memory check meant to catch template and sample
//! regressions early; it is not the full AMP validator. A document passes
//! when it has:
//!
//! - `<!doctype html>` and an `<html ⚡>` / `<html amp>` root
//! - `<head>` and `<body>`
//! - `<meta charset="utf-8">` and a `<meta name="viewport">`
//! - a `<link rel="canonical">`
//! - the AMP runtime `<script async src="https://cdn.ampproject.org/v0.js">`
//! - the boilerplate style, plus its `<noscript>` fallback
//!
//! and contains none of the elements AMP replaces with components (`img`,
//! `video`, `iframe`, ...), no author scripts (only AMP runtime/extension
//! scripts and JSON data blocks) and no stylesheets other than a single
//! `<style amp-custom>`, the boilerplate and `<style amp-keyframes>`.
//!
//! Comments are ignored. Every violation in a document is reported, not just
//! the first.

use crate::types::CompiledDocument;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

/// Origin every AMP runtime and extension script is served from.
pub const AMP_CDN: &str = "https://cdn.ampproject.org/";
/// The AMP runtime.
pub const AMP_RUNTIME: &str = "https://cdn.ampproject.org/v0.js";

/// Elements AMP forbids outright (an `amp-*` component replaces each).
const DISALLOWED_TAGS: &[&str] = &[
    "img", "video", "audio", "iframe", "frame", "frameset", "object", "param", "applet", "embed",
];

/// Script types allowed inline as data.
const DATA_SCRIPT_TYPES: &[&str] = &["application/ld+json", "application/json"];

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<!doctype\s+html\s*>").unwrap());
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[^>])*)>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#).unwrap()
});

/// The structural rule a violation breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Doctype,
    AmpAttribute,
    Head,
    Body,
    Charset,
    Viewport,
    Canonical,
    Runtime,
    Boilerplate,
    DisallowedTag,
    DisallowedScript,
    DisallowedStyle,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::Doctype => "doctype",
            Rule::AmpAttribute => "amp-attribute",
            Rule::Head => "head",
            Rule::Body => "body",
            Rule::Charset => "charset",
            Rule::Viewport => "viewport",
            Rule::Canonical => "canonical",
            Rule::Runtime => "runtime",
            Rule::Boilerplate => "boilerplate",
            Rule::DisallowedTag => "disallowed-tag",
            Rule::DisallowedScript => "disallowed-script",
            Rule::DisallowedStyle => "disallowed-style",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: Rule,
    pub message: String,
}

impl Violation {
    fn new(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

/// Validate a compiled document.
pub fn validate(doc: &CompiledDocument) -> Result<(), Vec<Violation>> {
    let violations = check_html(&doc.html);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

struct Tag<'a> {
    name: String,
    closing: bool,
    attrs: Vec<(String, &'a str)>,
}

impl Tag<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

fn parse_tags(html: &str) -> Vec<Tag<'_>> {
    TAG_RE
        .captures_iter(html)
        .map(|caps| {
            let attrs = caps
                .get(3)
                .map(|m| {
                    ATTR_RE
                        .captures_iter(m.as_str())
                        .filter_map(|a| {
                            let name = a.get(1)?.as_str().to_ascii_lowercase();
                            let value = a
                                .get(2)
                                .or_else(|| a.get(3))
                                .or_else(|| a.get(4))
                                .map(|v| v.as_str())
                                .unwrap_or("");
                            Some((name, value))
                        })
                        .collect()
                })
                .unwrap_or_default();
            Tag {
                name: caps[2].to_ascii_lowercase(),
                closing: &caps[1] == "/",
                attrs,
            }
        })
        .collect()
}

/// `html` with every `<!-- ... -->` comment removed.
pub fn strip_comments(html: &str) -> Cow<'_, str> {
    COMMENT_RE.replace_all(html, "")
}

/// Run every rule against raw HTML and return all violations, in rule order.
pub fn check_html(html: &str) -> Vec<Violation> {
    let stripped = strip_comments(html);
    let tags = parse_tags(&stripped);
    let mut violations = Vec::new();

    if !DOCTYPE_RE.is_match(&stripped) {
        violations.push(Violation::new(Rule::Doctype, "document must start with <!doctype html>"));
    }

    let html_tag = tags.iter().find(|t| !t.closing && t.name == "html");
    match html_tag {
        Some(t) if t.has_attr("⚡") || t.has_attr("amp") => {}
        Some(_) => violations.push(Violation::new(
            Rule::AmpAttribute,
            "<html> must carry the ⚡ or amp attribute",
        )),
        None => violations.push(Violation::new(Rule::AmpAttribute, "missing <html> element")),
    }

    let opens = |name: &str| tags.iter().any(|t| !t.closing && t.name == name);
    if !opens("head") {
        violations.push(Violation::new(Rule::Head, "missing <head>"));
    }
    if !opens("body") {
        violations.push(Violation::new(Rule::Body, "missing <body>"));
    }

    let metas: Vec<&Tag> = tags.iter().filter(|t| !t.closing && t.name == "meta").collect();
    if !metas
        .iter()
        .any(|t| t.attr("charset").is_some_and(|c| c.eq_ignore_ascii_case("utf-8")))
    {
        violations.push(Violation::new(Rule::Charset, "missing <meta charset=\"utf-8\">"));
    }
    if !metas
        .iter()
        .any(|t| t.attr("name").is_some_and(|n| n.eq_ignore_ascii_case("viewport")))
    {
        violations.push(Violation::new(Rule::Viewport, "missing <meta name=\"viewport\">"));
    }

    let has_canonical = tags.iter().any(|t| {
        !t.closing
            && t.name == "link"
            && t.attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("canonical"))
            })
    });
    if !has_canonical {
        violations.push(Violation::new(Rule::Canonical, "missing <link rel=\"canonical\">"));
    }

    if !tags
        .iter()
        .any(|t| !t.closing && t.name == "script" && t.attr("src") == Some(AMP_RUNTIME))
    {
        violations.push(Violation::new(
            Rule::Runtime,
            format!("missing AMP runtime script {AMP_RUNTIME}"),
        ));
    }

    let mut noscript_depth = 0usize;
    let mut boilerplate = false;
    let mut noscript_boilerplate = false;
    let mut custom_styles = 0usize;
    for tag in &tags {
        match (tag.name.as_str(), tag.closing) {
            ("noscript", false) => noscript_depth += 1,
            ("noscript", true) => noscript_depth = noscript_depth.saturating_sub(1),
            ("style", false) => {
                if tag.has_attr("amp-boilerplate") {
                    if noscript_depth > 0 {
                        noscript_boilerplate = true;
                    } else {
                        boilerplate = true;
                    }
                } else if tag.has_attr("amp-custom") {
                    custom_styles += 1;
                    if custom_styles == 2 {
                        violations.push(Violation::new(
                            Rule::DisallowedStyle,
                            "only one <style amp-custom> is allowed",
                        ));
                    }
                } else if !tag.has_attr("amp-keyframes") {
                    violations.push(Violation::new(
                        Rule::DisallowedStyle,
                        "<style> must be amp-custom, amp-boilerplate or amp-keyframes",
                    ));
                }
            }
            ("script", false) => {
                let cdn = tag.attr("src").is_some_and(|src| src.starts_with(AMP_CDN));
                let data = tag
                    .attr("type")
                    .is_some_and(|ty| DATA_SCRIPT_TYPES.iter().any(|d| ty.eq_ignore_ascii_case(d)));
                if !cdn && !data {
                    let what = tag.attr("src").unwrap_or("inline script");
                    violations.push(Violation::new(
                        Rule::DisallowedScript,
                        format!("script not allowed: {what}"),
                    ));
                }
            }
            (name, false) if DISALLOWED_TAGS.contains(&name) => {
                violations.push(Violation::new(
                    Rule::DisallowedTag,
                    format!("<{name}> is not allowed in AMP"),
                ));
            }
            _ => {}
        }
    }
    if !boilerplate {
        violations.push(Violation::new(Rule::Boilerplate, "missing <style amp-boilerplate>"));
    }
    if !noscript_boilerplate {
        violations.push(Violation::new(
            Rule::Boilerplate,
            "missing <noscript><style amp-boilerplate> fallback",
        ));
    }

    violations
}
