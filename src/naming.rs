//! File naming for samples and compiled output.
//!
//! Every example is addressed by a [`FileName`]: a category path plus a name,
//! both normalized to URL-safe slugs. The same value names a new sample on
//! disk, places the compiled page in the output tree, and (through
//! [`ExampleFile`](crate::types::ExampleFile)) produces its canonical URL.
//!
//! ## Ordering prefixes
//!
//! Source directories and files may carry a numeric ordering prefix separated
//! by `_` or `-` (`10_Introduction/`, `020-ads/`). The prefix controls sort
//! order only and never reaches a slug or a display title:
//!
//! - `10_Introduction` → slug `introduction`, title "Introduction"
//! - `Hello_World` → slug `hello-world`, title "Hello World"
//! - `basic` → slug `basic`, title "basic"

use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_SLUG_LEN: usize = 80;

/// File name suffix of compiled and source markup.
pub const HTML_EXTENSION: &str = "html";

#[derive(Error, Debug, PartialEq)]
pub enum NamingError {
    #[error("title {0:?} has no URL-safe characters")]
    EmptySlug(String),
    #[error("not an .html path: {0}")]
    NotHtml(PathBuf),
}

/// Result of parsing an entry name like `10_Introduction`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Ordering prefix if present (e.g., `10` from `10_Introduction`)
    pub number: Option<u32>,
    /// Raw name after the prefix and separator. Empty if number-only.
    pub name: String,
    /// Display title: name with `_` and `-` converted to spaces.
    pub display_title: String,
}

/// Parse an entry name with an optional `NN_` / `NN-` ordering prefix.
///
/// - `"10_Introduction"` → number=Some(10), name="Introduction"
/// - `"020-My-Ads"` → number=Some(20), name="My-Ads", display_title="My Ads"
/// - `"001"` → number=Some(1), name=""
/// - `"Hello_World"` → number=None, display_title="Hello World"
pub fn parse_entry_name(name: &str) -> ParsedName {
    if let Some(sep_pos) = name.find(['-', '_']) {
        let prefix = &name[..sep_pos];
        if let Ok(num) = prefix.parse::<u32>() {
            let raw = &name[sep_pos + 1..];
            return ParsedName {
                number: Some(num),
                name: raw.to_string(),
                display_title: display(raw),
            };
        }
    }
    if let Ok(num) = name.parse::<u32>() {
        return ParsedName {
            number: Some(num),
            name: String::new(),
            display_title: String::new(),
        };
    }
    ParsedName {
        number: None,
        name: name.to_string(),
        display_title: display(name),
    }
}

fn display(raw: &str) -> String {
    raw.replace(['_', '-'], " ")
}

/// Sanitize a string into a lowercase URL slug.
///
/// - Strips an ordering prefix (`10_`, `020-`)
/// - Lowercases ASCII letters
/// - Replaces everything except ASCII alphanumerics with dashes
/// - Collapses consecutive dashes and strips leading/trailing ones
/// - Truncates to `MAX_SLUG_LEN` characters, breaking at the last dash
pub fn slugify(input: &str) -> String {
    let parsed = parse_entry_name(input.trim());
    let source = if parsed.number.is_some() {
        parsed.name
    } else {
        input.trim().to_string()
    };

    let mut collapsed = String::with_capacity(source.len());
    let mut prev_dash = false;
    for c in source.chars() {
        if c.is_ascii_alphanumeric() {
            collapsed.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            collapsed.push('-');
            prev_dash = true;
        }
    }

    let trimmed = collapsed.trim_matches('-');
    if trimmed.len() <= MAX_SLUG_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SLUG_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}

/// Normalized, URL-safe identity of an example.
///
/// Derivation is pure: the same `(title, category)` always yields the same
/// path. Distinct inputs can collapse to one `FileName` (`"Basic Ad"` and
/// `"basic-ad"`); callers that place files must detect that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileName {
    category: Vec<String>,
    name: String,
}

impl FileName {
    /// Derive from a human-readable title and an optional category.
    ///
    /// The category may be nested with `/` (`"ads/formats"`); every segment is
    /// slugified on its own and empty segments are dropped.
    pub fn new(title: &str, category: Option<&str>) -> Result<Self, NamingError> {
        let name = slugify(title);
        if name.is_empty() {
            return Err(NamingError::EmptySlug(title.to_string()));
        }
        let category = category
            .map(|c| c.split('/').map(slugify).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        Ok(Self { category, name })
    }

    /// Derive from a sample path relative to the source root.
    ///
    /// `10_Ads/Basic_Banner.html` → category `ads`, name `basic-banner`.
    pub fn from_relative_path(rel: &Path) -> Result<Self, NamingError> {
        let is_html = rel
            .extension()
            .map(|e| e.eq_ignore_ascii_case(HTML_EXTENSION))
            .unwrap_or(false);
        if !is_html {
            return Err(NamingError::NotHtml(rel.to_path_buf()));
        }
        let stem = rel
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category: Vec<String> = rel
            .parent()
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let joined = category.join("/");
        Self::new(&stem, (!joined.is_empty()).then_some(joined.as_str()))
    }

    /// Category slug segments (empty for root-level examples).
    pub fn category(&self) -> &[String] {
        &self.category
    }

    /// Category slug joined with `/`, if any.
    pub fn category_path(&self) -> Option<String> {
        (!self.category.is_empty()).then(|| self.category.join("/"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative output path: `ads/basic.html`.
    pub fn path(&self) -> PathBuf {
        let mut path: PathBuf = self.category.iter().collect();
        path.push(format!("{}.{HTML_EXTENSION}", self.name));
        path
    }

    /// Relative path of the preview page: `ads/basic/preview.html`.
    pub fn preview_path(&self) -> PathBuf {
        let mut path: PathBuf = self.category.iter().collect();
        path.push(&self.name);
        path.push(format!("preview.{HTML_EXTENSION}"));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // parse_entry_name tests
    // =========================================================================

    #[test]
    fn numbered_with_underscore() {
        let p = parse_entry_name("10_Introduction");
        assert_eq!(p.number, Some(10));
        assert_eq!(p.name, "Introduction");
        assert_eq!(p.display_title, "Introduction");
    }

    #[test]
    fn numbered_with_dash_multi_word() {
        let p = parse_entry_name("020-My-Ads");
        assert_eq!(p.number, Some(20));
        assert_eq!(p.name, "My-Ads");
        assert_eq!(p.display_title, "My Ads");
    }

    #[test]
    fn number_only() {
        let p = parse_entry_name("001");
        assert_eq!(p.number, Some(1));
        assert_eq!(p.name, "");
    }

    #[test]
    fn unnumbered_underscores_become_spaces() {
        let p = parse_entry_name("Hello_World");
        assert_eq!(p.number, None);
        assert_eq!(p.display_title, "Hello World");
    }

    // =========================================================================
    // slugify tests
    // =========================================================================

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Basic Ad"), "basic-ad");
        assert_eq!(slugify("Hello_World"), "hello-world");
    }

    #[test]
    fn slugify_strips_ordering_prefix() {
        assert_eq!(slugify("10_Introduction"), "introduction");
        assert_eq!(slugify("020-ads"), "ads");
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  a -- b  "), "a-b");
        assert_eq!(slugify("--hello--"), "hello");
        assert_eq!(slugify("amp-img & amp-video!"), "amp-img-amp-video");
    }

    #[test]
    fn slugify_drops_non_ascii() {
        assert_eq!(slugify("café"), "caf");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn slugify_truncates_at_word_boundary() {
        let title = "this is a very long title that exceeds the maximum slug length and should be truncated here";
        let result = slugify(title);
        assert!(result.len() <= MAX_SLUG_LEN);
        assert!(!result.ends_with('-'));
        assert!(!result.contains("truncated"));
    }

    // =========================================================================
    // FileName tests
    // =========================================================================

    #[test]
    fn file_name_from_title_and_category() {
        let f = FileName::new("Basic Ad", Some("ads")).unwrap();
        assert_eq!(f.path(), PathBuf::from("ads/basic-ad.html"));
        assert_eq!(f.preview_path(), PathBuf::from("ads/basic-ad/preview.html"));
    }

    #[test]
    fn file_name_without_category() {
        let f = FileName::new("Hello World", None).unwrap();
        assert_eq!(f.path(), PathBuf::from("hello-world.html"));
        assert_eq!(f.category_path(), None);
    }

    #[test]
    fn file_name_nested_category() {
        let f = FileName::new("Sticky", Some("10_Ads/Formats")).unwrap();
        assert_eq!(f.category(), ["ads".to_string(), "formats".to_string()]);
        assert_eq!(f.path(), PathBuf::from("ads/formats/sticky.html"));
    }

    #[test]
    fn file_name_is_deterministic() {
        let a = FileName::new("Basic Ad", Some("ads")).unwrap();
        let b = FileName::new("Basic Ad", Some("ads")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.path(), b.path());
    }

    #[test]
    fn distinct_inputs_can_collapse() {
        let a = FileName::new("Basic Ad", Some("Ads")).unwrap();
        let b = FileName::new("basic_ad", Some("10_ads")).unwrap();
        assert_eq!(a.path(), b.path());
    }

    #[test]
    fn file_name_rejects_empty_slug() {
        assert_eq!(
            FileName::new("!!!", None),
            Err(NamingError::EmptySlug("!!!".to_string()))
        );
    }

    #[test]
    fn file_name_from_relative_path() {
        let f = FileName::from_relative_path(Path::new("ads/basic.html")).unwrap();
        assert_eq!(f.path(), PathBuf::from("ads/basic.html"));
        assert_eq!(f.name(), "basic");
    }

    #[test]
    fn file_name_from_prefixed_path() {
        let f = FileName::from_relative_path(Path::new("10_Ads/Basic_Banner.html")).unwrap();
        assert_eq!(f.path(), PathBuf::from("ads/basic-banner.html"));
    }

    #[test]
    fn file_name_round_trips_through_path() {
        let f = FileName::new("Carousel With Captions", Some("components")).unwrap();
        let back = FileName::from_relative_path(&f.path()).unwrap();
        assert_eq!(f, back);
    }

    #[test]
    fn file_name_rejects_non_html() {
        let err = FileName::from_relative_path(Path::new("ads/basic.json")).unwrap_err();
        assert!(matches!(err, NamingError::NotHtml(_)));
    }
}
