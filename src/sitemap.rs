//! Sitemap generation.
//!
//! Lists the index page and every published example page for search engines.
//! Preview pages and drafts are left out.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://ampbyexample.com/</loc>
//!   </url>
//!   <url>
//!     <loc>https://ampbyexample.com/ads/basic.html</loc>
//!   </url>
//! </urlset>
//! ```

use crate::config::SiteConfig;
use crate::types::{CompiledDocument, DocumentKind, ExampleFile};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Files that belong in the sitemap, in document order.
pub fn listed_files<'a>(
    docs: impl IntoIterator<Item = &'a CompiledDocument>,
) -> Vec<&'a ExampleFile> {
    docs.into_iter()
        .filter(|d| !d.draft && matches!(d.kind, DocumentKind::Index | DocumentKind::Example))
        .map(|d| &d.file)
        .collect()
}

/// Render the sitemap XML for `files` under `host`.
pub fn render<'a>(files: impl IntoIterator<Item = &'a ExampleFile>, host: &str) -> String {
    let mut xml = String::with_capacity(4096);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');

    for file in files {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&file.url(host))));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Write the sitemap into `output_dir` when enabled.
///
/// Returns the written path, or `None` if the sitemap is disabled.
pub fn write<'a>(
    docs: impl IntoIterator<Item = &'a CompiledDocument>,
    config: &SiteConfig,
    output_dir: &Path,
) -> io::Result<Option<PathBuf>> {
    if !config.sitemap.enable {
        return Ok(None);
    }
    let path = output_dir.join(&config.sitemap.filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, render(listed_files(docs), config.host_base()))?;
    Ok(Some(path))
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
