//! Project configuration module.
//!
//! Handles loading, validating, and merging the project's `config.toml`. The
//! stock defaults describe the standard project layout; a user file only needs
//! the keys it wants to change.
//!
//! ## Config File Location
//!
//! `config.toml` lives at the project root, next to the sample tree:
//!
//! ```text
//! project/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── src/                     # Samples (+ .json sidecars)
//! ├── templates/               # index / example / new-example / preview templates
//! ├── static/                  # Copied verbatim into the output root
//! ├── snapshots/               # Accepted compiled output (regression baseline)
//! └── dist/                    # Build output
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! host = "https://ampbyexample.com"      # Canonical URL base
//! api_host = "https://ampbyexample.com"  # Base for example API endpoints
//!
//! [paths]
//! source = "src"
//! pattern = "**/*.html"
//! templates = "templates"
//! output = "dist"
//! snapshots = "snapshots"
//! assets = "static"
//! assets_pattern = "**/*"
//!
//! [templates]
//! index = "index.html"
//! example = "example.html"
//! new_example = "new-example.html"
//! preview = "preview-a4a.html"
//!
//! [a4a]
//! default_width = 300
//! default_height = 250
//! ad_container_label_height = 22
//!
//! [sitemap]
//! enable = true
//! filename = "sitemap.xml"
//!
//! [deploy.staging]
//! commands = ["rsync -a dist/ staging:/srv/site"]
//!
//! [lint]
//! commands = []
//! ```
//!
//! The `[a4a]` keys also accept their camelCase spellings (`defaultWidth`,
//! `defaultHeight`, `adContainerLabelHeight`).
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the project configuration, relative to the project root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `config.toml`.
///
/// Built once at pipeline start and passed by reference to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Canonical URL base, e.g. `https://ampbyexample.com`.
    pub host: String,
    /// Base URL for API endpoints referenced by examples.
    pub api_host: String,
    pub paths: PathsConfig,
    pub templates: TemplatesConfig,
    pub a4a: AdConfig,
    pub sitemap: SitemapConfig,
    /// Named deploy targets, each an ordered command sequence.
    pub deploy: BTreeMap<String, CommandsConfig>,
    pub lint: CommandsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            host: "https://ampbyexample.com".to_string(),
            api_host: "https://ampbyexample.com".to_string(),
            paths: PathsConfig::default(),
            templates: TemplatesConfig::default(),
            a4a: AdConfig::default(),
            sitemap: SitemapConfig::default(),
            deploy: BTreeMap::new(),
            lint: CommandsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.host.starts_with("https://") || self.host.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "host must be an http(s) URL, got {:?}",
                self.host
            )));
        }
        if self.a4a.default_width == 0 || self.a4a.default_height == 0 {
            return Err(ConfigError::Validation(
                "a4a.default_width and a4a.default_height must be non-zero".into(),
            ));
        }
        let names = [
            ("templates.index", &self.templates.index),
            ("templates.example", &self.templates.example),
            ("templates.new_example", &self.templates.new_example),
            ("templates.preview", &self.templates.preview),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        let globs = [
            ("paths.pattern", &self.paths.pattern),
            ("paths.assets_pattern", &self.paths.assets_pattern),
        ];
        for (key, value) in globs {
            if let Err(e) = glob::Pattern::new(value) {
                return Err(ConfigError::Validation(format!(
                    "{key} is not a valid glob: {e}"
                )));
            }
        }
        if self.sitemap.filename.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sitemap.filename must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Host with any trailing slash removed, ready for URL joining.
    pub fn host_base(&self) -> &str {
        self.host.trim_end_matches('/')
    }
}

/// Directory layout, relative to the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Sample tree root.
    pub source: PathBuf,
    /// Glob (relative to `source`) selecting sample markup files.
    pub pattern: String,
    /// Directory holding the named templates.
    pub templates: PathBuf,
    /// Build output root.
    pub output: PathBuf,
    /// Snapshot baseline directory.
    pub snapshots: PathBuf,
    /// Static assets copied verbatim into the output root.
    pub assets: PathBuf,
    /// Glob (relative to `assets`) selecting which assets are copied.
    pub assets_pattern: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            pattern: "**/*.html".to_string(),
            templates: PathBuf::from("templates"),
            output: PathBuf::from("dist"),
            snapshots: PathBuf::from("snapshots"),
            assets: PathBuf::from("static"),
            assets_pattern: "**/*".to_string(),
        }
    }
}

/// Template file names per role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    pub index: String,
    pub example: String,
    pub new_example: String,
    pub preview: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            index: "index.html".to_string(),
            example: "example.html".to_string(),
            new_example: "new-example.html".to_string(),
            preview: "preview-a4a.html".to_string(),
        }
    }
}

/// Ad container defaults applied to ad-related examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdConfig {
    #[serde(alias = "defaultWidth")]
    pub default_width: u32,
    #[serde(alias = "defaultHeight")]
    pub default_height: u32,
    #[serde(alias = "adContainerLabelHeight")]
    pub ad_container_label_height: u32,
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            default_width: 300,
            default_height: 250,
            ad_container_label_height: 22,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapConfig {
    pub enable: bool,
    /// Written relative to the output root.
    pub filename: String,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enable: true,
            filename: "sitemap.xml".to_string(),
        }
    }
}

/// An ordered list of shell commands (deploy target or lint step).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandsConfig {
    pub commands: Vec<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// camelCase spellings of `[a4a]` keys and the field each one sets.
const AD_KEY_ALIASES: [(&str, &str); 3] = [
    ("defaultWidth", "default_width"),
    ("defaultHeight", "default_height"),
    ("adContainerLabelHeight", "ad_container_label_height"),
];

/// Rename camelCase `[a4a]` keys in a user file to their canonical spelling.
///
/// Must run before merging: the stock defaults always carry the snake_case
/// key, and serde rejects a field given under both names. A file that spells
/// one key both ways is left alone so that conflict is still reported.
fn normalize_ad_keys(overlay: &mut toml::Value) {
    let Some(a4a) = overlay.get_mut("a4a").and_then(toml::Value::as_table_mut) else {
        return;
    };
    for (alias, key) in AD_KEY_ALIASES {
        if !a4a.contains_key(key)
            && let Some(value) = a4a.remove(alias)
        {
            a4a.insert(key.to_string(), value);
        }
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(mut ov) => {
            normalize_ad_keys(&mut ov);
            merge_toml(base, ov)
        }
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the project config from `root/config.toml`, falling back to defaults.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# abe-build configuration
# =======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Canonical URL base. Every compiled example gets
#   <link rel="canonical" href="{host}/{category}/{name}.html">
host = "https://ampbyexample.com"

# Base URL for API endpoints used by examples (forms, lists, ...).
api_host = "https://ampbyexample.com"

# ---------------------------------------------------------------------------
# Project layout (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
source = "src"
# Glob, relative to `source`, selecting sample markup files.
pattern = "**/*.html"
templates = "templates"
output = "dist"
snapshots = "snapshots"
assets = "static"
# Glob, relative to `assets`, selecting which static files are copied.
assets_pattern = "**/*"

# ---------------------------------------------------------------------------
# Template file names (looked up in paths.templates)
# ---------------------------------------------------------------------------
[templates]
index = "index.html"
example = "example.html"
new_example = "new-example.html"
preview = "preview-a4a.html"

# ---------------------------------------------------------------------------
# Ad container defaults for ad examples and previews
# (defaultWidth, defaultHeight and adContainerLabelHeight are also accepted)
# ---------------------------------------------------------------------------
[a4a]
default_width = 300
default_height = 250
ad_container_label_height = 22

# ---------------------------------------------------------------------------
# Sitemap
# ---------------------------------------------------------------------------
[sitemap]
enable = true
filename = "sitemap.xml"

# ---------------------------------------------------------------------------
# Lint commands, run in order; the first failure stops the sequence.
# ---------------------------------------------------------------------------
[lint]
commands = []

# ---------------------------------------------------------------------------
# Deploy targets: `abe deploy <name>` runs the commands in order.
# ---------------------------------------------------------------------------
# [deploy.staging]
# commands = ["rsync -a dist/ staging.example.com:/srv/site"]
"##
}
