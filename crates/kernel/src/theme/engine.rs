//! Theme engine with Tera templates and suggestion resolution.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context as _, Result};
use dashmap::DashMap;
use regex::Regex;
use serde_json::{Map, Value};
use tera::Tera;
use tracing::debug;

/// Name ad-hoc snippets are compiled under.
///
/// The `.html` suffix keeps Tera's HTML autoescaping on for snippets.
pub(super) const SNIPPET_TEMPLATE: &str = "__snippet__.html";

/// Default excerpt length in characters.
const DEFAULT_EXCERPT_LENGTH: usize = 200;

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex literal"));

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
    /// Globals available to every template, fixed at construction.
    globals: Map<String, Value>,
    /// Cache mapping suggestion lists to resolved template names.
    suggestion_cache: DashMap<String, String>,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;

        Self::register_filters(&mut tera);

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(count = template_names.len(), dir = %template_dir.display(), "loaded templates");

        Ok(Self::with_tera(tera))
    }

    /// Create a theme engine with no templates (for testing).
    pub fn empty() -> Self {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        Self::with_tera(tera)
    }

    /// Create a theme engine from in-memory `(name, source)` templates.
    pub fn from_templates(templates: &[(&str, &str)]) -> Result<Self> {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        tera.add_raw_templates(templates.iter().copied())
            .context("failed to compile templates")?;
        Ok(Self::with_tera(tera))
    }

    fn with_tera(tera: Tera) -> Self {
        Self {
            tera,
            globals: Map::new(),
            suggestion_cache: DashMap::new(),
        }
    }

    /// Add a global visible to every template rendered by this engine.
    pub fn with_global(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.globals.insert(name.to_string(), value.into());
        self
    }

    /// Globals registered at construction.
    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Filter for formatting Unix timestamps as human-readable dates
        tera.register_filter(
            "format_date",
            |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let timestamp = match value {
                    tera::Value::Number(n) => n.as_i64().unwrap_or(0),
                    _ => return Ok(tera::Value::String(String::new())),
                };

                let formatted = chrono::DateTime::from_timestamp(timestamp, 0)
                    .map(|dt| dt.format("%B %-d, %Y").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());

                Ok(tera::Value::String(formatted))
            },
        );

        // Plain-text excerpt: strip markup, collapse whitespace, cut at `length`
        tera.register_filter(
            "excerpt",
            |value: &tera::Value, args: &HashMap<String, tera::Value>| {
                let text = tera::try_get_value!("excerpt", "value", String, value);
                let length = args
                    .get("length")
                    .and_then(|v| v.as_u64())
                    .map_or(DEFAULT_EXCERPT_LENGTH, |v| v as usize);

                Ok(tera::Value::String(excerpt(&text, length)))
            },
        );
    }

    /// Get the underlying Tera instance for custom operations.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Check whether a template exists in the loader.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template(name).is_ok()
    }

    /// Resolve the best template from a list of suggestions.
    ///
    /// Templates are tried in order; the first one that exists is returned.
    /// Each suggestion is tried as given and with `.html` appended.
    /// Results are cached for performance.
    ///
    /// Example suggestions: `["page--entry--hello", "page--entry", "page"]`
    pub fn resolve_template(&self, suggestions: &[&str]) -> Option<String> {
        if suggestions.is_empty() {
            return None;
        }

        let cache_key = suggestions.join("|");

        if let Some(cached) = self.suggestion_cache.get(&cache_key) {
            return Some(cached.clone());
        }

        for suggestion in suggestions {
            if self.has_template(suggestion) {
                let name = (*suggestion).to_string();
                self.suggestion_cache.insert(cache_key, name.clone());
                return Some(name);
            }

            let template_name = format!("{suggestion}.html");
            if self.has_template(&template_name) {
                self.suggestion_cache
                    .insert(cache_key, template_name.clone());
                return Some(template_name);
            }
        }

        // Don't cache negative results to allow hot-reload
        None
    }

    /// Get page template suggestions based on path.
    ///
    /// `/entry/hello` gives `page--entry--hello`, `page--entry`, `page`.
    pub fn page_suggestions(path: &str) -> Vec<String> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut suggestions: Vec<String> = (1..=segments.len())
            .rev()
            .map(|n| format!("page--{}", segments[..n].join("--")))
            .collect();
        suggestions.push("page".to_string());

        suggestions
    }

    /// Render a named template.
    pub fn render(&self, template: &str, context: &tera::Context) -> tera::Result<String> {
        self.tera.render(template, context)
    }

    /// Compile and render an ad-hoc template string.
    ///
    /// The snippet can use every filter and include every template this
    /// engine knows; it is compiled on a copy, so the engine itself is left
    /// unchanged.
    pub fn render_str(&self, source: &str, context: &tera::Context) -> tera::Result<String> {
        let mut tera = self.tera.clone();
        tera.add_raw_template(SNIPPET_TEMPLATE, source)?;
        tera.render(SNIPPET_TEMPLATE, context)
    }
}

/// Strip tags from `html` and cut the text to at most `length` characters,
/// breaking at a word boundary when possible.
pub fn excerpt(html: &str, length: usize) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() <= length {
        return text;
    }

    let mut chars = text.chars();
    let cut: String = chars.by_ref().take(length).collect();
    let at_boundary = chars.next().is_none_or(|c| c == ' ');
    let cut = match cut.rfind(' ') {
        Some(idx) if idx > 0 && !at_boundary => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", cut.trim_end_matches([',', '.', ';', ':']))
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .field("cache_size", &self.suggestion_cache.len())
            .finish()
    }
}
