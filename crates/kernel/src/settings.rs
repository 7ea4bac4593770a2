//! Site settings loaded from YAML.
//!
//! The main `config.yml` is mounted under the `general` namespace, so its
//! `caching.duration` entry is read as `general/caching/duration`.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Namespace the main configuration file is mounted under.
pub const GENERAL: &str = "general";

/// Default page cache duration in minutes.
pub const DEFAULT_CACHE_DURATION_MINUTES: u64 = 10;

/// Read-only settings tree with slash-separated path lookup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    root: Map<String, Value>,
}

impl Settings {
    /// Load the main configuration file.
    ///
    /// A missing file yields empty settings, so every lookup falls back to
    /// its default.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file: {}", path.display()))?;

        let settings = Self::from_yaml(&content)
            .with_context(|| format!("failed to parse configuration file: {}", path.display()))?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(settings)
    }

    /// Parse the main configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let blank = content
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'));
        let general: Value = if blank {
            Value::Null
        } else {
            serde_yml::from_str(content).context("invalid YAML")?
        };
        let general = match general {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(map),
            other => anyhow::bail!("configuration root must be a mapping, found {other}"),
        };

        let mut root = Map::new();
        root.insert(GENERAL.to_string(), general);
        Ok(Self { root })
    }

    /// Look up a value by slash-separated path, e.g. `general/caching/request`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Look up a value, returning `default` when absent or null.
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        match self.get(path) {
            Some(Value::Null) | None => default,
            Some(value) => value.clone(),
        }
    }

    /// Look up a flag with loose truthiness: `true`, non-zero numbers, and
    /// strings other than `""`, `"0"` and `"false"` count as set.
    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        match self.get(path) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !matches!(s.trim(), "" | "0" | "false"),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }

    /// Look up a whole number. Numeric strings are accepted and fractions
    /// are truncated; anything else yields `default`.
    pub fn get_u64(&self, path: &str, default: u64) -> u64 {
        match self.get(path) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(default),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| *f >= 0.0)
                .map(|f| f as u64)
                .unwrap_or(default),
            _ => default,
        }
    }

    /// Look up a string.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }
}

/// Page cache settings under `general/caching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachingSettings {
    /// Cache lifetime in minutes.
    pub duration_minutes: u64,
    /// Cache full pages.
    pub request: bool,
    /// Cache rendered templates.
    pub template: bool,
    /// Also cache for logged-in users.
    pub authenticated: bool,
}

impl Default for CachingSettings {
    fn default() -> Self {
        Self {
            duration_minutes: DEFAULT_CACHE_DURATION_MINUTES,
            request: false,
            template: false,
            authenticated: false,
        }
    }
}

impl CachingSettings {
    /// Read the caching section.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            duration_minutes: settings.get_u64(
                "general/caching/duration",
                DEFAULT_CACHE_DURATION_MINUTES,
            ),
            request: settings.get_bool("general/caching/request", false),
            template: settings.get_bool("general/caching/template", false),
            authenticated: settings.get_bool("general/caching/authenticated", false),
        }
    }

    /// Cache lifetime in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.duration_minutes.saturating_mul(60)
    }
}
