//! Composer package metadata and events.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::io::IoSink;

/// Package type that marks a Bolt extension.
pub const EXTENSION_TYPE: &str = "bolt-extension";

/// An installed (or about to be installed) package.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Package {
    pub name: String,

    #[serde(rename = "type", default = "default_package_type")]
    pub package_type: String,

    #[serde(default)]
    pub extra: Map<String, Value>,

    #[serde(default)]
    pub require: Map<String, Value>,
}

fn default_package_type() -> String {
    "library".to_string()
}

impl Package {
    pub fn new(name: impl Into<String>, package_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_type: package_type.into(),
            extra: Map::new(),
            require: Map::new(),
        }
    }

    /// Set one `extra` entry.
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn is_extension(&self) -> bool {
        self.package_type == EXTENSION_TYPE
    }

    /// String value of an `extra` entry.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// The project's own `composer.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RootPackage {
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl RootPackage {
    /// Read the root `composer.json`. A missing file gives an empty package.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Web root relative to the project directory.
    pub fn web_path(&self) -> Option<&str> {
        self.extra.get("bolt-web-path").and_then(Value::as_str)
    }
}

/// A package operation Composer is carrying out.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageOperation {
    Install { package: Package },
    Update { initial: Package, target: Package },
    Uninstall { package: Package },
}

impl PackageOperation {
    /// The package whose files end up on disk, if any.
    pub fn installed_package(&self) -> Option<&Package> {
        match self {
            PackageOperation::Install { package } => Some(package),
            PackageOperation::Update { target, .. } => Some(target),
            PackageOperation::Uninstall { .. } => None,
        }
    }
}

/// Fired for each package Composer installs, updates or removes.
pub struct PackageEvent<'a> {
    pub operation: PackageOperation,
    pub root: &'a RootPackage,
    /// Directory Composer runs in; relative package paths resolve here.
    pub project_dir: PathBuf,
    pub io: &'a dyn IoSink,
}

/// Fired once after Composer dumped its autoloader.
#[derive(Debug, Clone)]
pub struct ScriptEvent {
    pub vendor_dir: PathBuf,
    pub project_dir: PathBuf,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_root_manifest_is_empty() {
        let root = RootPackage::load(Path::new("/nonexistent/composer.json")).unwrap();
        assert_eq!(root, RootPackage::default());
        assert!(root.web_path().is_none());
    }

    #[test]
    fn test_package_from_manifest() {
        let package: Package = serde_json::from_str(
            r#"{"name": "acme/gallery", "type": "bolt-extension",
                "extra": {"bolt-assets": "web"}}"#,
        )
        .unwrap();
        assert!(package.is_extension());
        assert_eq!(package.extra_str("bolt-assets"), Some("web"));
        assert!(package.require.is_empty());
    }

    #[test]
    fn test_package_type_defaults_to_library() {
        let package: Package = serde_json::from_str(r#"{"name": "acme/lib"}"#).unwrap();
        assert_eq!(package.package_type, "library");
        assert!(!package.is_extension());
    }

    #[test]
    fn test_installed_package() {
        let a = Package::new("acme/a", EXTENSION_TYPE);
        let b = Package::new("acme/b", EXTENSION_TYPE);

        let update = PackageOperation::Update {
            initial: a.clone(),
            target: b.clone(),
        };
        assert_eq!(update.installed_package(), Some(&b));

        let uninstall = PackageOperation::Uninstall { package: a };
        assert!(uninstall.installed_package().is_none());
    }
}
