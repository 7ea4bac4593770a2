//! Bolt test utilities.
//!
//! Helpers for integration testing: throwaway project layouts, extension
//! manifest builders, and assertion utilities.

// Fixture helpers panic on setup failure, like the tests that use them.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value as JsonValue, json};
use tempfile::TempDir;

/// A project directory that is removed when dropped.
#[derive(Debug)]
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Create an empty project directory.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `vendor/` under the project root.
    pub fn vendor_dir(&self) -> PathBuf {
        self.path().join("vendor")
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    /// Read a file below the project root.
    pub fn read_file(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative)).unwrap()
    }

    /// Write the root `composer.json`.
    pub fn write_root_manifest(&self, manifest: &JsonValue) -> PathBuf {
        self.write_file("composer.json", &serde_json::to_string_pretty(manifest).unwrap())
    }

    /// Install `manifest` as `{root}/{name}/composer.json`, e.g. under
    /// `vendor` or `local`.
    pub fn install(&self, root: &str, manifest: &TestManifest) -> PathBuf {
        let relative = format!("{}/{}/composer.json", root, manifest.name());
        self.write_file(&relative, &manifest.to_json())
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a manifest for a Bolt extension package.
pub fn extension_manifest(name: &str) -> TestManifest {
    TestManifest {
        value: json!({
            "name": name,
            "type": "bolt-extension",
            "extra": {},
            "require": {}
        }),
    }
}

/// Create a manifest for a plain library package.
pub fn library_manifest(name: &str) -> TestManifest {
    TestManifest {
        value: json!({ "name": name, "type": "library" }),
    }
}

/// A `composer.json` builder.
#[derive(Debug, Clone)]
pub struct TestManifest {
    value: JsonValue,
}

impl TestManifest {
    /// Package name.
    pub fn name(&self) -> &str {
        self.value["name"].as_str().unwrap_or_default()
    }

    /// Set an `extra` entry.
    pub fn with_extra(mut self, key: &str, value: JsonValue) -> Self {
        if !self.value["extra"].is_object() {
            self.value["extra"] = json!({});
        }
        self.value["extra"][key] = value;
        self
    }

    /// Declare the extension class.
    pub fn with_class(self, class: &str) -> Self {
        self.with_extra("bolt-class", json!(class))
    }

    /// Declare the public asset directory.
    pub fn with_assets(self, dir: &str) -> Self {
        self.with_extra("bolt-assets", json!(dir))
    }

    /// Require a Bolt version.
    pub fn requiring_bolt(mut self, constraint: &str) -> Self {
        self.value["require"]["bolt/bolt"] = json!(constraint);
        self
    }

    /// The manifest as a JSON value.
    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    /// The manifest as pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap()
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that a JSON value equals expected.
    pub fn json_eq(actual: &Value, expected: &Value) {
        assert_eq!(
            actual,
            expected,
            "JSON mismatch:\nactual: {}\nexpected: {}",
            serde_json::to_string_pretty(actual).unwrap(),
            serde_json::to_string_pretty(expected).unwrap()
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }
}
