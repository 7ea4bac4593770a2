//! Composer hooks for Bolt extensions.
//!
//! [`handle`] runs after each package operation and copies an extension's
//! public assets into the web root. [`dump`] runs after the autoloader is
//! dumped and writes `autoload.json`, which the extension loader reads on
//! boot.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::descriptor::PackageDescriptor;
use super::fs::{mirror_dir, same_location};
use super::io::IoSink;
use super::package::{Package, PackageEvent, ScriptEvent};

/// Directories scanned for installed extensions, relative to the project.
pub const EXTENSION_ROOTS: &[&str] = &["local", "vendor"];

/// Composer's own metadata directory, never an extension.
const COMPOSER_METADATA_DIR: &str = "vendor/composer";

/// Manifest file name.
const MANIFEST: &str = "composer.json";

/// Output file, relative to the vendor directory.
pub const AUTOLOAD_FILE: &str = "autoload.json";

/// Copy an installed or updated extension's assets into the web root.
///
/// Other operations and packages that are not extensions with a
/// `bolt-assets` entry are ignored.
pub fn handle(event: &PackageEvent<'_>) {
    let Some(package) = event.operation.installed_package() else {
        return;
    };
    let Some(assets) = extension_assets(package) else {
        return;
    };

    let package_assets = format!("vendor/{}/{}", package.name, assets);

    let Some(web_path) = event.root.web_path() else {
        event.io.write_error(&format!(
            "Unable to mirror assets of {}: the root package does not set \"bolt-web-path\"",
            package.name
        ));
        return;
    };

    let source = event.project_dir.join(&package_assets);
    let dest = event
        .project_dir
        .join(web_path)
        .join("extensions")
        .join(&package_assets);

    mirror(&source, &dest, event.io);
}

fn extension_assets(package: &Package) -> Option<&str> {
    if !package.is_extension() {
        return None;
    }
    package.extra_str("bolt-assets")
}

/// Mirror `source` onto `dest` unless both are the same directory.
///
/// Failures are reported on `io` and never returned.
pub fn mirror(source: &Path, dest: &Path, io: &dyn IoSink) {
    if same_location(source, dest) {
        debug!(source = %source.display(), "asset source and destination match, skipping");
        return;
    }

    match mirror_dir(source, dest) {
        Ok(files) => {
            info!(
                source = %source.display(),
                dest = %dest.display(),
                files,
                "mirrored extension assets"
            );
        }
        Err(e) => {
            io.write_error(&format!(
                "Mirroring {} to {} failed:",
                source.display(),
                dest.display()
            ));
            io.write_error(&e.to_string());
        }
    }
}

/// Write `autoload.json` describing every installed extension.
///
/// Returns the path written.
pub fn dump(event: &ScriptEvent) -> Result<PathBuf> {
    let mut extensions = BTreeMap::new();

    for manifest in installed_manifests(&event.project_dir) {
        let Some(package) = read_manifest(&manifest) else {
            continue;
        };
        if !package.is_extension() {
            continue;
        }

        let package_dir = manifest.parent().unwrap_or(&event.project_dir);
        let descriptor = PackageDescriptor::parse(&event.project_dir, package_dir, &package);
        extensions.insert(package.name.clone(), descriptor);
    }

    let json = to_pretty_json(&extensions)?;

    fs::create_dir_all(&event.vendor_dir)
        .with_context(|| format!("failed to create {}", event.vendor_dir.display()))?;
    let path = event.vendor_dir.join(AUTOLOAD_FILE);
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), count = extensions.len(), "dumped extension autoload");
    Ok(path)
}

/// Find `{root}/{vendor}/{package}/composer.json` under each extension root.
fn installed_manifests(project_dir: &Path) -> Vec<PathBuf> {
    let mut manifests = Vec::new();

    for root in EXTENSION_ROOTS {
        let dir = project_dir.join(root);
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "extension root does not exist, skipping");
            continue;
        }

        let found = WalkDir::new(&dir)
            .min_depth(3)
            .max_depth(3)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == MANIFEST)
            .map(walkdir::DirEntry::into_path)
            .filter(|p| !is_composer_metadata(project_dir, p));

        manifests.extend(found);
    }

    manifests
}

fn is_composer_metadata(project_dir: &Path, manifest: &Path) -> bool {
    manifest
        .strip_prefix(project_dir)
        .is_ok_and(|rel| rel.starts_with(COMPOSER_METADATA_DIR))
}

fn read_manifest(path: &Path) -> Option<Package> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read package manifest");
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(package) => Some(package),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse package manifest");
            None
        }
    }
}

/// Pretty JSON with four-space indentation.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .context("failed to serialize extension descriptors")?;
    String::from_utf8(buf).context("serialized descriptors are not UTF-8")
}
