//! Extension descriptors written to `autoload.json`.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use super::package::Package;

/// What the extension loader needs to know about one installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub name: String,
    pub class: Option<String>,
    /// Package directory relative to the project directory.
    pub path: String,
    /// Asset directory relative to the web root.
    #[serde(rename = "webPath")]
    pub web_path: String,
    pub constraint: Option<String>,
    pub valid: bool,
}

impl PackageDescriptor {
    /// Describe `package`, whose manifest lives in `package_dir`.
    ///
    /// `package_dir` is made relative to `project_dir` when it lies below it.
    pub fn parse(project_dir: &Path, package_dir: &Path, package: &Package) -> Self {
        let relative = package_dir.strip_prefix(project_dir).unwrap_or(package_dir);
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let class = package
            .extra_str("bolt-class")
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let constraint = package
            .extra_str("bolt-constraint")
            .or_else(|| package.require.get("bolt/bolt").and_then(Value::as_str))
            .map(str::to_string);

        let valid = class.is_some() && !package.name.is_empty();

        Self {
            name: package.name.clone(),
            class,
            web_path: format!("extensions/{path}"),
            path,
            constraint,
            valid,
        }
    }
}
