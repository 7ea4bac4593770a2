//! Filesystem helpers for Composer hooks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Failure while mirroring a directory tree.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("source directory \"{0}\" does not exist")]
    MissingSource(PathBuf),

    #[error("failed to create \"{path}\": {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to copy \"{from}\" to \"{to}\": {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to walk \"{root}\": {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
}

/// Whether `a` and `b` resolve to the same location.
///
/// Two paths that both fail to resolve count as the same.
pub fn same_location(a: &Path, b: &Path) -> bool {
    a.canonicalize().ok() == b.canonicalize().ok()
}

/// Copy every directory and file under `source` into `destination`.
///
/// Existing files are overwritten; files only present in `destination`
/// are left alone. Returns the number of files copied.
pub fn mirror_dir(source: &Path, destination: &Path) -> Result<usize, MirrorError> {
    if !source.is_dir() {
        return Err(MirrorError::MissingSource(source.to_path_buf()));
    }

    create_dir(destination)?;

    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source_err| MirrorError::Walk {
            root: source.to_path_buf(),
            source: source_err,
        })?;

        // WalkDir only yields paths below its root.
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                create_dir(parent)?;
            }
            fs::copy(entry.path(), &target).map_err(|err| MirrorError::Copy {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                source: err,
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn create_dir(path: &Path) -> Result<(), MirrorError> {
    fs::create_dir_all(path).map_err(|source| MirrorError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_copies_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("css/vendor")).unwrap();
        fs::write(src.join("app.js"), "js").unwrap();
        fs::write(src.join("css/vendor/x.css"), "css").unwrap();

        let dest = dir.path().join("out/assets");
        let copied = mirror_dir(&src, &dest).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dest.join("app.js")).unwrap(), "js");
        assert_eq!(
            fs::read_to_string(dest.join("css/vendor/x.css")).unwrap(),
            "css"
        );
    }

    #[test]
    fn test_mirror_overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(src.join("a.txt"), "new").unwrap();
        fs::write(dest.join("a.txt"), "old").unwrap();
        fs::write(dest.join("keep.txt"), "keep").unwrap();

        mirror_dir(&src, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "new");
        assert!(dest.join("keep.txt").exists());
    }

    #[test]
    fn test_mirror_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = mirror_dir(&dir.path().join("nope"), &dir.path().join("dest")).unwrap_err();
        assert!(matches!(err, MirrorError::MissingSource(_)));
        assert!(!dir.path().join("dest").exists());
    }

    #[test]
    fn test_same_location() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        fs::create_dir_all(&a).unwrap();

        assert!(same_location(&a, &dir.path().join("a/../a")));
        assert!(!same_location(&a, dir.path()));
    }
}
