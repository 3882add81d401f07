//! Migration script discovery

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{MigrationError, Result};

/// A runnable migration script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    /// File name; the migration key
    pub name: String,
    /// Full path to the script
    pub path: PathBuf,
}

/// List executable scripts in `dir`, sorted byte-wise by file name
///
/// Directories, non-executable files and names that are not valid UTF-8
/// are skipped silently. Symlinks are followed.
pub fn enumerate(dir: &Path) -> Result<Vec<ScriptEntry>> {
    let read_dir_err = |source: std::io::Error| MigrationError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut scripts = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let path = entry.path();

        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!("Skipping non UTF-8 file name in {:?}", dir);
            continue;
        };

        // Follows symlinks; dangling links fall out here
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
            continue;
        }

        scripts.push(ScriptEntry { name, path });
    }

    // Plain string order: "10_x" sorts before "2_x"
    scripts.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_script(dir: &Path, name: &str, mode: u32) {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn names(scripts: &[ScriptEntry]) -> Vec<&str> {
        scripts.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_lexicographic_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10_test.sh", "2_test.sh", "08_test.sh", "01_test.sh", "09_test.sh"] {
            write_script(dir.path(), name, 0o755);
        }

        let scripts = enumerate(dir.path()).unwrap();
        assert_eq!(
            names(&scripts),
            vec!["01_test.sh", "08_test.sh", "09_test.sh", "10_test.sh", "2_test.sh"]
        );
        assert_eq!(scripts[0].path, dir.path().join("01_test.sh"));
    }

    #[test]
    fn test_skips_non_executable_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "01_run.sh", 0o700);
        write_script(dir.path(), "02_readonly.sh", 0o644);
        write_script(dir.path(), "03_group_exec.sh", 0o650);
        fs::create_dir(dir.path().join("04_subdir")).unwrap();

        let scripts = enumerate(dir.path()).unwrap();
        assert_eq!(names(&scripts), vec!["01_run.sh", "03_group_exec.sh"]);
    }

    #[test]
    fn test_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        write_script(target.path(), "real.sh", 0o755);
        std::os::unix::fs::symlink(target.path().join("real.sh"), dir.path().join("01_link.sh"))
            .unwrap();
        std::os::unix::fs::symlink(target.path().join("gone.sh"), dir.path().join("02_dangling.sh"))
            .unwrap();

        let scripts = enumerate(dir.path()).unwrap();
        assert_eq!(names(&scripts), vec!["01_link.sh"]);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = enumerate(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open '"));
    }
}
