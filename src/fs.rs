//! Data directory index
//!
//! Game files are referenced with DOS paths in any case (`..\MENU\MENU2.WGP`,
//! `c1_01.scn`). The whole data directory is listed once and lookups are
//! case insensitive on the path relative to the root.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("Unable to open '{0}'")]
    NotFound(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
struct FileEntry {
    relative: String,
    path: PathBuf,
}

/// Case insensitive index of a data directory.
#[derive(Debug, Clone, Default)]
pub struct DataFs {
    root: PathBuf,
    files: Vec<FileEntry>,
}

impl DataFs {
    pub fn new(root: &Path) -> Self {
        let mut data_fs = Self {
            root: root.to_path_buf(),
            files: Vec::new(),
        };
        data_fs.scan_dir(root, "");
        data_fs.files.sort_by(|a, b| a.relative.cmp(&b.relative));
        tracing::debug!(target: "bermuda::info", root = %root.display(), files = data_fs.files.len(), "data directory indexed");
        data_fs
    }

    fn scan_dir(&mut self, dir: &Path, prefix: &str) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(target: "bermuda::info", dir = %dir.display(), error = %e, "unable to list directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            if path.is_dir() {
                self.scan_dir(&path, &relative);
            } else {
                self.files.push(FileEntry { relative, path });
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Relative paths of every indexed file.
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.relative.as_str())
    }

    /// Looks up a path relative to the data root, ignoring case.
    pub fn find_file_path(&self, relative: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|f| f.relative.eq_ignore_ascii_case(relative))
            .map(|f| f.path.as_path())
    }

    /// Resolves a game path (see [`fix_path`]).
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.find_file_path(&fix_path(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, FsError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        fs::read(path).map_err(|source| FsError::Io {
            path: name.to_string(),
            source,
        })
    }

    /// Like [`DataFs::read`], `None` when the file is missing.
    pub fn read_optional(&self, name: &str) -> Result<Option<Vec<u8>>, FsError> {
        match self.read(name) {
            Ok(data) => Ok(Some(data)),
            Err(FsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Maps a game path to a data relative path. Paths starting with `..` are
/// relative to the data root (`..\MENU\X` becomes `MENU/X`), all the others
/// live in the `SCN` directory.
pub fn fix_path(name: &str) -> String {
    let rest = if name.starts_with("..") {
        name.get(3..).unwrap_or("").to_string()
    } else {
        format!("SCN/{}", name)
    };
    rest.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fix_path() {
        assert_eq!(fix_path("c1_01.scn"), "SCN/c1_01.scn");
        assert_eq!(fix_path("..\\menu\\menu2.wgp"), "menu/menu2.wgp");
        assert_eq!(fix_path("..\\avi\\intro.avi"), "avi/intro.avi");
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("scn")).unwrap();
        fs::create_dir_all(dir.path().join("MENU")).unwrap();
        fs::write(dir.path().join("scn").join("C1_01.SCN"), b"End").unwrap();
        fs::write(dir.path().join("MENU").join("Menu2.wgp"), b"x").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();

        let data_fs = DataFs::new(dir.path());
        assert_eq!(data_fs.len(), 2);
        assert!(data_fs.exists("c1_01.scn"));
        assert!(data_fs.exists("..\\menu\\MENU2.WGP"));
        assert!(!data_fs.exists("c1_02.scn"));
        assert_eq!(data_fs.read("C1_01.scn").unwrap(), b"End");
        assert!(matches!(data_fs.read("missing.scn"), Err(FsError::NotFound(_))));
        assert!(data_fs.read_optional("missing.scn").unwrap().is_none());
    }
}
