//! Filesystem storage adapter: one file per key under a data directory

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::StoragePort;

/// Durable [`StoragePort`] writing each key to its own file.
///
/// Writes go through a temp file followed by a rename so a crash mid-write
/// never leaves a truncated value behind.
#[derive(Debug, Clone)]
pub struct FsStorage {
    dir: PathBuf,
}

impl FsStorage {
    /// Open (and create if missing) the storage directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Storage(format!("creating {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(Error::InvalidInput(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(key))
    }
}

impl StoragePort for FsStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("reading {}: {e}", path.display()))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!("{key}.tmp"));
        fs::write(&tmp, value)
            .map_err(|e| Error::Storage(format!("writing {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Storage(format!("renaming into {}: {e}", path.display())))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("removing {}: {e}", path.display()))),
        }
    }
}

impl AsRef<Path> for FsStorage {
    fn as_ref(&self) -> &Path {
        &self.dir
    }
}
