//! Directory-backed [`StateStore`].
//!
//! Keys map onto paths below the root. Writes go to a temporary sibling and
//! are renamed into place, so an interrupted run leaves either the old
//! artifact or the complete new one. Temporaries left behind by a crash are
//! removed the next time their directory is listed.

use super::{StateStore, validate_key};
use crate::error::StoreError;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TMP_SUFFIX: &str = ".partial";

#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }
}

fn io_err(key: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

fn ensure_parent(path: &Path, key: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(key))?;
    }
    Ok(())
}

impl StateStore for DirStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path(key)?;
        ensure_parent(&path, key)?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let written = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(data)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(key)(e));
        }
        debug!(%key, bytes = data.len(), "Wrote artifact");
        Ok(())
    }

    fn append(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path(key)?;
        ensure_parent(&path, key)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err(key))?;
        file.write_all(data).map_err(io_err(key))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path(key)?;
        path.try_exists().map_err(io_err(key))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.path(prefix)?
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(prefix)(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(prefix))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TMP_SUFFIX) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => debug!(%prefix, %name, "Removed stale temporary"),
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => warn!(%prefix, %name, error = %e, "Could not remove stale temporary"),
                }
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}
