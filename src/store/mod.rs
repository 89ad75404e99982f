//! The working-directory state store.
//!
//! Every stage reads and writes its artifacts through [`StateStore`], keyed by
//! slash-separated relative paths (see [`layout`]). Two implementations exist:
//!
//! | Store | Module | Use |
//! |-------|--------|-----|
//! | [`DirStore`] | [`dir`] | The on-disk working directory; writes are atomic renames |
//! | `MemoryStore` | `memory` | In-process map for tests (test builds only) |
//!
//! # Key rules
//!
//! Keys are relative, use `/` as separator, and never contain empty, `.` or
//! `..` segments. [`validate_key`] enforces this for both stores.

use crate::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod dir;
pub mod layout;
#[cfg(test)]
pub mod memory;

pub use dir::DirStore;
#[cfg(test)]
pub use memory::MemoryStore;

/// Key-value view of the working directory.
///
/// `write` must be atomic: a reader sees either the previous value or the new
/// one, never a partial write. `list` returns the sorted names of the direct
/// children under a prefix, or an empty list when the prefix does not exist.
pub trait StateStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Append to a value, creating it if needed. Used for error logs only.
    fn append(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Read a value as UTF-8, replacing invalid sequences.
    fn read_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .read(key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        Self: Sized,
    {
        match self.read(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Json {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        self.write(key, &bytes)
    }
}

/// Reject keys that could escape the store root or alias another key.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("roundups/0").is_ok());
        assert!(validate_key("story/2020-01-05.foo/0.html").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("story/../x").is_err());
        assert!(validate_key("story//x").is_err());
        assert!(validate_key("story/./x").is_err());
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        store.write_json("a/b.json", &vec![3, 1, 2]).unwrap();
        let back: Option<Vec<u32>> = store.read_json("a/b.json").unwrap();
        assert_eq!(back, Some(vec![3, 1, 2]));
        let missing: Option<Vec<u32>> = store.read_json("a/c.json").unwrap();
        assert_eq!(missing, None);

        store.write("a/bad.json", b"{not json").unwrap();
        let err = store.read_json::<Vec<u32>>("a/bad.json").unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }
}
