//! In-memory [`StateStore`] used by the pipeline tests.

use super::{StateStore, validate_key};
use crate::error::StoreError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every key and value, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.entries.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_key(key)?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn append(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self.entries.lock().unwrap().contains_key(key))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            validate_key(prefix)?;
            format!("{prefix}/")
        };
        let entries = self.entries.lock().unwrap();
        let children: BTreeSet<String> = entries
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();
        Ok(children.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_returns_direct_children() {
        let store = MemoryStore::new();
        store.write("story/b/story.json", b"{}").unwrap();
        store.write("story/a/0.html", b"").unwrap();
        store.write("story/a/story.json", b"{}").unwrap();
        store.write("roundups.tsv", b"").unwrap();

        assert_eq!(store.list("story").unwrap(), vec!["a", "b"]);
        assert_eq!(store.list("story/a").unwrap(), vec!["0.html", "story.json"]);
        assert_eq!(store.list("").unwrap(), vec!["roundups.tsv", "story"]);
        assert!(store.list("missing").unwrap().is_empty());
    }
}
