//! Append-only behavior log
//!
//! The log lives in a key-value store as one JSON array under a fixed key.
//! Every append reads the whole array, pushes one entry and writes it back.
//! Content that is not a JSON array is treated as empty and overwritten.

use log::warn;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::TrackerError;
use crate::types::BehaviorLogEntry;

/// Key-value store holding whole documents
pub trait LogStore {
    /// Read the document under `key`, `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>, TrackerError>;

    /// Replace the document under `key`
    fn write(&mut self, key: &str, value: &str) -> Result<(), TrackerError>;
}

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, e.g. to simulate prior sessions
    pub fn insert(&self, key: &str, value: &str) {
        self.documents
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

impl LogStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, TrackerError> {
        Ok(self.documents.borrow().get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), TrackerError> {
        self.insert(key, value);
        Ok(())
    }
}

/// Directory-backed store, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the document for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl LogStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, TrackerError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrackerError::StoreError(format!(
                "cannot read {}: {e}",
                self.path_for(key).display()
            ))),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), TrackerError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value).map_err(|e| {
            TrackerError::StoreError(format!("cannot write {}: {e}", self.path_for(key).display()))
        })
    }
}

/// Behavior log over a `LogStore`
pub struct BehaviorJournal {
    store: Box<dyn LogStore>,
    key: String,
}

impl BehaviorJournal {
    pub fn new(store: Box<dyn LogStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append one entry; earlier entries, including foreign ones, are kept as-is
    pub fn append(&mut self, entry: &BehaviorLogEntry) -> Result<(), TrackerError> {
        let mut documents = self.load_array()?;
        documents.push(serde_json::to_value(entry)?);
        let json = serde_json::to_string(&documents)?;
        self.store.write(&self.key, &json)
    }

    /// Entries that parse as behavior log entries, in append order
    pub fn entries(&self) -> Result<Vec<BehaviorLogEntry>, TrackerError> {
        Ok(self
            .load_array()?
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect())
    }

    /// Number of array elements, parseable or not
    pub fn len(&self) -> Result<usize, TrackerError> {
        Ok(self.load_array()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, TrackerError> {
        Ok(self.len()? == 0)
    }

    fn load_array(&self) -> Result<Vec<Value>, TrackerError> {
        let Some(content) = self.store.read(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => {
                warn!("behavior log under {:?} is not an array, starting over", self.key);
                Ok(Vec::new())
            }
            Err(e) => {
                warn!("behavior log under {:?} is not valid JSON ({e}), starting over", self.key);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn entry(key: &str, value: &str) -> BehaviorLogEntry {
        BehaviorLogEntry {
            timestamp: Utc.with_ymd_and_hms(2025, 10, 17, 9, 35, 0).unwrap(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn memory_journal(store: &MemoryStore) -> BehaviorJournal {
        BehaviorJournal::new(Box::new(store.clone()), "userBehaviors")
    }

    #[test]
    fn test_append_and_read_back() {
        let store = MemoryStore::new();
        let mut journal = memory_journal(&store);
        journal.append(&entry("Hover Duration (>3s)", "3.0s")).unwrap();
        journal.append(&entry("Click Error Rate Trigger (>15%)", "15.2%")).unwrap();

        let entries = journal.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "Hover Duration (>3s)");
        assert_eq!(entries[1].value, "15.2%");
    }

    #[test]
    fn test_non_array_is_overwritten() {
        let store = MemoryStore::new();
        store.insert("userBehaviors", r#"{"oops": true}"#);
        let mut journal = memory_journal(&store);
        assert!(journal.is_empty().unwrap());

        journal.append(&entry("k", "v")).unwrap();
        let raw = store.read("userBehaviors").unwrap().unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_json_treated_as_empty() {
        let store = MemoryStore::new();
        store.insert("userBehaviors", "not json at all");
        let journal = memory_journal(&store);
        assert!(journal.entries().unwrap().is_empty());
    }

    #[test]
    fn test_foreign_entries_preserved() {
        let store = MemoryStore::new();
        store.insert("userBehaviors", r#"[{"legacy": 1}]"#);
        let mut journal = memory_journal(&store);
        journal.append(&entry("k", "v")).unwrap();

        assert_eq!(journal.len().unwrap(), 2);
        assert_eq!(journal.entries().unwrap().len(), 1);
        let raw = store.read("userBehaviors").unwrap().unwrap();
        assert!(raw.starts_with(r#"[{"legacy":1}"#));
    }

    #[test]
    fn test_shared_store_interleaves_appends() {
        let store = MemoryStore::new();
        let mut first = memory_journal(&store);
        let mut second = memory_journal(&store);

        first.append(&entry("a", "1")).unwrap();
        second.append(&entry("b", "2")).unwrap();
        first.append(&entry("c", "3")).unwrap();

        let keys: Vec<String> = first.entries().unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_file_store_round_trip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        // Not created yet; the first write makes it
        let dir = tmp.path().join("logs");
        let store = FileStore::new(&dir);
        assert!(store.read("userBehaviors").unwrap().is_none());

        let mut journal = BehaviorJournal::new(Box::new(store.clone()), "userBehaviors");
        journal.append(&entry("Scroll Velocity (<30px/s)", "12.5 px/s")).unwrap();

        assert!(store.path_for("userBehaviors").exists());
        let reopened = BehaviorJournal::new(Box::new(FileStore::new(&dir)), "userBehaviors");
        assert_eq!(reopened.entries().unwrap().len(), 1);
    }
}
