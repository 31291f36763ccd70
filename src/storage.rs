//! Persistence boundary for the card store.
//!
//! The whole state lives under one namespaced key as
//! `{"state": {...}, "version": N}`. A stored version other than
//! [`STATE_VERSION`] is discarded; there is no migration.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::store::CardState;

pub const STORAGE_KEY: &str = "card-designer-storage";
pub const STATE_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored state is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a CardState,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    state: CardState,
}

pub fn encode_state(state: &CardState) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&EnvelopeRef { state, version: STATE_VERSION })?)
}

/// `Ok(None)` when the payload was written under another version tag.
pub fn decode_state(raw: &str) -> Result<Option<CardState>, StorageError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let version = value.get("version").and_then(serde_json::Value::as_u64);
    if version != Some(u64::from(STATE_VERSION)) {
        tracing::warn!(?version, expected = STATE_VERSION, "stored state version mismatch; discarding");
        return Ok(None);
    }
    let envelope: Envelope = serde_json::from_value(value)?;
    Ok(Some(envelope.state))
}

/// Key-value slot holding the serialized state.
pub trait StateStorage {
    fn read_raw(&self) -> Result<Option<String>, StorageError>;
    fn write_raw(&self, contents: &str) -> Result<(), StorageError>;

    fn load(&self) -> Result<Option<CardState>, StorageError> {
        match self.read_raw()? {
            Some(raw) => decode_state(&raw),
            None => Ok(None),
        }
    }

    fn save(&self, state: &CardState) -> Result<(), StorageError> {
        self.write_raw(&encode_state(state)?)
    }
}

/// `<dir>/card-designer-storage.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn in_dir(dir: &Path) -> Self {
        Self { path: dir.join(format!("{STORAGE_KEY}.json")) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStorage for FileStorage {
    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_raw(&self, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), bytes = contents.len(), "state persisted");
        Ok(())
    }
}

/// In-process slot; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemoryStorage {
    pub fn with_contents(raw: impl Into<String>) -> Self {
        Self { slot: Rc::new(RefCell::new(Some(raw.into()))) }
    }
}

impl StateStorage for MemoryStorage {
    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        Ok(self.slot.borrow().clone())
    }

    fn write_raw(&self, contents: &str) -> Result<(), StorageError> {
        *self.slot.borrow_mut() = Some(contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_storage_round_trips_state() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(&dir.path().join("nested"));
        assert!(storage.load().unwrap().is_none());

        let state = CardState::new().set_field("email", "ada@example.com").save_design("mine");
        storage.save(&state).unwrap();

        assert_eq!(storage.load().unwrap(), Some(state));
        assert!(storage.path().ends_with("card-designer-storage.json"));
    }

    #[test]
    fn other_versions_are_discarded() {
        let raw = serde_json::json!({ "state": CardState::new(), "version": 7 }).to_string();
        assert!(MemoryStorage::with_contents(raw).load().unwrap().is_none());
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let err = MemoryStorage::with_contents("{not json").load().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[test]
    fn envelope_carries_version_tag() {
        let raw = encode_state(&CardState::new()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["currentTemplateId"], "blue-gray");
    }
}
