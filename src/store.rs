use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::state::Document;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence over the whole document: read-all plus atomic write-all.
///
/// Callers serialize their own read-modify-write sequences (the engine holds
/// the document behind one mutex), so the store needs no finer-grained
/// transaction discipline than "a save is all-or-nothing".
pub trait Store: Send + Sync {
    fn load(&self) -> Result<Document, StoreError>;
    fn save(&self, doc: &Document) -> Result<(), StoreError>;
}

/// JSON file store. Saves write a sibling `.tmp` file and rename it over the
/// target so a crash mid-write never leaves a half-written document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Document, StoreError> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, doc: &Document) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs
#[derive(Clone, Default)]
pub struct MemStore {
    doc: Arc<Mutex<Document>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved document, as a later restart would observe it
    pub fn persisted(&self) -> Document {
        self.doc.lock().expect("store poisoned").clone()
    }
}

impl Store for MemStore {
    fn load(&self) -> Result<Document, StoreError> {
        Ok(self.doc.lock().expect("store poisoned").clone())
    }

    fn save(&self, doc: &Document) -> Result<(), StoreError> {
        *self.doc.lock().expect("store poisoned") = doc.clone();
        Ok(())
    }
}
