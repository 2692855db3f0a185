//! Durable home for the [`Document`].
//!
//! Backends only know how to read and write a whole document. Seeding,
//! repair and the corrupt-store fallback live in the provided methods of
//! [`DocumentBackend`] so every backend behaves the same way.

pub mod json_file;

pub use json_file::JsonFileStore;

use std::sync::Mutex;
use tracing::warn;

use crate::error::{HubError, Result};
use crate::model::{normalize, Document};

pub trait DocumentBackend: Send + Sync {
    /// Raw stored document, `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<Document>>;

    /// Replace the stored document. Must not leave a partial write behind.
    fn write(&self, doc: &Document) -> Result<()>;

    /// Current document. An absent store is seeded and a store that no
    /// longer satisfies the invariants is repaired. Persisting either is
    /// best effort. An unreadable store yields the seeded default without
    /// touching it.
    fn load(&self) -> Result<Document> {
        match self.read() {
            Ok(Some(raw)) => {
                let doc = normalize(raw.clone());
                if doc != raw {
                    warn!("stored folders were invalid, persisting repaired document");
                    if let Err(err) = self.write(&doc) {
                        warn!("could not persist repaired folder store: {}", err);
                    }
                }
                Ok(doc)
            }
            Ok(None) => {
                let doc = Document::seeded();
                if let Err(err) = self.write(&doc) {
                    warn!("could not initialize folder store: {}", err);
                }
                Ok(doc)
            }
            Err(err) => {
                warn!("could not read folder store, using default: {}", err);
                Ok(Document::seeded())
            }
        }
    }

    /// Normalize and commit `doc`, returning what was stored.
    fn save(&self, doc: Document) -> Result<Document> {
        let doc = normalize(doc);
        self.write(&doc)?;
        Ok(doc)
    }
}

/// Backend that keeps the document in memory only.
#[derive(Default)]
pub struct MemoryStore {
    doc: Mutex<Option<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: Document) -> Self {
        Self {
            doc: Mutex::new(Some(doc)),
        }
    }
}

impl DocumentBackend for MemoryStore {
    fn read(&self) -> Result<Option<Document>> {
        let guard = self
            .doc
            .lock()
            .map_err(|_| HubError::Storage("memory store poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn write(&self, doc: &Document) -> Result<()> {
        let mut guard = self
            .doc
            .lock()
            .map_err(|_| HubError::Storage("memory store poisoned".to_string()))?;
        *guard = Some(doc.clone());
        Ok(())
    }
}
