use std::sync::{Arc, Mutex};

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{Document, DocumentBackend};

#[derive(Debug, Clone)]
enum Stored {
    Nothing,
    Document(Document),
    Corrupt,
}

/// In-process backend. Clones share the same storage, so a caller can keep
/// a handle to inspect or corrupt what the store persisted.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    stored: Arc<Mutex<Stored>>,
    fail_writes: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            stored: Arc::new(Mutex::new(Stored::Nothing)),
            fail_writes: false,
        }
    }

    /// Backend whose persisted document cannot be parsed
    pub fn corrupted() -> Self {
        let backend = Self::new();
        backend.corrupt();
        backend
    }

    /// Backend that refuses every write
    pub fn read_only() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }

    pub fn corrupt(&self) {
        if let Ok(mut stored) = self.stored.lock() {
            *stored = Stored::Corrupt;
        }
    }

    /// Last successfully persisted document
    pub fn persisted(&self) -> Option<Document> {
        match &*self.stored.lock().ok()? {
            Stored::Document(document) => Some(document.clone()),
            _ => None,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBackend for MemoryBackend {
    fn read_document(&self) -> Result<Option<Document>> {
        let stored = self
            .stored
            .lock()
            .map_err(|_| DomainError::PersistenceFailed("storage lock poisoned".to_string()))?;
        match &*stored {
            Stored::Nothing => Ok(None),
            Stored::Document(document) => Ok(Some(document.clone())),
            Stored::Corrupt => Err(DomainError::CorruptDocument("memory".to_string())),
        }
    }

    fn write_document_atomic(&self, document: &Document) -> Result<()> {
        if self.fail_writes {
            return Err(DomainError::PersistenceFailed("read-only backend".to_string()));
        }
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| DomainError::PersistenceFailed("storage lock poisoned".to_string()))?;
        *stored = Stored::Document(document.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
