use serde_json::{Map, Value};

use crate::domain::errors::Result;

/// Top-level persisted document: section name -> flat key/value object
pub type Document = Map<String, Value>;

/// Port for durable storage of the config document
pub trait DocumentBackend: Send {
    /// Read the persisted document.
    ///
    /// `Ok(None)` means nothing has been persisted yet. Implementations try
    /// their backup copy before reporting `CorruptDocument`.
    fn read_document(&self) -> Result<Option<Document>>;

    /// Persist the document so that a crash never leaves a torn file behind
    fn write_document_atomic(&self, document: &Document) -> Result<()>;

    /// Human-readable location, for logs
    fn location(&self) -> String;
}
