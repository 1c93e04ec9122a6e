use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{Document, DocumentBackend};

const TEMP_EXTENSION: &str = "tmp";
const BACKUP_EXTENSION: &str = "bak";

/// JSON file persistence with atomic replace and a one-deep backup.
///
/// Saving writes `<file>.tmp`, moves the current file to `<file>.bak`, then
/// renames the temp file into place. Loading falls back to the backup when
/// the primary file is missing or unparsable.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> PathBuf {
        Self::with_suffix(&self.path, TEMP_EXTENSION)
    }

    pub fn backup_path(&self) -> PathBuf {
        Self::with_suffix(&self.path, BACKUP_EXTENSION)
    }

    fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    /// `Ok(None)` if the file does not exist
    fn read_file(path: &Path) -> Result<Option<Document>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DomainError::PersistenceFailed(format!(
                    "read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(document)) => Ok(Some(document)),
            Ok(_) => Err(DomainError::CorruptDocument(format!(
                "{}: top level is not an object",
                path.display()
            ))),
            Err(e) => Err(DomainError::CorruptDocument(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write_temp(&self, content: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(self.temp_path())?;
        file.write_all(content)?;
        file.sync_all()
    }
}

impl DocumentBackend for JsonFileBackend {
    fn read_document(&self) -> Result<Option<Document>> {
        let primary_error = match Self::read_file(&self.path) {
            Ok(Some(document)) => return Ok(Some(document)),
            Ok(None) => None,
            Err(e) => Some(e),
        };

        match Self::read_file(&self.backup_path()) {
            Ok(Some(document)) => {
                tracing::warn!(
                    "Recovered config from backup {}",
                    self.backup_path().display()
                );
                Ok(Some(document))
            }
            Ok(None) => primary_error.map_or(Ok(None), Err),
            Err(backup_error) => {
                tracing::debug!("Backup unreadable: {}", backup_error);
                Err(primary_error.unwrap_or(backup_error))
            }
        }
    }

    fn write_document_atomic(&self, document: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DomainError::PersistenceFailed(format!("create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_vec_pretty(document)
            .map_err(|e| DomainError::PersistenceFailed(format!("serialize: {}", e)))?;

        self.write_temp(&content).map_err(|e| {
            DomainError::PersistenceFailed(format!("write {}: {}", self.temp_path().display(), e))
        })?;

        if self.path.exists() {
            fs::rename(&self.path, self.backup_path()).map_err(|e| {
                DomainError::PersistenceFailed(format!(
                    "backup {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }

        fs::rename(self.temp_path(), &self.path).map_err(|e| {
            DomainError::PersistenceFailed(format!("replace {}: {}", self.path.display(), e))
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
